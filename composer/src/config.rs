use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ComposeError, Result},
    geom::{BoxFormat, Grid},
};

pub const FIELD_WIDTH: &str = "Image Width";
pub const FIELD_HEIGHT: &str = "Image Height";
pub const FIELD_NOISE: &str = "Noise Intensity (0-256)";
pub const FIELD_MAX_OBJECTS: &str = "Max Number of Objects";
pub const FIELD_ROWS: &str = "Image Grid Rows";
pub const FIELD_COLS: &str = "Image Grid Cols";
pub const FIELD_MAX_SCALE: &str = "Max Object Scaling";
pub const FIELD_DATASET_SIZE: &str = "Dataset Size";

/// Everything one composition call needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub width: u32,
    pub height: u32,
    /// Exclusive upper bound of the background noise, 0..=256.
    pub noise_intensity: u16,
    pub max_objects: u32,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub max_scale: f64,
    pub format: BoxFormat,
    pub allow_overlap: bool,
    pub draw_grid: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            noise_intensity: 180,
            max_objects: 10,
            grid_rows: 8,
            grid_cols: 8,
            max_scale: 5.0,
            format: BoxFormat::Center,
            allow_overlap: false,
            draw_grid: false,
        }
    }
}

impl ComposeConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height, self.grid_rows, self.grid_cols)
    }
}

/// Untyped settings as a form front end holds them: text fields keyed by
/// label plus the toggles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigForm {
    pub fields: BTreeMap<String, String>,
    pub corner_form: bool,
    pub center_form: bool,
    pub allow_overlap: bool,
    pub draw_grid: bool,
}

impl Default for ConfigForm {
    fn default() -> Self {
        let fields = [
            (FIELD_WIDTH, "256"),
            (FIELD_HEIGHT, "256"),
            (FIELD_NOISE, "180"),
            (FIELD_MAX_OBJECTS, "10"),
            (FIELD_ROWS, "8"),
            (FIELD_COLS, "8"),
            (FIELD_MAX_SCALE, "5"),
            (FIELD_DATASET_SIZE, "1000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            fields,
            corner_form: false,
            center_form: true,
            allow_overlap: false,
            draw_grid: false,
        }
    }
}

struct Fields<'a> {
    form: &'a ConfigForm,
    errors: Vec<String>,
}

impl Fields<'_> {
    fn number(&mut self, key: &str) -> Option<f64> {
        let Some(raw) = self.form.fields.get(key) else {
            self.errors.push(format!("{key}: missing"));
            return None;
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.errors.push(format!("{key}: '{raw}' is not a number"));
                None
            }
        }
    }

    fn in_range(&mut self, key: &str, min: f64, max: f64) -> Option<f64> {
        let v = self.number(key)?;
        if v < min || v > max {
            self.errors
                .push(format!("{key}: {v} is outside {min}..={max}"));
            return None;
        }
        Some(v)
    }
}

impl ConfigForm {
    /// Adds the default value for every field the form does not carry.
    pub fn fill_missing(&mut self) {
        for (k, v) in ConfigForm::default().fields {
            self.fields.entry(k).or_insert(v);
        }
    }

    /// Validates every field and returns the typed config with the requested
    /// dataset size. All problems are reported together.
    pub fn parse(&self) -> Result<(ComposeConfig, usize)> {
        let mut f = Fields {
            form: self,
            errors: Vec::new(),
        };
        let dim = u32::MAX as f64;
        let width = f.in_range(FIELD_WIDTH, 1.0, dim);
        let height = f.in_range(FIELD_HEIGHT, 1.0, dim);
        let noise = f.in_range(FIELD_NOISE, 0.0, 256.0);
        let max_objects = f.in_range(FIELD_MAX_OBJECTS, 0.0, dim);
        let rows = f.in_range(FIELD_ROWS, 1.0, dim);
        let cols = f.in_range(FIELD_COLS, 1.0, dim);
        let max_scale = f.in_range(FIELD_MAX_SCALE, 1.0, f64::MAX);
        let size = f.in_range(FIELD_DATASET_SIZE, 0.0, u32::MAX as f64);

        let format = match (self.corner_form, self.center_form) {
            (true, false) => Some(BoxFormat::Corner),
            (false, true) => Some(BoxFormat::Center),
            _ => {
                f.errors
                    .push("exactly one of corner or center coordinates must be selected".into());
                None
            }
        };
        let mut errors = f.errors;

        if let (Some(w), Some(h), Some(r), Some(c)) = (width, height, rows, cols) {
            if (r as u32) > (h as u32) || (c as u32) > (w as u32) {
                errors.push(format!("grid {r}x{c} does not fit a {w}x{h} canvas"));
            }
        }

        let (
            Some(width),
            Some(height),
            Some(noise),
            Some(max_objects),
            Some(rows),
            Some(cols),
            Some(max_scale),
            Some(size),
            Some(format),
        ) = (
            width, height, noise, max_objects, rows, cols, max_scale, size, format,
        )
        else {
            return Err(ComposeError::InvalidConfig(errors));
        };
        if !errors.is_empty() {
            return Err(ComposeError::InvalidConfig(errors));
        }

        let config = ComposeConfig {
            width: width as u32,
            height: height as u32,
            noise_intensity: noise as u16,
            max_objects: max_objects as u32,
            grid_rows: rows as u32,
            grid_cols: cols as u32,
            max_scale,
            format,
            allow_overlap: self.allow_overlap,
            draw_grid: self.draw_grid,
        };
        Ok((config, size as usize))
    }
}
