use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, Result};

/// Box encoding used at the crate's edges: labels, previews and callers that
/// hand over raw coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFormat {
    /// `(x_min, y_min, x_max, y_max)`
    Corner,
    /// `(center_x, center_y, width, height)`
    #[default]
    Center,
}

pub fn to_center_form(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> [f64; 4] {
    let w = x_max - x_min;
    let h = y_max - y_min;
    [x_min + w / 2.0, y_min + h / 2.0, w, h]
}

pub fn to_corner_form(cx: f64, cy: f64, w: f64, h: f64) -> [f64; 4] {
    [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
}

/// Axis-aligned box in corner form. All geometry inside the crate works on
/// this representation; `BoxFormat` only matters when encoding or decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn decode(v: [f64; 4], format: BoxFormat) -> Self {
        let [x_min, y_min, x_max, y_max] = match format {
            BoxFormat::Corner => v,
            BoxFormat::Center => to_corner_form(v[0], v[1], v[2], v[3]),
        };
        Self::new(x_min, y_min, x_max, y_max)
    }

    pub fn encode(&self, format: BoxFormat) -> [f64; 4] {
        match format {
            BoxFormat::Corner => [self.x_min, self.y_min, self.x_max, self.y_max],
            BoxFormat::Center => to_center_form(self.x_min, self.y_min, self.x_max, self.y_max),
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Divides x by `width` and y by `height`.
    pub fn normalized(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self::new(self.x_min / w, self.y_min / h, self.x_max / w, self.y_max / h)
    }

    /// Two boxes are disjoint iff one ends before the other starts on some
    /// axis. Touching edges count as overlap.
    pub fn overlaps(&self, other: &BBox) -> bool {
        let disjoint = self.x_max < other.x_min
            || other.x_max < self.x_min
            || self.y_max < other.y_min
            || other.y_max < self.y_min;
        !disjoint
    }
}

/// Overlap test on raw coordinates given in `format`.
pub fn overlaps(a: [f64; 4], b: [f64; 4], format: BoxFormat) -> bool {
    BBox::decode(a, format).overlaps(&BBox::decode(b, format))
}

/// Pixel rectangle of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CellBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CellBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// A canvas split into `rows x cols` equal cells. Regions are numbered
/// row-major starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
    pub rows: u32,
    pub cols: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32, rows: u32, cols: u32) -> Self {
        Self {
            width,
            height,
            rows,
            cols,
        }
    }

    pub fn region_count(&self) -> u32 {
        self.rows * self.cols
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.width / self.cols, self.height / self.rows)
    }

    pub fn cell(&self, region: u32) -> Result<CellBox> {
        let count = self.region_count();
        if region == 0 || region > count {
            return Err(ComposeError::RegionOutOfRange { region, count });
        }
        let idx = region - 1;
        let (cw, ch) = self.cell_size();
        let (r, c) = (idx / self.cols, idx % self.cols);
        Ok(CellBox::new(c * cw, r * ch, cw, ch))
    }
}
