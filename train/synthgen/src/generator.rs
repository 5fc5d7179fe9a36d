use std::sync::Arc;

use anyhow::{Context, bail};
use composer::{
    ClassPalette, ComposeConfig, ComposeError, ExportOptions, ExportSummary, ExportWorker,
    Progress, SourceSet, compose, label_lines, overlay_boxes,
};
use log::{error, info};
use rand::{SeedableRng, rngs::SmallRng};

use crate::{config::RunConfig, record::JsonRecord, sources};

fn log_progress(p: Progress) {
    info!("[{:5.1}%] {}", p.percent, p.status);
}

pub struct DatasetGenerator {
    pub run: RunConfig,
}

impl DatasetGenerator {
    pub fn new(run: RunConfig) -> Self {
        Self { run }
    }

    /// Turns the form into a typed config, logging every problem at once.
    fn validate(&self) -> anyhow::Result<(ComposeConfig, usize)> {
        match self.run.form.parse() {
            Ok(v) => Ok(v),
            Err(ComposeError::InvalidConfig(errors)) => {
                for e in &errors {
                    error!("config: {e}");
                }
                bail!("{} invalid configuration value(s)", errors.len());
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_preview(&self, sources: &SourceSet, config: &ComposeConfig) -> anyhow::Result<()> {
        let Some(path) = &self.run.preview else {
            return Ok(());
        };
        let mut rng = match self.run.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let comp = compose(&mut rng, sources, config)?;
        for line in label_lines(&comp.objects, config.format) {
            info!("preview: {line}");
        }
        overlay_boxes(&comp.canvas, &comp.objects, &ClassPalette::default())
            .save(path)
            .with_context(|| format!("writing preview {}", path.display()))?;
        info!(
            "preview with {} objects written to {}",
            comp.objects.len(),
            path.display()
        );
        Ok(())
    }

    pub fn run(&self) -> anyhow::Result<ExportSummary> {
        let (config, count) = self.validate()?;
        let objects = sources::load(&self.run.sources)?;
        let sources = Arc::new(SourceSet::prepare(objects, log_progress)?);

        self.write_preview(&sources, &config)?;

        let mut options = ExportOptions::new(&self.run.out_dir, count);
        options.seed = self.run.seed;
        let worker = ExportWorker::spawn(sources, config.clone(), options);
        let summary = worker.wait(log_progress)?;

        JsonRecord {
            schema: "v1",
            config: &config,
            seed: self.run.seed,
            summary,
        }
        .write(&self.run.out_dir)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSpec;
    use composer::config::{FIELD_DATASET_SIZE, FIELD_MAX_OBJECTS};
    use image::{GrayImage, Luma};

    #[test]
    fn runs_end_to_end_from_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("digits");
        for class in 0..3u8 {
            let dir = src.join(class.to_string());
            std::fs::create_dir_all(&dir).unwrap();
            let img = GrayImage::from_fn(28, 28, |x, y| {
                if (8..20).contains(&x) && (6..22).contains(&y) {
                    Luma([255])
                } else {
                    Luma([0])
                }
            });
            img.save(dir.join("0.png")).unwrap();
        }

        let mut run = RunConfig {
            sources: SourceSpec::Dir { root: src },
            out_dir: tmp.path().join("out"),
            seed: Some(12),
            preview: Some(tmp.path().join("preview.png")),
            ..RunConfig::default()
        };
        run.form.fields.insert(FIELD_DATASET_SIZE.into(), "3".into());
        run.form.fields.insert(FIELD_MAX_OBJECTS.into(), "5".into());

        let summary = DatasetGenerator::new(run).run().unwrap();
        assert_eq!(summary.samples, 3);
        let out = tmp.path().join("out");
        assert!(out.join("images/00000002.png").exists());
        assert!(out.join("labels/00000002.txt").exists());
        assert!(out.join("dataset.json").exists());
        let preview = image::open(tmp.path().join("preview.png")).unwrap();
        assert_eq!((preview.width(), preview.height()), (256, 256));
    }

    #[test]
    fn invalid_form_stops_before_loading() {
        let mut run = RunConfig::default();
        run.form.fields.insert("Image Width".into(), "big".into());
        run.form.center_form = false;
        let err = DatasetGenerator::new(run).run().unwrap_err();
        assert_eq!(err.to_string(), "2 invalid configuration value(s)");
    }
}
