use std::path::{Path, PathBuf};

use anyhow::Context;
use composer::ConfigForm;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// MNIST-style IDX image/label file pair.
    Idx { images: PathBuf, labels: PathBuf },
    /// `<root>/<class>/*.png`
    Dir { root: PathBuf },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sources: SourceSpec,
    pub out_dir: PathBuf,
    pub form: ConfigForm,
    pub seed: Option<u64>,
    /// Where to write an annotated preview of one composite, if anywhere.
    pub preview: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sources: SourceSpec::Idx {
                images: "data/train-images-idx3-ubyte".into(),
                labels: "data/train-labels-idx1-ubyte".into(),
            },
            out_dir: "dataset".into(),
            form: ConfigForm::default(),
            seed: None,
            preview: Some("preview.png".into()),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing run config {}", path.display()))
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut cfg: Self = serde_json::from_str(text)?;
        cfg.form.fill_missing();
        Ok(cfg)
    }
}
