use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use composer::{ComposeConfig, ExportSummary};
use serde::Serialize;

/// Written next to `images/` and `labels/` so a dataset can be traced back
/// to the settings that produced it.
#[derive(Serialize, Debug)]
pub struct JsonRecord<'a> {
    pub schema: &'static str,
    pub config: &'a ComposeConfig,
    pub seed: Option<u64>,
    pub summary: ExportSummary,
}

impl JsonRecord<'_> {
    pub fn write(&self, out_dir: &Path) -> anyhow::Result<()> {
        let file = File::create(out_dir.join("dataset.json"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
