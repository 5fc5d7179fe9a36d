use std::path::PathBuf;

use log::info;

use crate::{config::RunConfig, generator::DatasetGenerator};

mod config;
mod generator;
mod record;
mod sources;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let run = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => RunConfig::load(&path)?,
        None => {
            info!("no run config given, using defaults");
            RunConfig::default()
        }
    };

    let summary = DatasetGenerator::new(run).run()?;
    info!(
        "done: {} samples, {} objects",
        summary.samples, summary.objects
    );
    Ok(())
}
