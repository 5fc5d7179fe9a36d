use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, TryRecvError},
    },
    thread::{self, JoinHandle},
};

use image::{GrayImage, ImageFormat};
use log::{error, info};
use rand::{RngCore, SeedableRng, rngs::SmallRng};
use rand_xoshiro::SplitMix64;
use serde::Serialize;

use crate::{
    compose::compose,
    config::ComposeConfig,
    error::{ComposeError, Result},
    geom::BoxFormat,
    progress::{Progress, Ticker},
    source::SourceSet,
    visualize::label_lines,
};

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub root: PathBuf,
    pub count: usize,
    /// Center form unless asked otherwise, whatever the preview uses.
    pub label_format: BoxFormat,
    pub image_format: ImageFormat,
    /// Base seed; each sample gets its own seed derived from it.
    pub seed: Option<u64>,
}

impl ExportOptions {
    pub fn new(root: impl Into<PathBuf>, count: usize) -> Self {
        Self {
            root: root.into(),
            count,
            label_format: BoxFormat::Center,
            image_format: ImageFormat::Png,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub samples: usize,
    pub objects: usize,
}

/// Output directories of one dataset.
pub struct DatasetDirs {
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl DatasetDirs {
    pub fn create(root: &Path) -> Result<Self> {
        let dirs = Self {
            images: root.join("images"),
            labels: root.join("labels"),
        };
        fs::create_dir_all(&dirs.images)?;
        fs::create_dir_all(&dirs.labels)?;
        Ok(dirs)
    }

    pub fn image_path(&self, id: usize, format: ImageFormat) -> PathBuf {
        let ext = format.extensions_str().first().copied().unwrap_or("png");
        self.images.join(format!("{id:08}.{ext}"))
    }

    pub fn label_path(&self, id: usize) -> PathBuf {
        self.labels.join(format!("{id:08}.txt"))
    }
}

/// Sibling path used while a file is being written; renamed into place
/// once complete.
fn part_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".part");
    PathBuf::from(s)
}

fn write_image(path: &Path, img: &GrayImage, format: ImageFormat) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    img.write_to(&mut w, format)?;
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

fn write_labels(path: &Path, lines: &[String]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(lines.join("\n").as_bytes())?;
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

/// Writes one image/label pair so that either both files end up in place or
/// neither does. Both are staged as `.part` files; the label is renamed
/// first and taken back if the image rename fails.
fn write_sample(
    dirs: &DatasetDirs,
    id: usize,
    img: &GrayImage,
    format: ImageFormat,
    lines: &[String],
) -> Result<()> {
    let image_path = dirs.image_path(id, format);
    let label_path = dirs.label_path(id);
    let image_tmp = part_path(&image_path);
    let label_tmp = part_path(&label_path);

    let res: Result<()> = (|| {
        write_image(&image_tmp, img, format)?;
        write_labels(&label_tmp, lines)?;
        fs::rename(&label_tmp, &label_path)?;
        if let Err(e) = fs::rename(&image_tmp, &image_path) {
            let _ = fs::remove_file(&label_path);
            return Err(e.into());
        }
        Ok(())
    })();

    if res.is_err() {
        let _ = fs::remove_file(&image_tmp);
        let _ = fs::remove_file(&label_tmp);
    }
    res
}

/// Composes and writes `options.count` samples in order.
///
/// `progress` is called about once per percent; `cancel` is checked before
/// every sample. Any I/O or encoding failure stops the batch.
pub fn export<P>(
    sources: &SourceSet,
    config: &ComposeConfig,
    options: &ExportOptions,
    mut progress: P,
    cancel: &AtomicBool,
) -> Result<ExportSummary>
where
    P: FnMut(Progress),
{
    let dirs = DatasetDirs::create(&options.root)?;
    let base = options.seed.unwrap_or_else(|| rand::rng().next_u64());
    let mut seeds = SplitMix64::seed_from_u64(base);
    let ticker = Ticker::new(options.count);
    let mut summary = ExportSummary::default();

    info!(
        "exporting {} samples to {} (seed {base})",
        options.count,
        options.root.display()
    );
    for id in 0..options.count {
        if cancel.load(Ordering::Relaxed) {
            info!("export cancelled after {} samples", summary.samples);
            return Err(ComposeError::Cancelled(summary.samples));
        }
        let mut rng = SmallRng::seed_from_u64(seeds.next_u64());
        let comp = compose(&mut rng, sources, config)?;

        write_sample(
            &dirs,
            id,
            &comp.canvas,
            options.image_format,
            &label_lines(&comp.objects, options.label_format),
        )?;

        summary.samples += 1;
        summary.objects += comp.objects.len();
        if let Some(p) = ticker.tick(id + 1, "exporting") {
            progress(p);
        }
    }
    info!(
        "export finished: {} samples, {} objects",
        summary.samples, summary.objects
    );
    Ok(summary)
}

#[derive(Debug)]
pub enum ExportEvent {
    Progress(Progress),
    Finished(Result<ExportSummary>),
}

/// Runs [`export`] on its own thread and streams events back.
#[derive(Debug)]
pub struct ExportWorker {
    thread_handle: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    rx: Receiver<ExportEvent>,
}

impl ExportWorker {
    pub fn spawn(sources: Arc<SourceSet>, config: ComposeConfig, options: ExportOptions) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let thread_handle = thread::spawn({
            let cancel = cancel.clone();
            move || {
                let progress_tx = tx.clone();
                let res = export(
                    &sources,
                    &config,
                    &options,
                    |p| {
                        let _ = progress_tx.send(ExportEvent::Progress(p));
                    },
                    &cancel,
                );
                let _ = tx.send(ExportEvent::Finished(res));
            }
        });
        Self {
            thread_handle: Some(thread_handle),
            cancel,
            rx,
        }
    }

    /// Stops the export before its next sample.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn try_next(&self) -> Option<ExportEvent> {
        match self.rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the next event; `None` once the worker is gone.
    pub fn recv(&self) -> Option<ExportEvent> {
        self.rx.recv().ok()
    }

    /// Drains events until the export finishes, forwarding progress.
    pub fn wait<P>(mut self, mut progress: P) -> Result<ExportSummary>
    where
        P: FnMut(Progress),
    {
        let mut outcome = None;
        while let Some(ev) = self.recv() {
            match ev {
                ExportEvent::Progress(p) => progress(p),
                ExportEvent::Finished(res) => {
                    outcome = Some(res);
                    break;
                }
            }
        }
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("export thread panicked");
            }
        }
        outcome.unwrap_or_else(|| {
            Err(ComposeError::Io(std::io::Error::other(
                "export thread exited without a result",
            )))
        })
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        if let Some(handle) = &self.thread_handle {
            if !handle.is_finished() {
                error!("ExportWorker dropped while the export is still running; cancelling");
                self.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        let dirs = DatasetDirs {
            images: PathBuf::from("out/images"),
            labels: PathBuf::from("out/labels"),
        };
        assert_eq!(
            dirs.image_path(7, ImageFormat::Png),
            PathBuf::from("out/images/00000007.png")
        );
        assert_eq!(
            dirs.image_path(12, ImageFormat::Jpeg),
            PathBuf::from("out/images/00000012.jpg")
        );
        assert_eq!(dirs.label_path(0), PathBuf::from("out/labels/00000000.txt"));
    }
}
