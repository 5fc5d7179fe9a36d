use std::{
    fs::{read, read_dir},
    path::Path,
};

use anyhow::{Context, bail, ensure};
use composer::SourceObject;
use image::GrayImage;
use log::{info, warn};

use crate::config::SourceSpec;

const IDX_IMAGES_MAGIC: u32 = 2051;
const IDX_LABELS_MAGIC: u32 = 2049;

pub fn load(spec: &SourceSpec) -> anyhow::Result<Vec<SourceObject>> {
    let objects = match spec {
        SourceSpec::Idx { images, labels } => load_idx(images, labels)?,
        SourceSpec::Dir { root } => load_dir(root)?,
    };
    info!("loaded {} source objects", objects.len());
    Ok(objects)
}

fn be_u32(bytes: &[u8], at: usize) -> anyhow::Result<u32> {
    let chunk = bytes
        .get(at..at + 4)
        .with_context(|| format!("truncated IDX header at byte {at}"))?;
    Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Parses an IDX image file (`u8`, rank 3) and its IDX label file.
pub fn parse_idx(images: &[u8], labels: &[u8]) -> anyhow::Result<Vec<SourceObject>> {
    ensure!(be_u32(images, 0)? == IDX_IMAGES_MAGIC, "not an IDX image file");
    ensure!(be_u32(labels, 0)? == IDX_LABELS_MAGIC, "not an IDX label file");
    let count = be_u32(images, 4)? as usize;
    let rows = be_u32(images, 8)?;
    let cols = be_u32(images, 12)?;
    ensure!(
        be_u32(labels, 4)? as usize == count,
        "image and label counts differ"
    );

    let px = (rows as usize)
        .checked_mul(cols as usize)
        .context("IDX dimensions overflow")?;
    let total = count.checked_mul(px).context("IDX dimensions overflow")?;
    let pixels = &images[16..];
    let classes = &labels[8..];
    ensure!(pixels.len() >= total, "IDX image data is truncated");
    ensure!(classes.len() >= count, "IDX label data is truncated");

    let mut objects = Vec::with_capacity(count);
    for (i, &class) in classes.iter().take(count).enumerate() {
        let data = pixels[i * px..(i + 1) * px].to_vec();
        let Some(bitmap) = GrayImage::from_raw(cols, rows, data) else {
            bail!("IDX image {i} has the wrong size");
        };
        objects.push(SourceObject::new(bitmap, class as u32));
    }
    Ok(objects)
}

fn load_idx(images: &Path, labels: &Path) -> anyhow::Result<Vec<SourceObject>> {
    let images = read(images).with_context(|| format!("reading {}", images.display()))?;
    let labels = read(labels).with_context(|| format!("reading {}", labels.display()))?;
    parse_idx(&images, &labels)
}

/// Reads `<root>/<class>/*.png`, where `<class>` is a number. Files that do
/// not decode or carry no foreground are skipped.
pub fn load_dir(root: &Path) -> anyhow::Result<Vec<SourceObject>> {
    let mut class_dirs: Vec<(u32, std::path::PathBuf)> = read_dir(root)
        .with_context(|| format!("reading source directory {}", root.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let class = p.file_name()?.to_str()?.parse().ok()?;
            Some((class, p))
        })
        .collect();
    class_dirs.sort();

    let mut objects = Vec::new();
    for (class, dir) in class_dirs {
        let mut files: Vec<_> = read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| matches!(p.extension().and_then(|s| s.to_str()), Some("png")))
            .collect();
        files.sort();
        for path in files {
            match image::open(&path) {
                Ok(img) => {
                    let bitmap = img.into_luma8();
                    if bitmap.pixels().any(|p| p.0[0] > 0) {
                        objects.push(SourceObject::new(bitmap, class));
                    } else {
                        warn!("skipping {}: no foreground pixels", path.display());
                    }
                }
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
    }
    ensure!(!objects.is_empty(), "no source images under {}", root.display());
    Ok(objects)
}
