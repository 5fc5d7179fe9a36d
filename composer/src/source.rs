use image::GrayImage;
use log::debug;

use crate::{
    error::{ComposeError, Result},
    geom::BBox,
    progress::{Progress, Ticker},
};

/// One labeled bitmap. Pixel value 0 is background.
#[derive(Clone, Debug)]
pub struct SourceObject {
    pub bitmap: GrayImage,
    pub class: u32,
}

impl SourceObject {
    pub fn new(bitmap: GrayImage, class: u32) -> Self {
        Self { bitmap, class }
    }
}

/// Tight box around every pixel above zero, normalized by the bitmap's own
/// size: columns by width, rows by height. Max edges are the last foreground
/// index, not one past it.
pub fn find_bbox(bitmap: &GrayImage) -> Option<BBox> {
    let mut min = (u32::MAX, u32::MAX);
    let mut max = (0u32, 0u32);
    let mut found = false;
    for (x, y, p) in bitmap.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        found = true;
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    if !found {
        return None;
    }
    let (w, h) = (bitmap.width() as f64, bitmap.height() as f64);
    Some(BBox::new(
        min.0 as f64 / w,
        min.1 as f64 / h,
        max.0 as f64 / w,
        max.1 as f64 / h,
    ))
}

/// Source objects with their boxes computed once up front. Read-only for
/// the rest of a run.
#[derive(Clone, Debug)]
pub struct SourceSet {
    objects: Vec<SourceObject>,
    boxes: Vec<BBox>,
}

impl SourceSet {
    pub fn prepare<P>(objects: Vec<SourceObject>, mut progress: P) -> Result<Self>
    where
        P: FnMut(Progress),
    {
        if objects.is_empty() {
            return Err(ComposeError::NoSources);
        }
        let ticker = Ticker::new(objects.len());
        let mut boxes = Vec::with_capacity(objects.len());
        for (i, obj) in objects.iter().enumerate() {
            let bbox = find_bbox(&obj.bitmap).ok_or(ComposeError::EmptyObject(i))?;
            boxes.push(bbox);
            if let Some(p) = ticker.tick(i + 1, "preparing sources") {
                progress(p);
            }
        }
        debug!("prepared {} source objects", objects.len());
        Ok(Self { objects, boxes })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<(&SourceObject, &BBox)> {
        Some((self.objects.get(idx)?, self.boxes.get(idx)?))
    }
}
