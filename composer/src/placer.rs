use image::{
    GrayImage,
    imageops::{self, FilterType},
};
use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::{
    error::Result,
    geom::{BBox, CellBox, Grid},
    source::SourceObject,
};

/// An accepted placement. `bbox_px` is in canvas pixels with exclusive far
/// edges; `bbox_norm` is the same box divided by the canvas size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlacedObject {
    pub seq: usize,
    pub class: u32,
    pub bbox_px: BBox,
    pub bbox_norm: BBox,
}

/// Crops `bitmap` to a box produced by `find_bbox` (normalized, inclusive
/// max index).
pub fn crop_to_bbox(bitmap: &GrayImage, bbox: &BBox) -> GrayImage {
    let (w, h) = bitmap.dimensions();
    let last_x = w.saturating_sub(1);
    let last_y = h.saturating_sub(1);
    let x0 = ((bbox.x_min * w as f64).round() as u32).min(last_x);
    let y0 = ((bbox.y_min * h as f64).round() as u32).min(last_y);
    let x1 = ((bbox.x_max * w as f64).round() as u32).clamp(x0, last_x);
    let y1 = ((bbox.y_max * h as f64).round() as u32).clamp(y0, last_y);
    imageops::crop_imm(bitmap, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
}

/// Largest scale that keeps an `obj_w x obj_h` object within twice the
/// cell on each axis and within the canvas. Requests above it are replaced
/// by the fitting value quantized to 0.1 minus 0.05.
pub fn cap_scale(scale: f64, obj_w: u32, obj_h: u32, cell: &CellBox, grid: &Grid) -> f64 {
    let limit_w = (2 * cell.w).min(grid.width).max(1) as f64;
    let limit_h = (2 * cell.h).min(grid.height).max(1) as f64;
    let fit = (limit_w / obj_w.max(1) as f64).min(limit_h / obj_h.max(1) as f64);
    if scale <= fit {
        return scale;
    }
    ((fit * 10.0).round() / 10.0 - 0.05).max(0.05)
}

fn scaled_side(side: u32, scale: f64, limit: u32) -> u32 {
    ((side as f64 * scale).round() as u32).clamp(1, limit.max(1))
}

/// Shifts `[start, start + len)` rigidly so it lies inside `[0, bound)`.
fn shift_inside(start: i64, len: u32, bound: u32) -> u32 {
    let max_start = bound.saturating_sub(len) as i64;
    start.clamp(0, max_start) as u32
}

/// Places one source object into grid `region` of a copy of `canvas`.
///
/// The object is cropped to `obj_box`, scaled (after capping `scale`, see
/// [`cap_scale`]), centred on a random anchor inside the cell, pushed back
/// inside the canvas if it sticks out, and composited by per-pixel maximum.
/// The input canvas is left untouched; the caller decides whether to keep
/// the returned one.
#[allow(clippy::too_many_arguments)]
pub fn place_object<R>(
    rng: &mut R,
    canvas: &GrayImage,
    grid: &Grid,
    region: u32,
    obj: &SourceObject,
    obj_box: &BBox,
    scale: f64,
    seq: usize,
) -> Result<(GrayImage, PlacedObject)>
where
    R: Rng + ?Sized,
{
    let cell = grid.cell(region)?;
    let crop = crop_to_bbox(&obj.bitmap, obj_box);
    let (cw, ch) = crop.dimensions();

    let capped = cap_scale(scale, cw, ch, &cell, grid);
    if capped != scale {
        debug!("seq {seq}: scale {scale} capped to {capped:.2} for region {region}");
    }
    let patch = if capped != 1.0 {
        let nw = scaled_side(cw, capped, grid.width);
        let nh = scaled_side(ch, capped, grid.height);
        imageops::resize(&crop, nw, nh, FilterType::Nearest)
    } else {
        crop
    };
    let (pw, ph) = patch.dimensions();

    let ax = rng.random_range(cell.x..cell.x + cell.w.max(1)) as i64;
    let ay = rng.random_range(cell.y..cell.y + cell.h.max(1)) as i64;
    let left = shift_inside(ax - (pw / 2) as i64, pw, grid.width);
    let top = shift_inside(ay - (ph / 2) as i64, ph, grid.height);

    let mut out = canvas.clone();
    for (x, y, p) in patch.enumerate_pixels() {
        let (tx, ty) = (left + x, top + y);
        if tx >= out.width() || ty >= out.height() {
            continue;
        }
        let dst = out.get_pixel_mut(tx, ty);
        dst.0[0] = dst.0[0].max(p.0[0]);
    }

    let bbox_px = BBox::new(
        left as f64,
        top as f64,
        (left + pw) as f64,
        (top + ph) as f64,
    );
    let placed = PlacedObject {
        seq,
        class: obj.class,
        bbox_px,
        bbox_norm: bbox_px.normalized(grid.width, grid.height),
    };
    Ok((out, placed))
}
