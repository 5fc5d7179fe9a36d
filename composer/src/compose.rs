use std::collections::BTreeMap;

use image::GrayImage;
use log::debug;
use rand::Rng;

use crate::{
    canvas::{draw_grid, generate_background},
    config::ComposeConfig,
    error::{ComposeError, Result},
    placer::{PlacedObject, place_object},
    region::select_regions,
    source::SourceSet,
};

pub const SCALE_STEP: f64 = 0.125;

/// A finished composite and its accepted placements keyed by sequence
/// number. Rejected attempts leave gaps in the keys.
#[derive(Clone, Debug)]
pub struct Composition {
    pub canvas: GrayImage,
    pub objects: BTreeMap<usize, PlacedObject>,
}

/// Picks from `1, 1.125, 1.25, ..` up to `max_scale`.
pub fn random_scale<R>(rng: &mut R, max_scale: f64) -> f64
where
    R: Rng + ?Sized,
{
    if max_scale <= 1.0 {
        return 1.0;
    }
    let steps = ((max_scale - 1.0) / SCALE_STEP).floor() as u32;
    1.0 + rng.random_range(0..=steps) as f64 * SCALE_STEP
}

/// Builds one composite image.
///
/// Every selected region gets exactly one attempt. A candidate is drawn on a
/// copy of the accepted canvas and only adopted if overlap is allowed or its
/// box is disjoint from every box accepted so far.
pub fn compose<R>(rng: &mut R, sources: &SourceSet, config: &ComposeConfig) -> Result<Composition>
where
    R: Rng + ?Sized,
{
    if sources.is_empty() {
        return Err(ComposeError::NoSources);
    }
    let grid = config.grid();

    let mut canvas = generate_background(rng, config.height, config.width, config.noise_intensity);
    if config.draw_grid {
        draw_grid(&mut canvas, config.grid_rows, config.grid_cols);
    }

    let regions = select_regions(rng, config.max_objects, config.grid_rows, config.grid_cols);
    let mut objects: BTreeMap<usize, PlacedObject> = BTreeMap::new();

    for (seq, &region) in regions.iter().enumerate() {
        let idx = rng.random_range(0..sources.len());
        let Some((obj, obj_box)) = sources.get(idx) else {
            continue;
        };
        let scale = random_scale(rng, config.max_scale);
        let (candidate, placed) =
            place_object(rng, &canvas, &grid, region, obj, obj_box, scale, seq)?;

        let collides = !config.allow_overlap
            && seq > 0
            && objects
                .values()
                .any(|prev| prev.bbox_px.overlaps(&placed.bbox_px));
        if collides {
            debug!("seq {seq}: region {region} rejected, overlaps an accepted object");
            continue;
        }
        canvas = candidate;
        objects.insert(seq, placed);
    }

    debug!(
        "composed {}x{} with {}/{} objects",
        config.width,
        config.height,
        objects.len(),
        regions.len()
    );
    Ok(Composition { canvas, objects })
}
