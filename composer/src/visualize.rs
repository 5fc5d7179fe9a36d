use std::collections::BTreeMap;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{geom::BoxFormat, placer::PlacedObject};

const DEFAULT_COLORS: [Rgb<u8>; 10] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([255, 225, 25]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
    Rgb([240, 50, 230]),
    Rgb([210, 245, 60]),
    Rgb([250, 190, 212]),
];

/// Class id to outline colour. Classes without an explicit entry cycle
/// through the built-in colours.
#[derive(Clone, Debug, Default)]
pub struct ClassPalette {
    custom: BTreeMap<u32, Rgb<u8>>,
}

impl ClassPalette {
    pub fn insert(&mut self, class: u32, color: Rgb<u8>) {
        self.custom.insert(class, color);
    }

    pub fn color(&self, class: u32) -> Rgb<u8> {
        self.custom
            .get(&class)
            .copied()
            .unwrap_or(DEFAULT_COLORS[class as usize % DEFAULT_COLORS.len()])
    }
}

/// Replicates the grey canvas into RGB and outlines every placement with a
/// one pixel rectangle in its class colour.
pub fn overlay_boxes(
    canvas: &GrayImage,
    objects: &BTreeMap<usize, PlacedObject>,
    palette: &ClassPalette,
) -> RgbImage {
    let mut out = RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let v = canvas.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });
    for obj in objects.values() {
        let b = obj.bbox_px;
        let w = (b.width().round() as u32).max(1);
        let h = (b.height().round() as u32).max(1);
        let rect = Rect::at(b.x_min.round() as i32, b.y_min.round() as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut out, rect, palette.color(obj.class));
    }
    out
}

/// One `<class> v1 v2 v3 v4` line per placement with normalized coordinates
/// in `format`, in placement order.
pub fn label_lines(objects: &BTreeMap<usize, PlacedObject>, format: BoxFormat) -> Vec<String> {
    objects
        .values()
        .map(|obj| {
            let [a, b, c, d] = obj.bbox_norm.encode(format);
            format!("{} {a:.6} {b:.6} {c:.6} {d:.6}", obj.class)
        })
        .collect()
}
