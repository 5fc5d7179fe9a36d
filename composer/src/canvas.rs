use image::{GrayImage, Luma};
use rand::Rng;

/// Uniform noise in `[0, intensity)`. Intensity 0 gives a black canvas and
/// anything above 256 behaves like 256.
pub fn generate_background<R>(rng: &mut R, height: u32, width: u32, intensity: u16) -> GrayImage
where
    R: Rng + ?Sized,
{
    let bound = intensity.min(256);
    if bound == 0 {
        return GrayImage::new(width, height);
    }
    GrayImage::from_fn(width, height, |_, _| {
        Luma([rng.random_range(0..bound) as u8])
    })
}

/// Blackens rows `floor(h/rows)*i` and columns `floor(w/cols)*j` for the
/// interior grid lines.
pub fn draw_grid(canvas: &mut GrayImage, rows: u32, cols: u32) {
    let (w, h) = canvas.dimensions();
    if rows > 1 {
        let step = h / rows;
        for i in 1..rows {
            let y = step * i;
            if y >= h {
                break;
            }
            for x in 0..w {
                canvas.put_pixel(x, y, Luma([0]));
            }
        }
    }
    if cols > 1 {
        let step = w / cols;
        for j in 1..cols {
            let x = step * j;
            if x >= w {
                break;
            }
            for y in 0..h {
                canvas.put_pixel(x, y, Luma([0]));
            }
        }
    }
}
