// src/drawing.rs
use std::fs::File;
use std::path::Path;

use cairo::{Context, Format, ImageSurface};
use tracing::debug;
use weave_system::Canvas;

use crate::constants::{BACKGROUND, INK};
use crate::error::{AppError, AppResult};

/// Wraps the coverage of `canvas` in an A8 cairo surface. Rows are
/// re-packed to cairo's stride.
pub fn coverage_surface(canvas: &Canvas) -> AppResult<ImageSurface> {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    let stride = Format::A8.stride_for_width(canvas.width())?;

    let mut data = vec![0u8; stride as usize * height as usize];
    let row = canvas.width() as usize;
    if row > 0 {
        for (dst, src) in data
            .chunks_mut(stride as usize)
            .zip(canvas.pixels().chunks(row))
        {
            dst[..row].copy_from_slice(src);
        }
    }

    Ok(ImageSurface::create_for_data(
        data,
        Format::A8,
        width,
        height,
        stride,
    )?)
}

/// Composites `canvas` as ink over an opaque background.
pub fn compose(canvas: &Canvas) -> AppResult<ImageSurface> {
    let mask = coverage_surface(canvas)?;
    let surface = ImageSurface::create(Format::Rgb24, mask.width(), mask.height())?;
    {
        let cr = Context::new(&surface)?;
        let (r, g, b) = BACKGROUND;
        cr.set_source_rgb(r, g, b);
        cr.paint()?;

        let (r, g, b) = INK;
        cr.set_source_rgb(r, g, b);
        cr.mask_surface(&mask, 0.0, 0.0)?;
    }
    surface.flush();
    Ok(surface)
}

pub fn write_png(canvas: &Canvas, path: &Path) -> AppResult<()> {
    let surface = compose(canvas)?;
    let mut file = File::create(path)?;
    surface
        .write_to_png(&mut file)
        .map_err(|source| AppError::Png {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        "Wrote {}x{} PNG to {}",
        canvas.width(),
        canvas.height(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_surface_keeps_pixels() {
        let mut canvas = Canvas::new(3, 2);
        canvas.fill_rect(1, 0, 1, 2);

        let mut surface = coverage_surface(&canvas).unwrap();
        let stride = surface.stride() as usize;
        assert!(stride >= 3);

        let data = surface.data().unwrap();
        assert_eq!(&data[..3], &[0, 255, 0]);
        assert_eq!(&data[stride..stride + 3], &[0, 255, 0]);
    }

    #[test]
    fn test_compose_inks_covered_pixels() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(0, 0, 2, 4);

        let mut surface = compose(&canvas).unwrap();
        let stride = surface.stride() as usize;
        let data = surface.data().unwrap();
        // Rgb24 pixels are native-endian u32 with the top byte unused.
        let pixel = |x: usize, y: usize| {
            let at = y * stride + x * 4;
            u32::from_ne_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]) & 0x00FF_FFFF
        };
        assert_eq!(pixel(0, 0), 0x000000);
        assert_eq!(pixel(3, 3), 0xFFFFFF);
    }
}
