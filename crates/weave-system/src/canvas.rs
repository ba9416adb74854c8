/// An 8-bit coverage canvas the system backend rasterizes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major coverage values, one byte per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Combines `coverage` into the pixel, keeping the larger value.
    pub fn blend(&mut self, x: i32, y: i32, coverage: u8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = self.pixels[i].max(coverage);
        }
    }

    /// Copies a `width`-wide coverage bitmap with its top-left corner at
    /// `(x, y)`. Pixels outside the canvas are dropped.
    pub fn blit(&mut self, x: i32, y: i32, width: usize, bitmap: &[u8]) {
        if width == 0 {
            return;
        }
        for (row, line) in bitmap.chunks(width).enumerate() {
            for (col, &coverage) in line.iter().enumerate() {
                self.blend(x + col as i32, y + row as i32, coverage);
            }
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        for row in y..y.saturating_add(height) {
            for col in x..x.saturating_add(width) {
                self.blend(col, row, u8::MAX);
            }
        }
    }

    /// Number of pixels with any coverage.
    pub fn inked(&self) -> usize {
        self.pixels.iter().filter(|&&p| p > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blit_clips() {
        let mut canvas = Canvas::new(4, 4);
        canvas.blit(3, 3, 2, &[10, 20, 30, 40]);
        assert_eq!(canvas.get(3, 3), Some(10));
        assert_eq!(canvas.inked(), 1);
        canvas.blit(-1, 0, 2, &[50, 60]);
        assert_eq!(canvas.get(0, 0), Some(60));
    }

    #[test]
    fn test_blend_keeps_maximum() {
        let mut canvas = Canvas::new(2, 1);
        canvas.blend(0, 0, 200);
        canvas.blend(0, 0, 100);
        assert_eq!(canvas.get(0, 0), Some(200));
        assert_eq!(canvas.get(2, 0), None);
    }

    #[test]
    fn test_fill_rect() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_rect(2, 8, 4, 5);
        assert_eq!(canvas.inked(), 8);
        assert_eq!(canvas.get(5, 9), Some(255));
    }
}
