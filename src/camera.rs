use crate::ScreenSize;
use crate::grid::Grid;

/// Hex values of braille dots
///
/// ```text
///  1   8
///  2  10
///  4  20
/// 40  80
/// ```
///
/// Where the base blank pattern is codepoint `0x2800` (or U+2800)
///
/// To get other configurations, just add the numbers above.
const BRAILLE_EMPTY: u32 = 0x2800;

/// `DOTS[y][x]` is the bit of dot `(x, y)` inside a single braille character.
const DOTS: [[u32; 2]; 4] = [[0x1, 0x8], [0x2, 0x10], [0x4, 0x20], [0x40, 0x80]];

/// Cells at least this many dots wide get a one dot margin, which is where grid lines go.
const MARGIN_MIN_SCALE: usize = 3;

/// A terminal framebuffer. Each character packs a 2x4 block of dots, so a terminal of `cols` by
/// `rows` characters holds `2 * cols` by `4 * rows` dots.
pub struct Camera {
    /// The dot buffer, row-major
    db: Vec<bool>,

    /// The frame buffer.
    fb: String,

    /// Width of the dot buffer
    w: usize,

    /// Height of the dot buffer
    h: usize,
}

impl Camera {
    pub fn new(cols: ScreenSize, rows: ScreenSize) -> Self {
        let (w, h) = (2 * cols as usize, 4 * rows as usize);

        // Each braille character is 3 bytes in UTF-8, plus one newline per line
        let fb = String::with_capacity(3 * (cols as usize) * (rows as usize) + rows as usize);

        Self {
            db: vec![false; w * h],
            fb,
            w,
            h,
        }
    }

    /// Width in dots
    pub fn width(&self) -> usize {
        self.w
    }

    /// Height in dots
    pub fn height(&self) -> usize {
        self.h
    }

    pub fn resize(&mut self, cols: ScreenSize, rows: ScreenSize) {
        *self = Self::new(cols, rows);
    }

    /// Reset the dot buffer
    pub fn reset(&mut self) {
        self.db.fill(false);
    }

    /// Turns on a single dot
    pub fn draw_pixel(&mut self, x: usize, y: usize) {
        assert!(x < self.w, "x is out of bounds");
        assert!(y < self.h, "y is out of bounds");

        self.db[y * self.w + x] = true;
    }

    /// Largest whole number of dots per cell side that fits a `grid_w` by `grid_h` grid on
    /// screen. Never less than one, in which case the grid gets cropped.
    pub fn fit(&self, grid_w: usize, grid_h: usize) -> usize {
        let sx = self.w / grid_w.max(1);
        let sy = self.h / grid_h.max(1);

        sx.min(sy).max(1)
    }

    /// Whether every cell of a `grid_w` by `grid_h` grid gets at least one dot.
    pub fn fits(&self, grid_w: usize, grid_h: usize) -> bool {
        grid_w <= self.w && grid_h <= self.h
    }

    /// Draw the current generation of `grid`, each cell a `scale` by `scale` square. Anything
    /// that falls off the framebuffer is dropped.
    pub fn draw_grid(&mut self, grid: &Grid, scale: usize, gridlines: bool) {
        let scale = scale.max(1);
        let margin = usize::from(scale >= MARGIN_MIN_SCALE);

        if gridlines && margin > 0 {
            self.draw_gridlines(grid.width(), grid.height(), scale);
        }

        for (x, y) in grid.live_cells() {
            let (ox, oy) = (x * scale, y * scale);

            for dy in margin..scale {
                for dx in margin..scale {
                    self.plot(ox + dx, oy + dy);
                }
            }
        }
    }

    fn draw_gridlines(&mut self, grid_w: usize, grid_h: usize, scale: usize) {
        let (pw, ph) = (grid_w * scale, grid_h * scale);

        for gx in 0..=grid_w {
            for y in 0..=ph {
                self.plot(gx * scale, y);
            }
        }

        for gy in 0..=grid_h {
            for x in 0..=pw {
                self.plot(x, gy * scale);
            }
        }
    }

    fn plot(&mut self, x: usize, y: usize) {
        if x < self.w && y < self.h {
            self.db[y * self.w + x] = true;
        }
    }

    /// Pack the dot buffer into braille characters, one line of text per 4 rows of dots.
    pub fn render(&mut self) -> &str {
        let (bw, bh) = (self.w.div_ceil(2), self.h.div_ceil(4));

        self.fb.clear();

        for by in 0..bh {
            for bx in 0..bw {
                let mut cp = BRAILLE_EMPTY;

                for (dy, bits) in DOTS.iter().enumerate() {
                    for (dx, bit) in bits.iter().enumerate() {
                        let (x, y) = (2 * bx + dx, 4 * by + dy);

                        if x < self.w && y < self.h && self.db[y * self.w + x] {
                            cp += bit;
                        }
                    }
                }

                // every codepoint in U+2800..=U+28FF is a valid char
                self.fb.push(char::from_u32(cp).unwrap_or(' '));
            }

            self.fb.push('\n');
        }

        &self.fb
    }
}
