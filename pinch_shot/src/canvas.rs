//! Software pixel buffer with the few primitives the overlay needs: dots,
//! circles, thick lines and bitmap text.
//!
//! Pixels are packed ARGB (`0xAARRGGBB`), the layout `minifb` expects.  All
//! primitives take signed coordinates and clip silently, since projected
//! joints may land off-screen.

use hand_pinch::{ScreenPoint, ScreenSize};

pub const BLACK: u32 = 0xFF000000;
pub const WHITE: u32 = 0xFFFFFFFF;
pub const YELLOW: u32 = 0xFFFFFF00;
pub const BLUE: u32 = 0xFF0000FF;
pub const GREEN: u32 = 0xFF00FF2C;
pub const RED: u32 = 0xFFFF4040;

/// Glyph cell: 3×5 bitmap plus one column of spacing.
const GLYPH_W: i32 = 3;
const GLYPH_H: i32 = 5;
const GLYPH_ADVANCE: i32 = GLYPH_W + 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(size: ScreenSize, background: u32) -> Self {
        FrameBuffer {
            width: size.width as usize,
            height: size.height as usize,
            pixels: vec![background; size.pixel_count()],
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.pixels }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Number of pixels that are not `background`.
    pub fn count_not(&self, background: u32) -> usize {
        self.pixels.iter().filter(|&&p| p != background).count()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    // ── Circles ───────────────────────────────────────────────────────────

    pub fn fill_circle(&mut self, c: ScreenPoint, r: i32, color: u32) {
        let r2 = r * r;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r2 {
                    self.set_pixel(c.x.saturating_add(dx), c.y.saturating_add(dy), color);
                }
            }
        }
    }

    /// One-pixel outline (midpoint algorithm).
    pub fn draw_circle(&mut self, c: ScreenPoint, r: i32, color: u32) {
        if r <= 0 {
            self.set_pixel(c.x, c.y, color);
            return;
        }
        let (mut x, mut y, mut err) = (r, 0, 1 - r);
        while x >= y {
            for &(px, py) in &[
                (x, y), (y, x), (-y, x), (-x, y),
                (-x, -y), (-y, -x), (y, -x), (x, -y),
            ] {
                self.set_pixel(c.x.saturating_add(px), c.y.saturating_add(py), color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    // ── Lines ─────────────────────────────────────────────────────────────

    /// Bresenham line stamped with a `thickness`-wide square brush.  The
    /// segment is clipped to the buffer first, so far-off endpoints cost
    /// nothing.
    pub fn draw_line(&mut self, a: ScreenPoint, b: ScreenPoint, thickness: i32, color: u32) {
        let thickness = thickness.clamp(1, 64);
        let lo = -(thickness - 1) / 2;
        let hi = lo + thickness;
        let Some((a, b)) = self.clip(a, b, thickness) else { return };
        let (dx, dy) = ((b.x - a.x).abs(), -(b.y - a.y).abs());
        let (sx, sy) = (if a.x < b.x { 1 } else { -1 }, if a.y < b.y { 1 } else { -1 });
        let (mut x, mut y, mut err) = (a.x, a.y, dx + dy);
        loop {
            for oy in lo..hi {
                for ox in lo..hi {
                    self.set_pixel(x + ox, y + oy, color);
                }
            }
            if x == b.x && y == b.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Liang–Barsky clip of `a..b` to the buffer grown by `pad` on each side.
    fn clip(&self, a: ScreenPoint, b: ScreenPoint, pad: i32) -> Option<(ScreenPoint, ScreenPoint)> {
        let (x0, y0) = (a.x as f64, a.y as f64);
        let (dx, dy) = (b.x as f64 - x0, b.y as f64 - y0);
        let pad = pad as f64;
        let (xmin, ymin) = (-pad, -pad);
        let (xmax, ymax) = (self.width as f64 - 1.0 + pad, self.height as f64 - 1.0 + pad);

        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for (p, q) in [(-dx, x0 - xmin), (dx, xmax - x0), (-dy, y0 - ymin), (dy, ymax - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    t0 = t0.max(t);
                } else {
                    t1 = t1.min(t);
                }
            }
        }
        if t0 > t1 {
            return None;
        }
        let at = |t: f64| ScreenPoint::new((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
        Some((at(t0), at(t1)))
    }

    // ── Text ──────────────────────────────────────────────────────────────

    /// Width in pixels of `text` at `scale`.
    pub fn text_width(text: &str, scale: i32) -> i32 {
        text.chars().count() as i32 * GLYPH_ADVANCE * scale
    }

    pub fn text_height(scale: i32) -> i32 {
        GLYPH_H * scale
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, scale: i32, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            self.set_pixel(
                                cx + col * scale + sx,
                                y + row as i32 * scale + sy,
                                color,
                            );
                        }
                    }
                }
            }
            cx += GLYPH_ADVANCE * scale;
            if cx >= self.width as i32 {
                break;
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
