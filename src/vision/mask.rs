//! Binary masks over a frame and the handful of image operations the
//! classifier needs: median blur, HSV thresholding, 3x3 cross morphology and
//! 8-connected component labelling.

use image::RgbImage;
use std::collections::VecDeque;

/// Hue in 0..=180, saturation and value in 0..=255 (the 8-bit OpenCV scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: (h / 2.0).round().min(180.0) as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}

#[derive(Debug, Clone)]
pub struct HsvImage {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Hsv>,
}

impl HsvImage {
    pub fn from_rgb(img: &RgbImage) -> Self {
        let pixels = img
            .pixels()
            .map(|p| rgb_to_hsv(p[0], p[1], p[2]))
            .collect();
        Self {
            width: img.width(),
            height: img.height(),
            pixels,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Hsv {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Inclusive per-channel bounds, like `cv2.inRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, px: Hsv) -> bool {
        let v = [px.h, px.s, px.v];
        (0..3).all(|i| v[i] >= self.lower[i] && v[i] <= self.upper[i])
    }
}

/// Median filter with a square `ksize` window, edges replicated.
pub fn median_blur(img: &RgbImage, ksize: u32) -> RgbImage {
    let radius = (ksize / 2) as i64;
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut out = img.clone();
    let mut window: Vec<u8> = Vec::with_capacity((ksize * ksize) as usize);

    for y in 0..h {
        for x in 0..w {
            let mut px = [0u8; 3];
            for (c, slot) in px.iter_mut().enumerate() {
                window.clear();
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let sx = (x + dx).clamp(0, w - 1) as u32;
                        let sy = (y + dy).clamp(0, h - 1) as u32;
                        window.push(img.get_pixel(sx, sy)[c]);
                    }
                }
                window.sort_unstable();
                *slot = window[window.len() / 2];
            }
            out.put_pixel(x as u32, y as u32, image::Rgb(px));
        }
    }
    out
}

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Pixel count.
    pub area: usize,
    pub bbox: BoundingBox,
}

// 3x3 elliptical structuring element is a cross.
const CROSS: [(i64, i64); 5] = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)];

const NEIGHBORS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub fn in_range(img: &HsvImage, range: HsvRange) -> Self {
        let mut mask = Self::new(img.width, img.height);
        for y in 0..img.height {
            for x in 0..img.width {
                if range.contains(img.get(x, y)) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.bits[(y * self.width + x) as usize] = on;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn union(&self, other: &Mask) -> Mask {
        let bits = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| *a || *b)
            .collect();
        Mask {
            width: self.width,
            height: self.height,
            bits,
        }
    }

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    // Out-of-frame neighbours are ignored by both erode and dilate.
    fn hood(&self, x: u32, y: u32) -> impl Iterator<Item = bool> + '_ {
        CROSS
            .iter()
            .map(move |(dx, dy)| (x as i64 + dx, y as i64 + dy))
            .filter(move |(nx, ny)| self.in_bounds(*nx, *ny))
            .map(move |(nx, ny)| self.get(nx as u32, ny as u32))
    }

    pub fn erode(&self) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(x, y, self.hood(x, y).all(|b| b));
            }
        }
        out
    }

    pub fn dilate(&self) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(x, y, self.hood(x, y).any(|b| b));
            }
        }
        out
    }

    /// Erode then dilate: drops specks.
    pub fn open(&self) -> Mask {
        self.erode().dilate()
    }

    /// Dilate then erode: fills pinholes.
    pub fn close(&self) -> Mask {
        self.dilate().erode()
    }

    /// 8-connected components in scan order.
    pub fn components(&self) -> Vec<Component> {
        let mut seen = vec![false; self.bits.len()];
        let mut found = Vec::new();
        let mut queue = VecDeque::new();

        for start_y in 0..self.height {
            for start_x in 0..self.width {
                let idx = (start_y * self.width + start_x) as usize;
                if !self.bits[idx] || seen[idx] {
                    continue;
                }

                seen[idx] = true;
                queue.push_back((start_x, start_y));
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (start_x, start_y, start_x, start_y);
                let mut area = 0usize;

                while let Some((x, y)) = queue.pop_front() {
                    area += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);

                    for (dx, dy) in NEIGHBORS_8 {
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        if !self.in_bounds(nx, ny) {
                            continue;
                        }
                        let n = (ny as u32 * self.width + nx as u32) as usize;
                        if self.bits[n] && !seen[n] {
                            seen[n] = true;
                            queue.push_back((nx as u32, ny as u32));
                        }
                    }
                }

                found.push(Component {
                    area,
                    bbox: BoundingBox {
                        x: min_x,
                        y: min_y,
                        width: max_x - min_x + 1,
                        height: max_y - min_y + 1,
                    },
                });
            }
        }
        found
    }

    /// Largest by pixel count; the first one found wins a tie.
    pub fn largest_component(&self) -> Option<Component> {
        self.components()
            .into_iter()
            .fold(None, |best: Option<Component>, c| match best {
                Some(b) if b.area >= c.area => Some(b),
                _ => Some(c),
            })
    }
}
