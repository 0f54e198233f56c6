use image::{Rgb, RgbImage};
use tracing::{debug, warn};

use super::mask::{median_blur, BoundingBox, HsvImage, HsvRange, Mask};
use super::{Classification, Classifier};
use crate::kernel::event::ImageFrame;
use crate::kernel::inventory::{Color, Height, Phenotype};

const BLUR_KSIZE: u32 = 5;
const BOX_THICKNESS: u32 = 2;

const GREEN: [HsvRange; 1] = [HsvRange::new([45, 0, 0], [75, 255, 255])];
const YELLOW: [HsvRange; 1] = [HsvRange::new([15, 0, 0], [45, 255, 255])];
// Brown wraps around the hue circle, so it is two dark bands unioned.
const BROWN: [HsvRange; 2] = [
    HsvRange::new([0, 0, 0], [20, 255, 102]),
    HsvRange::new([150, 0, 0], [180, 255, 102]),
];

fn ranges(color: Color) -> &'static [HsvRange] {
    match color {
        Color::Green => &GREEN,
        Color::Yellow => &YELLOW,
        Color::Brown => &BROWN,
    }
}

fn box_color(color: Color) -> Rgb<u8> {
    match color {
        Color::Green => Rgb([0, 255, 0]),
        Color::Yellow => Rgb([255, 255, 0]),
        Color::Brown => Rgb([115, 87, 0]),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Bounding boxes at least this many pixels tall are `Tall`.
    pub tall_threshold: u32,
}

/// Largest blob per colour mask, before the winner is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub color: Color,
    pub bbox: BoundingBox,
}

/// Colour-mask plant classifier.
///
/// Blur, threshold into three colour masks, open then close each mask, keep the
/// largest component per mask. The colour whose bounding box covers the most
/// area wins; its box height decides tall vs short.
pub struct PlantClassifier {
    config: ClassifierConfig,
    last_annotated: Option<RgbImage>,
}

impl PlantClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            last_annotated: None,
        }
    }

    /// Diagnostic copy of the last classified frame with the winning box drawn in.
    pub fn last_annotated(&self) -> Option<&RgbImage> {
        self.last_annotated.as_ref()
    }

    /// One segment per colour, in enumeration order, or None if any mask is empty.
    pub fn segment(&self, img: &RgbImage) -> Option<Vec<Segment>> {
        let blurred = median_blur(img, BLUR_KSIZE);
        let hsv = HsvImage::from_rgb(&blurred);

        let mut segments = Vec::with_capacity(Color::ALL.len());
        for color in Color::ALL {
            let raw = ranges(color)
                .iter()
                .map(|r| Mask::in_range(&hsv, *r))
                .reduce(|a, b| a.union(&b))?;
            let cleaned = raw.open().close();

            match cleaned.largest_component() {
                Some(c) => segments.push(Segment { color, bbox: c.bbox }),
                None => {
                    debug!(target: "vision", ?color, "no contour in mask");
                    return None;
                }
            }
        }
        Some(segments)
    }

    pub fn classify_rgb(&mut self, img: &RgbImage) -> Classification {
        let segments = match self.segment(img) {
            Some(s) => s,
            None => {
                warn!(target: "vision", "segmentation failed, plant unknown");
                return Classification::Unknown;
            }
        };

        // Strict `>` keeps the earlier colour on ties.
        let mut winner = segments[0];
        for seg in &segments[1..] {
            if seg.bbox.area() > winner.bbox.area() {
                winner = *seg;
            }
        }

        let height = if winner.bbox.height >= self.config.tall_threshold {
            Height::Tall
        } else {
            Height::Short
        };

        let mut annotated = img.clone();
        draw_box(&mut annotated, winner.bbox, box_color(winner.color), BOX_THICKNESS);
        self.last_annotated = Some(annotated);

        debug!(
            target: "vision",
            color = ?winner.color,
            ?height,
            box_w = winner.bbox.width,
            box_h = winner.bbox.height,
            "classified"
        );
        Classification::Plant(Phenotype::new(winner.color, height))
    }
}

impl Classifier for PlantClassifier {
    fn classify(&mut self, frame: &ImageFrame) -> Classification {
        match frame.to_rgb() {
            Ok(img) => self.classify_rgb(&img),
            Err(e) => {
                warn!(target: "vision", "unusable frame: {}", e);
                Classification::Unknown
            }
        }
    }
}

/// Rectangle outline, clipped to the image.
pub fn draw_box(img: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>, thickness: u32) {
    if bbox.width == 0 || bbox.height == 0 {
        return;
    }
    let x1 = bbox.x + bbox.width - 1;
    let y1 = bbox.y + bbox.height - 1;

    for y in bbox.y..=y1 {
        for x in bbox.x..=x1 {
            let edge = x < bbox.x + thickness
                || x + thickness > x1
                || y < bbox.y + thickness
                || y + thickness > y1;
            if edge && x < img.width() && y < img.height() {
                img.put_pixel(x, y, color);
            }
        }
    }
}
