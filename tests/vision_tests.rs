use fieldbot::kernel::event::ImageFrame;
use fieldbot::kernel::inventory::{Color, Height, Phenotype};
use fieldbot::vision::mask::{rgb_to_hsv, Hsv, Mask};
use fieldbot::vision::{Classification, Classifier, ClassifierConfig, PlantClassifier};
use image::{Rgb, RgbImage};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
const YELLOW: Rgb<u8> = Rgb([220, 220, 0]);
const BROWN: Rgb<u8> = Rgb([90, 50, 20]);

fn canvas() -> RgbImage {
    RgbImage::from_pixel(80, 80, WHITE)
}

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, color);
        }
    }
}

fn classifier() -> PlantClassifier {
    PlantClassifier::new(ClassifierConfig { tall_threshold: 20 })
}

#[test]
fn test_hsv_uses_opencv_scale() {
    assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
    assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
    assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
    assert_eq!(rgb_to_hsv(255, 255, 255), Hsv { h: 0, s: 0, v: 255 });
    // Test colours land in their bands.
    assert_eq!(rgb_to_hsv(0, 200, 0).h, 60);
    assert_eq!(rgb_to_hsv(220, 220, 0).h, 30);
    let brown = rgb_to_hsv(90, 50, 20);
    assert!(brown.h <= 20 && brown.v <= 102, "{:?}", brown);
}

#[test]
fn test_largest_green_tall() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 20, 40, GREEN);
    fill(&mut img, 50, 10, 10, 10, YELLOW);
    fill(&mut img, 50, 50, 10, 10, BROWN);

    let mut c = classifier();
    assert_eq!(
        c.classify_rgb(&img),
        Classification::Plant(Phenotype::new(Color::Green, Height::Tall))
    );
}

#[test]
fn test_largest_yellow_short() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 40, 10, YELLOW);
    fill(&mut img, 10, 40, 8, 8, GREEN);
    fill(&mut img, 50, 50, 8, 8, BROWN);

    let mut c = classifier();
    assert_eq!(
        c.classify_rgb(&img),
        Classification::Plant(Phenotype::new(Color::Yellow, Height::Short))
    );
}

#[test]
fn test_brown_wins_by_box_area() {
    let mut img = canvas();
    fill(&mut img, 30, 20, 35, 35, BROWN);
    fill(&mut img, 5, 5, 8, 8, GREEN);
    fill(&mut img, 5, 40, 8, 8, YELLOW);

    let mut c = classifier();
    assert_eq!(
        c.classify_rgb(&img),
        Classification::Plant(Phenotype::new(Color::Brown, Height::Tall))
    );
}

#[test]
fn test_tie_goes_to_earlier_colour() {
    // Green and yellow boxes identical, brown smaller.
    let mut img = canvas();
    fill(&mut img, 5, 5, 12, 12, GREEN);
    fill(&mut img, 40, 5, 12, 12, YELLOW);
    fill(&mut img, 5, 50, 8, 8, BROWN);

    let mut c = classifier();
    assert_eq!(
        c.classify_rgb(&img),
        Classification::Plant(Phenotype::new(Color::Green, Height::Short))
    );

    // Yellow and brown identical, green smaller.
    let mut img = canvas();
    fill(&mut img, 5, 5, 8, 8, GREEN);
    fill(&mut img, 40, 5, 12, 12, YELLOW);
    fill(&mut img, 40, 50, 12, 12, BROWN);

    assert_eq!(
        c.classify_rgb(&img),
        Classification::Plant(Phenotype::new(Color::Yellow, Height::Short))
    );
}

#[test]
fn test_missing_colour_is_unknown() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 20, 40, GREEN);
    fill(&mut img, 50, 10, 10, 10, YELLOW);

    let mut c = classifier();
    assert_eq!(c.classify_rgb(&img), Classification::Unknown);
    assert!(c.last_annotated().is_none());
}

#[test]
fn test_single_pixel_speck_does_not_count() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 20, 40, GREEN);
    fill(&mut img, 50, 50, 10, 10, BROWN);
    // A lone yellow pixel is noise, not a plant.
    img.put_pixel(60, 20, YELLOW);

    let mut c = classifier();
    assert_eq!(c.classify_rgb(&img), Classification::Unknown);
}

#[test]
fn test_annotated_copy_has_box() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 20, 40, GREEN);
    fill(&mut img, 50, 10, 10, 10, YELLOW);
    fill(&mut img, 50, 50, 10, 10, BROWN);

    let mut c = classifier();
    c.classify_rgb(&img);
    let annotated = c.last_annotated().expect("annotated frame");
    assert_eq!(annotated.dimensions(), img.dimensions());
    assert_ne!(annotated, &img);
}

#[test]
fn test_classify_frame_through_trait() {
    let mut img = canvas();
    fill(&mut img, 10, 10, 20, 40, GREEN);
    fill(&mut img, 50, 10, 10, 10, YELLOW);
    fill(&mut img, 50, 50, 10, 10, BROWN);

    let mut c = classifier();
    let frame = ImageFrame::from_rgb(&img);
    let classifier: &mut dyn Classifier = &mut c;
    assert_eq!(
        classifier.classify(&frame),
        Classification::Plant(Phenotype::new(Color::Green, Height::Tall))
    );
}

#[test]
fn test_malformed_frame_is_unknown() {
    let frame = ImageFrame {
        width: 10,
        height: 10,
        data: vec![0; 7],
    };
    let mut c = classifier();
    assert_eq!(c.classify(&frame), Classification::Unknown);
}

#[test]
fn test_opening_removes_specks() {
    let mut mask = Mask::new(20, 20);
    mask.set(3, 3, true);
    for y in 8..16 {
        for x in 8..16 {
            mask.set(x, y, true);
        }
    }

    let opened = mask.open();
    assert!(!opened.get(3, 3));
    assert!(opened.get(11, 11));
    assert_eq!(opened.components().len(), 1);
}

#[test]
fn test_closing_fills_pinholes() {
    let mut mask = Mask::new(20, 20);
    for y in 5..15 {
        for x in 5..15 {
            mask.set(x, y, true);
        }
    }
    mask.set(9, 9, false);

    let closed = mask.close();
    assert!(closed.get(9, 9));
}

#[test]
fn test_components_are_eight_connected() {
    let mut mask = Mask::new(10, 10);
    // Diagonal chain: one component.
    mask.set(1, 1, true);
    mask.set(2, 2, true);
    mask.set(3, 3, true);
    // Separate blob.
    mask.set(7, 7, true);
    mask.set(8, 7, true);

    let comps = mask.components();
    assert_eq!(comps.len(), 2);

    let largest = mask.largest_component().expect("component");
    assert_eq!(largest.area, 3);
    assert_eq!((largest.bbox.x, largest.bbox.y), (1, 1));
    assert_eq!((largest.bbox.width, largest.bbox.height), (3, 3));
    assert_eq!(largest.bbox.area(), 9);
}

#[test]
fn test_empty_mask_has_no_component() {
    let mask = Mask::new(10, 10);
    assert_eq!(mask.count(), 0);
    assert!(mask.largest_component().is_none());
}
