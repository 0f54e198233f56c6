//! Plant classification from a single camera frame.

pub mod mask;
pub mod pipeline;

use crate::kernel::event::ImageFrame;
use crate::kernel::inventory::Phenotype;

pub use pipeline::{ClassifierConfig, PlantClassifier};

/// Result of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Plant(Phenotype),
    /// Segmentation failed. Never consumes a grab.
    Unknown,
}

/// Seam between the planner and whatever turns a frame into a phenotype.
pub trait Classifier {
    fn classify(&mut self, frame: &ImageFrame) -> Classification;
}

/// Always answers the same thing. Useful for dry runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(pub Classification);

impl Classifier for FixedClassifier {
    fn classify(&mut self, _frame: &ImageFrame) -> Classification {
        self.0
    }
}
