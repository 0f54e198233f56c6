use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Yellow,
    Brown,
}

impl Color {
    /// Enumeration order doubles as the classifier's tie-break order.
    pub const ALL: [Color; 3] = [Color::Green, Color::Yellow, Color::Brown];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Height {
    Short,
    Tall,
}

/// A (color, height) plant type. There are exactly six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Phenotype {
    pub color: Color,
    pub height: Height,
}

impl Phenotype {
    pub const ALL: [Phenotype; 6] = [
        Phenotype::new(Color::Green, Height::Short),
        Phenotype::new(Color::Green, Height::Tall),
        Phenotype::new(Color::Yellow, Height::Short),
        Phenotype::new(Color::Yellow, Height::Tall),
        Phenotype::new(Color::Brown, Height::Short),
        Phenotype::new(Color::Brown, Height::Tall),
    ];

    pub const fn new(color: Color, height: Height) -> Self {
        Self { color, height }
    }

    fn index(&self) -> usize {
        let c = match self.color {
            Color::Green => 0,
            Color::Yellow => 1,
            Color::Brown => 2,
        };
        let h = match self.height {
            Height::Short => 0,
            Height::Tall => 1,
        };
        c * 2 + h
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.color, self.height)
    }
}

/// Phenotype -> "already collected". Only ever flips false -> true until reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedInventory {
    collected: [bool; 6],
}

impl CollectedInventory {
    pub fn is_collected(&self, p: Phenotype) -> bool {
        self.collected[p.index()]
    }

    /// Returns true if this call flipped the entry.
    pub fn mark(&mut self, p: Phenotype) -> bool {
        let slot = &mut self.collected[p.index()];
        let newly = !*slot;
        *slot = true;
        newly
    }

    pub fn count(&self) -> usize {
        self.collected.iter().filter(|c| **c).count()
    }
}

/// One logged plant encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sighting {
    pub row: u32,
    pub slot: u32,
    pub color: Color,
    pub height: Height,
}

impl Sighting {
    pub fn new(row: u32, slot: u32, phenotype: Phenotype) -> Self {
        Self {
            row,
            slot,
            color: phenotype.color,
            height: phenotype.height,
        }
    }

    pub fn phenotype(&self) -> Phenotype {
        Phenotype::new(self.color, self.height)
    }
}

/// Collected inventory plus the sighting log.
///
/// The inventory gates grabs per phenotype. The log dedupes exact
/// (row, slot, color, height) tuples and never suppresses a grab on its own.
#[derive(Debug, Clone, Default)]
pub struct InventoryTracker {
    collected: CollectedInventory,
    sightings: Vec<Sighting>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new_phenotype(&self, p: Phenotype) -> bool {
        !self.collected.is_collected(p)
    }

    pub fn mark_collected(&mut self, p: Phenotype) {
        self.collected.mark(p);
    }

    pub fn has_sighting(&self, sighting: &Sighting) -> bool {
        self.sightings.contains(sighting)
    }

    /// Appends the tuple if it has never been seen. Returns whether it was new.
    pub fn record_sighting(&mut self, row: u32, slot: u32, color: Color, height: Height) -> bool {
        let sighting = Sighting {
            row,
            slot,
            color,
            height,
        };
        if self.has_sighting(&sighting) {
            return false;
        }
        self.sightings.push(sighting);
        true
    }

    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    pub fn collected(&self) -> &CollectedInventory {
        &self.collected
    }

    pub fn reset(&mut self) {
        self.collected = CollectedInventory::default();
        self.sightings.clear();
    }
}
