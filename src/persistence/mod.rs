pub mod store;

pub use store::{EventRecord, EventSink, JsonlEventStore, NullSink};
