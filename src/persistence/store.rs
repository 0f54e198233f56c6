use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

use crate::bridge::protocol::Message;
use crate::error::StoreError;
use crate::kernel::action::Action;
use crate::kernel::event::{EndSignal, Pass, Telemetry};

/// Request as archived: sensor flags and frame shape, no pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub last_action: Option<Action>,
    pub at_end: EndSignal,
    pub at_plant: u32,
    pub pass: Pass,
    pub image: Option<FrameShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl From<&Telemetry> for RequestSummary {
    fn from(t: &Telemetry) -> Self {
        Self {
            last_action: t.last_action,
            at_end: t.at_end,
            at_plant: t.at_plant,
            pass: t.pass,
            image: t.image.as_ref().map(|f| FrameShape {
                width: f.width,
                height: f.height,
            }),
        }
    }
}

/// One planning step, as handed to the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub session: Uuid,
    pub step: u64,
    pub request: RequestSummary,
    pub response: Message,
    pub time: Timestamp,
}

impl EventRecord {
    pub fn new(session: Uuid, step: u64, telemetry: &Telemetry, action: Action) -> Self {
        Self {
            session,
            step,
            request: RequestSummary::from(telemetry),
            response: Message::response(action),
            time: Timestamp::now(),
        }
    }
}

/// Fire-and-forget archive of (request, response) pairs.
pub trait EventSink {
    fn store(&mut self, record: &EventRecord) -> Result<(), StoreError>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn store(&mut self, _record: &EventRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Appends records as JSON lines to `<root>/<bucket>/<collection>.jsonl`,
/// where the bucket is the record time formatted with a strftime pattern.
#[derive(Debug, Clone)]
pub struct JsonlEventStore {
    root: PathBuf,
    bucket_format: String,
    collection: String,
}

impl JsonlEventStore {
    pub fn new(root: impl Into<PathBuf>, bucket_format: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket_format: bucket_format.into(),
            collection: collection.into(),
        }
    }

    pub fn bucket_for(&self, time: Timestamp) -> Result<String, StoreError> {
        let zoned = time.to_zoned(TimeZone::system());
        jiff::fmt::strtime::format(&self.bucket_format, &zoned)
            .map_err(|e| StoreError::Bucket(e.to_string()))
    }

    pub fn path_for(&self, time: Timestamp) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(self.bucket_for(time)?)
            .join(format!("{}.jsonl", self.collection)))
    }
}

impl EventSink for JsonlEventStore {
    fn store(&mut self, record: &EventRecord) -> Result<(), StoreError> {
        let path = self.path_for(record.time)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
