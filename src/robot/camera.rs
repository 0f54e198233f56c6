use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::LinkError;
use crate::kernel::event::ImageFrame;

pub trait Camera {
    fn read_frame(&mut self) -> Result<ImageFrame, LinkError>;

    /// Drops `flush` stale frames, then returns a fresh one.
    fn capture(&mut self, flush: usize) -> Result<ImageFrame, LinkError> {
        for _ in 0..flush {
            self.read_frame()?;
        }
        self.read_frame()
    }
}

/// Replays image files from a directory in name order, looping.
pub struct FileCamera {
    frames: Vec<PathBuf>,
    cursor: usize,
}

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

impl FileCamera {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LinkError> {
        let dir = dir.as_ref();
        let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(LinkError::Hardware(format!("no frames in {}", dir.display())));
        }
        info!(target: "camera", dir = %dir.display(), frames = frames.len(), "camera opened");
        Ok(Self { frames, cursor: 0 })
    }
}

impl Camera for FileCamera {
    fn read_frame(&mut self) -> Result<ImageFrame, LinkError> {
        let path = &self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();
        let img = image::open(path)
            .map_err(|e| LinkError::Hardware(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        Ok(ImageFrame::from_rgb(&img))
    }
}
