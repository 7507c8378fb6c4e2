use log::{debug, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::fs;

use super::segment::Segment;

/// Segments currently listed in the playlist, oldest first.
///
/// `end_index - begin_index + 1` always equals the number of retained
/// segments, which never exceeds `capacity` once [`PlaylistWindow::evict`]
/// has run. A capacity of 0 keeps every segment.
#[derive(Debug, Clone)]
pub struct PlaylistWindow {
    segments: VecDeque<Segment>,
    begin_index: u64,
    end_index: u64,
    capacity: usize,
}

impl PlaylistWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: VecDeque::new(),
            begin_index: 1,
            end_index: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live playlists carry a media sequence number, VOD ones do not.
    pub fn is_sliding(&self) -> bool {
        self.capacity > 0
    }

    pub fn begin_index(&self) -> u64 {
        self.begin_index
    }

    pub fn end_index(&self) -> u64 {
        self.end_index
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Longest retained segment, in seconds.
    pub fn max_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).fold(0.0, f64::max)
    }

    /// Appends a finished segment. Indices must follow on from `end_index`.
    pub fn push(&mut self, segment: Segment) {
        debug_assert_eq!(segment.index, self.end_index + 1);
        if self.segments.is_empty() {
            self.begin_index = segment.index;
        }
        self.end_index = segment.index;
        self.segments.push_back(segment);
    }

    /// Drops the oldest segment once the window holds more than `capacity`.
    ///
    /// The returned file may still be listed in the last published playlist;
    /// hand it to a [`RetentionManager`] rather than deleting it here.
    pub fn evict(&mut self) -> Option<PathBuf> {
        if self.capacity == 0 || self.segments.len() <= self.capacity {
            return None;
        }
        let oldest = self.segments.pop_front()?;
        self.begin_index = oldest.index + 1;
        debug!("Segment {} left the playlist window", oldest.index);
        Some(oldest.path)
    }
}

/// Deletes evicted segment files once a playlist without them is live.
#[derive(Debug, Default)]
pub struct RetentionManager {
    pending: Vec<PathBuf>,
}

impl RetentionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a file for deletion after the next successful publish.
    pub fn schedule(&mut self, path: PathBuf) {
        self.pending.push(path);
    }

    pub fn pending(&self) -> &[PathBuf] {
        &self.pending
    }

    /// Deletes every queued file. Returns how many could not be removed.
    ///
    /// Must only run after a publish that no longer lists them succeeded.
    pub async fn purge(&mut self) -> usize {
        let mut failures = 0;
        for path in self.pending.drain(..) {
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Deleted segment {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to delete segment {}: {}", path.display(), e);
                    failures += 1;
                }
            }
        }
        failures
    }
}
