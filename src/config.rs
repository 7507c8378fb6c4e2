use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{MuxError, Result};
use crate::format::hls::ROTATION_TOLERANCE;

/// Everything a segmenting session needs to know about its output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory that receives segments and the playlist.
    pub output_dir: PathBuf,
    /// Segment files are named `{prefix}-{index:04}.{segment_extension}`.
    pub prefix: String,
    pub playlist_name: String,
    pub segment_extension: String,
    /// Number of segments kept in a live playlist; 0 keeps everything (VOD).
    pub window_capacity: usize,
    /// Nominal segment length in seconds.
    pub target_duration: f64,
    /// Prepend the out-of-band parameter sets to the first keyframe of every
    /// segment that lacks them in-band.
    pub repeat_parameter_sets: bool,
    /// Emit `#EXT-X-PROGRAM-DATE-TIME` before each segment.
    pub program_date_time: bool,
    /// Channel depth for the background writer.
    pub queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: String::from("segment"),
            playlist_name: String::from("index.m3u8"),
            segment_extension: String::from("ts"),
            window_capacity: 0,
            target_duration: 10.0,
            repeat_parameter_sets: true,
            program_date_time: false,
            queue_depth: 64,
        }
    }
}

impl SessionConfig {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_owned(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_playlist_name(mut self, name: &str) -> Self {
        self.playlist_name = name.to_string();
        self
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    pub fn with_target_duration(mut self, seconds: f64) -> Self {
        self.target_duration = seconds;
        self
    }

    pub fn with_repeat_parameter_sets(mut self, enabled: bool) -> Self {
        self.repeat_parameter_sets = enabled;
        self
    }

    pub fn with_program_date_time(mut self, enabled: bool) -> Self {
        self.program_date_time = enabled;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Overrides fields from `HLSMUX_*` environment variables.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(dir) = env::var("HLSMUX_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("HLSMUX_PREFIX") {
            self.prefix = prefix;
        }
        if let Ok(window) = env::var("HLSMUX_WINDOW") {
            self.window_capacity = window.trim().parse()?;
        }
        if let Ok(target) = env::var("HLSMUX_TARGET_DURATION") {
            self.target_duration = target.trim().parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(MuxError::Config(format!(
                "segment prefix {:?} must be a non-empty file name",
                self.prefix
            )));
        }
        if self.playlist_name.is_empty() || self.playlist_name.contains(['/', '\\']) {
            return Err(MuxError::Config(format!(
                "playlist name {:?} must be a non-empty file name",
                self.playlist_name
            )));
        }
        if !self.target_duration.is_finite() || self.target_duration <= ROTATION_TOLERANCE {
            return Err(MuxError::Config(format!(
                "target duration must exceed {}s, got {}",
                ROTATION_TOLERANCE, self.target_duration
            )));
        }
        if self.queue_depth == 0 {
            return Err(MuxError::Config("queue depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn segment_filename(&self, index: u64) -> String {
        format!("{}-{:04}.{}", self.prefix, index, self.segment_extension)
    }

    pub fn segment_path(&self, index: u64) -> PathBuf {
        self.output_dir.join(self.segment_filename(index))
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(&self.playlist_name)
    }

    /// Scratch file the playlist is written to before being renamed into place.
    pub fn temp_playlist_path(&self) -> PathBuf {
        self.output_dir.join(format!(".{}.tmp", self.playlist_name))
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# hlsmux session configuration

# Where segments and the playlist are written
output_dir = "./output"

# Segment files are named <prefix>-0001.ts, <prefix>-0002.ts, ...
prefix = "segment"
playlist_name = "index.m3u8"

# Segments kept in the live playlist; 0 keeps all of them (VOD)
window_capacity = 6

# Nominal segment length in seconds
target_duration = 6.0
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
