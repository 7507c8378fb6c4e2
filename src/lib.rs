#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # hlsmux - live HLS segmenter
//!
//! `hlsmux` takes encoded H.264/H.265 access units from a decode pipeline and
//! writes them out as HTTP Live Streaming: a directory of MPEG-TS segment
//! files plus an m3u8 media playlist that is republished atomically each time
//! a segment is finished.
//!
//! ## Features
//!
//! - Keyframe-aligned segment rotation against a target duration
//! - Segment durations measured from the container, not from input jitter
//! - Sliding-window (live) or unbounded (VOD) playlists
//! - Old segments deleted only after the playlist stops listing them
//! - Self-contained segments: PAT/PMT and parameter sets in every file
//! - Annex B and length-prefixed (AVCC/HVCC) input
//! - Optional background writer task with a bounded queue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hlsmux::av::{CodecType, Packet, Rational, StreamDescriptor};
//! use hlsmux::config::SessionConfig;
//! use hlsmux::format::hls::MuxerSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = StreamDescriptor::new(CodecType::H264, 1920, 1080, Rational::new(30, 1))
//!         .with_time_base(Rational::new(1, 1000));
//!     let config = SessionConfig::load("hlsmux.toml")?.apply_env()?;
//!
//!     let mut session = MuxerSession::open(stream, config).await?;
//!     # let frames: Vec<(Vec<u8>, i64)> = Vec::new();
//!     for (data, pts_ms) in frames {
//!         session.write(Some(Packet::new(data).with_pts(pts_ms))).await?;
//!     }
//!     session.write(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: stream descriptors, packets, rationals and timestamp translation
//! - `codec`: NAL unit handling, keyframe detection, parameter sets
//! - `format`: the `Muxer` trait, the MPEG-TS muxer and the HLS segmenter
//! - `config`: session configuration from code, TOML or the environment
//! - `error`: error type and `Result` alias
//! - `utils`: bit reader and MPEG-2 CRC32

/// Audio/Video base types and utilities
pub mod av;

/// Codec helpers for H.264 and H.265
pub mod codec;

/// Error types and utilities
pub mod error;

/// Container formats (TS) and HLS segmenting
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{MuxError, Result};
