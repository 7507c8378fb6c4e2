//! # HTTP Live Streaming segmenter
//!
//! Cuts a live stream of encoded video access units into MPEG-TS segment
//! files at keyframe boundaries and keeps an m3u8 media playlist describing
//! them up to date.
//!
//! - [`MuxerSession`] drives everything from caller `write`/`close` calls
//! - [`SegmentWriter`] owns the one segment file open for writing
//! - [`RotationPolicy`] decides when a keyframe closes the current segment
//! - [`ManifestPublisher`] renders the playlist and replaces it atomically
//! - [`PlaylistWindow`] and [`RetentionManager`] bound a live playlist and
//!   delete segments only once no published playlist refers to them
//! - [`worker::spawn`] moves a session onto its own task
//!
//! ## Example
//!
//! ```rust,no_run
//! use hlsmux::av::{CodecType, Packet, Rational, StreamDescriptor};
//! use hlsmux::config::SessionConfig;
//! use hlsmux::format::hls::MuxerSession;
//!
//! # #[tokio::main]
//! # async fn main() -> hlsmux::Result<()> {
//! let stream = StreamDescriptor::new(CodecType::H264, 1280, 720, Rational::new(30, 1));
//! let config = SessionConfig::new("/var/www/live")
//!     .with_window_capacity(6)
//!     .with_target_duration(4.0);
//!
//! let mut session = MuxerSession::open(stream, config).await?;
//! session
//!     .write(Some(Packet::new(vec![0, 0, 0, 1, 0x65, 0x88]).with_pts(0)))
//!     .await?;
//! let stats = session.close().await?;
//! println!("{} segments", stats.segments_produced);
//! # Ok(())
//! # }
//! ```

pub mod playlist;
pub mod rotation;
pub mod segment;
pub mod session;
pub mod window;
pub mod worker;

pub use playlist::ManifestPublisher;
pub use rotation::{RotationPolicy, SessionState, MIN_FINAL_DURATION, ROTATION_TOLERANCE};
pub use segment::{Segment, SegmentWriter};
pub use session::{MuxerSession, SessionStats};
pub use window::{PlaylistWindow, RetentionManager};
pub use worker::SessionHandle;
