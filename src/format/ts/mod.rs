//! # MPEG Transport Stream (TS) output
//!
//! A single-program transport stream writer for one H.264 or H.265 video
//! elementary stream, which is what an HLS media segment carries.
//!
//! - PAT/PMT generation with MPEG-2 CRC32
//! - PES packetization with PTS/DTS
//! - PCR on the video PID, random access indicator on keyframes
//! - Continuity counters that carry over when output moves to a new file
//!
//! ## Example
//!
//! ```rust
//! use hlsmux::av::{CodecType, Packet, Rational, StreamDescriptor};
//! use hlsmux::format::{Muxer, ts::{TsMuxer, TS_PACKET_SIZE}};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = StreamDescriptor::new(CodecType::H264, 1280, 720, Rational::new(30, 1));
//! let mut muxer = TsMuxer::new(Vec::new());
//! muxer.write_header(&stream).await?;
//!
//! let idr = Packet::new(vec![0, 0, 0, 1, 0x65, 0x88]).with_pts(0).with_key_flag(true);
//! muxer.write_packet(&idr).await?;
//! muxer.flush().await?;
//! assert_eq!(muxer.get_ref().len() % TS_PACKET_SIZE, 0);
//! # Ok(())
//! # }
//! ```

/// TS muxer implementation for creating MPEG-TS packets
pub mod muxer;

/// PES packet handling
pub mod pes;

/// Core TS types, constants and PSI tables
pub mod types;

pub use muxer::TsMuxer;
pub use pes::{PesHeader, PesPacket};
pub use types::{
    TsHeader, PID_PAT, PID_PMT, PID_VIDEO, PTS_HZ, STREAM_TYPE_H264, STREAM_TYPE_H265,
    TS_PACKET_SIZE,
};
