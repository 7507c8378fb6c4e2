use crate::av::{CodecData, Packet};
use crate::Result;

pub mod hls;
pub mod ts;

/// What the container asked the caller to do after a packet was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Continue,
    /// The container saw the end of the elementary stream; no more packets
    /// should follow.
    EndOfStream,
}

/// Common trait for container muxers
#[async_trait::async_trait]
pub trait Muxer: Send {
    /// Write the stream header (program tables etc.) to the current output
    async fn write_header(&mut self, stream: &dyn CodecData) -> Result<()>;

    /// Write one access unit whose timestamps are already in the container timebase
    async fn write_packet(&mut self, packet: &Packet) -> Result<WriteStatus>;

    /// Write whatever closes the current output
    async fn write_trailer(&mut self) -> Result<()>;

    /// Flush any buffered bytes to the underlying writer
    async fn flush(&mut self) -> Result<()>;
}

pub use self::ts::TsMuxer;
