use bytes::Bytes;

use crate::error::{MuxError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    H264,
    H265,
}

impl CodecType {
    /// MPEG-TS `stream_type` for this codec.
    pub fn stream_type(&self) -> u8 {
        match self {
            CodecType::H264 => crate::format::ts::STREAM_TYPE_H264,
            CodecType::H265 => crate::format::ts::STREAM_TYPE_H265,
        }
    }
}

/// Read-only view of a video stream's parameters, as seen by a muxer.
pub trait CodecData: Send + Sync {
    fn codec_type(&self) -> CodecType;
    fn width(&self) -> Option<u32>;
    fn height(&self) -> Option<u32>;
    fn extra_data(&self) -> Option<&[u8]>;
}

/// Stream parameters handed over by the decode pipeline when a session opens.
///
/// Immutable for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub codec: CodecType,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub aspect_ratio: Rational,
    /// Timebase of the pts/dts/duration values carried by incoming packets.
    pub time_base: Rational,
    /// Out-of-band parameter sets (Annex B, `avcC` or `hvcC`). May be empty.
    pub parameter_sets: Bytes,
}

impl StreamDescriptor {
    pub fn new(codec: CodecType, width: u32, height: u32, frame_rate: Rational) -> Self {
        Self {
            codec,
            width,
            height,
            frame_rate,
            aspect_ratio: Rational::new(1, 1),
            time_base: Rational::new(1, 90_000),
            parameter_sets: Bytes::new(),
        }
    }

    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: Rational) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_parameter_sets(mut self, data: impl Into<Bytes>) -> Self {
        self.parameter_sets = data.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.frame_rate.is_positive() {
            return Err(MuxError::InvalidData(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !self.time_base.is_positive() {
            return Err(MuxError::InvalidData(format!(
                "time base must be positive, got {}",
                self.time_base
            )));
        }
        Ok(())
    }
}

impl CodecData for StreamDescriptor {
    fn codec_type(&self) -> CodecType {
        self.codec
    }

    fn width(&self) -> Option<u32> {
        (self.width > 0).then_some(self.width)
    }

    fn height(&self) -> Option<u32> {
        (self.height > 0).then_some(self.height)
    }

    fn extra_data(&self) -> Option<&[u8]> {
        (!self.parameter_sets.is_empty()).then_some(&self.parameter_sets[..])
    }
}

mod packet;
mod timebase;
pub use packet::*;
pub use timebase::*;
