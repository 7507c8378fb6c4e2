//! Codec-level helpers: NAL framing, random-access detection and
//! out-of-band parameter sets.

pub mod h264;
pub mod h265;
pub mod nal;

use bytes::Bytes;

use crate::av::CodecType;
use crate::error::{MuxError, Result};

pub use nal::{nal_units, to_annexb};

/// Does this access unit contain a random access point?
///
/// Pure function of the bytes: H.264 needs an IDR slice, H.265 any IRAP
/// picture (IDR, CRA, BLA).
pub fn is_key_unit(codec: CodecType, data: &[u8]) -> bool {
    let is_key: fn(u8) -> bool = match codec {
        CodecType::H264 => h264::is_key_nal,
        CodecType::H265 => h265::is_key_nal,
    };
    nal_units(data).iter().any(|unit| is_key(unit[0]))
}

/// Whether the access unit already carries its own parameter sets.
pub fn has_parameter_sets(codec: CodecType, data: &[u8]) -> bool {
    let is_ps: fn(u8) -> bool = match codec {
        CodecType::H264 => h264::is_parameter_set,
        CodecType::H265 => h265::is_parameter_set,
    };
    nal_units(data).iter().any(|unit| is_ps(unit[0]))
}

/// Whether the access unit carries an end-of-stream (or end-of-bitstream) NAL.
pub fn has_end_of_stream(codec: CodecType, data: &[u8]) -> bool {
    let is_end: fn(u8) -> bool = match codec {
        CodecType::H264 => h264::is_end_of_stream,
        CodecType::H265 => h265::is_end_of_stream,
    };
    nal_units(data).iter().any(|unit| is_end(unit[0]))
}

/// Out-of-band parameter sets normalised to Annex B.
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    annexb: Bytes,
    sps: Option<h264::SpsInfo>,
}

impl ParameterSets {
    /// Accepts Annex B, `avcC` or `hvcC`. Empty input yields empty sets.
    pub fn from_extradata(codec: CodecType, data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }

        let units = if nal::starts_with_start_code(data) {
            nal_units(data)
        } else {
            match codec {
                CodecType::H264 => h264::parse_avcc(data)?,
                CodecType::H265 => h265::parse_hvcc(data)?,
            }
        };
        let units: Vec<&[u8]> = units.into_iter().filter(|u| !u.is_empty()).collect();

        let sps = match codec {
            CodecType::H264 => {
                let sps = units
                    .iter()
                    .find(|u| h264::nal_type(u[0]) == h264::NalUnitType::Sps)
                    .ok_or_else(|| MuxError::Codec("H.264 parameter sets carry no SPS".into()))?;
                Some(h264::parse_sps(sps)?)
            }
            CodecType::H265 => {
                if !units
                    .iter()
                    .any(|u| h265::NalUnitType::from_header(u[0]) == h265::NalUnitType::Sps)
                {
                    return Err(MuxError::Codec("H.265 parameter sets carry no SPS".into()));
                }
                None
            }
        };

        Ok(Self {
            annexb: Bytes::from(nal::join_annexb(units)),
            sps,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.annexb.is_empty()
    }

    /// Parameter sets as Annex B bytes, ready to prepend to an access unit.
    pub fn annexb(&self) -> &Bytes {
        &self.annexb
    }

    /// Decoded H.264 SPS fields, when available.
    pub fn sps(&self) -> Option<&h264::SpsInfo> {
        self.sps.as_ref()
    }
}
