//! # H.265/HEVC
//!
//! NAL unit typing for random-access detection and `hvcC`
//! (HEVCDecoderConfigurationRecord) unpacking. Only the pieces the segmenter
//! needs are here; slice and parameter set bodies are not parsed.

/// NAL unit type table
pub mod types;

pub use types::NalUnitType;

use crate::codec::h264::read_u16_prefixed;
use crate::error::{MuxError, Result};

const HVCC_HEADER_LEN: usize = 22;

pub fn is_key_nal(header: u8) -> bool {
    NalUnitType::from_header(header).is_irap()
}

pub fn is_parameter_set(header: u8) -> bool {
    matches!(
        NalUnitType::from_header(header),
        NalUnitType::Vps | NalUnitType::Sps | NalUnitType::Pps
    )
}

pub fn is_end_of_stream(header: u8) -> bool {
    matches!(
        NalUnitType::from_header(header),
        NalUnitType::Eos | NalUnitType::Eob
    )
}

/// Extracts every NAL unit stored in the arrays of an `hvcC` record.
pub fn parse_hvcc(data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() < HVCC_HEADER_LEN + 1 || data[0] != 1 {
        return Err(MuxError::Codec("malformed hvcC record".into()));
    }
    let array_count = data[HVCC_HEADER_LEN] as usize;
    let mut pos = HVCC_HEADER_LEN + 1;
    let mut units = Vec::new();

    for _ in 0..array_count {
        let header = data
            .get(pos..pos + 3)
            .ok_or_else(|| MuxError::Codec("hvcC array header truncated".into()))?;
        let nalu_count = u16::from_be_bytes([header[1], header[2]]) as usize;
        pos += 3;
        for _ in 0..nalu_count {
            let (unit, next) = read_u16_prefixed(data, pos)?;
            units.push(unit);
            pos = next;
        }
    }
    Ok(units)
}
