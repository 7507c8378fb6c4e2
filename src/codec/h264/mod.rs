//! # H.264/AVC
//!
//! NAL unit typing, random-access detection, SPS parsing and `avcC`
//! (AVCDecoderConfigurationRecord) unpacking.
//!
//! ```rust
//! use hlsmux::codec::h264;
//!
//! // IDR slice, nal_ref_idc = 3
//! assert!(h264::is_key_nal(0x65));
//! // non-IDR slice
//! assert!(!h264::is_key_nal(0x41));
//! ```

/// SPS parsing and RBSP helpers
pub mod parser;
/// NAL unit types and parsed parameter set fields
pub mod types;

pub use parser::parse_sps;
pub use types::{NalUnitType, SpsInfo};

use crate::error::{MuxError, Result};

pub fn nal_type(header: u8) -> NalUnitType {
    NalUnitType::from(header)
}

/// An IDR slice is the only H.264 random access point a segment may start on.
pub fn is_key_nal(header: u8) -> bool {
    nal_type(header) == NalUnitType::CodedSliceIdr
}

pub fn is_parameter_set(header: u8) -> bool {
    matches!(nal_type(header), NalUnitType::Sps | NalUnitType::Pps)
}

pub fn is_end_of_stream(header: u8) -> bool {
    nal_type(header) == NalUnitType::EndOfStream
}

/// Extracts the SPS and PPS NAL units from an `avcC` record.
pub fn parse_avcc(data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() < 7 || data[0] != 1 {
        return Err(MuxError::Codec("malformed avcC record".into()));
    }
    let mut units = Vec::new();
    let mut pos = 5;

    let sps_count = (data[pos] & 0x1F) as usize;
    pos += 1;
    for _ in 0..sps_count {
        let (unit, next) = read_u16_prefixed(data, pos)?;
        units.push(unit);
        pos = next;
    }

    let pps_count = *data
        .get(pos)
        .ok_or_else(|| MuxError::Codec("avcC record truncated before PPS count".into()))?
        as usize;
    pos += 1;
    for _ in 0..pps_count {
        let (unit, next) = read_u16_prefixed(data, pos)?;
        units.push(unit);
        pos = next;
    }
    Ok(units)
}

pub(crate) fn read_u16_prefixed(data: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let len_bytes = data
        .get(pos..pos + 2)
        .ok_or_else(|| MuxError::Codec("parameter set length truncated".into()))?;
    let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let unit = data
        .get(pos + 2..pos + 2 + len)
        .ok_or_else(|| MuxError::Codec("parameter set truncated".into()))?;
    Ok((unit, pos + 2 + len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nal_classification() {
        assert!(is_key_nal(0x65));
        assert!(is_key_nal(0x25));
        assert!(!is_key_nal(0x41));
        // parameter sets alone are not a random access point
        assert!(!is_key_nal(0x67));
        assert!(is_parameter_set(0x67));
        assert!(is_parameter_set(0x68));
        assert!(is_end_of_stream(0x0B));
        assert_eq!(nal_type(0x09), NalUnitType::AccessUnitDelimiter);
    }

    #[test]
    fn test_parse_avcc() {
        let record = [
            0x01, 0x42, 0xC0, 0x1F, 0xFF, // header, lengthSizeMinusOne = 3
            0xE1, 0x00, 0x03, 0x67, 0x42, 0xC0, // one SPS
            0x01, 0x00, 0x02, 0x68, 0xCE, // one PPS
        ];
        let units = parse_avcc(&record).unwrap();
        assert_eq!(units, vec![&[0x67, 0x42, 0xC0][..], &[0x68, 0xCE][..]]);

        assert!(parse_avcc(&record[..9]).is_err());
        assert!(parse_avcc(&[0x00; 8]).is_err());
    }
}
