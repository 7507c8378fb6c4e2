use std::borrow::Cow;

const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// How the NAL units of an access unit are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalFraming {
    /// `00 00 01` / `00 00 00 01` start codes.
    AnnexB,
    /// 4-byte big-endian length prefixes (AVCC / HVCC sample format).
    LengthPrefixed,
    /// A single bare NAL unit.
    Raw,
}

pub fn starts_with_start_code(data: &[u8]) -> bool {
    data.starts_with(&[0x00, 0x00, 0x01]) || data.starts_with(&START_CODE)
}

/// Length prefixes of 1 and 256..=511 read like start codes, so an access
/// unit that splits exactly into length-prefixed NAL units is taken as such.
pub fn detect_framing(data: &[u8]) -> NalFraming {
    if split_length_prefixed(data).is_some() {
        NalFraming::LengthPrefixed
    } else if starts_with_start_code(data) {
        NalFraming::AnnexB
    } else {
        NalFraming::Raw
    }
}

/// Splits an access unit into NAL unit payloads (header byte first).
pub fn nal_units(data: &[u8]) -> Vec<&[u8]> {
    match detect_framing(data) {
        NalFraming::AnnexB => split_annexb(data),
        NalFraming::LengthPrefixed => split_length_prefixed(data).unwrap_or_default(),
        NalFraming::Raw if data.is_empty() => Vec::new(),
        NalFraming::Raw => vec![data],
    }
}

fn split_annexb(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            starts.push((i, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut units = Vec::with_capacity(starts.len());
    for (n, &(_, begin)) in starts.iter().enumerate() {
        let mut end = starts.get(n + 1).map(|&(code, _)| code).unwrap_or(data.len());
        // trailing_zero_8bits and the leading zero of a 4-byte start code
        while end > begin && data[end - 1] == 0 {
            end -= 1;
        }
        if end > begin {
            units.push(&data[begin..end]);
        }
    }
    units
}

fn split_length_prefixed(data: &[u8]) -> Option<Vec<&[u8]>> {
    let mut units = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        if rest.len() < 4 {
            return None;
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len == 0 || len > rest.len() - 4 || rest[4] & 0x80 != 0 {
            return None;
        }
        units.push(&rest[4..4 + len]);
        rest = &rest[4 + len..];
    }
    (!units.is_empty()).then_some(units)
}

/// Returns the access unit in Annex B framing, copying only when needed.
pub fn to_annexb(data: &[u8]) -> Cow<'_, [u8]> {
    match detect_framing(data) {
        NalFraming::AnnexB => Cow::Borrowed(data),
        _ => Cow::Owned(join_annexb(nal_units(data))),
    }
}

pub fn join_annexb<'a>(units: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in units {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(unit);
    }
    out
}
