use bytes::{BufMut, BytesMut};

use crate::utils::Crc32Mpeg2;

// Stream IDs
pub const STREAM_ID_VIDEO: u8 = 0xe0;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_PMT: u16 = 0x1000;
pub const PID_VIDEO: u16 = 0x0100;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary Stream Types
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
pub const SYNC_BYTE: u8 = 0x47;
pub const PTS_HZ: i64 = 90_000;
pub const PROGRAM_NUMBER: u16 = 1;
pub const TRANSPORT_STREAM_ID: u16 = 1;

/// 4-byte transport packet header.
#[derive(Debug, Default, Clone, Copy)]
pub struct TsHeader {
    pub payload_unit_start: bool,
    pub pid: u16,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl TsHeader {
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(SYNC_BYTE);

        let mut b1 = ((self.pid >> 8) & 0x1f) as u8;
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        buf.put_u8(b1);
        buf.put_u8((self.pid & 0xff) as u8);

        let mut b3 = self.continuity_counter & 0x0f;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        buf.put_u8(b3);
    }
}

/// Writes the 6-byte PCR field: 33-bit base, 6 reserved bits, 9-bit extension.
pub fn write_pcr(buf: &mut BytesMut, base: u64, extension: u16) {
    let base = base & 0x1_FFFF_FFFF;
    let extension = (extension & 0x1ff) as u64;
    let value = (base << 15) | (0x3f << 9) | extension;
    buf.put_u16((value >> 32) as u16);
    buf.put_u32(value as u32);
}

/// Program association table with a single program.
pub fn pat_section() -> BytesMut {
    let mut body = BytesMut::new();
    body.put_u16(PROGRAM_NUMBER);
    body.put_u16(0xe000 | PID_PMT);
    psi_section(TABLE_ID_PAT, TRANSPORT_STREAM_ID, &body)
}

/// Program map table describing the single video elementary stream.
pub fn pmt_section(stream_type: u8) -> BytesMut {
    let mut body = BytesMut::new();
    body.put_u16(0xe000 | PID_VIDEO); // PCR PID
    body.put_u16(0xf000); // program_info_length = 0
    body.put_u8(stream_type);
    body.put_u16(0xe000 | PID_VIDEO);
    body.put_u16(0xf000); // ES_info_length = 0
    psi_section(TABLE_ID_PMT, PROGRAM_NUMBER, &body)
}

/// Wraps a table body in the long-form section syntax and appends the CRC.
fn psi_section(table_id: u8, table_id_extension: u16, body: &[u8]) -> BytesMut {
    // table_id_extension .. last_section_number, body, CRC
    let section_length = 5 + body.len() + 4;
    let mut section = BytesMut::with_capacity(3 + section_length);
    section.put_u8(table_id);
    section.put_u16(0xb000 | (section_length as u16 & 0x03ff));
    section.put_u16(table_id_extension);
    section.put_u8(0xc1); // version 0, current_next_indicator
    section.put_u8(0); // section_number
    section.put_u8(0); // last_section_number
    section.put_slice(body);
    let crc = Crc32Mpeg2::calculate(&section);
    section.put_u32(crc);
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pat_section_layout() {
        let pat = pat_section();
        assert_eq!(
            &pat[..12],
            &[0x00, 0xb0, 0x0d, 0x00, 0x01, 0xc1, 0x00, 0x00, 0x00, 0x01, 0xf0, 0x00]
        );
        assert_eq!(pat.len(), 16);
        assert_eq!(Crc32Mpeg2::calculate(&pat), 0);
    }

    #[test]
    fn test_pmt_section_layout() {
        let pmt = pmt_section(STREAM_TYPE_H264);
        assert_eq!(pmt[0], TABLE_ID_PMT);
        assert_eq!(((pmt[1] as usize & 0x03) << 8) | pmt[2] as usize, pmt.len() - 3);
        assert_eq!(&pmt[12..17], &[0x1b, 0xe1, 0x00, 0xf0, 0x00]);
        assert_eq!(Crc32Mpeg2::calculate(&pmt), 0);
    }

    #[test]
    fn test_pcr_encoding() {
        let mut buf = BytesMut::new();
        write_pcr(&mut buf, 90_000, 0);
        // base occupies the top 33 of 48 bits, reserved bits all set
        assert_eq!(&buf[..], &[0x00, 0x00, 0xaf, 0xc8, 0x7e, 0x00]);
    }
}
