use bytes::{BufMut, BytesMut};

/// Packetized Elementary Stream header.
///
/// Only the fields a video muxer sets are modelled; everything else in the
/// optional header is written as zero.
#[derive(Debug, Clone, Default)]
pub struct PesHeader {
    /// Stream identifier (0xE0 for the first video stream)
    pub stream_id: u8,
    /// Access unit starts right after the header
    pub data_alignment: bool,
    /// Presentation Time Stamp, 90 kHz, 33 bits
    pub pts: Option<u64>,
    /// Decoding Time Stamp, 90 kHz, 33 bits; only written alongside a PTS
    pub dts: Option<u64>,
}

impl PesHeader {
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            data_alignment: true,
            ..Default::default()
        }
    }

    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    fn pts_dts_flags(&self) -> u8 {
        match (self.pts, self.dts) {
            (Some(pts), Some(dts)) if pts != dts => 0b11,
            (Some(_), _) => 0b10,
            _ => 0b00,
        }
    }

    fn header_data_length(&self) -> usize {
        match self.pts_dts_flags() {
            0b11 => 10,
            0b10 => 5,
            _ => 0,
        }
    }

    /// Encodes the header. `payload_len` is the size of the elementary
    /// stream data that follows; PES_packet_length is left at zero when it
    /// does not fit in 16 bits, which is allowed for video.
    pub fn write_to(&self, buf: &mut BytesMut, payload_len: usize) {
        let header_data_length = self.header_data_length();
        let packet_length = 3 + header_data_length + payload_len;

        buf.put_slice(&[0x00, 0x00, 0x01]);
        buf.put_u8(self.stream_id);
        buf.put_u16(if packet_length > 0xffff { 0 } else { packet_length as u16 });

        let mut flags1 = 0x80; // '10' marker bits
        if self.data_alignment {
            flags1 |= 0x04;
        }
        buf.put_u8(flags1);
        let flags = self.pts_dts_flags();
        buf.put_u8(flags << 6);
        buf.put_u8(header_data_length as u8);

        match (flags, self.pts, self.dts) {
            (0b11, Some(pts), Some(dts)) => {
                write_timestamp(buf, 0b0011, pts);
                write_timestamp(buf, 0b0001, dts);
            }
            (0b10, Some(pts), _) => write_timestamp(buf, 0b0010, pts),
            _ => {}
        }
    }
}

/// A PES packet ready to be split into transport packets.
#[derive(Debug)]
pub struct PesPacket<'a> {
    pub header: PesHeader,
    pub payload: &'a [u8],
}

impl<'a> PesPacket<'a> {
    pub fn new(header: PesHeader, payload: &'a [u8]) -> Self {
        Self { header, payload }
    }

    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(19 + self.payload.len());
        self.header.write_to(&mut buf, self.payload.len());
        buf.put_slice(self.payload);
        buf
    }
}

/// 5-byte PTS/DTS field with its 4-bit prefix and marker bits.
fn write_timestamp(buf: &mut BytesMut, prefix: u8, ts: u64) {
    let ts = ts & 0x1_ffff_ffff;
    buf.put_u8((prefix << 4) | (((ts >> 29) & 0x0e) as u8) | 0x01);
    buf.put_u16((((ts >> 14) & 0xfffe) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xfffe) | 0x01) as u16);
}

/// Decodes a 5-byte PTS/DTS field. Used to check muxer output.
pub fn read_timestamp(field: &[u8]) -> u64 {
    ((((field[0] as u64) >> 1) & 0x07) << 30)
        | ((field[1] as u64) << 22)
        | (((field[2] as u64) >> 1) << 15)
        | ((field[3] as u64) << 7)
        | ((field[4] as u64) >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pts_only_header() {
        let pes = PesPacket::new(PesHeader::new(0xe0).with_pts(90_000), &[0xAA; 10]);
        let buf = pes.to_bytes();

        assert_eq!(&buf[..4], &[0x00, 0x00, 0x01, 0xe0]);
        assert_eq!(u16::from_be_bytes([buf[4], buf[5]]), 3 + 5 + 10);
        assert_eq!(buf[6], 0x84);
        assert_eq!(buf[7], 0x80);
        assert_eq!(buf[8], 5);
        assert_eq!(buf[9] >> 4, 0b0010);
        assert_eq!(read_timestamp(&buf[9..14]), 90_000);
        assert_eq!(buf.len(), 14 + 10);
    }

    #[test]
    fn test_pts_and_dts_header() {
        let header = PesHeader::new(0xe0).with_pts(0x1_2345_6789).with_dts(0x1_2345_0000);
        let pes = PesPacket::new(header, &[]);
        let buf = pes.to_bytes();

        assert_eq!(buf[7], 0xc0);
        assert_eq!(buf[8], 10);
        assert_eq!(read_timestamp(&buf[9..14]), 0x1_2345_6789);
        assert_eq!(read_timestamp(&buf[14..19]), 0x1_2345_0000);
    }

    #[test]
    fn test_equal_dts_is_omitted() {
        let pes = PesPacket::new(PesHeader::new(0xe0).with_pts(3000).with_dts(3000), &[1]);
        let buf = pes.to_bytes();
        assert_eq!(buf[7], 0x80);
        assert_eq!(buf[8], 5);
    }

    #[test]
    fn test_large_payload_uses_unbounded_length() {
        let payload = vec![0u8; 70_000];
        let buf = PesPacket::new(PesHeader::new(0xe0), &payload).to_bytes();
        assert_eq!(&buf[4..6], &[0, 0]);
        assert_eq!(buf[8], 0);
    }
}
