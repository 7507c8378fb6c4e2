use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::pes::{PesHeader, PesPacket};
use super::types::*;
use crate::av::{CodecData, CodecType, Packet, Rational};
use crate::codec;
use crate::error::{MuxError, Result};
use crate::format::{Muxer, WriteStatus};

/// ~25 PCR updates per second
const PCR_INTERVAL: i64 = PTS_HZ * 40 / 1000;

/// Single-program MPEG-TS muxer for one video elementary stream.
///
/// Input timestamps must already be in the 90 kHz container timebase.
/// Continuity counters and PCR pacing survive [`TsMuxer::switch_output`], so
/// consecutive segment files concatenate into one valid transport stream.
pub struct TsMuxer<W: AsyncWrite + Unpin + Send> {
    writer: BufWriter<W>,
    codec: Option<CodecType>,
    pat_cc: u8,
    pmt_cc: u8,
    video_cc: u8,
    last_pcr: Option<i64>,
    start_pts: Option<i64>,
    end_pts: Option<i64>,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> TsMuxer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            codec: None,
            pat_cc: 0,
            pmt_cc: 0,
            video_cc: 0,
            last_pcr: None,
            start_pts: None,
            end_pts: None,
            bytes_written: 0,
        }
    }

    pub const fn time_base() -> Rational {
        Rational::new(1, PTS_HZ)
    }

    /// Flushes the current output and continues on `writer`, handing the
    /// previous writer back to the caller.
    pub async fn switch_output(&mut self, writer: W) -> Result<W> {
        self.writer.flush().await?;
        let previous = std::mem::replace(&mut self.writer, BufWriter::new(writer));
        Ok(previous.into_inner())
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Smallest presentation time written so far.
    pub fn start_pts(&self) -> Option<i64> {
        self.start_pts
    }

    /// Largest `pts + duration` written so far.
    pub fn end_pts(&self) -> Option<i64> {
        self.end_pts
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn write_section(&mut self, pid: u16, section: &[u8]) -> Result<()> {
        let counter = match pid {
            PID_PAT => &mut self.pat_cc,
            _ => &mut self.pmt_cc,
        };
        let header = TsHeader {
            payload_unit_start: true,
            pid,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: *counter,
        };
        *counter = (*counter + 1) & 0x0f;

        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        header.write_to(&mut buf);
        buf.put_u8(0); // pointer_field
        buf.put_slice(section);
        buf.resize(TS_PACKET_SIZE, 0xff);

        self.writer.write_all(&buf).await?;
        self.bytes_written += TS_PACKET_SIZE as u64;
        Ok(())
    }

    fn needs_pcr(&self, clock: i64, is_key: bool) -> bool {
        match self.last_pcr {
            None => true,
            Some(last) => is_key || clock < last || clock - last >= PCR_INTERVAL,
        }
    }

    /// Splits one PES packet across as many transport packets as it needs.
    fn packetize(&mut self, pes: &[u8], pcr: Option<i64>, random_access: bool) -> BytesMut {
        let mut out = BytesMut::with_capacity((pes.len() / TS_PAYLOAD_SIZE + 1) * TS_PACKET_SIZE);
        let mut offset = 0;

        while offset < pes.len() {
            let first = offset == 0;
            let remaining = pes.len() - offset;

            // adaptation field body, without its length byte
            let mut adaptation: Option<BytesMut> = None;
            if first && (pcr.is_some() || random_access) {
                let mut body = BytesMut::with_capacity(7);
                let mut flags = 0u8;
                if random_access {
                    flags |= 0x40;
                }
                if pcr.is_some() {
                    flags |= 0x10;
                }
                body.put_u8(flags);
                if let Some(pcr) = pcr {
                    write_pcr(&mut body, pcr.max(0) as u64, 0);
                }
                adaptation = Some(body);
            }

            let adaptation_len = adaptation.as_ref().map_or(0, |a| a.len() + 1);
            let room = TS_PAYLOAD_SIZE - adaptation_len;
            if remaining < room {
                let stuffing = room - remaining;
                match adaptation.as_mut() {
                    Some(body) => body.put_bytes(0xff, stuffing),
                    None if stuffing == 1 => adaptation = Some(BytesMut::new()),
                    None => {
                        let mut body = BytesMut::with_capacity(stuffing - 1);
                        body.put_u8(0x00);
                        body.put_bytes(0xff, stuffing - 2);
                        adaptation = Some(body);
                    }
                }
            }

            let adaptation_len = adaptation.as_ref().map_or(0, |a| a.len() + 1);
            let payload_len = remaining.min(TS_PAYLOAD_SIZE - adaptation_len);

            let header = TsHeader {
                payload_unit_start: first,
                pid: PID_VIDEO,
                adaptation_field_exists: adaptation.is_some(),
                contains_payload: true,
                continuity_counter: self.video_cc,
            };
            self.video_cc = (self.video_cc + 1) & 0x0f;

            header.write_to(&mut out);
            if let Some(body) = adaptation {
                out.put_u8(body.len() as u8);
                out.put_slice(&body);
            }
            out.put_slice(&pes[offset..offset + payload_len]);
            offset += payload_len;
        }

        out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Muxer for TsMuxer<W> {
    async fn write_header(&mut self, stream: &dyn CodecData) -> Result<()> {
        let codec = stream.codec_type();
        self.codec = Some(codec);
        self.write_section(PID_PAT, &pat_section()).await?;
        self.write_section(PID_PMT, &pmt_section(codec.stream_type()))
            .await?;
        Ok(())
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<WriteStatus> {
        let codec = self
            .codec
            .ok_or_else(|| MuxError::InvalidData("packet written before stream header".into()))?;
        if packet.data.is_empty() {
            return Err(MuxError::InvalidData("empty access unit".into()));
        }

        let pts = packet
            .timestamp()
            .unwrap_or_else(|| self.end_pts.unwrap_or(0));
        let dts = packet.dts.unwrap_or(pts);
        let duration = packet.duration.unwrap_or(0).max(0);

        let payload = codec::to_annexb(&packet.data);
        let header = PesHeader::new(STREAM_ID_VIDEO)
            .with_pts(pts as u64)
            .with_dts(dts as u64);
        let pes = PesPacket::new(header, &payload).to_bytes();

        let pcr = if self.needs_pcr(dts, packet.is_key) {
            self.last_pcr = Some(dts);
            Some(dts)
        } else {
            None
        };

        let buf = self.packetize(&pes, pcr, packet.is_key);
        self.writer.write_all(&buf).await?;
        self.bytes_written += buf.len() as u64;

        self.start_pts = Some(self.start_pts.map_or(pts, |s| s.min(pts)));
        self.end_pts = Some(self.end_pts.map_or(pts + duration, |e| e.max(pts + duration)));

        if codec::has_end_of_stream(codec, &packet.data) {
            return Ok(WriteStatus::EndOfStream);
        }
        Ok(WriteStatus::Continue)
    }

    async fn write_trailer(&mut self) -> Result<()> {
        // MPEG-TS has no trailer; make sure everything reached the writer.
        self.writer.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{Rational, StreamDescriptor};
    use crate::format::ts::pes::read_timestamp;
    use pretty_assertions::assert_eq;

    fn descriptor() -> StreamDescriptor {
        StreamDescriptor::new(CodecType::H264, 1280, 720, Rational::new(30, 1))
    }

    fn idr(len: usize) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 1, 0x65];
        data.resize(len, 0x88);
        data
    }

    fn packets(data: &[u8]) -> Vec<&[u8]> {
        assert_eq!(data.len() % TS_PACKET_SIZE, 0);
        data.chunks(TS_PACKET_SIZE).collect()
    }

    fn pid(packet: &[u8]) -> u16 {
        (((packet[1] & 0x1f) as u16) << 8) | packet[2] as u16
    }

    #[tokio::test]
    async fn test_header_writes_pat_and_pmt() {
        let mut muxer = TsMuxer::new(Vec::new());
        muxer.write_header(&descriptor()).await.unwrap();
        muxer.flush().await.unwrap();

        let out = packets(muxer.get_ref());
        assert_eq!(out.len(), 2);
        assert_eq!(pid(out[0]), PID_PAT);
        assert_eq!(pid(out[1]), PID_PMT);
        assert_eq!(out[1][5], TABLE_ID_PMT);
    }

    #[tokio::test]
    async fn test_packet_is_split_and_stuffed() {
        let mut muxer = TsMuxer::new(Vec::new());
        muxer.write_header(&descriptor()).await.unwrap();

        let packet = Packet::new(idr(500))
            .with_pts(9000)
            .with_dts(9000)
            .with_duration(3000)
            .with_key_flag(true);
        let status = muxer.write_packet(&packet).await.unwrap();
        muxer.flush().await.unwrap();
        assert_eq!(status, WriteStatus::Continue);

        let out = packets(muxer.get_ref());
        let video: Vec<&[u8]> = out.iter().copied().filter(|p| pid(p) == PID_VIDEO).collect();
        // 14-byte PES header + 500 bytes of payload
        assert_eq!(video.len(), 3);

        let first = video[0];
        assert_eq!(first[1] & 0x40, 0x40);
        assert_eq!(first[3] & 0x20, 0x20);
        assert_eq!(first[5] & 0x50, 0x50); // random access + PCR
        let pes_start = 4 + 1 + first[4] as usize;
        assert_eq!(&first[pes_start..pes_start + 4], &[0, 0, 1, 0xe0]);
        assert_eq!(read_timestamp(&first[pes_start + 9..pes_start + 14]), 9000);

        let counters: Vec<u8> = video.iter().map(|p| p[3] & 0x0f).collect();
        assert_eq!(counters, vec![0, 1, 2]);

        assert_eq!(muxer.start_pts(), Some(9000));
        assert_eq!(muxer.end_pts(), Some(12_000));
    }

    #[tokio::test]
    async fn test_empty_packet_is_rejected() {
        let mut muxer = TsMuxer::new(Vec::new());
        muxer.write_header(&descriptor()).await.unwrap();
        assert!(muxer.write_packet(&Packet::new(Vec::<u8>::new())).await.is_err());

        let mut headerless = TsMuxer::new(Vec::new());
        assert!(headerless.write_packet(&Packet::new(idr(10))).await.is_err());
    }

    #[tokio::test]
    async fn test_end_of_stream_nal_is_signaled() {
        let mut muxer = TsMuxer::new(Vec::new());
        muxer.write_header(&descriptor()).await.unwrap();
        let data = vec![0, 0, 0, 1, 0x41, 0x9a, 0, 0, 0, 1, 0x0b];
        let status = muxer
            .write_packet(&Packet::new(data).with_pts(0))
            .await
            .unwrap();
        assert_eq!(status, WriteStatus::EndOfStream);
    }

    #[tokio::test]
    async fn test_counters_continue_across_outputs() {
        let mut muxer = TsMuxer::new(Vec::new());
        muxer.write_header(&descriptor()).await.unwrap();
        muxer
            .write_packet(&Packet::new(idr(100)).with_pts(0))
            .await
            .unwrap();

        let first = muxer.switch_output(Vec::new()).await.unwrap();
        assert_eq!(first.len(), 3 * TS_PACKET_SIZE);

        muxer.write_header(&descriptor()).await.unwrap();
        muxer
            .write_packet(&Packet::new(idr(100)).with_pts(3000))
            .await
            .unwrap();
        muxer.flush().await.unwrap();

        let out = packets(muxer.get_ref());
        assert_eq!(out[0][3] & 0x0f, 1); // second PAT
        assert_eq!(out[2][3] & 0x0f, 1); // second video packet
    }
}
