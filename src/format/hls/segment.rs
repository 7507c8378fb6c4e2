use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::path::PathBuf;
use tokio::fs::{self, File};

use super::rotation::MIN_FINAL_DURATION;
use crate::av::{Packet, StreamDescriptor};
use crate::codec::{self, ParameterSets};
use crate::config::SessionConfig;
use crate::error::{MuxError, Result};
use crate::format::ts::{TsMuxer, PTS_HZ};
use crate::format::{Muxer, WriteStatus};

/// One segment file and what the playlist says about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// 1-based position in the session
    pub index: u64,
    pub filename: String,
    pub path: PathBuf,
    pub target_duration: f64,
    /// Measured from the container once the segment is finished
    pub duration: f64,
    /// Wall-clock time the segment was opened
    pub started_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(index: u64, config: &SessionConfig) -> Self {
        Self {
            index,
            filename: config.segment_filename(index),
            path: config.segment_path(index),
            target_duration: config.target_duration,
            duration: 0.0,
            started_at: Utc::now(),
        }
    }
}

/// Owns the single segment file open for writing.
///
/// Every segment starts with PAT/PMT. With `repeat_parameter_sets` the
/// out-of-band parameter sets go in front of the first keyframe of each
/// segment that does not carry them in-band, so each file decodes on its own.
pub struct SegmentWriter {
    muxer: TsMuxer<File>,
    descriptor: StreamDescriptor,
    parameter_sets: ParameterSets,
    repeat_parameter_sets: bool,
    current: Segment,
    packets_in_segment: u64,
    awaiting_keyframe: bool,
    previous_end_pts: Option<i64>,
    closed: bool,
}

impl SegmentWriter {
    /// Creates the first segment file and writes its header.
    ///
    /// On failure the file is removed again.
    pub async fn open_session(
        descriptor: StreamDescriptor,
        parameter_sets: ParameterSets,
        first: Segment,
        repeat_parameter_sets: bool,
    ) -> Result<Self> {
        let file = File::create(&first.path).await?;
        let mut muxer = TsMuxer::new(file);

        let header: Result<()> = async {
            muxer.write_header(&descriptor).await?;
            muxer.flush().await
        }
        .await;
        if let Err(e) = header {
            drop(muxer);
            if let Err(remove_err) = fs::remove_file(&first.path).await {
                warn!("Failed to remove {}: {}", first.path.display(), remove_err);
            }
            return Err(e);
        }

        debug!("Opened segment {}", first.path.display());
        Ok(Self {
            muxer,
            descriptor,
            parameter_sets,
            repeat_parameter_sets,
            current: first,
            packets_in_segment: 0,
            awaiting_keyframe: true,
            previous_end_pts: None,
            closed: false,
        })
    }

    pub fn current(&self) -> &Segment {
        &self.current
    }

    pub fn has_packets(&self) -> bool {
        self.packets_in_segment > 0
    }

    pub fn bytes_written(&self) -> u64 {
        self.muxer.bytes_written()
    }

    /// Finishes the current segment and continues in `next`.
    ///
    /// Returns the finished segment with its measured duration. If the new
    /// file cannot be created the current one stays the output.
    pub async fn open_next_segment(&mut self, next: Segment) -> Result<Segment> {
        if self.closed {
            return Err(MuxError::SessionClosed);
        }
        self.muxer.flush().await?;

        let file = File::create(&next.path).await?;
        let previous = self.muxer.switch_output(file).await?;
        previous.sync_all().await?;
        drop(previous);

        self.muxer.write_header(&self.descriptor).await?;

        let mut finished = std::mem::replace(&mut self.current, next);
        finished.duration = self.measure();
        self.packets_in_segment = 0;
        self.awaiting_keyframe = true;

        debug!("Opened segment {}", self.current.path.display());
        Ok(finished)
    }

    /// Appends one access unit whose timing is already in the 90 kHz
    /// container timebase.
    pub async fn write_packet(&mut self, packet: &Packet) -> Result<WriteStatus> {
        if self.closed {
            return Err(MuxError::SessionClosed);
        }

        let status = match self.with_parameter_sets(packet) {
            Some(prefixed) => self.muxer.write_packet(&prefixed).await?,
            None => self.muxer.write_packet(packet).await?,
        };
        if packet.is_key {
            self.awaiting_keyframe = false;
        }
        self.packets_in_segment += 1;
        Ok(status)
    }

    /// Flushes and closes the last segment. Calling it again does nothing.
    ///
    /// Returns `None` when the last segment never received a packet; its
    /// file is deleted instead of being published.
    pub async fn close_session(&mut self) -> Result<Option<Segment>> {
        if self.closed {
            return Ok(None);
        }
        self.closed = true;

        self.muxer.write_trailer().await?;
        self.muxer.get_ref().sync_all().await?;

        if self.packets_in_segment == 0 {
            fs::remove_file(&self.current.path).await?;
            debug!("Removed empty segment {}", self.current.path.display());
            return Ok(None);
        }

        let mut last = self.current.clone();
        last.duration = self.measure().max(MIN_FINAL_DURATION);
        Ok(Some(last))
    }

    /// Container time covered since the previous cut, in seconds.
    fn measure(&mut self) -> f64 {
        let end = self.muxer.end_pts();
        let start = self.previous_end_pts.or(self.muxer.start_pts());
        self.previous_end_pts = end;
        match (start, end) {
            (Some(start), Some(end)) if end > start => (end - start) as f64 / PTS_HZ as f64,
            _ => 0.0,
        }
    }

    fn with_parameter_sets(&self, packet: &Packet) -> Option<Packet> {
        if !self.repeat_parameter_sets
            || !self.awaiting_keyframe
            || !packet.is_key
            || self.parameter_sets.is_empty()
            || codec::has_parameter_sets(self.descriptor.codec, &packet.data)
        {
            return None;
        }

        let access_unit = codec::to_annexb(&packet.data);
        let mut data = BytesMut::with_capacity(self.parameter_sets.annexb().len() + access_unit.len());
        data.put_slice(self.parameter_sets.annexb());
        data.put_slice(&access_unit);

        let mut prefixed = packet.clone();
        prefixed.data = data.freeze();
        Some(prefixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{CodecType, Rational};
    use crate::codec::h264::parser::test_streams::baseline_sps;
    use crate::format::ts::TS_PACKET_SIZE;
    use pretty_assertions::assert_eq;

    fn descriptor() -> StreamDescriptor {
        StreamDescriptor::new(CodecType::H264, 1280, 720, Rational::new(30, 1))
    }

    fn parameter_sets() -> ParameterSets {
        let mut extradata = vec![0, 0, 0, 1];
        extradata.extend_from_slice(&baseline_sps(80, 45, 0));
        extradata.extend_from_slice(&[0, 0, 0, 1, 0x68, 0xCE, 0x38, 0x80]);
        ParameterSets::from_extradata(CodecType::H264, &extradata).unwrap()
    }

    fn frame(pts: i64, key: bool) -> Packet {
        let nal = if key { 0x65 } else { 0x41 };
        Packet::new(vec![0, 0, 0, 1, nal, 0x88, 0x84, 0x21])
            .with_pts(pts)
            .with_dts(pts)
            .with_duration(3000)
            .with_key_flag(key)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[tokio::test]
    async fn test_durations_come_from_container() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let mut writer = SegmentWriter::open_session(
            descriptor(),
            ParameterSets::default(),
            Segment::new(1, &config),
            true,
        )
        .await
        .unwrap();

        for i in 0..60 {
            writer.write_packet(&frame(i * 3000, i == 0)).await.unwrap();
        }
        let first = writer.open_next_segment(Segment::new(2, &config)).await.unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.duration, 2.0);
        assert!(!writer.has_packets());

        for i in 60..75 {
            writer.write_packet(&frame(i * 3000, i == 60)).await.unwrap();
        }
        let last = writer.close_session().await.unwrap().unwrap();
        assert_eq!(last.index, 2);
        assert_eq!(last.duration, 1.0);

        let bytes = std::fs::read(&last.path).unwrap();
        assert_eq!(bytes.len() % TS_PACKET_SIZE, 0);
        assert!(writer.close_session().await.unwrap().is_none());
        assert!(writer.write_packet(&frame(0, true)).await.is_err());
    }

    #[tokio::test]
    async fn test_final_duration_floor() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let mut writer =
            SegmentWriter::open_session(descriptor(), ParameterSets::default(), Segment::new(1, &config), true)
                .await
                .unwrap();
        writer.write_packet(&frame(0, true)).await.unwrap();
        let last = writer.close_session().await.unwrap().unwrap();
        assert_eq!(last.duration, MIN_FINAL_DURATION);
    }

    #[tokio::test]
    async fn test_every_segment_gets_parameter_sets() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let sets = parameter_sets();
        let sps_prefix = sets.annexb()[..8].to_vec();
        let mut writer = SegmentWriter::open_session(descriptor(), sets, Segment::new(1, &config), true)
            .await
            .unwrap();

        writer.write_packet(&frame(0, true)).await.unwrap();
        writer.write_packet(&frame(3000, false)).await.unwrap();
        writer.open_next_segment(Segment::new(2, &config)).await.unwrap();
        writer.write_packet(&frame(6000, true)).await.unwrap();
        writer.close_session().await.unwrap();

        for index in 1..=2 {
            let bytes = std::fs::read(config.segment_path(index)).unwrap();
            assert!(contains(&bytes, &sps_prefix), "segment {} has no SPS", index);
        }
    }

    #[tokio::test]
    async fn test_parameter_sets_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let sets = parameter_sets();
        let sps_prefix = sets.annexb()[..8].to_vec();
        let mut writer = SegmentWriter::open_session(descriptor(), sets, Segment::new(1, &config), false)
            .await
            .unwrap();
        writer.write_packet(&frame(0, true)).await.unwrap();
        writer.close_session().await.unwrap();

        let bytes = std::fs::read(config.segment_path(1)).unwrap();
        assert!(!contains(&bytes, &sps_prefix));
    }

    #[tokio::test]
    async fn test_empty_last_segment_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let mut writer =
            SegmentWriter::open_session(descriptor(), ParameterSets::default(), Segment::new(1, &config), true)
                .await
                .unwrap();
        assert!(config.segment_path(1).exists());
        assert!(writer.close_session().await.unwrap().is_none());
        assert!(!config.segment_path(1).exists());
    }

    #[tokio::test]
    async fn test_open_fails_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path().join("missing"));
        let result =
            SegmentWriter::open_session(descriptor(), ParameterSets::default(), Segment::new(1, &config), true).await;
        assert!(result.is_err());
    }
}
