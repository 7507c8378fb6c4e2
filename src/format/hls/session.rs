use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::playlist::ManifestPublisher;
use super::rotation::{RotationPolicy, SessionState};
use super::segment::{Segment, SegmentWriter};
use super::window::{PlaylistWindow, RetentionManager};
use crate::av::{to_seconds, CodecData, Packet, StreamDescriptor, TimestampTranslator};
use crate::codec::{self, ParameterSets};
use crate::config::SessionConfig;
use crate::error::{MuxError, Result};
use crate::format::ts::TsMuxer;
use crate::format::WriteStatus;

/// Counters describing what a session has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub segments_produced: u64,
    pub bytes_written: u64,
    pub packets_written: u64,
    pub packets_dropped: u64,
    pub publish_failures: u64,
    pub begin_index: u64,
    pub end_index: u64,
}

/// A live HLS segmenting session.
///
/// Calls to [`write`](MuxerSession::write) and
/// [`close`](MuxerSession::close) must come from a single producer. Use
/// [`worker::spawn`](super::worker::spawn) to hand the session to its own
/// task instead.
pub struct MuxerSession {
    config: SessionConfig,
    descriptor: StreamDescriptor,
    translator: TimestampTranslator,
    writer: SegmentWriter,
    policy: RotationPolicy,
    window: PlaylistWindow,
    publisher: ManifestPublisher,
    retention: RetentionManager,
    state: SessionState,
    next_index: u64,
    /// Where the next packet is expected to start, for packets without timing
    estimated_time: Option<f64>,
    stats: SessionStats,
}

impl MuxerSession {
    /// Validates the inputs and creates the first segment file.
    ///
    /// Nothing is left on disk when this fails.
    pub async fn open(descriptor: StreamDescriptor, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        descriptor.validate()?;

        let parameter_sets = ParameterSets::from_extradata(descriptor.codec, &descriptor.parameter_sets)?;
        if let Some(sps) = parameter_sets.sps() {
            if descriptor.width().is_some_and(|w| w != sps.width)
                || descriptor.height().is_some_and(|h| h != sps.height)
            {
                warn!(
                    "Stream is described as {}x{} but its SPS says {}x{}",
                    descriptor.width, descriptor.height, sps.width, sps.height
                );
            }
        }

        let created_root = first_missing_ancestor(&config.output_dir).await?;
        fs::create_dir_all(&config.output_dir).await?;

        let first = Segment::new(1, &config);
        let writer = match SegmentWriter::open_session(
            descriptor.clone(),
            parameter_sets,
            first,
            config.repeat_parameter_sets,
        )
        .await
        {
            Ok(writer) => writer,
            Err(e) => {
                if let Some(root) = created_root {
                    if let Err(remove_err) = fs::remove_dir_all(&root).await {
                        warn!("Failed to remove {}: {}", root.display(), remove_err);
                    }
                }
                return Err(e);
            }
        };

        let translator = TimestampTranslator::new(
            descriptor.time_base,
            TsMuxer::<fs::File>::time_base(),
            descriptor.frame_rate,
        );

        info!(
            "Opened HLS session in {} ({:?} {}x{} @ {} fps, window {}, target {}s)",
            config.output_dir.display(),
            descriptor.codec,
            descriptor.width,
            descriptor.height,
            descriptor.frame_rate,
            config.window_capacity,
            config.target_duration
        );

        Ok(Self {
            translator,
            writer,
            policy: RotationPolicy::new(config.target_duration),
            window: PlaylistWindow::new(config.window_capacity),
            publisher: ManifestPublisher::new(&config),
            retention: RetentionManager::new(),
            state: SessionState::Open,
            next_index: 2,
            estimated_time: None,
            stats: SessionStats::default(),
            config,
            descriptor,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn window(&self) -> &PlaylistWindow {
        &self.window
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            bytes_written: self.writer.bytes_written(),
            begin_index: self.window.begin_index(),
            end_index: self.window.end_index(),
            ..self.stats
        }
    }

    /// Writes one packet, or closes the session when given `None`.
    pub async fn write(&mut self, packet: Option<Packet>) -> Result<()> {
        match packet {
            Some(packet) => self.write_packet(packet).await,
            None => self.close().await.map(|_| ()),
        }
    }

    /// Writes one access unit with timing in the descriptor's timebase.
    ///
    /// A packet the container rejects is logged and dropped; the session
    /// keeps going. An error is only returned when the session is closed or
    /// can no longer continue.
    pub async fn write_packet(&mut self, packet: Packet) -> Result<()> {
        if !self.state.accepts_packets() {
            return Err(MuxError::SessionClosed);
        }

        let is_key = packet.is_key || codec::is_key_unit(self.descriptor.codec, &packet.data);
        let trigger_time = packet
            .timestamp()
            .map(|t| to_seconds(t, self.translator.source_time_base()))
            .or(self.estimated_time)
            .unwrap_or(0.0);

        if self.policy.should_rotate(is_key, trigger_time, self.writer.has_packets()) {
            self.rotate(trigger_time).await?;
        }
        self.state = SessionState::Writing;

        let timing = self.translator.translate(packet.pts, packet.dts, packet.duration);
        let translated = Packet {
            data: packet.data,
            pts: timing.pts,
            dts: timing.dts,
            duration: Some(timing.duration),
            is_key,
        };
        self.estimated_time =
            Some(trigger_time + to_seconds(timing.duration, self.translator.destination_time_base()));

        match self.writer.write_packet(&translated).await {
            Ok(WriteStatus::Continue) => {
                self.stats.packets_written += 1;
            }
            Ok(WriteStatus::EndOfStream) => {
                self.stats.packets_written += 1;
                info!("Stream signaled its end, closing session");
                self.close().await?;
            }
            Err(e) => {
                self.stats.packets_dropped += 1;
                warn!("Dropped packet at {:.3}s: {}", trigger_time, e);
            }
        }
        Ok(())
    }

    /// Finishes the last segment and publishes the final playlist.
    ///
    /// Closing an already closed session does nothing.
    pub async fn close(&mut self) -> Result<SessionStats> {
        if self.state.is_closed() {
            return Ok(self.stats());
        }
        self.state = SessionState::Closed;

        if let Some(last) = self.writer.close_session().await? {
            info!("Finished segment {} ({:.3}s)", last.index, last.duration);
            self.append(last);
        }
        self.publish(true).await;

        let stats = self.stats();
        info!(
            "Closed HLS session: {} segments, {} packets ({} dropped), {} bytes",
            stats.segments_produced, stats.packets_written, stats.packets_dropped, stats.bytes_written
        );
        Ok(stats)
    }

    async fn rotate(&mut self, trigger_time: f64) -> Result<()> {
        self.state = SessionState::Rotating;

        let next = Segment::new(self.next_index, &self.config);
        let finished = match self.writer.open_next_segment(next).await {
            Ok(finished) => finished,
            Err(e) => {
                warn!("Failed to open segment {}: {}", self.next_index, e);
                self.state = SessionState::Closed;
                return Err(e);
            }
        };
        self.next_index += 1;

        info!(
            "Finished segment {} ({:.3}s), starting segment {}",
            finished.index,
            finished.duration,
            self.writer.current().index
        );
        self.append(finished);
        self.publish(false).await;
        self.policy.rotated(trigger_time);
        Ok(())
    }

    fn append(&mut self, segment: Segment) {
        self.stats.segments_produced += 1;
        self.window.push(segment);
        if let Some(evicted) = self.window.evict() {
            self.retention.schedule(evicted);
        }
    }

    /// Publishes the playlist, then deletes what it no longer lists.
    async fn publish(&mut self, ended: bool) {
        match self.publisher.publish(&self.window, ended).await {
            Ok(()) => {
                debug!(
                    "Published {} with segments {}..={}{}",
                    self.publisher.path().display(),
                    self.window.begin_index(),
                    self.window.end_index(),
                    if ended { " (ended)" } else { "" }
                );
                self.retention.purge().await;
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!("Failed to publish {}: {}", self.publisher.path().display(), e);
            }
        }
    }
}

/// The outermost directory that creating `dir` would add, if any.
async fn first_missing_ancestor(dir: &Path) -> Result<Option<PathBuf>> {
    let mut missing = None;
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() || fs::try_exists(ancestor).await? {
            break;
        }
        missing = Some(ancestor.to_path_buf());
    }
    Ok(missing)
}
