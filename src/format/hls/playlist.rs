use chrono::SecondsFormat;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use super::window::PlaylistWindow;
use crate::config::SessionConfig;
use crate::error::Result;

const PLAYLIST_VERSION: u8 = 3;

/// Renders the media playlist and swaps it into place atomically.
///
/// The full text goes to a temporary file next to the playlist which is then
/// renamed over it, so readers only ever see complete playlists.
#[derive(Debug, Clone)]
pub struct ManifestPublisher {
    path: PathBuf,
    temp_path: PathBuf,
    target_duration: f64,
    program_date_time: bool,
}

impl ManifestPublisher {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            path: config.playlist_path(),
            temp_path: config.temp_playlist_path(),
            target_duration: config.target_duration,
            program_date_time: config.program_date_time,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Playlist text for `window`, with `#EXT-X-ENDLIST` when `ended`.
    pub fn render(&self, window: &PlaylistWindow, ended: bool) -> String {
        let target = self.target_duration.max(window.max_duration()).ceil() as u64;

        let mut out = String::new();
        // writing to a String cannot fail
        let _ = writeln!(out, "#EXTM3U");
        let _ = writeln!(out, "#EXT-X-VERSION:{}", PLAYLIST_VERSION);
        let _ = writeln!(out, "#EXT-X-TARGETDURATION:{}", target);
        if window.is_sliding() {
            let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", window.begin_index());
        }
        for segment in window.segments() {
            if self.program_date_time {
                let _ = writeln!(
                    out,
                    "#EXT-X-PROGRAM-DATE-TIME:{}",
                    segment.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
                );
            }
            let _ = writeln!(out, "#EXTINF:{:.3},", segment.duration);
            let _ = writeln!(out, "{}", segment.filename);
        }
        if ended {
            let _ = writeln!(out, "#EXT-X-ENDLIST");
        }
        out
    }

    /// Writes the playlist for `window` and renames it into place.
    ///
    /// On error the previously published playlist is left untouched.
    pub async fn publish(&self, window: &PlaylistWindow, ended: bool) -> Result<()> {
        let text = self.render(window, ended);
        if let Err(e) = self.write_temp(text.as_bytes()).await {
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(e);
        }
        fs::rename(&self.temp_path, &self.path).await?;
        Ok(())
    }

    async fn write_temp(&self, contents: &[u8]) -> Result<()> {
        let mut file = File::create(&self.temp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::hls::Segment;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn window(capacity: usize, durations: &[f64]) -> PlaylistWindow {
        let config = SessionConfig::new("/srv/hls");
        let mut window = PlaylistWindow::new(capacity);
        for (i, duration) in durations.iter().enumerate() {
            let mut segment = Segment::new(i as u64 + 1, &config);
            segment.duration = *duration;
            segment.started_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, i as u32 * 10).unwrap();
            window.push(segment);
            window.evict();
        }
        window
    }

    #[test]
    fn test_render_vod() {
        let publisher = ManifestPublisher::new(&SessionConfig::new("/srv/hls").with_target_duration(6.0));
        let text = publisher.render(&window(0, &[6.006, 5.5, 2.0]), true);
        assert_eq!(
            text,
            "#EXTM3U\n\
             #EXT-X-VERSION:3\n\
             #EXT-X-TARGETDURATION:7\n\
             #EXTINF:6.006,\n\
             segment-0001.ts\n\
             #EXTINF:5.500,\n\
             segment-0002.ts\n\
             #EXTINF:2.000,\n\
             segment-0003.ts\n\
             #EXT-X-ENDLIST\n"
        );
    }

    #[test]
    fn test_render_sliding_window() {
        let publisher = ManifestPublisher::new(&SessionConfig::new("/srv/hls"));
        let text = publisher.render(&window(2, &[10.0, 10.0, 9.6]), false);
        assert_eq!(
            text,
            "#EXTM3U\n\
             #EXT-X-VERSION:3\n\
             #EXT-X-TARGETDURATION:10\n\
             #EXT-X-MEDIA-SEQUENCE:2\n\
             #EXTINF:10.000,\n\
             segment-0002.ts\n\
             #EXTINF:9.600,\n\
             segment-0003.ts\n"
        );
    }

    #[test]
    fn test_render_program_date_time() {
        let config = SessionConfig::new("/srv/hls").with_program_date_time(true);
        let text = ManifestPublisher::new(&config).render(&window(0, &[4.0]), false);
        assert!(text.contains("#EXT-X-PROGRAM-DATE-TIME:2024-05-01T12:00:00.000Z\n#EXTINF:4.000,\n"));
    }

    #[test]
    fn test_render_empty() {
        let publisher = ManifestPublisher::new(&SessionConfig::new("/srv/hls"));
        assert_eq!(
            publisher.render(&PlaylistWindow::new(0), true),
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-ENDLIST\n"
        );
    }

    #[tokio::test]
    async fn test_publish_replaces_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let publisher = ManifestPublisher::new(&config);

        publisher.publish(&window(0, &[10.0]), false).await.unwrap();
        publisher.publish(&window(0, &[10.0, 10.0]), true).await.unwrap();

        let text = std::fs::read_to_string(config.playlist_path()).unwrap();
        assert!(text.ends_with("segment-0002.ts\n#EXT-X-ENDLIST\n"));
        assert!(!config.temp_playlist_path().exists());
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_old_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let publisher = ManifestPublisher::new(&config);
        publisher.publish(&window(0, &[10.0]), false).await.unwrap();
        let before = std::fs::read_to_string(config.playlist_path()).unwrap();

        // a directory where the temp file should go makes the write fail
        std::fs::create_dir(config.temp_playlist_path()).unwrap();
        assert!(publisher.publish(&window(0, &[10.0, 10.0]), true).await.is_err());
        assert_eq!(std::fs::read_to_string(config.playlist_path()).unwrap(), before);
    }
}
