/// A keyframe up to this many seconds early still closes a segment.
pub const ROTATION_TOLERANCE: f64 = 0.5;

/// Shortest duration published for the last segment of a session.
pub const MIN_FINAL_DURATION: f64 = 1.0;

/// Lifecycle of a [`MuxerSession`](super::MuxerSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// First segment file is open, nothing written yet
    Open,
    Writing,
    /// Between closing one segment and republishing the playlist
    Rotating,
    Closed,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    pub fn accepts_packets(&self) -> bool {
        matches!(self, SessionState::Open | SessionState::Writing)
    }
}

/// Decides which keyframes start a new segment.
///
/// Works on trigger times: input presentation times in seconds. They are
/// only used to pick cut points. Published durations come from the
/// container instead.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    target_duration: f64,
    last_trigger: Option<f64>,
}

impl RotationPolicy {
    pub fn new(target_duration: f64) -> Self {
        Self {
            target_duration,
            last_trigger: None,
        }
    }

    /// Trigger time of the last cut, or of the first packet before any cut.
    pub fn last_trigger(&self) -> Option<f64> {
        self.last_trigger
    }

    /// Should the packet at `trigger_time` open a new segment?
    ///
    /// The first call records its time as the start of the first segment.
    /// A segment that has nothing in it is never closed.
    pub fn should_rotate(&mut self, is_key: bool, trigger_time: f64, segment_has_packets: bool) -> bool {
        let last = *self.last_trigger.get_or_insert(trigger_time);
        is_key
            && segment_has_packets
            && trigger_time - last >= self.target_duration - ROTATION_TOLERANCE
    }

    /// Records a completed cut at `trigger_time`.
    pub fn rotated(&mut self, trigger_time: f64) {
        self.last_trigger = Some(trigger_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotates_on_keyframe_after_target() {
        let mut policy = RotationPolicy::new(10.0);
        assert!(!policy.should_rotate(true, 0.0, false));
        assert!(!policy.should_rotate(true, 8.0, true));
        assert!(!policy.should_rotate(false, 10.0, true));
        assert!(policy.should_rotate(true, 10.0, true));

        policy.rotated(10.0);
        assert!(!policy.should_rotate(true, 12.0, true));
        assert!(policy.should_rotate(true, 20.0, true));
    }

    #[test]
    fn test_tolerance_allows_early_keyframe() {
        let mut policy = RotationPolicy::new(4.0);
        policy.should_rotate(true, 100.0, false);
        assert!(!policy.should_rotate(true, 103.4, true));
        assert!(policy.should_rotate(true, 103.5, true));
    }

    #[test]
    fn test_empty_segment_is_never_closed() {
        let mut policy = RotationPolicy::new(2.0);
        policy.should_rotate(true, 0.0, false);
        assert!(!policy.should_rotate(true, 30.0, false));
        assert_eq!(policy.last_trigger(), Some(0.0));
    }

    #[test]
    fn test_state_predicates() {
        assert!(!SessionState::default().accepts_packets());
        assert!(SessionState::Open.accepts_packets());
        assert!(SessionState::Writing.accepts_packets());
        assert!(!SessionState::Rotating.accepts_packets());
        assert!(SessionState::Closed.is_closed());
    }
}
