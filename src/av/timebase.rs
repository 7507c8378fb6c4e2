use std::fmt;

/// A rational number, used for timebases, frame rates and aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub const fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    pub fn is_positive(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    pub fn invert(&self) -> Self {
        Self::new(self.den, self.num)
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Rescales `value` from timebase `src` to timebase `dst`, rounding to the
/// nearest integer with halves away from zero.
///
/// Both timebases must be positive.
pub fn rescale(value: i64, src: Rational, dst: Rational) -> i64 {
    let a = value as i128 * src.num as i128 * dst.den as i128;
    let b = src.den as i128 * dst.num as i128;
    let half = b / 2;
    let r = if a >= 0 {
        (a + half) / b
    } else {
        -((-a + half) / b)
    };
    r.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Converts a timestamp to seconds.
pub fn to_seconds(value: i64, time_base: Rational) -> f64 {
    value as f64 * time_base.as_f64()
}

/// Packet timing after conversion into the container timebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedTimestamps {
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
}

/// Moves packet timing from the source timebase into the container's.
///
/// A missing duration falls back to one frame interval at the stream's frame
/// rate. Missing pts/dts stay missing.
#[derive(Debug, Clone, Copy)]
pub struct TimestampTranslator {
    src: Rational,
    dst: Rational,
    frame_duration: i64,
}

impl TimestampTranslator {
    pub fn new(src: Rational, dst: Rational, frame_rate: Rational) -> Self {
        Self {
            src,
            dst,
            frame_duration: rescale(1, frame_rate.invert(), dst),
        }
    }

    pub fn translate(
        &self,
        pts: Option<i64>,
        dts: Option<i64>,
        duration: Option<i64>,
    ) -> TranslatedTimestamps {
        TranslatedTimestamps {
            pts: pts.map(|v| rescale(v, self.src, self.dst)),
            dts: dts.map(|v| rescale(v, self.src, self.dst)),
            duration: duration
                .map(|v| rescale(v, self.src, self.dst))
                .unwrap_or(self.frame_duration),
        }
    }

    /// One frame interval in the destination timebase.
    pub fn frame_duration(&self) -> i64 {
        self.frame_duration
    }

    pub fn source_time_base(&self) -> Rational {
        self.src
    }

    pub fn destination_time_base(&self) -> Rational {
        self.dst
    }
}
