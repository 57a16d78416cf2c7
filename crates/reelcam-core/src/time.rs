//! Time representation for take and segment bookkeeping
//!
//! Uses rational numbers to avoid floating-point accumulation errors when
//! durations are repeatedly added to and removed from the timeline.
//! Capture backends report seconds as `f64`; those are quantised to
//! microseconds on entry and kept exact from then on.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use crate::error::{ReelcamError, Result};

/// Quantisation applied to floating-point seconds.
const MICROS_PER_SECOND: i64 = 1_000_000;

/// A rational time value representing a point in time or a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    /// Time value as a rational number (seconds)
    value: Rational64,
}

impl RationalTime {
    /// Create a new RationalTime of `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Create a RationalTime from seconds as a float, rounded to the microsecond.
    ///
    /// Non-finite input maps to zero.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        if !seconds.is_finite() {
            return Self::ZERO;
        }
        Self {
            value: Rational64::new(
                (seconds * MICROS_PER_SECOND as f64).round() as i64,
                MICROS_PER_SECOND,
            ),
        }
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Zero time constant.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    /// Check if this time is zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    /// Check if this time is strictly negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
    }

    /// Subtract, clamping the result at zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        let diff = self - rhs;
        if diff.is_negative() {
            Self::ZERO
        } else {
            diff
        }
    }

    /// Add, returning `None` if the exact result does not fit.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (a, b) = (*self.value.numer(), *self.value.denom());
        let (c, d) = (*rhs.value.numer(), *rhs.value.denom());
        let numer = a.checked_mul(d)?.checked_add(c.checked_mul(b)?)?;
        let denom = b.checked_mul(d)?;
        Some(Self {
            value: Rational64::new(numer, denom),
        })
    }

    /// Largest representable time.
    pub const MAX: Self = Self {
        value: Rational64::new_raw(i64::MAX, 1),
    };

    /// Ratio of this time to `whole`, or 0.0 when `whole` is zero.
    pub fn fraction_of(self, whole: Self) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        let ratio = self.value / whole.value;
        *ratio.numer() as f64 / *ratio.denom() as f64
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl AddAssign for RationalTime {
    fn add_assign(&mut self, rhs: Self) {
        self.value = self.value + rhs.value;
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl Sum for RationalTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, t| acc + t)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Parse the `num/den` notation ffprobe uses for `r_frame_rate`.
    pub fn parse(text: &str) -> Result<Self> {
        let (num, den) = text.trim().split_once('/').unwrap_or((text.trim(), "1"));
        let numerator: u32 = num
            .parse()
            .map_err(|_| ReelcamError::InvalidParameter(format!("bad frame rate: {text}")))?;
        let denominator: u32 = den
            .parse()
            .map_err(|_| ReelcamError::InvalidParameter(format!("bad frame rate: {text}")))?;
        if denominator == 0 {
            return Err(ReelcamError::InvalidParameter(format!(
                "frame rate with zero denominator: {text}"
            )));
        }
        Ok(Self::new(numerator, denominator))
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub const FPS_30: Self = Self::new(30, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A time range with inclusive start and exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: RationalTime,
    /// Duration of the range
    pub duration: RationalTime,
}

impl TimeRange {
    /// Create a new time range from start and duration.
    #[inline]
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self { start, duration }
    }

    /// Create a time range from start and end times.
    #[inline]
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// Empty range starting at zero.
    pub const EMPTY: Self = Self {
        start: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::EMPTY
    }
}
