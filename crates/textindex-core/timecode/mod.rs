//! Timecode engine: frames, SMPTE labels and real time
//!
//! Converts between absolute frame counts and `HH:MM:SS:FF` labels under a
//! [`FrameRate`], honoring drop-frame numbering for 29.97 and 59.94. All
//! functions are pure; the only state is the rate value passed in.
//!
//! Drop-frame labels skip frame numbers `00` and `01` (`00`-`03` at 59.94)
//! at the start of every minute not divisible by ten. Rendering and parsing
//! apply the same rule, so `timecode_to_frames(frames_to_timecode(f))`
//! returns `f` for every non-negative `f`.
//!
//! # Examples
//!
//! ```rust
//! use textindex_core::timecode::{frames_to_timecode, timecode_to_frames};
//! use textindex_core::FrameRate;
//!
//! let rate = FrameRate::ntsc(30, true)?;
//! let tc = frames_to_timecode(1800, rate)?;
//! assert_eq!(tc.to_string(), "00:01:00;02");
//! assert_eq!(timecode_to_frames("00:01:00;02", rate)?, 1800);
//! # Ok::<(), textindex_core::CoreError>(())
//! ```

mod rate;

pub use rate::FrameRate;

use crate::utils::errors::{CoreError, Result};
use core::fmt;

/// An absolute frame position rendered under a frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timecode {
    frames: u64,
    rate: FrameRate,
}

impl Timecode {
    /// Wrap a frame count; any non-negative count is representable
    #[must_use]
    pub const fn new(frames: u64, rate: FrameRate) -> Self {
        Self { frames, rate }
    }

    /// Parse a timecode label under `rate`
    ///
    /// # Errors
    ///
    /// See [`timecode_to_frames`].
    pub fn parse(text: &str, rate: FrameRate) -> Result<Self> {
        timecode_to_frames(text, rate).map(|frames| Self::new(frames, rate))
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub const fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Label fields `(hours, minutes, seconds, frames)`
    #[must_use]
    pub fn components(&self) -> (u64, u64, u64, u64) {
        let timebase = u64::from(self.rate.timebase());
        let label = label_frames(self.frames, self.rate);
        let per_hour = timebase * 3600;
        let per_minute = timebase * 60;
        (
            label / per_hour,
            (label % per_hour) / per_minute,
            (label % per_minute) / timebase,
            label % timebase,
        )
    }

    /// Real time of this position in seconds
    #[must_use]
    pub fn to_seconds(&self) -> f64 {
        frames_to_seconds(self.frames, self.rate)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes, seconds, frames) = self.components();
        let separator = if self.rate.is_drop_frame() { ';' } else { ':' };
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}{separator}{frames:02}")
    }
}

/// Render an absolute frame count as a timecode
///
/// # Errors
///
/// Returns [`CoreError::InvalidFrameCount`] if `frame_count` is negative.
pub fn frames_to_timecode(frame_count: i64, rate: FrameRate) -> Result<Timecode> {
    let frames = u64::try_from(frame_count).map_err(|_| CoreError::InvalidFrameCount(frame_count))?;
    Ok(Timecode::new(frames, rate))
}

/// Parse `HH:MM:SS:FF` (or `HH:MM:SS;FF`) into an absolute frame count
///
/// Hours take two or more digits; minutes, seconds and frames exactly two.
///
/// # Errors
///
/// - [`CoreError::MalformedTimecode`] if the text does not match the
///   pattern, minutes or seconds exceed 59, or a drop-frame label names a
///   skipped frame number
/// - [`CoreError::FrameOutOfRange`] if `FF` is not below the rate's
///   rounded frames per second
pub fn timecode_to_frames(text: &str, rate: FrameRate) -> Result<u64> {
    let input = text.trim();
    let (head, frame_field) = input
        .rfind([':', ';'])
        .map(|idx| (&input[..idx], &input[idx + 1..]))
        .ok_or_else(|| CoreError::malformed_timecode(input, "expected HH:MM:SS:FF"))?;

    let mut fields = head.split(':');
    let (Some(hh), Some(mm), Some(ss), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(CoreError::malformed_timecode(input, "expected HH:MM:SS:FF"));
    };

    let hours = parse_field(hh, input, 2, usize::MAX)?;
    let minutes = parse_field(mm, input, 2, 2)?;
    let seconds = parse_field(ss, input, 2, 2)?;
    let frame = parse_field(frame_field, input, 2, 2)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(CoreError::malformed_timecode(
            input,
            "minutes and seconds must be below 60",
        ));
    }

    let timebase = u64::from(rate.timebase());
    if frame >= timebase {
        return Err(CoreError::FrameOutOfRange {
            input: input.to_string(),
            frame: frame as u32,
            limit: rate.timebase(),
        });
    }

    let drop = u64::from(rate.dropped_per_minute());
    if drop > 0 && seconds == 0 && frame < drop && minutes % 10 != 0 {
        return Err(CoreError::malformed_timecode(
            input,
            "frame number is skipped in drop-frame timecode",
        ));
    }

    let total_minutes = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .ok_or_else(|| CoreError::malformed_timecode(input, "hours out of range"))?;
    let label = total_minutes
        .checked_mul(timebase * 60)
        .and_then(|f| f.checked_add(seconds * timebase + frame))
        .ok_or_else(|| CoreError::malformed_timecode(input, "hours out of range"))?;

    Ok(label - drop * (total_minutes - total_minutes / 10))
}

/// Length of the half-open range `[start, end)` in frames
///
/// # Errors
///
/// Returns [`CoreError::InvalidRange`] if `end <= start`.
pub fn duration_frames(start: u64, end: u64) -> Result<u64> {
    if end <= start {
        return Err(CoreError::InvalidRange { start, end });
    }
    Ok(end - start)
}

/// Real time of a frame position in seconds
#[must_use]
pub fn frames_to_seconds(frames: u64, rate: FrameRate) -> f64 {
    frames as f64 * f64::from(rate.denominator()) / f64::from(rate.numerator())
}

/// Render a frame position as an SRT timestamp `HH:MM:SS,mmm`
///
/// Milliseconds are rounded to nearest from the exact rational time.
///
/// ```rust
/// # use textindex_core::{timecode::frames_to_srt_time, FrameRate};
/// let rate = FrameRate::ntsc(30, false)?;
/// assert_eq!(frames_to_srt_time(30, rate), "00:00:01,001");
/// # Ok::<(), textindex_core::CoreError>(())
/// ```
#[must_use]
pub fn frames_to_srt_time(frames: u64, rate: FrameRate) -> String {
    let num = u128::from(rate.numerator());
    let den = u128::from(rate.denominator());
    let millis = (u128::from(frames) * den * 2000 + num) / (2 * num);
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{ms:03}")
}

/// Map an absolute frame count to its label count (frames as if no
/// numbers were skipped)
fn label_frames(frames: u64, rate: FrameRate) -> u64 {
    let drop = u64::from(rate.dropped_per_minute());
    if drop == 0 {
        return frames;
    }
    let timebase = u64::from(rate.timebase());
    let per_minute = timebase * 60 - drop;
    let per_ten_minutes = timebase * 600 - drop * 9;

    let tens = frames / per_ten_minutes;
    let rem = frames % per_ten_minutes;
    let skipped_minutes = if rem > drop {
        (rem - drop) / per_minute
    } else {
        0
    };
    // saturates instead of wrapping for counts within a few minutes of u64::MAX
    frames
        .saturating_add(drop * 9 * tens)
        .saturating_add(drop * skipped_minutes)
}

fn parse_field(field: &str, input: &str, min_digits: usize, max_digits: usize) -> Result<u64> {
    let len = field.len();
    if len < min_digits || len > max_digits || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::malformed_timecode(input, "expected HH:MM:SS:FF"));
    }
    field
        .parse()
        .map_err(|_| CoreError::malformed_timecode(input, "field out of range"))
}
