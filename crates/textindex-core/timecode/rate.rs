//! Frame rate context
//!
//! A frame rate is kept as a reduced rational so that 30000/1001 and
//! 60000/2002 compare and hash equal, and never as a float.

use crate::utils::errors::{CoreError, Result};
use core::fmt;
use core::str::FromStr;

/// Rational frames-per-second plus the drop-frame flag
///
/// # Examples
///
/// ```rust
/// use textindex_core::FrameRate;
///
/// let ntsc: FrameRate = "29.97df".parse()?;
/// assert_eq!((ntsc.numerator(), ntsc.denominator()), (30000, 1001));
/// assert!(ntsc.is_drop_frame());
/// assert_eq!(ntsc.timebase(), 30);
/// # Ok::<(), textindex_core::CoreError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRate {
    num: u32,
    den: u32,
    drop_frame: bool,
}

impl FrameRate {
    /// 25 fps
    pub const PAL: Self = Self {
        num: 25,
        den: 1,
        drop_frame: false,
    };

    /// Create a frame rate from a rational `num / den`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFrameRate`] if either term is zero, if
    /// the rate rounds to zero frames per second, or if drop-frame is
    /// requested for anything but a 29.97/59.94-class rate.
    pub fn new(num: u32, den: u32, drop_frame: bool) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(CoreError::invalid_frame_rate(format!("{num}/{den}")));
        }
        let divisor = gcd(num, den);
        let rate = Self {
            num: num / divisor,
            den: den / divisor,
            drop_frame,
        };
        if rate.timebase() == 0 {
            return Err(CoreError::invalid_frame_rate(format!(
                "{}/{} is below half a frame per second",
                rate.num, rate.den
            )));
        }
        if drop_frame && !rate.supports_drop_frame() {
            return Err(CoreError::invalid_frame_rate(format!(
                "{}/{} cannot use drop-frame timecode",
                rate.num, rate.den
            )));
        }
        Ok(rate)
    }

    /// Integer frame rate such as 24, 25 or 50
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFrameRate`] for zero.
    pub fn integer(fps: u32) -> Result<Self> {
        Self::new(fps, 1, false)
    }

    /// NTSC-family rate `timebase * 1000 / 1001` (23.976, 29.97, 59.94)
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFrameRate`] for a zero timebase or an
    /// unsupported drop-frame combination.
    pub fn ntsc(timebase: u32, drop_frame: bool) -> Result<Self> {
        let num = timebase
            .checked_mul(1000)
            .ok_or_else(|| CoreError::invalid_frame_rate(format!("timebase {timebase}")))?;
        Self::new(num, 1001, drop_frame)
    }

    #[must_use]
    pub const fn numerator(self) -> u32 {
        self.num
    }

    #[must_use]
    pub const fn denominator(self) -> u32 {
        self.den
    }

    #[must_use]
    pub const fn is_drop_frame(self) -> bool {
        self.drop_frame
    }

    /// Approximate frames per second, for display only
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Rounded frames per second used for timecode labels (30 for 29.97)
    #[must_use]
    pub const fn timebase(self) -> u32 {
        let num = self.num as u64;
        let den = self.den as u64;
        ((2 * num + den) / (2 * den)) as u32
    }

    /// Frame labels skipped at each non-tenth minute (2 for 29.97, 4 for 59.94)
    #[must_use]
    pub const fn dropped_per_minute(self) -> u32 {
        if self.drop_frame {
            self.timebase() / 15
        } else {
            0
        }
    }

    const fn supports_drop_frame(self) -> bool {
        let timebase = self.timebase();
        self.den != 1 && (timebase == 30 || timebase == 60)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)?;
        } else {
            write!(f, "{}/{}", self.num, self.den)?;
        }
        if self.drop_frame {
            f.write_str("df")?;
        }
        Ok(())
    }
}

impl FromStr for FrameRate {
    type Err = CoreError;

    /// Parse `"25"`, `"29.97"`, `"30000/1001"`, optionally suffixed `df`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let (body, drop_frame) = lower
            .strip_suffix("df")
            .map_or((lower.as_str(), false), |b| (b.trim_end(), true));

        if let Some((num, den)) = body.split_once('/') {
            let num = parse_u32(num.trim(), trimmed)?;
            let den = parse_u32(den.trim(), trimmed)?;
            return Self::new(num, den, drop_frame);
        }

        if let Some(timebase) = ntsc_timebase(body) {
            return Self::ntsc(timebase, drop_frame);
        }

        match body.split_once('.') {
            None => Self::new(parse_u32(body, trimmed)?, 1, drop_frame),
            Some((whole, frac)) => {
                let frac = frac.trim_end_matches('0');
                if frac.len() > 6 {
                    return Err(CoreError::invalid_frame_rate(trimmed));
                }
                let scale = 10u32.pow(frac.len() as u32);
                let whole = parse_u32(whole, trimmed)?;
                let frac = if frac.is_empty() {
                    0
                } else {
                    parse_u32(frac, trimmed)?
                };
                let num = whole
                    .checked_mul(scale)
                    .and_then(|w| w.checked_add(frac))
                    .ok_or_else(|| CoreError::invalid_frame_rate(trimmed))?;
                Self::new(num, scale, drop_frame)
            }
        }
    }
}

/// Decimal spellings of the x000/1001 rates hosts report
fn ntsc_timebase(body: &str) -> Option<u32> {
    match body {
        "23.976" | "23.98" => Some(24),
        "29.97" => Some(30),
        "47.952" | "47.95" => Some(48),
        "59.94" => Some(60),
        "119.88" => Some(120),
        _ => None,
    }
}

fn parse_u32(digits: &str, original: &str) -> Result<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_frame_rate(original));
    }
    digits
        .parse()
        .map_err(|_| CoreError::invalid_frame_rate(original))
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
