//! Scaled integers: rational numbers stored as an integer numerator and a
//! power-of-ten scale, used to turn real-valued distances into an exact
//! integer metric.
//!
//! ```
//! use haplotype_network::scaled::{choose_scale, ScaledIntegerCodec};
//!
//! assert_eq!(choose_scale(0.5, 2.25, 6), 100.0);
//! let codec = ScaledIntegerCodec::new(0.5, 2.25, 6).unwrap();
//! assert_eq!(codec.to_int(2.25), 225);
//! assert_eq!(codec.to_double(50), 0.5);
//! ```

use derive_new::new;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Absolute tolerance under which a value counts as an integer.
pub const INTEGER_TOLERANCE: f64 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("range maximum {max} is not greater than minimum {min}")]
    EmptyRange { min: f64, max: f64 },
}

/// A value `value / scale` where `scale` is a power of ten.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct ScaledInteger {
    pub value: i64,
    pub scale: f64,
}

impl ScaledInteger {
    pub fn to_double(&self) -> f64 {
        self.value as f64 / self.scale
    }
}

fn is_integer_like(x: f64) -> bool {
    (x - x.round()).abs() < INTEGER_TOLERANCE
}

/// Smallest power of ten, with at most `max_digits` digits, that makes both
/// `min` and `max` integral. Falls back to `10^max_digits`.
pub fn choose_scale(min: f64, max: f64, max_digits: u32) -> f64 {
    if is_integer_like(min) && is_integer_like(max) {
        return 1.0;
    }
    for d in 0..=max_digits {
        let scale = 10f64.powi(d as i32);
        if is_integer_like(min * scale) && is_integer_like(max * scale) {
            return scale;
        }
    }
    10f64.powi(max_digits as i32)
}

/// Converts doubles to integers and back with a fixed power-of-ten scale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledIntegerCodec {
    scale: f64,
}

impl ScaledIntegerCodec {
    /// Create a codec for values in `[min, max]`. Requires `max > min`.
    pub fn new(min: f64, max: f64, max_digits: u32) -> Result<Self, ScaleError> {
        if !(max > min) {
            return Err(ScaleError::EmptyRange { min, max });
        }
        Ok(Self::with_scale(choose_scale(min, max, max_digits)))
    }

    /// Create a codec with an explicit scale.
    pub fn with_scale(scale: f64) -> Self {
        ScaledIntegerCodec { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rounded, unchecked integer image of `x`.
    pub fn to_int(&self, x: f64) -> i64 {
        (x * self.scale).round() as i64
    }

    pub fn to_double(&self, i: i64) -> f64 {
        i as f64 / self.scale
    }

    pub fn encode(&self, x: f64) -> ScaledInteger {
        ScaledInteger::new(self.to_int(x), self.scale)
    }
}
