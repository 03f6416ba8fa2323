//! # Fraction
//!
//! Exact rational durations measured in quarter notes.
//!
//! Durations in a rendered score are always exact ratios of a quarter note
//! (a triplet eighth is `1/3`, a dotted half is `3`). Summing them as floats
//! drifts over a long score, so every duration and beat position in this crate
//! is a [`Fraction`] until the very last step, where the tempo map turns it into
//! milliseconds.
//!
//! ## Text form
//! Fractions read and write as `"n/d"`, or as a plain integer `"n"` when the
//! denominator is one. This is also their serde representation, so a score
//! fixture can say `duration: 1/2`. Plain integers (`duration: 4`) are
//! accepted on input as well.
//!
//! ## Overflow
//! The operators panic on `i64` overflow, like the integers underneath.
//! Anything fed by score data uses [`Fraction::checked_add`] and
//! [`Fraction::checked_sub`] instead.

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedSub};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// An exact rational number of quarter notes.
///
/// Immutable: every arithmetic operation returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFraction", into = "String")]
pub struct Fraction(Rational64);

/// Serialized forms accepted on input
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFraction {
    Integer(i64),
    Text(String),
}

impl Fraction {
    /// Create a fraction, reduced to lowest terms.
    ///
    /// # Panics
    /// Panics if `denominator` is zero, like [`num_rational::Ratio::new`].
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self(Rational64::new(numerator, denominator))
    }

    pub fn zero() -> Self {
        Self(Rational64::from_integer(0))
    }

    pub fn from_integer(value: i64) -> Self {
        Self(Rational64::from_integer(value))
    }

    pub fn numerator(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denominator(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.numerator() == 0
    }

    pub fn is_negative(&self) -> bool {
        self.numerator() < 0
    }

    /// Lossy conversion, used only when converting beats into milliseconds.
    pub fn to_f64(&self) -> f64 {
        self.numerator() as f64 / self.denominator() as f64
    }

    /// `None` when the sum does not fit in `i64` terms.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(&rhs.0).map(Self)
    }

    /// `None` when the difference does not fit in `i64` terms.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(&rhs.0).map(Self)
    }

    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Zero for negative values, the value itself otherwise.
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Self::zero()
        } else {
            self
        }
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Fraction {
    type Output = Fraction;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul for Fraction {
    type Output = Fraction;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl Div for Fraction {
    type Output = Fraction;

    /// # Panics
    /// Panics when dividing by zero.
    fn div(self, rhs: Self) -> Self::Output {
        Self(self.0 / rhs.0)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator() == 1 {
            write!(f, "{}", self.numerator())
        } else {
            write!(f, "{}/{}", self.numerator(), self.denominator())
        }
    }
}

impl FromStr for Fraction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (numer, denom) = match trimmed.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (trimmed, "1"),
        };
        let numerator: i64 = numer
            .parse()
            .map_err(|_| format!("Invalid fraction numerator in '{}'", s))?;
        let denominator: i64 = denom
            .parse()
            .map_err(|_| format!("Invalid fraction denominator in '{}'", s))?;
        if denominator == 0 {
            return Err(format!("Fraction '{}' has a zero denominator", s));
        }
        // Reducing or normalizing the sign of i64::MIN overflows
        if numerator == i64::MIN || denominator == i64::MIN {
            return Err(format!("Fraction '{}' is out of range", s));
        }
        Ok(Self::new(numerator, denominator))
    }
}

impl TryFrom<RawFraction> for Fraction {
    type Error = String;

    fn try_from(value: RawFraction) -> Result<Self, Self::Error> {
        match value {
            RawFraction::Integer(i64::MIN) => Err(format!("Fraction '{}' is out of range", i64::MIN)),
            RawFraction::Integer(n) => Ok(Self::from_integer(n)),
            RawFraction::Text(text) => text.parse(),
        }
    }
}

impl TryFrom<String> for Fraction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fraction> for String {
    fn from(value: Fraction) -> Self {
        value.to_string()
    }
}
