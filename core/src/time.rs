use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);
    pub const INFINITY: Time = Time(f64::INFINITY);

    #[inline]
    pub fn new(value: f64) -> Self {
        Time(value)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        self.0.is_infinite()
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl Default for Time {
    fn default() -> Self {
        Time::ZERO
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Time(value)
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl Sub for Time {
    type Output = Time;

    /// `∞ − t` stays infinite for any finite `t`.
    fn sub(self, rhs: Time) -> Time {
        if self.is_infinite() && rhs.is_finite() {
            return self;
        }
        Time(self.0 - rhs.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "+inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Plain absolute near-equality on raw values.
pub fn approx_equal(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// How two instants are compared when deciding "exactly my σ elapsed".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// `|a − b| < eps`
    Absolute(f64),
    /// `|a − b| < eps · max(1, |a|, |b|)`
    Relative(f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Absolute(1e-10)
    }
}

impl Tolerance {
    pub fn approx_eq(self, a: Time, b: Time) -> bool {
        if a.is_infinite() || b.is_infinite() {
            return a == b;
        }
        let (a, b) = (a.value(), b.value());
        match self {
            Tolerance::Absolute(eps) => approx_equal(a, b, eps),
            Tolerance::Relative(eps) => {
                let scale = 1f64.max(a.abs()).max(b.abs());
                approx_equal(a, b, eps * scale)
            }
        }
    }
}
