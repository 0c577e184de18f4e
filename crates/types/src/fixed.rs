//! Fixed-point asset amounts.

use crate::codec::{CodecError, Reader, Writer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of decimal places carried by [`Fixed64`].
pub const FIXED64_DECIMALS: u32 = 8;

const SCALE: i64 = 100_000_000;

/// Signed 64-bit fixed-point amount with 8 decimal places.
///
/// The raw value counts 10^-8 units. `+`/`-` saturate; use the `checked_*`
/// variants where overflow must be detected.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Fixed64(i64);

impl Fixed64 {
    pub const ZERO: Self = Self(0);

    /// Wrap a raw value already expressed in 10^-8 units.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Whole units, scaled by 10^8. Saturates on overflow.
    pub const fn from_decimal(units: i64) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Whether the value is representable with `precision` decimal places.
    pub fn fits_precision(self, precision: u8) -> bool {
        let precision = u32::from(precision);
        if precision >= FIXED64_DECIMALS {
            return true;
        }
        let step = 10i64.pow(FIXED64_DECIMALS - precision);
        self.0 % step == 0
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_i64(self.0);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        r.read_i64().map(Self)
    }
}

impl Add for Fixed64 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Fixed64 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed64 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Fixed64 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fixed64 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Fixed64 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(f, "{sign}{}.{:08}", abs / scale, abs % scale)
    }
}

impl fmt::Debug for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed64({self})")
    }
}
