//! Exact rational values `count / base` for timebases, rates and volumes.
//!
//! [`FixedPoint`] fixes the base at compile time (format constants such as
//! 16.16 rates), [`RuntimeFixedPoint`] carries it alongside the count (track
//! and movie timebases). Rebasing always divides out the gcd of the two
//! bases before multiplying.

use crate::util::gcd;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Least common multiple, computed as `a * (b / gcd(a, b))`.
pub const fn common_base(a: u64, b: u64) -> u64 {
    a * (b / gcd(a, b))
}

/// Re-express `count / from` in units of `1 / to`, truncating toward zero.
pub fn change_timebase(count: i64, from: u64, to: u64) -> i64 {
    let d = gcd(from, to);
    (count * (to / d) as i64) / (from / d) as i64
}

// count * m_self <=> other * m_other, with both bases reduced by their gcd
fn cross_cmp(count: i64, base: u64, other_count: i64, other_base: u64) -> Ordering {
    let d = gcd(base, other_base);
    let m1 = (other_base / d) as i64;
    let m2 = (base / d) as i64;
    (count * m1).cmp(&(other_count * m2))
}

#[derive(Clone, Copy, Default)]
pub struct FixedPoint<const BASE: u32> {
    count: i64,
}

/// 16.16 fixed point (rates, matrix entries, track dimensions).
pub type Fixed16_16 = FixedPoint<0x0001_0000>;
/// 8.8 fixed point (volumes).
pub type Fixed8_8 = FixedPoint<0x0100>;
/// 2.30 fixed point (matrix u/v/w column).
pub type Fixed2_30 = FixedPoint<0x4000_0000>;

impl<const BASE: u32> FixedPoint<BASE> {
    pub const fn with_count(count: i64) -> Self {
        FixedPoint { count }
    }

    pub fn from_f32(value: f32) -> Self {
        Self::with_count((value as f64 * BASE as f64) as i64)
    }

    pub fn from_timebase(count: i64, from_timebase: u64) -> Self {
        Self::with_count(change_timebase(count, from_timebase, BASE as u64))
    }

    pub const fn base() -> u32 {
        BASE
    }

    pub const fn count(&self) -> i64 {
        self.count
    }

    pub fn set_count(&mut self, count: i64) {
        self.count = count;
    }

    pub fn in_timebase(&self, to_timebase: u64) -> i64 {
        change_timebase(self.count, BASE as u64, to_timebase)
    }

    pub fn convert<const OTHER: u32>(self) -> FixedPoint<OTHER> {
        FixedPoint::with_count(self.in_timebase(OTHER as u64))
    }

    pub fn to_f32(&self) -> f32 {
        (self.count as f64 / BASE as f64) as f32
    }

    pub fn before(&self) -> Self {
        Self::with_count(self.count - 1)
    }

    pub fn after(&self) -> Self {
        Self::with_count(self.count + 1)
    }

    pub fn abs(&self) -> Self {
        Self::with_count(self.count.abs())
    }

    pub fn to_runtime(self) -> RuntimeFixedPoint {
        self.into()
    }

    /// Sum in the least common base of the two operands.
    pub fn add_promoted<const OTHER: u32>(self, other: FixedPoint<OTHER>) -> RuntimeFixedPoint {
        self.to_runtime() + other.to_runtime()
    }

    /// Difference in the least common base of the two operands.
    pub fn sub_promoted<const OTHER: u32>(self, other: FixedPoint<OTHER>) -> RuntimeFixedPoint {
        self.to_runtime() - other.to_runtime()
    }
}

impl<const BASE: u32> Add for FixedPoint<BASE> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::with_count(self.count + rhs.count)
    }
}

impl<const BASE: u32> Sub for FixedPoint<BASE> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::with_count(self.count - rhs.count)
    }
}

impl<const BASE: u32> AddAssign for FixedPoint<BASE> {
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
    }
}

impl<const BASE: u32> SubAssign for FixedPoint<BASE> {
    fn sub_assign(&mut self, rhs: Self) {
        self.count -= rhs.count;
    }
}

impl<const BASE: u32> Neg for FixedPoint<BASE> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::with_count(-self.count)
    }
}

impl<const BASE: u32> Mul<f32> for FixedPoint<BASE> {
    type Output = Self;
    fn mul(self, f: f32) -> Self {
        Self::with_count((self.count as f64 * f as f64) as i64)
    }
}

impl<const BASE: u32, const OTHER: u32> PartialEq<FixedPoint<OTHER>> for FixedPoint<BASE> {
    fn eq(&self, other: &FixedPoint<OTHER>) -> bool {
        cross_cmp(self.count, BASE as u64, other.count, OTHER as u64) == Ordering::Equal
    }
}

impl<const BASE: u32> Eq for FixedPoint<BASE> {}

impl<const BASE: u32, const OTHER: u32> PartialOrd<FixedPoint<OTHER>> for FixedPoint<BASE> {
    fn partial_cmp(&self, other: &FixedPoint<OTHER>) -> Option<Ordering> {
        Some(cross_cmp(self.count, BASE as u64, other.count, OTHER as u64))
    }
}

impl<const BASE: u32> Ord for FixedPoint<BASE> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count.cmp(&other.count)
    }
}

impl<const BASE: u32> fmt::Display for FixedPoint<BASE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}({})", self.count, BASE, self.to_f32())
    }
}

impl<const BASE: u32> fmt::Debug for FixedPoint<BASE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// On the wire and in JSON only the count matters; the base is in the type.
impl<const BASE: u32> Serialize for FixedPoint<BASE> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_i64(self.count)
    }
}

impl<'de, const BASE: u32> Deserialize<'de> for FixedPoint<BASE> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        i64::deserialize(d).map(Self::with_count)
    }
}

/// Fixed point value whose base is only known at runtime.
///
/// `base` must be non-zero.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct RuntimeFixedPoint {
    count: i64,
    base: u64,
}

impl RuntimeFixedPoint {
    pub fn new(count: i64, base: u64) -> Self {
        debug_assert!(base != 0, "fixed point base must be non-zero");
        RuntimeFixedPoint { count, base }
    }

    pub fn from_f32(value: f32, base: u64) -> Self {
        Self::new((value as f64 * base as f64) as i64, base)
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn rebased_count(&self, new_base: u64) -> i64 {
        change_timebase(self.count, self.base, new_base)
    }

    pub fn in_timebase(&self, new_base: u64) -> Self {
        Self::new(self.rebased_count(new_base), new_base)
    }

    pub fn to_fixed<const BASE: u32>(&self) -> FixedPoint<BASE> {
        FixedPoint::with_count(self.rebased_count(BASE as u64))
    }

    pub fn to_f32(&self) -> f32 {
        (self.count as f64 / self.base as f64) as f32
    }

    pub fn abs(&self) -> Self {
        Self::new(self.count.abs(), self.base)
    }
}

impl<const BASE: u32> From<FixedPoint<BASE>> for RuntimeFixedPoint {
    fn from(f: FixedPoint<BASE>) -> Self {
        RuntimeFixedPoint::new(f.count(), BASE as u64)
    }
}

impl Add for RuntimeFixedPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let base = common_base(self.base, rhs.base);
        Self::new(self.rebased_count(base) + rhs.rebased_count(base), base)
    }
}

impl Sub for RuntimeFixedPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let base = common_base(self.base, rhs.base);
        Self::new(self.rebased_count(base) - rhs.rebased_count(base), base)
    }
}

impl AddAssign for RuntimeFixedPoint {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for RuntimeFixedPoint {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for RuntimeFixedPoint {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.count, self.base)
    }
}

impl PartialEq for RuntimeFixedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RuntimeFixedPoint {}

impl PartialOrd for RuntimeFixedPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuntimeFixedPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        cross_cmp(self.count, self.base, other.count, other.base)
    }
}

impl fmt::Display for RuntimeFixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}({})", self.count, self.base, self.to_f32())
    }
}

impl fmt::Debug for RuntimeFixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
