//! # Money Module
//!
//! Provides the `Money` type for sale amounts.
//!
//! ## Integer Amounts, Decimal Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  In memory:   Money(150050)        ← minor units (paise), i64           │
//! │  In JSON:     1500.5               ← major units, decimal number        │
//! │  Legacy JSON: "1500.50"            ← numeric strings are accepted       │
//! │                                                                         │
//! │  Splitting ₹100.00 across 3 categories:                                 │
//! │    [₹33.34, ₹33.33, ₹33.33]  ← remainder goes to the first parts        │
//! │    sum is always exactly ₹100.00                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backups and remote documents carry decimal amounts, so the serde impls
//! convert at the boundary and every calculation stays in integers.
//!
//! Amounts beyond [`Money::MAX`] are rejected on input, and arithmetic
//! saturates, so totals over any record set never overflow.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

/// Minor units per major unit (paise per rupee, cents per dollar).
pub const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that profit can go negative when a sale is made at a loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Largest amount accepted from input, either sign: one trillion major
    /// units.
    pub const MAX: Money = Money(1_000_000_000_000 * MINOR_PER_MAJOR);

    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use gemledger_core::money::Money;
    ///
    /// let price = Money::from_minor(150050); // ₹1500.50
    /// assert_eq!(price.minor(), 150050);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole major units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whether the magnitude is within [`Money::MAX`].
    #[inline]
    pub const fn in_range(&self) -> bool {
        self.0.unsigned_abs() <= Money::MAX.0.unsigned_abs()
    }

    /// Converts a float in major units, rounding to the nearest minor unit.
    ///
    /// Only used when reading decimal JSON numbers; arithmetic never goes
    /// through floats.
    pub fn from_major_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let minor = (value * MINOR_PER_MAJOR as f64).round();
        if minor.abs() > Money::MAX.0 as f64 {
            return None;
        }
        Some(Money(minor as i64))
    }

    /// Returns the value in major units as a float, for the wire format.
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Parses a human-entered decimal amount such as `"1500"`, `"1,500.50"`
    /// or `"₹ 99.9"`.
    ///
    /// Currency symbols and thousands separators are ignored. More than two
    /// fractional digits are rounded half away from zero. Returns `None` for
    /// empty or non-numeric input and for amounts beyond [`Money::MAX`].
    ///
    /// ```rust
    /// use gemledger_core::money::Money;
    ///
    /// assert_eq!(Money::parse("1,500.50"), Some(Money::from_minor(150050)));
    /// assert_eq!(Money::parse("₹ 99.9"), Some(Money::from_minor(9990)));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let cleaned: String = input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if cleaned.is_empty() || cleaned == "-" || cleaned == "." {
            return None;
        }

        let (negative, body) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        if body.contains('-') {
            return None;
        }

        let mut parts = body.splitn(2, '.');
        let whole = parts.next().unwrap_or("");
        let frac = parts.next().unwrap_or("");
        if frac.contains('.') {
            return None;
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().ok()?
        };

        let digits: Vec<i64> = frac
            .chars()
            .filter_map(|c| c.to_digit(10).map(i64::from))
            .collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = digits.get(2).map(|d| *d >= 5).unwrap_or(false);

        let mut minor = whole
            .checked_mul(MINOR_PER_MAJOR)?
            .checked_add(tenths * 10 + hundredths)?;
        if round_up {
            minor = minor.checked_add(1)?;
        }

        let money = Money(if negative { -minor } else { minor });
        money.in_range().then_some(money)
    }

    /// Splits the amount into `parts` shares that sum exactly to `self`.
    ///
    /// Leftover minor units are handed out one each to the first shares.
    /// Returns an empty vector when `parts` is zero.
    ///
    /// ```rust
    /// use gemledger_core::money::Money;
    ///
    /// let shares = Money::from_minor(10000).split_evenly(3);
    /// assert_eq!(shares, vec![
    ///     Money::from_minor(3334),
    ///     Money::from_minor(3333),
    ///     Money::from_minor(3333),
    /// ]);
    /// ```
    pub fn split_evenly(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let n = parts as i64;
        let base = self.0 / n;
        let remainder = (self.0 % n).abs();
        let step = self.0.signum();

        (0..n)
            .map(|i| {
                if i < remainder {
                    Money(base + step)
                } else {
                    Money(base)
                }
            })
            .collect()
    }

    /// Average of `total` over `count` items, rounded half away from zero.
    /// Zero when `count` is zero.
    pub fn average(total: Money, count: usize) -> Money {
        if count == 0 {
            return Money::zero();
        }
        let count = count as i128;
        let total = total.0 as i128;
        let rounded = if total >= 0 {
            (2 * total + count) / (2 * count)
        } else {
            -((2 * -total + count) / (2 * count))
        };
        Money(rounded as i64)
    }

    /// `self` as a percentage of `whole`; 0 when `whole` is zero.
    pub fn percent_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        self.0 as f64 / whole.0 as f64 * 100.0
    }

    /// Formats with a currency symbol prefix, e.g. `₹1500.00`.
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            self.major().abs(),
            self.minor_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal without a currency symbol; use [`Money::format_with`] for
/// display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with(""))
    }
}

// Saturating: aggregates must stay total over any input.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Serde: decimal major units on the wire
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.minor_part() == 0 {
            serializer.serialize_i64(self.major())
        } else {
            serializer.serialize_f64(self.to_major_f64())
        }
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(MINOR_PER_MAJOR)
            .map(Money)
            .filter(Money::in_range)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("amount out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_major_f64(v).ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        if v.trim().is_empty() {
            return Ok(Money::zero());
        }
        Money::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Money, D::Error> {
        d.deserialize_any(MoneyVisitor)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor_and_parts() {
        let money = Money::from_minor(150050);
        assert_eq!(money.major(), 1500);
        assert_eq!(money.minor_part(), 50);
        assert_eq!(Money::from_major(12).minor(), 1200);
    }

    #[test]
    fn test_display_and_format() {
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
        assert_eq!(Money::from_minor(150000).format_with("₹"), "₹1500.00");
        assert_eq!(Money::from_minor(-550).format_with("₹"), "-₹5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_major(10);
        let b = Money::from_major(5);
        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((b - a).minor(), -500);

        let total: Money = vec![a, b, b].iter().sum();
        assert_eq!(total, Money::from_major(20));
    }

    #[test]
    fn test_amount_bound_and_saturation() {
        assert!(Money::MAX.in_range());
        assert!(!Money::from_minor(Money::MAX.minor() + 1).in_range());
        assert!(Money::from_minor(-Money::MAX.minor()).in_range());

        assert_eq!(Money::parse("1000000000000"), Some(Money::MAX));
        assert_eq!(Money::parse("1000000000000.01"), None);
        assert!(serde_json::from_str::<Money>("90000000000000000").is_err());
        assert!(serde_json::from_str::<Money>("9e16").is_err());
        assert!(serde_json::from_str::<Money>("\"2000000000000\"").is_err());
        assert!(serde_json::from_str::<Money>("1000000000000").is_ok());

        let huge = Money::from_minor(i64::MAX - 1);
        assert_eq!(huge + huge, Money::from_minor(i64::MAX));
        assert_eq!(Money::from_minor(i64::MIN) - huge, Money::from_minor(i64::MIN));
        let total: Money = vec![huge, huge, huge].into_iter().sum();
        assert_eq!(total, Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_parse_human_input() {
        assert_eq!(Money::parse("1500"), Some(Money::from_major(1500)));
        assert_eq!(Money::parse("1,500.5"), Some(Money::from_minor(150050)));
        assert_eq!(Money::parse("₹ 0.99"), Some(Money::from_minor(99)));
        assert_eq!(Money::parse("-5.5"), Some(Money::from_minor(-550)));
        assert_eq!(Money::parse("2.345"), Some(Money::from_minor(235)));
        assert_eq!(Money::parse(".5"), Some(Money::from_minor(50)));
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("n/a"), None);
        assert_eq!(Money::parse("1.2.3"), None);
    }

    #[test]
    fn test_split_evenly_conserves_total() {
        let hundred = Money::from_major(100);
        assert_eq!(
            hundred.split_evenly(2),
            vec![Money::from_major(50), Money::from_major(50)]
        );

        let shares = hundred.split_evenly(3);
        assert_eq!(shares.iter().sum::<Money>(), hundred);
        assert_eq!(shares[0].minor(), 3334);

        let loss = Money::from_minor(-100).split_evenly(3);
        assert_eq!(loss.iter().sum::<Money>().minor(), -100);
        assert_eq!(loss[0].minor(), -34);

        assert!(hundred.split_evenly(0).is_empty());
    }

    #[test]
    fn test_average() {
        assert_eq!(
            Money::average(Money::from_major(300), 2),
            Money::from_major(150)
        );
        assert_eq!(Money::average(Money::from_minor(10), 3).minor(), 3);
        assert_eq!(Money::average(Money::from_minor(5), 2).minor(), 3);
        assert_eq!(Money::average(Money::from_major(300), 0), Money::zero());
    }

    #[test]
    fn test_percent_of() {
        let profit = Money::from_major(30);
        assert!((profit.percent_of(Money::from_major(100)) - 30.0).abs() < f64::EPSILON);
        assert_eq!(profit.percent_of(Money::zero()), 0.0);
    }

    #[test]
    fn test_serde_decimal_wire_format() {
        let json = serde_json::to_string(&Money::from_minor(150050)).unwrap();
        assert_eq!(json, "1500.5");
        let json = serde_json::to_string(&Money::from_major(200)).unwrap();
        assert_eq!(json, "200");

        let parsed: Money = serde_json::from_str("1500.5").unwrap();
        assert_eq!(parsed.minor(), 150050);
        let parsed: Money = serde_json::from_str("\"99.99\"").unwrap();
        assert_eq!(parsed.minor(), 9999);
        let parsed: Money = serde_json::from_str("null").unwrap();
        assert!(parsed.is_zero());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }
}
