use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// A currency amount with two-decimal precision, stored as whole cents.
///
/// Every value that enters the crate as a floating point number (store
/// columns, JSON payloads, CLI input) goes through [`round_currency`], so
/// arithmetic between `Money` values never drifts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid currency amount '{0}'")]
pub struct MoneyParseError(String);

/// Rounds a decimal amount to two places, half away from zero.
///
/// This is the single rounding entry point; change the policy here.
pub fn round_currency(value: f64) -> Money {
    if !value.is_finite() {
        return Money::ZERO;
    }
    Money((value * 100.0).round() as i64)
}

/// `round2(quantity * unit_price)`.
pub fn line_total(unit_price: Money, quantity: u64) -> Money {
    let quantity = i64::try_from(quantity).unwrap_or(i64::MAX);
    Money(unit_price.0.saturating_mul(quantity))
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Accepts `12.5`, `12.50` and the comma form `12,50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        let value = normalized
            .parse::<f64>()
            .map_err(|_| MoneyParseError(s.to_string()))?;
        if !value.is_finite() {
            return Err(MoneyParseError(s.to_string()));
        }
        Ok(round_currency(value))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(round_currency(value))
    }
}
