use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::QuantityError;

/// A Kubernetes resource amount held as an exact decimal in base units
/// (cores for CPU, bytes for memory, a plain count for pods).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceQuantity(Decimal);

impl ResourceQuantity {
    pub const ZERO: ResourceQuantity = ResourceQuantity(Decimal::ZERO);

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add two quantities, failing instead of wrapping when the sum leaves the
    /// representable range.
    pub fn checked_add(&self, other: &ResourceQuantity) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| QuantityError::Overflow(format!("{} + {}", self, other)))
    }

    /// Value in thousandths of the base unit, rounded up. CPU is reported in
    /// millicores through this accessor.
    pub fn milli_value(&self) -> Result<i64, QuantityError> {
        self.0
            .checked_mul(Decimal::ONE_THOUSAND)
            .and_then(|milli| milli.ceil().to_i64())
            .ok_or_else(|| QuantityError::Overflow(format!("{self} in thousandths")))
    }

    /// Value in base units, rounded up.
    pub fn value(&self) -> Result<i64, QuantityError> {
        self.0
            .ceil()
            .to_i64()
            .ok_or_else(|| QuantityError::Overflow(self.to_string()))
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for ResourceQuantity {
    type Err = QuantityError;

    /// Parse the Kubernetes quantity notation, e.g. `500m`, `1.5`, `8Gi`,
    /// `2k` or `12e6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(QuantityError::Empty);
        }

        let split = input
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
            .unwrap_or(input.len());
        let (number, suffix) = input.split_at(split);

        let number = parse_number(s, number)?;
        let multiplier = suffix_multiplier(suffix).ok_or_else(|| QuantityError::InvalidSuffix {
            quantity: s.to_string(),
            suffix: suffix.to_string(),
        })??;

        number
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| QuantityError::Overflow(s.to_string()))
    }
}

impl TryFrom<&Quantity> for ResourceQuantity {
    type Error = QuantityError;

    fn try_from(quantity: &Quantity) -> Result<Self, Self::Error> {
        quantity.0.parse()
    }
}

/// Parse the numeric part of a quantity. Well-formed digits beyond the
/// decimal precision are an overflow rather than a syntax error.
fn parse_number(quantity: &str, number: &str) -> Result<Decimal, QuantityError> {
    let invalid = || QuantityError::InvalidNumber(quantity.to_string());
    let (negative, unsigned) = match number.as_bytes().first().ok_or_else(invalid)? {
        b'-' => (true, &number[1..]),
        b'+' => (false, &number[1..]),
        _ => (false, number),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
    {
        return Err(invalid());
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let canonical = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };

    let value = Decimal::from_str(&canonical)
        .map_err(|_| QuantityError::Overflow(quantity.to_string()))?;
    Ok(if negative { -value } else { value })
}

/// Multiplier for a unit suffix. `None` means the suffix is unknown,
/// `Some(Err)` means a decimal exponent outside the representable range.
fn suffix_multiplier(suffix: &str) -> Option<Result<Decimal, QuantityError>> {
    let binary = |shift: u32| Decimal::from(1u64 << shift);
    let multiplier = match suffix {
        "Ki" => binary(10),
        "Mi" => binary(20),
        "Gi" => binary(30),
        "Ti" => binary(40),
        "Pi" => binary(50),
        "Ei" => binary(60),
        "n" => Decimal::new(1, 9),
        "u" => Decimal::new(1, 6),
        "m" => Decimal::new(1, 3),
        "" => Decimal::ONE,
        "k" => Decimal::from(1_000u64),
        "M" => Decimal::from(1_000_000u64),
        "G" => Decimal::from(1_000_000_000u64),
        "T" => Decimal::from(1_000_000_000_000u64),
        "P" => Decimal::from(1_000_000_000_000_000u64),
        "E" => Decimal::from(1_000_000_000_000_000_000u64),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?
                .parse::<i32>()
                .ok()?;
            return Some(
                power_of_ten(exponent).ok_or_else(|| QuantityError::Overflow(suffix.to_string())),
            );
        }
    };
    Some(Ok(multiplier))
}

fn power_of_ten(exponent: i32) -> Option<Decimal> {
    if exponent < 0 {
        let scale = exponent.unsigned_abs();
        return (scale <= 28).then(|| Decimal::new(1, scale));
    }
    (0..exponent).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN))
}
