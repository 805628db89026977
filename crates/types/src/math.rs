use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Normalized amount (quantities, values, shares).
pub type Amount = u128;

/// Fixed-point scale of [`D18`]: 10^18.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Arithmetic failures. Never silently wrapped or saturated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow in {op}")]
    Overflow { op: &'static str },

    #[error("division by zero in {op}")]
    DivisionByZero { op: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
    Nearest,
}

/// `a * b / denominator` with a 256-bit intermediate.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero { op: "mul_div" });
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    let remainder = product % denominator;

    let round_up = match rounding {
        Rounding::Down => false,
        Rounding::Up => !remainder.is_zero(),
        Rounding::Nearest => remainder * U256::from(2u8) >= denominator,
    };
    if round_up {
        quotient += U256::one();
    }

    if quotient > U256::from(u128::MAX) {
        return Err(MathError::Overflow { op: "mul_div" });
    }
    Ok(quotient.low_u128())
}

pub fn checked_add(a: u128, b: u128, op: &'static str) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow { op })
}

/// 18-decimal fixed-point number, used for prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct D18(pub u128);

impl D18 {
    pub const ZERO: D18 = D18(0);
    pub const ONE: D18 = D18(SCALE);

    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub fn from_integer(value: u64) -> Self {
        Self(value as u128 * SCALE)
    }

    /// `numerator / denominator` as a fixed-point value, rounded down.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, MathError> {
        mul_div(numerator, SCALE, denominator, Rounding::Down).map(Self)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `amount * self`.
    pub fn mul_amount(&self, amount: Amount, rounding: Rounding) -> Result<Amount, MathError> {
        mul_div(amount, self.0, SCALE, rounding)
    }

    /// `amount / self`.
    pub fn reciprocal_mul_amount(
        &self,
        amount: Amount,
        rounding: Rounding,
    ) -> Result<Amount, MathError> {
        mul_div(amount, SCALE, self.0, rounding)
    }
}

impl fmt::Display for D18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / SCALE;
        let fraction = self.0 % SCALE;
        if fraction == 0 {
            return write!(f, "{}", integer);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", integer, digits.trim_end_matches('0'))
    }
}

/// A signed ledger magnitude: `(is_positive, magnitude)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedAmount {
    pub is_positive: bool,
    pub magnitude: Amount,
}

impl SignedAmount {
    pub const ZERO: SignedAmount = SignedAmount {
        is_positive: true,
        magnitude: 0,
    };

    pub fn positive(magnitude: Amount) -> Self {
        Self {
            is_positive: true,
            magnitude,
        }
    }

    pub fn negative(magnitude: Amount) -> Self {
        // Zero is always reported as positive.
        Self {
            is_positive: magnitude == 0,
            magnitude,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    pub fn negate(&self) -> Self {
        if self.is_positive {
            Self::negative(self.magnitude)
        } else {
            Self::positive(self.magnitude)
        }
    }

    pub fn checked_add(&self, other: SignedAmount) -> Result<SignedAmount, MathError> {
        if self.is_positive == other.is_positive {
            let magnitude = checked_add(self.magnitude, other.magnitude, "signed_add")?;
            return Ok(if self.is_positive {
                Self::positive(magnitude)
            } else {
                Self::negative(magnitude)
            });
        }
        let (pos, neg) = if self.is_positive {
            (self.magnitude, other.magnitude)
        } else {
            (other.magnitude, self.magnitude)
        };
        Ok(if pos >= neg {
            Self::positive(pos - neg)
        } else {
            Self::negative(neg - pos)
        })
    }

    pub fn checked_sub(&self, other: SignedAmount) -> Result<SignedAmount, MathError> {
        self.checked_add(other.negate())
    }

    /// Clamp to the non-negative range.
    pub fn floor_zero(&self) -> Amount {
        if self.is_positive {
            self.magnitude
        } else {
            0
        }
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "-{}", self.magnitude)
        }
    }
}
