use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 1 unit of deposited currency = 1000 credits.
pub const DEFAULT_CREDIT_RATIO: u64 = 1000;

/// Participant cap applied when a create request leaves it at zero.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 10;

/// Fixed conversion rate between deposited currency and credits.
///
/// Always a power of ten, so one credit is a whole number of decimal places
/// of currency. Minting truncates toward zero (`trunc(amount × ratio)`) and
/// un-minting shifts the decimal point back, so `to_currency(mint(x)) == x`
/// whenever `x` has at most `log10(ratio)` fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ExchangeRatio(u64);

impl ExchangeRatio {
    pub fn new(credits_per_unit: u64) -> Result<Self, CoreError> {
        if !is_power_of_ten(credits_per_unit) {
            return Err(CoreError::InvalidRatio(credits_per_unit));
        }
        Ok(Self(credits_per_unit))
    }

    pub fn credits_per_unit(&self) -> u64 {
        self.0
    }

    /// Credits minted for a currency deposit.
    pub fn mint(&self, amount: Decimal) -> Result<u64, CoreError> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "deposit must be positive, got {amount}"
            )));
        }
        amount
            .checked_mul(Decimal::from(self.0))
            .map(|v| v.trunc())
            .and_then(|v| v.to_u64())
            .ok_or_else(|| CoreError::InvalidAmount(format!("deposit {amount} overflows credit range")))
    }

    /// Currency value of a credit amount.
    pub fn to_currency(&self, credits: u64) -> Decimal {
        Decimal::from(credits) / Decimal::from(self.0)
    }
}

fn is_power_of_ten(mut n: u64) -> bool {
    if n == 0 {
        return false;
    }
    while n % 10 == 0 {
        n /= 10;
    }
    n == 1
}

impl Default for ExchangeRatio {
    fn default() -> Self {
        Self(DEFAULT_CREDIT_RATIO)
    }
}

impl TryFrom<u64> for ExchangeRatio {
    type Error = CoreError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExchangeRatio> for u64 {
    fn from(ratio: ExchangeRatio) -> Self {
        ratio.0
    }
}

/// Immutable ledger configuration injected into the engine at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Credits per unit of deposited currency.
    pub credit_ratio: ExchangeRatio,
    /// Cap used when a create request does not set one.
    pub default_max_participants: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credit_ratio: ExchangeRatio::default(),
            default_max_participants: DEFAULT_MAX_PARTICIPANTS,
        }
    }
}
