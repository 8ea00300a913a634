//! # Money
//!
//! Currency handling for razorcart. Amounts are `rust_decimal::Decimal` in
//! major units (rupees, dollars); processors are spoken to in minor units.

use crate::error::{ShopError, ShopResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    JPY,
    SGD,
    AED,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::SGD => "SGD",
            Currency::AED => "AED",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (paise, cents).
    ///
    /// Fails for non-positive amounts and for amounts with more precision
    /// than the currency carries.
    pub fn to_minor_units(&self, amount: Decimal) -> ShopResult<i64> {
        if amount <= Decimal::ZERO {
            return Err(ShopError::InvalidAmount {
                message: format!("{} {} is not a chargeable amount", amount, self),
            });
        }

        let minor = amount * Decimal::from(10_i64.pow(self.decimal_places()));
        if minor.fract() != Decimal::ZERO {
            return Err(ShopError::InvalidAmount {
                message: format!(
                    "{} has more than {} decimal places",
                    amount,
                    self.decimal_places()
                ),
            });
        }

        minor.to_i64().ok_or_else(|| ShopError::InvalidAmount {
            message: format!("{} {} is out of range", amount, self),
        })
    }

    /// Convert from smallest unit back to decimal
    pub fn from_minor_units(&self, amount: i64) -> Decimal {
        Decimal::new(amount, self.decimal_places())
    }

    /// Format for display (e.g., "₹25.00")
    pub fn format(&self, amount: Decimal) -> String {
        let symbol = match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::SGD => "S$",
            Currency::AED => "AED ",
        };
        format!(
            "{}{:.prec$}",
            symbol,
            amount.round_dp(self.decimal_places()),
            prec = self.decimal_places() as usize
        )
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            "SGD" => Ok(Currency::SGD),
            "AED" => Ok(Currency::AED),
            other => Err(ShopError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_unit_conversion() {
        let inr = Currency::INR;
        assert_eq!(inr.to_minor_units(Decimal::new(2500, 2)).unwrap(), 2500);
        assert_eq!(inr.to_minor_units(Decimal::new(25, 0)).unwrap(), 2500);
        assert_eq!(inr.from_minor_units(1099), Decimal::new(1099, 2));

        let jpy = Currency::JPY;
        assert_eq!(jpy.to_minor_units(Decimal::new(1000, 0)).unwrap(), 1000);
    }

    #[test]
    fn test_rejects_uncharged_amounts() {
        let inr = Currency::INR;
        assert!(matches!(
            inr.to_minor_units(Decimal::ZERO),
            Err(ShopError::InvalidAmount { .. })
        ));
        assert!(matches!(
            inr.to_minor_units(Decimal::new(-5, 0)),
            Err(ShopError::InvalidAmount { .. })
        ));
        assert!(matches!(
            inr.to_minor_units(Decimal::new(10005, 3)),
            Err(ShopError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_format() {
        assert_eq!(Currency::INR.format(Decimal::new(25, 0)), "₹25.00");
        assert_eq!(Currency::USD.format(Decimal::new(1999, 2)), "$19.99");
        assert_eq!(Currency::JPY.format(Decimal::new(500, 0)), "¥500");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::INR);
        assert!(matches!(
            "xyz".parse::<Currency>(),
            Err(ShopError::UnsupportedCurrency { .. })
        ));
    }
}
