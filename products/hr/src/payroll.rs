use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayrollError {
    #[error("period must be formatted as YYYY-MM")]
    InvalidPeriod,
    #[error("amounts must not be negative")]
    NegativeAmount,
    #[error("deductions exceed gross pay")]
    NegativeNet,
    #[error("amount overflow")]
    Overflow,
}

/// Monthly pay figures in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponents {
    pub base_cents: i64,
    pub bonus_cents: i64,
    pub deductions_cents: i64,
}

impl PayComponents {
    pub fn gross_cents(&self) -> Result<i64, PayrollError> {
        self.check_signs()?;
        self.base_cents
            .checked_add(self.bonus_cents)
            .ok_or(PayrollError::Overflow)
    }

    /// `base + bonus - deductions`; a negative result is an error.
    pub fn net_cents(&self) -> Result<i64, PayrollError> {
        let net = self.gross_cents()? - self.deductions_cents;
        if net < 0 {
            return Err(PayrollError::NegativeNet);
        }
        Ok(net)
    }

    fn check_signs(&self) -> Result<(), PayrollError> {
        if self.base_cents < 0 || self.bonus_cents < 0 || self.deductions_cents < 0 {
            return Err(PayrollError::NegativeAmount);
        }
        Ok(())
    }
}

/// Parses a `YYYY-MM` period into the first day of that month.
pub fn parse_period(value: &str) -> Result<NaiveDate, PayrollError> {
    let trimmed = value.trim();
    let (year, month) = trimmed
        .split_once('-')
        .ok_or(PayrollError::InvalidPeriod)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(PayrollError::InvalidPeriod);
    }
    let year: i32 = year.parse().map_err(|_| PayrollError::InvalidPeriod)?;
    let month: u32 = month.parse().map_err(|_| PayrollError::InvalidPeriod)?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(PayrollError::InvalidPeriod)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_is_gross_minus_deductions() {
        let pay = PayComponents {
            base_cents: 500_000,
            bonus_cents: 25_000,
            deductions_cents: 75_000,
        };
        assert_eq!(pay.gross_cents(), Ok(525_000));
        assert_eq!(pay.net_cents(), Ok(450_000));
    }

    #[test]
    fn negative_net_is_rejected() {
        let pay = PayComponents {
            base_cents: 100,
            bonus_cents: 0,
            deductions_cents: 101,
        };
        assert_eq!(pay.net_cents(), Err(PayrollError::NegativeNet));
    }

    #[test]
    fn negative_components_are_rejected() {
        let pay = PayComponents {
            base_cents: 100,
            bonus_cents: -1,
            deductions_cents: 0,
        };
        assert_eq!(pay.net_cents(), Err(PayrollError::NegativeAmount));
    }

    #[test]
    fn periods_parse_to_month_start() {
        assert_eq!(
            parse_period("2025-03"),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        );
        assert_eq!(parse_period("2025-13"), Err(PayrollError::InvalidPeriod));
        assert_eq!(parse_period("2025-3"), Err(PayrollError::InvalidPeriod));
        assert_eq!(parse_period("March"), Err(PayrollError::InvalidPeriod));
    }
}
