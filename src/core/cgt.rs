use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Fraction of a long-term gain that remains taxable
pub const CGT_DISCOUNT_FACTOR: Decimal = dec!(0.5);

/// Shares must be held for more than this many days to qualify for the discount
pub const LONG_TERM_HOLDING_DAYS: i64 = 365;

/// An amount whose arithmetic overflowed reads as zero, with a warning
pub(crate) fn amount_or_zero(amount: Option<Decimal>, what: &str) -> Decimal {
    amount.unwrap_or_else(|| {
        log::warn!("{} is out of range, using 0", what);
        Decimal::ZERO
    })
}

/// Gain on a single sale lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapitalGain {
    /// Gain before any discount, negative for a loss
    pub raw_gain: Decimal,
    /// Gain after the CGT discount
    pub taxable_gain: Decimal,
}

impl CapitalGain {
    /// Amount removed by the CGT discount
    pub fn discount(&self) -> Decimal {
        self.raw_gain - self.taxable_gain
    }

    pub fn is_discounted(&self) -> bool {
        self.raw_gain != self.taxable_gain
    }
}

/// Calculate the capital gain on a sale, applying the 50% discount to
/// long-term gains. Losses are never discounted, and a gain too large to
/// represent is zero.
pub fn calculate_capital_gain(
    sale_price: Decimal,
    cost_base: Decimal,
    shares: Decimal,
    held_long_term: bool,
) -> CapitalGain {
    let raw_gain = amount_or_zero(
        sale_price
            .checked_sub(cost_base)
            .and_then(|per_share| per_share.checked_mul(shares)),
        "Capital gain",
    );
    let taxable_gain = if held_long_term && raw_gain > Decimal::ZERO {
        raw_gain * CGT_DISCOUNT_FACTOR
    } else {
        raw_gain
    };
    CapitalGain {
        raw_gain,
        taxable_gain,
    }
}

/// Whether shares vested on `vested` and sold on `sold` were held for more than 12 months
pub fn is_long_term_holding(vested: NaiveDate, sold: NaiveDate) -> bool {
    (sold - vested).num_days() > LONG_TERM_HOLDING_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn long_term_gain_is_halved() {
        let gain = calculate_capital_gain(dec!(110.0), dec!(100.0), dec!(100), true);
        assert_eq!(gain.raw_gain, dec!(1000));
        assert_eq!(gain.taxable_gain, dec!(500));
        assert_eq!(gain.discount(), dec!(500));
        assert!(gain.is_discounted());
    }

    #[test]
    fn short_term_gain_is_not_discounted() {
        let gain = calculate_capital_gain(dec!(110.0), dec!(100.0), dec!(100), false);
        assert_eq!(gain.raw_gain, dec!(1000));
        assert_eq!(gain.taxable_gain, dec!(1000));
        assert!(!gain.is_discounted());
    }

    #[test]
    fn long_term_loss_is_not_discounted() {
        let gain = calculate_capital_gain(dec!(90.0), dec!(100.0), dec!(100), true);
        assert_eq!(gain.raw_gain, dec!(-1000));
        assert_eq!(gain.taxable_gain, dec!(-1000));
        assert_eq!(gain.discount(), dec!(0));
    }

    #[test]
    fn break_even_sale() {
        let gain = calculate_capital_gain(dec!(100), dec!(100), dec!(50), true);
        assert_eq!(gain.raw_gain, dec!(0));
        assert_eq!(gain.taxable_gain, dec!(0));
    }

    #[test]
    fn fractional_shares() {
        let gain = calculate_capital_gain(dec!(12.50), dec!(10.00), dec!(2.5), true);
        assert_eq!(gain.raw_gain, dec!(6.25));
        assert_eq!(gain.taxable_gain, dec!(3.125));
    }

    #[test]
    fn overflowing_gain_is_zero() {
        let gain = calculate_capital_gain(Decimal::MAX, dec!(-1), dec!(1), true);
        assert_eq!(gain.raw_gain, dec!(0));
        let gain = calculate_capital_gain(dec!(3), dec!(1), Decimal::MAX, false);
        assert_eq!(gain.taxable_gain, dec!(0));
    }

    #[test]
    fn holding_period_must_exceed_365_days() {
        assert!(!is_long_term_holding(date(2023, 1, 1), date(2024, 1, 1)));
        assert!(is_long_term_holding(date(2023, 1, 1), date(2024, 1, 2)));
        // Leap year: 366 days is more than 365
        assert!(is_long_term_holding(date(2024, 1, 1), date(2025, 1, 1)));
        assert!(!is_long_term_holding(date(2024, 6, 1), date(2024, 1, 1)));
    }
}
