//! Accrual Calculator
//!
//! Pure projection of investment returns: compound-interest profit and the
//! calendar-aware maturity date. Deterministic and store-free so plan math
//! can be tested and audited without any database.

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::domain::{CompoundFrequency, DurationUnit};

/// Convert a plan duration into a fractional year count.
///
/// 365-day years, 52-week years, 12-month years, matching the rate basis
/// the ROI percentage is quoted in.
pub fn duration_in_years(duration_value: u32, duration_unit: DurationUnit) -> f64 {
    let value = f64::from(duration_value);
    match duration_unit {
        DurationUnit::Days => value / 365.0,
        DurationUnit::Weeks => value / 52.0,
        DurationUnit::Months => value / 12.0,
        DurationUnit::Years => value,
    }
}

/// Expected profit for a principal held to maturity.
///
/// Standard compound interest, A = P(1 + r/n)^(nt):
/// - `r` is the annualized ROI as a fraction,
/// - `n` the compounding periods per year,
/// - `t` the duration in fractional years.
///
/// The profit (A - P) is rounded to the ledger's 8 decimal places. The
/// projection is computed once at funding time and never updated afterwards.
pub fn expected_profit(
    principal: Decimal,
    annual_roi_percent: Decimal,
    duration_value: u32,
    duration_unit: DurationUnit,
    compound_frequency: CompoundFrequency,
) -> Decimal {
    let p = principal.to_f64().unwrap_or(0.0);
    let rate = annual_roi_percent.to_f64().unwrap_or(0.0) / 100.0;
    let n = f64::from(compound_frequency.periods_per_year());
    let t = duration_in_years(duration_value, duration_unit);

    let amount = p * (1.0 + rate / n).powf(n * t);
    let profit = amount - p;

    // Non-finite results are only reachable for inputs far beyond the
    // Amount/plan validation bounds.
    Decimal::from_f64(profit)
        .map(|d| d.round_dp(8))
        .unwrap_or(Decimal::ZERO)
}

/// Maturity date for an investment started at `now`.
///
/// Month and year durations use calendar-aware addition, so maturities land
/// on calendar-correct dates: Jan 31 + 1 month is the end of February, and
/// Feb 29 + 1 year is Feb 28 of the following year. Days and weeks are plain
/// offsets.
pub fn maturity_date(
    now: DateTime<Utc>,
    duration_value: u32,
    duration_unit: DurationUnit,
) -> DateTime<Utc> {
    match duration_unit {
        DurationUnit::Days => now + Duration::days(i64::from(duration_value)),
        DurationUnit::Weeks => now + Duration::weeks(i64::from(duration_value)),
        DurationUnit::Months => now
            .checked_add_months(Months::new(duration_value))
            .expect("maturity date within representable range"),
        DurationUnit::Years => now
            .checked_add_months(Months::new(duration_value.saturating_mul(12)))
            .expect("maturity date within representable range"),
    }
}
