use tracing::trace;

use super::types::{MonthlyRates, RateAssumptions};

/// Monthly rates with an absolute value below this are treated as zero. The
/// annuity discount factor `1 - (1+r)^-n` cancels to nothing as `r` approaches
/// zero, so dividing by it stops being meaningful well before `r` is exactly 0.
pub const NEAR_ZERO_MONTHLY_RATE: f64 = 1e-12;

/// Equivalent monthly compounding rate for an effective annual rate.
///
/// Works the same for nominal, inflation and real rates. No validation: an
/// annual rate at or below -1 gives NaN or a meaningless value.
pub fn monthly_rate_from_annual(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Fisher composition of a nominal rate and an inflation rate, both as
/// fractions. Exact only while `inflation > -1`.
pub fn real_annual_rate(nominal: f64, inflation: f64) -> f64 {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

pub(crate) fn is_near_zero(monthly_rate: f64) -> bool {
    monthly_rate.abs() < NEAR_ZERO_MONTHLY_RATE
}

/// Whole months in a span of years, floored but never below one. `None` when
/// the count does not fit in a `u32`.
pub(crate) fn whole_months(years: f64) -> Option<u32> {
    let months = (years * 12.0).floor();
    if months.is_nan() || months > f64::from(u32::MAX) {
        return None;
    }
    // Negative spans cast to 0 and are lifted to the one-month minimum.
    Some((months as u32).max(1))
}

impl RateAssumptions {
    pub fn inflation(&self) -> f64 {
        self.annual_inflation_pct / 100.0
    }

    pub fn nominal_return(&self) -> f64 {
        self.annual_nominal_return_pct / 100.0
    }

    pub fn real_annual(&self) -> f64 {
        real_annual_rate(self.nominal_return(), self.inflation())
    }

    pub fn monthly_rates(&self) -> MonthlyRates {
        let rates = MonthlyRates {
            nominal: monthly_rate_from_annual(self.nominal_return()),
            inflation: monthly_rate_from_annual(self.inflation()),
            real: monthly_rate_from_annual(self.real_annual()),
        };
        trace!(
            nominal = rates.nominal,
            inflation = rates.inflation,
            real = rates.real,
            "derived monthly rates"
        );
        rates
    }
}
