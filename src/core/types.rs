use serde::Serialize;

/// Who is drawing down the account. Ages are in years and may be fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonProfile {
    pub current_age: f64,
    pub life_expectancy_age: f64,
    pub current_savings: f64,
}

impl PersonProfile {
    pub fn remaining_years(&self) -> f64 {
        self.life_expectancy_age - self.current_age
    }
}

/// Annual rates as entered, in percent (2.5 means 2.5%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateAssumptions {
    pub annual_inflation_pct: f64,
    pub annual_nominal_return_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRates {
    pub nominal: f64,
    pub inflation: f64,
    pub real: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalPlan {
    pub monthly_real_withdrawal: f64,
    pub horizon_months: u32,
}

impl WithdrawalPlan {
    pub const DEGENERATE: Self = Self {
        monthly_real_withdrawal: 0.0,
        horizon_months: 0,
    };

    pub fn annual_real_withdrawal(&self) -> f64 {
        self.monthly_real_withdrawal * 12.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.horizon_months == 0
    }
}

/// Month-indexed nominal trajectory. Both vectors have the same length and
/// index 0 is the starting snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSeries {
    pub nominal_income: Vec<f64>,
    pub nominal_balance: Vec<f64>,
}

impl ProjectionSeries {
    pub fn len(&self) -> usize {
        self.nominal_balance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nominal_balance.is_empty()
    }

    pub fn final_balance(&self) -> f64 {
        self.nominal_balance.last().copied().unwrap_or(0.0)
    }

    /// First month whose balance has been floored to zero.
    pub fn depletion_month(&self) -> Option<usize> {
        self.nominal_balance.iter().position(|&b| b == 0.0)
    }
}

/// Raw caller inputs for the reverse solve, before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverseInputs {
    pub current_age: f64,
    pub target_retire_age: f64,
    pub life_expectancy_age: f64,
    pub annual_inflation_pct: f64,
    pub annual_nominal_return_pct: f64,
    pub desired_monthly_real: f64,
}

impl ReverseInputs {
    pub fn rates(&self) -> RateAssumptions {
        RateAssumptions {
            annual_inflation_pct: self.annual_inflation_pct,
            annual_nominal_return_pct: self.annual_nominal_return_pct,
        }
    }

    pub fn all_finite(&self) -> bool {
        [
            self.current_age,
            self.target_retire_age,
            self.life_expectancy_age,
            self.annual_inflation_pct,
            self.annual_nominal_return_pct,
            self.desired_monthly_real,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Clamped reverse-solve target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverseTarget {
    pub target_retire_age: f64,
    pub desired_monthly_real: f64,
    pub remaining_years_after_retire: f64,
    pub years_until_retire: f64,
    pub payout_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseResult {
    pub required_today_real: f64,
    pub required_at_retire_real: f64,
    pub required_at_retire_nominal: f64,
}

impl ReverseResult {
    pub fn zero() -> Self {
        Self {
            required_today_real: 0.0,
            required_at_retire_real: 0.0,
            required_at_retire_nominal: 0.0,
        }
    }
}
