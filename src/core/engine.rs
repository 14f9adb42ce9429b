use super::rates::{is_near_zero, whole_months};
use super::types::{
    MonthlyRates, PersonProfile, ProjectionSeries, RateAssumptions, WithdrawalPlan,
};

/// A solved forward plan together with the nominal month-by-month trajectory
/// it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardProjection {
    pub plan: WithdrawalPlan,
    pub real_annual_rate: f64,
    pub monthly_rates: MonthlyRates,
    pub series: ProjectionSeries,
}

/// Largest constant real monthly withdrawal that runs `current_savings` down to
/// zero over the remaining lifetime.
///
/// Treats the withdrawals as an annuity-immediate at the real monthly rate and
/// inverts its present value. Degenerate inputs (no savings, no remaining time,
/// non-finite values, a horizon too long to count in months) give
/// [`WithdrawalPlan::DEGENERATE`] instead of an error.
pub fn solve_monthly_withdrawal(
    profile: &PersonProfile,
    rates: &RateAssumptions,
) -> WithdrawalPlan {
    let savings = profile.current_savings;
    let remaining_years = profile.remaining_years();
    if !savings.is_finite() || !remaining_years.is_finite() {
        return WithdrawalPlan::DEGENERATE;
    }
    if savings <= 0.0 || remaining_years <= 0.0 {
        return WithdrawalPlan::DEGENERATE;
    }

    let Some(horizon_months) = whole_months(remaining_years) else {
        return WithdrawalPlan::DEGENERATE;
    };
    let real_monthly = rates.monthly_rates().real;

    WithdrawalPlan {
        monthly_real_withdrawal: level_payment(savings, real_monthly, horizon_months),
        horizon_months,
    }
}

fn level_payment(present_value: f64, monthly_rate: f64, months: u32) -> f64 {
    let n = months.max(1) as f64;
    if is_near_zero(monthly_rate) {
        return present_value / n;
    }

    let discount = 1.0 - (1.0 + monthly_rate).powf(-n);
    let payment = present_value * monthly_rate / discount;
    // f64::max drops a NaN payment in favour of zero.
    payment.max(0.0)
}

/// Inflates a constant real withdrawal into nominal currency, one entry per
/// month starting at month 0.
pub fn build_income_series(
    withdrawal_real: f64,
    monthly_inflation: f64,
    length: usize,
) -> Vec<f64> {
    let growth = 1.0 + monthly_inflation;
    (0..length)
        .map(|t| withdrawal_real * growth.powf(t as f64))
        .collect()
}

/// Nominal account balance month by month.
///
/// Month 0 is the untouched starting snapshot. Each later month applies a month
/// of growth and then that month's withdrawal. The balance is floored at zero
/// at every step, so once the account is empty it stays empty.
pub fn build_balance_series(
    savings: f64,
    monthly_nominal_return: f64,
    nominal_income: &[f64],
) -> Vec<f64> {
    let mut balances = Vec::with_capacity(nominal_income.len());
    if nominal_income.is_empty() {
        return balances;
    }

    let growth = 1.0 + monthly_nominal_return;
    let mut balance = savings;
    balances.push(balance);
    for income in &nominal_income[1..] {
        balance = (balance * growth - income).max(0.0);
        balances.push(balance);
    }
    balances
}

/// Solves the withdrawal and expands it into month indices `0..=horizon`.
pub fn project(profile: &PersonProfile, rates: &RateAssumptions) -> ForwardProjection {
    let plan = solve_monthly_withdrawal(profile, rates);
    let monthly_rates = rates.monthly_rates();
    let length = plan.horizon_months as usize + 1;

    let nominal_income =
        build_income_series(plan.monthly_real_withdrawal, monthly_rates.inflation, length);
    let nominal_balance =
        build_balance_series(profile.current_savings, monthly_rates.nominal, &nominal_income);

    ForwardProjection {
        plan,
        real_annual_rate: rates.real_annual(),
        monthly_rates,
        series: ProjectionSeries {
            nominal_income,
            nominal_balance,
        },
    }
}
