mod engine;
mod rates;
mod solver;
mod types;
mod validation;

pub use engine::{
    ForwardProjection, build_balance_series, build_income_series, project,
    solve_monthly_withdrawal,
};
pub use rates::{NEAR_ZERO_MONTHLY_RATE, monthly_rate_from_annual, real_annual_rate};
pub use solver::required_current_savings;
pub use types::{
    MonthlyRates, PersonProfile, ProjectionSeries, RateAssumptions, ReverseInputs, ReverseResult,
    ReverseTarget, WithdrawalPlan,
};
pub use validation::{InputError, MAX_LIFE_EXPECTANCY_AGE, validate_forward, validate_reverse};
