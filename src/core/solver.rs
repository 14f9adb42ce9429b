use tracing::trace;

use super::rates::{is_near_zero, whole_months};
use super::types::{ReverseInputs, ReverseResult, ReverseTarget};

impl ReverseTarget {
    /// Clamps the retirement age up to the current age and the desired
    /// withdrawal up to zero, then derives the payout window. `None` when the
    /// window is too long to count in months.
    pub fn normalize(inputs: &ReverseInputs) -> Option<Self> {
        let target_retire_age = inputs.current_age.max(inputs.target_retire_age);
        let remaining_years_after_retire =
            (inputs.life_expectancy_age - target_retire_age).max(0.0);
        Some(Self {
            target_retire_age,
            desired_monthly_real: inputs.desired_monthly_real.max(0.0),
            remaining_years_after_retire,
            years_until_retire: (target_retire_age - inputs.current_age).max(0.0),
            payout_months: whole_months(remaining_years_after_retire)?,
        })
    }
}

/// Savings needed to fund `desired_monthly_real` (today's money) from the
/// target retirement age until life expectancy.
///
/// The payout stream is valued at the retirement date at the real monthly rate,
/// discounted back to today at the real annual rate, and separately re-inflated
/// to the nominal amount the account must hold on the retirement date.
/// Non-finite inputs and payout windows too long to count in months give
/// [`ReverseResult::zero`].
pub fn required_current_savings(inputs: &ReverseInputs) -> ReverseResult {
    if !inputs.all_finite() {
        return ReverseResult::zero();
    }
    let Some(target) = ReverseTarget::normalize(inputs) else {
        return ReverseResult::zero();
    };
    let rates = inputs.rates();
    let real_annual = rates.real_annual();
    let real_monthly = rates.monthly_rates().real;

    let at_retire_real = annuity_present_value(
        target.desired_monthly_real,
        real_monthly,
        target.payout_months,
    );

    let real_growth = (1.0 + real_annual).powf(target.years_until_retire);
    let today_real = at_retire_real / if real_growth > 0.0 { real_growth } else { 1.0 };

    let inflation_growth = (1.0 + rates.inflation()).powf(target.years_until_retire);

    trace!(
        payout_months = target.payout_months,
        years_until_retire = target.years_until_retire,
        real_monthly,
        "reverse solve"
    );

    ReverseResult {
        required_today_real: today_real,
        required_at_retire_real: at_retire_real,
        required_at_retire_nominal: at_retire_real * inflation_growth,
    }
}

fn annuity_present_value(payment: f64, monthly_rate: f64, months: u32) -> f64 {
    let n = months.max(1) as f64;
    if is_near_zero(monthly_rate) {
        return payment * n;
    }

    let discount = 1.0 - (1.0 + monthly_rate).powf(-n);
    payment * discount / monthly_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::solve_monthly_withdrawal;
    use crate::core::types::{PersonProfile, RateAssumptions};
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_close_rel(actual: f64, expected: f64, rel: f64) {
        let tol = expected.abs().max(1.0) * rel;
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, relative tolerance {rel}"
        );
    }

    fn sample_inputs() -> ReverseInputs {
        ReverseInputs {
            current_age: 30.0,
            target_retire_age: 45.0,
            life_expectancy_age: 85.0,
            annual_inflation_pct: 2.5,
            annual_nominal_return_pct: 5.0,
            desired_monthly_real: 10_000.0,
        }
    }

    #[test]
    fn normalize_clamps_retire_age_and_desired_amount() {
        let inputs = ReverseInputs {
            target_retire_age: 20.0,
            desired_monthly_real: -50.0,
            ..sample_inputs()
        };
        let target = ReverseTarget::normalize(&inputs).expect("human lifetime");
        assert_eq!(target.target_retire_age, 30.0);
        assert_eq!(target.desired_monthly_real, 0.0);
        assert_eq!(target.years_until_retire, 0.0);
        assert_eq!(target.remaining_years_after_retire, 55.0);
        assert_eq!(target.payout_months, 660);
    }

    #[test]
    fn normalize_keeps_one_payout_month_when_retiring_at_life_expectancy() {
        let inputs = ReverseInputs {
            target_retire_age: 90.0,
            ..sample_inputs()
        };
        let target = ReverseTarget::normalize(&inputs).expect("human lifetime");
        assert_eq!(target.remaining_years_after_retire, 0.0);
        assert_eq!(target.payout_months, 1);
    }

    #[test]
    fn payout_window_past_u32_months_gives_zero_result() {
        let inputs = ReverseInputs {
            current_age: 30.0,
            target_retire_age: 30.0,
            life_expectancy_age: 1e12,
            annual_inflation_pct: 0.0,
            annual_nominal_return_pct: 0.0,
            desired_monthly_real: 1.0,
        };
        assert_eq!(ReverseTarget::normalize(&inputs), None);
        assert_eq!(required_current_savings(&inputs), ReverseResult::zero());
    }

    #[test]
    fn zero_real_rate_sums_payments_and_skips_discounting() {
        let inputs = ReverseInputs {
            current_age: 40.0,
            target_retire_age: 50.0,
            life_expectancy_age: 60.0,
            annual_inflation_pct: 0.0,
            annual_nominal_return_pct: 0.0,
            desired_monthly_real: 1_000.0,
        };
        let result = required_current_savings(&inputs);
        assert_eq!(result.required_at_retire_real, 120_000.0);
        assert_eq!(result.required_today_real, 120_000.0);
        assert_eq!(result.required_at_retire_nominal, 120_000.0);
    }

    #[test]
    fn nominal_amount_reinflates_retirement_value() {
        let inputs = ReverseInputs {
            current_age: 40.0,
            target_retire_age: 50.0,
            life_expectancy_age: 60.0,
            annual_inflation_pct: 3.0,
            annual_nominal_return_pct: 3.0,
            desired_monthly_real: 1_000.0,
        };
        let result = required_current_savings(&inputs);
        assert_approx(result.required_at_retire_real, 120_000.0);
        assert_approx(result.required_today_real, 120_000.0);
        assert_close_rel(
            result.required_at_retire_nominal,
            120_000.0 * 1.03_f64.powi(10),
            1e-12,
        );
    }

    #[test]
    fn positive_real_rate_discounts_to_today() {
        let inputs = sample_inputs();
        let result = required_current_savings(&inputs);

        let real_annual = 1.05 / 1.025 - 1.0;
        let r = (1.0_f64 + real_annual).powf(1.0 / 12.0) - 1.0;
        let at_retire = 10_000.0 * (1.0 - (1.0 + r).powf(-480.0)) / r;
        assert_close_rel(result.required_at_retire_real, at_retire, 1e-10);
        assert_close_rel(
            result.required_today_real,
            at_retire / (1.0 + real_annual).powf(15.0),
            1e-10,
        );
        assert_close_rel(
            result.required_at_retire_nominal,
            at_retire * 1.025_f64.powf(15.0),
            1e-10,
        );
        assert!(result.required_today_real < result.required_at_retire_real);
        assert!(result.required_at_retire_nominal > result.required_at_retire_real);
    }

    #[test]
    fn retiring_now_needs_retirement_value_today() {
        let inputs = ReverseInputs {
            target_retire_age: 30.0,
            ..sample_inputs()
        };
        let result = required_current_savings(&inputs);
        assert_eq!(result.required_today_real, result.required_at_retire_real);
        assert_eq!(result.required_at_retire_nominal, result.required_at_retire_real);
    }

    #[test]
    fn non_finite_inputs_give_zero_result() {
        let fields: [fn(&mut ReverseInputs); 6] = [
            |i| i.current_age = f64::NAN,
            |i| i.target_retire_age = f64::INFINITY,
            |i| i.life_expectancy_age = f64::NEG_INFINITY,
            |i| i.annual_inflation_pct = f64::NAN,
            |i| i.annual_nominal_return_pct = f64::INFINITY,
            |i| i.desired_monthly_real = f64::NAN,
        ];
        for poison in fields {
            let mut inputs = sample_inputs();
            poison(&mut inputs);
            assert_eq!(required_current_savings(&inputs), ReverseResult::zero());
        }
    }

    #[test]
    fn zero_desired_withdrawal_needs_nothing() {
        let inputs = ReverseInputs {
            desired_monthly_real: 0.0,
            ..sample_inputs()
        };
        assert_eq!(required_current_savings(&inputs), ReverseResult::zero());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_forward_solve_recovers_desired_withdrawal(
            age in 18u32..80,
            span_months in 1u32..900,
            desired in 100u32..50_000,
            inflation_bp in 0u32..800,
            nominal_bp in -300i32..1500
        ) {
            let current_age = age as f64;
            let life = current_age + span_months as f64 / 12.0 + 1e-9;
            let inputs = ReverseInputs {
                current_age,
                target_retire_age: current_age,
                life_expectancy_age: life,
                annual_inflation_pct: inflation_bp as f64 / 100.0,
                annual_nominal_return_pct: nominal_bp as f64 / 100.0,
                desired_monthly_real: desired as f64,
            };
            let required = required_current_savings(&inputs);

            let plan = solve_monthly_withdrawal(
                &PersonProfile {
                    current_age,
                    life_expectancy_age: life,
                    current_savings: required.required_today_real,
                },
                &RateAssumptions {
                    annual_inflation_pct: inputs.annual_inflation_pct,
                    annual_nominal_return_pct: inputs.annual_nominal_return_pct,
                },
            );
            prop_assert!(plan.horizon_months == span_months);
            prop_assert!(
                (plan.monthly_real_withdrawal - desired as f64).abs() <= desired as f64 * 1e-9,
                "recovered {} for desired {}", plan.monthly_real_withdrawal, desired
            );
        }

        #[test]
        fn prop_later_retirement_needs_less_today_with_positive_real_rate(
            retire_offset in 1u32..30,
            desired in 100u32..50_000,
            inflation_bp in 0u32..500,
            spread_bp in 10u32..800
        ) {
            let early = ReverseInputs {
                current_age: 30.0,
                target_retire_age: 40.0,
                life_expectancy_age: 95.0,
                annual_inflation_pct: inflation_bp as f64 / 100.0,
                annual_nominal_return_pct: (inflation_bp + spread_bp) as f64 / 100.0,
                desired_monthly_real: desired as f64,
            };
            let late = ReverseInputs {
                target_retire_age: 40.0 + retire_offset as f64,
                ..early
            };
            let early_result = required_current_savings(&early);
            let late_result = required_current_savings(&late);
            prop_assert!(late_result.required_today_real < early_result.required_today_real);
            prop_assert!(late_result.required_at_retire_real < early_result.required_at_retire_real);
        }
    }
}
