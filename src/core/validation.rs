//! Up-front checks for caller input.
//!
//! The solvers never fail: they map bad input to a zero result. Callers that
//! need to tell a legitimate zero apart from rejected input run these checks
//! first and report the [`InputError`].

use super::types::{PersonProfile, RateAssumptions, ReverseInputs};

/// Oldest life expectancy accepted. Keeps the month horizon, and the series
/// built over it, to a human scale.
pub const MAX_LIFE_EXPECTANCY_AGE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("current age must be >= 0")]
    NegativeAge,

    #[error("life expectancy must be greater than current age")]
    LifeNotAfterAge,

    #[error("life expectancy must be at most {}", MAX_LIFE_EXPECTANCY_AGE)]
    LifeBeyondMax,

    #[error("current savings must be > 0")]
    NonPositiveSavings,

    #[error("inflation must be >= 0")]
    NegativeInflation,

    #[error("{field} must be > -100%")]
    RateAtOrBelowMinusHundred { field: &'static str },

    #[error("desired monthly withdrawal must be > 0")]
    NonPositiveDesiredWithdrawal,

    #[error("target retirement age must be >= current age")]
    RetireBeforeCurrentAge,

    #[error("target retirement age must be less than life expectancy")]
    RetireNotBeforeLife,
}

fn finite(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NonFinite { field })
    }
}

fn check_lifetime(current_age: f64, life_expectancy_age: f64) -> Result<(), InputError> {
    if current_age < 0.0 {
        return Err(InputError::NegativeAge);
    }
    if life_expectancy_age <= 0.0 || life_expectancy_age <= current_age {
        return Err(InputError::LifeNotAfterAge);
    }
    if life_expectancy_age > MAX_LIFE_EXPECTANCY_AGE {
        return Err(InputError::LifeBeyondMax);
    }
    Ok(())
}

fn check_rates_finite(rates: &RateAssumptions) -> Result<(), InputError> {
    finite("inflation", rates.annual_inflation_pct)?;
    finite("nominal return", rates.annual_nominal_return_pct)
}

fn check_rate_bounds(rates: &RateAssumptions) -> Result<(), InputError> {
    if rates.annual_inflation_pct < 0.0 {
        return Err(InputError::NegativeInflation);
    }
    if rates.annual_nominal_return_pct <= -100.0 {
        return Err(InputError::RateAtOrBelowMinusHundred {
            field: "nominal return",
        });
    }
    Ok(())
}

/// Checks run in form order: finiteness, lifetime, savings, then rates.
pub fn validate_forward(
    profile: &PersonProfile,
    rates: &RateAssumptions,
) -> Result<(), InputError> {
    finite("current age", profile.current_age)?;
    finite("current savings", profile.current_savings)?;
    finite("life expectancy", profile.life_expectancy_age)?;
    check_rates_finite(rates)?;
    check_lifetime(profile.current_age, profile.life_expectancy_age)?;
    if profile.current_savings <= 0.0 {
        return Err(InputError::NonPositiveSavings);
    }
    check_rate_bounds(rates)
}

/// Checks run in form order: finiteness, lifetime, desired amount, retirement
/// age, then rates.
pub fn validate_reverse(inputs: &ReverseInputs) -> Result<(), InputError> {
    let rates = inputs.rates();
    finite("current age", inputs.current_age)?;
    finite("life expectancy", inputs.life_expectancy_age)?;
    check_rates_finite(&rates)?;
    check_lifetime(inputs.current_age, inputs.life_expectancy_age)?;
    finite("desired monthly withdrawal", inputs.desired_monthly_real)?;
    if inputs.desired_monthly_real <= 0.0 {
        return Err(InputError::NonPositiveDesiredWithdrawal);
    }
    finite("target retirement age", inputs.target_retire_age)?;
    if inputs.target_retire_age < inputs.current_age {
        return Err(InputError::RetireBeforeCurrentAge);
    }
    if inputs.target_retire_age >= inputs.life_expectancy_age {
        return Err(InputError::RetireNotBeforeLife);
    }
    check_rate_bounds(&rates)
}
