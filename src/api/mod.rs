use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    ForwardProjection, MonthlyRates, PersonProfile, RateAssumptions, ReverseInputs, ReverseResult,
    ReverseTarget, WithdrawalPlan, project, required_current_savings, solve_monthly_withdrawal,
    validate_forward, validate_reverse,
};

#[derive(Parser, Debug)]
#[command(
    name = "drawdown",
    about = "Retirement drawdown calculator: sustainable real withdrawals and required savings"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },
    /// Maximum constant real monthly withdrawal that depletes savings at life expectancy
    Withdrawal(WithdrawalArgs),
    /// Savings needed today to fund a desired real monthly withdrawal from a target age
    RequiredSavings(ReverseArgs),
}

#[derive(Args, Debug, Clone)]
struct WithdrawalArgs {
    #[arg(long, help = "Current age in years (fractional allowed)")]
    age: f64,
    #[arg(long, help = "Current savings in your currency unit")]
    savings: f64,
    #[arg(long, help = "Life expectancy age in years")]
    life: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Expected annual inflation in percent"
    )]
    inflation: f64,
    #[arg(
        long = "return",
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Expected annual nominal investment return in percent"
    )]
    nominal_return: f64,
    #[arg(long, help = "Include the month-by-month nominal income and balance series")]
    series: bool,
    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ReverseArgs {
    #[arg(long, help = "Current age in years (fractional allowed)")]
    age: f64,
    #[arg(long, help = "Target retirement age; defaults to --age")]
    retire_age: Option<f64>,
    #[arg(long, help = "Life expectancy age in years")]
    life: f64,
    #[arg(long, help = "Desired monthly withdrawal in today's money")]
    desired_monthly: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Expected annual inflation in percent"
    )]
    inflation: f64,
    #[arg(
        long = "return",
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Expected annual nominal investment return in percent"
    )]
    nominal_return: f64,
    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WithdrawalPayload {
    age: Option<f64>,
    savings: Option<f64>,
    life: Option<f64>,
    inflation: Option<f64>,
    #[serde(rename = "return", alias = "nominalReturn")]
    nominal_return: Option<f64>,
    series: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReversePayload {
    age: Option<f64>,
    retire_age: Option<f64>,
    life: Option<f64>,
    inflation: Option<f64>,
    #[serde(rename = "return", alias = "nominalReturn")]
    nominal_return: Option<f64>,
    desired_monthly: Option<f64>,
}

#[derive(Debug)]
struct ForwardRequest {
    profile: PersonProfile,
    rates: RateAssumptions,
    include_series: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResponse {
    months: Vec<u32>,
    nominal_income: Vec<f64>,
    nominal_balance: Vec<f64>,
    depletion_month: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalResponse {
    monthly_real_withdrawal: f64,
    annual_real_withdrawal: f64,
    horizon_months: u32,
    real_annual_rate: f64,
    monthly_rates: MonthlyRates,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<SeriesResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequiredSavingsResponse {
    #[serde(flatten)]
    result: ReverseResult,
    target_retire_age: f64,
    years_until_retire: f64,
    payout_months: u32,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn build_forward_request(args: WithdrawalArgs) -> Result<ForwardRequest, String> {
    let profile = PersonProfile {
        current_age: args.age,
        life_expectancy_age: args.life,
        current_savings: args.savings,
    };
    let rates = RateAssumptions {
        annual_inflation_pct: args.inflation,
        annual_nominal_return_pct: args.nominal_return,
    };
    validate_forward(&profile, &rates).map_err(|e| e.to_string())?;
    Ok(ForwardRequest {
        profile,
        rates,
        include_series: args.series,
    })
}

fn build_reverse_inputs(args: ReverseArgs) -> Result<ReverseInputs, String> {
    let inputs = ReverseInputs {
        current_age: args.age,
        target_retire_age: args.retire_age.unwrap_or(args.age),
        life_expectancy_age: args.life,
        annual_inflation_pct: args.inflation,
        annual_nominal_return_pct: args.nominal_return,
        desired_monthly_real: args.desired_monthly,
    };
    validate_reverse(&inputs).map_err(|e| e.to_string())?;
    Ok(inputs)
}

fn withdrawal_summary(plan: WithdrawalPlan, rates: &RateAssumptions) -> WithdrawalResponse {
    WithdrawalResponse {
        monthly_real_withdrawal: plan.monthly_real_withdrawal,
        annual_real_withdrawal: plan.annual_real_withdrawal(),
        horizon_months: plan.horizon_months,
        real_annual_rate: rates.real_annual(),
        monthly_rates: rates.monthly_rates(),
        series: None,
    }
}

fn build_withdrawal_response(projection: ForwardProjection) -> WithdrawalResponse {
    let series = SeriesResponse {
        months: (0..=projection.plan.horizon_months).collect(),
        depletion_month: projection.series.depletion_month(),
        nominal_income: projection.series.nominal_income,
        nominal_balance: projection.series.nominal_balance,
    };
    WithdrawalResponse {
        monthly_real_withdrawal: projection.plan.monthly_real_withdrawal,
        annual_real_withdrawal: projection.plan.annual_real_withdrawal(),
        horizon_months: projection.plan.horizon_months,
        real_annual_rate: projection.real_annual_rate,
        monthly_rates: projection.monthly_rates,
        series: Some(series),
    }
}

fn build_required_savings_response(
    inputs: &ReverseInputs,
) -> Result<RequiredSavingsResponse, String> {
    let target = ReverseTarget::normalize(inputs)
        .ok_or_else(|| "payout window is too long to count in months".to_string())?;
    Ok(RequiredSavingsResponse {
        result: required_current_savings(inputs),
        target_retire_age: target.target_retire_age,
        years_until_retire: target.years_until_retire,
        payout_months: target.payout_months,
    })
}

fn run_withdrawal(request: &ForwardRequest) -> WithdrawalResponse {
    debug!(
        age = request.profile.current_age,
        life = request.profile.life_expectancy_age,
        savings = request.profile.current_savings,
        inflation_pct = request.rates.annual_inflation_pct,
        return_pct = request.rates.annual_nominal_return_pct,
        series = request.include_series,
        "solving withdrawal"
    );
    if request.include_series {
        return build_withdrawal_response(project(&request.profile, &request.rates));
    }
    withdrawal_summary(
        solve_monthly_withdrawal(&request.profile, &request.rates),
        &request.rates,
    )
}

fn run_required_savings(inputs: &ReverseInputs) -> Result<RequiredSavingsResponse, String> {
    debug!(
        age = inputs.current_age,
        retire_age = inputs.target_retire_age,
        life = inputs.life_expectancy_age,
        desired_monthly = inputs.desired_monthly_real,
        "solving required savings"
    );
    build_required_savings_response(inputs)
}

/// Runs a parsed command line. Non-server commands print their result to stdout.
pub async fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port, host } => run_http_server(host, port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        command => {
            println!("{}", execute(command)?);
            Ok(())
        }
    }
}

fn execute(command: Command) -> Result<String, String> {
    match command {
        Command::Serve { .. } => Err("serve is not a one-shot command".to_string()),
        Command::Withdrawal(args) => {
            let json = args.json;
            let request = build_forward_request(args)?;
            let response = run_withdrawal(&request);
            if json {
                return to_pretty_json(&response);
            }
            Ok(format!(
                "Monthly withdrawal (today's money): {:.2}\n\
                 Annual withdrawal (today's money): {:.2}\n\
                 Horizon: {} months\n\
                 Real annual return: {:.4}%",
                response.monthly_real_withdrawal,
                response.annual_real_withdrawal,
                response.horizon_months,
                response.real_annual_rate * 100.0
            ))
        }
        Command::RequiredSavings(args) => {
            let json = args.json;
            let inputs = build_reverse_inputs(args)?;
            let response = run_required_savings(&inputs)?;
            if json {
                return to_pretty_json(&response);
            }
            Ok(format!(
                "Required today (today's money): {:.2}\n\
                 Required at retirement (today's money): {:.2}\n\
                 Required at retirement (nominal): {:.2}\n\
                 Payout: {} months starting in {:.2} years",
                response.result.required_today_real,
                response.result.required_at_retire_real,
                response.result.required_at_retire_nominal,
                response.payout_months,
                response.years_until_retire
            ))
        }
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize result: {e}"))
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/withdrawal",
            get(withdrawal_get_handler).post(withdrawal_post_handler),
        )
        .route(
            "/api/required-savings",
            get(required_savings_get_handler).post(required_savings_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(host: IpAddr, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::new(host, port);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "drawdown HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/health");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn withdrawal_get_handler(Query(payload): Query<WithdrawalPayload>) -> Response {
    withdrawal_handler_impl(payload)
}

async fn withdrawal_post_handler(Json(payload): Json<WithdrawalPayload>) -> Response {
    withdrawal_handler_impl(payload)
}

fn withdrawal_handler_impl(payload: WithdrawalPayload) -> Response {
    match forward_request_from_payload(payload) {
        Ok(request) => json_response(StatusCode::OK, run_withdrawal(&request)),
        Err(msg) => {
            warn!(error = %msg, "rejected withdrawal request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn required_savings_get_handler(Query(payload): Query<ReversePayload>) -> Response {
    required_savings_handler_impl(payload)
}

async fn required_savings_post_handler(Json(payload): Json<ReversePayload>) -> Response {
    required_savings_handler_impl(payload)
}

fn required_savings_handler_impl(payload: ReversePayload) -> Response {
    match reverse_inputs_from_payload(payload).and_then(|inputs| run_required_savings(&inputs)) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            warn!(error = %msg, "rejected required-savings request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn forward_request_from_payload(payload: WithdrawalPayload) -> Result<ForwardRequest, String> {
    let mut args = default_withdrawal_args_for_api();
    if let Some(v) = payload.age {
        args.age = v;
    }
    if let Some(v) = payload.savings {
        args.savings = v;
    }
    if let Some(v) = payload.life {
        args.life = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation = v;
    }
    if let Some(v) = payload.nominal_return {
        args.nominal_return = v;
    }
    if let Some(v) = payload.series {
        args.series = v;
    }
    build_forward_request(args)
}

fn reverse_inputs_from_payload(payload: ReversePayload) -> Result<ReverseInputs, String> {
    let mut args = default_reverse_args_for_api();
    if let Some(v) = payload.age {
        args.age = v;
    }
    args.retire_age = payload.retire_age;
    if let Some(v) = payload.life {
        args.life = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation = v;
    }
    if let Some(v) = payload.nominal_return {
        args.nominal_return = v;
    }
    if let Some(v) = payload.desired_monthly {
        args.desired_monthly = v;
    }
    build_reverse_inputs(args)
}

fn default_withdrawal_args_for_api() -> WithdrawalArgs {
    WithdrawalArgs {
        age: 30.0,
        savings: 1_000_000.0,
        life: 85.0,
        inflation: 2.5,
        nominal_return: 5.0,
        series: false,
        json: false,
    }
}

fn default_reverse_args_for_api() -> ReverseArgs {
    ReverseArgs {
        age: 30.0,
        retire_age: None,
        life: 85.0,
        desired_monthly: 10_000.0,
        inflation: 2.5,
        nominal_return: 5.0,
        json: false,
    }
}
