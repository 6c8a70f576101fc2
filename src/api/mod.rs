use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    IncrementMonth, Inputs, MAX_INDEX, MAX_LEVEL, PayMatrix, Projection, Promotion, run_projection,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliIncrementMonth {
    January,
    July,
}

impl From<CliIncrementMonth> for IncrementMonth {
    fn from(value: CliIncrementMonth) -> Self {
        match value {
            CliIncrementMonth::January => IncrementMonth::January,
            CliIncrementMonth::July => IncrementMonth::July,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiIncrementMonth {
    #[serde(alias = "jan")]
    January,
    #[serde(alias = "jul")]
    July,
}

impl From<ApiIncrementMonth> for CliIncrementMonth {
    fn from(value: ApiIncrementMonth) -> Self {
        match value {
            ApiIncrementMonth::January => CliIncrementMonth::January,
            ApiIncrementMonth::July => CliIncrementMonth::July,
        }
    }
}

impl From<IncrementMonth> for ApiIncrementMonth {
    fn from(value: IncrementMonth) -> Self {
        match value {
            IncrementMonth::January => ApiIncrementMonth::January,
            IncrementMonth::July => ApiIncrementMonth::July,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "npsups",
    about = "NPS + UPS pension projector over the 7th CPC pay matrix"
)]
struct Cli {
    #[arg(long, default_value_t = 10, help = "Pay matrix level (1-18)")]
    pay_level: u32,
    #[arg(long, default_value_t = 1, help = "Step index within the level (1-40)")]
    pay_index: u32,
    #[arg(
        long,
        help = "Opening basic pay; defaults to the pay matrix cell for the level and index"
    )]
    basic_pay: Option<f64>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Current dearness allowance in percent of basic pay"
    )]
    allowance_percent: f64,
    #[arg(long, help = "Date of joining service; defaults to 20 years before today")]
    date_of_joining: Option<NaiveDate>,
    #[arg(long, help = "Retirement date; defaults to 20 years from today")]
    retirement_date: Option<NaiveDate>,
    #[arg(
        long,
        value_enum,
        default_value_t = CliIncrementMonth::July,
        help = "Month of the annual pay-step increment"
    )]
    increment_month: CliIncrementMonth,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Corpus balance already accumulated under the contributory scheme"
    )]
    opening_corpus: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Assumed annual corpus return in percent"
    )]
    annual_return_rate: f64,
    #[arg(
        long,
        help = "Override the simulation start date; defaults to the current date"
    )]
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    pay_level: Option<u32>,
    pay_index: Option<u32>,
    basic_pay: Option<f64>,
    allowance_percent: Option<f64>,
    date_of_joining: Option<NaiveDate>,
    retirement_date: Option<NaiveDate>,
    increment_month: Option<ApiIncrementMonth>,
    opening_corpus: Option<f64>,
    annual_return_rate: Option<f64>,
    today: Option<NaiveDate>,
    promotions: Vec<PromotionPayload>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromotionPayload {
    date: NaiveDate,
    level: u32,
    index: u32,
}

impl From<PromotionPayload> for Promotion {
    fn from(value: PromotionPayload) -> Self {
        Promotion {
            date: value.date,
            level: value.level,
            index: value.index,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    today: NaiveDate,
    increment_month: ApiIncrementMonth,
    annual_return_rate: f64,
    #[serde(flatten)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayMatrixResponse {
    levels: u32,
    max_index: u32,
    cells: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli, promotions: Vec<Promotion>) -> Result<Inputs, String> {
    if !(1..=MAX_LEVEL).contains(&cli.pay_level) {
        return Err(format!("--pay-level must be between 1 and {MAX_LEVEL}"));
    }

    if !(1..=MAX_INDEX).contains(&cli.pay_index) {
        return Err(format!("--pay-index must be between 1 and {MAX_INDEX}"));
    }

    if !cli.allowance_percent.is_finite() || cli.allowance_percent < 0.0 {
        return Err("--allowance-percent must be >= 0".to_string());
    }

    if !cli.opening_corpus.is_finite() || cli.opening_corpus < 0.0 {
        return Err("--opening-corpus must be >= 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.annual_return_rate) {
        return Err("--annual-return-rate must be between 0 and 100".to_string());
    }

    for promotion in &promotions {
        if !(1..=MAX_LEVEL).contains(&promotion.level) {
            return Err(format!("promotion level must be between 1 and {MAX_LEVEL}"));
        }
        if !(1..=MAX_INDEX).contains(&promotion.index) {
            return Err(format!("promotion index must be between 1 and {MAX_INDEX}"));
        }
    }

    let basic_pay = match cli.basic_pay {
        Some(value) if value.is_finite() && value > 0.0 => value,
        Some(_) => return Err("--basic-pay must be > 0".to_string()),
        None => PayMatrix::seventh_cpc().lookup(cli.pay_level, cli.pay_index),
    };

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    Ok(Inputs {
        today,
        date_of_joining: cli.date_of_joining.unwrap_or_else(|| years_from(today, -20)),
        retirement_date: cli.retirement_date.unwrap_or_else(|| years_from(today, 20)),
        pay_level: cli.pay_level,
        pay_index: cli.pay_index,
        basic_pay,
        allowance_percent: cli.allowance_percent,
        increment_month: cli.increment_month.into(),
        opening_corpus: cli.opening_corpus,
        annual_return_rate: cli.annual_return_rate / 100.0,
        promotions,
    })
}

// Shifting Feb 29 into a non-leap year lands on Mar 1.
fn years_from(date: NaiveDate, years: i32) -> NaiveDate {
    date.with_year(date.year() + years).unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(date.year() + years, 3, 1).expect("first of March is valid")
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/pay-matrix", get(pay_matrix_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("pension projector API listening on http://{addr}");
    println!("Pension projector API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let table = PayMatrix::seventh_cpc();
    match run_projection(&inputs, &table) {
        Ok(projection) => {
            log::debug!(
                "projected {} years {} months of service, final corpus {:.0}",
                projection.service.years,
                projection.service.months,
                projection.final_corpus
            );
            json_response(StatusCode::OK, build_project_response(&inputs, projection))
        }
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

async fn pay_matrix_handler() -> Response {
    let table = PayMatrix::seventh_cpc();
    json_response(StatusCode::OK, build_pay_matrix_response(&table))
}

fn build_pay_matrix_response(table: &PayMatrix) -> PayMatrixResponse {
    let cells = (1..=MAX_LEVEL)
        .map(|level| {
            (1..=table.max_index(level))
                .map(|index| table.lookup(level, index))
                .collect()
        })
        .collect();

    PayMatrixResponse {
        levels: MAX_LEVEL,
        max_index: MAX_INDEX,
        cells,
    }
}

fn build_project_response(inputs: &Inputs, projection: Projection) -> ProjectResponse {
    ProjectResponse {
        today: inputs.today,
        increment_month: inputs.increment_month.into(),
        annual_return_rate: inputs.annual_return_rate,
        projection,
    }
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}

fn inputs_from_payload(payload: ProjectPayload) -> Result<Inputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.pay_level {
        cli.pay_level = v;
    }
    if let Some(v) = payload.pay_index {
        cli.pay_index = v;
    }
    if let Some(v) = payload.basic_pay {
        cli.basic_pay = Some(v);
    }
    if let Some(v) = payload.allowance_percent {
        cli.allowance_percent = v;
    }
    if let Some(v) = payload.date_of_joining {
        cli.date_of_joining = Some(v);
    }
    if let Some(v) = payload.retirement_date {
        cli.retirement_date = Some(v);
    }
    if let Some(v) = payload.increment_month {
        cli.increment_month = v.into();
    }
    if let Some(v) = payload.opening_corpus {
        cli.opening_corpus = v;
    }
    if let Some(v) = payload.annual_return_rate {
        cli.annual_return_rate = v;
    }
    if let Some(v) = payload.today {
        cli.today = Some(v);
    }

    let promotions = payload.promotions.into_iter().map(Promotion::from).collect();
    build_inputs(cli, promotions)
}

fn default_cli_for_api() -> Cli {
    Cli {
        pay_level: 10,
        pay_index: 1,
        basic_pay: None,
        allowance_percent: 0.0,
        date_of_joining: None,
        retirement_date: None,
        increment_month: CliIncrementMonth::July,
        opening_corpus: 0.0,
        annual_return_rate: 8.0,
        today: None,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn sample_cli() -> Cli {
        let mut cli = default_cli_for_api();
        cli.today = Some(date(2025, 8, 7));
        cli
    }

    #[test]
    fn build_inputs_rejects_level_out_of_range() {
        let mut cli = sample_cli();
        cli.pay_level = 19;

        let err = build_inputs(cli, Vec::new()).expect_err("must reject level 19");
        assert!(err.contains("--pay-level"));
    }

    #[test]
    fn build_inputs_rejects_step_index_out_of_range() {
        let mut cli = sample_cli();
        cli.pay_index = 0;

        let err = build_inputs(cli, Vec::new()).expect_err("must reject index 0");
        assert!(err.contains("--pay-index"));
    }

    #[test]
    fn build_inputs_rejects_negative_allowance() {
        let mut cli = sample_cli();
        cli.allowance_percent = -1.0;

        let err = build_inputs(cli, Vec::new()).expect_err("must reject negative DA");
        assert!(err.contains("--allowance-percent"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_return_rate() {
        let mut cli = sample_cli();
        cli.annual_return_rate = 120.0;

        let err = build_inputs(cli, Vec::new()).expect_err("must reject 120% return");
        assert!(err.contains("--annual-return-rate"));
    }

    #[test]
    fn build_inputs_defaults_basic_pay_from_the_matrix() {
        let cli = sample_cli();

        let inputs = build_inputs(cli, Vec::new()).expect("valid inputs");
        assert_approx(inputs.basic_pay, 56_100.0);
    }

    #[test]
    fn build_inputs_defaults_dates_around_today() {
        let cli = sample_cli();

        let inputs = build_inputs(cli, Vec::new()).expect("valid inputs");
        assert_eq!(inputs.today, date(2025, 8, 7));
        assert_eq!(inputs.date_of_joining, date(2005, 8, 7));
        assert_eq!(inputs.retirement_date, date(2045, 8, 7));
    }

    #[test]
    fn build_inputs_converts_return_rate_to_a_fraction() {
        let mut cli = sample_cli();
        cli.annual_return_rate = 8.0;

        let inputs = build_inputs(cli, Vec::new()).expect("valid inputs");
        assert_approx(inputs.annual_return_rate, 0.08);
    }

    #[test]
    fn build_inputs_rejects_bad_promotion_coordinates() {
        let cli = sample_cli();
        let promotions = vec![Promotion {
            date: date(2030, 1, 1),
            level: 25,
            index: 1,
        }];

        let err = build_inputs(cli, promotions).expect_err("must reject level 25");
        assert!(err.contains("promotion level"));
    }

    #[test]
    fn inputs_from_json_parses_web_keys() {
        let json = r#"{
          "payLevel": 11,
          "payIndex": 4,
          "allowancePercent": 53,
          "dateOfJoining": "2010-06-15",
          "retirementDate": "2043-06-30",
          "incrementMonth": "january",
          "openingCorpus": 1500000,
          "annualReturnRate": 9.5,
          "today": "2025-08-07",
          "promotions": [
            { "date": "2030-07-01", "level": 12, "index": 1 }
          ]
        }"#;

        let inputs = inputs_from_json(json).expect("json should parse");
        assert_eq!(inputs.pay_level, 11);
        assert_eq!(inputs.pay_index, 4);
        assert_approx(inputs.allowance_percent, 53.0);
        assert_eq!(inputs.date_of_joining, date(2010, 6, 15));
        assert_eq!(inputs.retirement_date, date(2043, 6, 30));
        assert_eq!(inputs.increment_month, IncrementMonth::January);
        assert_approx(inputs.opening_corpus, 1_500_000.0);
        assert_approx(inputs.annual_return_rate, 0.095);
        assert_eq!(inputs.promotions.len(), 1);
        assert_eq!(inputs.promotions[0].level, 12);
        assert_eq!(inputs.promotions[0].date, date(2030, 7, 1));

        // Basic pay falls back to the matrix cell for level 11 index 4.
        assert_approx(inputs.basic_pay, 74_000.0);
    }

    #[test]
    fn inputs_from_json_accepts_short_month_aliases() {
        let inputs =
            inputs_from_json(r#"{ "incrementMonth": "jul", "today": "2025-08-07" }"#)
                .expect("json should parse");
        assert_eq!(inputs.increment_month, IncrementMonth::July);
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let mut cli = sample_cli();
        cli.today = Some(date(2025, 1, 1));
        cli.date_of_joining = Some(date(2005, 1, 1));
        cli.retirement_date = Some(date(2035, 1, 1));

        let inputs = build_inputs(cli, Vec::new()).expect("valid inputs");
        let table = PayMatrix::seventh_cpc();
        let projection = run_projection(&inputs, &table).expect("valid projection");
        let response = build_project_response(&inputs, projection);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"finalCorpus\""));
        assert!(json.contains("\"lumpSum\""));
        assert!(json.contains("\"monthlyPensionContributory\""));
        assert!(json.contains("\"benefitScheme\""));
        assert!(json.contains("\"gratuity\""));
        assert!(json.contains("\"realValues\""));
        assert!(json.contains("\"yearSnapshots\""));
        assert!(json.contains("\"eventLog\""));
        assert!(json.contains("\"incrementMonth\""));
        assert!(json.contains("\"type\":\"revision\""));
    }

    #[test]
    fn pay_matrix_response_exposes_every_level() {
        let table = PayMatrix::seventh_cpc();
        let response = build_pay_matrix_response(&table);

        assert_eq!(response.levels, 18);
        assert_eq!(response.cells.len(), 18);
        assert_eq!(response.cells[9].len(), response.max_index as usize);
        assert_approx(response.cells[9][0], 56_100.0);
    }
}
