use chrono::{Datelike, NaiveDate};

use super::error::ProjectError;
use super::matrix::PayMatrix;
use super::types::{
    BenefitScheme, BenefitYear, EventRecord, IncrementMonth, Inputs, Projection, Promotion,
    RealValues, ServiceLength, YearSnapshot,
};

const JANUARY: u32 = 1;
const JULY: u32 = 7;

const FITMENT_FACTOR: f64 = 2.0;
const ALLOWANCE_STEP_PERCENT: f64 = 3.0;
const CONTRIBUTION_RATE: f64 = 0.24; // 10% employee + 14% employer
const LUMP_SUM_SHARE: f64 = 0.6;
const ANNUITY_RATE: f64 = 0.065;
const INFLATION_RATE: f64 = 0.0694;
const GRATUITY_CAP: f64 = 2_500_000.0;
const BENEFIT_FRACTION: f64 = 0.5;
const MIN_BENEFIT_SERVICE_YEARS: f64 = 10.0;
const BENEFIT_AVERAGING_SNAPSHOTS: usize = 10;
const BENEFIT_HORIZON_YEARS: u32 = 20;
const REAL_VALUE_HORIZON_YEARS: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
struct CareerState {
    level: u32,
    index: u32,
    basic: f64,
    allowance_percent: f64,
}

#[derive(Debug)]
struct Timeline {
    snapshots: Vec<YearSnapshot>,
    events: Vec<EventRecord>,
    corpus_balance: f64,
    final_state: CareerState,
    final_total_salary: f64,
}

/// Validate inputs, walk the career month by month, and derive both pension
/// estimates. The pay matrix argument is cloned per run so the revision
/// mutation never leaks across invocations.
pub fn run_projection(inputs: &Inputs, table: &PayMatrix) -> Result<Projection, ProjectError> {
    validate(inputs)?;
    let timeline = simulate_timeline(inputs, table.clone());
    Ok(finalize(inputs, timeline))
}

/// Whole years and remainder months between two dates, truncating a partial
/// month: when the end day-of-month falls short of the start's, one month is
/// borrowed from the year delta and the partial month is dropped.
pub fn elapsed_service(start: NaiveDate, end: NaiveDate) -> ServiceLength {
    let mut years = end.year() - start.year();
    let mut months = end.month() as i32 - start.month() as i32;

    if months < 0 || (months == 0 && end.day() < start.day()) {
        years -= 1;
        months += 12;
    }

    if end.day() < start.day() {
        months -= 1;
    }

    ServiceLength {
        years: years.max(0) as u32,
        months: months.max(0) as u32,
    }
}

/// Purchasing power of a nominal future amount in today's terms.
pub fn real_value(amount: f64, years_in_future: f64) -> f64 {
    amount * (1.0 - INFLATION_RATE).powf(years_in_future)
}

fn validate(inputs: &Inputs) -> Result<(), ProjectError> {
    if inputs.retirement_date <= inputs.date_of_joining {
        return Err(ProjectError::RetirementBeforeJoining);
    }

    if inputs.retirement_date <= inputs.today {
        return Err(ProjectError::RetirementNotInFuture);
    }

    for promotion in &inputs.promotions {
        if promotion.date <= inputs.today {
            return Err(ProjectError::PromotionNotInFuture {
                date: promotion.date,
            });
        }
    }

    Ok(())
}

fn is_revision_year(year: i32) -> bool {
    year.rem_euclid(10) == 6
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is a valid date")
}

fn simulate_timeline(inputs: &Inputs, mut table: PayMatrix) -> Timeline {
    let today_month = month_start(inputs.today.year(), inputs.today.month());
    let mut year = today_month.year();
    let mut month = today_month.month();

    let mut state = CareerState {
        level: inputs.pay_level,
        index: inputs.pay_index,
        basic: inputs.basic_pay,
        allowance_percent: inputs.allowance_percent,
    };

    let mut promotions = inputs.promotions.clone();
    promotions.sort_by_key(|p| p.date);

    let monthly_rate = inputs.annual_return_rate / 12.0;
    let mut corpus_balance = 0.0;
    let mut corpus_seeded = false;

    let mut events: Vec<EventRecord> = Vec::new();
    let mut snapshots: Vec<YearSnapshot> = Vec::new();
    let mut final_total_salary = state.basic * (1.0 + state.allowance_percent / 100.0);

    while month_start(year, month) < inputs.retirement_date {
        let revision_month = is_revision_year(year) && month == JANUARY;

        if revision_month {
            events.push(apply_revision(&mut state, &mut table, inputs, year, month));
        } else if month == inputs.increment_month.month_number() {
            apply_step_increment(&mut state, &table);
        }

        // DA revision every January and July; the January of a revision
        // year was just reset to zero and is skipped.
        if (month == JANUARY || month == JULY) && !revision_month {
            state.allowance_percent += ALLOWANCE_STEP_PERCENT;
        }

        if let Some(position) = promotions
            .iter()
            .position(|p| p.date.year() == year && p.date.month() == month)
        {
            let promotion = promotions.remove(position);
            events.push(apply_promotion(&mut state, &table, promotion, year, month));
        }

        let total_salary = state.basic * (1.0 + state.allowance_percent / 100.0);
        final_total_salary = total_salary;

        if month_start(year, month) >= today_month {
            if !corpus_seeded {
                corpus_balance = inputs.opening_corpus.max(0.0);
                corpus_seeded = true;
            }
            corpus_balance =
                corpus_balance * (1.0 + monthly_rate) + total_salary * CONTRIBUTION_RATE;
        }

        if month == JANUARY {
            let year_events = events.iter().filter(|e| e.year() == year).cloned().collect();
            snapshots.push(YearSnapshot {
                year,
                basic: state.basic,
                allowance_percent: state.allowance_percent,
                total_salary,
                corpus_balance,
                events: year_events,
            });
        }

        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }

    Timeline {
        snapshots,
        events,
        corpus_balance,
        final_state: state,
        final_total_salary,
    }
}

/// Pay-commission January: for a January increment cycle the step advances
/// first, then the fitment factor doubles basic pay, DA resets to zero, and
/// the whole matrix is revised for every later lookup.
fn apply_revision(
    state: &mut CareerState,
    table: &mut PayMatrix,
    inputs: &Inputs,
    year: i32,
    month: u32,
) -> EventRecord {
    if inputs.increment_month == IncrementMonth::January {
        apply_step_increment(state, table);
    }

    let basic_before = state.basic;
    state.basic *= FITMENT_FACTOR;
    state.allowance_percent = 0.0;
    table.apply_fitment(FITMENT_FACTOR);

    EventRecord::Revision {
        year,
        month,
        basic_before,
        basic_after: state.basic,
        allowance_percent: state.allowance_percent,
        level: state.level,
        index: state.index,
    }
}

fn apply_step_increment(state: &mut CareerState, table: &PayMatrix) {
    if state.index < table.max_index(state.level) {
        state.index += 1;
        state.basic = table.lookup(state.level, state.index);
    }
}

fn apply_promotion(
    state: &mut CareerState,
    table: &PayMatrix,
    promotion: Promotion,
    year: i32,
    month: u32,
) -> EventRecord {
    let basic_before = state.basic;
    let from_level = state.level;
    let from_index = state.index;

    state.level = promotion.level;
    state.index = promotion.index;
    state.basic = table.lookup(state.level, state.index);

    EventRecord::Promotion {
        year,
        month,
        basic_before,
        basic_after: state.basic,
        allowance_percent: state.allowance_percent,
        from_level,
        to_level: state.level,
        from_index,
        to_index: state.index,
    }
}

fn finalize(inputs: &Inputs, timeline: Timeline) -> Projection {
    let service = elapsed_service(inputs.date_of_joining, inputs.retirement_date);

    let final_corpus = timeline.corpus_balance.max(0.0);
    let lump_sum = final_corpus * LUMP_SUM_SHARE;
    let annuity = final_corpus - lump_sum;
    let monthly_pension_contributory = annuity * ANNUITY_RATE / 12.0;

    let window_start = timeline
        .snapshots
        .len()
        .saturating_sub(BENEFIT_AVERAGING_SNAPSHOTS);
    let averaging_window = &timeline.snapshots[window_start..];
    let average_salary = if averaging_window.is_empty() {
        timeline.final_total_salary
    } else {
        averaging_window.iter().map(|s| s.total_salary).sum::<f64>() / averaging_window.len() as f64
    };
    let last_snapshot_basic = averaging_window
        .last()
        .map(|s| s.basic)
        .unwrap_or(timeline.final_state.basic);

    let benefit_scheme = if service.total_years() >= MIN_BENEFIT_SERVICE_YEARS {
        let base_pension = average_salary * BENEFIT_FRACTION;
        let projection = build_benefit_projection(base_pension);
        let (total_over_horizon, total_over_horizon_real) = benefit_totals(&projection);
        BenefitScheme {
            eligible: true,
            monthly_pension: Some(base_pension),
            projection: Some(projection),
            total_over_horizon: Some(total_over_horizon),
            total_over_horizon_real: Some(total_over_horizon_real),
        }
    } else {
        BenefitScheme {
            eligible: false,
            monthly_pension: None,
            projection: None,
            total_over_horizon: None,
            total_over_horizon_real: None,
        }
    };

    let completed_half_years = (service.total_months() / 6) as f64;
    let gratuity = (last_snapshot_basic * completed_half_years * 0.5).min(GRATUITY_CAP);

    let monthly_pension_benefit = benefit_scheme
        .projection
        .as_deref()
        .and_then(|rows| rows.last())
        .map(|row| real_value(row.total_pension, REAL_VALUE_HORIZON_YEARS));

    Projection {
        service,
        final_corpus,
        lump_sum,
        monthly_pension_contributory,
        gratuity,
        real_values: RealValues {
            lump_sum: real_value(lump_sum, REAL_VALUE_HORIZON_YEARS),
            monthly_pension_contributory: real_value(
                monthly_pension_contributory,
                REAL_VALUE_HORIZON_YEARS,
            ),
            gratuity: real_value(gratuity, REAL_VALUE_HORIZON_YEARS),
            monthly_pension_benefit,
        },
        benefit_scheme,
        year_snapshots: timeline.snapshots,
        event_log: timeline.events,
    }
}

/// Flat-rate escalation of the base pension: +3 percentage points of DA each
/// January and July, with each year reporting the mean of its two half-year
/// amounts.
fn build_benefit_projection(base_pension: f64) -> Vec<BenefitYear> {
    let mut rows = Vec::with_capacity(BENEFIT_HORIZON_YEARS as usize + 1);
    rows.push(BenefitYear {
        year: 0,
        base_pension,
        allowance_increase: 0.0,
        total_pension: base_pension,
        allowance_percent: 0.0,
    });

    let mut allowance_percent = 0.0;
    for year in 1..=BENEFIT_HORIZON_YEARS {
        allowance_percent += ALLOWANCE_STEP_PERCENT;
        let mid_year_increase = base_pension * allowance_percent / 100.0;
        allowance_percent += ALLOWANCE_STEP_PERCENT;
        let end_year_increase = base_pension * allowance_percent / 100.0;

        let allowance_increase = (mid_year_increase + end_year_increase) / 2.0;
        rows.push(BenefitYear {
            year,
            base_pension,
            allowance_increase,
            total_pension: base_pension + allowance_increase,
            allowance_percent,
        });
    }

    rows
}

fn benefit_totals(projection: &[BenefitYear]) -> (f64, f64) {
    let mut nominal = 0.0;
    let mut real = 0.0;

    for (year_index, row) in projection.iter().enumerate() {
        for month in 0..12u32 {
            let months_from_now = (year_index as u32 * 12 + month) as f64;
            nominal += row.total_pension;
            real += real_value(row.total_pension, months_from_now / 12.0);
        }
    }

    (nominal, real)
}
