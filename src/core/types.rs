use chrono::NaiveDate;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IncrementMonth {
    January,
    July,
}

impl IncrementMonth {
    pub fn month_number(self) -> u32 {
        match self {
            IncrementMonth::January => 1,
            IncrementMonth::July => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub today: NaiveDate,
    pub date_of_joining: NaiveDate,
    pub retirement_date: NaiveDate,
    pub pay_level: u32,
    pub pay_index: u32,
    pub basic_pay: f64,
    pub allowance_percent: f64,
    pub increment_month: IncrementMonth,
    pub opening_corpus: f64,
    pub annual_return_rate: f64,
    pub promotions: Vec<Promotion>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Promotion {
    pub date: NaiveDate,
    pub level: u32,
    pub index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventRecord {
    Revision {
        year: i32,
        month: u32,
        basic_before: f64,
        basic_after: f64,
        allowance_percent: f64,
        level: u32,
        index: u32,
    },
    Promotion {
        year: i32,
        month: u32,
        basic_before: f64,
        basic_after: f64,
        allowance_percent: f64,
        from_level: u32,
        to_level: u32,
        from_index: u32,
        to_index: u32,
    },
}

impl EventRecord {
    pub fn year(&self) -> i32 {
        match self {
            EventRecord::Revision { year, .. } | EventRecord::Promotion { year, .. } => *year,
        }
    }

    pub fn month(&self) -> u32 {
        match self {
            EventRecord::Revision { month, .. } | EventRecord::Promotion { month, .. } => *month,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: i32,
    pub basic: f64,
    pub allowance_percent: f64,
    pub total_salary: f64,
    pub corpus_balance: f64,
    pub events: Vec<EventRecord>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ServiceLength {
    pub years: u32,
    pub months: u32,
}

impl ServiceLength {
    pub fn total_months(self) -> u32 {
        self.years * 12 + self.months
    }

    pub fn total_years(self) -> f64 {
        self.years as f64 + self.months as f64 / 12.0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitYear {
    pub year: u32,
    pub base_pension: f64,
    pub allowance_increase: f64,
    pub total_pension: f64,
    pub allowance_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitScheme {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_pension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<BenefitYear>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_over_horizon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_over_horizon_real: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealValues {
    pub lump_sum: f64,
    pub monthly_pension_contributory: f64,
    pub gratuity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_pension_benefit: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub service: ServiceLength,
    pub final_corpus: f64,
    pub lump_sum: f64,
    pub monthly_pension_contributory: f64,
    pub benefit_scheme: BenefitScheme,
    pub gratuity: f64,
    pub real_values: RealValues,
    pub year_snapshots: Vec<YearSnapshot>,
    pub event_log: Vec<EventRecord>,
}
