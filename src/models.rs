use chrono::NaiveDate;
use serde::Serialize;

pub const COL_STATUS: &str = "Status Card";
pub const COL_PRIORITY: &str = "Prioridade";
pub const COL_MODULE: &str = "Módulo Impactado";
pub const COL_CREATED: &str = "Data Criação";

// Exact, case-sensitive match.
pub const STATUS_RESOLVED: &str = "Resolvido";

#[derive(Debug, Clone, Serialize)]
pub struct ProblemRecord {
    pub status: String,
    pub priority: String,
    pub module: String,
    // None when the source cell did not parse as a day-first date.
    pub created_at: Option<NaiveDate>,
    // Verbatim row, aligned with Dataset::columns.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<ProblemRecord>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub status: Option<Vec<String>>,
    pub priority: Option<Vec<String>>,
    pub module: Option<Vec<String>>,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        fn unset(selection: &Option<Vec<String>>) -> bool {
            selection.as_ref().map_or(true, |values| values.is_empty())
        }
        unset(&self.status)
            && unset(&self.priority)
            && unset(&self.module)
            && self.period.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregates {
    pub total: usize,
    pub resolved: usize,
    pub open: usize,
    pub status_counts: Vec<(String, usize)>,
    pub priority_distribution: Vec<(String, usize)>,
    pub daily_series: Vec<(NaiveDate, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub status_options: Vec<String>,
    pub priority_options: Vec<String>,
    pub module_options: Vec<String>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub columns: Vec<String>,
    pub rows: Vec<ProblemRecord>,
    pub aggregates: Aggregates,
}
