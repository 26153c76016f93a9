use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::{
    Aggregates, DashboardView, Dataset, FilterCriteria, ProblemRecord, STATUS_RESOLVED,
};

pub fn filter(dataset: &Dataset, criteria: &FilterCriteria) -> Vec<ProblemRecord> {
    dataset
        .records
        .iter()
        .filter(|record| matches(record, criteria))
        .cloned()
        .collect()
}

fn matches(record: &ProblemRecord, criteria: &FilterCriteria) -> bool {
    if !selection_matches(&criteria.status, &record.status) {
        return false;
    }
    if !selection_matches(&criteria.priority, &record.priority) {
        return false;
    }
    if !selection_matches(&criteria.module, &record.module) {
        return false;
    }
    if let Some((start, end)) = criteria.period {
        // Records without a parsable date never match a range.
        match record.created_at {
            Some(created) => created >= start && created <= end,
            None => false,
        }
    } else {
        true
    }
}

fn selection_matches(selection: &Option<Vec<String>>, value: &str) -> bool {
    match selection {
        Some(values) if !values.is_empty() => values.iter().any(|v| v == value),
        _ => true,
    }
}

pub fn aggregate(records: &[ProblemRecord]) -> Aggregates {
    let total = records.len();
    let resolved = records
        .iter()
        .filter(|record| record.status == STATUS_RESOLVED)
        .count();

    let mut status_counts: HashMap<String, usize> = HashMap::new();
    let mut priority_counts: HashMap<String, usize> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for record in records {
        *status_counts.entry(record.status.clone()).or_insert(0) += 1;
        *priority_counts.entry(record.priority.clone()).or_insert(0) += 1;
        if let Some(created) = record.created_at {
            *daily.entry(created).or_insert(0) += 1;
        }
    }

    Aggregates {
        total,
        resolved,
        open: total - resolved,
        status_counts: sorted_counts(status_counts),
        priority_distribution: sorted_counts(priority_counts),
        daily_series: daily.into_iter().collect(),
    }
}

// Count-descending, name on ties, so chart feeds are deterministic.
fn sorted_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

// Distinct non-empty values in first-appearance order.
pub fn distinct_values<F>(dataset: &Dataset, field: F) -> Vec<String>
where
    F: Fn(&ProblemRecord) -> &str,
{
    let mut seen = Vec::new();
    for record in &dataset.records {
        let value = field(record);
        if !value.is_empty() && !seen.iter().any(|v: &String| v == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

// Default bounds for the date-range picker; never applied as an implicit filter.
pub fn date_bounds(dataset: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for record in &dataset.records {
        if let Some(created) = record.created_at {
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(created), max.max(created)),
                None => (created, created),
            });
        }
    }
    bounds
}

pub fn build_view(dataset: &Dataset, criteria: &FilterCriteria) -> DashboardView {
    let rows = filter(dataset, criteria);
    let aggregates = aggregate(&rows);

    DashboardView {
        status_options: distinct_values(dataset, |record| &record.status),
        priority_options: distinct_values(dataset, |record| &record.priority),
        module_options: distinct_values(dataset, |record| &record.module),
        date_bounds: date_bounds(dataset),
        columns: dataset.columns.clone(),
        rows,
        aggregates,
    }
}
