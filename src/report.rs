use std::fmt::Write;

use crate::models::DashboardView;

pub fn build_report(label: Option<&str>, view: &DashboardView) -> String {
    let mut output = String::new();
    let scope = label.unwrap_or("all records");
    let aggregates = &view.aggregates;

    let _ = writeln!(output, "# Problem Management Report");
    let _ = writeln!(output, "Generated for {scope}");
    if let Some((start, end)) = view.date_bounds {
        let _ = writeln!(output, "Records span {start} to {end}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Indicators");
    let _ = writeln!(output, "- Total: {}", aggregates.total);
    let _ = writeln!(output, "- Resolved: {}", aggregates.resolved);
    let _ = writeln!(output, "- Open: {}", aggregates.open);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Breakdown");
    if aggregates.status_counts.is_empty() {
        let _ = writeln!(output, "No records match the current filters.");
    } else {
        for (status, count) in aggregates.status_counts.iter() {
            let _ = writeln!(output, "- {status}: {count}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Mix");
    if aggregates.priority_distribution.is_empty() {
        let _ = writeln!(output, "No records match the current filters.");
    } else {
        for (priority, count) in aggregates.priority_distribution.iter() {
            let share = 100.0 * *count as f64 / aggregates.total.max(1) as f64;
            let _ = writeln!(output, "- {priority}: {count} ({share:.1}%)");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Created");
    if aggregates.daily_series.is_empty() {
        let _ = writeln!(output, "No records with a parsable creation date.");
    } else {
        for (day, count) in aggregates.daily_series.iter() {
            let _ = writeln!(output, "- {day}: {count}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::build_view;
    use crate::load::from_csv_bytes;
    use crate::models::{Dataset, FilterCriteria};

    const SAMPLE_CSV: &str = "\
Status Card,Prioridade,Módulo Impactado,Data Criação
Resolvido,Alta,Faturamento,01/01/2024
Aberto,Média,Estoque,02/01/2024
";

    #[test]
    fn report_lists_indicators_and_sections() {
        let dataset = from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        let view = build_view(&dataset, &FilterCriteria::default());
        let report = build_report(None, &view);

        assert!(report.contains("# Problem Management Report"));
        assert!(report.contains("- Total: 2"));
        assert!(report.contains("- Resolved: 1"));
        assert!(report.contains("- Open: 1"));
        assert!(report.contains("- Alta: 1 (50.0%)"));
        assert!(report.contains("- 2024-01-02: 1"));
    }

    #[test]
    fn empty_view_reports_fallback_lines() {
        let view = build_view(&Dataset::empty(), &FilterCriteria::default());
        let report = build_report(Some("upload pending"), &view);

        assert!(report.contains("Generated for upload pending"));
        assert!(report.contains("No records match the current filters."));
        assert!(report.contains("No records with a parsable creation date."));
    }
}
