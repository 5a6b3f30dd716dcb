use super::ui;
use crate::core::export::ExportSummary;
use crate::core::sync::{FundOutcome, SyncReport};
use comfy_table::{Cell, Color};

impl SyncReport {
    /// Renders the per-fund outcomes as a table followed by a summary line.
    pub fn display_as_table(&self, title: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Fund"),
            ui::header_cell("Status"),
            ui::header_cell("New records"),
            ui::header_cell("Detail"),
        ]);

        for fund in &self.funds {
            let (written, detail) = match &fund.outcome {
                FundOutcome::Updated(n) => (*n, String::new()),
                FundOutcome::Unchanged => (0, String::new()),
                FundOutcome::Failed(reason) => (0, reason.clone()),
            };
            table.add_row(vec![
                Cell::new(&fund.fund_name),
                ui::outcome_cell(&fund.outcome),
                ui::count_cell(written),
                Cell::new(detail).fg(Color::DarkGrey),
            ]);
        }

        let mut output = format!("{}\n\n", ui::style_text(title, ui::StyleType::Title));
        output.push_str(&table.to_string());

        let failed = self.failed();
        let failed_text = failed.to_string();
        let failed_style = if failed > 0 {
            ui::StyleType::Error
        } else {
            ui::StyleType::TotalValue
        };
        output.push_str(&format!(
            "\n\n{} updated: {}, unchanged: {}, failed: {}, new records: {}",
            ui::style_text("Funds", ui::StyleType::TotalLabel),
            ui::style_text(&self.updated().to_string(), ui::StyleType::TotalValue),
            self.unchanged(),
            ui::style_text(&failed_text, failed_style),
            ui::style_text(&self.new_records().to_string(), ui::StyleType::TotalValue),
        ));
        if self.is_partial() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "Partial success: failed funds were skipped",
                    ui::StyleType::Warning
                )
            ));
        }
        output
    }
}

pub fn print_export(summary: &ExportSummary) {
    let paths: Vec<String> = summary
        .paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    ui::print_phase(
        "OK",
        &format!(
            "Master table created with {} rows: {}",
            summary.rows,
            paths.join(", ")
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_table_lists_every_fund() {
        console::set_colors_enabled(false);

        let mut report = SyncReport::default();
        report.record("Fund X", FundOutcome::Updated(1));
        report.record("Fund Y", FundOutcome::Failed("status 'ERROR'".to_string()));
        report.record("Fund Z", FundOutcome::Unchanged);

        let output = report.display_as_table("Daily update");

        assert!(output.contains("Daily update"));
        assert!(output.contains("Fund X"));
        assert!(output.contains("Fund Y"));
        assert!(output.contains("status 'ERROR'"));
        assert!(output.contains("NO NEW NAV"));
        assert!(output.contains("updated: 1, unchanged: 1, failed: 1, new records: 1"));
        assert!(output.contains("Partial success"));
    }

    #[test]
    fn test_report_without_failures_has_no_warning() {
        console::set_colors_enabled(false);

        let mut report = SyncReport::default();
        report.record("Fund X", FundOutcome::Unchanged);

        let output = report.display_as_table("Daily update");
        assert!(!output.contains("Partial success"));
    }
}
