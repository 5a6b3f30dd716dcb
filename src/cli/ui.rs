use crate::core::sync::FundOutcome;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Warning,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Warning => style(text).yellow().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Status cell for a fund outcome.
pub fn outcome_cell(outcome: &FundOutcome) -> Cell {
    match outcome {
        FundOutcome::Updated(_) => Cell::new("OK").fg(Color::Green),
        FundOutcome::Unchanged => Cell::new("NO NEW NAV").fg(Color::DarkGrey),
        FundOutcome::Failed(_) => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

/// Right-aligned count cell, dimmed when zero.
pub fn count_cell(count: usize) -> Cell {
    let cell = Cell::new(count).set_alignment(CellAlignment::Right);
    if count == 0 {
        cell.fg(Color::DarkGrey)
    } else {
        cell
    }
}

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Creates a new `indicatif::ProgressBar` with standard styling. The message
/// slot shows the fund being processed.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Prints a status line for a pipeline phase, e.g. `[RUNNING] 01_data_cleaning`.
pub fn print_phase(tag: &str, message: &str) {
    let tag = format!("[{tag}]");
    let styled_tag = match tag.as_str() {
        "[OK]" | "[DONE]" => style_text(&tag, StyleType::TotalValue),
        "[ERROR]" => style_text(&tag, StyleType::Error),
        "[WARN]" => style_text(&tag, StyleType::Warning),
        "[INFO]" => style_text(&tag, StyleType::Subtle),
        _ => style_text(&tag, StyleType::TotalLabel),
    };
    println!("{styled_tag} {message}");
}
