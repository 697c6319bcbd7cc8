//! CLI Output Formatting Module
//! Provides consistent, colorized output for terminal UX

use colored::Colorize;

use crate::engine::model::AuditRecord;
use crate::engine::state::{Stats, YearStats};

pub struct CliFormatter;

impl CliFormatter {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a section header
    pub fn header(title: &str) {
        println!("\n{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(title.chars().count()).bright_black());
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    pub fn blank() {
        println!();
    }

    /// Print the audit table, one block per audit with its history underneath.
    pub fn audit_table(records: &[&AuditRecord]) {
        if records.is_empty() {
            println!("  {}", "(no audits)".bright_black());
            return;
        }

        let name_width = records
            .iter()
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(0)
            .max("Clinical Audit Name".len());

        println!(
            "  {} │ {} │ {} │ {}",
            "Year".bright_white().bold(),
            pad("Clinical Audit Name", name_width).bright_white().bold(),
            "Start  ".bright_white().bold(),
            "Id".bright_white().bold()
        );
        println!("  {}", "─".repeat(name_width + 36).bright_black());

        for record in records {
            let start = record.start_label();
            println!(
                "  {} │ {} │ {} │ {}",
                pad(&record.year, 4),
                pad(&record.name, name_width),
                pad(if start.is_empty() { "-" } else { &start }, 7),
                record.id.bright_black()
            );
            Self::audit_history(record);
        }
    }

    fn audit_history(record: &AuditRecord) {
        if !record.reaudits.is_empty() {
            let labels: Vec<String> = record.reaudits.iter().map(|r| r.label()).collect();
            println!("      {} {}", "Re-audits:".blue(), labels.join(", "));
        }
        for (i, note) in record.notes.iter().enumerate() {
            println!(
                "      {} {} ({}): {}",
                format!("{}.", i + 1).bright_white().bold(),
                note.author.bold(),
                crate::engine::model::month_label(&note.period),
                note.text
            );
        }
    }

    pub fn stats(stats: &Stats) {
        Self::kv("Total Audits", &stats.total_audits.to_string());
        Self::kv("Total Re-Audits", &stats.total_reaudits.to_string());
        Self::kv("Total Notes", &stats.total_notes.to_string());
    }

    pub fn year_cards(all: &Stats, cards: &[YearStats]) {
        println!(
            "  {:<9} {:>6}   Re-audits: {} • Notes: {}",
            "All Years".bright_white().bold(),
            all.total_audits,
            all.total_reaudits,
            all.total_notes
        );
        for card in cards {
            println!(
                "  {:<9} {:>6}   Re-audits: {} • Notes: {}",
                card.year, card.audits, card.reaudits, card.notes
            );
        }
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}
