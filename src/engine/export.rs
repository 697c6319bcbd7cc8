//! Export Module
//! JSON and CSV renderings of the (filtered) audit list

use super::model::AuditRecord;

pub const CSV_COLUMNS: &[&str] = &["id", "year", "name", "start", "reaudits", "notes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// `clinical-audits-<year|all>.<ext>`
pub fn file_name(filter_year: Option<&str>, format: ExportFormat) -> String {
    format!(
        "clinical-audits-{}.{}",
        filter_year.unwrap_or("all"),
        format.extension()
    )
}

pub fn render(items: &[&AuditRecord], format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => to_json(items),
        ExportFormat::Csv => Ok(to_csv(items)),
    }
}

/// Pretty-printed with two-space indentation, stored field names.
pub fn to_json(items: &[&AuditRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(items)
}

pub fn to_csv(items: &[&AuditRecord]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');

    for item in items {
        let reaudits = item
            .reaudits
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join("; ");
        let notes = item
            .notes
            .iter()
            .map(|n| n.display())
            .collect::<Vec<_>>()
            .join("; ");
        let start = item.start_period.as_deref().unwrap_or("");

        let row = [
            item.id.as_str(),
            item.year.as_str(),
            item.name.as_str(),
            start,
            reaudits.as_str(),
            notes.as_str(),
        ];
        out.push_str(
            &row.iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }

    out
}

fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
