//! Application State
//! In-memory audit collection, the active year filter, and derived views

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::model::AuditRecord;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub items: Vec<AuditRecord>,
    pub filter_year: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_audits: usize,
    pub total_reaudits: usize,
    pub total_notes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearStats {
    pub year: String,
    pub audits: usize,
    pub reaudits: usize,
    pub notes: usize,
}

impl AppState {
    pub fn new(items: Vec<AuditRecord>) -> Self {
        Self {
            items,
            filter_year: None,
        }
    }

    /// Swap in a freshly loaded collection. A year filter that no record
    /// matches any more is cleared.
    pub fn replace_items(&mut self, items: Vec<AuditRecord>) {
        self.items = items;
        if let Some(year) = &self.filter_year {
            if !self.items.iter().any(|item| &item.year == year) {
                self.filter_year = None;
            }
        }
    }

    pub fn set_filter(&mut self, year: Option<&str>) {
        self.filter_year = year
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(str::to_string);
    }

    pub fn filtered(&self) -> Vec<&AuditRecord> {
        filter_by_year(&self.items, self.filter_year.as_deref())
    }

    pub fn find(&self, id: &str) -> Option<&AuditRecord> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut AuditRecord> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Remove exactly the record with `id`.
    pub fn remove(&mut self, id: &str) -> Option<AuditRecord> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Table heading for the current filter.
    pub fn title(&self) -> String {
        match &self.filter_year {
            Some(year) => format!("Audits - {}", year),
            None => "All Audits".to_string(),
        }
    }
}

/// Records whose year equals `year`, in their original order. `None` keeps all.
pub fn filter_by_year<'a>(items: &'a [AuditRecord], year: Option<&str>) -> Vec<&'a AuditRecord> {
    match year {
        Some(year) => items.iter().filter(|item| item.year == year).collect(),
        None => items.iter().collect(),
    }
}

pub fn stats<'a>(items: impl IntoIterator<Item = &'a AuditRecord>) -> Stats {
    items.into_iter().fold(Stats::default(), |mut acc, item| {
        acc.total_audits += 1;
        acc.total_reaudits += item.reaudits.len();
        acc.total_notes += item.notes.len();
        acc
    })
}

/// Per-year counts, newest year first. Records without a year are skipped.
pub fn year_stats<'a>(items: impl IntoIterator<Item = &'a AuditRecord>) -> Vec<YearStats> {
    let mut by_year: BTreeMap<String, YearStats> = BTreeMap::new();
    for item in items {
        if item.year.is_empty() {
            continue;
        }
        let row = by_year.entry(item.year.clone()).or_insert_with(|| YearStats {
            year: item.year.clone(),
            ..Default::default()
        });
        row.audits += 1;
        row.reaudits += item.reaudits.len();
        row.notes += item.notes.len();
    }
    by_year.into_values().rev().collect()
}

/// Years to offer: those present in the data plus the years around `now_year`,
/// newest first.
pub fn year_list(items: &[AuditRecord], now_year: i32) -> Vec<String> {
    let mut years: BTreeSet<String> = [now_year - 1, now_year, now_year + 1]
        .iter()
        .map(|y| y.to_string())
        .collect();
    years.extend(
        items
            .iter()
            .filter(|item| !item.year.is_empty())
            .map(|item| item.year.clone()),
    );

    let mut years: Vec<String> = years.into_iter().collect();
    years.sort_by(|a, b| year_number(b).cmp(&year_number(a)).then_with(|| b.cmp(a)));
    years
}

/// Year cards for every offered year, zero-filled where there is no data.
pub fn year_cards(items: &[AuditRecord], now_year: i32) -> Vec<YearStats> {
    let stats = year_stats(items);
    year_list(items, now_year)
        .into_iter()
        .map(|year| {
            stats
                .iter()
                .find(|row| row.year == year)
                .cloned()
                .unwrap_or(YearStats {
                    year,
                    ..Default::default()
                })
        })
        .collect()
}

/// Sorted copy for the table: newest year first, then newest start month.
pub fn display_order<'a>(items: &[&'a AuditRecord]) -> Vec<&'a AuditRecord> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        year_number(&b.year)
            .cmp(&year_number(&a.year))
            .then_with(|| {
                let start_a = a.start_period.as_deref().unwrap_or("");
                let start_b = b.start_period.as_deref().unwrap_or("");
                start_b.cmp(start_a)
            })
    });
    sorted
}

fn year_number(year: &str) -> i64 {
    year.trim().parse().unwrap_or(0)
}
