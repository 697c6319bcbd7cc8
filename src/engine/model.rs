//! Audit Record Model
//! Wire shape of the audit collection and input-time validation

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid year regex"));
static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("valid period regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter Clinical Audit Name and Year.")]
    MissingNameOrYear,
    #[error("Please enter a valid Year (YYYY) and Name.")]
    InvalidYearOrName,
    #[error("Start Month must be like YYYY-MM or empty.")]
    InvalidStartPeriod,
    #[error("Please select a month.")]
    MissingPeriod,
    #[error("Month must be like YYYY-MM, got '{0}'")]
    InvalidPeriod(String),
    #[error("Please enter both note and your name.")]
    MissingNoteFields,
    #[error("Note text cannot be empty.")]
    EmptyNoteText,
}

/// One tracked clinical audit.
///
/// Stored data is read leniently and never rejected: numbers and booleans
/// read as their text, missing or `null` fields read as empty, and bare
/// strings in `reaudits`/`notes` read as the period or note text. Unknown
/// fields land in `extra`. Whatever a record was read from is kept in
/// `origin`, and fields that were not changed are written back in their
/// original shape.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub id: String,
    pub year: String,
    pub name: String,
    /// Start month as `YYYY-MM`; written as `""` when absent.
    pub start_period: Option<String>,
    pub reaudits: Vec<ReAudit>,
    pub notes: Vec<Note>,
    pub extra: Map<String, Value>,
    origin: Origin,
}

/// A follow-up review date in an audit's history.
#[derive(Debug, Clone, PartialEq)]
pub struct ReAudit {
    pub period: String,
    pub extra: Map<String, Value>,
    origin: Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub author: String,
    pub text: String,
    pub period: String,
    pub extra: Map<String, Value>,
    origin: Origin,
}

/// The stored value an item was read from. Never part of equality.
#[derive(Debug, Clone, Default)]
struct Origin(Option<Value>);

impl PartialEq for Origin {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

const RECORD_FIELDS: &[&str] = &["id", "year", "name", "startYYYYMM", "reaudits", "notes"];
const REAUDIT_FIELDS: &[&str] = &["yyyymm"];
const NOTE_FIELDS: &[&str] = &["user", "text", "yyyymm"];

/// Wire encoding shared by records and their history entries.
trait Wire: Sized {
    /// Lenient read of any JSON value. Does not set `origin`.
    fn decode(value: &Value) -> Self;

    /// Canonical field map for the current values.
    fn fields(&self) -> Map<String, Value>;

    fn origin(&self) -> Option<&Value>;

    fn read(value: Value) -> Self;

    /// Current values laid over the stored shape: keys whose value is the
    /// same as when read keep their stored form (or stay absent).
    fn to_wire(&self) -> Value {
        let current = self.fields();
        let Some(origin) = self.origin() else {
            return Value::Object(current);
        };
        let baseline = Self::decode(origin).fields();

        match origin {
            Value::Object(stored) => {
                let mut out = stored.clone();
                let keys: Vec<&String> = baseline.keys().chain(current.keys()).collect();
                for key in keys {
                    let before = baseline.get(key);
                    let after = current.get(key);
                    if before == after {
                        continue;
                    }
                    match after {
                        Some(value) => {
                            out.insert(key.clone(), value.clone());
                        }
                        None => {
                            out.remove(key);
                        }
                    }
                }
                Value::Object(out)
            }
            stored if baseline == current => stored.clone(),
            _ => Value::Object(current),
        }
    }
}

impl Wire for AuditRecord {
    fn decode(value: &Value) -> Self {
        let start = text_field(value, "startYYYYMM");
        Self {
            id: text_field(value, "id"),
            year: text_field(value, "year"),
            name: text_field(value, "name"),
            start_period: if start.is_empty() { None } else { Some(start) },
            reaudits: list_field(value, "reaudits"),
            notes: list_field(value, "notes"),
            extra: extra_fields(value, RECORD_FIELDS),
            origin: Origin::default(),
        }
    }

    fn fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("year".into(), Value::String(self.year.clone()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert(
            "startYYYYMM".into(),
            Value::String(self.start_period.clone().unwrap_or_default()),
        );
        map.insert(
            "reaudits".into(),
            Value::Array(self.reaudits.iter().map(Wire::to_wire).collect()),
        );
        map.insert(
            "notes".into(),
            Value::Array(self.notes.iter().map(Wire::to_wire).collect()),
        );
        map.extend(self.extra.clone());
        map
    }

    fn origin(&self) -> Option<&Value> {
        self.origin.0.as_ref()
    }

    fn read(value: Value) -> Self {
        Self {
            origin: Origin(Some(value.clone())),
            ..Self::decode(&value)
        }
    }
}

impl Wire for ReAudit {
    fn decode(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self {
                period: text_field(value, "yyyymm"),
                extra: extra_fields(value, REAUDIT_FIELDS),
                origin: Origin::default(),
            },
            bare => Self {
                period: scalar_text(Some(bare)),
                extra: Map::new(),
                origin: Origin::default(),
            },
        }
    }

    fn fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("yyyymm".into(), Value::String(self.period.clone()));
        map.extend(self.extra.clone());
        map
    }

    fn origin(&self) -> Option<&Value> {
        self.origin.0.as_ref()
    }

    fn read(value: Value) -> Self {
        Self {
            origin: Origin(Some(value.clone())),
            ..Self::decode(&value)
        }
    }
}

impl Wire for Note {
    fn decode(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self {
                author: text_field(value, "user"),
                text: text_field(value, "text"),
                period: text_field(value, "yyyymm"),
                extra: extra_fields(value, NOTE_FIELDS),
                origin: Origin::default(),
            },
            bare => Self {
                author: String::new(),
                text: scalar_text(Some(bare)),
                period: String::new(),
                extra: Map::new(),
                origin: Origin::default(),
            },
        }
    }

    fn fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("user".into(), Value::String(self.author.clone()));
        map.insert("text".into(), Value::String(self.text.clone()));
        map.insert("yyyymm".into(), Value::String(self.period.clone()));
        map.extend(self.extra.clone());
        map
    }

    fn origin(&self) -> Option<&Value> {
        self.origin.0.as_ref()
    }

    fn read(value: Value) -> Self {
        Self {
            origin: Origin(Some(value.clone())),
            ..Self::decode(&value)
        }
    }
}

macro_rules! wire_serde {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_wire().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Value::deserialize(deserializer).map(<$ty as Wire>::read)
            }
        }
    )*};
}

wire_serde!(AuditRecord, ReAudit, Note);

impl AuditRecord {
    /// Create a record with a freshly generated id and empty histories.
    pub fn new(year: &str, name: &str, start_period: Option<String>) -> Self {
        Self {
            id: generate_id(),
            year: year.to_string(),
            name: name.to_string(),
            start_period,
            reaudits: Vec::new(),
            notes: Vec::new(),
            extra: Map::new(),
            origin: Origin::default(),
        }
    }

    pub fn push_reaudit(&mut self, period: &str) {
        self.reaudits.push(ReAudit::new(period));
    }

    pub fn push_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn start_label(&self) -> String {
        month_label(self.start_period.as_deref().unwrap_or(""))
    }
}

impl ReAudit {
    pub fn new(period: &str) -> Self {
        Self {
            period: period.to_string(),
            extra: Map::new(),
            origin: Origin::default(),
        }
    }

    pub fn label(&self) -> String {
        month_label(&self.period)
    }
}

impl Note {
    pub fn new(author: &str, text: &str, period: &str) -> Self {
        Self {
            author: author.to_string(),
            text: text.to_string(),
            period: period.to_string(),
            extra: Map::new(),
            origin: Origin::default(),
        }
    }

    /// `author (MM/YYYY): text`
    pub fn display(&self) -> String {
        format!("{} ({}): {}", self.author, month_label(&self.period), self.text)
    }
}

// ========== Input ==========

/// Form input for a new audit.
#[derive(Debug, Clone, Default)]
pub struct NewAudit {
    pub name: String,
    pub year: String,
    pub start_period: Option<String>,
    pub first_reaudit: Option<String>,
}

impl NewAudit {
    /// Validate and build the record to append.
    pub fn into_record(self) -> Result<AuditRecord, ValidationError> {
        let name = self.name.trim();
        let year = self.year.trim();
        if name.is_empty() || year.is_empty() {
            return Err(ValidationError::MissingNameOrYear);
        }
        if !YEAR_RE.is_match(year) {
            return Err(ValidationError::InvalidYearOrName);
        }

        let start = normalize_optional_period(self.start_period.as_deref())
            .map_err(|_| ValidationError::InvalidStartPeriod)?;
        let first_reaudit = normalize_optional_period(self.first_reaudit.as_deref())?;

        let mut record = AuditRecord::new(year, name, start);
        if let Some(period) = first_reaudit {
            record.push_reaudit(&period);
        }
        Ok(record)
    }
}

/// Replacement values for an audit's scalar fields.
#[derive(Debug, Clone, Default)]
pub struct AuditEdit {
    pub year: String,
    pub name: String,
    pub start_period: Option<String>,
}

impl AuditEdit {
    pub fn from_record(record: &AuditRecord) -> Self {
        Self {
            year: record.year.clone(),
            name: record.name.clone(),
            start_period: record.start_period.clone(),
        }
    }

    /// Trim and check the edit, returning the normalized values.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let year = self.year.trim().to_string();
        let name = self.name.trim().to_string();
        if !YEAR_RE.is_match(&year) || name.is_empty() {
            return Err(ValidationError::InvalidYearOrName);
        }
        let start_period = normalize_optional_period(self.start_period.as_deref())
            .map_err(|_| ValidationError::InvalidStartPeriod)?;
        Ok(Self {
            year,
            name,
            start_period,
        })
    }

    pub fn apply(self, record: &mut AuditRecord) {
        record.year = self.year;
        record.name = self.name;
        record.start_period = self.start_period;
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub author: String,
    pub text: String,
    pub period: Option<String>,
}

impl NoteInput {
    pub fn into_note(self) -> Result<Note, ValidationError> {
        let author = self.author.trim();
        let text = self.text.trim();
        if author.is_empty() || text.is_empty() {
            return Err(ValidationError::MissingNoteFields);
        }
        let period = normalize_optional_period(self.period.as_deref())?.unwrap_or_default();
        Ok(Note::new(author, text, &period))
    }
}

/// Validate a required `YYYY-MM` value.
pub fn validate_period(raw: &str) -> Result<String, ValidationError> {
    normalize_optional_period(Some(raw))?.ok_or(ValidationError::MissingPeriod)
}

pub fn validate_note_text(raw: &str) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyNoteText);
    }
    Ok(text.to_string())
}

fn normalize_optional_period(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if !PERIOD_RE.is_match(value) {
        return Err(ValidationError::InvalidPeriod(value.to_string()));
    }
    Ok(Some(value.to_string()))
}

// ========== Helpers ==========

/// Generate a record id: `<unix-millis>_<random hex>`.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}", millis, &random[..13])
}

/// Render `YYYY-MM` as `MM/YYYY`; anything else renders empty.
pub fn month_label(period: &str) -> String {
    match period.split('-').collect::<Vec<_>>().as_slice() {
        [year, month] => format!("{}/{}", month, year),
        _ => String::new(),
    }
}

/// The current local month as `YYYY-MM`.
pub fn current_period() -> String {
    Local::now().format("%Y-%m").to_string()
}

/// Text of a scalar; `null`, missing, arrays and objects read as empty.
fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn text_field(value: &Value, key: &str) -> String {
    scalar_text(value.get(key))
}

/// Anything other than an array reads as no entries.
fn list_field<T: Wire>(value: &Value, key: &str) -> Vec<T> {
    match value.get(key) {
        Some(Value::Array(items)) => items.iter().cloned().map(T::read).collect(),
        _ => Vec::new(),
    }
}

fn extra_fields(value: &Value, known: &[&str]) -> Map<String, Value> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, v)| (key.clone(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let mut record = AuditRecord::new("2024", "Hand hygiene", Some("2024-03".to_string()));
        record.push_reaudit("2024-09");
        record.push_note(Note::new("Dr. Salem", "Data collected", "2024-04"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["startYYYYMM"], json!("2024-03"));
        assert_eq!(value["reaudits"], json!([{"yyyymm": "2024-09"}]));
        assert_eq!(
            value["notes"],
            json!([{"user": "Dr. Salem", "text": "Data collected", "yyyymm": "2024-04"}])
        );
    }

    #[test]
    fn test_absent_start_is_empty_string() {
        let record = AuditRecord::new("2025", "Falls", None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["startYYYYMM"], json!(""));

        let back: AuditRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.start_period, None);
    }

    #[test]
    fn test_lenient_read() {
        let record: AuditRecord = serde_json::from_value(json!({
            "id": 1,
            "year": 2024,
            "name": "Consent forms",
            "reaudits": null,
            "sheetRow": 7
        }))
        .unwrap();

        assert_eq!(record.id, "1");
        assert_eq!(record.year, "2024");
        assert!(record.reaudits.is_empty());
        assert!(record.notes.is_empty());
        assert_eq!(record.extra.get("sheetRow"), Some(&json!(7)));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sheetRow"], json!(7));
        assert_eq!(value["year"], json!(2024));
        assert_eq!(value["reaudits"], Value::Null);
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_changed_fields_overlay_stored_shape() {
        let mut record: AuditRecord = serde_json::from_value(json!({
            "id": "a",
            "year": 2024,
            "name": "Falls",
            "reaudits": ["2024-05"]
        }))
        .unwrap();

        record.name = "Falls (inpatient)".to_string();
        record.push_reaudit("2024-11");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["year"], json!(2024));
        assert_eq!(value["name"], json!("Falls (inpatient)"));
        assert_eq!(value["reaudits"], json!(["2024-05", {"yyyymm": "2024-11"}]));
        assert!(value.get("startYYYYMM").is_none());

        record.year = "2025".to_string();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["year"], json!("2025"));
    }

    #[test]
    fn test_generate_id() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        let (millis, random) = a.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), 13);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2024-03"), "03/2024");
        assert_eq!(month_label(""), "");
        assert_eq!(month_label("2024"), "");
        assert_eq!(month_label("2024-03-01"), "");
    }

    #[test]
    fn test_new_audit_validation() {
        let missing = NewAudit {
            name: "  ".to_string(),
            year: "2024".to_string(),
            ..Default::default()
        };
        assert_eq!(missing.into_record(), Err(ValidationError::MissingNameOrYear));

        let bad_start = NewAudit {
            name: "Sepsis bundle".to_string(),
            year: "2024".to_string(),
            start_period: Some("03/2024".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_start.into_record(), Err(ValidationError::InvalidStartPeriod));

        let ok = NewAudit {
            name: " Sepsis bundle ".to_string(),
            year: "2024".to_string(),
            start_period: Some("".to_string()),
            first_reaudit: Some("2025-01".to_string()),
        }
        .into_record()
        .unwrap();
        assert_eq!(ok.name, "Sepsis bundle");
        assert_eq!(ok.start_period, None);
        assert_eq!(ok.reaudits, vec![ReAudit::new("2025-01")]);
    }

    #[test]
    fn test_edit_validation() {
        let edit = AuditEdit {
            year: "24".to_string(),
            name: "VTE".to_string(),
            start_period: None,
        };
        assert_eq!(edit.validate().unwrap_err(), ValidationError::InvalidYearOrName);

        let edit = AuditEdit {
            year: "2024".to_string(),
            name: "VTE".to_string(),
            start_period: Some("2024-13".to_string()),
        };
        assert_eq!(edit.validate().unwrap_err(), ValidationError::InvalidStartPeriod);
    }

    #[test]
    fn test_note_validation() {
        let missing = NoteInput {
            author: "".to_string(),
            text: "hello".to_string(),
            period: None,
        };
        assert_eq!(missing.into_note(), Err(ValidationError::MissingNoteFields));

        let note = NoteInput {
            author: "Nurse Aisha".to_string(),
            text: "Awaiting sign-off".to_string(),
            period: None,
        }
        .into_note()
        .unwrap();
        assert_eq!(note.period, "");
        assert_eq!(note.display(), "Nurse Aisha (): Awaiting sign-off");
    }

    #[test]
    fn test_validate_period() {
        assert_eq!(validate_period("2024-06").unwrap(), "2024-06");
        assert_eq!(validate_period(" "), Err(ValidationError::MissingPeriod));
        assert!(matches!(
            validate_period("June"),
            Err(ValidationError::InvalidPeriod(_))
        ));
    }
}
