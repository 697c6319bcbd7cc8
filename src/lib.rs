//! ClinAudit - Clinical audit register
//! Records audits with their re-audit history and notes, kept either in a
//! local database or behind a shared `{action, payload}` endpoint.

pub mod engine;
