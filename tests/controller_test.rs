use clinaudit_lib::engine::config::{AppMode, SyncMode};
use clinaudit_lib::engine::controller::{Controller, ControllerError};
use clinaudit_lib::engine::model::{AuditEdit, NewAudit, NoteInput, ValidationError};
use clinaudit_lib::engine::store::{AuditStore, LocalStore};
use std::path::Path;

const KEY: &str = "audits_all_v2";

fn open(db_path: &Path) -> LocalStore {
    LocalStore::open(db_path, KEY).unwrap()
}

async fn controller(db_path: &Path) -> Controller {
    let mut controller = Controller::new(Box::new(open(db_path)));
    controller.refresh().await.unwrap();
    controller
}

fn new_audit(name: &str, year: &str) -> NewAudit {
    NewAudit {
        name: name.to_string(),
        year: year.to_string(),
        ..Default::default()
    }
}

fn note(author: &str, text: &str) -> NoteInput {
    NoteInput {
        author: author.to_string(),
        text: text.to_string(),
        period: Some("2024-03".to_string()),
    }
}

#[tokio::test]
async fn test_add_audit_persists_whole_collection() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;

    let first = controller
        .add_audit(NewAudit {
            name: "  Sepsis six  ".to_string(),
            year: "2024".to_string(),
            start_period: Some("2024-01".to_string()),
            first_reaudit: Some("2024-07".to_string()),
        })
        .await
        .unwrap();
    controller.add_audit(new_audit("Falls", "2025")).await.unwrap();

    assert_eq!(first.name, "Sepsis six");
    assert_eq!(first.start_period.as_deref(), Some("2024-01"));
    assert_eq!(first.reaudits.len(), 1);

    let stored = open(&db_path).load().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, first.id);
    assert_eq!(stored[1].name, "Falls");
}

#[tokio::test]
async fn test_invalid_input_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;

    let err = controller.add_audit(new_audit("", "2024")).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Validation(ValidationError::MissingNameOrYear)
    ));

    let err = controller.add_audit(new_audit("Falls", "24")).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Validation(ValidationError::InvalidYearOrName)
    ));

    assert!(controller.state().items.is_empty());
    assert!(open(&db_path).raw().await.unwrap().is_none());
}

#[tokio::test]
async fn test_reaudits_and_notes_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;
    let id = controller
        .add_audit(new_audit("Hand hygiene", "2024"))
        .await
        .unwrap()
        .id;

    controller.add_reaudit(&id, "2024-09").await.unwrap();
    controller.add_reaudit(&id, "2024-03").await.unwrap();
    let err = controller.add_reaudit(&id, "2024-13").await.unwrap_err();
    assert!(matches!(err, ControllerError::Validation(_)));

    controller.add_note(&id, note("Ali", "first")).await.unwrap();
    controller.add_note(&id, note("Huda", "second")).await.unwrap();
    controller.add_note(&id, note("Sara", "third")).await.unwrap();

    controller.edit_note(&id, 1, "  second, revised ").await.unwrap();
    let record = controller.delete_note(&id, 0).await.unwrap();

    let periods: Vec<&str> = record.reaudits.iter().map(|r| r.period.as_str()).collect();
    assert_eq!(periods, vec!["2024-09", "2024-03"]);
    let texts: Vec<&str> = record.notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["second, revised", "third"]);
    assert_eq!(record.notes[0].author, "Huda");

    let stored = open(&db_path).load().await.unwrap();
    assert_eq!(stored[0], record);
}

#[tokio::test]
async fn test_unknown_targets_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;
    let id = controller.add_audit(new_audit("Falls", "2024")).await.unwrap().id;

    let err = controller.add_reaudit("missing", "2024-05").await.unwrap_err();
    assert!(matches!(err, ControllerError::AuditNotFound(_)));

    let err = controller.edit_note(&id, 0, "text").await.unwrap_err();
    assert!(matches!(err, ControllerError::NoteNotFound { number: 1, .. }));

    let err = controller.delete_note(&id, 3).await.unwrap_err();
    assert!(matches!(err, ControllerError::NoteNotFound { number: 4, .. }));
}

#[tokio::test]
async fn test_edit_and_delete_audit() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;
    let keep = controller.add_audit(new_audit("Falls", "2024")).await.unwrap();
    let doomed = controller.add_audit(new_audit("Consent", "2024")).await.unwrap();

    let mut edit = AuditEdit::from_record(&keep);
    edit.year = "2025".to_string();
    edit.start_period = Some("2025-02".to_string());
    let edited = controller.edit_audit(&keep.id, edit).await.unwrap();
    assert_eq!(edited.year, "2025");
    assert_eq!(edited.id, keep.id);

    let removed = controller.delete_audit(&doomed.id).await.unwrap();
    assert_eq!(removed.id, doomed.id);
    assert!(matches!(
        controller.delete_audit(&doomed.id).await,
        Err(ControllerError::AuditNotFound(_))
    ));

    let stored = open(&db_path).load().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].year, "2025");
    assert_eq!(stored[0].start_period.as_deref(), Some("2025-02"));
}

#[tokio::test]
async fn test_view_mode_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let id = controller(&db_path)
        .await
        .add_audit(new_audit("Falls", "2024"))
        .await
        .unwrap()
        .id;

    let mut viewer = Controller::new(Box::new(open(&db_path))).with_mode(AppMode::View);
    viewer.refresh().await.unwrap();
    assert_eq!(viewer.filtered().len(), 1);
    assert!(matches!(viewer.ensure_writable(), Err(ControllerError::ReadOnly)));

    assert!(matches!(
        viewer.add_audit(new_audit("Consent", "2024")).await,
        Err(ControllerError::ReadOnly)
    ));
    assert!(matches!(
        viewer.delete_audit(&id).await,
        Err(ControllerError::ReadOnly)
    ));
    assert_eq!(open(&db_path).load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_keyed_sync_leaves_other_records_alone() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");

    let mut alice = Controller::new(Box::new(open(&db_path))).with_sync_mode(SyncMode::Keyed);
    let mut bob = Controller::new(Box::new(open(&db_path))).with_sync_mode(SyncMode::Keyed);
    alice.refresh().await.unwrap();
    bob.refresh().await.unwrap();

    // Both start from an empty snapshot; keyed writes must not clobber each other.
    let a = alice.add_audit(new_audit("Falls", "2024")).await.unwrap();
    let b = bob.add_audit(new_audit("Consent", "2024")).await.unwrap();

    let stored = open(&db_path).load().await.unwrap();
    let ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);

    alice.delete_audit(&a.id).await.unwrap();
    let stored = open(&db_path).load().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, b.id);
}

#[tokio::test]
async fn test_refresh_and_filter() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    let mut controller = controller(&db_path).await;
    controller.add_audit(new_audit("Falls", "2024")).await.unwrap();
    controller.add_audit(new_audit("Consent", "2025")).await.unwrap();
    controller.add_audit(new_audit("Sepsis", "2024")).await.unwrap();

    controller.set_filter(Some("2024"));
    let names: Vec<&str> = controller.filtered().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Falls", "Sepsis"]);

    controller.set_filter(None);
    assert_eq!(controller.filtered().len(), 3);
}

#[tokio::test]
async fn test_add_keeps_records_of_unexpected_shape() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinaudit.db");
    open(&db_path)
        .write_raw(
            r#"[{"id":"a","year":"2024","name":"Falls"},{"id":"b","year":2024,"name":"Consent","reaudits":["2024-05"]}]"#
                .to_string(),
        )
        .await
        .unwrap();

    let mut controller = controller(&db_path).await;
    assert_eq!(controller.state().items.len(), 2);
    controller.add_audit(new_audit("New", "2025")).await.unwrap();

    let stored = open(&db_path).load().await.unwrap();
    let ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(&ids[..2], &["a", "b"]);
    assert_eq!(stored[1].reaudits[0].period, "2024-05");
}
