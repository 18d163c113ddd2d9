use crate::db::*;
use crate::types::ExportMode;
use tempfile::NamedTempFile;

async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

#[tokio::test]
async fn test_insert_and_find_export() {
    let (db, _file) = test_db().await;
    let hash = "a".repeat(64);

    assert!(db.find_export_by_hash(&hash).await.unwrap().is_none());

    db.insert_export(&hash, "x.zip", ExportMode::SingleFile)
        .await
        .unwrap();

    let found = db.find_export_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.file_name, "x.zip");
    assert_eq!(found.mode, "single_file");
}

#[tokio::test]
async fn test_duplicate_hashes_resolve_to_oldest() {
    let (db, _file) = test_db().await;
    let hash = "b".repeat(64);

    db.insert_export(&hash, "first.zip", ExportMode::ByProvider)
        .await
        .unwrap();
    db.insert_export(&hash, "second.zip", ExportMode::ByProvider)
        .await
        .unwrap();

    let found = db.find_export_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.file_name, "first.zip");
}

#[tokio::test]
async fn test_delete_exports_before_returns_deleted_records() {
    let (db, _file) = test_db().await;
    let old_id = db
        .insert_export(&"c".repeat(64), "old.zip", ExportMode::RawBundle)
        .await
        .unwrap();
    db.insert_export(&"d".repeat(64), "new.zip", ExportMode::RawBundle)
        .await
        .unwrap();

    sqlx::query("UPDATE export_artifacts SET created_at = 10 WHERE id = ?")
        .bind(old_id)
        .execute(db.pool())
        .await
        .unwrap();

    let deleted = db.delete_exports_before(100).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].file_name, "old.zip");
    assert!(db.find_export_by_hash(&"c".repeat(64)).await.unwrap().is_none());
    assert!(db.find_export_by_hash(&"d".repeat(64)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_single_export() {
    let (db, _file) = test_db().await;
    let hash = "e".repeat(64);
    let id = db
        .insert_export(&hash, "gone.zip", ExportMode::SingleFile)
        .await
        .unwrap();

    db.delete_export(id).await.unwrap();
    assert!(db.find_export_by_hash(&hash).await.unwrap().is_none());
}
