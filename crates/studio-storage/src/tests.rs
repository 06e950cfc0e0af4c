#[cfg(test)]
mod tests {
    use crate::Database;
    use std::sync::Arc;
    use studio_core::account::AccountStore;
    use studio_core::catalog::BackendId;
    use studio_core::config::AppConfig;
    use studio_core::error::{AccountError, StorageError};
    use studio_core::history::GalleryItem;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            working_dir: tmp.path().to_path_buf(),
            data_dir: "data".into(),
            ..Default::default()
        };
        let db = Database::open(&config).await.unwrap();
        db.run_migrations().await.unwrap();
        (db, tmp)
    }

    #[tokio::test]
    async fn test_account_ensure_is_idempotent() {
        let (db, _tmp) = test_db().await;

        assert_eq!(db.accounts().ensure("alice", 10).await.unwrap(), 10);
        db.accounts().deduct("alice", 3).await.unwrap();

        // Second ensure must not reset the balance
        assert_eq!(db.accounts().ensure("alice", 10).await.unwrap(), 7);
        assert_eq!(db.accounts().credits("alice").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_migrations_rerun() {
        let (db, _tmp) = test_db().await;
        db.accounts().ensure("alice", 4).await.unwrap();
        db.run_migrations().await.unwrap();
        assert_eq!(db.accounts().credits("alice").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_deduct_and_grant() {
        let (db, _tmp) = test_db().await;
        db.accounts().ensure("bob", 2).await.unwrap();

        let err = db.accounts().deduct("bob", 3).await.unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientCredits {
                required: 3,
                available: 2
            }
        );
        assert_eq!(db.accounts().credits("bob").await.unwrap(), 2);

        assert_eq!(db.accounts().grant("bob", 5).await.unwrap(), 7);
        db.accounts().deduct("bob", 3).await.unwrap();
        assert_eq!(db.accounts().credits("bob").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_out_of_range_amounts_never_change_balance() {
        let (db, _tmp) = test_db().await;
        db.accounts().ensure("alice", 10).await.unwrap();

        assert!(matches!(
            db.accounts().grant("alice", u64::MAX).await,
            Err(StorageError::Invalid(_))
        ));
        assert!(matches!(
            db.accounts().grant("alice", i64::MAX as u64).await,
            Err(StorageError::Invalid(_))
        ));
        assert_eq!(db.accounts().credits("alice").await.unwrap(), 10);

        let err = db.accounts().deduct("alice", u64::MAX).await.unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientCredits {
                required: u64::MAX,
                available: 10
            }
        );
        assert_eq!(db.accounts().credits("alice").await.unwrap(), 10);

        assert!(matches!(
            db.accounts().ensure("zed", u64::MAX).await,
            Err(StorageError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let (db, _tmp) = test_db().await;

        assert!(matches!(
            db.accounts().credits("ghost").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            db.accounts().grant("ghost", 1).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            db.accounts().deduct("ghost", 1).await,
            Err(AccountError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_account_store_never_overdraws() {
        let (db, _tmp) = test_db().await;
        db.accounts().ensure("carol", 5).await.unwrap();
        let store = Arc::new(db.account_store("carol"));
        assert_eq!(store.user_id(), "carol");

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.deduct_credits(1).await }));
        }

        let mut succeeded = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(store.get_credits().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_gallery_append_and_list() {
        let (db, _tmp) = test_db().await;
        db.accounts().ensure("dana", 10).await.unwrap();

        for i in 0..4 {
            let item = GalleryItem::new(
                "dana".into(),
                Some("session-1".into()),
                BackendId::Seedream,
                format!("prompt {i}"),
                format!("https://cdn.example/{i}.png").into(),
                1,
            );
            db.gallery().append(&item).await.unwrap();
        }

        assert_eq!(db.gallery().count("dana").await.unwrap(), 4);

        let recent = db.gallery().list("dana", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].prompt, "prompt 3");
        assert_eq!(recent[1].prompt, "prompt 2");
        assert_eq!(recent[0].backend, BackendId::Seedream);
        assert_eq!(recent[0].session_id.as_deref(), Some("session-1"));
        assert_eq!(recent[0].result.as_str(), "https://cdn.example/3.png");

        assert!(db.gallery().list("nobody", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_crud() {
        let (db, _tmp) = test_db().await;

        db.snapshots().save("s1", "erin", r#"{"v":1}"#).await.unwrap();
        db.snapshots().save("s1", "erin", r#"{"v":2}"#).await.unwrap();
        db.snapshots().save("s2", "erin", r#"{"v":3}"#).await.unwrap();

        assert_eq!(db.snapshots().load("s1", "erin").await.unwrap(), r#"{"v":2}"#);
        assert_eq!(db.snapshots().list("erin").await.unwrap().len(), 2);

        db.snapshots().delete("s1", "erin").await.unwrap();
        assert!(matches!(
            db.snapshots().load("s1", "erin").await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(db.snapshots().list("erin").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_are_scoped_to_their_owner() {
        let (db, _tmp) = test_db().await;
        db.snapshots().save("s1", "alice", r#"{"v":1}"#).await.unwrap();

        assert!(matches!(
            db.snapshots().load("s1", "bob").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(db.snapshots().list("bob").await.unwrap().is_empty());

        db.snapshots().delete("s1", "bob").await.unwrap();
        assert_eq!(db.snapshots().load("s1", "alice").await.unwrap(), r#"{"v":1}"#);

        // Another user's save under the same id must not take it over
        db.snapshots().save("s1", "bob", r#"{"v":2}"#).await.unwrap();
        assert_eq!(db.snapshots().load("s1", "alice").await.unwrap(), r#"{"v":1}"#);
    }
}
