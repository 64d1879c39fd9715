// sqlite_backend.rs — Service and authority behaviour on a file-backed database.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tempfile::tempdir;

use tr_store_sqlite::{SqliteDatabase, SqliteTypoStore};
use tr_typo::{
    ActivitySink, EventDispatcher, NewTypo, PageRequest, SortDirection, SortKey, TypoActivity,
    TypoError, TypoEvent, TypoReport, TypoService, TypoStatus, TypoStore,
};
use tr_workspace::{Role, TokenAuthority, WorkspaceError};

/// Counts status changes that actually happened.
#[derive(Clone, Default)]
struct AppliedCounter(Arc<AtomicUsize>);

impl ActivitySink for AppliedCounter {
    fn send(&self, activity: &TypoActivity) -> Result<(), TypoError> {
        if matches!(activity, TypoActivity::StatusChanged { .. }) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn open(dir: &std::path::Path) -> SqliteDatabase {
    SqliteDatabase::open(&dir.join("tr.sqlite3"), Duration::from_secs(2)).unwrap()
}

fn seed(store: &SqliteTypoStore, workspace_id: i64, statuses: &[TypoStatus]) -> Vec<i64> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mut new = NewTypo::reported(
                workspace_id,
                TypoReport::new(format!("https://site.example/{i}"), format!("teh {i}")),
            );
            new.status = *status;
            new.created_at = Utc::now() - chrono::Duration::minutes(60 - i as i64);
            store.insert(new).unwrap().id
        })
        .collect()
}

#[test]
fn paging_and_counts_match_seeded_rows() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    let store = Arc::new(db.typo_store());
    let ids = seed(
        &store,
        101,
        &[
            TypoStatus::Reported,
            TypoStatus::Reported,
            TypoStatus::InProgress,
            TypoStatus::Resolved,
            TypoStatus::Canceled,
            TypoStatus::Reported,
            TypoStatus::InProgress,
        ],
    );
    seed(&store, 102, &[TypoStatus::Resolved]);
    let svc = TypoService::new(store);

    let page = svc
        .get_typo_page(
            &PageRequest::of(1, 3).sorted_by(SortKey::CreatedAt, SortDirection::Asc),
            101,
        )
        .unwrap();
    assert_eq!(page.total_elements, 7);
    assert_eq!(page.total_pages(), 3);
    let page_ids: Vec<_> = page.content.iter().map(|t| t.id).collect();
    assert_eq!(page_ids, ids[3..6].to_vec());

    let counts = svc.get_count_typo_by_status_for_workspace_id(101).unwrap();
    assert_eq!(
        counts,
        vec![
            (TypoStatus::Reported, 3),
            (TypoStatus::InProgress, 2),
            (TypoStatus::Resolved, 1),
            (TypoStatus::Canceled, 1),
        ]
    );
    assert!(svc.get_count_typo_by_status_for_workspace_id(103).unwrap().is_empty());

    let last = svc.get_last_typo_by_workspace_id(101).unwrap().unwrap();
    assert_eq!(last.id, ids[0]);
}

#[test]
fn page_count_and_rows_come_from_one_snapshot() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    let store = Arc::new(db.typo_store());
    seed(&store, 7, &[TypoStatus::Reported, TypoStatus::Reported]);
    let svc = TypoService::new(store);

    // Stands in for another `tr` process with an open, uncommitted write.
    let mut writer = rusqlite::Connection::open(dir.path().join("tr.sqlite3")).unwrap();
    let tx = writer
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .unwrap();
    tx.execute(
        "INSERT INTO typos (workspace_id, status, page_url, report_text, created_at_us, updated_at_us) \
         VALUES (7, 'REPORTED', 'https://site.example/x', 'pending', 0, 0)",
        [],
    )
    .unwrap();

    let page = svc.get_typo_page(&PageRequest::of(0, 10), 7).unwrap();
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.number_of_elements(), 2);

    tx.commit().unwrap();
    let page = svc.get_typo_page(&PageRequest::of(0, 10), 7).unwrap();
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.number_of_elements(), 3);
}

#[test]
fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let id = {
        let svc = TypoService::new(Arc::new(open(dir.path()).typo_store()));
        let typo = svc
            .add_typo_report(TypoReport::new("https://site.example/a", "recieve"), 5)
            .unwrap();
        svc.update_typo_status(typo.id, Some(TypoEvent::Start)).unwrap();
        typo.id
    };

    let svc = TypoService::new(Arc::new(open(dir.path()).typo_store()));
    let typo = svc.get_typo_by_id(id, 5).unwrap().unwrap();
    assert_eq!(typo.status, TypoStatus::InProgress);
    assert!(svc.get_typo_by_id(id, 6).unwrap().is_none());
}

#[test]
fn concurrent_starts_apply_once() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    let counter = AppliedCounter::default();
    let svc = Arc::new(
        TypoService::new(Arc::new(db.typo_store()))
            .with_dispatcher(EventDispatcher::new().with_sink(Box::new(counter.clone()))),
    );
    let typo = svc
        .add_typo_report(TypoReport::new("https://site.example/b", "seperate"), 1)
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = Arc::clone(&svc);
            let id = typo.id;
            thread::spawn(move || svc.update_typo_status(id, Some(TypoEvent::Start)).unwrap())
        })
        .collect();
    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.status, TypoStatus::InProgress);
    }

    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn token_rotation_is_admin_only_and_serialized() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    let authority = Arc::new(TokenAuthority::new(Arc::new(db.settings_store())));
    let original = authority.provision(101).unwrap();

    let denied = authority.regenerate_token(101, Role::Member);
    assert!(matches!(denied, Err(WorkspaceError::Unauthorized { .. })));
    assert_eq!(authority.get_token_view(101).unwrap(), Some(original));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let authority = Arc::clone(&authority);
            thread::spawn(move || {
                authority
                    .regenerate_token(101, Role::Admin)
                    .unwrap()
                    .unwrap()
                    .api_access_token
            })
        })
        .collect();
    let issued: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let distinct: HashSet<_> = issued.iter().collect();
    assert_eq!(distinct.len(), issued.len());

    let current = authority.get_token_view(101).unwrap().unwrap();
    assert!(issued.contains(&current.api_access_token));
    assert_eq!(
        authority.authenticate_basic(&current.basic_credentials()).unwrap(),
        Some(101)
    );
    assert_eq!(
        authority.authenticate_basic(&original.basic_credentials()).unwrap(),
        None
    );
}
