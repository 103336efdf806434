//! End-to-end lifecycle scenarios against an in-memory database

use bridge_traits::time::ManualClock;
use core_library::db::create_test_pool;
use core_library::{FontId, LibraryError, NewFont};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, FontEvent, MaintenanceEvent};
use core_service::{CoreError, FontService};
use std::sync::Arc;
use std::time::Duration;

const START: i64 = 1_700_000_000;
const WEEK: i64 = 604_800;

async fn service() -> (FontService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at(START));
    let config = CoreConfig::builder()
        .in_memory()
        .clock(clock.clone())
        .build()
        .unwrap();

    (FontService::bootstrap(config).await.unwrap(), clock)
}

fn preview() -> (Vec<String>, Vec<Vec<u8>>) {
    (
        vec!["https://img.example/a.png".to_string()],
        vec![vec![0x89, 0x50, 0x4e, 0x47]],
    )
}

async fn ingest(service: &FontService, title: &str, url: &str) -> core_library::IngestOutcome {
    let (urls, blobs) = preview();
    service
        .ingest(&NewFont::new(title, url), &urls, &blobs)
        .await
        .unwrap()
}

fn ids(fonts: &[core_library::Font]) -> Vec<FontId> {
    fonts.iter().map(|font| font.id).collect()
}

#[tokio::test]
async fn test_same_title_different_url_stages_previous_favorite() {
    let (service, _clock) = service().await;
    let categories = service.categories();

    // Insert A
    let a = ingest(&service, "Roboto", "u1").await.font;
    assert_eq!(a.category_id, categories.favorites);

    // Insert B with the same title
    let b = ingest(&service, "Roboto", "u2").await;
    assert!(b.liked);
    assert_eq!(ids(&service.pending_recycling().await), vec![a.id]);

    // Pending only; A has not moved yet
    let stored_a = service.font(a.id).await.unwrap().unwrap();
    assert_eq!(stored_a.category_id, categories.favorites);
    assert_eq!(stored_a.deletion_timestamp, None);

    let moved = service.attempt_recycling().await.unwrap();
    assert_eq!(ids(&moved), vec![a.id]);

    let stored_a = service.font(a.id).await.unwrap().unwrap();
    assert_eq!(stored_a.category_id, categories.recycle_bin);
    assert_eq!(stored_a.deletion_timestamp, Some(START + WEEK));

    assert_eq!(ids(&service.watch_favorites().borrow()), vec![b.font.id]);
    assert_eq!(ids(&service.watch_recycle_bin().borrow()), vec![a.id]);
}

#[tokio::test]
async fn test_replacing_by_url_leaves_no_duplicate() {
    let (service, _clock) = service().await;

    let a = ingest(&service, "Roboto", "u1").await.font;
    let b = ingest(&service, "Roboto", "u2").await.font;
    service.attempt_recycling().await.unwrap();

    // C reuses A's URL
    let c = ingest(&service, "Roboto Flex", "u1").await.font;
    assert_eq!(c.category_id, service.categories().favorites);
    assert!(service.font(a.id).await.unwrap().is_none());

    let favorites = service.favorites().await.unwrap();
    assert_eq!(favorites.len(), 2);
    assert!(favorites.iter().any(|font| font.id == b.id));
    assert_eq!(favorites.iter().filter(|font| font.url == "u1").count(), 1);
    assert!(service.recycle_bin().await.unwrap().is_empty());
    assert_eq!(service.font_images(c.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_font_is_evicted_after_retention() {
    let (service, clock) = service().await;
    let font = ingest(&service, "Lato", "u1").await.font;

    let moved = service.move_to_recycle_bin(font.id).await.unwrap().unwrap();
    assert_eq!(moved.deletion_timestamp, Some(START + WEEK));

    clock.advance_secs(WEEK - 1);
    assert!(service.delete_old_recycled_fonts().await.unwrap().is_empty());
    assert!(service.font(font.id).await.unwrap().is_some());

    clock.advance_secs(1);
    assert_eq!(
        service.delete_old_recycled_fonts().await.unwrap(),
        vec![font.id]
    );
    assert!(service.font(font.id).await.unwrap().is_none());
    assert!(service.watch_recycle_bin().borrow().is_empty());
}

#[tokio::test]
async fn test_recycle_then_restore_clears_deadline() {
    let (service, _clock) = service().await;
    let font = ingest(&service, "Inter", "u1").await.font;

    service.move_to_recycle_bin(font.id).await.unwrap();
    service.move_to_favorites(font.id).await.unwrap();
    service.move_to_favorites(font.id).await.unwrap();

    let stored = service.font(font.id).await.unwrap().unwrap();
    assert_eq!(stored.deletion_timestamp, None);
    assert_eq!(stored.category_id, service.categories().favorites);
}

#[tokio::test]
async fn test_delete_recycled_font_ignores_favorites() {
    let (service, _clock) = service().await;
    let font = ingest(&service, "Inter", "u1").await.font;

    assert!(!service.delete_recycled_font(font.id).await.unwrap());
    assert_eq!(service.font(font.id).await.unwrap(), Some(font));
}

#[tokio::test]
async fn test_wipe_only_touches_recycle_bin() {
    let (service, _clock) = service().await;
    let keep = ingest(&service, "Roboto", "u1").await.font;
    let drop_a = ingest(&service, "Lato", "u2").await.font;
    let drop_b = ingest(&service, "Inter", "u3").await.font;

    service.move_to_recycle_bin(drop_a.id).await.unwrap();
    service.move_to_recycle_bin(drop_b.id).await.unwrap();

    assert_eq!(service.wipe_recycle_bin().await.unwrap(), 2);
    assert_eq!(ids(&service.favorites().await.unwrap()), vec![keep.id]);
    assert!(service.recycle_bin().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_asset_mismatch_is_reported() {
    let (service, _clock) = service().await;

    let result = service
        .insert_font_with_assets(&NewFont::new("Roboto", "u1"), &["a.png".to_string()], &[])
        .await;

    assert!(matches!(
        result,
        Err(CoreError::Library(LibraryError::AssetCountMismatch {
            urls: 1,
            blobs: 0
        }))
    ));
    assert!(service.favorites().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_events_follow_mutations() {
    let (service, _clock) = service().await;
    let mut events = service
        .event_stream()
        .filter(|event| !matches!(event, CoreEvent::Fonts(FontEvent::PendingChanged { .. })));

    let font = ingest(&service, "Roboto", "u1").await.font;
    service.move_to_recycle_bin(font.id).await.unwrap();
    service.delete_recycled_font(font.id).await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::FontAdded {
            font_id: font.id.0,
            title: "Roboto".to_string(),
            liked: Some(false),
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::FontRecycled {
            font_id: font.id.0,
            deletion_timestamp: START + WEEK,
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::FontDeleted { font_id: font.id.0 })
    );
}

#[tokio::test]
async fn test_failed_recycling_batch_publishes_committed_moves() {
    let config = CoreConfig::builder()
        .in_memory()
        .clock(Arc::new(ManualClock::at(START)))
        .build()
        .unwrap();
    let pool = create_test_pool().await.unwrap();
    let service = FontService::new(pool.clone(), config).await.unwrap();

    let a = ingest(&service, "Roboto", "u1").await.font;
    let b = ingest(&service, "Lato", "u2").await.font;
    service.mark_for_recycling(a.clone()).await;
    service.mark_for_recycling(b.clone()).await;

    // The second move hits a storage error after the first has committed
    sqlx::query(&format!(
        "CREATE TRIGGER reject_move BEFORE UPDATE ON fonts WHEN OLD.id = {} \
         BEGIN SELECT RAISE(ABORT, 'font locked'); END",
        b.id.0
    ))
    .execute(&pool)
    .await
    .unwrap();

    let mut events = service
        .event_stream()
        .filter(|event| matches!(event, CoreEvent::Fonts(FontEvent::FontRecycled { .. })));

    let result = service.attempt_recycling().await;
    assert!(matches!(
        result,
        Err(CoreError::Library(LibraryError::Database(_)))
    ));

    assert_eq!(ids(&service.watch_recycle_bin().borrow()), vec![a.id]);
    assert_eq!(ids(&service.watch_favorites().borrow()), vec![b.id]);
    assert!(service.pending_recycling().await.is_empty());
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::FontRecycled {
            font_id: a.id.0,
            deletion_timestamp: START + WEEK,
        })
    );
}

#[tokio::test]
async fn test_pending_changes_are_published() {
    let (service, _clock) = service().await;
    let mut events = service.subscribe_events();

    let font = ingest(&service, "Roboto", "u1").await.font;
    while let Ok(event) = events.try_recv() {
        drop(event);
    }

    service.mark_for_recycling(font.clone()).await;
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::PendingChanged {
            recycling: 1,
            restoration: 0,
        })
    );

    assert_eq!(service.dismiss_recycling().await, 1);
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Fonts(FontEvent::PendingChanged {
            recycling: 0,
            restoration: 0,
        })
    );
}

#[tokio::test]
async fn test_background_variants_report_completion() {
    let (service, clock) = service().await;
    let a = ingest(&service, "Roboto", "u1").await.font;
    ingest(&service, "Roboto", "u2").await;

    let moved = service.spawn_attempt_recycling().await.unwrap().unwrap();
    assert_eq!(ids(&moved), vec![a.id]);

    service.mark_for_restoration(moved[0].clone()).await;
    let restored = service.spawn_attempt_restoration().await.unwrap().unwrap();
    assert_eq!(ids(&restored), vec![a.id]);

    service.move_to_recycle_bin(a.id).await.unwrap();
    clock.advance_secs(WEEK);
    let evicted = service
        .spawn_delete_old_recycled_fonts()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(evicted, vec![a.id]);

    assert_eq!(service.spawn_wipe_recycle_bin().await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_sweeper_evicts_and_stops() {
    let clock = Arc::new(ManualClock::at(START));
    let config = CoreConfig::builder()
        .in_memory()
        .clock(clock.clone())
        .retention_period(Duration::from_secs(60))
        .sweep_interval(Duration::from_millis(20))
        .build()
        .unwrap();
    let service = FontService::bootstrap(config).await.unwrap();

    let font = ingest(&service, "Roboto", "u1").await.font;
    service.move_to_recycle_bin(font.id).await.unwrap();
    clock.advance_secs(60);

    let mut events = service.event_stream().filter(|event| {
        matches!(
            event,
            CoreEvent::Fonts(FontEvent::ExpiredFontsEvicted { .. })
                | CoreEvent::Maintenance(MaintenanceEvent::SweeperStopped)
        )
    });

    let sweeper = service.spawn_eviction_sweeper();

    let evicted = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("sweep within timeout")
        .unwrap();
    assert_eq!(
        evicted,
        CoreEvent::Fonts(FontEvent::ExpiredFontsEvicted {
            font_ids: vec![font.id.0],
        })
    );
    assert!(service.font(font.id).await.unwrap().is_none());

    sweeper.shutdown().await;
    let stopped = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("stop event within timeout")
        .unwrap();
    assert_eq!(
        stopped,
        CoreEvent::Maintenance(MaintenanceEvent::SweeperStopped)
    );
}

#[tokio::test]
async fn test_pending_buffers_do_not_survive_restart() {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "fontkeep-restart-{}-{}.db",
        std::process::id(),
        nanos
    ));
    let config = || {
        CoreConfig::builder()
            .database_path(&path)
            .clock(Arc::new(ManualClock::at(START)))
            .build()
            .unwrap()
    };

    let service = FontService::bootstrap(config()).await.unwrap();
    let a = ingest(&service, "Roboto", "u1").await.font;
    ingest(&service, "Roboto", "u2").await;
    assert_eq!(service.pending_recycling().await.len(), 1);
    service.close().await;
    drop(service);

    // Reopen: data persisted, staged actions gone
    let reopened = FontService::bootstrap(config()).await.unwrap();
    assert_eq!(reopened.favorites().await.unwrap().len(), 2);
    assert!(reopened.pending_recycling().await.is_empty());
    assert_eq!(
        reopened.font(a.id).await.unwrap().unwrap().category_id,
        reopened.categories().favorites
    );
    reopened.close().await;

    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
