use super::*;
use crate::clipboard_history::{ContentHash, Entry};
use crate::external::HistorySource;
use crate::lock::read_holder;
use crate::test_support::{image, text, Fake, OcrBehavior, DEAD_PID};
use std::path::Path;
use tempfile::TempDir;

fn setup() -> (IndexCoordinator, Fake, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let fake = Fake::new();
    let config = IndexerConfig::with_cache_root(temp_dir.path());
    (IndexCoordinator::new(config, fake.toolbox()), fake, temp_dir)
}

fn ocr_index(coordinator: &IndexCoordinator) -> OcrIndex {
    OcrIndex::load(coordinator.config().ocr_index_path())
}

fn thumbnails(coordinator: &IndexCoordinator) -> ThumbnailStore {
    ThumbnailStore::new(coordinator.config().thumbnail_dir())
}

fn hash(entry: &Entry) -> ContentHash {
    entry.content_hash()
}

// ============================================
// HAPPY PATH
// ============================================

#[test]
fn test_first_run_builds_both_caches() {
    let (coordinator, fake, _temp_dir) = setup();
    let screenshot = image(2, 800, 600);
    fake.set_history(vec![screenshot.clone(), text(1, "hello")]);

    let report = coordinator.run().unwrap();

    assert!(!report.aborted);
    assert_eq!(report.entries, 2);
    assert_eq!(report.thumbnails_written, 1);
    assert_eq!(report.ocr_processed, 1);
    assert_eq!(
        ocr_index(&coordinator).text(&hash(&screenshot)),
        Some("invoice total 42")
    );
    assert!(thumbnails(&coordinator).contains(&hash(&screenshot)));
}

#[test]
fn test_rerun_without_new_entries_does_no_work() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(3, 800, 600), image(2, 64, 64), text(1, "hi")]);
    coordinator.run().unwrap();
    fake.reset_counters();

    let report = coordinator.run().unwrap();

    assert_eq!(fake.decode_calls(), 0);
    assert_eq!(fake.resize_calls(), 0);
    assert_eq!(fake.recognize_calls(), 0);
    assert_eq!(fake.0.language_calls.get(), 0);
    assert!(fake.notifications().is_empty());
    assert_eq!(report.thumbnails_written, 0);
    assert_eq!(report.ocr_processed, 0);
}

#[test]
fn test_lock_is_released_after_run() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    coordinator.run().unwrap();
    assert!(!coordinator.config().lock_path().exists());
}

#[test]
fn test_identical_content_shares_cache_entry() {
    let (coordinator, fake, _temp_dir) = setup();
    let first = image(1, 800, 600);
    let mut renumbered = first.clone();
    renumbered.source_id = "7".to_string();
    renumbered.raw_line = renumbered.raw_line.replacen('1', "7", 1);
    fake.set_history(vec![renumbered, first]);

    coordinator.run().unwrap();

    assert_eq!(fake.recognize_calls(), 1);
    // One decode for the thumbnail, one for OCR
    assert_eq!(fake.decode_calls(), 2);
    assert_eq!(ocr_index(&coordinator).len(), 1);
}

// ============================================
// SINGLE-FLIGHT
// ============================================

#[test]
fn test_live_lock_aborts_without_touching_caches() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    let held = IndexLock::acquire(&coordinator.config().lock_path()).unwrap();

    let report = coordinator.run().unwrap();

    assert!(report.aborted);
    assert_eq!(fake.0.list_calls.get(), 0);
    assert_eq!(fake.decode_calls(), 0);
    assert!(!coordinator.config().ocr_index_path().exists());
    // The holder's lock is untouched
    assert_eq!(read_holder(held.path()), Some(std::process::id()));
}

#[test]
fn test_stale_lock_is_reclaimed() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    let lock_path = coordinator.config().lock_path();
    std::fs::write(&lock_path, DEAD_PID.to_string()).unwrap();

    let report = coordinator.run().unwrap();

    assert!(!report.aborted);
    assert_eq!(report.ocr_processed, 1);
    assert!(!lock_path.exists());
}

#[test]
fn test_listing_failure_keeps_caches_and_releases_lock() {
    let (coordinator, fake, _temp_dir) = setup();
    let screenshot = image(1, 800, 600);
    fake.set_history(vec![screenshot.clone()]);
    coordinator.run().unwrap();

    fake.0.list_fails.set(true);
    let result = coordinator.run();

    let err = result.unwrap_err();
    assert!(matches!(err, IndexError::SourceUnavailable(_)));
    assert!(err.is_transient());
    assert!(ocr_index(&coordinator).is_processed(&hash(&screenshot)));
    assert!(thumbnails(&coordinator).contains(&hash(&screenshot)));
    assert!(!coordinator.config().lock_path().exists());
}

// ============================================
// PRUNING
// ============================================

#[test]
fn test_deleted_entry_is_pruned_next_run() {
    let (coordinator, fake, _temp_dir) = setup();
    let keep = image(2, 800, 600);
    let gone = image(1, 800, 600);
    fake.set_history(vec![keep.clone(), gone.clone()]);
    coordinator.run().unwrap();
    assert!(thumbnails(&coordinator).contains(&hash(&gone)));

    fake.delete(&gone.raw_line).unwrap();
    let report = coordinator.run().unwrap();

    assert_eq!(report.pruned_ocr, 1);
    assert_eq!(report.pruned_thumbnails, 1);
    let index = ocr_index(&coordinator);
    assert!(!index.is_processed(&hash(&gone)));
    assert!(index.is_processed(&hash(&keep)));
    assert!(!thumbnails(&coordinator).contains(&hash(&gone)));
    assert!(thumbnails(&coordinator).contains(&hash(&keep)));
}

#[test]
fn test_wipe_prunes_everything_and_does_no_work() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(2, 800, 600), image(1, 300, 300), text(0, "x")]);
    coordinator.run().unwrap();
    fake.wipe().unwrap();
    fake.reset_counters();

    let report = coordinator.run().unwrap();

    assert_eq!(report.entries, 0);
    assert_eq!(report.pruned_ocr, 2);
    assert_eq!(report.pruned_thumbnails, 2);
    assert!(ocr_index(&coordinator).is_empty());
    assert!(thumbnails(&coordinator).load().is_empty());
    assert_eq!(fake.decode_calls(), 0);
    assert_eq!(fake.recognize_calls(), 0);
    assert!(fake.notifications().is_empty());
}

// ============================================
// OCR POLICY
// ============================================

#[test]
fn test_ocr_bounded_to_top_k() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history((0..500).map(|i| image(i, 1024, 768)).collect());

    let report = coordinator.run().unwrap();

    assert_eq!(fake.recognize_calls(), 20);
    assert_eq!(report.ocr_processed, 20);
    assert_eq!(report.thumbnails_written, 500);
    assert_eq!(ocr_index(&coordinator).len(), 20);

    fake.reset_counters();
    coordinator.run().unwrap();
    assert_eq!(fake.recognize_calls(), 0);
}

#[test]
fn test_small_image_gets_thumbnail_but_no_ocr() {
    let (coordinator, fake, _temp_dir) = setup();
    let icon = image(1, 50, 40);
    fake.set_history(vec![icon.clone()]);

    let report = coordinator.run().unwrap();

    assert_eq!(report.thumbnails_written, 1);
    assert_eq!(fake.recognize_calls(), 0);
    assert_eq!(fake.0.language_calls.get(), 0);
    assert!(!ocr_index(&coordinator).is_processed(&hash(&icon)));
    // Thumbnail-only runs are silent
    assert!(fake.notifications().is_empty());
}

#[test]
fn test_timeout_is_not_marked_processed() {
    let (coordinator, fake, _temp_dir) = setup();
    let screenshot = image(1, 800, 600);
    fake.set_history(vec![screenshot.clone()]);
    fake.set_ocr(OcrBehavior::Timeout);

    let report = coordinator.run().unwrap();

    assert_eq!(report.ocr_deferred, 1);
    assert_eq!(report.ocr_processed, 0);
    assert_eq!(
        ocr_index(&coordinator).state(&hash(&screenshot)),
        OcrState::NotProcessed
    );

    // Retried on the next run
    fake.set_ocr(OcrBehavior::Text("found it".to_string()));
    coordinator.run().unwrap();
    assert_eq!(
        ocr_index(&coordinator).text(&hash(&screenshot)),
        Some("found it")
    );
}

#[test]
fn test_undecodable_image_skips_only_its_thumbnail() {
    let (coordinator, fake, _temp_dir) = setup();
    let (newest, broken, oldest) = (image(3, 800, 600), image(2, 800, 600), image(1, 800, 600));
    fake.set_history(vec![newest.clone(), broken.clone(), oldest.clone()]);
    fake.0
        .decode_fails_for
        .borrow_mut()
        .insert(broken.raw_line.clone());

    let report = coordinator.run().unwrap();

    assert_eq!(report.thumbnails_written, 2);
    assert_eq!(report.thumbnails_failed, 1);
    let store = thumbnails(&coordinator);
    assert!(store.contains(&hash(&newest)));
    assert!(store.contains(&hash(&oldest)));
    assert!(!store.contains(&hash(&broken)));
}

#[test]
fn test_undecodable_image_ocr_is_deferred_then_retried() {
    let (coordinator, fake, _temp_dir) = setup();
    let (newest, broken, oldest) = (image(3, 800, 600), image(2, 800, 600), image(1, 800, 600));
    fake.set_history(vec![newest.clone(), broken.clone(), oldest.clone()]);
    fake.0
        .decode_fails_for
        .borrow_mut()
        .insert(broken.raw_line.clone());

    let report = coordinator.run().unwrap();

    assert_eq!(report.ocr_processed, 2);
    assert_eq!(report.ocr_deferred, 1);
    let index = ocr_index(&coordinator);
    assert!(index.is_processed(&hash(&newest)));
    assert!(index.is_processed(&hash(&oldest)));
    assert_eq!(index.state(&hash(&broken)), OcrState::NotProcessed);

    // Decodes again: the next run picks up the thumbnail and the OCR it missed
    fake.0.decode_fails_for.borrow_mut().clear();
    fake.reset_counters();
    let report = coordinator.run().unwrap();

    assert_eq!(fake.recognize_calls(), 1);
    assert_eq!(report.thumbnails_written, 1);
    assert!(ocr_index(&coordinator).is_processed(&hash(&broken)));
    assert!(thumbnails(&coordinator).contains(&hash(&broken)));
}

#[test]
fn test_failed_ocr_is_retryable() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    fake.set_ocr(OcrBehavior::Fail);

    coordinator.run().unwrap();
    assert!(ocr_index(&coordinator).is_empty());

    fake.reset_counters();
    coordinator.run().unwrap();
    assert_eq!(fake.recognize_calls(), 1);
}

#[test]
fn test_empty_output_is_processed_empty() {
    let (coordinator, fake, _temp_dir) = setup();
    let photo = image(1, 800, 600);
    fake.set_history(vec![photo.clone()]);
    fake.set_ocr(OcrBehavior::Text(" \n\n".to_string()));

    let report = coordinator.run().unwrap();

    assert_eq!(report.ocr_empty, 1);
    assert_eq!(
        ocr_index(&coordinator).state(&hash(&photo)),
        OcrState::ProcessedEmpty
    );

    fake.reset_counters();
    coordinator.run().unwrap();
    assert_eq!(fake.recognize_calls(), 0);
}

#[test]
fn test_index_saved_after_each_ocr() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(3, 800, 600), image(2, 800, 600), image(1, 800, 600)]);
    *fake.0.watch_index.borrow_mut() = Some(coordinator.config().ocr_index_path());

    coordinator.run().unwrap();

    assert_eq!(*fake.0.index_sizes_seen.borrow(), vec![0, 1, 2]);
}

#[test]
fn test_languages_queried_once_and_joined() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(2, 800, 600), image(1, 800, 600)]);

    coordinator.run().unwrap();

    assert_eq!(fake.0.language_calls.get(), 1);
    assert_eq!(
        *fake.0.recognize_calls.borrow(),
        vec!["eng+deu".to_string(), "eng+deu".to_string()]
    );
}

#[test]
fn test_language_query_failure_falls_back_to_eng() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    *fake.0.languages.borrow_mut() = Err(());

    coordinator.run().unwrap();

    assert_eq!(*fake.0.recognize_calls.borrow(), vec!["eng".to_string()]);
}

// ============================================
// NOTIFICATIONS
// ============================================

#[test]
fn test_notifies_before_and_after_ocr() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(2, 800, 600), image(1, 800, 600)]);

    coordinator.run().unwrap();

    assert_eq!(
        fake.notifications(),
        vec!["Indexing 2 images...".to_string(), "Indexed 2 images".to_string()]
    );
    assert!(fake
        .0
        .notifications
        .borrow()
        .iter()
        .all(|(title, _)| title == "Clipboard"));
}

#[test]
fn test_no_completion_notice_when_all_ocr_deferred() {
    let (coordinator, fake, _temp_dir) = setup();
    fake.set_history(vec![image(1, 800, 600)]);
    fake.set_ocr(OcrBehavior::Timeout);

    coordinator.run().unwrap();

    assert_eq!(fake.notifications(), vec!["Indexing 1 images...".to_string()]);
}

// ============================================
// THUMBNAILS
// ============================================

fn stored_thumbnail(coordinator: &IndexCoordinator, entry: &Entry) -> Vec<u8> {
    let path = thumbnails(coordinator).lookup(&hash(entry)).unwrap();
    std::fs::read(path).unwrap()
}

#[test]
fn test_oversized_image_is_resized() {
    let (coordinator, fake, _temp_dir) = setup();
    let large = image(1, 1920, 200);
    fake.set_history(vec![large.clone()]);

    coordinator.run().unwrap();

    assert_eq!(*fake.0.resize_calls.borrow(), vec![256]);
    assert_eq!(stored_thumbnail(&coordinator, &large), b"resized");
}

#[test]
fn test_small_image_stored_as_is() {
    let (coordinator, fake, _temp_dir) = setup();
    let small = image(1, 256, 256);
    fake.set_history(vec![small.clone()]);

    coordinator.run().unwrap();

    assert_eq!(fake.resize_calls(), 0);
    assert_eq!(
        stored_thumbnail(&coordinator, &small),
        format!("decoded:{}", small.raw_line).into_bytes()
    );
}

#[test]
fn test_resize_failure_stores_original() {
    let (coordinator, fake, _temp_dir) = setup();
    let large = image(1, 4000, 3000);
    fake.set_history(vec![large.clone()]);
    fake.0.resize_fails.set(true);

    let report = coordinator.run().unwrap();

    assert_eq!(report.thumbnails_written, 1);
    assert_eq!(
        stored_thumbnail(&coordinator, &large),
        format!("decoded:{}", large.raw_line).into_bytes()
    );
}

#[test]
fn test_thumbnails_live_under_cache_root() {
    let (coordinator, fake, temp_dir) = setup();
    let entry = image(1, 10, 10);
    fake.set_history(vec![entry.clone()]);

    coordinator.run().unwrap();

    let path = thumbnails(&coordinator).lookup(&hash(&entry)).unwrap();
    assert_eq!(path.parent(), Some(Path::new(temp_dir.path())));
}
