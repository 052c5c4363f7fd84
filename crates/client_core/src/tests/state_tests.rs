use super::*;
use shared::domain::ItemId;

fn item(id: &str, tag: &str) -> Item {
    Item {
        id: ItemId::from(id),
        name: format!("item-{id}"),
        quantity: "1".into(),
        tag: Some(tag.into()),
        completed: false,
        created_at: None,
    }
}

fn snapshot(marker: &str, ids: &[&str]) -> ShoppingListResponse {
    ShoppingListResponse {
        items: ids.iter().map(|id| item(id, "ירקות")).collect(),
        last_modified: Some(SyncMarker::from(marker)),
    }
}

#[test]
fn snapshot_replaces_cache_and_marks_synced() {
    let mut state = AppState::new();
    state.set_sync_status(SyncStatus::Syncing);
    let token = state.begin_fetch();

    let outcome = state.apply_snapshot(token, snapshot("m1", &["a", "b"]), Utc::now());

    assert_eq!(outcome, SnapshotOutcome::Replaced);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.marker, Some(SyncMarker::from("m1")));
    assert_eq!(state.sync_status, SyncStatus::Synced);
    assert!(state.last_synced_at.is_some());
}

#[test]
fn poll_with_same_marker_keeps_cache_but_clears_error() {
    let mut state = AppState::new();
    let first = state.begin_fetch();
    state.apply_snapshot(first, snapshot("m1", &["a"]), Utc::now());
    state.set_sync_status(SyncStatus::Error);

    let poll = state.begin_fetch();
    let outcome = state.apply_poll(poll, snapshot("m1", &["ignored", "entirely"]), Utc::now());

    assert_eq!(outcome, SnapshotOutcome::Unchanged);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.sync_status, SyncStatus::Synced);
}

#[test]
fn poll_with_new_marker_replaces_cache() {
    let mut state = AppState::new();
    let first = state.begin_fetch();
    state.apply_snapshot(first, snapshot("m1", &["a"]), Utc::now());

    let poll = state.begin_fetch();
    let outcome = state.apply_poll(poll, snapshot("m2", &["a", "b", "c"]), Utc::now());

    assert_eq!(outcome, SnapshotOutcome::Replaced);
    assert_eq!(state.items.len(), 3);
    assert_eq!(state.marker, Some(SyncMarker::from("m2")));
}

#[test]
fn older_response_arriving_late_is_discarded() {
    let mut state = AppState::new();
    let slow = state.begin_fetch();
    let fast = state.begin_fetch();

    state.apply_snapshot(fast, snapshot("m2", &["new"]), Utc::now());
    let outcome = state.apply_snapshot(slow, snapshot("m1", &["old"]), Utc::now());

    assert_eq!(outcome, SnapshotOutcome::Stale);
    assert_eq!(state.items[0].id, ItemId::from("new"));
    assert_eq!(state.marker, Some(SyncMarker::from("m2")));
}

#[test]
fn failure_of_superseded_fetch_does_not_flip_indicator() {
    let mut state = AppState::new();
    let slow = state.begin_fetch();
    let fast = state.begin_fetch();
    state.apply_snapshot(fast, snapshot("m1", &[]), Utc::now());

    assert!(!state.fail_fetch(slow));
    assert_eq!(state.sync_status, SyncStatus::Synced);

    let next = state.begin_fetch();
    assert!(state.fail_fetch(next));
    assert_eq!(state.sync_status, SyncStatus::Error);
}

#[test]
fn only_one_recording_can_be_claimed() {
    let mut state = AppState::new();
    assert!(state.try_begin_recording());
    assert!(!state.try_begin_recording());

    state.set_voice_phase(VoicePhase::Processing);
    assert!(!state.try_begin_recording());

    state.set_voice_phase(VoicePhase::Idle);
    assert!(state.try_begin_recording());
}

#[test]
fn microphone_is_available_only_when_ready() {
    assert!(MicrophoneStatus::Ready.is_available());
    for status in [
        MicrophoneStatus::Unknown,
        MicrophoneStatus::NoPermission,
        MicrophoneStatus::NoDevice,
        MicrophoneStatus::NotSupported,
    ] {
        assert!(!status.is_available(), "{status:?}");
    }
}

#[test]
fn permission_denial_is_final_for_the_session() {
    let mut state = AppState::new();
    assert!(state.set_microphone(MicrophoneStatus::Ready));
    assert!(state.set_microphone(MicrophoneStatus::NoPermission));

    assert!(!state.set_microphone(MicrophoneStatus::Ready));
    assert!(!state.set_microphone(MicrophoneStatus::NoDevice));
    assert_eq!(state.microphone, MicrophoneStatus::NoPermission);
}

#[test]
fn processing_is_only_entered_from_recording() {
    let mut state = AppState::new();
    assert!(!state.advance_to_processing());
    assert_eq!(state.voice_phase, VoicePhase::Idle);

    assert!(state.try_begin_recording());
    assert!(state.advance_to_processing());
    assert!(!state.advance_to_processing());
    assert_eq!(state.voice_phase, VoicePhase::Processing);

    // a finished workflow is not pulled back into processing by a late stop
    state.set_voice_phase(VoicePhase::Idle);
    assert!(!state.advance_to_processing());
    assert_eq!(state.voice_phase, VoicePhase::Idle);
}
