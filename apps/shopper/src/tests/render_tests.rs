use super::*;

use client_core::AppState;
use shared::{
    domain::{CategorySelection, Item, ItemId},
    protocol::ShoppingListResponse,
};

fn state_with(items: Vec<Item>) -> AppState {
    let mut state = AppState::new();
    state.set_categories(vec!["ירקות".into(), "אחר".into()]);
    let token = state.begin_fetch();
    state.apply_snapshot(
        token,
        ShoppingListResponse {
            items,
            last_modified: None,
        },
        Utc::now(),
    );
    state
}

fn item(id: &str, name: &str, tag: &str, completed: bool) -> Item {
    Item {
        id: ItemId::from(id),
        name: name.into(),
        quantity: "2".into(),
        tag: Some(tag.into()),
        completed,
        created_at: None,
    }
}

#[test]
fn numbers_visible_items_and_marks_completed() {
    let state = state_with(vec![
        item("a", "עגבניות", "ירקות", false),
        item("b", "סבון", "אחר", true),
    ]);
    let out = list(&ListView::project(&state), None);

    assert!(out.contains("== כל הפריטים =="));
    assert!(out.contains("  1. [ ] עגבניות (2) · ירקות"));
    assert!(out.contains("  2. [x] סבון (2) · אחר"));
    assert!(out.contains("-- סה\"כ 2 | ירקות 1 | אחר 1"));
}

#[test]
fn empty_category_shows_headline_and_hint() {
    let mut state = state_with(vec![item("a", "עגבניות", "ירקות", false)]);
    state.select_category(CategorySelection::Category("אחר".into()));

    let out = list(&ListView::project(&state), None);

    assert!(out.contains("אין פריטים בקטגוריה \"אחר\""));
    assert!(!out.contains("עגבניות ("));
}

#[test]
fn stats_show_rate_with_one_decimal() {
    let stats = ListStats::compute(&[
        item("a", "x", "ירקות", true),
        item("b", "y", "ירקות", false),
        item("c", "z", "אחר", false),
    ]);
    let out = super::stats(&stats, &[]);

    assert!(out.starts_with("סה\"כ 3 | נקנו 1 | נותרו 2 | 33.3%"));
    assert!(out.contains("  ירקות: 1/2"));
    assert!(!out.contains("server:"));
}

#[test]
fn stats_list_server_tag_counts() {
    let stats = ListStats::compute(&[item("a", "x", "ירקות", true)]);
    let tag_stats = [TagStat {
        tag: "ירקות".into(),
        count: 4,
        completed_count: 1,
    }];

    let out = super::stats(&stats, &tag_stats);

    assert!(out.contains("server:\n  ירקות: 4 (1 נקנו)\n"));
}

#[test]
fn list_redraws_are_separate_from_printed_events() {
    assert!(redraws_list(&ControllerEvent::ListUpdated));
    assert!(event(&ControllerEvent::ListUpdated).is_none());
    assert_eq!(
        event(&ControllerEvent::Notice("נוסף".into())).as_deref(),
        Some("» נוסף")
    );
    assert!(event(&ControllerEvent::SyncStatusChanged(SyncStatus::Synced)).is_none());
}

#[test]
fn failures_are_prefixed_by_kind() {
    assert_eq!(
        failure(&ApiError::new(FailureKind::Validation, "אנא הכנס שם פריט")),
        "! אנא הכנס שם פריט"
    );
    assert!(failure(&ApiError::new(FailureKind::Transport, "timeout")).starts_with("server error"));
}
