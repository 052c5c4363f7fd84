use super::*;
use shared::domain::{ItemId, StatusFilter, DEFAULT_CATEGORY};

const DAIRY: &str = "חלב ומוצרי חלב";
const VEGETABLES: &str = "ירקות";

fn item(id: &str, tag: Option<&str>, completed: bool) -> Item {
    Item {
        id: ItemId::from(id),
        name: format!("item-{id}"),
        quantity: "1".into(),
        tag: tag.map(str::to_string),
        completed,
        created_at: None,
    }
}

fn populated_state() -> AppState {
    let mut state = AppState::new();
    state.set_categories(vec![
        DAIRY.to_string(),
        VEGETABLES.to_string(),
        DEFAULT_CATEGORY.to_string(),
    ]);
    state.items = vec![
        item("1", Some(DAIRY), false),
        item("2", Some(DAIRY), true),
        item("3", Some(VEGETABLES), false),
        item("4", None, false),
    ];
    state
}

#[test]
fn visible_set_requires_category_and_status_match() {
    let mut state = populated_state();
    state.select_category(CategorySelection::Category(DAIRY.to_string()));
    state.set_status_filter(StatusFilter::Pending);

    let visible = visible_items(&state);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, ItemId::from("1"));

    state.set_status_filter(StatusFilter::Completed);
    let visible = visible_items(&state);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, ItemId::from("2"));
}

#[test]
fn counts_start_at_zero_and_untagged_items_land_in_catch_all() {
    let mut state = populated_state();
    state.items.retain(|item| item.tag.as_deref() != Some(VEGETABLES));

    let counts = category_counts(&state.categories, &state.items);
    let lookup = |name: &str| {
        counts
            .iter()
            .find(|c| c.category == name)
            .map(|c| c.count)
            .expect("category present")
    };
    assert_eq!(lookup(DAIRY), 2);
    assert_eq!(lookup(VEGETABLES), 0);
    assert_eq!(lookup(DEFAULT_CATEGORY), 1);
}

#[test]
fn unknown_item_category_is_appended_after_server_list() {
    let categories = vec![DAIRY.to_string()];
    let items = vec![item("1", Some("קפואים"), false), item("2", Some(DAIRY), false)];

    let counts = category_counts(&categories, &items);
    assert_eq!(counts[0], CategoryCount { category: DAIRY.into(), count: 1 });
    assert_eq!(counts[1], CategoryCount { category: "קפואים".into(), count: 1 });
}

#[test]
fn empty_state_distinguishes_category_and_voice_availability() {
    let mut state = AppState::new();
    let view = ListView::project(&state);
    assert_eq!(
        view.empty_state,
        Some(EmptyState::ListEmpty {
            voice_available: false
        })
    );
    assert_eq!(view.empty_state.as_ref().map(EmptyState::hint), Some("לחץ על הוסף פריט כדי להתחיל"));

    state.set_microphone(MicrophoneStatus::Ready);
    let view = ListView::project(&state);
    assert_eq!(
        view.empty_state.as_ref().map(EmptyState::hint),
        Some("הוסף פריטים באמצעות הקול או לחץ על הוסף פריט")
    );

    state.select_category(CategorySelection::Category(VEGETABLES.into()));
    let view = ListView::project(&state);
    let empty = view.empty_state.expect("empty");
    assert_eq!(empty.headline(), "אין פריטים בקטגוריה \"ירקות\"");
    assert_eq!(view.title, VEGETABLES);
}

#[test]
fn populated_view_has_no_empty_state() {
    let state = populated_state();
    let view = ListView::project(&state);
    assert!(view.empty_state.is_none());
    assert_eq!(view.total, 4);
    assert_eq!(view.title, ALL_ITEMS_TITLE);
}

#[test]
fn stats_sort_categories_by_total_and_round_rate() {
    let state = populated_state();
    let stats = ListStats::compute(&state.items);

    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.completion_rate, 25.0);
    assert_eq!(stats.by_category[0].category, DAIRY);
    assert_eq!(stats.by_category[0].total, 2);
    assert_eq!(stats.by_category[0].completed, 1);

    let mut thirds = state.items.clone();
    thirds.truncate(3);
    assert_eq!(ListStats::compute(&thirds).completion_rate, 33.3);
    assert_eq!(ListStats::compute(&[]).completion_rate, 0.0);
}
