//! Read-only projection of [`AppState`] into what a front end renders.

use std::collections::HashMap;

use shared::domain::{CategorySelection, Item, SyncStatus};

use crate::state::{AppState, MicrophoneStatus, VoicePhase};

pub const ALL_ITEMS_TITLE: &str = "כל הפריטים";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    NoItemsInCategory(String),
    ListEmpty { voice_available: bool },
}

impl EmptyState {
    pub fn headline(&self) -> String {
        match self {
            EmptyState::NoItemsInCategory(category) => {
                format!("אין פריטים בקטגוריה \"{category}\"")
            }
            EmptyState::ListEmpty { .. } => "הרשימה ריקה".to_string(),
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            EmptyState::NoItemsInCategory(_) => "בחר קטגוריה אחרת או הוסף פריטים חדשים",
            EmptyState::ListEmpty {
                voice_available: true,
            } => "הוסף פריטים באמצעות הקול או לחץ על הוסף פריט",
            EmptyState::ListEmpty {
                voice_available: false,
            } => "לחץ על הוסף פריט כדי להתחיל",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub title: String,
    pub visible: Vec<Item>,
    pub total: usize,
    pub counts: Vec<CategoryCount>,
    pub empty_state: Option<EmptyState>,
    pub sync_status: SyncStatus,
    pub microphone: MicrophoneStatus,
    pub voice_phase: VoicePhase,
}

impl ListView {
    pub fn project(state: &AppState) -> Self {
        let visible = visible_items(state);
        let empty_state = visible.is_empty().then(|| empty_state(state));
        Self {
            title: title(&state.current_category),
            total: state.items.len(),
            counts: category_counts(&state.categories, &state.items),
            empty_state,
            visible,
            sync_status: state.sync_status,
            microphone: state.microphone,
            voice_phase: state.voice_phase,
        }
    }

    pub fn voice_visible(&self) -> bool {
        self.microphone.is_available()
    }
}

pub fn is_visible(state: &AppState, item: &Item) -> bool {
    state.current_category.matches(item) && state.status_filter.matches(item)
}

pub fn visible_items(state: &AppState) -> Vec<Item> {
    state
        .items
        .iter()
        .filter(|item| is_visible(state, item))
        .cloned()
        .collect()
}

pub fn title(selection: &CategorySelection) -> String {
    match selection {
        CategorySelection::All => ALL_ITEMS_TITLE.to_string(),
        CategorySelection::Category(label) => label.clone(),
    }
}

fn empty_state(state: &AppState) -> EmptyState {
    match &state.current_category {
        CategorySelection::Category(label) => EmptyState::NoItemsInCategory(label.clone()),
        CategorySelection::All => EmptyState::ListEmpty {
            voice_available: state.microphone.is_available(),
        },
    }
}

/// Every known category starts at zero; categories seen only on items are
/// appended in first-seen order.
pub fn category_counts(categories: &[String], items: &[Item]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = categories
        .iter()
        .map(|category| CategoryCount {
            category: category.clone(),
            count: 0,
        })
        .collect();
    let mut index: HashMap<String, usize> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| (c.category.clone(), i))
        .collect();

    for item in items {
        let category = item.category();
        match index.get(category) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(category.to_string(), counts.len());
                counts.push(CategoryCount {
                    category: category.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryProgress {
    pub category: String,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage rounded to one decimal.
    pub completion_rate: f64,
    pub by_category: Vec<CategoryProgress>,
}

impl ListStats {
    pub fn compute(items: &[Item]) -> Self {
        let total = items.len();
        let completed = items.iter().filter(|item| item.completed).count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 1000.0).round() / 10.0
        };

        let mut by_category: Vec<CategoryProgress> = Vec::new();
        for item in items {
            let category = item.category();
            let entry = match by_category.iter().position(|p| p.category == category) {
                Some(i) => &mut by_category[i],
                None => {
                    by_category.push(CategoryProgress {
                        category: category.to_string(),
                        total: 0,
                        completed: 0,
                    });
                    let last = by_category.len() - 1;
                    &mut by_category[last]
                }
            };
            entry.total += 1;
            if item.completed {
                entry.completed += 1;
            }
        }
        // stable: ties keep first-seen order
        by_category.sort_by(|a, b| b.total.cmp(&a.total));

        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate,
            by_category,
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
