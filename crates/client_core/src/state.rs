//! Controller state and the pure transitions applied to it.
//!
//! Nothing in here performs I/O. The controller issues requests, then feeds
//! the results back through these methods, so every transition can be
//! exercised directly in tests.

use chrono::{DateTime, Utc};
use shared::{
    domain::{CategorySelection, Item, StatusFilter, SyncMarker, SyncStatus, TagStat},
    protocol::ShoppingListResponse,
};

/// Sequence number stamped on each list fetch when it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

impl FetchToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MicrophoneStatus {
    /// Availability has not been probed yet.
    #[default]
    Unknown,
    Ready,
    NoPermission,
    NoDevice,
    NotSupported,
}

impl MicrophoneStatus {
    pub fn is_available(self) -> bool {
        self == MicrophoneStatus::Ready
    }

    pub fn hint(self) -> &'static str {
        match self {
            MicrophoneStatus::Ready => "הוסף פריטים בקול עם קטגוריזציה אוטומטית",
            MicrophoneStatus::NoPermission => "יש צורך בהרשאה לגישה למיקרופון",
            MicrophoneStatus::NoDevice => "לא נמצא מיקרופון במכשיר",
            MicrophoneStatus::Unknown | MicrophoneStatus::NotSupported => {
                "הדפדפן לא תומך בהקלטה קולית"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePhase {
    #[default]
    Idle,
    Recording,
    Processing,
}

/// What applying a list response did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Replaced,
    Unchanged,
    /// A newer fetch was already applied; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub items: Vec<Item>,
    pub categories: Vec<String>,
    pub tag_stats: Vec<TagStat>,
    pub marker: Option<SyncMarker>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub current_category: CategorySelection,
    pub status_filter: StatusFilter,
    pub microphone: MicrophoneStatus,
    pub voice_phase: VoicePhase,
    next_token: u64,
    last_applied: Option<FetchToken>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_fetch(&mut self) -> FetchToken {
        self.next_token += 1;
        FetchToken(self.next_token)
    }

    fn is_stale(&self, token: FetchToken) -> bool {
        self.last_applied.is_some_and(|applied| token <= applied)
    }

    /// Full load: the cache is replaced whatever the marker says.
    pub fn apply_snapshot(
        &mut self,
        token: FetchToken,
        response: ShoppingListResponse,
        now: DateTime<Utc>,
    ) -> SnapshotOutcome {
        if self.is_stale(token) {
            return SnapshotOutcome::Stale;
        }
        self.last_applied = Some(token);
        self.items = response.items;
        self.marker = response.last_modified;
        self.mark_synced(now);
        SnapshotOutcome::Replaced
    }

    /// Poll result: the cache is only replaced when the marker moved, but a
    /// successful poll always clears an earlier error.
    pub fn apply_poll(
        &mut self,
        token: FetchToken,
        response: ShoppingListResponse,
        now: DateTime<Utc>,
    ) -> SnapshotOutcome {
        if self.is_stale(token) {
            return SnapshotOutcome::Stale;
        }
        self.last_applied = Some(token);
        self.mark_synced(now);
        if response.last_modified == self.marker {
            return SnapshotOutcome::Unchanged;
        }
        self.items = response.items;
        self.marker = response.last_modified;
        SnapshotOutcome::Replaced
    }

    /// Returns whether the indicator changed. Failures of fetches that were
    /// already superseded leave the indicator alone.
    pub fn fail_fetch(&mut self, token: FetchToken) -> bool {
        if self.is_stale(token) {
            return false;
        }
        self.set_sync_status(SyncStatus::Error)
    }

    pub fn set_sync_status(&mut self, status: SyncStatus) -> bool {
        let changed = self.sync_status != status;
        self.sync_status = status;
        changed
    }

    fn mark_synced(&mut self, now: DateTime<Utc>) {
        self.sync_status = SyncStatus::Synced;
        self.last_synced_at = Some(now);
    }

    pub fn set_categories(&mut self, categories: Vec<String>) {
        self.categories = categories;
    }

    pub fn set_tag_stats(&mut self, stats: Vec<TagStat>) {
        self.tag_stats = stats;
    }

    pub fn select_category(&mut self, selection: CategorySelection) {
        self.current_category = selection;
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
    }

    /// A denial is final for the session: once `NoPermission` is recorded
    /// no later status replaces it.
    pub fn set_microphone(&mut self, status: MicrophoneStatus) -> bool {
        if self.microphone == MicrophoneStatus::NoPermission {
            return false;
        }
        let changed = self.microphone != status;
        self.microphone = status;
        changed
    }

    /// Claims the capture slot. Only one recording may be active, so this
    /// fails unless the voice workflow is idle.
    pub fn try_begin_recording(&mut self) -> bool {
        if self.voice_phase != VoicePhase::Idle {
            return false;
        }
        self.voice_phase = VoicePhase::Recording;
        true
    }

    /// Moves `Recording` to `Processing`. Any other phase is left alone.
    pub fn advance_to_processing(&mut self) -> bool {
        if self.voice_phase != VoicePhase::Recording {
            return false;
        }
        self.voice_phase = VoicePhase::Processing;
        true
    }

    pub fn set_voice_phase(&mut self, phase: VoicePhase) {
        self.voice_phase = phase;
    }

    pub fn find_item(&self, needle: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id.as_str() == needle)
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
