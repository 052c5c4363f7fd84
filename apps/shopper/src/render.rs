//! Plain-text rendering of the list projection and controller events.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use client_core::{ControllerEvent, ListStats, ListView, VoicePhase};
use shared::{
    domain::{SyncStatus, TagStat},
    error::{ApiError, FailureKind},
};

pub fn list(view: &ListView, last_synced: Option<DateTime<Utc>>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==  [{}]", view.title, sync_badge(view.sync_status, last_synced));

    match &view.empty_state {
        Some(empty) => {
            let _ = writeln!(out, "   {}", empty.headline());
            let _ = writeln!(out, "   {}", empty.hint());
        }
        None => {
            for (n, item) in view.visible.iter().enumerate() {
                let mark = if item.completed { "x" } else { " " };
                let _ = writeln!(
                    out,
                    "{:>3}. [{mark}] {} ({}) · {}",
                    n + 1,
                    item.name,
                    item.quantity,
                    item.category()
                );
            }
        }
    }

    let _ = write!(out, "-- סה\"כ {}", view.total);
    for count in &view.counts {
        let _ = write!(out, " | {} {}", count.category, count.count);
    }
    out.push('\n');

    if let Some(line) = voice_line(view) {
        let _ = writeln!(out, "{line}");
    }
    out
}

fn sync_badge(status: SyncStatus, last_synced: Option<DateTime<Utc>>) -> String {
    match (status, last_synced) {
        (SyncStatus::Synced, Some(at)) => {
            format!("synced {}", at.with_timezone(&Local).format("%H:%M:%S"))
        }
        (status, _) => status.label().to_string(),
    }
}

fn voice_line(view: &ListView) -> Option<String> {
    if !view.voice_visible() {
        return None;
    }
    match view.voice_phase {
        VoicePhase::Idle => None,
        VoicePhase::Recording => Some("● מקליט... (voice לעצירה)".to_string()),
        VoicePhase::Processing => Some("… מעבד פקודה קולית".to_string()),
    }
}

/// Local completion figures, then the per-tag counts reported by the server.
pub fn stats(stats: &ListStats, tag_stats: &[TagStat]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "סה\"כ {} | נקנו {} | נותרו {} | {:.1}%",
        stats.total, stats.completed, stats.pending, stats.completion_rate
    );
    for progress in &stats.by_category {
        let _ = writeln!(
            out,
            "  {}: {}/{}",
            progress.category, progress.completed, progress.total
        );
    }
    if !tag_stats.is_empty() {
        let _ = writeln!(out, "server:");
        for stat in tag_stats {
            let _ = writeln!(
                out,
                "  {}: {} ({} נקנו)",
                stat.tag, stat.count, stat.completed_count
            );
        }
    }
    out
}

/// One-line text for events that are not answered by re-rendering the list.
pub fn event(event: &ControllerEvent) -> Option<String> {
    match event {
        ControllerEvent::Notice(text) => Some(format!("» {text}")),
        ControllerEvent::Alert(text) => Some(format!("! {text}")),
        ControllerEvent::VoicePhaseChanged(VoicePhase::Recording) => {
            Some("● מקליט... (voice לעצירה)".to_string())
        }
        ControllerEvent::SyncStatusChanged(SyncStatus::Error) => {
            Some("sync: error".to_string())
        }
        ControllerEvent::MicrophoneChanged(status) if !status.is_available() => {
            Some(format!("mic: {}", status.hint()))
        }
        _ => None,
    }
}

pub fn failure(err: &ApiError) -> String {
    match err.kind {
        FailureKind::Validation => format!("! {}", err.message),
        FailureKind::Device => format!("mic: {}", err.message),
        FailureKind::Transport => format!("server error: {}", err.message),
        FailureKind::Service => format!("voice service: {}", err.message),
    }
}

/// Whether the event should trigger a fresh list render.
pub fn redraws_list(event: &ControllerEvent) -> bool {
    matches!(
        event,
        ControllerEvent::ListUpdated | ControllerEvent::ViewChanged
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
