//! Command dispatch and the two async workflows (list refresh, voice command).

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{CategorySelection, ItemId, StatusFilter, SyncStatus, DEFAULT_CATEGORY},
    error::FailureKind,
    protocol::AddItemRequest,
};
use tokio::{
    sync::{broadcast, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    api::{ShoppingApi, VoicePayload},
    error::{ClientError, ClientResult},
    state::{AppState, MicrophoneStatus, SnapshotOutcome, VoicePhase},
    view::{ListStats, ListView},
    voice::{
        record_session, AudioCapture, AudioPlayer, CaptureConstraints, CaptureError,
        CaptureStream, RecordingOutcome, SilentPlayer, VoiceTimings,
    },
};

pub mod messages {
    pub const MIC_UNAVAILABLE: &str = "גישה למיקרופון לא זמינה";
    pub const MIC_PERMISSION_REQUIRED: &str = "יש צורך בהרשאה לגישה למיקרופון";
    pub const NOTHING_HEARD: &str = "לא נקלט קול";
    pub const COMMAND_SUCCEEDED: &str = "פקודה בוצעה בהצלחה!";
    pub const COMMAND_FALLBACK: &str = "לא הצלחתי לעבד את הפקודה";
    pub const VOICE_PROCESSING_ERROR: &str = "שגיאה בעיבוד הפקודה הקולית";
    pub const PLAYBACK_FAILED: &str = "לא ניתן להשמיע תגובה קולית";
    pub const NAME_REQUIRED: &str = "אנא הכנס שם פריט";
    pub const ADD_FAILED: &str = "שגיאה בהוספת הפריט";
    pub const CONFIRM_DELETE: &str = "האם אתה בטוח שברצונך למחוק פריט זה?";
    pub const CONFIRM_CLEAR: &str = "האם אתה בטוח שברצונך למחוק את כל הפריטים?";

    pub fn heard(transcription: &str) -> String {
        format!("שמעתי: \"{transcription}\"")
    }

    pub fn added(name: &str, tag: &str) -> String {
        format!("נוסף: {name} בקטגוריה {tag}")
    }

    pub fn recording_start_failed(reason: &str) -> String {
        format!("שגיאה בהפעלת ההקלטה: {reason}")
    }

    pub fn recording_failed(reason: &str) -> String {
        format!("שגיאה בהקלטה: {reason}")
    }
}

/// Interactive yes/no gate in front of destructive requests.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

pub struct MissingAudioCapture;

#[async_trait]
impl AudioCapture for MissingAudioCapture {
    async fn acquire(
        &self,
        _constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::Unsupported(
            "no capture backend configured".to_string(),
        ))
    }
}

/// Fields of the add-item form before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: String,
    pub tag: String,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_request(self) -> ClientResult<AddItemRequest> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation(messages::NAME_REQUIRED.to_string()));
        }
        let quantity = match self.quantity.trim() {
            "" => "1",
            q => q,
        };
        let tag = match self.tag.trim() {
            "" => DEFAULT_CATEGORY,
            t => t,
        };
        Ok(AddItemRequest {
            name: name.to_string(),
            quantity: quantity.to_string(),
            tag: tag.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Refresh,
    Poll,
    LoadCategories,
    LoadStats,
    CheckMicrophone,
    ToggleItem { item_id: ItemId },
    DeleteItem { item_id: ItemId },
    ClearList,
    AddItem(ItemDraft),
    SelectCategory(CategorySelection),
    SetFilter(StatusFilter),
    ToggleVoice,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Refresh => "refresh",
            Command::Poll => "poll",
            Command::LoadCategories => "load_categories",
            Command::LoadStats => "load_stats",
            Command::CheckMicrophone => "check_microphone",
            Command::ToggleItem { .. } => "toggle_item",
            Command::DeleteItem { .. } => "delete_item",
            Command::ClearList => "clear_list",
            Command::AddItem(_) => "add_item",
            Command::SelectCategory(_) => "select_category",
            Command::SetFilter(_) => "set_filter",
            Command::ToggleVoice => "toggle_voice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceToggle {
    Started,
    Stopped,
    /// Processing is in flight; the toggle is ignored.
    Busy,
    Unavailable,
    Failed(CaptureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    NothingHeard,
    Completed { transcription: String },
    Rejected { message: String },
    CaptureFailed(String),
    Failed(String),
}

impl VoiceOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            VoiceOutcome::NothingHeard | VoiceOutcome::Completed { .. } => None,
            VoiceOutcome::Rejected { .. } => Some(FailureKind::Service),
            VoiceOutcome::CaptureFailed(_) => Some(FailureKind::Device),
            VoiceOutcome::Failed(_) => Some(FailureKind::Transport),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The item cache was replaced.
    ListUpdated,
    /// Category or status filter changed locally.
    ViewChanged,
    CategoriesLoaded(Vec<String>),
    SyncStatusChanged(SyncStatus),
    MicrophoneChanged(MicrophoneStatus),
    VoicePhaseChanged(VoicePhase),
    Transcription(String),
    VoiceFinished(VoiceOutcome),
    StatsLoaded(ListStats),
    Notice(String),
    /// Blocking message the front end must acknowledge.
    Alert(String),
}

struct ActiveRecording {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy)]
enum FetchMode {
    Full,
    Poll,
}

pub struct ShoppingController {
    api: Arc<dyn ShoppingApi>,
    capture: Arc<dyn AudioCapture>,
    player: Arc<dyn AudioPlayer>,
    confirmer: Arc<dyn Confirmer>,
    timings: VoiceTimings,
    state: Mutex<AppState>,
    recording: Mutex<Option<ActiveRecording>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ShoppingController {
    pub fn new(api: Arc<dyn ShoppingApi>) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            Arc::new(MissingAudioCapture),
            Arc::new(SilentPlayer),
            Arc::new(AutoConfirm),
            VoiceTimings::default(),
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn ShoppingApi>,
        capture: Arc<dyn AudioCapture>,
        player: Arc<dyn AudioPlayer>,
        confirmer: Arc<dyn Confirmer>,
        timings: VoiceTimings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            capture,
            player,
            confirmer,
            timings,
            state: Mutex::new(AppState::new()),
            recording: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ControllerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn notice(&self, message: impl Into<String>) {
        self.emit(ControllerEvent::Notice(message.into()));
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    pub async fn view(&self) -> ListView {
        ListView::project(&*self.state.lock().await)
    }

    /// Startup sequence: categories, first full load and the microphone probe.
    pub async fn start(&self) {
        let (categories, list, microphone) = tokio::join!(
            self.load_categories(),
            self.refresh(),
            self.check_microphone()
        );
        debug!(
            categories_ok = categories.is_ok(),
            list_ok = list.is_ok(),
            ?microphone,
            "controller started"
        );
    }

    pub async fn dispatch(self: &Arc<Self>, command: Command) -> ClientResult<()> {
        debug!(command = command.name(), "dispatching command");
        match command {
            Command::Refresh => self.refresh().await,
            Command::Poll => self.poll_once().await.map(|_| ()),
            Command::LoadCategories => self.load_categories().await,
            Command::LoadStats => self.load_stats().await.map(|_| ()),
            Command::CheckMicrophone => {
                self.check_microphone().await;
                Ok(())
            }
            Command::ToggleItem { item_id } => self.toggle_item(&item_id).await,
            Command::DeleteItem { item_id } => self.delete_item(&item_id).await.map(|_| ()),
            Command::ClearList => self.clear_list().await.map(|_| ()),
            Command::AddItem(draft) => self.add_item(draft).await,
            Command::SelectCategory(selection) => {
                self.select_category(selection).await;
                Ok(())
            }
            Command::SetFilter(filter) => {
                self.set_filter(filter).await;
                Ok(())
            }
            Command::ToggleVoice => match self.toggle_voice().await {
                VoiceToggle::Failed(err) => Err(err.into()),
                _ => Ok(()),
            },
        }
    }

    async fn update_sync_status(&self, status: SyncStatus) {
        let changed = self.state.lock().await.set_sync_status(status);
        if changed {
            self.emit(ControllerEvent::SyncStatusChanged(status));
        }
    }

    pub async fn load_categories(&self) -> ClientResult<()> {
        match self.api.fetch_tags().await {
            Ok(response) => {
                self.state
                    .lock()
                    .await
                    .set_categories(response.tags.clone());
                self.emit(ControllerEvent::CategoriesLoaded(response.tags));
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to load categories");
                Err(err)
            }
        }
    }

    /// Full load. The cache is replaced with whatever the server returns.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.fetch_list(FetchMode::Full).await.map(|_| ())
    }

    /// One sync-loop tick. The cache is only replaced when the marker moved.
    pub async fn poll_once(&self) -> ClientResult<SnapshotOutcome> {
        self.fetch_list(FetchMode::Poll).await
    }

    async fn fetch_list(&self, mode: FetchMode) -> ClientResult<SnapshotOutcome> {
        let token = self.state.lock().await.begin_fetch();
        match self.api.fetch_list().await {
            Ok(response) => {
                let (outcome, status_changed) = {
                    let mut state = self.state.lock().await;
                    let before = state.sync_status;
                    let outcome = match mode {
                        FetchMode::Full => state.apply_snapshot(token, response, Utc::now()),
                        FetchMode::Poll => state.apply_poll(token, response, Utc::now()),
                    };
                    (outcome, before != state.sync_status)
                };
                match outcome {
                    SnapshotOutcome::Replaced => self.emit(ControllerEvent::ListUpdated),
                    SnapshotOutcome::Stale => {
                        debug!(token = token.value(), "discarding stale list response")
                    }
                    SnapshotOutcome::Unchanged => {}
                }
                if status_changed {
                    self.emit(ControllerEvent::SyncStatusChanged(SyncStatus::Synced));
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!(?mode, error = %err, "list fetch failed");
                if self.state.lock().await.fail_fetch(token) {
                    self.emit(ControllerEvent::SyncStatusChanged(SyncStatus::Error));
                }
                Err(err)
            }
        }
    }

    /// Runs a confirmed server mutation, then re-reads the list. A failure of
    /// the follow-up read only shows up on the sync indicator.
    async fn run_mutation<F>(&self, op: &'static str, request: F) -> ClientResult<()>
    where
        F: Future<Output = ClientResult<()>>,
    {
        self.update_sync_status(SyncStatus::Syncing).await;
        if let Err(err) = request.await {
            warn!(op, error = %err, "mutation failed");
            self.update_sync_status(SyncStatus::Error).await;
            return Err(err);
        }
        info!(op, "mutation confirmed; refreshing list");
        if let Err(err) = self.refresh().await {
            debug!(op, error = %err, "refresh after mutation failed");
        }
        Ok(())
    }

    pub async fn toggle_item(&self, item_id: &ItemId) -> ClientResult<()> {
        self.run_mutation("toggle_item", self.api.toggle_item(item_id))
            .await
    }

    /// Returns `false` when the user declined and no request was sent.
    pub async fn delete_item(&self, item_id: &ItemId) -> ClientResult<bool> {
        if !self.confirmer.confirm(messages::CONFIRM_DELETE).await {
            return Ok(false);
        }
        self.run_mutation("remove_item", self.api.remove_item(item_id))
            .await?;
        Ok(true)
    }

    pub async fn clear_list(&self) -> ClientResult<bool> {
        if !self.confirmer.confirm(messages::CONFIRM_CLEAR).await {
            return Ok(false);
        }
        self.run_mutation("clear_list", self.api.clear_list()).await?;
        Ok(true)
    }

    pub async fn add_item(&self, draft: ItemDraft) -> ClientResult<()> {
        let request = match draft.into_request() {
            Ok(request) => request,
            Err(err) => {
                self.emit(ControllerEvent::Alert(err.to_string()));
                return Err(err);
            }
        };
        if let Err(err) = self
            .run_mutation("add_item", self.api.add_item(&request))
            .await
        {
            self.emit(ControllerEvent::Alert(messages::ADD_FAILED.to_string()));
            return Err(err);
        }
        self.notice(messages::added(&request.name, &request.tag));
        Ok(())
    }

    pub async fn load_stats(&self) -> ClientResult<ListStats> {
        let response = self.api.fetch_tag_stats().await.map_err(|err| {
            error!(error = %err, "failed to load tag stats");
            err
        })?;
        let stats = {
            let mut state = self.state.lock().await;
            state.set_tag_stats(response.tag_stats);
            ListStats::compute(&state.items)
        };
        self.emit(ControllerEvent::StatsLoaded(stats.clone()));
        Ok(stats)
    }

    pub async fn select_category(&self, selection: CategorySelection) {
        self.state.lock().await.select_category(selection);
        self.emit(ControllerEvent::ViewChanged);
    }

    pub async fn set_filter(&self, filter: StatusFilter) {
        self.state.lock().await.set_status_filter(filter);
        self.emit(ControllerEvent::ViewChanged);
    }

    async fn update_microphone(&self, status: MicrophoneStatus) {
        if self.state.lock().await.set_microphone(status) {
            self.emit(ControllerEvent::MicrophoneChanged(status));
        }
    }

    async fn set_voice_phase(&self, phase: VoicePhase) {
        self.state.lock().await.set_voice_phase(phase);
        self.emit(ControllerEvent::VoicePhaseChanged(phase));
    }

    async fn advance_to_processing(&self) {
        if self.state.lock().await.advance_to_processing() {
            self.emit(ControllerEvent::VoicePhaseChanged(VoicePhase::Processing));
        }
    }

    /// Probes the microphone and releases it straight away. After a denial,
    /// or while the voice workflow is busy, no device is touched and the
    /// current status is returned.
    pub async fn check_microphone(&self) -> MicrophoneStatus {
        {
            let state = self.state.lock().await;
            if state.microphone == MicrophoneStatus::NoPermission
                || state.voice_phase != VoicePhase::Idle
            {
                debug!(microphone = ?state.microphone, phase = ?state.voice_phase, "skipping microphone probe");
                return state.microphone;
            }
        }
        let status = match self.capture.acquire(CaptureConstraints::PROBE).await {
            Ok(mut stream) => {
                stream.stop();
                MicrophoneStatus::Ready
            }
            Err(CaptureError::PermissionDenied) => MicrophoneStatus::NoPermission,
            Err(CaptureError::NoDevice) => MicrophoneStatus::NoDevice,
            Err(err) => {
                debug!(error = %err, "microphone probe failed");
                MicrophoneStatus::NotSupported
            }
        };
        info!(?status, "microphone availability checked");
        self.update_microphone(status).await;
        self.state.lock().await.microphone
    }

    pub async fn toggle_voice(self: &Arc<Self>) -> VoiceToggle {
        let (microphone, phase) = {
            let state = self.state.lock().await;
            (state.microphone, state.voice_phase)
        };
        if !microphone.is_available() {
            self.notice(messages::MIC_UNAVAILABLE);
            return VoiceToggle::Unavailable;
        }
        match phase {
            VoicePhase::Idle => self.start_recording().await,
            VoicePhase::Recording => {
                self.stop_recording().await;
                VoiceToggle::Stopped
            }
            VoicePhase::Processing => VoiceToggle::Busy,
        }
    }

    pub async fn start_recording(self: &Arc<Self>) -> VoiceToggle {
        {
            let mut state = self.state.lock().await;
            if !state.microphone.is_available() {
                return VoiceToggle::Unavailable;
            }
            if !state.try_begin_recording() {
                return VoiceToggle::Busy;
            }
        }

        let stream = match self
            .capture
            .acquire(CaptureConstraints::VOICE_COMMAND)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "could not start recording");
                if err == CaptureError::PermissionDenied {
                    self.update_microphone(MicrophoneStatus::NoPermission).await;
                    self.notice(messages::MIC_PERMISSION_REQUIRED);
                } else {
                    self.notice(messages::recording_start_failed(&err.to_string()));
                }
                self.set_voice_phase(VoicePhase::Idle).await;
                return VoiceToggle::Failed(err);
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        // held until the slot is filled so a fast finish cannot race it
        let mut slot = self.recording.lock().await;
        let controller = Arc::clone(self);
        let timings = self.timings;
        let task = tokio::spawn(async move {
            let outcome = record_session(stream, stop_rx, timings).await;
            controller.finish_recording(outcome).await;
        });
        *slot = Some(ActiveRecording {
            stop_tx: Some(stop_tx),
            task,
        });
        drop(slot);

        info!("recording started");
        self.emit(ControllerEvent::VoicePhaseChanged(VoicePhase::Recording));
        VoiceToggle::Started
    }

    /// Returns `false` when nothing was recording.
    pub async fn stop_recording(&self) -> bool {
        let stop_tx = {
            let mut slot = self.recording.lock().await;
            slot.as_mut().and_then(|active| active.stop_tx.take())
        };
        let Some(stop_tx) = stop_tx else {
            return false;
        };
        info!("recording stopped by user");
        // a watchdog finish may already have brought the phase back to idle
        self.advance_to_processing().await;
        // the session may already be ending on its own watchdog
        let _ = stop_tx.send(());
        true
    }

    async fn finish_recording(&self, outcome: RecordingOutcome) -> VoiceOutcome {
        self.recording.lock().await.take();
        self.advance_to_processing().await;

        if let Some(err) = outcome.error {
            self.notice(messages::recording_failed(&err.to_string()));
            let result = VoiceOutcome::CaptureFailed(err.to_string());
            self.finish_voice(result.clone()).await;
            return result;
        }

        info!(
            chunks = outcome.chunks.len(),
            bytes = outcome.byte_len(),
            reason = ?outcome.reason,
            "processing recording"
        );
        let payload = VoicePayload::from_chunks(outcome.chunks, outcome.mime_type);
        self.process_recording(payload).await
    }

    /// Uploads a recording and applies the result. The workflow always ends
    /// back in `Idle`.
    pub async fn process_recording(&self, payload: VoicePayload) -> VoiceOutcome {
        let result = self.process_payload(payload).await;
        self.finish_voice(result.clone()).await;
        result
    }

    async fn finish_voice(&self, outcome: VoiceOutcome) {
        debug!(failure = ?outcome.failure_kind(), "voice workflow finished");
        self.set_voice_phase(VoicePhase::Idle).await;
        self.emit(ControllerEvent::VoiceFinished(outcome));
    }

    async fn process_payload(&self, payload: VoicePayload) -> VoiceOutcome {
        if payload.is_empty() {
            self.notice(messages::NOTHING_HEARD);
            return VoiceOutcome::NothingHeard;
        }

        self.update_sync_status(SyncStatus::Syncing).await;
        match self.api.send_voice_command(payload).await {
            Ok(result) if result.success => {
                info!(transcription = %result.transcription, "voice command accepted");
                self.notice(messages::heard(&result.transcription));
                self.emit(ControllerEvent::Transcription(result.transcription.clone()));
                if let Some(audio_url) = result.audio_url.as_deref() {
                    self.play_response(audio_url).await;
                }
                if let Err(err) = self.refresh().await {
                    debug!(error = %err, "refresh after voice command failed");
                }
                self.schedule_success_notice();
                VoiceOutcome::Completed {
                    transcription: result.transcription,
                }
            }
            Ok(result) => {
                warn!(error = ?result.error, "voice command rejected by service");
                let message = result
                    .response
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| messages::COMMAND_FALLBACK.to_string());
                self.notice(message.clone());
                if let Some(audio_url) = result.audio_url.as_deref() {
                    self.play_response(audio_url).await;
                }
                self.update_sync_status(SyncStatus::Error).await;
                VoiceOutcome::Rejected { message }
            }
            Err(err) => {
                error!(error = %err, "voice command upload failed");
                self.update_sync_status(SyncStatus::Error).await;
                self.notice(messages::VOICE_PROCESSING_ERROR);
                VoiceOutcome::Failed(err.to_string())
            }
        }
    }

    async fn play_response(&self, audio_url: &str) {
        if let Err(err) = self.player.play(audio_url).await {
            warn!(audio_url, error = %err, "could not play voice response");
            self.notice(messages::PLAYBACK_FAILED);
        }
    }

    fn schedule_success_notice(&self) {
        let events = self.events.clone();
        let delay = self.timings.success_notice_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ControllerEvent::Notice(
                messages::COMMAND_SUCCEEDED.to_string(),
            ));
        });
    }

    /// Abandons any in-flight recording without uploading it.
    pub async fn shutdown(&self) {
        if let Some(active) = self.recording.lock().await.take() {
            active.task.abort();
            self.set_voice_phase(VoicePhase::Idle).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
