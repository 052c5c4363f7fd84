pub mod api;
pub mod controller;
pub mod error;
pub mod state;
pub mod sync;
pub mod view;
pub mod voice;

pub use api::{resolve_audio_url, HttpShoppingApi, ShoppingApi, VoicePayload};
pub use controller::{
    AutoConfirm, Command, Confirmer, ControllerEvent, ItemDraft, ShoppingController,
    VoiceOutcome, VoiceToggle,
};
pub use error::{ClientError, ClientResult};
pub use state::{AppState, MicrophoneStatus, VoicePhase};
pub use sync::{SyncLoop, POLL_INTERVAL};
pub use view::{ListStats, ListView};
pub use voice::{
    AudioCapture, AudioPlayer, CaptureConstraints, CaptureError, CaptureStream, VoiceTimings,
};
