mod capture;
mod config;
mod player;
mod render;
mod repl;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{
    ControllerEvent, HttpShoppingApi, ListView, ShoppingController, SyncLoop, VoiceTimings,
    POLL_INTERVAL,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    capture::FileAudioCapture,
    config::Settings,
    player::DownloadingPlayer,
    repl::{SharedInput, StdinConfirmer},
};

#[derive(Parser, Debug)]
struct Args {
    /// Base url of the shopping-list server.
    #[arg(long)]
    server_url: Option<String>,
    /// Where downloaded voice responses are stored.
    #[arg(long)]
    audio_dir: Option<PathBuf>,
    /// External command used to play voice responses, e.g. "mpv --really-quiet".
    #[arg(long)]
    player_command: Option<String>,
    /// Audio file used as the initial voice input.
    #[arg(long)]
    voice_file: Option<PathBuf>,
    /// Disable the background sync loop.
    #[arg(long)]
    no_sync: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.audio_dir {
            settings.audio_dir = v.clone();
        }
        if let Some(v) = &self.player_command {
            settings.player_command = Some(v.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    args.apply(&mut settings);
    config::prepare_audio_dir(&settings.audio_dir)?;
    info!(server_url = %settings.server_url, audio_dir = %settings.audio_dir.display(), "starting shopper");

    let api = HttpShoppingApi::new(&settings.server_url)?;
    let player = DownloadingPlayer::new(
        api.base_url().clone(),
        settings.audio_dir.clone(),
        settings.player_command.clone(),
    );
    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let capture = FileAudioCapture::new(args.voice_file.clone());
    let controller = ShoppingController::new_with_dependencies(
        Arc::new(api),
        Arc::new(capture.clone()),
        Arc::new(player),
        Arc::new(StdinConfirmer::new(input.clone())),
        VoiceTimings::default(),
    );

    controller.start().await;
    let state = controller.snapshot().await;
    print!("{}", render::list(&ListView::project(&state), state.last_synced_at));
    if !state.microphone.is_available() {
        println!("mic: {}", state.microphone.hint());
    }
    let printer = spawn_event_printer(controller.clone(), controller.subscribe_events());

    let sync = (!args.no_sync).then(|| SyncLoop::spawn(controller.clone(), POLL_INTERVAL));

    let result = repl::run(&controller, &capture, &input).await;

    controller.shutdown().await;
    if let Some(sync) = sync {
        sync.shutdown().await;
    }
    printer.abort();
    info!("bye");
    result
}

fn spawn_event_printer(
    controller: Arc<ShoppingController>,
    mut events: broadcast::Receiver<ControllerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event printer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if let Some(line) = render::event(&event) {
                println!("{line}");
            }
            if render::redraws_list(&event) {
                let state = controller.snapshot().await;
                print!("{}", render::list(&ListView::project(&state), state.last_synced_at));
            }
        }
    })
}
