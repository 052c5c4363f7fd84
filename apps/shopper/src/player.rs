//! Voice-response playback: fetch the clip, then hand it to an external player.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use client_core::{resolve_audio_url, AudioPlayer};
use tokio::process::Command;
use tracing::info;
use url::Url;

const FALLBACK_FILE_NAME: &str = "response.mp3";

pub struct DownloadingPlayer {
    http: reqwest::Client,
    base_url: Url,
    audio_dir: PathBuf,
    command: Option<String>,
}

impl DownloadingPlayer {
    pub fn new(base_url: Url, audio_dir: PathBuf, command: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            audio_dir,
            command,
        }
    }

    async fn download(&self, url: &Url) -> anyhow::Result<PathBuf> {
        let bytes = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let path = self.audio_dir.join(file_name_for(url));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(path)
    }
}

#[async_trait]
impl AudioPlayer for DownloadingPlayer {
    async fn play(&self, audio_url: &str) -> anyhow::Result<()> {
        let url = resolve_audio_url(&self.base_url, audio_url)?;
        let path = self.download(&url).await?;
        info!(url = %url, path = %path.display(), "voice response downloaded");

        let Some(command) = self.command.as_deref() else {
            println!("voice response saved to {}", path.display());
            return Ok(());
        };
        run_player(command, &path).await
    }
}

async fn run_player(command: &str, path: &Path) -> anyhow::Result<()> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("empty player command");
    };
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .await
        .with_context(|| format!("failed to launch player '{program}'"))?;
    if !status.success() {
        bail!("player '{program}' exited with {status}");
    }
    Ok(())
}

/// Last path segment of the clip url, or a fixed name when there is none.
pub fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
