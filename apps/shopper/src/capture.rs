//! File-backed stand-in for a microphone.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use client_core::{voice::DEFAULT_AUDIO_MIME, AudioCapture, CaptureConstraints, CaptureError, CaptureStream};
use tracing::debug;

/// Bytes handed out per drain tick.
pub const SLICE_LEN: usize = 4 * 1024;

/// Each acquire re-reads the configured file, so a file that disappears or
/// loses its permissions is noticed on the next attempt.
#[derive(Clone, Default)]
pub struct FileAudioCapture {
    source: Arc<Mutex<Option<PathBuf>>>,
}

impl FileAudioCapture {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
        }
    }

    pub fn set_source(&self, path: PathBuf) {
        if let Ok(mut source) = self.source.lock() {
            *source = Some(path);
        }
    }

    pub fn source(&self) -> Option<PathBuf> {
        self.source.lock().ok().and_then(|source| source.clone())
    }
}

#[async_trait]
impl AudioCapture for FileAudioCapture {
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let path = self.source().ok_or(CaptureError::NoDevice)?;
        let data = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => CaptureError::NoDevice,
            ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::Stream(err.to_string()),
        })?;
        debug!(path = %path.display(), bytes = data.len(), ?constraints, "audio source opened");
        Ok(Box::new(FileStream {
            mime_type: mime_for(&path),
            data,
            offset: 0,
            stopped: false,
        }))
    }
}

fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::AUDIO)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string())
}

pub struct FileStream {
    data: Vec<u8>,
    offset: usize,
    mime_type: String,
    stopped: bool,
}

#[async_trait]
impl CaptureStream for FileStream {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        if self.stopped || self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + SLICE_LEN).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.data.clear();
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        env, fs,
        time::{SystemTime, UNIX_EPOCH},
    };

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = env::temp_dir().join(format!("shopper_capture_{suffix}"));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        fs::write(&path, bytes).expect("write audio");
        path
    }

    #[tokio::test]
    async fn no_source_means_no_device() {
        let capture = FileAudioCapture::default();
        let err = capture
            .acquire(CaptureConstraints::PROBE)
            .await
            .err()
            .expect("must fail");
        assert_eq!(err, CaptureError::NoDevice);
    }

    #[tokio::test]
    async fn missing_file_means_no_device() {
        let capture = FileAudioCapture::new(Some(PathBuf::from("/no/such/recording.webm")));
        let err = capture
            .acquire(CaptureConstraints::VOICE_COMMAND)
            .await
            .err()
            .expect("must fail");
        assert_eq!(err, CaptureError::NoDevice);
    }

    #[tokio::test]
    async fn streams_file_in_slices_until_exhausted() {
        let bytes = vec![7u8; SLICE_LEN + 10];
        let path = temp_file("command.ogg", &bytes);
        let capture = FileAudioCapture::new(Some(path.clone()));

        let mut stream = capture
            .acquire(CaptureConstraints::VOICE_COMMAND)
            .await
            .expect("acquire");

        assert_eq!(stream.mime_type(), "audio/ogg");
        assert_eq!(stream.read_chunk().await.unwrap().map(|c| c.len()), Some(SLICE_LEN));
        assert_eq!(stream.read_chunk().await.unwrap().map(|c| c.len()), Some(10));
        assert_eq!(stream.read_chunk().await.unwrap(), None);
        stream.stop();
        fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_webm() {
        let path = temp_file("command.bin", b"abc");
        let capture = FileAudioCapture::new(Some(path.clone()));

        let stream = capture
            .acquire(CaptureConstraints::PROBE)
            .await
            .expect("acquire");

        assert_eq!(stream.mime_type(), DEFAULT_AUDIO_MIME);
        fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
    }
}
