//! HTTP JSON contract with the shopping-list server.

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::ItemId,
    error::ServerErrorBody,
    protocol::{
        AddItemRequest, ItemIdRequest, ShoppingListResponse, TagStatsResponse, TagsResponse,
        VoiceCommandResponse, ADD_ITEM_PATH, CLEAR_LIST_PATH, REMOVE_ITEM_PATH,
        SHOPPING_LIST_PATH, TAGS_PATH, TAG_STATS_PATH, TOGGLE_ITEM_PATH, VOICE_COMMAND_PATH,
        VOICE_UPLOAD_FIELD,
    },
};
use url::Url;

use crate::error::{ClientError, ClientResult};

pub const VOICE_UPLOAD_FILENAME: &str = "voice_command.webm";

/// A finished recording ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl VoicePayload {
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: chunks.concat(),
            filename: VOICE_UPLOAD_FILENAME.to_string(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[async_trait]
pub trait ShoppingApi: Send + Sync {
    async fn fetch_tags(&self) -> ClientResult<TagsResponse>;
    async fn fetch_list(&self) -> ClientResult<ShoppingListResponse>;
    async fn fetch_tag_stats(&self) -> ClientResult<TagStatsResponse>;
    async fn toggle_item(&self, item_id: &ItemId) -> ClientResult<()>;
    async fn remove_item(&self, item_id: &ItemId) -> ClientResult<()>;
    async fn clear_list(&self) -> ClientResult<()>;
    async fn add_item(&self, request: &AddItemRequest) -> ClientResult<()>;
    /// Uploads a recording. A body that parses as a voice result is returned
    /// even on non-2xx so the caller can show the service's explanation.
    async fn send_voice_command(&self, payload: VoicePayload)
        -> ClientResult<VoiceCommandResponse>;
}

pub struct HttpShoppingApi {
    http: Client,
    base_url: Url,
}

impl HttpShoppingApi {
    pub fn new(server_url: &str) -> ClientResult<Self> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> ClientResult<T> {
        let res = self.http.get(self.endpoint(path)?).send().await?;
        let res = ensure_success(path, res).await?;
        Ok(res.json().await?)
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &'static str,
        body: &T,
    ) -> ClientResult<()> {
        let res = self.http.post(self.endpoint(path)?).json(body).send().await?;
        ensure_success(path, res).await?;
        Ok(())
    }

    async fn post_empty(&self, path: &'static str) -> ClientResult<()> {
        let res = self.http.post(self.endpoint(path)?).send().await?;
        ensure_success(path, res).await?;
        Ok(())
    }
}

#[async_trait]
impl ShoppingApi for HttpShoppingApi {
    async fn fetch_tags(&self) -> ClientResult<TagsResponse> {
        self.get_json(TAGS_PATH).await
    }

    async fn fetch_list(&self) -> ClientResult<ShoppingListResponse> {
        self.get_json(SHOPPING_LIST_PATH).await
    }

    async fn fetch_tag_stats(&self) -> ClientResult<TagStatsResponse> {
        self.get_json(TAG_STATS_PATH).await
    }

    async fn toggle_item(&self, item_id: &ItemId) -> ClientResult<()> {
        let body = ItemIdRequest {
            item_id: item_id.clone(),
        };
        self.post_json(TOGGLE_ITEM_PATH, &body).await
    }

    async fn remove_item(&self, item_id: &ItemId) -> ClientResult<()> {
        let body = ItemIdRequest {
            item_id: item_id.clone(),
        };
        self.post_json(REMOVE_ITEM_PATH, &body).await
    }

    async fn clear_list(&self) -> ClientResult<()> {
        self.post_empty(CLEAR_LIST_PATH).await
    }

    async fn add_item(&self, request: &AddItemRequest) -> ClientResult<()> {
        self.post_json(ADD_ITEM_PATH, request).await
    }

    async fn send_voice_command(
        &self,
        payload: VoicePayload,
    ) -> ClientResult<VoiceCommandResponse> {
        let part = multipart::Part::bytes(payload.bytes)
            .file_name(payload.filename)
            .mime_str(&payload.mime_type)?;
        let form = multipart::Form::new().part(VOICE_UPLOAD_FIELD, part);

        let res = self
            .http
            .post(self.endpoint(VOICE_COMMAND_PATH)?)
            .multipart(form)
            .send()
            .await?;
        let status = res.status();
        let body = res.bytes().await?;

        match serde_json::from_slice::<VoiceCommandResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ClientError::Status {
                endpoint: VOICE_COMMAND_PATH,
                status: status.as_u16(),
                detail: String::from_utf8_lossy(&body).into_owned(),
            }),
            Err(source) => Err(ClientError::Decode {
                endpoint: VOICE_COMMAND_PATH,
                source,
            }),
        }
    }
}

async fn ensure_success(endpoint: &'static str, res: Response) -> ClientResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let raw = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ServerErrorBody>(&raw)
        .map(|body| body.detail)
        .unwrap_or(raw);
    Err(ClientError::Status {
        endpoint,
        status: status.as_u16(),
        detail,
    })
}

/// Parses the server base url, making sure relative joins keep any path prefix.
pub fn parse_base_url(server_url: &str) -> ClientResult<Url> {
    let trimmed = server_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

/// Resolves an `audio_url` from a voice result. Absolute urls pass through,
/// server-relative paths are joined onto the base.
pub fn resolve_audio_url(base_url: &Url, audio_url: &str) -> ClientResult<Url> {
    match Url::parse(audio_url) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(base_url.join(audio_url)?),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_path_prefix() {
        let api = HttpShoppingApi::new("http://localhost:8000/shop").unwrap();
        assert_eq!(
            api.endpoint(SHOPPING_LIST_PATH).unwrap().as_str(),
            "http://localhost:8000/shop/api/shopping-list"
        );
    }

    #[test]
    fn audio_url_resolution() {
        let base = parse_base_url("http://localhost:8000").unwrap();
        assert_eq!(
            resolve_audio_url(&base, "/tts/1.mp3").unwrap().as_str(),
            "http://localhost:8000/tts/1.mp3"
        );
        assert_eq!(
            resolve_audio_url(&base, "https://cdn.example.com/a.mp3")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.mp3"
        );
    }

    #[test]
    fn payload_concatenates_chunks_in_order() {
        let payload =
            VoicePayload::from_chunks(vec![b"ab".to_vec(), b"cd".to_vec()], "audio/webm");
        assert_eq!(payload.bytes, b"abcd");
        assert_eq!(payload.filename, VOICE_UPLOAD_FILENAME);
        assert!(VoicePayload::from_chunks(Vec::new(), "audio/webm").is_empty());
    }

    #[test]
    fn unparseable_server_url_is_rejected() {
        assert!(matches!(
            HttpShoppingApi::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
