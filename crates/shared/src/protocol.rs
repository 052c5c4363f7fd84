use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId, SyncMarker, TagStat};

pub const TAGS_PATH: &str = "/api/tags";
pub const SHOPPING_LIST_PATH: &str = "/api/shopping-list";
pub const TAG_STATS_PATH: &str = "/api/tag-stats";
pub const TOGGLE_ITEM_PATH: &str = "/api/toggle-item";
pub const REMOVE_ITEM_PATH: &str = "/api/remove-item";
pub const CLEAR_LIST_PATH: &str = "/api/clear-list";
pub const ADD_ITEM_PATH: &str = "/api/add-item";
pub const VOICE_COMMAND_PATH: &str = "/api/voice-command";

/// Multipart field carrying the recorded audio.
pub const VOICE_UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShoppingListResponse {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub last_modified: Option<SyncMarker>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagStatsResponse {
    #[serde(default)]
    pub tag_stats: Vec<TagStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemIdRequest {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub quantity: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceCommandResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transcription: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_tolerates_missing_fields() {
        let parsed: ShoppingListResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.items.is_empty());
        assert!(parsed.last_modified.is_none());
    }

    #[test]
    fn voice_failure_body_parses_without_success_flag() {
        let parsed: VoiceCommandResponse =
            serde_json::from_str(r#"{"detail":"Voice command processing failed"}"#)
                .expect("parse");
        assert!(!parsed.success);
        assert!(parsed.response.is_none());
    }

    #[test]
    fn item_id_request_serializes_flat_id() {
        let body = serde_json::to_value(ItemIdRequest {
            item_id: ItemId::from("abc"),
        })
        .expect("serialize");
        assert_eq!(body, serde_json::json!({"item_id": "abc"}));
    }
}
