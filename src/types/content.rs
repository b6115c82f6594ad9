//! `ContentBlock`: a discriminated union tagged by the wire field `type` (§3, §4.3).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::core::Meta;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextContent),
    Image(ImageContent),
    Audio(AudioContent),
    ResourceLink(ResourceLinkContent),
    Resource(EmbeddedResourceContent),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioContent {
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLinkContent {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedResourceContent {
    pub resource: EmbeddedResource,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_text_variant_by_type_tag() {
        let v = json!({"type": "text", "text": "hello"});
        let block: ContentBlock = serde_json::from_value(v).unwrap();
        match block {
            ContentBlock::Text(t) => assert_eq!(t.text, "hello"),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_a_hard_decode_error() {
        let v = json!({"type": "mystery"});
        assert!(serde_json::from_value::<ContentBlock>(v).is_err());
    }

    #[test]
    fn encode_omits_absent_optional_fields() {
        let block = ContentBlock::Text(TextContent {
            text: "hi".into(),
            annotations: None,
            meta: None,
        });
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn round_trip() {
        let block = ContentBlock::ResourceLink(ResourceLinkContent {
            uri: "file:///a".into(),
            name: "a".into(),
            mime_type: Some("text/plain".into()),
            size: Some(12),
            meta: None,
        });
        let v = serde_json::to_value(&block).unwrap();
        let back: ContentBlock = serde_json::from_value(v).unwrap();
        match (block, back) {
            (ContentBlock::ResourceLink(a), ContentBlock::ResourceLink(b)) => {
                assert_eq!(a.uri, b.uri);
                assert_eq!(a.size, b.size);
            }
            _ => panic!("variant mismatch"),
        }
    }
}
