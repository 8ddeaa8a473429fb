use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// One row of extraction output. Usually an object, but the service makes
/// no promise, so it stays an untyped JSON value.
pub type Record = Value;

/// Columns plus one display string per (record, column) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProjection {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableProjection {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Body of `POST /extract`. Only `data` feeds the table; anything else the
/// service adds (e.g. `content_too_long`) is kept for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_too_long: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    #[default]
    EntireDocument,
    Retrieval,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::EntireDocument => "entire_document",
            ExtractionMode::Retrieval => "retrieval",
        }
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "entire_document" => Ok(ExtractionMode::EntireDocument),
            "retrieval" => Ok(ExtractionMode::Retrieval),
            other => Err(format!(
                "unknown mode '{}', expected entire_document or retrieval",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    Text(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub extractor_id: String,
    pub source: ExtractionSource,
    pub mode: ExtractionMode,
    pub model_name: Option<String>,
    /// Run against a shared extractor; `extractor_id` is then the share token.
    pub shared: bool,
}

impl ExtractionRequest {
    pub fn text(extractor_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            extractor_id: extractor_id.into(),
            source: ExtractionSource::Text(text.into()),
            mode: ExtractionMode::default(),
            model_name: None,
            shared: false,
        }
    }

    pub fn file(extractor_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            extractor_id: extractor_id.into(),
            source: ExtractionSource::File(path.into()),
            mode: ExtractionMode::default(),
            model_name: None,
            shared: false,
        }
    }

    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extractor {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub instruction: String,
}

/// What `GET /shared/extractors/{token}` returns; the real uuid is withheld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedExtractor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExtractor {
    pub name: String,
    pub description: String,
    pub schema: Value,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareResponse {
    pub share_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub description: String,
    #[serde(rename = "jsonSchema")]
    pub json_schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorDefinition {
    pub name: String,
    pub json_schema: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    #[serde(default)]
    pub available_models: Vec<String>,
    #[serde(default)]
    pub max_file_size_mb: u64,
    #[serde(default)]
    pub accepted_mimetypes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub uuid: String,
    pub extractor_id: String,
    pub content: String,
    /// Expected output. Older services store it as JSON text, newer ones as
    /// the structured list itself, so either shape is accepted.
    #[serde(default)]
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExample {
    pub extractor_id: String,
    pub content: String,
    pub output: Value,
}

#[derive(Debug, Clone)]
pub struct RenderedOutput {
    pub format: crate::core::render::OutputFormat,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub extractor_id: String,
    pub projection: TableProjection,
    pub outputs: Vec<RenderedOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extraction_response_keeps_extra_fields() {
        let response: ExtractionResponse = serde_json::from_value(json!({
            "data": [{"name": "Alice"}],
            "content_too_long": true,
            "trace_id": "abc"
        }))
        .unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.content_too_long, Some(true));
        assert_eq!(response.extra.get("trace_id").unwrap(), "abc");
    }

    #[test]
    fn test_extraction_response_without_data() {
        let response: ExtractionResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.data.is_empty());
        assert_eq!(response.content_too_long, None);
    }

    #[test]
    fn test_mode_round_trips_through_str() {
        assert_eq!(
            "retrieval".parse::<ExtractionMode>().unwrap(),
            ExtractionMode::Retrieval
        );
        assert_eq!(ExtractionMode::default().as_str(), "entire_document");
        assert!("everything".parse::<ExtractionMode>().is_err());
    }

    #[test]
    fn test_example_output_accepts_list_or_text() {
        let structured: Example = serde_json::from_str(
            r#"{"uuid":"u","extractor_id":"e","content":"c","output":[{"name":"A"}]}"#,
        )
        .unwrap();
        assert_eq!(structured.output, json!([{"name": "A"}]));

        let text: Example = serde_json::from_str(
            r#"{"uuid":"u","extractor_id":"e","content":"c","output":"[{\"name\":\"A\"}]"}"#,
        )
        .unwrap();
        assert_eq!(text.output, json!(r#"[{"name":"A"}]"#));
    }
}
