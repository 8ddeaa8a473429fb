use crate::core::cache::{tags, QueryCache, QueryKey};
use crate::core::identity::ApiKey;
use crate::domain::model::{
    CreateExample, CreateExtractor, Example, ExtractionRequest, ExtractionResponse,
    ExtractionSource, Extractor, ExtractorDefinition, ServerConfiguration, ShareResponse,
    SharedExtractor, SuggestRequest,
};
use crate::domain::ports::{ConfigProvider, ExtractorApi};
use crate::utils::error::{ExtractError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const API_KEY_HEADER: &str = "x-key";

/// Async client for the extractor service REST API.
pub struct ExtractorClient {
    http: Client,
    base_url: Url,
    cache: Option<Arc<QueryCache>>,
}

impl ExtractorClient {
    pub fn new<C: ConfigProvider + ?Sized>(config: &C, api_key: &ApiKey) -> Result<Self> {
        let client = Self::from_parts(
            config.base_url(),
            api_key,
            config.request_timeout(),
            &config.extra_headers(),
        )?;
        if config.cache_enabled() {
            Ok(client.with_cache(Arc::new(QueryCache::new())))
        } else {
            Ok(client)
        }
    }

    pub fn from_parts(
        base_url: &str,
        api_key: &ApiKey,
        timeout: Duration,
        extra_headers: &[(String, String)],
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ExtractError::InvalidConfigValueError {
                    field: "service.headers".to_string(),
                    value: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ExtractError::InvalidConfigValueError {
                    field: "service.headers".to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(name, value);
        }
        let key = HeaderValue::from_str(api_key.as_str()).map_err(|e| {
            ExtractError::ValidationError {
                message: format!("API key is not a valid header value: {}", e),
            }
        })?;
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn list_extractors(&self, limit: usize, offset: usize) -> Result<Vec<Extractor>> {
        let key = QueryKey::new([
            tags::EXTRACTORS.to_string(),
            limit.to_string(),
            offset.to_string(),
        ]);
        let request = self
            .http
            .get(self.url("extractors")?)
            .query(&[("limit", limit), ("offset", offset)]);
        self.cached_fetch(key, request).await
    }

    pub async fn get_extractor(&self, uuid: &str) -> Result<Extractor> {
        let key = QueryKey::new([tags::EXTRACTOR, uuid, "false"]);
        let request = self.http.get(self.url(&format!("extractors/{}", uuid))?);
        self.cached_fetch(key, request).await
    }

    pub async fn get_shared_extractor(&self, share_token: &str) -> Result<SharedExtractor> {
        let key = QueryKey::new([tags::EXTRACTOR, share_token, "true"]);
        let request = self
            .http
            .get(self.url(&format!("shared/extractors/{}", share_token))?);
        self.cached_fetch(key, request).await
    }

    pub async fn create_extractor(&self, extractor: &CreateExtractor) -> Result<String> {
        tracing::info!("Creating extractor '{}'", extractor.name);
        let request = self.http.post(self.url("extractors")?).json(extractor);
        let body: Value = send_json(request).await?;
        self.invalidate(tags::EXTRACTORS).await;
        uuid_from_body(body)
    }

    pub async fn delete_extractor(&self, uuid: &str) -> Result<()> {
        tracing::info!("Deleting extractor {}", uuid);
        let request = self.http.delete(self.url(&format!("extractors/{}", uuid))?);
        check_status(request.send().await?).await?;
        self.invalidate(tags::EXTRACTORS).await;
        self.invalidate(tags::EXTRACTOR).await;
        Ok(())
    }

    pub async fn share_extractor(&self, uuid: &str) -> Result<ShareResponse> {
        let request = self
            .http
            .post(self.url(&format!("extractors/{}/share", uuid))?);
        send_json(request).await
    }

    /// Ask the service to draft an extractor. An empty description is not
    /// worth a round trip and yields `None`.
    pub async fn suggest_extractor(
        &self,
        suggestion: &SuggestRequest,
    ) -> Result<Option<ExtractorDefinition>> {
        if suggestion.description.is_empty() {
            return Ok(None);
        }
        let request = self.http.post(self.url("suggest")?).json(suggestion);
        send_json(request).await.map(Some)
    }

    pub async fn configuration(&self) -> Result<ServerConfiguration> {
        let key = QueryKey::new([tags::CONFIGURATION]);
        let request = self.http.get(self.url("configuration")?);
        self.cached_fetch(key, request).await
    }

    pub async fn list_examples(
        &self,
        extractor_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Example>> {
        let key = QueryKey::new([
            tags::EXAMPLES.to_string(),
            extractor_id.to_string(),
            limit.to_string(),
            offset.to_string(),
        ]);
        let request = self.http.get(self.url("examples")?).query(&[
            ("extractor_id", extractor_id.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        self.cached_fetch(key, request).await
    }

    pub async fn create_example(&self, example: &CreateExample) -> Result<String> {
        let request = self.http.post(self.url("examples")?).json(example);
        let body: Value = send_json(request).await?;
        self.invalidate(tags::EXAMPLES).await;
        uuid_from_body(body)
    }

    pub async fn delete_example(&self, uuid: &str) -> Result<()> {
        let request = self.http.delete(self.url(&format!("examples/{}", uuid))?);
        check_status(request.send().await?).await?;
        self.invalidate(tags::EXAMPLES).await;
        Ok(())
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResponse> {
        let endpoint = if request.shared { "extract/shared" } else { "extract" };
        let form = build_form(request).await?;

        tracing::info!(
            "Running extraction with {} ({})",
            request.extractor_id,
            request.mode.as_str()
        );
        let response: ExtractionResponse =
            send_json(self.http.post(self.url(endpoint)?).multipart(form)).await?;
        tracing::debug!("Extraction returned {} records", response.data.len());
        Ok(response)
    }

    async fn cached_fetch<T: DeserializeOwned>(
        &self,
        key: QueryKey,
        request: RequestBuilder,
    ) -> Result<T> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!("Cache hit for {:?}", key);
                return Ok(serde_json::from_value(hit)?);
            }
        }

        let value: Value = send_json(request).await?;
        if let Some(cache) = &self.cache {
            cache.insert(key, value.clone()).await;
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn invalidate(&self, tag: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(tag).await;
        }
    }
}

#[async_trait::async_trait]
impl ExtractorApi for ExtractorClient {
    async fn run_extraction(&self, request: &ExtractionRequest) -> Result<ExtractionResponse> {
        self.extract(request).await
    }

    async fn get_configuration(&self) -> Result<ServerConfiguration> {
        self.configuration().await
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json().await?)
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("{} {}", status, response.url());
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ExtractError::Service {
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

/// FastAPI puts the message in `detail`, which is a string for
/// `HTTPException` and a list of problems for request validation.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => match obj.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

/// Create endpoints answer with either a bare uuid string or `{"uuid": ...}`.
fn uuid_from_body(body: Value) -> Result<String> {
    match body {
        Value::String(s) => Ok(s),
        Value::Object(obj) => match obj.get("uuid") {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(ExtractError::ValidationError {
                message: "create response has no uuid".to_string(),
            }),
        },
        other => Err(ExtractError::ValidationError {
            message: format!("unexpected create response: {}", other),
        }),
    }
}

async fn build_form(request: &ExtractionRequest) -> Result<Form> {
    let mut form = Form::new()
        .text("extractor_id", request.extractor_id.clone())
        .text("mode", request.mode.as_str());
    if let Some(model) = &request.model_name {
        form = form.text("model_name", model.clone());
    }

    let form = match &request.source {
        ExtractionSource::Text(text) => form.text("text", text.clone()),
        ExtractionSource::File(path) => {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime_for(path))?;
            form.part("file", part)
        }
    };
    Ok(form)
}

pub(crate) fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("doc") => "application/msword",
        Some("odt") => "application/vnd.oasis.opendocument.text",
        Some("rtf") => "application/rtf",
        Some("epub") => "application/epub+zip",
        _ => "application/octet-stream",
    }
}
