use crate::core::projector::project;
use crate::core::render::OutputFormat;
use crate::domain::model::{
    ExtractionRequest, ExtractionResponse, ExtractionSource, RenderedOutput, ServerConfiguration,
    TransformResult,
};
use crate::domain::ports::{ExtractorApi, Pipeline, Storage};
use crate::utils::error::{ExtractError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const DEFAULT_STEM: &str = "results";

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub output_path: String,
    pub formats: Vec<OutputFormat>,
    /// Bundle every rendered format into this zip file instead of writing
    /// them side by side.
    pub archive: Option<String>,
    /// Supports `{extractor_id}` and `{timestamp}`.
    pub filename_pattern: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            archive: None,
            filename_pattern: None,
        }
    }
}

/// Run one extraction, project the records into a table and write the
/// rendered table through `Storage`.
pub struct ExtractionPipeline<A: ExtractorApi, S: Storage> {
    api: A,
    storage: S,
    request: ExtractionRequest,
    settings: OutputSettings,
}

impl<A: ExtractorApi, S: Storage> ExtractionPipeline<A, S> {
    pub fn new(api: A, storage: S, request: ExtractionRequest, settings: OutputSettings) -> Self {
        Self {
            api,
            storage,
            request,
            settings,
        }
    }

    fn file_stem(&self) -> String {
        match &self.settings.filename_pattern {
            Some(pattern) => pattern
                .replace("{extractor_id}", &self.request.extractor_id)
                .replace(
                    "{timestamp}",
                    &chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string(),
                ),
            None => DEFAULT_STEM.to_string(),
        }
    }

    /// The server advertises its upload limit and models; check them before
    /// sending a file the server would reject anyway.
    async fn preflight(&self) -> Result<()> {
        let needs_check = matches!(self.request.source, ExtractionSource::File(_))
            || self.request.model_name.is_some();
        if !needs_check {
            return Ok(());
        }

        match self.api.get_configuration().await {
            Ok(configuration) => check_request(&self.request, &configuration).await,
            Err(e) => {
                tracing::warn!("Could not fetch server configuration, skipping checks: {}", e);
                Ok(())
            }
        }
    }
}

pub async fn check_request(
    request: &ExtractionRequest,
    configuration: &ServerConfiguration,
) -> Result<()> {
    if let ExtractionSource::File(path) = &request.source {
        let size = tokio::fs::metadata(path).await?.len();
        let limit = configuration
            .max_file_size_mb
            .saturating_mul(1024 * 1024);
        if limit > 0 && size > limit {
            return Err(ExtractError::ValidationError {
                message: format!(
                    "{} is {} bytes, the service accepts at most {} MB",
                    path.display(),
                    size,
                    configuration.max_file_size_mb
                ),
            });
        }
    }

    if let Some(model) = &request.model_name {
        if !configuration.available_models.is_empty()
            && !configuration.available_models.contains(model)
        {
            return Err(ExtractError::ValidationError {
                message: format!(
                    "model '{}' is not offered by the service (available: {})",
                    model,
                    configuration.available_models.join(", ")
                ),
            });
        }
    }

    Ok(())
}

#[async_trait::async_trait]
impl<A: ExtractorApi, S: Storage> Pipeline for ExtractionPipeline<A, S> {
    async fn extract(&self) -> Result<ExtractionResponse> {
        self.preflight().await?;

        let response = self.api.run_extraction(&self.request).await?;
        tracing::info!("Extracted {} records", response.data.len());
        if response.content_too_long == Some(true) {
            tracing::warn!("Input was too long; the service only processed part of it");
        }
        Ok(response)
    }

    async fn transform(&self, response: ExtractionResponse) -> Result<TransformResult> {
        let projection = project(&response.data);
        tracing::debug!(
            "Projected {} rows onto {} columns",
            projection.rows.len(),
            projection.columns.len()
        );

        let mut outputs = Vec::with_capacity(self.settings.formats.len());
        for format in &self.settings.formats {
            outputs.push(RenderedOutput {
                format: *format,
                content: format.render(&projection)?,
            });
        }

        Ok(TransformResult {
            extractor_id: self.request.extractor_id.clone(),
            projection,
            outputs,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let stem = self.file_stem();

        if let Some(archive_name) = &self.settings.archive {
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for output in &result.outputs {
                    let name = format!("{}.{}", stem, output.format.extension());
                    zip.start_file::<_, ()>(name, FileOptions::default())?;
                    zip.write_all(output.content.as_bytes())?;
                }
                zip.finish()?.into_inner()
            };

            tracing::debug!("Writing archive ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive_name, &zip_data).await?;
            return Ok(format!("{}/{}", self.settings.output_path, archive_name));
        }

        let mut written = Vec::with_capacity(result.outputs.len());
        for output in &result.outputs {
            let name = format!("{}.{}", stem, output.format.extension());
            self.storage
                .write_file(&name, output.content.as_bytes())
                .await?;
            written.push(format!("{}/{}", self.settings.output_path, name));
        }
        Ok(written.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TableProjection;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ExtractError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockApi {
        response: ExtractionResponse,
        configuration: Option<ServerConfiguration>,
        calls: Arc<Mutex<usize>>,
    }

    impl MockApi {
        fn returning(data: serde_json::Value) -> Self {
            Self {
                response: serde_json::from_value(json!({ "data": data })).unwrap(),
                configuration: None,
                calls: Arc::new(Mutex::new(0)),
            }
        }

        fn with_configuration(mut self, configuration: ServerConfiguration) -> Self {
            self.configuration = Some(configuration);
            self
        }
    }

    #[async_trait::async_trait]
    impl ExtractorApi for MockApi {
        async fn run_extraction(&self, _request: &ExtractionRequest) -> Result<ExtractionResponse> {
            *self.calls.lock().await += 1;
            Ok(self.response.clone())
        }

        async fn get_configuration(&self) -> Result<ServerConfiguration> {
            self.configuration.clone().ok_or_else(|| ExtractError::Service {
                status: 404,
                detail: "Not Found".to_string(),
            })
        }
    }

    fn settings(formats: Vec<OutputFormat>) -> OutputSettings {
        OutputSettings {
            output_path: "test_output".to_string(),
            formats,
            archive: None,
            filename_pattern: None,
        }
    }

    #[tokio::test]
    async fn test_extract_and_transform_heterogeneous_records() {
        let api = MockApi::returning(json!([{"name": "Alice", "age": 30}, {"name": "Bob"}]));
        let pipeline = ExtractionPipeline::new(
            api,
            MockStorage::new(),
            ExtractionRequest::text("ext-1", "Alice is 30. Bob is here."),
            settings(vec![OutputFormat::Csv, OutputFormat::Tsv]),
        );

        let response = pipeline.extract().await.unwrap();
        let result = pipeline.transform(response).await.unwrap();

        assert_eq!(
            result.projection,
            TableProjection {
                columns: vec!["name".to_string(), "age".to_string()],
                rows: vec![
                    vec!["Alice".to_string(), "30".to_string()],
                    vec!["Bob".to_string(), String::new()],
                ],
            }
        );
        assert_eq!(result.outputs[0].content, "name,age\nAlice,30\nBob,\n");
        assert_eq!(result.outputs[1].content, "name\tage\nAlice\t30\nBob\t\n");
    }

    #[tokio::test]
    async fn test_load_writes_one_file_per_format() {
        let storage = MockStorage::new();
        let pipeline = ExtractionPipeline::new(
            MockApi::returning(json!([{"x": 1}])),
            storage.clone(),
            ExtractionRequest::text("ext-1", "x"),
            settings(vec![OutputFormat::Csv, OutputFormat::Json]),
        );

        let response = pipeline.extract().await.unwrap();
        let result = pipeline.transform(response).await.unwrap();
        let path = pipeline.load(result).await.unwrap();

        assert_eq!(path, "test_output/results.csv, test_output/results.json");
        assert_eq!(
            storage.get_file("results.csv").await.unwrap(),
            b"x\n1\n".to_vec()
        );
        let json: serde_json::Value =
            serde_json::from_slice(&storage.get_file("results.json").await.unwrap()).unwrap();
        assert_eq!(json, json!([{"x": "1"}]));
        assert!(storage.read_file("results.tsv").await.is_err());
    }

    #[tokio::test]
    async fn test_load_archive_bundles_outputs() {
        let storage = MockStorage::new();
        let mut output = settings(vec![OutputFormat::Csv, OutputFormat::Table]);
        output.archive = Some("bundle.zip".to_string());
        output.filename_pattern = Some("run_{extractor_id}".to_string());

        let pipeline = ExtractionPipeline::new(
            MockApi::returning(json!([{"a": "b"}])),
            storage.clone(),
            ExtractionRequest::text("ext-9", "text"),
            output,
        );

        let response = pipeline.extract().await.unwrap();
        let result = pipeline.transform(response).await.unwrap();
        let path = pipeline.load(result).await.unwrap();
        assert_eq!(path, "test_output/bundle.zip");

        let zip_bytes = storage.get_file("bundle.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["run_ext-9.csv", "run_ext-9.txt"]);

        let mut csv = String::new();
        archive
            .by_name("run_ext-9.csv")
            .unwrap()
            .read_to_string(&mut csv)
            .unwrap();
        assert_eq!(csv, "a\nb\n");
    }

    #[tokio::test]
    async fn test_unknown_model_rejected_before_extraction() {
        let api = MockApi::returning(json!([])).with_configuration(ServerConfiguration {
            available_models: vec!["gpt-3.5-turbo".to_string()],
            max_file_size_mb: 10,
            accepted_mimetypes: vec![],
        });
        let calls = api.calls.clone();
        let pipeline = ExtractionPipeline::new(
            api,
            MockStorage::new(),
            ExtractionRequest::text("ext-1", "x").with_model("no-such-model"),
            settings(vec![OutputFormat::Csv]),
        );

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ExtractError::ValidationError { .. }));
        assert_eq!(*calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_missing_configuration_does_not_block_extraction() {
        let pipeline = ExtractionPipeline::new(
            MockApi::returning(json!([{"k": "v"}])),
            MockStorage::new(),
            ExtractionRequest::text("ext-1", "x").with_model("any"),
            settings(vec![OutputFormat::Csv]),
        );

        let response = pipeline.extract().await.unwrap();
        assert_eq!(response.data.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![b'a'; 2 * 1024 * 1024]).unwrap();

        let configuration = ServerConfiguration {
            available_models: vec![],
            max_file_size_mb: 1,
            accepted_mimetypes: vec![],
        };
        let request = ExtractionRequest::file("ext-1", file.path());
        let err = check_request(&request, &configuration).await.unwrap_err();
        assert!(err.to_string().contains("at most 1 MB"));
    }

    #[tokio::test]
    async fn test_huge_advertised_limit_does_not_overflow() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"small").unwrap();

        let configuration = ServerConfiguration {
            available_models: vec![],
            max_file_size_mb: u64::MAX,
            accepted_mimetypes: vec![],
        };
        let request = ExtractionRequest::file("ext-1", file.path());
        assert!(check_request(&request, &configuration).await.is_ok());
    }
}
