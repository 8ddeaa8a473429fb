use crate::domain::model::{
    ExtractionRequest, ExtractionResponse, ServerConfiguration, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn request_timeout(&self) -> Duration;

    fn extra_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn cache_enabled(&self) -> bool {
        true
    }
}

/// Where the client identity lives between runs.
pub trait KeyStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, key: &str) -> Result<()>;
}

/// The part of the extractor service the extraction pipeline depends on.
#[async_trait]
pub trait ExtractorApi: Send + Sync {
    async fn run_extraction(&self, request: &ExtractionRequest) -> Result<ExtractionResponse>;
    async fn get_configuration(&self) -> Result<ServerConfiguration>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractionResponse>;
    async fn transform(&self, response: ExtractionResponse) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
