use crate::core::Pipeline;
use crate::domain::model::TransformResult;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_path: String,
    pub result: TransformResult,
}

pub struct ExtractionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExtractionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Extract and transform without writing anything.
    pub async fn preview(&self) -> Result<TransformResult> {
        tracing::info!("Running extraction...");
        let response = self.pipeline.extract().await?;
        self.pipeline.transform(response).await
    }

    pub async fn run(&self) -> Result<RunReport> {
        let result = self.preview().await?;
        tracing::info!(
            "Projected {} rows x {} columns",
            result.projection.rows.len(),
            result.projection.columns.len()
        );

        tracing::info!("Writing results...");
        let output_path = self.pipeline.load(result.clone()).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(RunReport {
            output_path,
            result,
        })
    }
}
