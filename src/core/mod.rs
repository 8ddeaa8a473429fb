pub mod cache;
pub mod client;
pub mod engine;
pub mod identity;
pub mod pipeline;
pub mod projector;
pub mod render;

pub use crate::domain::model::{Record, TableProjection, TransformResult};
pub use crate::domain::ports::{ConfigProvider, ExtractorApi, KeyStore, Pipeline, Storage};
pub use crate::utils::error::Result;
