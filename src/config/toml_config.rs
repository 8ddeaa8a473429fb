use crate::core::render::{parse_formats, OutputFormat};
use crate::domain::model::ExtractionMode;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ExtractError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub cache: Option<bool>,
    pub headers: Option<BTreeMap<String, String>>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            cache: None,
            headers: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub key_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub mode: Option<ExtractionMode>,
    pub model_name: Option<String>,
    pub shared: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub filename_pattern: Option<String>,
    pub archive: Option<ArchiveConfig>,
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            output_formats: default_output_formats(),
            filename_pattern: None,
            archive: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "compact" (default) or "json"
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExtractError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExtractError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EXTRACT_API_URL})；未定義的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            ExtractError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn formats(&self) -> Result<Vec<OutputFormat>> {
        parse_formats(&self.output.output_formats)
    }

    pub fn archive_filename(&self) -> Option<String> {
        self.output
            .archive
            .as_ref()
            .filter(|a| a.enabled)
            .map(|a| a.filename.clone().unwrap_or_else(|| "results.zip".to_string()))
    }

    pub fn key_file(&self) -> PathBuf {
        match &self.identity.key_file {
            Some(path) => PathBuf::from(path),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                Path::new(&home).join(".extract-view").join("key")
            }
        }
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.service.base_url
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.output_formats
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn extra_headers(&self) -> Vec<(String, String)> {
        self.service
            .headers
            .as_ref()
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn cache_enabled(&self) -> bool {
        self.service.cache.unwrap_or(true)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("service.base_url", &self.service.base_url)?;
        if let Some(timeout) = self.service.timeout_seconds {
            validation::validate_range("service.timeout_seconds", timeout, 1, 3600)?;
        }
        validation::validate_path("output.output_path", &self.output.output_path)?;
        if self.output.output_formats.is_empty() {
            return Err(ExtractError::MissingConfigError {
                field: "output.output_formats".to_string(),
            });
        }
        self.formats()?;
        if let Some(model) = &self.extract.model_name {
            validation::validate_non_empty_string("extract.model_name", model)?;
        }
        if let Some(format) = &self.logging.format {
            if format != "compact" && format != "json" {
                return Err(ExtractError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: "Expected compact or json".to_string(),
                });
            }
        }
        Ok(())
    }
}
