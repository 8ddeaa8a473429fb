use crate::config::toml_config::{ArchiveConfig, TomlConfig};
use crate::domain::model::ExtractionMode;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "extract-view")]
#[command(about = "Run extractors against text or files and view the results as a table")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Base URL of the extractor service
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// File holding the API key (created on first run)
    #[arg(long, global = true)]
    pub key_file: Option<String>,

    /// Output formats, comma separated (csv, tsv, json, table)
    #[arg(long, global = true, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Write results into this directory instead of printing them
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Bundle written results into a zip archive with this name
    #[arg(long, global = true, requires = "output")]
    pub archive: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage extractors
    Extractors {
        #[command(subcommand)]
        action: ExtractorCommand,
    },
    /// Manage example input/output pairs of an extractor
    Examples {
        #[command(subcommand)]
        action: ExampleCommand,
    },
    /// Ask the service to draft an extractor from a description
    Suggest {
        description: String,
        /// Existing JSON schema to modify
        #[arg(long)]
        schema: Option<String>,
    },
    /// Show models and upload limits offered by the service
    Configuration,
    /// Run an extractor and show the results
    Extract {
        extractor_id: String,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        mode: Option<ExtractionMode>,
        #[arg(long)]
        model: Option<String>,
        /// The id is a share token of someone else's extractor
        #[arg(long)]
        shared: bool,
    },
    /// Project a saved extraction response (or a bare JSON array) into a table
    Project {
        /// JSON file; reads stdin when omitted
        input: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ExtractorCommand {
    List {
        #[arg(long, default_value = "10")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    Get {
        uuid: String,
        #[arg(long)]
        shared: bool,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// JSON schema, inline or as a path to a .json file
        #[arg(long)]
        schema: String,
        #[arg(long, default_value = "")]
        instruction: String,
    },
    Delete {
        uuid: String,
    },
    Share {
        uuid: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ExampleCommand {
    List {
        extractor_id: String,
        #[arg(long, default_value = "10")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    Create {
        extractor_id: String,
        #[arg(long)]
        content: String,
        /// Expected output as JSON
        #[arg(long)]
        expected: String,
    },
    Delete {
        uuid: String,
    },
}

impl CliConfig {
    /// Load the TOML file if one was given and layer the command line flags
    /// on top of it.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.service.base_url = base_url.clone();
        }
        if let Some(key_file) = &self.key_file {
            config.identity.key_file = Some(key_file.clone());
        }
        if !self.format.is_empty() {
            config.output.output_formats = self.format.clone();
        }
        if let Some(output) = &self.output {
            config.output.output_path = output.clone();
        }
        if let Some(archive) = &self.archive {
            config.output.archive = Some(ArchiveConfig {
                enabled: true,
                filename: Some(archive.clone()),
            });
        }
        if self.json_logs {
            config.logging.format = Some("json".to_string());
        }
        if self.verbose {
            config.logging.verbose = Some(true);
        }
        if let Command::Extract {
            mode,
            model,
            shared,
            ..
        } = &self.command
        {
            if mode.is_some() {
                config.extract.mode = *mode;
            }
            if model.is_some() {
                config.extract.model_name = model.clone();
            }
            if *shared {
                config.extract.shared = Some(true);
            }
        }

        Ok(config)
    }
}
