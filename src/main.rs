use clap::Parser;
use extract_view::config::{Command, ExampleCommand, ExtractorCommand};
use extract_view::core::identity::init_process_api_key;
use extract_view::domain::model::{
    CreateExample, CreateExtractor, ExtractionMode, SuggestRequest,
};
use extract_view::utils::error::{ErrorSeverity, ExtractError};
use extract_view::utils::validation::{validate_required_field, validate_uuid, Validate};
use extract_view::utils::logger;
use extract_view::{
    project, CliConfig, ExtractionEngine, ExtractionPipeline, ExtractionRequest, ExtractorClient,
    FileKeyStore, LocalStorage, OutputFormat, OutputSettings, TableProjection, TomlConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let verbose = config.logging.verbose.unwrap_or(false);
    if config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!(
            "Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig, config: TomlConfig) -> extract_view::Result<()> {
    let formats = config.formats()?;

    // offline: no key or network needed
    if let Command::Project { input } = &cli.command {
        let raw = read_input(input.as_deref())?;
        let projection = project(&records_from_json(serde_json::from_str(&raw)?));
        return print_projection(&projection, &formats);
    }

    let key_store = FileKeyStore::new(config.key_file());
    let api_key = init_process_api_key(&key_store)?;
    tracing::debug!("Using key file {}", key_store.path().display());
    let client = ExtractorClient::new(&config, api_key)?;

    match cli.command {
        Command::Extractors { action } => match action {
            ExtractorCommand::List { limit, offset } => {
                let extractors = client.list_extractors(limit, offset).await?;
                print_serialized(&extractors, &formats)
            }
            ExtractorCommand::Get { uuid, shared } => {
                validate_uuid("uuid", &uuid)?;
                if shared {
                    print_serialized(&[client.get_shared_extractor(&uuid).await?], &formats)
                } else {
                    print_serialized(&[client.get_extractor(&uuid).await?], &formats)
                }
            }
            ExtractorCommand::Create {
                name,
                description,
                schema,
                instruction,
            } => {
                let schema = parse_schema(&schema)?;
                let uuid = client
                    .create_extractor(&CreateExtractor {
                        name,
                        description,
                        schema,
                        instruction,
                    })
                    .await?;
                println!("{}", uuid);
                Ok(())
            }
            ExtractorCommand::Delete { uuid } => {
                validate_uuid("uuid", &uuid)?;
                client.delete_extractor(&uuid).await?;
                println!("Deleted {}", uuid);
                Ok(())
            }
            ExtractorCommand::Share { uuid } => {
                validate_uuid("uuid", &uuid)?;
                let share = client.share_extractor(&uuid).await?;
                let link = format!(
                    "{}/s/{}",
                    config.service.base_url.trim_end_matches('/'),
                    share.share_uuid
                );
                println!("{}", link);
                Ok(())
            }
        },
        Command::Examples { action } => match action {
            ExampleCommand::List {
                extractor_id,
                limit,
                offset,
            } => {
                validate_uuid("extractor_id", &extractor_id)?;
                let examples = client.list_examples(&extractor_id, limit, offset).await?;
                print_serialized(&examples, &formats)
            }
            ExampleCommand::Create {
                extractor_id,
                content,
                expected,
            } => {
                validate_uuid("extractor_id", &extractor_id)?;
                let output = serde_json::from_str::<Value>(&expected).map_err(|e| {
                    ExtractError::ValidationError {
                        message: format!("--expected is not valid JSON: {}", e),
                    }
                })?;
                let uuid = client
                    .create_example(&CreateExample {
                        extractor_id,
                        content,
                        output,
                    })
                    .await?;
                println!("{}", uuid);
                Ok(())
            }
            ExampleCommand::Delete { uuid } => {
                validate_uuid("uuid", &uuid)?;
                client.delete_example(&uuid).await?;
                println!("Deleted {}", uuid);
                Ok(())
            }
        },
        Command::Suggest {
            description,
            schema,
        } => {
            let suggestion = client
                .suggest_extractor(&SuggestRequest {
                    description,
                    json_schema: schema.unwrap_or_default(),
                })
                .await?;
            match suggestion {
                Some(definition) => println!("{}", serde_json::to_string_pretty(&definition)?),
                None => eprintln!("Nothing to suggest for an empty description"),
            }
            Ok(())
        }
        Command::Configuration => {
            let configuration = client.configuration().await?;
            println!("{}", serde_json::to_string_pretty(&configuration)?);
            Ok(())
        }
        Command::Extract {
            extractor_id,
            text,
            file,
            ..
        } => {
            let request = match text {
                Some(text) => ExtractionRequest::text(extractor_id, text),
                None => {
                    let path = validate_required_field("--file", &file)?;
                    ExtractionRequest::file(extractor_id, path)
                }
            };
            validate_uuid("extractor_id", &request.extractor_id)?;
            let mut request = request
                .with_mode(config.extract.mode.unwrap_or(ExtractionMode::EntireDocument))
                .shared(config.extract.shared.unwrap_or(false));
            if let Some(model) = &config.extract.model_name {
                request = request.with_model(model.clone());
            }

            let settings = OutputSettings {
                output_path: config.output.output_path.clone(),
                formats: formats.clone(),
                archive: config.archive_filename(),
                filename_pattern: config.output.filename_pattern.clone(),
            };
            let storage = LocalStorage::new(settings.output_path.clone());
            let engine =
                ExtractionEngine::new(ExtractionPipeline::new(client, storage, request, settings));

            if cli.output.is_some() {
                let report = engine.run().await?;
                println!(
                    "✅ {} rows written to {}",
                    report.result.projection.rows.len(),
                    report.output_path
                );
            } else {
                let result = engine.preview().await?;
                print_projection(&result.projection, &formats)?;
            }
            Ok(())
        }
        Command::Project { .. } => Ok(()),
    }
}

fn read_input(path: Option<&str>) -> extract_view::Result<String> {
    let mut raw = String::new();
    match path {
        Some(path) => raw = std::fs::read_to_string(path)?,
        None => {
            std::io::stdin().read_to_string(&mut raw)?;
        }
    }
    Ok(raw)
}

/// Accept a saved extraction response (`{"data": [...]}`), a bare array of
/// records, or a single record.
fn records_from_json(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) if matches!(obj.get("data"), Some(Value::Array(_))) => {
            match obj.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

fn parse_schema(raw: &str) -> extract_view::Result<Value> {
    let text = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw)?
    };
    let schema: Value = serde_json::from_str(&text)?;
    if !schema.is_object() {
        return Err(ExtractError::ValidationError {
            message: "schema must be a JSON object".to_string(),
        });
    }
    Ok(schema)
}

fn print_serialized<T: Serialize>(
    items: &[T],
    formats: &[OutputFormat],
) -> extract_view::Result<()> {
    let records = items
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    print_projection(&project(&records), formats)
}

/// Only one format makes sense on a terminal; prefer the aligned table.
fn print_projection(
    projection: &TableProjection,
    formats: &[OutputFormat],
) -> extract_view::Result<()> {
    let format = if formats.contains(&OutputFormat::Table) || formats.len() != 1 {
        OutputFormat::Table
    } else {
        formats[0]
    };
    print!("{}", format.render(projection)?);
    Ok(())
}
