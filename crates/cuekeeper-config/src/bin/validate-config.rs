//! Config validation CLI tool
//!
//! Validates a cuekeeperd configuration file and reports any errors.

use cuekeeper_config::StoreBackend;
use cuekeeper_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a cuekeeperd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match cuekeeper_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", cuekeeper_config::CURRENT_CONFIG_VERSION);
            println!("  Tables: {}", settings.table_ids.len());
            println!("  Default rate: {:.2}/hour", settings.default_rate);

            let backend = match settings.store.backend {
                StoreBackend::Json => "json",
                StoreBackend::Sqlite => "sqlite",
            };
            println!(
                "  Store: {} ({})",
                backend,
                settings
                    .store
                    .resolved_path(&settings.service.data_dir)
                    .display()
            );

            println!();
            println!("Table IDs:");
            for id in &settings.table_ids {
                println!("  - {}", id);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                cuekeeper_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                cuekeeper_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                cuekeeper_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                cuekeeper_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        cuekeeper_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
