//! Command line front end of the admission letter generator

mod interactive;
mod report;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use letter_core::config::{QuotaConfig, StorageConfig};
use letter_core::{paths, JsonUsageStore, LetterConfig, QuotaManager, SessionStore};
use std::sync::Arc;

fn cli() -> Command {
    Command::new("letter-cli")
        .version("1.0.0")
        .about("Motivation letter generator for Parcoursup applications")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(paths::DEFAULT_CONFIG_PATH)
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding usage statistics and sessions")
                .default_value(".")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("generate")
                .about("Interview the applicant and generate a motivation letter")
                .arg(
                    Arg::new("program-url")
                        .long("program-url")
                        .value_name("URL")
                        .help("Parcoursup page of the program"),
                )
                .arg(
                    Arg::new("institution-url")
                        .long("institution-url")
                        .value_name("URL")
                        .help("Website of the institution"),
                )
                .arg(
                    Arg::new("defaults")
                        .long("defaults")
                        .help("Answer the interview with predefined answers")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("quota")
                .about("Show API usage statistics")
                .arg(
                    Arg::new("reset")
                        .long("reset")
                        .help("Reset all usage statistics")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("sessions")
                .about("List saved sessions")
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .value_name("ID")
                        .help("Delete the given session"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();

    let data_dir = string_arg(&matches, "data-dir").unwrap_or(".");
    if let Err(e) = paths::init_data_root(data_dir) {
        log::warn!("Data root initialization warning: {}", e);
    }
    log::info!("Using data directory: {}", data_dir);

    let config_path = string_arg(&matches, "config").unwrap_or(paths::DEFAULT_CONFIG_PATH);

    match matches.subcommand() {
        Some(("generate", sub)) => {
            let config = LetterConfig::load(config_path)
                .with_context(|| format!("Failed to load configuration from {}", config_path))?;
            let options = interactive::GenerateOptions {
                program_url: string_arg(sub, "program-url").map(str::to_string),
                institution_url: string_arg(sub, "institution-url").map(str::to_string),
                use_defaults: sub.get_flag("defaults"),
            };
            interactive::generate(&config, options).await
        }
        Some(("quota", sub)) => {
            let (storage, quota_config) = storage_settings(config_path);
            let store = Arc::new(JsonUsageStore::new(storage.usage_file_path()));
            let quota = QuotaManager::new(store, quota_config);

            if sub.get_flag("reset") {
                if interactive::confirm("Reset all usage statistics? (yes/no): ") {
                    quota.reset();
                    println!("Usage statistics have been reset.");
                } else {
                    println!("Cancelled.");
                }
                return Ok(());
            }

            print!("{}", report::usage_report(&quota.usage_report(), chrono::Utc::now()));
            Ok(())
        }
        Some(("sessions", sub)) => {
            let (storage, _) = storage_settings(config_path);
            let store = SessionStore::new(storage.sessions_dir_path());

            if let Some(session_id) = string_arg(sub, "delete") {
                if store.delete(session_id) {
                    println!("Session {} deleted.", session_id);
                } else {
                    anyhow::bail!("No session named {}", session_id);
                }
                return Ok(());
            }

            let sessions = store.list()?;
            print!("{}", report::session_list(&sessions));
            Ok(())
        }
        _ => {
            log::error!("No action specified. Use --help for options.");
            std::process::exit(1);
        }
    }
}

fn string_arg<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    matches.get_one::<String>(name).map(String::as_str)
}

/// Storage and quota settings for commands that never call the API,
/// so a missing API key is not fatal there
fn storage_settings(config_path: &str) -> (StorageConfig, QuotaConfig) {
    match LetterConfig::load(config_path) {
        Ok(config) => (config.storage, config.quota),
        Err(e) => {
            log::debug!("Using default storage settings: {}", e);
            (StorageConfig::default(), QuotaConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_generate_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "letter-cli",
                "--data-dir",
                "/tmp/letters",
                "generate",
                "--program-url",
                "https://dossierappel.parcoursup.fr/Candidats/public/fiches/afficherFicheFormation?g_ta_cod=1",
                "--defaults",
            ])
            .unwrap();

        assert_eq!(string_arg(&matches, "data-dir"), Some("/tmp/letters"));
        assert_eq!(string_arg(&matches, "config"), Some(paths::DEFAULT_CONFIG_PATH));

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "generate");
        assert!(sub.get_flag("defaults"));
        assert!(string_arg(sub, "institution-url").is_none());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(cli().try_get_matches_from(["letter-cli"]).is_err());
    }
}
