use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use sql_core::config::Config;
use std::path::{Path, PathBuf};

/// Retrieval-augmented text-to-SQL service
#[derive(Parser, Debug)]
#[command(name = "sqlsmith")]
#[command(about = "Turn natural-language questions into SQL using your schema PDFs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults to $CONFIG_PATH, then ./config.toml)
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Ask questions interactively on the terminal
    Repl,
    /// Build the vector index from the dataset directory, or report the existing one
    BuildIndex,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve { bind: None })
    }

    /// Loads the config file and applies environment overrides.
    pub fn load_config(&self) -> Result<Config> {
        let config = resolve_config(
            self.config.as_deref(),
            std::env::var("CONFIG_PATH").ok(),
        )?;
        Ok(config.with_env_overrides())
    }
}

/// An explicitly requested file must exist; the implicit default may be
/// absent, in which case built-in defaults are used.
fn resolve_config(explicit: Option<&Path>, env_path: Option<String>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let path = PathBuf::from(env_path.unwrap_or_else(Config::default_config_path));
    if path.exists() {
        Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn should_default_to_serve() {
        let cli = Cli::parse_from(["sqlsmith"]);
        assert_eq!(cli.command(), Command::Serve { bind: None });
        assert_eq!(cli.config, None);
    }

    #[test]
    fn should_parse_subcommands_and_global_config() {
        let cli = Cli::parse_from(["sqlsmith", "repl", "--config", "custom.toml"]);
        assert_eq!(cli.command(), Command::Repl);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));

        let cli = Cli::parse_from(["sqlsmith", "build-index"]);
        assert_eq!(cli.command(), Command::BuildIndex);

        let cli = Cli::parse_from(["sqlsmith", "serve", "--bind", "127.0.0.1:9000"]);
        assert_eq!(
            cli.command(),
            Command::Serve {
                bind: Some("127.0.0.1:9000".to_string())
            }
        );
    }

    #[test]
    fn should_fail_for_missing_explicit_config() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");

        assert!(resolve_config(Some(&missing), None).is_err());
    }

    #[test]
    fn should_use_defaults_when_implicit_config_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("config.toml");

        let config =
            resolve_config(None, Some(missing.to_string_lossy().to_string())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn should_load_config_from_env_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[vector_store]\ntop_k = 2").unwrap();

        let config =
            resolve_config(None, Some(file.path().to_string_lossy().to_string())).unwrap();
        assert_eq!(config.vector_store.top_k, 2);
        assert_eq!(config.data.chunk_size, 500);
    }
}
