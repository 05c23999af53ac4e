use crate::config::toml_config::ClientConfig;
use crate::utils::error::{MsdbError, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "msdb")]
#[command(about = "Client for the materials database chemical-card service")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "MSDB_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, global = true, env = "MSDB_TOKEN")]
    pub token: Option<String>,

    #[arg(long, global = true, env = "MSDB_USERNAME")]
    pub username: Option<String>,

    #[arg(long, global = true, env = "MSDB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, global = true, help = "Reuse one connection for all requests")]
    pub session: bool,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the recognized chemical-card fields
    Fields,
    /// Obtain an access token
    Token,
    /// Print the chemical compounds database
    Database,
    /// Print one compound
    Compound { id: String },
    /// Print one chemical card
    Card { id: String },
    /// Download a compound's structure file
    Download {
        id: String,
        #[arg(long, short, default_value = "msdb.cif")]
        output: PathBuf,
    },
    /// Create a chemical card from fields and/or a structure file
    Upload {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Card fields as JSON, or @path to a JSON file
        #[arg(long)]
        info: Option<String>,
        /// Extra information as JSON, or @path to a JSON file
        #[arg(long)]
        extra: Option<String>,
    },
    /// Create a chemical card with an attached calculation object
    SubmitCalc {
        #[arg(long)]
        file: PathBuf,
        /// Calculation as JSON, or @path to a JSON file
        #[arg(long)]
        calc: String,
        #[arg(long)]
        info: Option<String>,
        #[arg(long)]
        extra: Option<String>,
    },
    /// Fetch the calculation object attached to a card
    FetchCalc { id: String },
}

impl CliConfig {
    /// Merges the config file with command-line flags; flags win.
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.server.token = Some(token.clone());
        }
        if let Some(username) = &self.username {
            config.server.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.server.password = Some(password.clone());
        }
        if self.session {
            config.session.persistent = true;
        }

        Ok(config)
    }
}

/// Reads a JSON argument given inline or as `@path`.
pub fn json_argument(field: &str, raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| MsdbError::InvalidConfigValueError {
        field: field.to_string(),
        value: raw.to_string(),
        reason: format!("not valid JSON: {}", e),
    })
}

/// Like [`json_argument`], but the value must be a JSON object.
pub fn json_object_argument(field: &str, raw: &str) -> Result<Map<String, Value>> {
    match json_argument(field, raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(MsdbError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected a JSON object".to_string(),
        }),
    }
}
