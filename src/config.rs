// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::codegen::CodegenTool;
use crate::constants::{
    APP_NAME, DEFAULT_AUTO_CLOSE_CONFIDENCE, DEFAULT_CODEGEN_TOOL, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_WORKSPACE_DIR, GITHUB_API_BASE, LOG_FILE, OPENROUTER_API_BASE,
};

/// Tool settings file (`grepo.toml`). Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding `config.json` and `users/`
    pub config_dir: Option<String>,

    /// Parent directory of the per-user workspaces
    pub workspace_dir: Option<String>,

    /// Log file path (default: grepo.log in the config directory)
    pub log_file: Option<String>,

    /// GitHub REST API base URL
    pub github_api: Option<String>,

    /// OpenRouter API base URL
    pub openrouter_api: Option<String>,

    /// Code generation CLI (codex or claude)
    pub codegen_tool: Option<String>,

    /// Model passed to the code generation CLI
    pub codegen_model: Option<String>,

    /// Timeout for HTTP requests, in seconds
    pub request_timeout_secs: Option<u64>,

    /// Minimum analysis confidence (0-100) before offering to close an issue
    pub auto_close_confidence: Option<u8>,
}

impl Config {
    /// Load config from a file, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Merge this config with CLI args, where CLI args take precedence
    pub fn merge_with_cli<T>(&self, cli_value: T, config_value: Option<T>, default_value: T) -> T
    where
        T: PartialEq + Clone,
    {
        if cli_value != default_value {
            cli_value
        } else if let Some(config_val) = config_value {
            config_val
        } else {
            default_value
        }
    }
}

/// Fully resolved settings used by the rest of the program.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub log_file: PathBuf,
    pub github_api: String,
    pub openrouter_api: String,
    pub codegen_tool: CodegenTool,
    pub codegen_model: Option<String>,
    pub request_timeout_secs: u64,
    pub auto_close_confidence: u8,
}

impl Settings {
    /// Resolve settings: CLI flag (or its environment variable) first, then
    /// `grepo.toml`, then built-in defaults.
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let config_dir = match (&cli.config_dir, &config.config_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => PathBuf::from(dir),
            (None, None) => default_config_dir()?,
        };
        let workspace_dir = match (&cli.workspace, &config.workspace_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => PathBuf::from(dir),
            (None, None) => default_workspace_dir()?,
        };
        let log_file = config
            .log_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(LOG_FILE));

        let github_api = config.merge_with_cli(
            cli.github_api.clone(),
            config.github_api.clone(),
            GITHUB_API_BASE.to_string(),
        );
        let openrouter_api = config.merge_with_cli(
            cli.openrouter_api.clone(),
            config.openrouter_api.clone(),
            OPENROUTER_API_BASE.to_string(),
        );

        let tool_name = config
            .codegen_tool
            .clone()
            .unwrap_or_else(|| DEFAULT_CODEGEN_TOOL.to_string());
        let codegen_tool: CodegenTool = tool_name.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        let auto_close_confidence = config
            .auto_close_confidence
            .unwrap_or(DEFAULT_AUTO_CLOSE_CONFIDENCE)
            .min(100);

        Ok(Self {
            config_dir,
            workspace_dir,
            log_file,
            github_api: github_api.trim_end_matches('/').to_string(),
            openrouter_api: openrouter_api.trim_end_matches('/').to_string(),
            codegen_tool,
            codegen_model: config.codegen_model.clone(),
            request_timeout_secs: config
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            auto_close_confidence,
        })
    }
}

fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .context("Could not determine the user config directory; pass --config-dir")
}

fn default_workspace_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|dir| dir.join(DEFAULT_WORKSPACE_DIR))
        .context("Could not determine the home directory; pass --workspace")
}
