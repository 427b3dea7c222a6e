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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{ENV_CONFIG_DIR, ENV_WORKSPACE, GITHUB_API_BASE, OPENROUTER_API_BASE};

#[derive(Parser)]
#[command(name = "grepo")]
#[command(about = "Menu-driven Git, GitHub and AI code generation workflows")]
#[command(version)]
pub struct Cli {
    /// Path to config file (defaults to grepo.toml in current directory if it exists)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding user records and the active-user pointer
    #[arg(long, global = true, env = ENV_CONFIG_DIR)]
    pub config_dir: Option<PathBuf>,

    /// Parent directory of the per-user repository workspaces
    #[arg(long, global = true, env = ENV_WORKSPACE)]
    pub workspace: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long, global = true, env = "GREPO_GITHUB_API", default_value = GITHUB_API_BASE)]
    pub github_api: String,

    /// OpenRouter API base URL
    #[arg(long, global = true, env = "GREPO_OPENROUTER_API", default_value = OPENROUTER_API_BASE)]
    pub openrouter_api: String,

    /// Without a subcommand, the interactive menu starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect a GitHub account and make it the active user
    Login {
        /// GitHub username (prompted when omitted)
        #[arg(long)]
        username: Option<String>,

        /// GitHub personal access token (prompted when omitted)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Save without checking the token against GitHub
        #[arg(long)]
        no_verify: bool,
    },

    /// List configured users
    Users,

    /// Switch the active user
    Use {
        /// Username to activate
        name: String,
    },

    /// List repositories of the active user
    Repos {
        /// List GitHub repositories instead of local clones
        #[arg(long)]
        remote: bool,
    },

    /// Show configuration, workspace and tool status
    Status,

    /// Create a local project with README and initial commit
    Create {
        /// Project (directory) name
        name: String,
    },

    /// Generate roadmap.md from README.md with the configured AI model
    Roadmap {
        /// Repository directory
        path: PathBuf,
    },

    /// Create GitHub issues from roadmap.md
    Issues {
        /// Repository directory
        path: PathBuf,

        /// Create without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List free models available on OpenRouter
    Models,
}
