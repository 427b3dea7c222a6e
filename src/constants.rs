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

pub const APP_NAME: &str = "grepo";

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_CODEGEN_TOOL: &str = "codex";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_AUTO_CLOSE_CONFIDENCE: u8 = 80;

/// Directory name under the home directory that holds per-user workspaces.
pub const DEFAULT_WORKSPACE_DIR: &str = "github2";
pub const SETTINGS_FILE: &str = "grepo.toml";
pub const LOG_FILE: &str = "grepo.log";

pub const ROADMAP_FILE: &str = "roadmap.md";
pub const README_FILE: &str = "README.md";
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

pub const ROADMAP_LABELS: &[&str] = &["roadmap", "enhancement"];

/// Substrings in a model id that mark it as a coding model for ordering.
pub const CODING_MODEL_KEYWORDS: &[&str] = &["code", "coder", "deepseek", "qwen", "starcoder"];

pub const COMMIT_LIMIT: usize = 5;
pub const FILE_TREE_LIMIT: usize = 50;

pub const ENV_CONFIG_DIR: &str = "GREPO_CONFIG_DIR";
pub const ENV_WORKSPACE: &str = "GREPO_WORKSPACE";
pub const ENV_LOG: &str = "GREPO_LOG";
