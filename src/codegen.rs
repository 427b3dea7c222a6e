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
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::error::GrepoError;

/// Code generation CLI kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenTool {
    Codex,
    Claude,
}

impl std::str::FromStr for CodegenTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "codex" => Ok(Self::Codex),
            "claude" => Ok(Self::Claude),
            other => Err(format!(
                "Unsupported code generation tool: {}. Supported: codex, claude",
                other
            )),
        }
    }
}

impl CodegenTool {
    pub fn name(&self) -> &'static str {
        match self {
            CodegenTool::Codex => "codex",
            CodegenTool::Claude => "claude",
        }
    }

    fn rate_limit_patterns(&self) -> &'static [&'static str] {
        match self {
            CodegenTool::Codex => &[
                "rate limit reached",
                "rate_limit_error",
                "429",
                "too many requests",
            ],
            CodegenTool::Claude => &[
                "usage limit reached",
                "rate limit reached",
                "rate_limit_error",
                "429",
                "limit will reset",
            ],
        }
    }
}

/// Captured result of one code generation run.
#[derive(Debug, Clone)]
pub struct CodegenOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub rate_limited: bool,
}

impl CodegenOutput {
    /// Text worth showing to the user or an analysis model.
    pub fn transcript(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// A configured code generation CLI.
#[derive(Debug, Clone)]
pub struct Codegen {
    tool: CodegenTool,
    model: Option<String>,
    ai_token: Option<String>,
}

impl Codegen {
    pub fn new(tool: CodegenTool) -> Self {
        Self {
            tool,
            model: None,
            ai_token: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Exported to the child as `OPENROUTER_API_KEY` when non-empty.
    pub fn with_ai_token(mut self, token: Option<String>) -> Self {
        self.ai_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn tool(&self) -> CodegenTool {
        self.tool
    }

    fn args(&self) -> Vec<String> {
        let mut args = match self.tool {
            CodegenTool::Codex => vec!["exec".to_string()],
            CodegenTool::Claude => vec![
                "--print".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
        };

        if let Some(ref model) = self.model {
            match self.tool {
                CodegenTool::Codex => {
                    args.push("-m".to_string());
                    args.push(model.clone());
                }
                CodegenTool::Claude => {
                    args.push("--model".to_string());
                    args.push(model.clone());
                }
            }
        }

        args
    }

    pub fn is_rate_limited(&self, stdout: &str, stderr: &str) -> bool {
        let combined = format!("{}{}", stdout, stderr).to_lowercase();
        self.tool
            .rate_limit_patterns()
            .iter()
            .any(|pattern| combined.contains(pattern))
    }

    /// Run the tool in `repo_dir` with `prompt` on stdin and wait for it.
    pub fn run(&self, repo_dir: &Path, prompt: &str) -> Result<CodegenOutput> {
        let mut cmd = Command::new(self.tool.name());
        cmd.args(self.args())
            .current_dir(repo_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref token) = self.ai_token {
            cmd.env("OPENROUTER_API_KEY", token);
        }

        // New process group: Ctrl+C at the terminal must not kill the child
        // while the menu is suspended.
        #[cfg(unix)]
        let child_result = cmd.process_group(0).spawn();
        #[cfg(not(unix))]
        let child_result = cmd.spawn();

        let mut child = child_result.with_context(|| {
            format!(
                "Failed to spawn {} process. Is {} CLI installed?",
                self.tool.name(),
                self.tool.name()
            )
        })?;

        tracing::info!(tool = self.tool.name(), dir = %repo_dir.display(), prompt_len = prompt.len(), "started code generation");

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let rate_limited = self.is_rate_limited(&stdout, &stderr);

        tracing::info!(
            tool = self.tool.name(),
            status = ?output.status.code(),
            rate_limited,
            "code generation finished"
        );

        Ok(CodegenOutput {
            stdout,
            stderr,
            success: output.status.success(),
            rate_limited,
        })
    }

    /// `<tool> --version`, for availability checks.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(self.tool.name())
            .arg("--version")
            .output()
            .map_err(|e| GrepoError::external(self.tool.name(), None, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GrepoError::external(self.tool.name(), None, stderr).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
