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
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::codegen::Codegen;
use crate::config::Settings;
use crate::error::GrepoError;
use crate::git::LocalGit;
use crate::github::GitHub;
use crate::menu::MenuContext;
use crate::openrouter::OpenRouter;
use crate::store::{ConfigStore, UserConfig};

/// Shared state for menu handlers and scripted commands.
pub struct App {
    pub settings: Settings,
    pub store: ConfigStore,
    pub user: Option<UserConfig>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let store = ConfigStore::new(settings.config_dir.clone());
        Self {
            settings,
            store,
            user: None,
        }
    }

    /// Load the active user, if one is recorded. Returns a warning when some
    /// of their fields could not be decoded, or when the record cannot be
    /// loaded at all; in that case grepo starts without an active user so
    /// `use` and `login` still work.
    pub fn load_active_user(&mut self) -> Result<Option<String>> {
        let name = match self.store.active_user() {
            Ok(Some(name)) => name,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "could not read the active user pointer");
                return Ok(Some(format!("{}; starting without an active user", e)));
            }
        };
        match self.store.load(&name) {
            Ok(loaded) => {
                let warning = loaded.corruption().map(|e| e.to_string());
                if let Some(ref w) = warning {
                    tracing::warn!(user = %name, "{}", w);
                }
                self.user = Some(loaded.config);
                Ok(warning)
            }
            Err(GrepoError::NotFound(_)) => {
                tracing::warn!(user = %name, "active user has no config file");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(user = %name, error = %e, "active user could not be loaded");
                Ok(Some(format!("{}; starting without an active user", e)))
            }
        }
    }

    /// Make `name` the active user. Returns a decode warning like
    /// [`load_active_user`](Self::load_active_user).
    pub fn switch_user(&mut self, name: &str) -> Result<Option<String>> {
        let loaded = self.store.load(name)?;
        self.store.set_active_user(name)?;
        let warning = loaded.corruption().map(|e| e.to_string());
        tracing::info!(user = name, "switched active user");
        self.user = Some(loaded.config);
        Ok(warning)
    }

    pub fn require_user(&self) -> Result<&UserConfig> {
        self.user
            .as_ref()
            .ok_or_else(|| GrepoError::MissingCredential("active user").into())
    }

    /// Apply `change` to a copy of the active user and save it. The in-memory
    /// user is replaced only after the save succeeded.
    pub fn update_user(&mut self, change: impl FnOnce(&mut UserConfig)) -> Result<()> {
        let mut user = self.require_user()?.clone();
        change(&mut user);
        self.store.save(&user)?;
        self.user = Some(user);
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    pub fn github(&self) -> Result<GitHub> {
        let user = self.require_user()?;
        if !user.has_github_token() {
            return Err(GrepoError::MissingCredential("GitHub token").into());
        }
        GitHub::new(&self.settings.github_api, &user.github_token, self.timeout())
    }

    /// OpenRouter client with the active user's AI token, if any.
    pub fn openrouter(&self) -> Result<OpenRouter> {
        let token = self.user.as_ref().map(|u| u.ai_token.as_str());
        OpenRouter::new(&self.settings.openrouter_api, token, self.timeout())
    }

    pub fn model(&self) -> String {
        self.user
            .as_ref()
            .map(|u| u.model.clone())
            .unwrap_or_else(|| crate::constants::DEFAULT_MODEL.to_string())
    }

    pub fn git(&self) -> LocalGit {
        LocalGit::new(self.user.as_ref().map(|u| u.github_token.as_str()))
    }

    pub fn codegen(&self) -> Codegen {
        Codegen::new(self.settings.codegen_tool)
            .with_model(self.settings.codegen_model.clone())
            .with_ai_token(self.user.as_ref().map(|u| u.ai_token.clone()))
    }

    /// `<workspace>/<username>`
    pub fn user_workspace(&self) -> Result<PathBuf> {
        Ok(self.settings.workspace_dir.join(&self.require_user()?.username))
    }

    /// Git repositories directly under the user's workspace, sorted by name.
    pub fn local_repos(&self) -> Result<Vec<PathBuf>> {
        let dir = self.user_workspace()?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", dir.display()));
            }
        };
        let mut repos = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() && LocalGit::is_repo(&path) {
                repos.push(path);
            }
        }
        repos.sort();
        Ok(repos)
    }
}

impl MenuContext for App {
    fn context_line(&self) -> String {
        match &self.user {
            Some(user) => {
                let repos = self.local_repos().map(|r| r.len()).unwrap_or(0);
                format!(
                    "user: {} · {} local repositories · model: {}",
                    user.username, repos, user.model
                )
            }
            None => "no active user".to_string(),
        }
    }
}
