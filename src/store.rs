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

//! Per-user config files and the active-user pointer.
//!
//! Layout under the config directory:
//!
//! ```text
//! config.json          {"active_user": "alice"}
//! users/alice.json     {"username", "token", "openrouter_token", "model", "created_at"}
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::constants::DEFAULT_MODEL;
use crate::error::{GrepoError, Result};
use crate::obfuscate;

const USERS_DIR: &str = "users";
const MAIN_CONFIG_FILE: &str = "config.json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A user's settings with secrets in clear text. Only ever held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    pub username: String,
    pub github_token: String,
    pub ai_token: String,
    pub model: String,
    created_at: String,
}

impl UserConfig {
    pub fn new(username: &str, github_token: &str) -> Self {
        Self {
            username: username.to_string(),
            github_token: github_token.to_string(),
            ai_token: String::new(),
            model: DEFAULT_MODEL.to_string(),
            created_at: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// When the record was first created. Empty for records written by tools
    /// that did not track it.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn has_github_token(&self) -> bool {
        !self.github_token.is_empty()
    }

    pub fn has_ai_token(&self) -> bool {
        !self.ai_token.is_empty()
    }
}

/// On-disk shape of a user record. Secrets are obfuscated.
#[derive(Debug, Serialize, Deserialize)]
struct StoredUserConfig {
    #[serde(default)]
    username: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    openrouter_token: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MainConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_user: Option<String>,
}

/// Result of [`ConfigStore::load`]: the record plus any fields that failed to
/// decode and were blanked.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: UserConfig,
    pub corrupt_fields: Vec<String>,
}

impl LoadedConfig {
    /// `ConfigCorrupt` describing the blanked fields, if there were any.
    pub fn corruption(&self) -> Option<GrepoError> {
        if self.corrupt_fields.is_empty() {
            return None;
        }
        Some(GrepoError::ConfigCorrupt {
            username: self.config.username.clone(),
            fields: self.corrupt_fields.clone(),
        })
    }
}

/// Flat-file store rooted at the grepo config directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn users_dir(&self) -> PathBuf {
        self.root.join(USERS_DIR)
    }

    fn user_path(&self, username: &str) -> Result<PathBuf> {
        validate_username(username)?;
        Ok(self.users_dir().join(format!("{}.json", username)))
    }

    /// Load a user's record. A secret that fails to decode is left empty and
    /// reported in `corrupt_fields` instead of failing the whole load.
    pub fn load(&self, username: &str) -> Result<LoadedConfig> {
        let path = self.user_path(username)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GrepoError::NotFound(format!("user '{}'", username)));
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredUserConfig =
            serde_json::from_str(&content).map_err(|e| GrepoError::Unreadable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let mut corrupt_fields = Vec::new();
        let mut reveal = |field: &str, value: &str| -> String {
            if value.is_empty() {
                return String::new();
            }
            match obfuscate::decode(value) {
                Ok(plain) => plain,
                Err(e) => {
                    tracing::warn!(user = username, field, error = %e, "blanking undecodable field");
                    corrupt_fields.push(field.to_string());
                    String::new()
                }
            }
        };
        let github_token = reveal("token", &stored.token);
        let ai_token = reveal("openrouter_token", &stored.openrouter_token);

        let model = if stored.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            stored.model
        };

        Ok(LoadedConfig {
            config: UserConfig {
                // The filename is the key; a hand-edited username inside the
                // file must not redirect later saves elsewhere.
                username: username.to_string(),
                github_token,
                ai_token,
                model,
                created_at: stored.created_at,
            },
            corrupt_fields,
        })
    }

    /// Write the full record, replacing any previous file atomically.
    pub fn save(&self, config: &UserConfig) -> Result<()> {
        let path = self.user_path(&config.username)?;
        let stored = StoredUserConfig {
            username: config.username.clone(),
            token: obfuscate::encode(&config.github_token),
            openrouter_token: if config.ai_token.is_empty() {
                String::new()
            } else {
                obfuscate::encode(&config.ai_token)
            },
            model: config.model.clone(),
            created_at: config.created_at.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        write_atomically(&path, json.as_bytes())?;
        tracing::info!(user = %config.username, path = %path.display(), "saved user config");
        Ok(())
    }

    /// Known usernames, sorted. A missing users directory means no users.
    pub fn list_usernames(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.users_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_username(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a user's record. Clears the active-user pointer if it named them.
    pub fn delete(&self, username: &str) -> Result<()> {
        let path = self.user_path(username)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GrepoError::NotFound(format!("user '{}'", username)));
            }
            Err(e) => return Err(e.into()),
        }
        if self.active_user()?.as_deref() == Some(username) {
            self.write_main_config(&MainConfig { active_user: None })?;
        }
        tracing::info!(user = username, "deleted user config");
        Ok(())
    }

    pub fn active_user(&self) -> Result<Option<String>> {
        Ok(self.read_main_config()?.active_user)
    }

    pub fn set_active_user(&self, username: &str) -> Result<()> {
        validate_username(username)?;
        let mut main = self.read_main_config()?;
        main.active_user = Some(username.to_string());
        self.write_main_config(&main)
    }

    fn read_main_config(&self) -> Result<MainConfig> {
        let path = self.root.join(MAIN_CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(main) => Ok(main),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable main config");
                    Ok(MainConfig::default())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MainConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_main_config(&self, main: &MainConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(main)?;
        write_atomically(&self.root.join(MAIN_CONFIG_FILE), json.as_bytes())
    }
}

/// Usernames double as filenames, so keep them to a single safe path segment.
pub fn validate_username(username: &str) -> Result<()> {
    let ok = !username.is_empty()
        && username.len() <= 100
        && !username.starts_with('.')
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(GrepoError::InvalidUsername(username.to_string()))
    }
}

/// Write to a temp file in the target directory, then rename over the target.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| GrepoError::NotFound(format!("parent of {}", path.display())))?;
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| GrepoError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_save_then_load_round_trips_every_field() {
        let (_dir, store) = store();
        let mut config = UserConfig::new("alice", "ghp_ABC123");
        config.ai_token = "sk-or-v1-secret".to_string();
        config.model = "qwen/qwen-2.5-coder-32b-instruct:free".to_string();
        store.save(&config).unwrap();

        let loaded = store.load("alice").unwrap();
        assert!(loaded.corrupt_fields.is_empty());
        assert!(loaded.corruption().is_none());
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.config.github_token, "ghp_ABC123");
    }

    #[test]
    fn test_secrets_are_not_stored_in_clear() {
        let (dir, store) = store();
        store.save(&UserConfig::new("alice", "ghp_ABC123")).unwrap();

        let raw = fs::read_to_string(dir.path().join("users/alice.json")).unwrap();
        assert!(!raw.contains("ghp_ABC123"));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["token"], obfuscate::encode("ghp_ABC123"));
        assert_eq!(value["openrouter_token"], "");
        assert_eq!(value["model"], DEFAULT_MODEL);
        assert!(value["created_at"].as_str().unwrap().len() >= 19);
    }

    #[test]
    fn test_record_without_username_uses_file_name() {
        let (dir, store) = store();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(dir.path().join("users/carol.json"), r#"{"token":"Z2hwX0FCQzEyMw=="}"#).unwrap();

        let loaded = store.load("carol").unwrap();
        assert_eq!(loaded.config.username, "carol");
        assert_eq!(loaded.config.github_token, "ghp_ABC123");
        assert_eq!(loaded.config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_truncated_record_names_the_file() {
        let (dir, store) = store();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(dir.path().join("users/alice.json"), "{ truncated").unwrap();

        let err = store.load("alice").unwrap_err();
        assert!(matches!(err, GrepoError::Unreadable { .. }));
        assert!(err.to_string().contains("alice.json"), "{}", err);
    }

    #[test]
    fn test_load_missing_user_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.load("bob"), Err(GrepoError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_ai_token_does_not_block_github_token() {
        let (dir, store) = store();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        let record = serde_json::json!({
            "username": "alice",
            "token": obfuscate::encode("ghp_ABC123"),
            "openrouter_token": "%%%not-base64%%%",
            "model": "openai/gpt-4o",
            "created_at": "2024-05-01 10:00:00"
        });
        fs::write(dir.path().join("users/alice.json"), record.to_string()).unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.config.github_token, "ghp_ABC123");
        assert_eq!(loaded.config.ai_token, "");
        assert_eq!(loaded.corrupt_fields, vec!["openrouter_token".to_string()]);
        assert!(matches!(
            loaded.corruption(),
            Some(GrepoError::ConfigCorrupt { ref fields, .. }) if fields == &["openrouter_token"]
        ));
        assert_eq!(loaded.config.created_at(), "2024-05-01 10:00:00");
    }

    #[test]
    fn test_stripped_padding_on_disk_still_loads() {
        let (dir, store) = store();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        let stripped = obfuscate::encode("ghp_ABC123").trim_end_matches('=').to_string();
        let record = serde_json::json!({ "username": "alice", "token": stripped });
        fs::write(dir.path().join("users/alice.json"), record.to_string()).unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.config.github_token, "ghp_ABC123");
        assert_eq!(loaded.config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_created_at_survives_resave() {
        let (_dir, store) = store();
        let config = UserConfig::new("alice", "ghp_1");
        store.save(&config).unwrap();

        let mut loaded = store.load("alice").unwrap().config;
        loaded.github_token = "ghp_2".to_string();
        store.save(&loaded).unwrap();

        let reloaded = store.load("alice").unwrap().config;
        assert_eq!(reloaded.github_token, "ghp_2");
        assert_eq!(reloaded.created_at(), config.created_at());
    }

    #[test]
    fn test_list_usernames_without_directory_is_empty() {
        let (_dir, store) = store();
        assert!(store.list_usernames().unwrap().is_empty());
    }

    #[test]
    fn test_list_usernames_is_sorted_and_ignores_other_files() {
        let (dir, store) = store();
        store.save(&UserConfig::new("zoe", "t")).unwrap();
        store.save(&UserConfig::new("alice", "t")).unwrap();
        fs::write(dir.path().join("users/notes.txt"), "x").unwrap();

        assert_eq!(store.list_usernames().unwrap(), vec!["alice", "zoe"]);
    }

    #[test]
    fn test_active_user_pointer() {
        let (_dir, store) = store();
        assert_eq!(store.active_user().unwrap(), None);

        store.save(&UserConfig::new("alice", "t")).unwrap();
        store.set_active_user("alice").unwrap();
        assert_eq!(store.active_user().unwrap().as_deref(), Some("alice"));

        store.delete("alice").unwrap();
        assert_eq!(store.active_user().unwrap(), None);
        assert!(matches!(store.delete("alice"), Err(GrepoError::NotFound(_))));
    }

    #[test]
    fn test_usernames_must_be_single_path_segment() {
        for bad in ["", "../etc", "a/b", ".hidden", "with space"] {
            assert!(
                matches!(validate_username(bad), Err(GrepoError::InvalidUsername(_))),
                "{bad:?} should be rejected"
            );
        }
        for good in ["alice", "octo-cat", "user_1", "a.b"] {
            assert!(validate_username(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn test_save_leaves_no_temp_files_behind() {
        let (dir, store) = store();
        store.save(&UserConfig::new("alice", "t1")).unwrap();
        store.save(&UserConfig::new("alice", "t2")).unwrap();

        let files: Vec<_> = fs::read_dir(dir.path().join("users"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("alice.json")]);
    }
}
