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

//! Thin wrapper over the `git` executable.
//!
//! Remote operations authenticate with a one-shot `http.extraHeader` built
//! from the GitHub token and passed through `GIT_CONFIG_*` (git 2.31+), so
//! the token never lands in `.git/config`, a remote URL or the process
//! arguments.

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

use crate::error::GrepoError;

static REMOTE_SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com[:/](?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+?)(?:\.git)?/?$")
        .unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct LocalGit {
    auth_header: Option<String>,
}

impl LocalGit {
    pub fn new(github_token: Option<&str>) -> Self {
        let auth_header = github_token.filter(|t| !t.is_empty()).map(|token| {
            let basic = STANDARD.encode(format!("x-access-token:{}", token));
            format!("Authorization: Basic {}", basic)
        });
        Self { auth_header }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        self.exec(dir, args, false)
    }

    fn run_remote(&self, dir: &Path, args: &[&str]) -> Result<String> {
        self.exec(dir, args, true)
    }

    /// The header travels in `GIT_CONFIG_*` variables, which other local
    /// users cannot read the way they can read argv.
    fn command(&self, dir: &Path, args: &[&str], remote: bool) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir).args(args);
        if remote {
            if let Some(ref header) = self.auth_header {
                cmd.env("GIT_CONFIG_COUNT", "1")
                    .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                    .env("GIT_CONFIG_VALUE_0", header);
            }
        }
        // Never block on a credential prompt while the menu owns the terminal.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    fn exec(&self, dir: &Path, args: &[&str], remote: bool) -> Result<String> {
        let mut cmd = self.command(dir, args, remote);

        tracing::debug!(dir = %dir.display(), ?args, "git");
        let output = cmd
            .output()
            .map_err(|e| GrepoError::external("git", None, format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let message = if stderr.is_empty() { stdout } else { stderr };
            tracing::warn!(?args, %message, "git command failed");
            return Err(GrepoError::external("git", None, message).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.run(Path::new("."), &["--version"])?.trim().to_string())
    }

    pub fn is_repo(dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    /// `git status --short --branch`
    pub fn status(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["status", "--short", "--branch"])
    }

    pub fn has_changes(&self, dir: &Path) -> Result<bool> {
        Ok(!self.run(dir, &["status", "--porcelain"])?.trim().is_empty())
    }

    /// Stage everything and commit. Returns false when there was nothing to commit.
    pub fn commit_all(&self, dir: &Path, message: &str) -> Result<bool> {
        self.run(dir, &["add", "-A"])?;
        if !self.has_changes(dir)? {
            return Ok(false);
        }
        self.run(dir, &["commit", "-m", message])?;
        Ok(true)
    }

    pub fn current_branch(&self, dir: &Path) -> Result<String> {
        Ok(self
            .run(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    fn commit_pending(&self, dir: &Path, action: &str) -> Result<()> {
        let message = format!(
            "Auto-commit before {} ({})",
            action,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        if self.commit_all(dir, &message)? {
            tracing::info!(dir = %dir.display(), action, "committed pending changes");
        }
        Ok(())
    }

    /// Soft push: plain push of the current branch.
    pub fn push(&self, dir: &Path) -> Result<String> {
        self.commit_pending(dir, "push")?;
        let branch = self.current_branch(dir)?;
        self.run_remote(dir, &["push", "-u", "origin", &branch])
    }

    /// Hard push: overwrite the remote only if it has not moved since the last fetch.
    pub fn push_with_lease(&self, dir: &Path) -> Result<String> {
        self.commit_pending(dir, "push")?;
        let branch = self.current_branch(dir)?;
        self.run_remote(dir, &["push", "--force-with-lease", "origin", &branch])
    }

    /// Overwrite the remote branch with the local one unconditionally.
    pub fn force_push(&self, dir: &Path) -> Result<String> {
        self.commit_pending(dir, "force push")?;
        let branch = self.current_branch(dir)?;
        self.run_remote(dir, &["push", "--force", "origin", &branch])
    }

    /// Soft pull: fast-forward only.
    pub fn pull_ff_only(&self, dir: &Path) -> Result<String> {
        self.commit_pending(dir, "pull")?;
        self.run_remote(dir, &["pull", "--ff-only"])
    }

    /// Hard pull: rebase local commits onto the remote, stashing around it.
    pub fn pull_autostash(&self, dir: &Path) -> Result<String> {
        self.commit_pending(dir, "pull")?;
        self.run(dir, &["clean", "-fd"])?;
        self.run_remote(dir, &["pull", "--rebase", "--autostash"])
    }

    /// Overwrite the local branch with `origin/<branch>`. Local commits are lost.
    pub fn reset_to_remote(&self, dir: &Path) -> Result<String> {
        let branch = self.current_branch(dir)?;
        self.run_remote(dir, &["fetch", "origin"])?;
        let target = format!("origin/{}", branch);
        self.run(dir, &["reset", "--hard", &target])
    }

    pub fn recent_commits(&self, dir: &Path, n: usize) -> Result<Vec<String>> {
        let count = n.to_string();
        let out = match self.run(dir, &["log", "--oneline", "-n", &count]) {
            Ok(out) => out,
            // A repository without commits has no log.
            Err(_) if !self.has_head(dir) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(out.lines().map(str::to_string).collect())
    }

    fn has_head(&self, dir: &Path) -> bool {
        self.run(dir, &["rev-parse", "--verify", "HEAD"]).is_ok()
    }

    /// Tracked files, at most `limit` of them.
    pub fn file_tree(&self, dir: &Path, limit: usize) -> Result<Vec<String>> {
        let out = self.run(dir, &["ls-files"])?;
        Ok(out.lines().take(limit).map(str::to_string).collect())
    }

    /// `git init` with `main` as the initial branch.
    pub fn init(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["init"])?;
        self.run(dir, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        Ok(())
    }

    pub fn clone(&self, url: &str, dest: &Path) -> Result<()> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        let dest_str = dest.to_string_lossy();
        self.run_remote(parent, &["clone", url, &dest_str])?;
        Ok(())
    }

    pub fn add_remote(&self, dir: &Path, url: &str) -> Result<()> {
        self.run(dir, &["remote", "add", "origin", url])?;
        Ok(())
    }

    pub fn remote_url(&self, dir: &Path) -> Result<String> {
        Ok(self
            .run(dir, &["remote", "get-url", "origin"])?
            .trim()
            .to_string())
    }

    /// `(owner, repo)` of the `origin` remote.
    pub fn remote_slug(&self, dir: &Path) -> Result<(String, String)> {
        let url = self.remote_url(dir)?;
        parse_remote_slug(&url)
            .ok_or_else(|| GrepoError::NotFound(format!("GitHub remote in '{}'", url)).into())
    }
}

/// Parse `owner/repo` from an SSH or HTTPS GitHub remote URL.
pub fn parse_remote_slug(url: &str) -> Option<(String, String)> {
    let caps = REMOTE_SLUG_RE.captures(url.trim())?;
    Some((caps["owner"].to_string(), caps["repo"].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn repo() -> (TempDir, LocalGit) {
        let dir = TempDir::new().unwrap();
        let git = LocalGit::new(None);
        git.init(dir.path()).unwrap();
        git.run(dir.path(), &["config", "user.name", "Test"]).unwrap();
        git.run(dir.path(), &["config", "user.email", "test@example.com"]).unwrap();
        (dir, git)
    }

    #[test]
    fn test_parse_remote_slug_variants() {
        let expected = Some(("octo".to_string(), "hello-world".to_string()));
        assert_eq!(parse_remote_slug("git@github.com:octo/hello-world.git"), expected);
        assert_eq!(parse_remote_slug("https://github.com/octo/hello-world.git"), expected);
        assert_eq!(parse_remote_slug("https://github.com/octo/hello-world"), expected);
        assert_eq!(parse_remote_slug("https://github.com/octo/hello-world/\n"), expected);
        assert_eq!(
            parse_remote_slug("https://github.com/octo/my.lib.git"),
            Some(("octo".to_string(), "my.lib".to_string()))
        );
        assert_eq!(parse_remote_slug("https://gitlab.com/octo/x.git"), None);
    }

    #[test]
    fn test_auth_header_is_basic_x_access_token() {
        let git = LocalGit::new(Some("ghp_ABC123"));
        let header = git.auth_header.clone().unwrap();
        let encoded = header.strip_prefix("Authorization: Basic ").unwrap();
        assert_eq!(
            String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap(),
            "x-access-token:ghp_ABC123"
        );
        assert!(LocalGit::new(Some("")).auth_header.is_none());
    }

    fn env_of(cmd: &Command, key: &str) -> Option<String> {
        cmd.get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .and_then(|(_, v)| v)
            .map(|v| v.to_string_lossy().into_owned())
    }

    #[test]
    fn test_token_travels_in_environment_not_argv() {
        let git = LocalGit::new(Some("ghp_ABC123"));
        let header = git.auth_header.clone().unwrap();

        let cmd = git.command(Path::new("."), &["push", "origin", "main"], true);
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["push", "origin", "main"]);
        assert!(args.iter().all(|a| !a.contains(&header) && !a.contains("extraHeader")));
        assert_eq!(env_of(&cmd, "GIT_CONFIG_COUNT").as_deref(), Some("1"));
        assert_eq!(env_of(&cmd, "GIT_CONFIG_KEY_0").as_deref(), Some("http.extraHeader"));
        assert_eq!(env_of(&cmd, "GIT_CONFIG_VALUE_0"), Some(header));

        let local = git.command(Path::new("."), &["status"], false);
        assert!(env_of(&local, "GIT_CONFIG_VALUE_0").is_none());
    }

    #[test]
    fn test_commit_all_and_log() {
        if !git_available() {
            return;
        }
        let (dir, git) = repo();
        assert!(git.recent_commits(dir.path(), 5).unwrap().is_empty());
        assert!(!git.commit_all(dir.path(), "nothing").unwrap());

        fs::write(dir.path().join("a.txt"), "a").unwrap();
        assert!(git.has_changes(dir.path()).unwrap());
        assert!(git.commit_all(dir.path(), "add a").unwrap());
        assert!(!git.has_changes(dir.path()).unwrap());

        let log = git.recent_commits(dir.path(), 5).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("add a"));
        assert_eq!(git.current_branch(dir.path()).unwrap(), "main");
        assert_eq!(git.file_tree(dir.path(), 10).unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn test_remote_slug_from_repo() {
        if !git_available() {
            return;
        }
        let (dir, git) = repo();
        git.add_remote(dir.path(), "git@github.com:octo/demo.git").unwrap();
        assert_eq!(
            git.remote_slug(dir.path()).unwrap(),
            ("octo".to_string(), "demo".to_string())
        );
    }

    #[test]
    fn test_failure_is_external_service_error() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let err = LocalGit::new(None).status(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GrepoError>(),
            Some(GrepoError::ExternalService { service: "git", .. })
        ));
    }
}
