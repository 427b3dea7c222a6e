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

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::app::App;
use crate::changelog::{self, Category};
use crate::constants::COMMIT_LIMIT;
use crate::menu::{Console, Outcome};
use crate::scaffold;

/// Print git's output, or `fallback` when git printed nothing.
fn show(console: &mut Console, output: &str, fallback: &str) -> Result<()> {
    let output = output.trim();
    console.println(if output.is_empty() { fallback } else { output })?;
    Ok(())
}

pub fn status(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let out = app.git().status(dir)?;
    show(console, &out, "Working tree clean")?;
    Ok(Outcome::Done)
}

pub fn commit(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let git = app.git();
    if !git.has_changes(dir)? {
        return Ok(Outcome::Message("Nothing to commit".to_string()));
    }
    show(console, &git.status(dir)?, "")?;
    let message = console.prompt("Commit message (empty to cancel)")?;
    if message.is_empty() {
        return Ok(Outcome::Message("Commit cancelled".to_string()));
    }
    git.commit_all(dir, &message)?;
    Ok(Outcome::Message(format!("Committed: {}", message)))
}

pub fn push_soft(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let out = app.git().push(dir)?;
    show(console, &out, "Pushed")?;
    Ok(Outcome::Message("Push complete".to_string()))
}

pub fn pull_soft(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let out = app.git().pull_ff_only(dir)?;
    show(console, &out, "Already up to date")?;
    Ok(Outcome::Message("Pull complete".to_string()))
}

pub fn push_hard(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let out = app.git().push_with_lease(dir)?;
    show(console, &out, "Pushed")?;
    Ok(Outcome::Message("Push (force with lease) complete".to_string()))
}

pub fn pull_hard(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    console.println("Untracked files that are not ignored will be removed before the rebase.")?;
    if !console.confirm("Continue?")? {
        return Ok(Outcome::Message("Pull cancelled".to_string()));
    }
    let out = app.git().pull_autostash(dir)?;
    show(console, &out, "Already up to date")?;
    Ok(Outcome::Message("Pull (rebase) complete".to_string()))
}

pub fn overwrite_remote(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    console.println("The remote branch will be replaced by your local branch. Remote-only commits are lost.")?;
    if !console.confirm("Overwrite the remote?")? {
        return Ok(Outcome::Message("Nothing changed".to_string()));
    }
    let out = app.git().force_push(dir)?;
    show(console, &out, "Remote overwritten")?;
    Ok(Outcome::Message("Remote overwritten".to_string()))
}

pub fn overwrite_local(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    console.println("Your local branch will be reset to the remote. Local commits and changes are lost.")?;
    if !console.confirm("Overwrite the local copy?")? {
        return Ok(Outcome::Message("Nothing changed".to_string()));
    }
    let out = app.git().reset_to_remote(dir)?;
    show(console, &out, "Local branch reset")?;
    Ok(Outcome::Message("Local copy overwritten".to_string()))
}

pub fn recent_commits(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let commits = app.git().recent_commits(dir, COMMIT_LIMIT)?;
    if commits.is_empty() {
        return Ok(Outcome::Message("No commits yet".to_string()));
    }
    for commit in commits {
        console.println(format!("  {}", commit))?;
    }
    Ok(Outcome::Done)
}

/// Clone one of the active user's GitHub repositories that is not yet in
/// the workspace.
pub fn clone_remote(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let github = app.github()?;
    let workspace = app.user_workspace()?;
    let repos: Vec<_> = github
        .list_repos()?
        .into_iter()
        .filter(|r| !workspace.join(&r.name).exists())
        .collect();
    if repos.is_empty() {
        return Ok(Outcome::Message("Every repository is already cloned".to_string()));
    }

    let options: Vec<String> = repos
        .iter()
        .map(|r| {
            let visibility = if r.private { "private" } else { "public" };
            match r.description.as_deref().filter(|d| !d.is_empty()) {
                Some(desc) => format!("{} ({}) - {}", r.name, visibility, desc),
                None => format!("{} ({})", r.name, visibility),
            }
        })
        .collect();
    let Some(index) = console.choose("Repository to clone", &options)? else {
        return Ok(Outcome::Done);
    };
    let repo = &repos[index];

    fs::create_dir_all(&workspace).with_context(|| format!("Failed to create {}", workspace.display()))?;
    let dest = workspace.join(&repo.name);
    console.println(format!("Cloning {} ...", repo.full_name))?;
    app.git().clone(&repo.clone_url, &dest)?;
    tracing::info!(repo = %repo.full_name, dest = %dest.display(), "cloned repository");
    Ok(Outcome::Message(format!("Cloned {} into {}", repo.full_name, dest.display())))
}

/// Create a repository on GitHub, clone it, add README and .gitignore,
/// commit and push.
pub fn create_github_repo(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let github = app.github()?;
    let workspace = app.user_workspace()?;

    let name = console.prompt("Repository name")?;
    scaffold::validate_project_name(&name)?;
    let description = console.prompt("Description (optional)")?;
    let private = console.confirm("Private repository?")?;

    let owner = github.authenticated_user()?.login;
    if github.repo_exists(&owner, &name)? {
        bail!("{}/{} already exists on GitHub", owner, name);
    }
    let dest = workspace.join(&name);
    if dest.exists() {
        bail!("{} already exists", dest.display());
    }

    let repo = github.create_repo(&name, &description, private)?;
    console.println(format!("Created {}", repo.html_url))?;

    fs::create_dir_all(&workspace).with_context(|| format!("Failed to create {}", workspace.display()))?;
    let git = app.git();
    git.clone(&repo.clone_url, &dest)?;
    scaffold::write_initial_files(&dest, &scaffold::repository_readme(&name, &owner, &description))?;
    changelog::append_entry(&dest, Category::Info, &format!("Created repository {}", repo.full_name))?;
    git.commit_all(&dest, "Initial commit: add README.md and .gitignore")?;
    git.push(&dest)?;

    Ok(Outcome::Message(format!("{} is ready at {}", repo.full_name, dest.display())))
}
