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
use std::path::{Path, PathBuf};

use crate::app::App;
use crate::menu::{Console, Outcome};
use crate::workflows::{project, settings, users};

fn report(outcome: Outcome) {
    if let Outcome::Message(message) = outcome {
        println!("{}", message);
    }
}

fn repo_dir(path: &Path) -> Result<PathBuf> {
    let dir = path
        .canonicalize()
        .with_context(|| format!("Repository directory not found: {}", path.display()))?;
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    Ok(dir)
}

pub fn cmd_login(app: &mut App, username: Option<String>, token: Option<String>, no_verify: bool) -> Result<()> {
    let mut console = Console::stdio();
    let username = users::connect(app, &mut console, username.as_deref(), token.as_deref(), !no_verify)?;
    println!("Logged in as {}", username);
    Ok(())
}

pub fn cmd_users(app: &App) -> Result<()> {
    let names = app.store.list_usernames()?;
    if names.is_empty() {
        println!("No users configured. Run `grepo login` to add one.");
        return Ok(());
    }
    let active = app.user.as_ref().map(|u| u.username.as_str());
    for name in &names {
        let marker = if active == Some(name.as_str()) { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

pub fn cmd_use(app: &mut App, name: &str) -> Result<()> {
    let mut console = Console::stdio();
    report(users::switch(app, &mut console, name)?);
    Ok(())
}

pub fn cmd_repos(app: &App, remote: bool) -> Result<()> {
    if remote {
        let repos = app.github()?.list_repos()?;
        for repo in &repos {
            let visibility = if repo.private { "private" } else { "public" };
            println!("{:<40} {:<8} {}", repo.full_name, visibility, repo.html_url);
        }
        println!("{} repositories", repos.len());
        return Ok(());
    }

    let repos = app.local_repos()?;
    if repos.is_empty() {
        println!("No local repositories in {}", app.user_workspace()?.display());
        return Ok(());
    }
    for path in repos {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn cmd_status(app: &mut App) -> Result<()> {
    let mut console = Console::stdio();
    settings::status(app, &mut console)?;
    Ok(())
}

pub fn cmd_create(app: &mut App, name: &str) -> Result<()> {
    let mut console = Console::stdio();
    let path = project::create_local_project(app, &mut console, Some(name))?;
    println!("Created {}", path.display());
    Ok(())
}

pub fn cmd_roadmap(app: &mut App, path: &Path) -> Result<()> {
    let dir = repo_dir(path)?;
    let mut console = Console::stdio();
    report(project::generate_roadmap(app, &mut console, &dir)?);
    Ok(())
}

pub fn cmd_issues(app: &mut App, path: &Path, yes: bool) -> Result<()> {
    let dir = repo_dir(path)?;
    let mut console = Console::stdio();
    report(project::create_issues(app, &mut console, &dir, yes)?);
    Ok(())
}

pub fn cmd_models(app: &App) -> Result<()> {
    let models = app.openrouter()?.list_free_models()?;
    if models.is_empty() {
        println!("No free models listed");
        return Ok(());
    }
    let active = app.model();
    for model in &models {
        let marker = if model.id == active { "*" } else { " " };
        let coding = if model.is_coding_model() { "code" } else { "" };
        println!("{} {:<60} {:<4} {}", marker, model.id, coding, model.context_length.map(|c| c.to_string()).unwrap_or_default());
    }
    Ok(())
}
