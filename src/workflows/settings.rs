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

use anyhow::Result;

use super::mask;
use crate::app::App;
use crate::github::GitHub;
use crate::menu::{Console, Outcome};

const HELP: &str = "\
Navigation
  Up/Down or k/j     move the selection
  Enter, Right, l    open a submenu or run an action
  Esc, Left, h, q    go back (leaves grepo from the main menu)
  Ctrl+C             quit

Workflows
  Repositories       every git repository in your workspace has its own menu:
                     status, commit, push and pull (soft or hard), overwrite
                     remote or local, recent commits.
  Project            generate roadmap.md from README.md with the AI model,
                     turn the roadmap into GitHub issues, and let the code
                     generator develop an issue. The result is analysed and
                     the issue can be closed when it looks complete.
  Users              several GitHub accounts can be stored; one is active.
  Settings           tokens, AI model and code generator checks.

Every project action records a line in the repository's CHANGELOG.md.";

pub fn help(_app: &mut App, console: &mut Console) -> Result<Outcome> {
    console.println(HELP)?;
    Ok(Outcome::Done)
}

/// Active user, workspace, and availability of git and the code generator.
pub fn status(app: &mut App, console: &mut Console) -> Result<Outcome> {
    match &app.user {
        Some(user) => {
            console.println(format!("Active user:     {}", user.username))?;
            console.println(format!("AI model:        {}", user.model))?;
            console.println(format!(
                "AI token:        {}",
                if user.has_ai_token() { "configured" } else { "not configured" }
            ))?;
            let repos = app.local_repos()?;
            console.println(format!("Workspace:       {}", app.user_workspace()?.display()))?;
            console.println(format!("Local repos:     {}", repos.len()))?;
        }
        None => console.println("Active user:     none (use Users > Connect new user)")?,
    }
    console.println(format!("Users stored:    {}", app.store.list_usernames()?.len()))?;
    console.println(format!("Config dir:      {}", app.settings.config_dir.display()))?;

    let git = match app.git().version() {
        Ok(v) => v,
        Err(e) => format!("unavailable ({:#})", e),
    };
    console.println(format!("git:             {}", git))?;
    let codegen = app.codegen();
    let tool = match codegen.version() {
        Ok(v) => v,
        Err(e) => format!("unavailable ({:#})", e),
    };
    console.println(format!("{:<17}{}", format!("{}:", codegen.tool().name()), tool))?;
    Ok(Outcome::Done)
}

/// Current settings with tokens masked.
pub fn show(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let user = app.require_user()?;
    console.println(format!("Username:        {}", user.username))?;
    console.println(format!("GitHub token:    {}", mask(&user.github_token)))?;
    console.println(format!("AI token:        {}", mask(&user.ai_token)))?;
    console.println(format!("AI model:        {}", user.model))?;
    if !user.created_at().is_empty() {
        console.println(format!("Created:         {}", user.created_at()))?;
    }
    let s = &app.settings;
    console.println(format!("Workspace:       {}", s.workspace_dir.display()))?;
    console.println(format!("Config dir:      {}", app.store.root().display()))?;
    console.println(format!("Log file:        {}", s.log_file.display()))?;
    console.println(format!("GitHub API:      {}", s.github_api))?;
    console.println(format!("OpenRouter API:  {}", s.openrouter_api))?;
    console.println(format!(
        "Code generator:  {}{}",
        s.codegen_tool.name(),
        s.codegen_model.as_deref().map(|m| format!(" ({})", m)).unwrap_or_default()
    ))?;
    console.println(format!("Auto-close at:   {}% confidence", s.auto_close_confidence))?;
    Ok(Outcome::Done)
}

/// Replace the active user's GitHub token after checking it belongs to them.
pub fn change_github_token(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let username = app.require_user()?.username.clone();
    let token = console.prompt_secret("New GitHub token (empty to cancel)")?;
    if token.is_empty() {
        return Ok(Outcome::Message("Token unchanged".to_string()));
    }
    let login = GitHub::new(&app.settings.github_api, &token, app.timeout())?
        .authenticated_user()?
        .login;
    if !login.eq_ignore_ascii_case(&username) {
        anyhow::bail!("The token belongs to '{}', not '{}'", login, username);
    }
    app.update_user(|u| u.github_token = token)?;
    Ok(Outcome::Message("GitHub token updated".to_string()))
}

pub fn configure_ai_token(app: &mut App, console: &mut Console) -> Result<Outcome> {
    app.require_user()?;
    let token = console.prompt_secret("OpenRouter API token (empty to remove)")?;
    let message = if token.is_empty() { "AI token removed" } else { "AI token saved" };
    app.update_user(|u| u.ai_token = token)?;
    Ok(Outcome::Message(message.to_string()))
}

/// Pick from OpenRouter's free models.
pub fn choose_model(app: &mut App, console: &mut Console) -> Result<Outcome> {
    app.require_user()?;
    let models = app.openrouter()?.list_free_models()?;
    if models.is_empty() {
        return Ok(Outcome::Message("OpenRouter lists no free models right now".to_string()));
    }
    let options: Vec<String> = models
        .iter()
        .map(|m| {
            let coding = if m.is_coding_model() { " [code]" } else { "" };
            match m.context_length {
                Some(ctx) => format!("{}{} ({} tokens)", m.id, coding, ctx),
                None => format!("{}{}", m.id, coding),
            }
        })
        .collect();
    let Some(index) = console.choose("Model", &options)? else {
        return Ok(Outcome::Done);
    };
    set_model(app, &models[index].id)
}

pub fn enter_model(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let current = app.require_user()?.model.clone();
    let model = console.prompt_default("Model id", &current)?;
    set_model(app, &model)
}

fn set_model(app: &mut App, model: &str) -> Result<Outcome> {
    app.update_user(|u| u.model = model.to_string())?;
    tracing::info!(model, "model changed");
    Ok(Outcome::Message(format!("Model set to {}", model)))
}

pub fn check_codegen(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let codegen = app.codegen();
    let version = codegen.version()?;
    console.println(format!("{} {}", codegen.tool().name(), version))?;
    if !app.user.as_ref().is_some_and(|u| u.has_ai_token()) {
        console.println("No AI token configured; the code generator uses its own credentials.")?;
    }
    Ok(Outcome::Message(format!("{} is available", codegen.tool().name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::app_with_alice;
    use crate::menu::console::testing::scripted;
    use crate::testutil::{serve, Response};
    use tempfile::TempDir;

    #[test]
    fn test_show_masks_tokens() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        app.update_user(|u| u.ai_token = "sk-or-v1-abcdef123456".to_string()).unwrap();
        let (mut console, out) = scripted("");
        show(&mut app, &mut console).unwrap();
        let text = out.text();
        assert!(text.contains("GitHub token:    ghp_…C123"));
        assert!(text.contains("AI token:        sk-o…3456"));
        assert!(!text.contains("abcdef"));
    }

    #[test]
    fn test_ai_token_is_saved_and_removed() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (mut console, _) = scripted("sk-or-secret\n\n");
        configure_ai_token(&mut app, &mut console).unwrap();
        assert_eq!(app.store.load("alice").unwrap().config.ai_token, "sk-or-secret");

        let outcome = configure_ai_token(&mut app, &mut console).unwrap();
        assert_eq!(outcome, Outcome::Message("AI token removed".to_string()));
        assert_eq!(app.store.load("alice").unwrap().config.ai_token, "");
    }

    #[test]
    fn test_failed_save_keeps_previous_ai_token() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let users = dir.path().join("config/users");
        std::fs::remove_dir_all(&users).unwrap();
        std::fs::write(&users, "").unwrap();

        let (mut console, _) = scripted("sk-or-secret\n");
        assert!(configure_ai_token(&mut app, &mut console).is_err());
        assert_eq!(app.require_user().unwrap().ai_token, "");
    }

    #[test]
    fn test_enter_model_defaults_to_current() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (mut console, _) = scripted("\nqwen/qwen-2.5-coder-32b-instruct:free\n");
        enter_model(&mut app, &mut console).unwrap();
        assert_eq!(app.model(), "openai/gpt-4o");
        enter_model(&mut app, &mut console).unwrap();
        assert_eq!(
            app.store.load("alice").unwrap().config.model,
            "qwen/qwen-2.5-coder-32b-instruct:free"
        );
    }

    #[test]
    fn test_choose_model_from_free_list() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (base, _) = serve(vec![Response::json(
            200,
            r#"{"data":[
                {"id":"openai/gpt-4o","pricing":{"prompt":"0.0000025","completion":"0.00001"}},
                {"id":"meta/llama:free","pricing":{"prompt":"0","completion":"0"}},
                {"id":"qwen/coder:free","context_length":32768,"pricing":{"prompt":"0","completion":"0"}}
            ]}"#,
        )]);
        app.settings.openrouter_api = base;

        let (mut console, out) = scripted("1\n");
        let outcome = choose_model(&mut app, &mut console).unwrap();
        assert!(out.text().contains("1. qwen/coder:free [code] (32768 tokens)"));
        assert!(!out.text().contains("gpt-4o"));
        assert_eq!(outcome, Outcome::Message("Model set to qwen/coder:free".to_string()));
    }

    #[test]
    fn test_github_token_must_belong_to_user() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (base, _) = serve(vec![Response::json(200, r#"{"login":"mallory"}"#)]);
        app.settings.github_api = base;

        let (mut console, _) = scripted("ghp_OTHER\n");
        let err = change_github_token(&mut app, &mut console).unwrap_err();
        assert!(err.to_string().contains("mallory"));
        assert_eq!(app.store.load("alice").unwrap().config.github_token, "ghp_ABC123");
    }

    #[test]
    fn test_status_without_user() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(crate::app::testing::settings(dir.path()));
        let (mut console, out) = scripted("");
        status(&mut app, &mut console).unwrap();
        assert!(out.text().contains("Active user:     none"));
        assert!(out.text().contains("Users stored:    0"));
    }
}
