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

use anyhow::{bail, Result};

use crate::app::App;
use crate::error::GrepoError;
use crate::github::GitHub;
use crate::menu::{Console, Outcome};
use crate::store::{validate_username, UserConfig};

pub fn switch(app: &mut App, console: &mut Console, name: &str) -> Result<Outcome> {
    if let Some(warning) = app.switch_user(name)? {
        console.println(format!("Warning: {}", warning))?;
    }
    Ok(Outcome::Message(format!("Active user: {}", name)))
}

/// Store a GitHub account and make it active. Missing values are prompted.
/// With `verify`, the token is checked against GitHub and the account login
/// becomes the username. Returns the username.
pub fn connect(
    app: &mut App,
    console: &mut Console,
    username: Option<&str>,
    token: Option<&str>,
    verify: bool,
) -> Result<String> {
    let token = match token.filter(|t| !t.trim().is_empty()) {
        Some(token) => token.trim().to_string(),
        None => console.prompt_secret("GitHub personal access token")?,
    };
    if token.is_empty() {
        return Err(GrepoError::MissingCredential("GitHub token").into());
    }

    let username = if verify {
        let user = GitHub::new(&app.settings.github_api, &token, app.timeout())?.authenticated_user()?;
        if let Some(expected) = username {
            if !expected.eq_ignore_ascii_case(&user.login) {
                bail!("The token belongs to '{}', not '{}'", user.login, expected);
            }
        }
        console.println(format!(
            "Token verified for {}{}",
            user.login,
            user.name.as_deref().map(|n| format!(" ({})", n)).unwrap_or_default()
        ))?;
        user.login
    } else {
        match username {
            Some(name) => name.trim().to_string(),
            None => console.prompt("GitHub username")?,
        }
    };
    validate_username(&username)?;

    let config = match app.store.load(&username) {
        Ok(loaded) => {
            let mut existing = loaded.config;
            existing.github_token = token;
            existing
        }
        Err(GrepoError::NotFound(_)) => UserConfig::new(&username, &token),
        Err(e) => return Err(e.into()),
    };
    app.store.save(&config)?;
    app.store.set_active_user(&username)?;
    app.user = Some(config);
    tracing::info!(user = %username, verified = verify, "user connected");
    Ok(username)
}

pub fn remove(app: &mut App, console: &mut Console) -> Result<Outcome> {
    let names = app.store.list_usernames()?;
    if names.is_empty() {
        return Ok(Outcome::Message("No users stored".to_string()));
    }
    let Some(index) = console.choose("User to remove", &names)? else {
        return Ok(Outcome::Done);
    };
    let name = &names[index];
    if !console.confirm(&format!("Remove {} and their stored tokens?", name))? {
        return Ok(Outcome::Message("Nothing removed".to_string()));
    }
    app.store.delete(name)?;
    if app.user.as_ref().is_some_and(|u| &u.username == name) {
        app.user = None;
    }
    Ok(Outcome::Message(format!("Removed {}", name)))
}

/// Shown before the menu when no active user exists: pick a stored user or
/// connect a new one.
pub fn first_time_setup(app: &mut App, console: &mut Console) -> Result<()> {
    console.heading("Welcome to grepo")?;
    let names = app.store.list_usernames()?;
    if !names.is_empty() {
        console.println("No active user. Pick a stored user, or leave empty to connect a new one.")?;
        if let Some(index) = console.choose("User", &names)? {
            switch(app, console, &names[index])?;
            return Ok(());
        }
    }
    console.println("Connect a GitHub account with a personal access token (scope: repo).")?;
    let username = connect(app, console, None, None, true)?;
    console.println(format!("Active user: {}", username))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{app_with_alice, settings};
    use crate::menu::console::testing::scripted;
    use crate::testutil::{serve, Response};
    use tempfile::TempDir;

    #[test]
    fn test_connect_verified_uses_github_login() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(settings(dir.path()));
        let (base, seen) = serve(vec![Response::json(200, r#"{"login":"bob","name":"Bob"}"#)]);
        app.settings.github_api = base;

        let (mut console, out) = scripted("ghp_BOB\n");
        assert_eq!(connect(&mut app, &mut console, None, None, true).unwrap(), "bob");
        assert!(out.text().contains("Token verified for bob (Bob)"));
        assert_eq!(seen.lock().unwrap()[0].header("authorization"), Some("Bearer ghp_BOB"));
        assert_eq!(app.store.active_user().unwrap().as_deref(), Some("bob"));
        assert_eq!(app.store.load("bob").unwrap().config.github_token, "ghp_BOB");
    }

    #[test]
    fn test_connect_rejects_login_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(settings(dir.path()));
        let (base, _) = serve(vec![Response::json(200, r#"{"login":"mallory"}"#)]);
        app.settings.github_api = base;

        let (mut console, _) = scripted("");
        let err = connect(&mut app, &mut console, Some("bob"), Some("ghp_X"), true).unwrap_err();
        assert!(err.to_string().contains("mallory"));
        assert!(app.store.list_usernames().unwrap().is_empty());
    }

    #[test]
    fn test_connect_existing_user_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        app.update_user(|u| u.model = "qwen/coder:free".to_string()).unwrap();

        let (mut console, _) = scripted("");
        connect(&mut app, &mut console, Some("alice"), Some("ghp_NEW"), false).unwrap();
        let stored = app.store.load("alice").unwrap().config;
        assert_eq!(stored.github_token, "ghp_NEW");
        assert_eq!(stored.model, "qwen/coder:free");
    }

    #[test]
    fn test_connect_rejects_invalid_username() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(settings(dir.path()));
        let (mut console, _) = scripted("");
        let err = connect(&mut app, &mut console, Some("../evil"), Some("ghp_X"), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<GrepoError>(), Some(GrepoError::InvalidUsername(_))));
    }

    #[test]
    fn test_remove_active_user_clears_it() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (mut console, _) = scripted("1\ny\n");
        assert_eq!(
            remove(&mut app, &mut console).unwrap(),
            Outcome::Message("Removed alice".to_string())
        );
        assert!(app.user.is_none());
        assert!(app.store.active_user().unwrap().is_none());
        assert!(app.store.list_usernames().unwrap().is_empty());
    }

    #[test]
    fn test_first_time_setup_picks_stored_user() {
        let dir = TempDir::new().unwrap();
        let _ = app_with_alice(dir.path());
        let mut app = App::new(settings(dir.path()));
        app.store.set_active_user("nobody").unwrap();
        app.store.save(&UserConfig::new("bob", "ghp_BOB")).unwrap();

        let (mut console, _) = scripted("2\n");
        first_time_setup(&mut app, &mut console).unwrap();
        assert_eq!(app.require_user().unwrap().username, "bob");
    }
}
