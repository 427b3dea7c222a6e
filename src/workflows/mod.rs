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

//! Menu actions and the menu tree that binds them.
//!
//! Every action has the shape `fn(&mut App, &mut Console, ...) -> Result<Outcome>`
//! so the scripted subcommands can call the same code the menu does.

pub mod project;
pub mod repo;
pub mod settings;
pub mod users;

use std::path::{Path, PathBuf};

use crate::app::App;
use crate::menu::{Console, MenuNode, Outcome};

type RepoAction = fn(&mut App, &mut Console, &Path) -> anyhow::Result<Outcome>;

pub fn main_menu() -> MenuNode<App> {
    MenuNode::dynamic("grepo", "", |app: &App| {
        let mut items = Vec::new();
        if app.user.is_some() {
            for path in app.local_repos()? {
                items.push(repo_menu(path));
            }
        }
        items.push(MenuNode::handler(
            "Clone from GitHub",
            "Clone one of your GitHub repositories into the workspace",
            repo::clone_remote,
        ));
        items.push(MenuNode::handler(
            "New GitHub repository",
            "Create a repository on GitHub, clone it, add README and .gitignore, push",
            repo::create_github_repo,
        ));
        items.push(MenuNode::handler(
            "New local project",
            "Initialize a local git project with a requirements README",
            |app: &mut App, c: &mut Console| project::create_local(app, c, None),
        ));
        items.push(users_menu());
        items.push(settings_menu());
        items.push(MenuNode::handler(
            "Status",
            "Active user, workspace and tool availability",
            settings::status,
        ));
        items.push(MenuNode::handler("Help", "Keys and workflows", settings::help));
        items.push(MenuNode::exit());
        Ok(items)
    })
}

fn repo_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn repo_menu(path: PathBuf) -> MenuNode<App> {
    let action = |label: &str, hint: &str, f: RepoAction| {
        let path = path.clone();
        MenuNode::<App>::handler(label, hint, move |app: &mut App, c: &mut Console| f(app, c, &path))
    };

    let project = MenuNode::submenu(
        "Project",
        "Roadmap, GitHub issues and AI code generation",
        vec![
            action(
                "Generate roadmap",
                "Stream a roadmap.md built from README.md by the configured AI model",
                project::generate_roadmap,
            ),
            action(
                "Create issues from roadmap",
                "Create one GitHub issue per open task in roadmap.md",
                |app: &mut App, c: &mut Console, p: &Path| project::create_issues(app, c, p, false),
            ),
            action(
                "Develop issue",
                "Run the code generator on an open issue and analyse the result",
                project::develop_issue,
            ),
            MenuNode::back(),
        ],
    );

    MenuNode::submenu(
        repo_label(&path),
        format!("Local repository at {}", path.display()),
        vec![
            action("Status", "git status of the working tree", repo::status),
            action("Commit all", "Stage every change and commit with a message", repo::commit),
            action("Push", "Commit pending changes and push the current branch", repo::push_soft),
            action("Pull", "Commit pending changes and fast-forward from origin", repo::pull_soft),
            action(
                "Push (force with lease)",
                "Overwrite the remote branch unless it moved since the last fetch",
                repo::push_hard,
            ),
            action(
                "Pull (rebase, autostash)",
                "Rebase local commits onto origin, stashing around the rebase",
                repo::pull_hard,
            ),
            action(
                "Overwrite remote",
                "Force-push the local branch over origin (asks first)",
                repo::overwrite_remote,
            ),
            action(
                "Overwrite local",
                "Reset the local branch to origin, discarding local commits (asks first)",
                repo::overwrite_local,
            ),
            action("Recent commits", "Last commits on the current branch", repo::recent_commits),
            project,
            MenuNode::back(),
        ],
    )
}

fn users_menu() -> MenuNode<App> {
    MenuNode::dynamic("Users", "Switch, connect or remove GitHub accounts", |app: &App| {
        let active = app.user.as_ref().map(|u| u.username.clone());
        let mut items = Vec::new();
        for name in app.store.list_usernames()? {
            let marker = if active.as_deref() == Some(name.as_str()) { " (active)" } else { "" };
            let target = name.clone();
            items.push(MenuNode::handler(
                format!("{}{}", name, marker),
                format!("Make {} the active user", name),
                move |app: &mut App, c: &mut Console| users::switch(app, c, &target),
            ));
        }
        items.push(MenuNode::handler(
            "Connect new user",
            "Add a GitHub account with a personal access token",
            |app: &mut App, c: &mut Console| {
                users::connect(app, c, None, None, true).map(|_| Outcome::Done)
            },
        ));
        items.push(MenuNode::handler("Remove user", "Delete a stored account", users::remove));
        items.push(MenuNode::back());
        Ok(items)
    })
}

fn settings_menu() -> MenuNode<App> {
    MenuNode::submenu(
        "Settings",
        "Tokens, AI model and code generator",
        vec![
            MenuNode::handler("GitHub token", "Replace the active user's GitHub token", settings::change_github_token),
            MenuNode::handler("AI token", "Set the OpenRouter API token", settings::configure_ai_token),
            MenuNode::handler("Choose free model", "Pick one of OpenRouter's free models", settings::choose_model),
            MenuNode::handler("Enter model id", "Type any OpenRouter model id", settings::enter_model),
            MenuNode::handler("Show configuration", "Current settings with tokens masked", settings::show),
            MenuNode::handler("Check code generator", "Verify the code generation CLI is installed", settings::check_codegen),
            MenuNode::back(),
        ],
    )
}

/// `ghp_…1234`. Short values are fully hidden.
pub fn mask(token: &str) -> String {
    if token.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::app_with_alice;
    use crate::menu::state::MenuState;
    use crate::menu::NodeKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("ghp_ABCDEFGH1234"), "ghp_…1234");
    }

    #[test]
    fn test_main_menu_lists_repositories_first() {
        let dir = TempDir::new().unwrap();
        let app = app_with_alice(dir.path());
        let ws = app.user_workspace().unwrap();
        fs::create_dir_all(ws.join("demo/.git")).unwrap();

        let state = MenuState::new(&main_menu(), &app).unwrap();
        let labels: Vec<&str> = state.top().unwrap().children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels[0], "demo");
        assert!(labels.contains(&"Users"));
        assert_eq!(*labels.last().unwrap(), "Exit");

        let repo = &state.top().unwrap().children[0];
        let NodeKind::Submenu(children) = &repo.kind else {
            panic!("repository entry should be a submenu");
        };
        assert!(children.iter().any(|n| n.label == "Project"));
    }

    #[test]
    fn test_users_menu_marks_active_user() {
        let dir = TempDir::new().unwrap();
        let app = app_with_alice(dir.path());
        let mut state = MenuState::new(&users_menu(), &app).unwrap();
        assert_eq!(state.selected_node().unwrap().label, "alice (active)");
        assert!(state.pop().is_ok());
    }
}
