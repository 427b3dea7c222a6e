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

//! Project workflows: roadmap generation, issue creation and AI-driven
//! issue development.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app::App;
use crate::changelog::{self, Category};
use crate::constants::{COMMIT_LIMIT, FILE_TREE_LIMIT, README_FILE, ROADMAP_FILE, ROADMAP_LABELS};
use crate::error::GrepoError;
use crate::github::{GitHub, Issue};
use crate::menu::{Console, Outcome};
use crate::openrouter::Message;
use crate::prompts::{self, IssueContext};
use crate::roadmap;
use crate::scaffold;
use crate::wakelock::WakeLock;

const PROMPT_PREVIEW_CHARS: usize = 500;
const COMMENT_EXCERPT_CHARS: usize = 500;
const FAILURE_EXCERPT_CHARS: usize = 3000;

/// The analysis model's verdict on a code generation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Analysis {
    pub completed: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

impl Analysis {
    pub fn should_close(&self, threshold: u8) -> bool {
        self.completed && self.confidence >= f64::from(threshold)
    }
}

/// Extract the JSON object from a model reply. Code fences and surrounding
/// prose are tolerated; anything else is no analysis.
pub fn parse_analysis(reply: &str) -> Option<Analysis> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str(&reply[start..=end]) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::warn!(error = %e, "analysis reply is not the expected JSON");
            None
        }
    }
}

fn excerpt(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}

/// Markdown comment posted to the issue after a successful run.
pub fn analysis_comment(analysis: Option<&Analysis>, output: &str, model: &str) -> String {
    let verdict = match analysis {
        Some(a) => {
            let (icon, status) = if a.completed { ("✅", "Completed") } else { ("⚠️", "In progress") };
            let mut text = format!(
                "## {icon} Automated issue analysis\n\n**Status**: {status}\n**Confidence**: {}%\n\n**Analysis**: {}\n",
                a.confidence,
                if a.reason.is_empty() { "No reasoning given" } else { a.reason.as_str() }
            );
            if !a.next_steps.is_empty() {
                text.push_str("\n**Next steps**:\n");
                for step in &a.next_steps {
                    text.push_str(&format!("- {}\n", step));
                }
            }
            let recommendation = if a.recommendation.is_empty() { "keep_open" } else { a.recommendation.as_str() };
            text.push_str(&format!("\n**Recommendation**: {}\n", recommendation.replace('_', " ")));
            text
        }
        None => "## ⚠️ Automated issue analysis\n\nNo usable analysis was returned. The issue stays open.\n".to_string(),
    };

    format!(
        "{verdict}\n### Code generator output\n```\n{}\n```\n\n- **Timestamp**: {}\n- **AI model**: {model}\n\n---\n*Generated by grepo {}*\n",
        excerpt(output.trim(), COMMENT_EXCERPT_CHARS),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        env!("CARGO_PKG_VERSION"),
    )
}

fn read_repo_file(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(GrepoError::NotFound(format!("{} in {}", name, dir.display())).into())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// `(owner, repo)` from the `origin` remote, or the authenticated user and
/// the directory name when there is none.
fn resolve_slug(app: &App, github: &GitHub, dir: &Path) -> Result<(String, String)> {
    match app.git().remote_slug(dir) {
        Ok(slug) => Ok(slug),
        Err(e) => {
            tracing::debug!(error = %e, "no GitHub remote; using the account and directory name");
            let owner = github.authenticated_user()?.login;
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .with_context(|| format!("{} has no directory name", dir.display()))?;
            Ok((owner, name))
        }
    }
}

/// Stream a roadmap for the repository's README into `roadmap.md`.
pub fn generate_roadmap(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let readme = read_repo_file(dir, README_FILE)?;
    let target = dir.join(ROADMAP_FILE);
    if target.exists() && !console.confirm("roadmap.md exists. Replace it?")? {
        return Ok(Outcome::Message("Kept the existing roadmap".to_string()));
    }

    let client = app.openrouter()?;
    let model = app.model();
    let messages = [
        Message::system(prompts::ROADMAP_SYSTEM_PROMPT),
        Message::user(prompts::roadmap_user_prompt(&readme)),
    ];
    console.println(format!("Generating roadmap with {} ...\n", model))?;
    let content = client.stream_chat(&model, &messages, &mut |delta| {
        let _ = console.print(delta);
    })?;
    console.println("")?;
    if content.trim().is_empty() {
        return Err(GrepoError::external("openrouter", None, "the model returned an empty roadmap").into());
    }

    fs::write(&target, &content).with_context(|| format!("Failed to write {}", target.display()))?;
    changelog::append_entry(dir, Category::Docs, &format!("Generated {} with {}", ROADMAP_FILE, model))?;
    let tasks = roadmap::parse_roadmap(&content).len();
    tracing::info!(dir = %dir.display(), tasks, "roadmap written");
    Ok(Outcome::Message(format!("{} written with {} open tasks", ROADMAP_FILE, tasks)))
}

/// Create one GitHub issue per open roadmap task. `yes` skips the
/// confirmation.
pub fn create_issues(app: &mut App, console: &mut Console, dir: &Path, yes: bool) -> Result<Outcome> {
    let content = read_repo_file(dir, ROADMAP_FILE)?;
    let drafts = roadmap::parse_roadmap(&content);
    if drafts.is_empty() {
        return Ok(Outcome::Message(format!("No open tasks in {}", ROADMAP_FILE)));
    }

    let github = app.github()?;
    let (owner, repo) = resolve_slug(app, &github, dir)?;
    console.println(format!("{} tasks for {}/{}:", drafts.len(), owner, repo))?;
    for draft in drafts.iter().take(3) {
        console.println(format!("  [{}] {}", draft.phase, draft.title))?;
    }
    if drafts.len() > 3 {
        console.println(format!("  ... and {} more", drafts.len() - 3))?;
    }
    if !yes && !console.confirm("Create these issues?")? {
        return Ok(Outcome::Message("No issues created".to_string()));
    }

    let mut created = 0;
    for draft in &drafts {
        match github.create_issue(&owner, &repo, &draft.title, &draft.body(), ROADMAP_LABELS) {
            Ok(issue) => {
                created += 1;
                console.println(format!("  #{} {}", issue.number, issue.title))?;
            }
            Err(e) => {
                tracing::warn!(title = %draft.title, error = %format!("{:#}", e), "issue not created");
                console.println(format!("  failed: {} ({:#})", draft.title, e))?;
            }
        }
    }

    if created > 0 {
        changelog::append_entry(
            dir,
            Category::Feature,
            &format!("Created {} GitHub issues from {}", created, ROADMAP_FILE),
        )?;
    }
    Ok(Outcome::Message(format!("Created {}/{} issues", created, drafts.len())))
}

/// Let the code generator work on an open issue, then post an AI analysis of
/// the run and offer to close the issue when it looks done.
pub fn develop_issue(app: &mut App, console: &mut Console, dir: &Path) -> Result<Outcome> {
    let github = app.github()?;
    let (owner, repo) = resolve_slug(app, &github, dir)?;
    let issues = github.list_issues(&owner, &repo, "open", &[])?;
    if issues.is_empty() {
        return Ok(Outcome::Message(format!("No open issues in {}/{}", owner, repo)));
    }
    let options: Vec<String> = issues
        .iter()
        .map(|i| {
            let labels: Vec<&str> = i.labels.iter().map(|l| l.name.as_str()).collect();
            if labels.is_empty() {
                format!("#{} {}", i.number, i.title)
            } else {
                format!("#{} {} [{}]", i.number, i.title, labels.join(", "))
            }
        })
        .collect();
    let Some(index) = console.choose("Issue to develop", &options)? else {
        return Ok(Outcome::Done);
    };
    let issue = &issues[index];
    console.println(&issue.html_url)?;

    let comments: Vec<String> = github
        .issue_comments(&owner, &repo, issue.number)?
        .into_iter()
        .filter_map(|c| c.body)
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .collect();
    let git = app.git();
    let file_tree = git.file_tree(dir, FILE_TREE_LIMIT)?;
    let commits = git.recent_commits(dir, COMMIT_LIMIT)?;
    let workdir = dir.display().to_string();
    let prompt = prompts::issue_development_prompt(&IssueContext {
        repo: &repo,
        number: issue.number,
        title: &issue.title,
        body: issue.body_text(),
        file_tree: &file_tree,
        commits: &commits,
        comments: &comments,
        workdir: &workdir,
    });

    console.println("Prompt preview:")?;
    console.println(excerpt(&prompt, PROMPT_PREVIEW_CHARS))?;
    let codegen = app.codegen();
    let tool = codegen.tool().name();
    if !console.confirm(&format!("Start {} on #{}?", tool, issue.number))? {
        return Ok(Outcome::Message("Code generation cancelled".to_string()));
    }

    console.println(format!("Running {} ... this can take a while.", tool))?;
    let output = {
        let _wake = WakeLock::try_acquire(&format!("{} working on issue #{}", tool, issue.number));
        let started = Instant::now();
        let output = codegen.run(dir, &prompt)?;
        console.println(format!("{} finished in {:.1}s", tool, started.elapsed().as_secs_f64()))?;
        output
    };
    let transcript = output.transcript().trim().to_string();
    console.println(&transcript)?;

    if !output.success {
        let reason = if output.rate_limited { "rate limited" } else { "failed" };
        let comment = format!(
            "❌ **{} {}**\n\n```\n{}\n```\n",
            tool,
            reason,
            excerpt(&transcript, FAILURE_EXCERPT_CHARS)
        );
        if let Err(e) = github.create_comment(&owner, &repo, issue.number, &comment) {
            tracing::warn!(error = %format!("{:#}", e), "failure comment not posted");
        }
        return Err(GrepoError::external(tool, None, format!("{} on issue #{}", reason, issue.number)).into());
    }

    finish_issue(app, console, &github, (owner.as_str(), repo.as_str()), issue, &transcript, dir)
}

fn finish_issue(
    app: &App,
    console: &mut Console,
    github: &GitHub,
    (owner, repo): (&str, &str),
    issue: &Issue,
    transcript: &str,
    dir: &Path,
) -> Result<Outcome> {
    let model = app.model();
    console.println(format!("Analysing the result with {} ...", model))?;
    let messages = [Message::user(prompts::issue_analysis_prompt(
        &issue.title,
        issue.body_text(),
        transcript,
    ))];
    let analysis = match app.openrouter().and_then(|c| c.chat(&model, &messages)) {
        Ok(reply) => parse_analysis(&reply),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "issue analysis unavailable");
            console.println(format!("Analysis unavailable: {:#}", e))?;
            None
        }
    };

    github.create_comment(owner, repo, issue.number, &analysis_comment(analysis.as_ref(), transcript, &model))?;
    changelog::append_entry(
        dir,
        Category::Feature,
        &format!("Worked on issue #{}: {}", issue.number, issue.title),
    )?;

    let threshold = app.settings.auto_close_confidence;
    match analysis {
        Some(ref a) if a.should_close(threshold) => {
            console.println(format!("Issue looks complete (confidence {}%).", a.confidence))?;
            if console.confirm(&format!("Close #{}?", issue.number))? {
                let comment = format!(
                    "🤖 **Closed automatically**\n\nThe AI analysis considers this issue resolved (confidence {}%).\n\n{}",
                    a.confidence, a.reason
                );
                github.close_issue(owner, repo, issue.number, Some(&comment))?;
                return Ok(Outcome::Message(format!("Issue #{} closed", issue.number)));
            }
            Ok(Outcome::Message(format!("Issue #{} left open", issue.number)))
        }
        Some(ref a) => Ok(Outcome::Message(format!(
            "Issue #{} stays open (confidence {}%)",
            issue.number, a.confidence
        ))),
        None => Ok(Outcome::Message(format!("Issue #{} stays open (no analysis)", issue.number))),
    }
}

/// Create a local project in the user's workspace. `name` is prompted when
/// absent.
pub fn create_local(app: &mut App, console: &mut Console, name: Option<&str>) -> Result<Outcome> {
    let path = create_local_project(app, console, name)?;
    if console.confirm("Publish it to GitHub as a private repository?")? {
        let url = publish(app, &path)?;
        console.println(format!("Published to {}", url))?;
    }
    Ok(Outcome::Message(format!(
        "Created {}. Describe the project in README.md, then generate a roadmap.",
        path.display()
    )))
}

/// Create a GitHub repository for a local project, add it as `origin` and push.
fn publish(app: &App, dir: &Path) -> Result<String> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("No project name in {}", dir.display()))?;
    let repo = app.github()?.create_repo(&name, "", true)?;
    let git = app.git();
    git.add_remote(dir, &repo.clone_url)?;
    git.push(dir)?;
    tracing::info!(repo = %repo.full_name, "local project published");
    Ok(repo.html_url)
}

pub fn create_local_project(app: &App, console: &mut Console, name: Option<&str>) -> Result<PathBuf> {
    let name = match name {
        Some(name) => name.to_string(),
        None => console.prompt("Project name")?,
    };
    let workspace = app.user_workspace()?;
    fs::create_dir_all(&workspace).with_context(|| format!("Failed to create {}", workspace.display()))?;
    scaffold::create_local_project(&app.git(), &workspace, &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::app_with_alice;
    use crate::menu::console::testing::scripted;
    use crate::testutil::{serve, Response};
    use tempfile::TempDir;

    fn analysis(completed: bool, confidence: f64) -> Analysis {
        Analysis {
            completed,
            confidence,
            reason: "All acceptance criteria met".to_string(),
            next_steps: vec![],
            recommendation: "close".to_string(),
        }
    }

    #[test]
    fn test_parse_analysis_tolerates_fences_and_prose() {
        let reply = "Here you go:\n```json\n{\"completed\": true, \"confidence\": 92, \"reason\": \"done\", \"next_steps\": [], \"recommendation\": \"close\"}\n```";
        let parsed = parse_analysis(reply).unwrap();
        assert!(parsed.completed);
        assert_eq!(parsed.confidence, 92.0);
        assert_eq!(parsed.recommendation, "close");
    }

    #[test]
    fn test_parse_analysis_rejects_other_shapes() {
        assert_eq!(parse_analysis("The issue is completed."), None);
        assert_eq!(parse_analysis("{\"completed\": true}"), None);
        assert_eq!(parse_analysis("{\"completed\": \"yes\", \"confidence\": 90}"), None);
        assert_eq!(parse_analysis("} {"), None);
    }

    #[test]
    fn test_should_close_threshold() {
        assert!(analysis(true, 80.0).should_close(80));
        assert!(!analysis(true, 79.5).should_close(80));
        assert!(!analysis(false, 100.0).should_close(80));
        assert!(analysis(true, 0.0).should_close(0));
    }

    #[test]
    fn test_analysis_comment() {
        let mut a = analysis(false, 40.0);
        a.next_steps = vec!["Add tests".to_string()];
        a.recommendation = "keep_open".to_string();
        let output = "x".repeat(600);
        let comment = analysis_comment(Some(&a), &output, "openai/gpt-4o");
        assert!(comment.contains("**Status**: In progress"));
        assert!(comment.contains("**Confidence**: 40%"));
        assert!(comment.contains("- Add tests"));
        assert!(comment.contains("**Recommendation**: keep open"));
        assert!(comment.contains(&format!("{}...", "x".repeat(500))));
        assert!(!comment.contains(&"x".repeat(501)));

        let none = analysis_comment(None, "ok", "m");
        assert!(none.contains("No usable analysis"));
    }

    #[test]
    fn test_generate_roadmap_streams_into_file_and_changelog() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        app.update_user(|u| u.ai_token = "sk-or-test".to_string()).unwrap();
        let repo = dir.path().join("demo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("README.md"), "# demo\nA todo app.\n").unwrap();

        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"PHASE 1 - Setup\\n\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"[ ] Init: Create the repo.\\n\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let (base, seen) = serve(vec![Response::event_stream(body)]);
        app.settings.openrouter_api = base;

        let (mut console, out) = scripted("");
        let outcome = generate_roadmap(&mut app, &mut console, &repo).unwrap();
        assert_eq!(outcome, Outcome::Message("roadmap.md written with 1 open tasks".to_string()));
        assert_eq!(
            fs::read_to_string(repo.join("roadmap.md")).unwrap(),
            "PHASE 1 - Setup\n[ ] Init: Create the repo.\n"
        );
        assert!(out.text().contains("[ ] Init: Create the repo."));
        assert!(fs::read_to_string(repo.join("CHANGELOG.md")).unwrap().contains("**DOCS**: Generated roadmap.md"));

        let seen = seen.lock().unwrap();
        assert!(seen[0].body.contains("A todo app."));
        assert_eq!(seen[0].header("authorization"), Some("Bearer sk-or-test"));
    }

    #[test]
    fn test_generate_roadmap_requires_readme() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let (mut console, _) = scripted("");
        let err = generate_roadmap(&mut app, &mut console, dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<GrepoError>(), Some(GrepoError::NotFound(_))));
    }

    #[test]
    fn test_create_issues_counts_failures() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let repo = dir.path().join("demo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(
            repo.join("roadmap.md"),
            "PHASE 1 - Setup\n[ ] Init: Create the repo.\n[x] Done: Already there.\n[ ] CI: Add a pipeline.\n",
        )
        .unwrap();

        let (base, seen) = serve(vec![
            Response::json(200, r#"{"login":"alice"}"#),
            Response::json(
                201,
                r#"{"number":1,"title":"Init","state":"open","html_url":"https://github.com/alice/demo/issues/1"}"#,
            ),
            Response::json(422, r#"{"message":"Validation Failed"}"#),
        ]);
        app.settings.github_api = base;

        let (mut console, out) = scripted("");
        let outcome = create_issues(&mut app, &mut console, &repo, true).unwrap();
        assert_eq!(outcome, Outcome::Message("Created 1/2 issues".to_string()));
        assert!(out.text().contains("#1 Init"));
        assert!(out.text().contains("failed: CI"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].method, "POST");
        assert_eq!(seen[1].path, "/repos/alice/demo/issues");
        assert!(seen[1].body.contains("\"roadmap\""));
        assert!(seen[1].body.contains("**Phase:** PHASE 1 - Setup"));
        assert!(fs::read_to_string(repo.join("CHANGELOG.md")).unwrap().contains("Created 1 GitHub issues"));
    }

    #[test]
    fn test_create_issues_can_be_declined() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let repo = dir.path().join("demo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("roadmap.md"), "[ ] Init: Create the repo.\n").unwrap();
        let (base, seen) = serve(vec![Response::json(200, r#"{"login":"alice"}"#)]);
        app.settings.github_api = base;

        let (mut console, _) = scripted("n\n");
        let outcome = create_issues(&mut app, &mut console, &repo, false).unwrap();
        assert_eq!(outcome, Outcome::Message("No issues created".to_string()));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(!repo.join("CHANGELOG.md").exists());
    }

    #[test]
    fn test_develop_issue_without_open_issues() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_alice(dir.path());
        let repo = dir.path().join("demo");
        fs::create_dir_all(&repo).unwrap();
        let (base, seen) = serve(vec![
            Response::json(200, r#"{"login":"alice"}"#),
            Response::json(200, "[]"),
        ]);
        app.settings.github_api = base;

        let (mut console, _) = scripted("");
        let outcome = develop_issue(&mut app, &mut console, &repo).unwrap();
        assert_eq!(outcome, Outcome::Message("No open issues in alice/demo".to_string()));
        assert!(seen.lock().unwrap()[1].path.starts_with("/repos/alice/demo/issues?"));
    }
}
