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
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GrepoError;

const SERVICE: &str = "github";
const PER_PAGE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewRepo<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Blocking GitHub REST client authenticated with a personal access token.
pub struct GitHub {
    client: Client,
    base: String,
    token: String,
}

impl GitHub {
    pub fn new(base: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("grepo/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = self
            .authed(req)
            .send()
            .map_err(|e| GrepoError::external(SERVICE, None, e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        tracing::warn!(status = status.as_u16(), %message, "GitHub request failed");
        Err(GrepoError::external(SERVICE, Some(status.as_u16()), message).into())
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)).query(query))?;
        response
            .json()
            .map_err(|e| GrepoError::external(SERVICE, None, format!("invalid response: {}", e)).into())
    }

    /// Fetch every page of a list endpoint.
    fn get_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let mut q = query.to_vec();
            q.push(("per_page", PER_PAGE.to_string()));
            q.push(("page", page.to_string()));
            let batch: Vec<T> = self.get_json(path, &q)?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    /// The account the token belongs to. Used to validate tokens.
    pub fn authenticated_user(&self) -> Result<GithubUser> {
        self.get_json("/user", &[])
    }

    pub fn list_repos(&self) -> Result<Vec<Repo>> {
        self.get_all(
            "/user/repos",
            &[("affiliation", "owner".to_string()), ("sort", "updated".to_string())],
        )
    }

    pub fn repo_exists(&self, owner: &str, name: &str) -> Result<bool> {
        match self.send(self.client.get(self.url(&format!("/repos/{}/{}", owner, name)))) {
            Ok(_) => Ok(true),
            Err(e) => match e.downcast_ref::<GrepoError>() {
                Some(GrepoError::ExternalService { status: Some(404), .. }) => Ok(false),
                _ => Err(e),
            },
        }
    }

    pub fn create_repo(&self, name: &str, description: &str, private: bool) -> Result<Repo> {
        let body = NewRepo {
            name,
            description,
            private,
            auto_init: false,
        };
        let repo: Repo = self
            .send(self.client.post(self.url("/user/repos")).json(&body))?
            .json()
            .map_err(|e| GrepoError::external(SERVICE, None, format!("invalid response: {}", e)))?;
        tracing::info!(repo = %repo.full_name, "created GitHub repository");
        Ok(repo)
    }

    /// Issues of a repository. Pull requests are filtered out.
    pub fn list_issues(&self, owner: &str, repo: &str, state: &str, labels: &[&str]) -> Result<Vec<Issue>> {
        let mut query = vec![("state", state.to_string())];
        if !labels.is_empty() {
            query.push(("labels", labels.join(",")));
        }
        let issues: Vec<Issue> = self.get_all(&format!("/repos/{}/{}/issues", owner, repo), &query)?;
        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    pub fn issue_comments(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Comment>> {
        self.get_all(&format!("/repos/{}/{}/issues/{}/comments", owner, repo, number), &[])
    }

    pub fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<Issue> {
        let payload = NewIssue { title, body, labels };
        let issue: Issue = self
            .send(
                self.client
                    .post(self.url(&format!("/repos/{}/{}/issues", owner, repo)))
                    .json(&payload),
            )?
            .json()
            .map_err(|e| GrepoError::external(SERVICE, None, format!("invalid response: {}", e)))?;
        tracing::info!(owner, repo, number = issue.number, "created issue");
        Ok(issue)
    }

    pub fn create_comment(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("/repos/{}/{}/issues/{}/comments", owner, repo, number)))
                .json(&NewComment { body }),
        )?;
        Ok(())
    }

    /// Close an issue, optionally leaving a comment first.
    pub fn close_issue(&self, owner: &str, repo: &str, number: u64, comment: Option<&str>) -> Result<()> {
        if let Some(body) = comment {
            self.create_comment(owner, repo, number, body)?;
        }
        self.send(
            self.client
                .patch(self.url(&format!("/repos/{}/{}/issues/{}", owner, repo, number)))
                .json(&serde_json::json!({ "state": "closed" })),
        )?;
        tracing::info!(owner, repo, number, "closed issue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve, Response};

    fn client(base: &str) -> GitHub {
        GitHub::new(base, "ghp_ABC123", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_authenticated_user_sends_bearer_token() {
        let (base, seen) = serve(vec![Response::json(200, r#"{"login":"alice","name":"Alice"}"#)]);
        let user = client(&base).authenticated_user().unwrap();
        assert_eq!(user.login, "alice");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/user");
        assert_eq!(seen[0].header("authorization"), Some("Bearer ghp_ABC123"));
        assert_eq!(seen[0].header("accept"), Some("application/vnd.github+json"));
    }

    #[test]
    fn test_error_carries_status_and_github_message() {
        let (base, _) = serve(vec![Response::json(401, r#"{"message":"Bad credentials"}"#)]);
        let err = client(&base).authenticated_user().unwrap_err();
        assert_eq!(err.to_string(), "github error (HTTP 401): Bad credentials");
    }

    #[test]
    fn test_repo_exists_maps_404_to_false() {
        let (base, _) = serve(vec![
            Response::json(404, r#"{"message":"Not Found"}"#),
            Response::json(200, r#"{"name":"demo"}"#),
        ]);
        let gh = client(&base);
        assert!(!gh.repo_exists("alice", "missing").unwrap());
        assert!(gh.repo_exists("alice", "demo").unwrap());
    }

    #[test]
    fn test_list_issues_skips_pull_requests_and_passes_labels() {
        let body = r#"[
            {"number":1,"title":"Task","body":"b","state":"open","html_url":"u","labels":[{"name":"roadmap"}]},
            {"number":2,"title":"PR","state":"open","html_url":"u","pull_request":{"url":"x"}}
        ]"#;
        let (base, seen) = serve(vec![Response::json(200, body)]);
        let issues = client(&base)
            .list_issues("alice", "demo", "open", &["roadmap", "enhancement"])
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 1);
        assert_eq!(issues[0].labels[0].name, "roadmap");

        let path = &seen.lock().unwrap()[0].path;
        assert!(path.starts_with("/repos/alice/demo/issues?"));
        assert!(path.contains("labels=roadmap%2Cenhancement"));
        assert!(path.contains("state=open"));
    }

    #[test]
    fn test_create_issue_posts_labels() {
        let (base, seen) = serve(vec![Response::json(
            201,
            r#"{"number":9,"title":"Setup CI","state":"open","html_url":"u"}"#,
        )]);
        let issue = client(&base)
            .create_issue("alice", "demo", "Setup CI", "details", &["roadmap"])
            .unwrap();
        assert_eq!(issue.number, 9);

        let req = &seen.lock().unwrap()[0];
        assert_eq!(req.method, "POST");
        let sent: serde_json::Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(sent["labels"], serde_json::json!(["roadmap"]));
        assert_eq!(sent["title"], "Setup CI");
    }

    #[test]
    fn test_close_issue_comments_then_patches_state() {
        let (base, seen) = serve(vec![
            Response::json(201, r#"{}"#),
            Response::json(200, r#"{}"#),
        ]);
        client(&base)
            .close_issue("alice", "demo", 3, Some("done"))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].path, "/repos/alice/demo/issues/3/comments");
        assert_eq!(seen[1].method, "PATCH");
        assert_eq!(seen[1].path, "/repos/alice/demo/issues/3");
        assert!(seen[1].body.contains("closed"));
    }
}
