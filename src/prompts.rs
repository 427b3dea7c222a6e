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

pub const ROADMAP_SYSTEM_PROMPT: &str = r#"You are an experienced software architect and project manager.
Treat the README.md you are given as the requirements document.
Identify every functional and non-functional requirement and produce a professional technical roadmap following common engineering practice: agile phases, CI/CD, feature implementation, automated tests, code review and documentation.
Format the roadmap in Markdown with clearly separated phases, each introduced by a line of the form 'PHASE X - <title>'.
List at least ten tasks under every phase. The feature implementation phase has as many tasks as it takes to cover every requirement and feature in the README.
Write every task on one line in the format:
[ ] Short title: DETAILED technical instructions in at least three complete sentences."#;

pub const ROADMAP_USER_PROMPT: &str = r#"Here is the complete README.md, to be treated as the requirements document:

```markdown
{readme}
```

Produce 'roadmap.md' from it in the format:
PHASE X - <phase title>
[ ] Short title: DETAILED technical instructions in at least three complete sentences.
"#;

pub const ISSUE_DEVELOPMENT_PROMPT: &str = r#"DEVELOPMENT TASK for repository: {repo}

ISSUE: #{number} - {title}

DESCRIPTION:
{body}

REPOSITORY STRUCTURE (excerpt):
{file_tree}

RECENT COMMITS:
{commits}

PREVIOUS COMMENTS:
{comments}

WORKING DIRECTORY: {workdir}

TASK:
Analyze the issue and implement a complete solution.
Take the repository structure and previous changes into account and create every file and change that is needed.

IMPORTANT:
- Use the repository context above
- Follow the existing code conventions
- Test your implementation
- Document your changes

BEGIN NOW:
"#;

pub const ISSUE_ANALYSIS_PROMPT: &str = r#"Decide whether the following GitHub issue has been fully resolved.

ISSUE TITLE: {title}
ISSUE DESCRIPTION: {body}

CODE GENERATOR OUTPUT: {output}

Reply with JSON only, using exactly this structure:
{
    "completed": true or false,
    "confidence": 0-100,
    "reason": "detailed reasoning",
    "next_steps": ["step 1", "step 2"],
    "recommendation": "close" or "keep_open"
}
"#;

pub fn roadmap_user_prompt(readme: &str) -> String {
    ROADMAP_USER_PROMPT.replace("{readme}", readme)
}

/// Inputs for [`issue_development_prompt`].
pub struct IssueContext<'a> {
    pub repo: &'a str,
    pub number: u64,
    pub title: &'a str,
    pub body: &'a str,
    pub file_tree: &'a [String],
    pub commits: &'a [String],
    pub comments: &'a [String],
    pub workdir: &'a str,
}

pub fn issue_development_prompt(ctx: &IssueContext<'_>) -> String {
    let comments = if ctx.comments.is_empty() {
        "No previous comments".to_string()
    } else {
        // Only the latest few comments; older discussion is usually stale.
        let skip = ctx.comments.len().saturating_sub(3);
        ctx.comments[skip..].join("\n")
    };
    let body = if ctx.body.trim().is_empty() {
        "No description"
    } else {
        ctx.body
    };

    ISSUE_DEVELOPMENT_PROMPT
        .replace("{repo}", ctx.repo)
        .replace("{number}", &ctx.number.to_string())
        .replace("{title}", ctx.title)
        .replace("{file_tree}", &ctx.file_tree.iter().take(20).cloned().collect::<Vec<_>>().join("\n"))
        .replace("{commits}", &ctx.commits.join("\n"))
        .replace("{comments}", &comments)
        .replace("{workdir}", ctx.workdir)
        .replace("{body}", body)
}

pub fn issue_analysis_prompt(title: &str, body: &str, output: &str) -> String {
    let excerpt: String = output.chars().take(2000).collect();
    ISSUE_ANALYSIS_PROMPT
        .replace("{title}", title)
        .replace("{output}", &excerpt)
        .replace("{body}", body)
}
