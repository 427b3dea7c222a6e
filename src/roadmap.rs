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

//! Parsing `roadmap.md` into issue drafts.
//!
//! A roadmap is a sequence of phase lines (`PHASE 2 - Core features`) each
//! followed by open tasks (`[ ] Short title: detailed instructions`). Markdown
//! decoration around either is tolerated: heading hashes, bold markers and
//! list bullets.

use once_cell::sync::Lazy;
use regex::Regex;

static PHASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:#+\s*)?(?:\*\*)?(PHASE\b.*?)(?:\*\*)?\s*$").unwrap());

static TASK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*]\s+)?\[ \]\s*(.+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub phase: String,
    pub title: String,
    pub detail: String,
}

impl IssueDraft {
    /// Issue body: the phase, a blank line, then the detail.
    pub fn body(&self) -> String {
        format!("**Phase:** {}\n\n{}", self.phase, self.detail)
    }
}

/// One draft per open task that has a `Title: detail` shape, in file order.
/// Tasks before the first phase line get an empty phase.
pub fn parse_roadmap(content: &str) -> Vec<IssueDraft> {
    let mut phase = String::new();
    let mut drafts = Vec::new();

    for line in content.lines() {
        if let Some(caps) = PHASE_PATTERN.captures(line) {
            phase = caps[1].trim().to_string();
            continue;
        }
        let Some(caps) = TASK_PATTERN.captures(line) else {
            continue;
        };
        let Some((title, detail)) = caps[1].split_once(':') else {
            continue;
        };
        let title = title.trim().trim_matches('*').trim();
        if title.is_empty() {
            continue;
        }
        drafts.push(IssueDraft {
            phase: phase.clone(),
            title: title.to_string(),
            detail: detail.trim().to_string(),
        });
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_carry_current_phase() {
        let roadmap = "\
PHASE 1 - Setup
[ ] CI pipeline: Configure GitHub Actions. Run tests. Cache deps.
[ ] Linting: Add clippy to CI.

PHASE 2 - Features
[ ] Login: Implement OAuth login.
";
        let drafts = parse_roadmap(roadmap);
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].phase, "PHASE 1 - Setup");
        assert_eq!(drafts[0].title, "CI pipeline");
        assert_eq!(drafts[0].detail, "Configure GitHub Actions. Run tests. Cache deps.");
        assert_eq!(drafts[2].phase, "PHASE 2 - Features");
        assert_eq!(drafts[2].body(), "**Phase:** PHASE 2 - Features\n\nImplement OAuth login.");
    }

    #[test]
    fn test_markdown_decoration_is_tolerated() {
        let roadmap = "\
## **PHASE 3 - Testing**
- [ ] **Unit tests**: Cover the parser.
* [ ] Fuzzing: Fuzz the decoder.
";
        let drafts = parse_roadmap(roadmap);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].phase, "PHASE 3 - Testing");
        assert_eq!(drafts[0].title, "Unit tests");
        assert_eq!(drafts[1].title, "Fuzzing");
    }

    #[test]
    fn test_done_and_malformed_tasks_are_skipped() {
        let roadmap = "\
PHASE 1 - Setup
[x] Done already: nothing to do
[ ] No colon here
[ ] : empty title
[ ] Keep: this one
Some prose mentioning [ ] Inline: not a task
";
        let drafts = parse_roadmap(roadmap);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Keep");
    }

    #[test]
    fn test_task_before_any_phase_has_empty_phase() {
        let drafts = parse_roadmap("[ ] Orphan: still parsed\n");
        assert_eq!(drafts[0].phase, "");
    }

    #[test]
    fn test_detail_keeps_additional_colons() {
        let drafts = parse_roadmap("[ ] Config: Read key: value pairs.\n");
        assert_eq!(drafts[0].detail, "Read key: value pairs.");
    }
}
