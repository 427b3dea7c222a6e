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
use std::fs;
use std::path::Path;

use crate::constants::CHANGELOG_FILE;

const UNRELEASED_HEADING: &str = "## Unreleased";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Feature,
    Docs,
    Fix,
    Info,
}

impl Category {
    fn tag(&self) -> &'static str {
        match self {
            Category::Feature => "FEATURE",
            Category::Docs => "DOCS",
            Category::Fix => "FIX",
            Category::Info => "INFO",
        }
    }
}

/// Add a timestamped entry as the newest line under `## Unreleased` in the
/// repository's CHANGELOG.md, creating the file or the section as needed.
pub fn append_entry(repo_dir: &Path, category: Category, message: &str) -> Result<()> {
    let path = repo_dir.join(CHANGELOG_FILE);
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let entry = format!(
        "- {} **{}**: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        category.tag(),
        message.trim()
    );
    let updated = insert_entry(&existing, &entry);
    fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), %entry, "changelog updated");
    Ok(())
}

fn insert_entry(existing: &str, entry: &str) -> String {
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    let heading = lines
        .iter()
        .position(|l| l.trim_start().starts_with("## ") && l.to_lowercase().contains("unreleased"));

    match heading {
        Some(idx) => {
            // Keep a blank line between the heading and the entries.
            let mut at = idx + 1;
            if lines.get(at).is_some_and(|l| l.trim().is_empty()) {
                at += 1;
            } else {
                lines.insert(at, String::new());
                at += 1;
            }
            lines.insert(at, entry.to_string());
        }
        None => {
            let after_title = lines
                .iter()
                .position(|l| l.starts_with("# "))
                .map(|i| i + 1);
            let section = [
                String::new(),
                UNRELEASED_HEADING.to_string(),
                String::new(),
                entry.to_string(),
            ];
            match after_title {
                Some(at) => {
                    lines.splice(at..at, section);
                }
                None => {
                    let mut head = vec!["# Changelog".to_string()];
                    head.extend(section);
                    if !lines.is_empty() {
                        head.push(String::new());
                    }
                    head.extend(lines);
                    lines = head;
                }
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
