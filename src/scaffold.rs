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
use std::path::{Path, PathBuf};

use crate::changelog::{self, Category};
use crate::constants::README_FILE;
use crate::git::LocalGit;

pub const GITIGNORE_TEMPLATE: &str = r#"# Logs
*.log

# Dependencies
node_modules/
__pycache__/
*.pyc
target/

# IDE
.vscode/
.idea/
*.swp
*.swo

# OS
.DS_Store
Thumbs.db

# Build outputs
dist/
build/
*.egg-info/

# Environment
.env
.env.local
"#;

const PROJECT_README_TEMPLATE: &str = r#"# {name}

## Overview
A short, precise description of the project and its main purpose.

## Main features
- **Feature 1**: Detailed description of the first main feature
- **Feature 2**: Detailed description of the second main feature
- **Feature 3**: Detailed description of the third main feature

## Installation

### Prerequisites
- Prerequisite 1
- Prerequisite 2

### Setup
```bash
git clone https://github.com/<owner>/{name}.git
cd {name}
```

## Usage
```bash
command --option value
```

## Technical requirements

### Functional requirements
- Requirement 1: Detailed description
- Requirement 2: Detailed description
- Requirement 3: Detailed description

### Non-functional requirements
- Performance: targets
- Security: requirements
- Scalability: expectations
- Usability: standards

### Quality requirements
- Code quality: standards and metrics
- Test coverage: minimum
- Documentation: completeness

## Project structure
```
{name}/
├── src/
├── tests/
├── docs/
├── README.md
└── CHANGELOG.md
```

---
This README is the requirements document used to generate `roadmap.md`.
Fill in every section before generating the roadmap.
"#;

/// README for a freshly created GitHub repository.
pub fn repository_readme(name: &str, owner: &str, description: &str) -> String {
    let description = if description.trim().is_empty() {
        "A new project."
    } else {
        description.trim()
    };
    format!(
        "# {name}\n\n{description}\n\n## Installation\n\n```bash\ngit clone https://github.com/{owner}/{name}.git\ncd {name}\n```\n\n## Usage\n\nDocumentation to follow.\n\n## Contributing\n\nPull requests are welcome.\n\n## License\n\nMIT\n"
    )
}

/// Requirements-style README for a new local project.
pub fn project_readme(name: &str) -> String {
    PROJECT_README_TEMPLATE.replace("{name}", name)
}

/// Repository and project names become directory names and GitHub slugs.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > 100
        || name.starts_with('.')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        bail!(
            "Invalid project name '{}': use letters, digits, '-', '_' or '.'",
            name
        );
    }
    Ok(())
}

pub fn write_initial_files(dir: &Path, readme: &str) -> Result<()> {
    fs::write(dir.join(README_FILE), readme)
        .with_context(|| format!("Failed to write README in {}", dir.display()))?;
    fs::write(dir.join(".gitignore"), GITIGNORE_TEMPLATE)
        .with_context(|| format!("Failed to write .gitignore in {}", dir.display()))?;
    Ok(())
}

/// Create `<parent>/<name>`, initialize git, write the templates and make the
/// initial commit. Fails if the directory already exists.
pub fn create_local_project(git: &LocalGit, parent: &Path, name: &str) -> Result<PathBuf> {
    validate_project_name(name)?;
    let dir = parent.join(name);
    if dir.exists() {
        bail!("{} already exists", dir.display());
    }
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    git.init(&dir)?;
    write_initial_files(&dir, &project_readme(name))?;
    changelog::append_entry(&dir, Category::Info, &format!("Created project {}", name))?;
    git.commit_all(&dir, "Initial commit: add README.md and .gitignore")?;

    tracing::info!(path = %dir.display(), "created local project");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_readme_names_project() {
        let readme = project_readme("demo");
        assert!(readme.starts_with("# demo\n"));
        assert!(readme.contains("cd demo"));
        assert!(!readme.contains("{name}"));
    }

    #[test]
    fn test_repository_readme_default_description() {
        let readme = repository_readme("demo", "alice", " ");
        assert!(readme.contains("A new project."));
        assert!(readme.contains("https://github.com/alice/demo.git"));
    }

    #[test]
    fn test_project_names() {
        assert!(validate_project_name("my-app_2.0").is_ok());
        for bad in ["", ".git", "a/b", "white space"] {
            assert!(validate_project_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_existing_directory_is_refused() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let err = create_local_project(&LocalGit::new(None), dir.path(), "taken").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
