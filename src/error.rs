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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Domain errors. Application code carries these inside `anyhow::Error`.
#[derive(Debug, Error)]
pub enum GrepoError {
    /// No such user, repository or file.
    #[error("not found: {0}")]
    NotFound(String),

    /// One or more persisted fields could not be decoded.
    #[error("config for '{username}' is corrupt: could not decode {}", .fields.join(", "))]
    ConfigCorrupt {
        username: String,
        fields: Vec<String>,
    },

    /// A record on disk is not valid JSON of the expected shape.
    #[error("could not read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The obfuscation layer rejected a value even after padding correction.
    #[error("could not decode {field}: {reason}")]
    Decode { field: String, reason: String },

    /// Non-2xx response, network failure or failed subprocess of an external service.
    #[error("{service} error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ExternalService {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Malformed menu tree: empty submenu pushed or pop past the root.
    #[error("invalid menu state: {0}")]
    InvalidMenuState(String),

    #[error("invalid username '{0}'")]
    InvalidUsername(String),

    /// A token required for the operation is not configured.
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GrepoError {
    pub fn external(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        GrepoError::ExternalService {
            service,
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrepoError>;
