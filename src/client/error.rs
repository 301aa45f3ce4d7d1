// This file is part of the terraform-provider-fastly project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
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

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastlyError {
    #[error("Fastly API error {status}: {msg}{}", detail_suffix(.detail))]
    Api {
        status: u16,
        msg: String,
        detail: String,
    },
    #[error("Failed to decode Fastly API response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Fastly API transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Fastly provider is not configured")]
    NotConfigured,
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" ({detail})")
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl FastlyError {
    /// Build an API error from a failed response body
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let msg = parsed
            .msg
            .or(parsed.title)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned());
        Self::Api {
            status,
            msg,
            detail: parsed.detail.unwrap_or_default(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Check if an error is a Fastly 404
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<FastlyError>())
        .any(|err| err.status() == Some(404))
}
