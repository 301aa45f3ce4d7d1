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

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{lenient, FastlyClient, FormParams};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DynamicSnippet {
    #[serde(default)]
    pub snippet_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub version: Option<i64>,
}

impl FastlyClient {
    pub async fn get_dynamic_snippet(
        &self,
        service_id: &str,
        snippet_id: &str,
    ) -> Result<DynamicSnippet> {
        self.get(&["service", service_id, "snippet", snippet_id])
            .await
            .with_context(|| format!("Failed to read dynamic snippet {snippet_id}"))
    }

    pub async fn update_dynamic_snippet(
        &self,
        service_id: &str,
        snippet_id: &str,
        content: &str,
    ) -> Result<DynamicSnippet> {
        self.put_form(
            &["service", service_id, "snippet", snippet_id],
            FormParams::new().raw("content", content),
        )
        .await
        .with_context(|| format!("Failed to update dynamic snippet {snippet_id}"))
    }
}
