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
use serde::{Deserialize, Serialize};

use super::FastlyClient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackSignalThresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_minute: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ten_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_hour: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immediate: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_anonymization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_blocking_response_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_signal_thresholds: Option<AttackSignalThresholds>,
}

impl FastlyClient {
    pub async fn create_workspace(&self, workspace: &Workspace) -> Result<Workspace> {
        self.post_json(
            &["ngwaf", "v1", "workspaces"],
            serde_json::to_value(workspace)?,
        )
        .await
        .with_context(|| format!("Failed to create NGWAF workspace {}", workspace.name))
    }

    pub async fn get_workspace(&self, workspace_id: &str) -> Result<Workspace> {
        self.get(&["ngwaf", "v1", "workspaces", workspace_id]).await
    }

    pub async fn update_workspace(
        &self,
        workspace_id: &str,
        workspace: &Workspace,
    ) -> Result<Workspace> {
        self.patch_json(
            &["ngwaf", "v1", "workspaces", workspace_id],
            serde_json::to_value(workspace)?,
        )
        .await
        .with_context(|| format!("Failed to update NGWAF workspace {workspace_id}"))
    }

    pub async fn delete_workspace(&self, workspace_id: &str) -> Result<()> {
        self.delete(&["ngwaf", "v1", "workspaces", workspace_id])
            .await
    }
}
