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
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiRequest, FastlyClient, BATCH_LIMIT};

const ITEMS_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DictionaryItem {
    pub item_key: String,
    #[serde(default)]
    pub item_value: String,
}

/// One operation of a batch update of dictionary items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryItemOp {
    pub op: &'static str,
    pub item_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_value: Option<String>,
}

impl DictionaryItemOp {
    pub fn create(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "create",
            item_key: key.into(),
            item_value: Some(value.into()),
        }
    }

    pub fn update(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "update",
            item_key: key.into(),
            item_value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            op: "delete",
            item_key: key.into(),
            item_value: None,
        }
    }
}

impl FastlyClient {
    pub async fn list_dictionary_items(
        &self,
        service_id: &str,
        dictionary_id: &str,
    ) -> Result<Vec<DictionaryItem>> {
        let mut items = Vec::new();
        for page in 1.. {
            let batch: Vec<DictionaryItem> = self
                .fetch(
                    ApiRequest::new(
                        Method::GET,
                        ["service", service_id, "dictionary", dictionary_id, "items"],
                    )
                    .query("page", page)
                    .query("per_page", ITEMS_PER_PAGE),
                )
                .await
                .with_context(|| format!("Failed to list items of dictionary {dictionary_id}"))?;
            let len = batch.len();
            items.extend(batch);
            if len < ITEMS_PER_PAGE {
                break;
            }
        }
        Ok(items)
    }

    pub async fn batch_dictionary_items(
        &self,
        service_id: &str,
        dictionary_id: &str,
        ops: &[DictionaryItemOp],
    ) -> Result<()> {
        for chunk in ops.chunks(BATCH_LIMIT) {
            self.execute(
                ApiRequest::new(
                    Method::PATCH,
                    ["service", service_id, "dictionary", dictionary_id, "items"],
                )
                .json(serde_json::json!({ "items": chunk })),
            )
            .await
            .with_context(|| format!("Failed to update items of dictionary {dictionary_id}"))?;
        }
        Ok(())
    }
}
