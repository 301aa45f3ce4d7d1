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

use super::{lenient, ApiRequest, FastlyClient, BATCH_LIMIT};

const ENTRIES_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AclEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub subnet: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub negated: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One operation of a batch update of ACL entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AclEntryOp {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl AclEntryOp {
    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            op: "delete",
            id: Some(id.into()),
            ip: None,
            subnet: None,
            negated: None,
            comment: None,
        }
    }
}

impl FastlyClient {
    pub async fn list_acl_entries(&self, service_id: &str, acl_id: &str) -> Result<Vec<AclEntry>> {
        let mut entries = Vec::new();
        for page in 1.. {
            let batch: Vec<AclEntry> = self
                .fetch(
                    ApiRequest::new(Method::GET, ["service", service_id, "acl", acl_id, "entries"])
                        .query("page", page)
                        .query("per_page", ENTRIES_PER_PAGE),
                )
                .await
                .with_context(|| format!("Failed to list entries of ACL {acl_id}"))?;
            let len = batch.len();
            entries.extend(batch);
            if len < ENTRIES_PER_PAGE {
                break;
            }
        }
        Ok(entries)
    }

    /// Apply operations on ACL entries, split in chunks the API accepts
    pub async fn batch_acl_entries(
        &self,
        service_id: &str,
        acl_id: &str,
        ops: &[AclEntryOp],
    ) -> Result<()> {
        for chunk in ops.chunks(BATCH_LIMIT) {
            self.execute(
                ApiRequest::new(
                    Method::PATCH,
                    ["service", service_id, "acl", acl_id, "entries"],
                )
                .json(serde_json::json!({ "entries": chunk })),
            )
            .await
            .with_context(|| format!("Failed to update entries of ACL {acl_id}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::AclEntryOp;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    #[tokio::test]
    async fn batches_are_chunked() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let ops = (0..2500)
            .map(|i| AclEntryOp::delete(format!("entry{i}")))
            .collect::<Vec<_>>();

        client.batch_acl_entries("sid", "aid", &ops).await.unwrap();

        let requests = fake.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.method == Method::PATCH));
        let last = fake
            .json_body("PATCH /service/sid/acl/aid/entries")
            .unwrap();
        assert_eq!(last["entries"].as_array().unwrap().len(), 500);
        assert_eq!(
            last["entries"][0],
            serde_json::json!({"op": "delete", "id": "entry2000"})
        );
    }

    #[tokio::test]
    async fn entries_are_decoded_leniently() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/sid/acl/aid/entries",
            200,
            r#"[{"id":"e1","ip":"10.0.0.0","subnet":"8","negated":"1","comment":""}]"#,
        );
        let client = FastlyClient::new(fake);

        let entries = client.list_acl_entries("sid", "aid").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subnet, Some(8));
        assert_eq!(entries[0].negated, Some(true));
    }
}
