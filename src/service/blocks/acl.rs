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

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueBool, ValueString};

use crate::client::FormParams;
use crate::service::handler::{ServiceBlock, VersionRef};
use crate::utils::{as_str, default_value, string_value};

use super::{block, computed, defaulted, name_attribute};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclBlock {
    pub name: ValueString<'static>,
    pub acl_id: ValueString<'static>,
    pub force_destroy: ValueBool,
}

#[derive(Debug, Deserialize)]
pub struct AclModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[async_trait]
impl ServiceBlock for AclBlock {
    const NAME: &'static str = "acl";
    const COLLECTION: &'static str = "acl";
    const HAS_COMPUTED: bool = true;
    type Model = AclModel;

    fn schema() -> Block {
        block(
            "Access control list, its entries are managed with fastly_service_acl_entries",
            map! {
                "name" => name_attribute("ACL"),
                "acl_id" => computed(AttributeType::String, "ID of the ACL"),
                "force_destroy" => defaulted(AttributeType::Bool, "Allow deleting the ACL while it still has entries (default false)"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: AclModel) -> Self {
        Self {
            name: string_value(model.name),
            acl_id: string_value(model.id),
            force_destroy: Value::Value(false),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new().string("name", &self.name)
    }

    fn normalize(&mut self) {
        default_value(&mut self.force_destroy, false);
    }

    fn keep_computed(&mut self, from: Option<&Self>) {
        self.acl_id = from.map_or(Value::Unknown, |from| from.acl_id.clone());
    }

    fn keep_local(&mut self, current: &Self) {
        self.force_destroy = current.force_destroy;
    }

    async fn delete(&self, target: VersionRef<'_>) -> Result<()> {
        if self.force_destroy != Value::Value(true) {
            if let Value::Value(acl_id) = &self.acl_id {
                let entries = target
                    .client
                    .list_acl_entries(target.service_id, acl_id)
                    .await?;
                if !entries.is_empty() {
                    bail!(
                        "ACL `{}` still has {} entries, set `force_destroy = true` to delete it",
                        self.key(),
                        entries.len()
                    );
                }
            }
        }
        target
            .client
            .delete_versioned(
                target.service_id,
                target.version,
                Self::COLLECTION,
                self.key(),
            )
            .await
    }
}
