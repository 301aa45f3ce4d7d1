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

use crate::client::{lenient, FormParams};
use crate::service::handler::{ServiceBlock, VersionRef};
use crate::utils::{as_str, bool_value, default_value, string_value};

use super::{block, computed, defaulted, name_attribute};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryBlock {
    pub name: ValueString<'static>,
    pub write_only: ValueBool,
    pub dictionary_id: ValueString<'static>,
    pub force_destroy: ValueBool,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    write_only: Option<bool>,
}

#[async_trait]
impl ServiceBlock for DictionaryBlock {
    const NAME: &'static str = "dictionary";
    const COLLECTION: &'static str = "dictionary";
    const HAS_COMPUTED: bool = true;
    type Model = DictionaryModel;

    fn schema() -> Block {
        block(
            "Edge dictionary, its items are managed with fastly_service_dictionary_items",
            map! {
                "name" => name_attribute("dictionary"),
                "write_only" => defaulted(AttributeType::Bool, "Hide the items from the API and the UI (default false)"),
                "dictionary_id" => computed(AttributeType::String, "ID of the dictionary"),
                "force_destroy" => defaulted(AttributeType::Bool, "Allow deleting the dictionary while it still has items (default false)"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: DictionaryModel) -> Self {
        Self {
            name: string_value(model.name),
            write_only: bool_value(model.write_only.or(Some(false))),
            dictionary_id: string_value(model.id),
            force_destroy: Value::Value(false),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .bool("write_only", &self.write_only)
    }

    fn normalize(&mut self) {
        default_value(&mut self.write_only, false);
        default_value(&mut self.force_destroy, false);
    }

    fn keep_computed(&mut self, from: Option<&Self>) {
        self.dictionary_id = from.map_or(Value::Unknown, |from| from.dictionary_id.clone());
    }

    fn keep_local(&mut self, current: &Self) {
        self.force_destroy = current.force_destroy;
    }

    async fn delete(&self, target: VersionRef<'_>) -> Result<()> {
        if self.force_destroy != Value::Value(true) {
            if let Value::Value(dictionary_id) = &self.dictionary_id {
                let items = target
                    .client
                    .list_dictionary_items(target.service_id, dictionary_id)
                    .await?;
                if !items.is_empty() {
                    bail!(
                        "Dictionary `{}` still has {} items, set `force_destroy = true` to delete it",
                        self.key(),
                        items.len()
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

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    #[test]
    fn flatten_defaults_write_only() {
        let dictionary = DictionaryBlock::flatten(
            serde_json::from_str(r#"{"id": "d1", "name": "redirects"}"#).unwrap(),
        );
        assert_eq!(dictionary.write_only, Value::Value(false));
        assert_eq!(dictionary.dictionary_id, ValueString::from("d1"));
        assert_eq!(dictionary.params().get("write_only"), Some("0"));
    }

    #[tokio::test]
    async fn non_empty_dictionary_is_kept_without_force_destroy() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/sid/dictionary/d1/items",
            200,
            r#"[{"item_key": "/old", "item_value": "/new"}]"#,
        );
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 3,
        };
        let dictionary = DictionaryBlock {
            name: ValueString::from("redirects"),
            write_only: Value::Value(false),
            dictionary_id: ValueString::from("d1"),
            force_destroy: Value::Value(false),
        };

        let err = dictionary.delete(target).await.unwrap_err();
        assert!(err.to_string().contains("still has 1 items"));
        assert!(!fake.paths().iter().any(|p| p.starts_with("DELETE")));
    }
}
