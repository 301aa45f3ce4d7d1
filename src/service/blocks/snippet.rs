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

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::{ServiceBlock, VersionRef};
use crate::utils::{as_str, check_one_of, default_value, number_value, string_value};

use super::{block, computed, defaulted, name_attribute, required};

const SNIPPET_TYPES: &[&str] = &[
    "init", "recv", "hash", "hit", "miss", "pass", "fetch", "error", "deliver", "log", "none",
];

#[derive(Debug, Deserialize)]
pub struct SnippetModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    snippet_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    priority: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    dynamic: Option<bool>,
}

/// List the snippets of the version, keeping only dynamic or regular ones
async fn list_snippets(target: VersionRef<'_>, dynamic: bool) -> Result<Vec<SnippetModel>> {
    let snippets: Vec<SnippetModel> = target
        .client
        .list_versioned(target.service_id, target.version, "snippet")
        .await?;
    Ok(snippets
        .into_iter()
        .filter(|s| s.dynamic.unwrap_or_default() == dynamic)
        .collect())
}

fn validate_type(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    snippet_type: &ValueString<'_>,
) {
    check_one_of(diags, attr_path.attribute("type"), snippet_type, SNIPPET_TYPES);
}

/// VCL snippet whose content is part of the service version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetBlock {
    pub name: ValueString<'static>,
    #[serde(rename = "type")]
    pub snippet_type: ValueString<'static>,
    pub content: ValueString<'static>,
    pub priority: ValueNumber,
    pub snippet_id: ValueString<'static>,
}

#[async_trait]
impl ServiceBlock for SnippetBlock {
    const NAME: &'static str = "snippet";
    const COLLECTION: &'static str = "snippet";
    const HAS_COMPUTED: bool = true;
    type Model = SnippetModel;

    fn schema() -> Block {
        block(
            "VCL snippet inserted in the generated VCL",
            map! {
                "name" => name_attribute("snippet"),
                "type" => required(AttributeType::String, "VCL subroutine the snippet is inserted in"),
                "content" => required(AttributeType::String, "VCL code of the snippet"),
                "priority" => defaulted(AttributeType::Number, "Insertion order, lower first (default 100)"),
                "snippet_id" => computed(AttributeType::String, "ID of the snippet"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: SnippetModel) -> Self {
        Self {
            name: string_value(model.name),
            snippet_type: string_value(model.snippet_type),
            content: string_value(model.content),
            priority: number_value(model.priority),
            snippet_id: string_value(model.id),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("type", &self.snippet_type)
            .string("content", &self.content)
            .number("priority", &self.priority)
            .raw("dynamic", "0")
    }

    fn normalize(&mut self) {
        default_value(&mut self.priority, 100);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validate_type(diags, attr_path, &self.snippet_type);
    }

    fn keep_computed(&mut self, from: Option<&Self>) {
        self.snippet_id = from.map_or(Value::Unknown, |from| from.snippet_id.clone());
    }

    async fn list(target: VersionRef<'_>) -> Result<Vec<Self>> {
        Ok(list_snippets(target, false)
            .await?
            .into_iter()
            .map(Self::flatten)
            .collect())
    }
}

/// VCL snippet whose content is versionless and managed separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSnippetBlock {
    pub name: ValueString<'static>,
    #[serde(rename = "type")]
    pub snippet_type: ValueString<'static>,
    pub priority: ValueNumber,
    pub snippet_id: ValueString<'static>,
}

#[async_trait]
impl ServiceBlock for DynamicSnippetBlock {
    const NAME: &'static str = "dynamicsnippet";
    const COLLECTION: &'static str = "snippet";
    const HAS_COMPUTED: bool = true;
    type Model = SnippetModel;

    fn schema() -> Block {
        block(
            "Dynamic VCL snippet, its content is set with fastly_service_dynamic_snippet_content",
            map! {
                "name" => name_attribute("dynamic snippet"),
                "type" => required(AttributeType::String, "VCL subroutine the snippet is inserted in"),
                "priority" => defaulted(AttributeType::Number, "Insertion order, lower first (default 100)"),
                "snippet_id" => computed(AttributeType::String, "ID of the snippet"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: SnippetModel) -> Self {
        Self {
            name: string_value(model.name),
            snippet_type: string_value(model.snippet_type),
            priority: number_value(model.priority),
            snippet_id: string_value(model.id),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("type", &self.snippet_type)
            .number("priority", &self.priority)
            .raw("dynamic", "1")
    }

    fn normalize(&mut self) {
        default_value(&mut self.priority, 100);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validate_type(diags, attr_path, &self.snippet_type);
    }

    fn keep_computed(&mut self, from: Option<&Self>) {
        self.snippet_id = from.map_or(Value::Unknown, |from| from.snippet_id.clone());
    }

    async fn list(target: VersionRef<'_>) -> Result<Vec<Self>> {
        Ok(list_snippets(target, true)
            .await?
            .into_iter()
            .map(Self::flatten)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    const SNIPPETS: &str = r#"[
        {"id": "s1", "name": "recv", "type": "recv", "content": "set req.http.X = \"1\";", "priority": "100", "dynamic": "0"},
        {"id": "s2", "name": "blocklist", "type": "recv", "content": null, "priority": "10", "dynamic": "1"}
    ]"#;

    #[tokio::test]
    async fn snippets_are_split_by_dynamic_flag() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/service/sid/version/1/snippet", 200, SNIPPETS);
        let client = FastlyClient::new(fake);
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 1,
        };

        let regular = SnippetBlock::list(target).await.unwrap();
        let dynamic = DynamicSnippetBlock::list(target).await.unwrap();

        assert_eq!(regular.len(), 1);
        assert_eq!(regular[0].snippet_id, ValueString::from("s1"));
        assert_eq!(dynamic.len(), 1);
        assert_eq!(dynamic[0].key(), "blocklist");
        assert_eq!(dynamic[0].priority, Value::Value(10));
        assert_eq!(dynamic[0].params().get("dynamic"), Some("1"));
    }

    #[test]
    fn unknown_snippet_type() {
        let mut diags = Diagnostics::default();
        validate_type(
            &mut diags,
            AttributePath::new("snippet"),
            &ValueString::from("receive"),
        );
        assert_eq!(diags.errors.len(), 1);
    }
}
