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

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueList, ValueString};

use crate::client::FormParams;
use crate::service::handler::ServiceBlock;
use crate::utils::{as_str, string_value};

use super::{block, name_attribute, optional, CONDITION_DESCRIPTION};

pub type StringSet = ValueList<ValueString<'static>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GzipBlock {
    pub name: ValueString<'static>,
    pub content_types: StringSet,
    pub extensions: StringSet,
    pub cache_condition: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct GzipModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content_types: Option<String>,
    #[serde(default)]
    extensions: Option<String>,
    #[serde(default)]
    cache_condition: Option<String>,
}

/// Split a space separated API field into a sorted set
fn split_set(value: Option<String>) -> StringSet {
    let mut values = value
        .unwrap_or_default()
        .split_whitespace()
        .map(|s| s.to_owned())
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Value::Null;
    }
    values.sort();
    values.dedup();
    Value::Value(
        values
            .into_iter()
            .map(|s| Value::Value(Cow::Owned(s)))
            .collect(),
    )
}

fn sort_set(set: &mut StringSet) {
    if let Value::Value(values) = set {
        values.sort();
        values.dedup();
    }
}

impl ServiceBlock for GzipBlock {
    const NAME: &'static str = "gzip";
    const COLLECTION: &'static str = "gzip";
    type Model = GzipModel;

    fn schema() -> Block {
        block(
            "Compression of responses by content type or extension",
            map! {
                "name" => name_attribute("gzip rule"),
                "content_types" => optional(AttributeType::Set(Box::new(AttributeType::String)), "Content types to compress"),
                "extensions" => optional(AttributeType::Set(Box::new(AttributeType::String)), "File extensions to compress"),
                "cache_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: GzipModel) -> Self {
        Self {
            name: string_value(model.name),
            content_types: split_set(model.content_types),
            extensions: split_set(model.extensions),
            cache_condition: string_value(model.cache_condition),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .joined("content_types", self.content_types.iter().flatten(), " ")
            .joined("extensions", self.extensions.iter().flatten(), " ")
            .string("cache_condition", &self.cache_condition)
    }

    fn normalize(&mut self) {
        sort_set(&mut self.content_types);
        sort_set(&mut self.extensions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_are_space_separated() {
        let mut gzip = GzipBlock::flatten(
            serde_json::from_str(
                r#"{"name": "default", "content_types": "text/html  application/json text/css", "extensions": "", "cache_condition": null}"#,
            )
            .unwrap(),
        );
        gzip.normalize();

        assert_eq!(
            gzip.content_types,
            Value::Value(vec![
                ValueString::from("application/json"),
                ValueString::from("text/css"),
                ValueString::from("text/html"),
            ])
        );
        assert_eq!(gzip.extensions, Value::Null);

        let params = gzip.params();
        assert_eq!(
            params.get("content_types"),
            Some("application/json text/css text/html")
        );
        assert_eq!(params.get("extensions"), Some(""));
    }
}
