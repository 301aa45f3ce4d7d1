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

use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueBool, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::ServiceBlock;
use crate::utils::{
    as_str, bool_value, check_one_of, default_value, number_value, string_value,
};

use super::{block, defaulted, name_attribute, optional, required, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderBlock {
    pub name: ValueString<'static>,
    pub action: ValueString<'static>,
    #[serde(rename = "type")]
    pub header_type: ValueString<'static>,
    pub destination: ValueString<'static>,
    pub source: ValueString<'static>,
    pub regex: ValueString<'static>,
    pub substitution: ValueString<'static>,
    pub ignore_if_set: ValueBool,
    pub priority: ValueNumber,
    pub request_condition: ValueString<'static>,
    pub cache_condition: ValueString<'static>,
    pub response_condition: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct HeaderModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "type")]
    header_type: Option<String>,
    #[serde(default, rename = "dst")]
    destination: Option<String>,
    #[serde(default, rename = "src")]
    source: Option<String>,
    #[serde(default)]
    regex: Option<String>,
    #[serde(default)]
    substitution: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    ignore_if_set: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    priority: Option<i64>,
    #[serde(default)]
    request_condition: Option<String>,
    #[serde(default)]
    cache_condition: Option<String>,
    #[serde(default)]
    response_condition: Option<String>,
}

impl ServiceBlock for HeaderBlock {
    const NAME: &'static str = "header";
    const COLLECTION: &'static str = "header";
    type Model = HeaderModel;

    fn schema() -> Block {
        block(
            "Header manipulation on requests or responses",
            map! {
                "name" => name_attribute("header"),
                "action" => required(AttributeType::String, "One of set, append, delete, regex or regex_repeat"),
                "type" => required(AttributeType::String, "One of request, fetch, cache or response"),
                "destination" => required(AttributeType::String, "Header to set, e.g. http.X-Served-By"),
                "source" => optional(AttributeType::String, "Variable or literal used as the header value"),
                "regex" => optional(AttributeType::String, "Regular expression for the regex actions"),
                "substitution" => optional(AttributeType::String, "Replacement for the regex actions"),
                "ignore_if_set" => defaulted(AttributeType::Bool, "Do not change the header if it is already set (default false)"),
                "priority" => defaulted(AttributeType::Number, "Application order, lower first (default 100)"),
                "request_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "cache_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "response_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: HeaderModel) -> Self {
        Self {
            name: string_value(model.name),
            action: string_value(model.action),
            header_type: string_value(model.header_type),
            destination: string_value(model.destination),
            source: string_value(model.source),
            regex: string_value(model.regex),
            substitution: string_value(model.substitution),
            ignore_if_set: bool_value(model.ignore_if_set),
            priority: number_value(model.priority),
            request_condition: string_value(model.request_condition),
            cache_condition: string_value(model.cache_condition),
            response_condition: string_value(model.response_condition),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("action", &self.action)
            .string("type", &self.header_type)
            .string("dst", &self.destination)
            .string("src", &self.source)
            .string("regex", &self.regex)
            .string("substitution", &self.substitution)
            .bool("ignore_if_set", &self.ignore_if_set)
            .number("priority", &self.priority)
            .string("request_condition", &self.request_condition)
            .string("cache_condition", &self.cache_condition)
            .string("response_condition", &self.response_condition)
    }

    fn normalize(&mut self) {
        default_value(&mut self.ignore_if_set, false);
        default_value(&mut self.priority, 100);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.clone().attribute("action"),
            &self.action,
            &["set", "append", "delete", "regex", "regex_repeat"],
        );
        check_one_of(
            diags,
            attr_path.clone().attribute("type"),
            &self.header_type,
            &["request", "fetch", "cache", "response"],
        );

        let is_regex = matches!(as_str(&self.action), "regex" | "regex_repeat");
        if is_regex && self.regex.is_null() {
            diags.error(
                format!("Header `{}` has no regex", self.key()),
                "The regex and regex_repeat actions require `regex`",
                attr_path.clone().attribute("regex"),
            );
        }
        if as_str(&self.action) == "delete" && matches!(self.source, Value::Value(_)) {
            diags.warning(
                format!("Header `{}` ignores its source", self.key()),
                "`source` has no effect with the delete action",
                attr_path.attribute("source"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_and_destination_use_api_names() {
        let header = HeaderBlock::flatten(
            serde_json::from_str(
                r#"{"name": "served-by", "action": "set", "type": "response", "dst": "http.X-Served-By", "src": "server.identity", "ignore_if_set": "0", "priority": "100"}"#,
            )
            .unwrap(),
        );

        assert_eq!(header.destination, ValueString::from("http.X-Served-By"));
        let params = header.params();
        assert_eq!(params.get("dst"), Some("http.X-Served-By"));
        assert_eq!(params.get("src"), Some("server.identity"));
        assert_eq!(params.get("ignore_if_set"), Some("0"));
    }

    #[test]
    fn regex_action_requires_regex() {
        let header = HeaderBlock::flatten(
            serde_json::from_str(
                r#"{"name": "h", "action": "regex", "type": "request", "dst": "url"}"#,
            )
            .unwrap(),
        );

        let mut diags = Diagnostics::default();
        header.validate(&mut diags, AttributePath::new("header"));
        assert_eq!(diags.errors.len(), 1);
    }
}
