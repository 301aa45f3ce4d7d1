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
use tf_provider::value::{ValueNumber, ValueString};

use crate::client::{lenient, FormParams};
use crate::service::handler::ServiceBlock;
use crate::utils::{as_str, default_str, default_value, number_value, string_value};

use super::{block, defaulted, name_attribute, optional, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObjectBlock {
    pub name: ValueString<'static>,
    pub status: ValueNumber,
    pub response: ValueString<'static>,
    pub content: ValueString<'static>,
    pub content_type: ValueString<'static>,
    pub request_condition: ValueString<'static>,
    pub cache_condition: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseObjectModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    status: Option<i64>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    request_condition: Option<String>,
    #[serde(default)]
    cache_condition: Option<String>,
}

impl ServiceBlock for ResponseObjectBlock {
    const NAME: &'static str = "response_object";
    const COLLECTION: &'static str = "response_object";
    type Model = ResponseObjectModel;

    fn schema() -> Block {
        block(
            "Synthetic response served by the edge",
            map! {
                "name" => name_attribute("response object"),
                "status" => defaulted(AttributeType::Number, "Status code of the response (default 200)"),
                "response" => defaulted(AttributeType::String, "Status text of the response (default OK)"),
                "content" => optional(AttributeType::String, "Body of the response"),
                "content_type" => optional(AttributeType::String, "Content type of the body"),
                "request_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "cache_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: ResponseObjectModel) -> Self {
        Self {
            name: string_value(model.name),
            status: number_value(model.status),
            response: string_value(model.response),
            content: string_value(model.content),
            content_type: string_value(model.content_type),
            request_condition: string_value(model.request_condition),
            cache_condition: string_value(model.cache_condition),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .number("status", &self.status)
            .string("response", &self.response)
            .string("content", &self.content)
            .string("content_type", &self.content_type)
            .string("request_condition", &self.request_condition)
            .string("cache_condition", &self.cache_condition)
    }

    fn normalize(&mut self) {
        default_value(&mut self.status, 200);
        default_str(&mut self.response, "OK");
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn defaults_fill_status_and_response() {
        let mut object = ResponseObjectBlock::flatten(
            serde_json::from_str(r#"{"name": "maintenance", "content": "<h1>Back soon</h1>"}"#)
                .unwrap(),
        );
        object.normalize();

        assert_eq!(object.status, Value::Value(200));
        assert_eq!(object.response, ValueString::from("OK"));
        assert_eq!(object.params().get("status"), Some("200"));
    }
}
