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
use tf_provider::value::{ValueBool, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::ServiceBlock;
use crate::utils::{as_str, bool_value, check_one_of, number_value, string_value};

use super::{block, defaulted, name_attribute, optional, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSettingBlock {
    pub name: ValueString<'static>,
    pub request_condition: ValueString<'static>,
    pub action: ValueString<'static>,
    pub default_host: ValueString<'static>,
    pub hash_keys: ValueString<'static>,
    pub xff: ValueString<'static>,
    pub max_stale_age: ValueNumber,
    pub force_miss: ValueBool,
    pub force_ssl: ValueBool,
    pub bypass_busy_wait: ValueBool,
    pub timer_support: ValueBool,
    pub geo_headers: ValueBool,
}

#[derive(Debug, Deserialize)]
pub struct RequestSettingModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    request_condition: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    default_host: Option<String>,
    #[serde(default)]
    hash_keys: Option<String>,
    #[serde(default)]
    xff: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    max_stale_age: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    force_miss: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    force_ssl: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    bypass_busy_wait: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    timer_support: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    geo_headers: Option<bool>,
}

impl ServiceBlock for RequestSettingBlock {
    const NAME: &'static str = "request_setting";
    const COLLECTION: &'static str = "request_settings";
    type Model = RequestSettingModel;

    fn schema() -> Block {
        block(
            "Settings applied to requests matching a condition",
            map! {
                "name" => name_attribute("request setting"),
                "request_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "action" => optional(AttributeType::String, "One of lookup or pass"),
                "default_host" => optional(AttributeType::String, "Host header used when the request has none"),
                "hash_keys" => optional(AttributeType::String, "Comma separated list of variables making up the cache key"),
                "xff" => optional(AttributeType::String, "Handling of X-Forwarded-For: clear, leave, append, append_all or overwrite"),
                "max_stale_age" => defaulted(AttributeType::Number, "Seconds a stale object may be served"),
                "force_miss" => defaulted(AttributeType::Bool, "Force a cache miss"),
                "force_ssl" => defaulted(AttributeType::Bool, "Redirect plain HTTP requests to HTTPS"),
                "bypass_busy_wait" => defaulted(AttributeType::Bool, "Do not wait for concurrent requests to the same object"),
                "timer_support" => defaulted(AttributeType::Bool, "Inject the timer headers"),
                "geo_headers" => defaulted(AttributeType::Bool, "Inject the geolocation headers"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: RequestSettingModel) -> Self {
        Self {
            name: string_value(model.name),
            request_condition: string_value(model.request_condition),
            action: string_value(model.action),
            default_host: string_value(model.default_host),
            hash_keys: string_value(model.hash_keys),
            xff: string_value(model.xff),
            max_stale_age: number_value(model.max_stale_age),
            force_miss: bool_value(model.force_miss),
            force_ssl: bool_value(model.force_ssl),
            bypass_busy_wait: bool_value(model.bypass_busy_wait),
            timer_support: bool_value(model.timer_support),
            geo_headers: bool_value(model.geo_headers),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("request_condition", &self.request_condition)
            .string("action", &self.action)
            .string("default_host", &self.default_host)
            .string("hash_keys", &self.hash_keys)
            .string("xff", &self.xff)
            .number("max_stale_age", &self.max_stale_age)
            .bool("force_miss", &self.force_miss)
            .bool("force_ssl", &self.force_ssl)
            .bool("bypass_busy_wait", &self.bypass_busy_wait)
            .bool("timer_support", &self.timer_support)
            .bool("geo_headers", &self.geo_headers)
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.clone().attribute("action"),
            &self.action,
            &["lookup", "pass"],
        );
        check_one_of(
            diags,
            attr_path.attribute("xff"),
            &self.xff,
            &["clear", "leave", "append", "append_all", "overwrite"],
        );
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn flatten_request_setting() {
        let setting = RequestSettingBlock::flatten(
            serde_json::from_str(
                r#"{"name": "force-tls", "force_ssl": "1", "xff": "append", "max_stale_age": "60", "action": ""}"#,
            )
            .unwrap(),
        );

        assert_eq!(setting.force_ssl, Value::Value(true));
        assert_eq!(setting.action, Value::Null);
        let params = setting.params();
        assert_eq!(params.get("force_ssl"), Some("1"));
        assert_eq!(params.get("action"), None);
    }
}
