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
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::ServiceBlock;
use crate::utils::{as_str, check_one_of, number_value, string_value};

use super::{block, defaulted, name_attribute, optional, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettingBlock {
    pub name: ValueString<'static>,
    pub action: ValueString<'static>,
    pub cache_condition: ValueString<'static>,
    pub stale_ttl: ValueNumber,
    pub ttl: ValueNumber,
}

#[derive(Debug, Deserialize)]
pub struct CacheSettingModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    cache_condition: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    stale_ttl: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    ttl: Option<i64>,
}

impl ServiceBlock for CacheSettingBlock {
    const NAME: &'static str = "cache_setting";
    const COLLECTION: &'static str = "cache_settings";
    type Model = CacheSettingModel;

    fn schema() -> Block {
        block(
            "Caching policy applied when its condition matches",
            map! {
                "name" => name_attribute("cache setting"),
                "action" => optional(AttributeType::String, "One of cache, pass or restart"),
                "cache_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "stale_ttl" => defaulted(AttributeType::Number, "Seconds an object may be served stale"),
                "ttl" => defaulted(AttributeType::Number, "Seconds an object is cached"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: CacheSettingModel) -> Self {
        Self {
            name: string_value(model.name),
            action: string_value(model.action),
            cache_condition: string_value(model.cache_condition),
            stale_ttl: number_value(model.stale_ttl),
            ttl: number_value(model.ttl),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("action", &self.action)
            .string("cache_condition", &self.cache_condition)
            .number("stale_ttl", &self.stale_ttl)
            .number("ttl", &self.ttl)
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.attribute("action"),
            &self.action,
            &["cache", "pass", "restart"],
        );
    }
}
