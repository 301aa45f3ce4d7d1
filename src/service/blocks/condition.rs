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
use crate::utils::{as_str, check_one_of, default_value, number_value, string_value};

use super::{block, defaulted, name_attribute, required};

pub const CONDITION_TYPES: &[&str] = &["REQUEST", "CACHE", "RESPONSE", "PREFETCH"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionBlock {
    pub name: ValueString<'static>,
    pub statement: ValueString<'static>,
    #[serde(rename = "type")]
    pub condition_type: ValueString<'static>,
    pub priority: ValueNumber,
}

#[derive(Debug, Deserialize)]
pub struct ConditionModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    statement: Option<String>,
    #[serde(default, rename = "type")]
    condition_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    priority: Option<i64>,
}

impl ServiceBlock for ConditionBlock {
    const NAME: &'static str = "condition";
    const COLLECTION: &'static str = "condition";
    type Model = ConditionModel;

    fn schema() -> Block {
        block(
            "VCL condition referenced by other objects",
            map! {
                "name" => name_attribute("condition"),
                "statement" => required(AttributeType::String, "VCL expression of the condition"),
                "type" => required(AttributeType::String, "Type of the condition: REQUEST, CACHE, RESPONSE or PREFETCH"),
                "priority" => defaulted(AttributeType::Number, "Evaluation order, lower first (default 10)"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: ConditionModel) -> Self {
        Self {
            name: string_value(model.name),
            statement: string_value(model.statement),
            condition_type: string_value(model.condition_type),
            priority: number_value(model.priority),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("statement", &self.statement)
            .string("type", &self.condition_type)
            .number("priority", &self.priority)
    }

    fn normalize(&mut self) {
        default_value(&mut self.priority, 10);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.attribute("type"),
            &self.condition_type,
            CONDITION_TYPES,
        );
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn flatten_condition() {
        let condition = ConditionBlock::flatten(
            serde_json::from_str(
                r#"{"name": "is_api", "statement": "req.url ~ \"^/api\"", "type": "REQUEST", "priority": "5"}"#,
            )
            .unwrap(),
        );

        assert_eq!(condition.condition_type, ValueString::from("REQUEST"));
        assert_eq!(condition.priority, Value::Value(5));
        assert_eq!(condition.params().get("type"), Some("REQUEST"));
    }

    #[test]
    fn condition_type_is_case_sensitive() {
        let mut condition = ConditionBlock::flatten(
            serde_json::from_str(r#"{"name": "c", "statement": "true", "type": "request"}"#)
                .unwrap(),
        );
        condition.normalize();

        let mut diags = Diagnostics::default();
        condition.validate(&mut diags, AttributePath::new("condition"));
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(condition.priority, Value::Value(10));
    }
}
