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
use crate::utils::{as_str, check_one_of, default_str, default_value, number_value, string_value};

use super::{block, defaulted, name_attribute, required};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthcheckBlock {
    pub name: ValueString<'static>,
    pub host: ValueString<'static>,
    pub path: ValueString<'static>,
    pub check_interval: ValueNumber,
    pub expected_response: ValueNumber,
    pub http_version: ValueString<'static>,
    pub initial: ValueNumber,
    pub method: ValueString<'static>,
    pub threshold: ValueNumber,
    pub timeout: ValueNumber,
    pub window: ValueNumber,
}

#[derive(Debug, Deserialize)]
pub struct HealthcheckModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    check_interval: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    expected_response: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    http_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    initial: Option<i64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    threshold: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    timeout: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    window: Option<i64>,
}

impl ServiceBlock for HealthcheckBlock {
    const NAME: &'static str = "healthcheck";
    const COLLECTION: &'static str = "healthcheck";
    type Model = HealthcheckModel;

    fn schema() -> Block {
        block(
            "Health check of the backends",
            map! {
                "name" => name_attribute("healthcheck"),
                "host" => required(AttributeType::String, "Host header sent by the check"),
                "path" => required(AttributeType::String, "Path requested by the check"),
                "check_interval" => defaulted(AttributeType::Number, "Milliseconds between checks (default 5000)"),
                "expected_response" => defaulted(AttributeType::Number, "Expected status code (default 200)"),
                "http_version" => defaulted(AttributeType::String, "HTTP version of the check (default 1.1)"),
                "initial" => defaulted(AttributeType::Number, "Number of successes assumed at startup (default 1)"),
                "method" => defaulted(AttributeType::String, "HTTP method of the check (default HEAD)"),
                "threshold" => defaulted(AttributeType::Number, "Successes in the window to be healthy (default 1)"),
                "timeout" => defaulted(AttributeType::Number, "Timeout of the check in milliseconds (default 500)"),
                "window" => defaulted(AttributeType::Number, "Number of most recent checks considered (default 2)"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: HealthcheckModel) -> Self {
        Self {
            name: string_value(model.name),
            host: string_value(model.host),
            path: string_value(model.path),
            check_interval: number_value(model.check_interval),
            expected_response: number_value(model.expected_response),
            http_version: string_value(model.http_version),
            initial: number_value(model.initial),
            method: string_value(model.method),
            threshold: number_value(model.threshold),
            timeout: number_value(model.timeout),
            window: number_value(model.window),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("host", &self.host)
            .string("path", &self.path)
            .number("check_interval", &self.check_interval)
            .number("expected_response", &self.expected_response)
            .string("http_version", &self.http_version)
            .number("initial", &self.initial)
            .string("method", &self.method)
            .number("threshold", &self.threshold)
            .number("timeout", &self.timeout)
            .number("window", &self.window)
    }

    fn normalize(&mut self) {
        default_value(&mut self.check_interval, 5000);
        default_value(&mut self.expected_response, 200);
        default_str(&mut self.http_version, "1.1");
        default_value(&mut self.initial, 1);
        default_str(&mut self.method, "HEAD");
        default_value(&mut self.threshold, 1);
        default_value(&mut self.timeout, 500);
        default_value(&mut self.window, 2);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.attribute("http_version"),
            &self.http_version,
            &["1.0", "1.1", "2"],
        );
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn http_version_may_be_a_number() {
        let healthcheck = HealthcheckBlock::flatten(
            serde_json::from_str(
                r#"{"name": "hc", "host": "example.com", "path": "/ping", "http_version": 2, "window": "5"}"#,
            )
            .unwrap(),
        );

        assert_eq!(healthcheck.http_version, ValueString::from("2"));
        assert_eq!(healthcheck.window, Value::Value(5));
        assert_eq!(healthcheck.method, Value::Null);
    }
}
