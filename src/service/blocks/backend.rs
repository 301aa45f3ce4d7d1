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
use crate::utils::{as_str, bool_value, default_value, number_value, string_value};

use super::{block, defaulted, name_attribute, optional, required, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendBlock {
    pub name: ValueString<'static>,
    pub address: ValueString<'static>,
    pub port: ValueNumber,
    pub override_host: ValueString<'static>,
    pub connect_timeout: ValueNumber,
    pub first_byte_timeout: ValueNumber,
    pub between_bytes_timeout: ValueNumber,
    pub error_threshold: ValueNumber,
    pub max_conn: ValueNumber,
    pub weight: ValueNumber,
    pub auto_loadbalance: ValueBool,
    pub use_ssl: ValueBool,
    pub ssl_check_cert: ValueBool,
    pub ssl_cert_hostname: ValueString<'static>,
    pub ssl_sni_hostname: ValueString<'static>,
    pub min_tls_version: ValueString<'static>,
    pub max_tls_version: ValueString<'static>,
    pub shield: ValueString<'static>,
    pub healthcheck: ValueString<'static>,
    pub request_condition: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct BackendModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    port: Option<i64>,
    #[serde(default)]
    override_host: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    connect_timeout: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    first_byte_timeout: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    between_bytes_timeout: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    error_threshold: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    max_conn: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    weight: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    auto_loadbalance: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    use_ssl: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    ssl_check_cert: Option<bool>,
    #[serde(default)]
    ssl_cert_hostname: Option<String>,
    #[serde(default)]
    ssl_sni_hostname: Option<String>,
    #[serde(default)]
    min_tls_version: Option<String>,
    #[serde(default)]
    max_tls_version: Option<String>,
    #[serde(default)]
    shield: Option<String>,
    #[serde(default)]
    healthcheck: Option<String>,
    #[serde(default)]
    request_condition: Option<String>,
}

impl ServiceBlock for BackendBlock {
    const NAME: &'static str = "backend";
    const COLLECTION: &'static str = "backend";
    type Model = BackendModel;

    fn schema() -> Block {
        block(
            "Origin server the service fetches content from",
            map! {
                "name" => name_attribute("backend"),
                "address" => required(AttributeType::String, "Hostname or IP address of the backend"),
                "port" => defaulted(AttributeType::Number, "Port of the backend (default 80)"),
                "override_host" => optional(AttributeType::String, "Host header sent to the backend"),
                "connect_timeout" => defaulted(AttributeType::Number, "Connection timeout in milliseconds (default 1000)"),
                "first_byte_timeout" => defaulted(AttributeType::Number, "Timeout for the first byte in milliseconds (default 15000)"),
                "between_bytes_timeout" => defaulted(AttributeType::Number, "Timeout between bytes in milliseconds (default 10000)"),
                "error_threshold" => defaulted(AttributeType::Number, "Number of errors before the backend is marked down (default 0)"),
                "max_conn" => defaulted(AttributeType::Number, "Maximum number of connections (default 200)"),
                "weight" => defaulted(AttributeType::Number, "Weight used for load balancing, between 1 and 100 (default 100)"),
                "auto_loadbalance" => defaulted(AttributeType::Bool, "Include the backend in the automatic load balancing pool (default false)"),
                "use_ssl" => defaulted(AttributeType::Bool, "Connect to the backend with TLS (default false)"),
                "ssl_check_cert" => defaulted(AttributeType::Bool, "Check the backend certificate (default true)"),
                "ssl_cert_hostname" => optional(AttributeType::String, "Hostname checked against the certificate"),
                "ssl_sni_hostname" => optional(AttributeType::String, "Hostname sent for SNI"),
                "min_tls_version" => optional(AttributeType::String, "Minimum allowed TLS version"),
                "max_tls_version" => optional(AttributeType::String, "Maximum allowed TLS version"),
                "shield" => optional(AttributeType::String, "POP used as shield"),
                "healthcheck" => optional(AttributeType::String, "Name of the healthcheck of the backend"),
                "request_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: BackendModel) -> Self {
        Self {
            name: string_value(model.name),
            address: string_value(model.address),
            port: number_value(model.port),
            override_host: string_value(model.override_host),
            connect_timeout: number_value(model.connect_timeout),
            first_byte_timeout: number_value(model.first_byte_timeout),
            between_bytes_timeout: number_value(model.between_bytes_timeout),
            error_threshold: number_value(model.error_threshold),
            max_conn: number_value(model.max_conn),
            weight: number_value(model.weight),
            auto_loadbalance: bool_value(model.auto_loadbalance),
            use_ssl: bool_value(model.use_ssl),
            ssl_check_cert: bool_value(model.ssl_check_cert),
            ssl_cert_hostname: string_value(model.ssl_cert_hostname),
            ssl_sni_hostname: string_value(model.ssl_sni_hostname),
            min_tls_version: string_value(model.min_tls_version),
            max_tls_version: string_value(model.max_tls_version),
            shield: string_value(model.shield),
            healthcheck: string_value(model.healthcheck),
            request_condition: string_value(model.request_condition),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("address", &self.address)
            .number("port", &self.port)
            .string("override_host", &self.override_host)
            .number("connect_timeout", &self.connect_timeout)
            .number("first_byte_timeout", &self.first_byte_timeout)
            .number("between_bytes_timeout", &self.between_bytes_timeout)
            .number("error_threshold", &self.error_threshold)
            .number("max_conn", &self.max_conn)
            .number("weight", &self.weight)
            .bool("auto_loadbalance", &self.auto_loadbalance)
            .bool("use_ssl", &self.use_ssl)
            .bool("ssl_check_cert", &self.ssl_check_cert)
            .string("ssl_cert_hostname", &self.ssl_cert_hostname)
            .string("ssl_sni_hostname", &self.ssl_sni_hostname)
            .string("min_tls_version", &self.min_tls_version)
            .string("max_tls_version", &self.max_tls_version)
            .string("shield", &self.shield)
            .string("healthcheck", &self.healthcheck)
            .string("request_condition", &self.request_condition)
    }

    fn normalize(&mut self) {
        default_value(&mut self.port, 80);
        default_value(&mut self.connect_timeout, 1000);
        default_value(&mut self.first_byte_timeout, 15000);
        default_value(&mut self.between_bytes_timeout, 10000);
        default_value(&mut self.error_threshold, 0);
        default_value(&mut self.max_conn, 200);
        default_value(&mut self.weight, 100);
        default_value(&mut self.auto_loadbalance, false);
        default_value(&mut self.use_ssl, false);
        default_value(&mut self.ssl_check_cert, true);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(port) = self.port {
            if !(1..=65535).contains(&port) {
                diags.error(
                    format!("Invalid port {port} for backend `{}`", self.key()),
                    "The port must be between 1 and 65535",
                    attr_path.clone().attribute("port"),
                );
            }
        }
        if let Value::Value(weight) = self.weight {
            if !(1..=100).contains(&weight) {
                diags.error(
                    format!("Invalid weight {weight} for backend `{}`", self.key()),
                    "The weight must be between 1 and 100",
                    attr_path.attribute("weight"),
                );
            }
        }
    }
}
