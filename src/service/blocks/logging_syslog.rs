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
use crate::utils::{
    as_str, bool_value, check_one_of, default_str, default_value, number_value, sensitive,
    string_value,
};

use super::{block, defaulted, name_attribute, optional, required, CONDITION_DESCRIPTION};

pub(super) const MESSAGE_TYPES: &[&str] = &["classic", "loggly", "logplex", "blank"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSyslogBlock {
    pub name: ValueString<'static>,
    pub address: ValueString<'static>,
    pub port: ValueNumber,
    pub format: ValueString<'static>,
    pub format_version: ValueNumber,
    pub message_type: ValueString<'static>,
    pub token: ValueString<'static>,
    pub use_tls: ValueBool,
    pub tls_hostname: ValueString<'static>,
    pub tls_ca_cert: ValueString<'static>,
    pub response_condition: ValueString<'static>,
    pub placement: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSyslogModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    port: Option<i64>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    format_version: Option<i64>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    use_tls: Option<bool>,
    #[serde(default)]
    tls_hostname: Option<String>,
    #[serde(default)]
    tls_ca_cert: Option<String>,
    #[serde(default)]
    response_condition: Option<String>,
    #[serde(default)]
    placement: Option<String>,
}

impl ServiceBlock for LoggingSyslogBlock {
    const NAME: &'static str = "logging_syslog";
    const COLLECTION: &'static str = "logging/syslog";
    type Model = LoggingSyslogModel;

    fn schema() -> Block {
        block(
            "Syslog logging endpoint",
            map! {
                "name" => name_attribute("logging endpoint"),
                "address" => required(AttributeType::String, "Hostname or IP address of the syslog server"),
                "port" => defaulted(AttributeType::Number, "Port of the syslog server (default 514)"),
                "format" => optional(AttributeType::String, "Apache style log format"),
                "format_version" => defaulted(AttributeType::Number, "Version of the log format, 1 or 2 (default 2)"),
                "message_type" => defaulted(AttributeType::String, "One of classic, loggly, logplex or blank (default classic)"),
                "token" => optional(AttributeType::String, "Prefix prepended to each message"),
                "use_tls" => defaulted(AttributeType::Bool, "Send the logs over TLS (default false)"),
                "tls_hostname" => optional(AttributeType::String, "Hostname checked against the server certificate"),
                "tls_ca_cert" => sensitive(optional(AttributeType::String, "CA certificate of the server, in PEM")),
                "response_condition" => optional(AttributeType::String, CONDITION_DESCRIPTION),
                "placement" => optional(AttributeType::String, "Where the logging statement is placed: none or waf_debug"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: LoggingSyslogModel) -> Self {
        Self {
            name: string_value(model.name),
            address: string_value(model.address),
            port: number_value(model.port),
            format: string_value(model.format),
            format_version: number_value(model.format_version),
            message_type: string_value(model.message_type),
            token: string_value(model.token),
            use_tls: bool_value(model.use_tls),
            tls_hostname: string_value(model.tls_hostname),
            tls_ca_cert: string_value(model.tls_ca_cert),
            response_condition: string_value(model.response_condition),
            placement: string_value(model.placement),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("address", &self.address)
            .number("port", &self.port)
            .string("format", &self.format)
            .number("format_version", &self.format_version)
            .string("message_type", &self.message_type)
            .string("token", &self.token)
            .bool("use_tls", &self.use_tls)
            .string("tls_hostname", &self.tls_hostname)
            .string("tls_ca_cert", &self.tls_ca_cert)
            .string("response_condition", &self.response_condition)
            .string("placement", &self.placement)
    }

    fn normalize(&mut self) {
        default_value(&mut self.port, 514);
        default_value(&mut self.format_version, 2);
        default_str(&mut self.message_type, "classic");
        default_value(&mut self.use_tls, false);
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.attribute("message_type"),
            &self.message_type,
            MESSAGE_TYPES,
        );
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn syslog_defaults() {
        let mut syslog = LoggingSyslogBlock::flatten(
            serde_json::from_str(r#"{"name": "syslog", "address": "logs.example.com", "use_tls": "0"}"#)
                .unwrap(),
        );
        syslog.normalize();

        assert_eq!(syslog.port, Value::Value(514));
        assert_eq!(syslog.use_tls, Value::Value(false));
        let params = syslog.params();
        assert_eq!(params.get("message_type"), Some("classic"));
        assert_eq!(params.get("format_version"), Some("2"));
    }
}
