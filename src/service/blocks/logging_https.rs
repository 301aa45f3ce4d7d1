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
use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::ServiceBlock;
use crate::utils::{
    as_str, check_one_of, default_str, default_value, number_value, sensitive, string_value,
};

use super::logging_syslog::MESSAGE_TYPES;
use super::{block, defaulted, name_attribute, optional, required, CONDITION_DESCRIPTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingHttpsBlock {
    pub name: ValueString<'static>,
    pub url: ValueString<'static>,
    pub method: ValueString<'static>,
    pub content_type: ValueString<'static>,
    pub header_name: ValueString<'static>,
    pub header_value: ValueString<'static>,
    pub format: ValueString<'static>,
    pub format_version: ValueNumber,
    pub message_type: ValueString<'static>,
    pub json_format: ValueString<'static>,
    pub request_max_entries: ValueNumber,
    pub request_max_bytes: ValueNumber,
    pub tls_hostname: ValueString<'static>,
    pub tls_ca_cert: ValueString<'static>,
    pub response_condition: ValueString<'static>,
    pub placement: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingHttpsModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    header_name: Option<String>,
    #[serde(default)]
    header_value: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    format_version: Option<i64>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    json_format: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    request_max_entries: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    request_max_bytes: Option<i64>,
    #[serde(default)]
    tls_hostname: Option<String>,
    #[serde(default)]
    tls_ca_cert: Option<String>,
    #[serde(default)]
    response_condition: Option<String>,
    #[serde(default)]
    placement: Option<String>,
}

impl ServiceBlock for LoggingHttpsBlock {
    const NAME: &'static str = "logging_https";
    const COLLECTION: &'static str = "logging/https";
    type Model = LoggingHttpsModel;

    fn schema() -> Block {
        block(
            "HTTPS logging endpoint",
            map! {
                "name" => name_attribute("logging endpoint"),
                "url" => required(AttributeType::String, "URL the logs are sent to, must use https"),
                "method" => defaulted(AttributeType::String, "HTTP method, POST or PUT (default POST)"),
                "content_type" => optional(AttributeType::String, "Content type of the requests"),
                "header_name" => optional(AttributeType::String, "Name of a custom header sent with the requests"),
                "header_value" => sensitive(optional(AttributeType::String, "Value of the custom header")),
                "format" => optional(AttributeType::String, "Apache style log format"),
                "format_version" => defaulted(AttributeType::Number, "Version of the log format, 1 or 2 (default 2)"),
                "message_type" => defaulted(AttributeType::String, "One of classic, loggly, logplex or blank (default blank)"),
                "json_format" => defaulted(AttributeType::String, "0 (plain), 1 (JSON array) or 2 (newline delimited JSON) (default 0)"),
                "request_max_entries" => defaulted(AttributeType::Number, "Maximum number of logs per request"),
                "request_max_bytes" => defaulted(AttributeType::Number, "Maximum size of a request in bytes"),
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

    fn flatten(model: LoggingHttpsModel) -> Self {
        Self {
            name: string_value(model.name),
            url: string_value(model.url),
            method: string_value(model.method),
            content_type: string_value(model.content_type),
            header_name: string_value(model.header_name),
            header_value: string_value(model.header_value),
            format: string_value(model.format),
            format_version: number_value(model.format_version),
            message_type: string_value(model.message_type),
            json_format: string_value(model.json_format),
            request_max_entries: number_value(model.request_max_entries),
            request_max_bytes: number_value(model.request_max_bytes),
            tls_hostname: string_value(model.tls_hostname),
            tls_ca_cert: string_value(model.tls_ca_cert),
            response_condition: string_value(model.response_condition),
            placement: string_value(model.placement),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("url", &self.url)
            .string("method", &self.method)
            .string("content_type", &self.content_type)
            .string("header_name", &self.header_name)
            .string("header_value", &self.header_value)
            .string("format", &self.format)
            .number("format_version", &self.format_version)
            .string("message_type", &self.message_type)
            .string("json_format", &self.json_format)
            .number("request_max_entries", &self.request_max_entries)
            .number("request_max_bytes", &self.request_max_bytes)
            .string("tls_hostname", &self.tls_hostname)
            .string("tls_ca_cert", &self.tls_ca_cert)
            .string("response_condition", &self.response_condition)
            .string("placement", &self.placement)
    }

    fn normalize(&mut self) {
        default_str(&mut self.method, "POST");
        default_value(&mut self.format_version, 2);
        default_str(&mut self.message_type, "blank");
        default_str(&mut self.json_format, "0");
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.clone().attribute("method"),
            &self.method,
            &["POST", "PUT"],
        );
        check_one_of(
            diags,
            attr_path.clone().attribute("message_type"),
            &self.message_type,
            MESSAGE_TYPES,
        );
        check_one_of(
            diags,
            attr_path.clone().attribute("json_format"),
            &self.json_format,
            &["0", "1", "2"],
        );
        if let Value::Value(url) = &self.url {
            if !url.starts_with("https://") {
                diags.error(
                    format!("Logging endpoint `{}` does not use https", self.key()),
                    format!("`{url}` must start with https://"),
                    attr_path.attribute("url"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn https(url: &'static str) -> LoggingHttpsBlock {
        let mut https = LoggingHttpsBlock::flatten(
            serde_json::from_str(&format!(r#"{{"name": "collector", "url": "{url}", "json_format": 2}}"#))
                .unwrap(),
        );
        https.normalize();
        https
    }

    #[test]
    fn json_format_may_be_a_number() {
        let https = https("https://logs.example.com/ingest");
        assert_eq!(https.json_format, ValueString::from("2"));
        assert_eq!(https.method, ValueString::from("POST"));

        let mut diags = Diagnostics::default();
        https.validate(&mut diags, AttributePath::new("logging_https"));
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn plain_http_url_is_rejected() {
        let mut diags = Diagnostics::default();
        https("http://logs.example.com").validate(&mut diags, AttributePath::new("logging_https"));
        assert_eq!(diags.errors.len(), 1);
    }
}
