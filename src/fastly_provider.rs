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

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{
    map, AttributePath, Diagnostics, DynamicDataSource, DynamicResource, Provider,
};
use url::Url;

use crate::acl_entries::AclEntriesResource;
use crate::client::{ClientHandle, FastlyClient, HttpTransport, DEFAULT_BASE_URL};
use crate::data_sources::{DatacentersDataSource, IpRangesDataSource, ServicesDataSource};
use crate::dictionary_items::DictionaryItemsResource;
use crate::dynamic_snippet_content::DynamicSnippetContentResource;
use crate::ngwaf::WorkspaceResource;
use crate::service::{ComputeService, ServiceResource, VclService};
use crate::utils::{attribute, sensitive, WithSchema, WithValidate};

const API_KEY_ENV: &str = "FASTLY_API_KEY";
const API_URL_ENV: &str = "FASTLY_API_URL";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastlyConfig {
    pub api_key: ValueString<'static>,
    pub base_url: ValueString<'static>,
    pub no_auth: ValueBool,
}

/// Connection settings resolved from the configuration and the environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    base_url: String,
    api_key: Option<String>,
}

impl FastlyConfig {
    fn resolve(&self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let base_url = non_empty(self.base_url.as_deref_option().map(str::to_owned))
            .or_else(|| non_empty(env(API_URL_ENV)))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        if self.no_auth == Value::Value(true) {
            return Ok(Settings {
                base_url,
                api_key: None,
            });
        }
        let api_key = non_empty(self.api_key.as_deref_option().map(str::to_owned))
            .or_else(|| non_empty(env(API_KEY_ENV)))
            .ok_or_else(|| {
                anyhow!("No API key: set `api_key`, the {API_KEY_ENV} environment variable or `no_auth`")
            })?;
        Ok(Settings {
            base_url,
            api_key: Some(api_key),
        })
    }
}

impl WithSchema for FastlyConfig {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Fastly"),
                attributes: map! {
                    "api_key" => sensitive(attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "Fastly API key, defaults to the FASTLY_API_KEY environment variable",
                    )),
                    "base_url" => attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "Fastly API url, defaults to FASTLY_API_URL or https://api.fastly.com",
                    ),
                    "no_auth" => attribute(
                        AttributeType::Bool,
                        AttributeConstraint::Optional,
                        "Send requests without an API key, only public endpoints are available",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl WithValidate for FastlyConfig {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(base_url) = &self.base_url {
            let valid = Url::parse(base_url)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
                .unwrap_or(false);
            if !valid {
                diags.error(
                    format!("Invalid base_url `{base_url}`"),
                    "Expected an absolute http or https url",
                    attr_path.attribute("base_url"),
                );
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FastlyProvider {
    client: ClientHandle,
}

#[async_trait]
impl Provider for FastlyProvider {
    type Config<'a> = FastlyConfig;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(FastlyConfig::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.validate(diags, AttributePath::root());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = match config.resolve(|name| std::env::var(name).ok()) {
            Ok(settings) => settings,
            Err(err) => {
                diags.root_error_short(err.to_string());
                return None;
            }
        };
        let transport = match HttpTransport::new(&settings.base_url, settings.api_key) {
            Ok(transport) => transport,
            Err(err) => {
                diags.error(
                    "Failed to configure the Fastly client",
                    format!("{err:#}"),
                    AttributePath::new("base_url"),
                );
                return None;
            }
        };
        tracing::debug!(
            base_url = %settings.base_url,
            %terraform_version,
            "Configured Fastly provider"
        );
        self.client.set(FastlyClient::new(transport)).await;
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        Some(map! {
            "service_vcl" => ServiceResource::<VclService>::new(self.client.clone()),
            "service_compute" => ServiceResource::<ComputeService>::new(self.client.clone()),
            "service_acl_entries" => AclEntriesResource::new(self.client.clone()),
            "service_dictionary_items" => DictionaryItemsResource::new(self.client.clone()),
            "service_dynamic_snippet_content" => DynamicSnippetContentResource::new(self.client.clone()),
            "ngwaf_workspace" => WorkspaceResource::new(self.client.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(map! {
            "ip_ranges" => IpRangesDataSource::new(self.client.clone()),
            "datacenters" => DatacentersDataSource::new(self.client.clone()),
            "services" => ServicesDataSource::new(self.client.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn configuration_wins_over_environment() {
        let config = FastlyConfig {
            api_key: ValueString::from("from-config"),
            ..Default::default()
        };
        let settings = config
            .resolve(env(&[(API_KEY_ENV, "from-env"), (API_URL_ENV, "http://localhost:8080")]))
            .unwrap();
        assert_eq!(
            settings,
            Settings {
                base_url: "http://localhost:8080".to_owned(),
                api_key: Some("from-config".to_owned()),
            }
        );

        let settings = FastlyConfig::default()
            .resolve(env(&[(API_KEY_ENV, "from-env")]))
            .unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn api_key_is_required_unless_no_auth() {
        assert!(FastlyConfig::default().resolve(env(&[])).is_err());

        let config = FastlyConfig {
            no_auth: Value::Value(true),
            ..Default::default()
        };
        let settings = config.resolve(env(&[(API_KEY_ENV, "ignored")])).unwrap();
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn base_url_must_be_http() {
        for (url, errors) in [
            ("https://api.fastly.com", 0),
            ("http://127.0.0.1:9000/", 0),
            ("ftp://api.fastly.com", 1),
            ("api.fastly.com", 1),
        ] {
            let config = FastlyConfig {
                base_url: ValueString::from(url),
                ..Default::default()
            };
            let mut diags = Diagnostics::default();
            config.validate(&mut diags, AttributePath::root());
            assert_eq!(diags.errors.len(), errors, "{url}");
        }
    }

    #[tokio::test]
    async fn configure_fills_the_shared_client() {
        let provider = FastlyProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 6);
        assert!(resources.contains_key("service_vcl"));
        assert_eq!(provider.get_data_sources(&mut diags).unwrap().len(), 3);

        let config = FastlyConfig {
            base_url: ValueString::from("http://127.0.0.1:9"),
            no_auth: Value::Value(true),
            ..Default::default()
        };
        provider
            .configure(&mut diags, "1.9.0".to_owned(), config)
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert!(provider.client.get().await.is_ok());
    }
}
