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

use anyhow::Result;
use async_trait::async_trait;
use tf_provider::schema::{AttributeConstraint, AttributeType, Block};
use tf_provider::value::{ValueBool, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::FormParams;
use crate::utils::{attribute, bool_value, default_value, number_value, string_value};

use super::blocks::{
    AclBlock, BackendBlock, CacheSettingBlock, ConditionBlock, DictionaryBlock, DirectorBlock,
    DomainBlock, DynamicSnippetBlock, GzipBlock, HeaderBlock, HealthcheckBlock, LoggingHttpsBlock,
    LoggingSyslogBlock, RequestSettingBlock, ResponseObjectBlock, SnippetBlock, VclBlock,
};
use super::handler::{BlockSet, Blocks, ServiceAttributeHandler, ServiceBlock, VersionRef};
use super::state::service_state;
use super::ServiceDefinition;

service_state! {
    /// State of a `fastly_service_vcl`
    pub struct VclServiceState {
        pub default_ttl: ValueNumber,
        pub default_host: ValueString<'static>,
        pub stale_if_error: ValueBool,
        pub stale_if_error_ttl: ValueNumber,
        pub domain: Blocks<DomainBlock>,
        pub backend: Blocks<BackendBlock>,
        pub healthcheck: Blocks<HealthcheckBlock>,
        pub condition: Blocks<ConditionBlock>,
        pub header: Blocks<HeaderBlock>,
        pub gzip: Blocks<GzipBlock>,
        pub cache_setting: Blocks<CacheSettingBlock>,
        pub request_setting: Blocks<RequestSettingBlock>,
        pub response_object: Blocks<ResponseObjectBlock>,
        pub snippet: Blocks<SnippetBlock>,
        pub dynamicsnippet: Blocks<DynamicSnippetBlock>,
        pub vcl: Blocks<VclBlock>,
        pub acl: Blocks<AclBlock>,
        pub dictionary: Blocks<DictionaryBlock>,
        pub director: Blocks<DirectorBlock>,
        pub logging_syslog: Blocks<LoggingSyslogBlock>,
        pub logging_https: Blocks<LoggingHttpsBlock>,
    }
}

#[derive(Debug)]
pub struct VclService;

impl ServiceDefinition for VclService {
    const SERVICE_TYPE: &'static str = "vcl";
    const DESCRIPTION: &'static str = "Fastly VCL service";

    type State = VclServiceState;

    fn handlers() -> Vec<Box<dyn ServiceAttributeHandler<VclServiceState>>> {
        // objects are created after the conditions, healthchecks and backends they refer to
        let handlers: Vec<Box<dyn ServiceAttributeHandler<VclServiceState>>> = vec![
            Box::new(SettingsHandler),
            set(|s| &s.domain, |s| &mut s.domain),
            set(|s| &s.condition, |s| &mut s.condition),
            set(|s| &s.healthcheck, |s| &mut s.healthcheck),
            set(|s| &s.backend, |s| &mut s.backend),
            set(|s| &s.director, |s| &mut s.director),
            set(|s| &s.header, |s| &mut s.header),
            set(|s| &s.gzip, |s| &mut s.gzip),
            set(|s| &s.cache_setting, |s| &mut s.cache_setting),
            set(|s| &s.request_setting, |s| &mut s.request_setting),
            set(|s| &s.response_object, |s| &mut s.response_object),
            set(|s| &s.acl, |s| &mut s.acl),
            set(|s| &s.dictionary, |s| &mut s.dictionary),
            set(|s| &s.snippet, |s| &mut s.snippet),
            set(|s| &s.dynamicsnippet, |s| &mut s.dynamicsnippet),
            set(|s| &s.vcl, |s| &mut s.vcl),
            set(|s| &s.logging_syslog, |s| &mut s.logging_syslog),
            set(|s| &s.logging_https, |s| &mut s.logging_https),
        ];
        handlers
    }
}

fn set<B: ServiceBlock>(
    get: fn(&VclServiceState) -> &Blocks<B>,
    get_mut: fn(&mut VclServiceState) -> &mut Blocks<B>,
) -> Box<dyn ServiceAttributeHandler<VclServiceState>> {
    Box::new(BlockSet::new(get, get_mut))
}

/// Version settings stored as top level attributes
#[derive(Debug)]
struct SettingsHandler;

impl SettingsHandler {
    fn params(state: &VclServiceState) -> FormParams {
        FormParams::new()
            .number("general.default_ttl", &state.default_ttl)
            .string("general.default_host", &state.default_host)
            .bool("general.stale_if_error", &state.stale_if_error)
            .number("general.stale_if_error_ttl", &state.stale_if_error_ttl)
    }
}

#[async_trait]
impl ServiceAttributeHandler<VclServiceState> for SettingsHandler {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn register(&self, block: &mut Block) {
        let attributes = [
            (
                "default_ttl",
                AttributeType::Number,
                "Default TTL of the cached objects in seconds (default 3600)",
            ),
            (
                "default_host",
                AttributeType::String,
                "Host header sent to the backends when none is set",
            ),
            (
                "stale_if_error",
                AttributeType::Bool,
                "Serve stale objects when the backend fails (default false)",
            ),
            (
                "stale_if_error_ttl",
                AttributeType::Number,
                "Maximum age of the stale objects served in seconds (default 43200)",
            ),
        ];
        for (name, attr_type, description) in attributes {
            block.attributes.insert(
                name.to_owned(),
                attribute(attr_type, AttributeConstraint::OptionalComputed, description),
            );
        }
    }

    fn normalize(&self, state: &mut VclServiceState) {
        default_value(&mut state.default_ttl, 3600);
        default_value(&mut state.stale_if_error, false);
        default_value(&mut state.stale_if_error_ttl, 43200);
    }

    fn validate(&self, diags: &mut Diagnostics, state: &VclServiceState) {
        for (name, value) in [
            ("default_ttl", &state.default_ttl),
            ("stale_if_error_ttl", &state.stale_if_error_ttl),
        ] {
            if let Some(value) = value.as_ref_option().filter(|&&v| v < 0) {
                diags.error(
                    format!("Invalid `{name}` {value}"),
                    "A TTL cannot be negative",
                    AttributePath::new(name),
                );
            }
        }
    }

    fn has_change(&self, prior: &VclServiceState, planned: &VclServiceState) -> bool {
        Self::params(prior) != Self::params(planned)
    }

    async fn process(
        &self,
        target: VersionRef<'_>,
        prior: &VclServiceState,
        planned: &VclServiceState,
    ) -> Result<()> {
        if !self.has_change(prior, planned) {
            return Ok(());
        }
        target
            .client
            .update_settings(target.service_id, target.version, Self::params(planned))
            .await
    }

    async fn read(&self, target: VersionRef<'_>, state: &mut VclServiceState) -> Result<()> {
        let settings = target
            .client
            .get_settings(target.service_id, target.version)
            .await?;
        state.default_ttl = number_value(settings.default_ttl);
        state.default_host = string_value(settings.default_host);
        state.stale_if_error = bool_value(settings.stale_if_error);
        state.stale_if_error_ttl = number_value(settings.stale_if_error_ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use tf_provider::value::Value;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;
    use crate::utils::WithNormalize;

    #[test]
    fn settings_defaults() {
        let mut state = VclServiceState::default();
        state.normalize(&mut Diagnostics::default());
        SettingsHandler.normalize(&mut state);

        assert_eq!(state.comment, ValueString::from("Managed by Terraform"));
        assert_eq!(state.activate, Value::Value(true));
        assert_eq!(state.default_ttl, Value::Value(3600));
        assert_eq!(state.stale_if_error_ttl, Value::Value(43200));
        assert!(state.default_host.is_null());
    }

    #[tokio::test]
    async fn settings_are_sent_only_when_changed() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };
        let mut prior = VclServiceState::default();
        SettingsHandler.normalize(&mut prior);
        let mut planned = prior.clone();

        SettingsHandler
            .process(target, &prior, &planned)
            .await
            .unwrap();
        assert!(fake.paths().is_empty());

        planned.default_host = ValueString::from("origin.example.com");
        SettingsHandler
            .process(target, &prior, &planned)
            .await
            .unwrap();
        assert_eq!(fake.paths(), vec!["PUT /service/sid/version/2/settings"]);
        assert_eq!(
            fake.form_value("PUT /service/sid/version/2/settings", "general.default_host")
                .as_deref(),
            Some("origin.example.com")
        );
        assert_eq!(
            fake.form_value("PUT /service/sid/version/2/settings", "general.stale_if_error")
                .as_deref(),
            Some("0")
        );
    }

    #[tokio::test]
    async fn settings_read_treats_empty_host_as_unset() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/sid/version/2/settings",
            200,
            r#"{"general.default_ttl": 60, "general.default_host": "", "general.stale_if_error": true, "general.stale_if_error_ttl": 600}"#,
        );
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };
        let mut state = VclServiceState::default();

        SettingsHandler.read(target, &mut state).await.unwrap();

        assert_eq!(state.default_ttl, Value::Value(60));
        assert!(state.default_host.is_null());
        assert_eq!(state.stale_if_error, Value::Value(true));
    }

    #[test]
    fn schema_has_every_block() {
        let mut block = Block::default();
        for handler in VclService::handlers() {
            handler.register(&mut block);
        }
        assert_eq!(block.blocks.len(), 17);
        assert!(block.blocks.contains_key("dynamicsnippet"));
        assert!(block.attributes.contains_key("default_ttl"));
    }
}
