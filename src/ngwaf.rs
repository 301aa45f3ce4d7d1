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

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{
    AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{self, Value, ValueBool, ValueEmpty, ValueList, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{is_not_found, AttackSignalThresholds, ClientHandle, Workspace};
use crate::utils::{
    as_str, attribute, bool_value, check_one_of, configured_client, default_value, number_value,
    string_value, WithNormalize, WithSchema, WithValidate,
};

const DEFAULT_BLOCKING_RESPONSE_CODE: i64 = 406;
const DEFAULT_THRESHOLD: i64 = 10000;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsBlock {
    pub one_minute: ValueNumber,
    pub ten_minutes: ValueNumber,
    pub one_hour: ValueNumber,
    pub immediate: ValueBool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub id: ValueString<'static>,
    pub name: ValueString<'static>,
    pub description: ValueString<'static>,
    pub mode: ValueString<'static>,
    pub ip_anonymization: ValueString<'static>,
    pub client_ip_headers: ValueList<ValueString<'static>>,
    pub default_blocking_response_code: ValueNumber,
    #[serde(with = "value::serde_as_vec")]
    pub attack_signal_thresholds: Value<ThresholdsBlock>,
}

impl WorkspaceState {
    fn to_workspace(&self) -> Workspace {
        Workspace {
            id: String::new(),
            name: as_str(&self.name).to_owned(),
            description: as_str(&self.description).to_owned(),
            mode: as_str(&self.mode).to_owned(),
            ip_anonymization: self.ip_anonymization.as_deref_option().map(str::to_owned),
            client_ip_headers: self.client_ip_headers.as_ref_option().map(|headers| {
                headers
                    .iter()
                    .filter_map(|h| h.as_deref_option())
                    .map(str::to_owned)
                    .collect()
            }),
            default_blocking_response_code: self
                .default_blocking_response_code
                .as_ref_option()
                .copied(),
            attack_signal_thresholds: self.attack_signal_thresholds.as_ref_option().map(
                |thresholds| AttackSignalThresholds {
                    one_minute: thresholds.one_minute.as_ref_option().copied(),
                    ten_minutes: thresholds.ten_minutes.as_ref_option().copied(),
                    one_hour: thresholds.one_hour.as_ref_option().copied(),
                    immediate: thresholds.immediate.as_ref_option().copied(),
                },
            ),
        }
    }

    /// Overwrite the state with a workspace returned by the API
    fn flatten(&mut self, workspace: Workspace) {
        self.id = string_value(Some(workspace.id));
        self.name = string_value(Some(workspace.name));
        self.description = string_value(Some(workspace.description));
        self.mode = string_value(Some(workspace.mode));
        self.ip_anonymization = string_value(workspace.ip_anonymization);
        self.client_ip_headers = match workspace.client_ip_headers {
            Some(headers) if !headers.is_empty() => Value::Value(
                headers
                    .into_iter()
                    .map(|h| Value::Value(Cow::Owned(h)))
                    .collect(),
            ),
            _ => Value::Null,
        };
        self.default_blocking_response_code =
            number_value(workspace.default_blocking_response_code);
        // only refresh thresholds declared by the configuration
        if let (Value::Value(block), Some(remote)) = (
            &mut self.attack_signal_thresholds,
            workspace.attack_signal_thresholds,
        ) {
            block.one_minute = number_value(remote.one_minute);
            block.ten_minutes = number_value(remote.ten_minutes);
            block.one_hour = number_value(remote.one_hour);
            block.immediate = bool_value(remote.immediate);
        }
    }
}

impl WithSchema for WorkspaceState {
    fn schema() -> Schema {
        let threshold = |description| {
            attribute(
                AttributeType::Number,
                AttributeConstraint::OptionalComputed,
                description,
            )
        };
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Next-Gen WAF workspace"),
                attributes: map! {
                    "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "ID of the workspace"),
                    "name" => attribute(AttributeType::String, AttributeConstraint::Required, "Name of the workspace"),
                    "description" => attribute(AttributeType::String, AttributeConstraint::Required, "Description of the workspace"),
                    "mode" => attribute(AttributeType::String, AttributeConstraint::Required, "Blocking mode: `block`, `log` or `off`"),
                    "ip_anonymization" => attribute(AttributeType::String, AttributeConstraint::Optional, "Anonymize the client IPs: `hashed`"),
                    "client_ip_headers" => attribute(
                        AttributeType::List(AttributeType::String.into()),
                        AttributeConstraint::Optional,
                        "Headers holding the client IP, in order of precedence",
                    ),
                    "default_blocking_response_code" => attribute(
                        AttributeType::Number,
                        AttributeConstraint::OptionalComputed,
                        "Status code of blocked requests (default 406)",
                    ),
                },
                blocks: map! {
                    "attack_signal_thresholds" => NestedBlock::Optional(Block {
                        description: Description::plain("Number of attack signals triggering a block"),
                        attributes: map! {
                            "one_minute" => threshold("Threshold over one minute (default 10000)"),
                            "ten_minutes" => threshold("Threshold over ten minutes (default 10000)"),
                            "one_hour" => threshold("Threshold over one hour (default 10000)"),
                            "immediate" => attribute(
                                AttributeType::Bool,
                                AttributeConstraint::OptionalComputed,
                                "Block on the first attack signal (default false)",
                            ),
                        },
                        ..Default::default()
                    }),
                },
                ..Default::default()
            },
        }
    }
}

impl WithNormalize for WorkspaceState {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_value(
            &mut self.default_blocking_response_code,
            DEFAULT_BLOCKING_RESPONSE_CODE,
        );
        if let Value::Value(thresholds) = &mut self.attack_signal_thresholds {
            default_value(&mut thresholds.one_minute, DEFAULT_THRESHOLD);
            default_value(&mut thresholds.ten_minutes, DEFAULT_THRESHOLD);
            default_value(&mut thresholds.one_hour, DEFAULT_THRESHOLD);
            default_value(&mut thresholds.immediate, false);
        }
    }
}

impl WithValidate for WorkspaceState {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_one_of(
            diags,
            attr_path.clone().attribute("mode"),
            &self.mode,
            &["block", "log", "off"],
        );
        check_one_of(
            diags,
            attr_path.clone().attribute("ip_anonymization"),
            &self.ip_anonymization,
            &["hashed"],
        );
        if let Value::Value(code) = self.default_blocking_response_code {
            if !matches!(code, 301 | 302 | 400..=599) {
                diags.error(
                    format!("Invalid response code {code}"),
                    "Expected 301, 302 or a code between 400 and 599",
                    attr_path.clone().attribute("default_blocking_response_code"),
                );
            }
        }
        if let Value::Value(thresholds) = &self.attack_signal_thresholds {
            let path = attr_path.attribute("attack_signal_thresholds").index(0);
            for (name, value) in [
                ("one_minute", thresholds.one_minute),
                ("ten_minutes", thresholds.ten_minutes),
                ("one_hour", thresholds.one_hour),
            ] {
                if let Value::Value(value) = value {
                    if value < 1 {
                        diags.error(
                            format!("Invalid threshold {value}"),
                            "Thresholds must be positive",
                            path.clone().attribute(name),
                        );
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkspaceResource {
    client: ClientHandle,
}

impl WorkspaceResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for WorkspaceResource {
    type State<'a> = WorkspaceState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(WorkspaceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, AttributePath::root());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some(client) = configured_client(&self.client, diags).await else {
            return Some((state, private_state));
        };
        let id = as_str(&state.id);
        match client.get_workspace(id).await {
            Ok(workspace) => {
                let mut state = state;
                state.flatten(workspace);
                Some((state, private_state))
            }
            Err(err) if is_not_found(&err) => {
                tracing::warn!(id, "Workspace not found, removing it from the state");
                None
            }
            Err(err) => {
                diags.root_error(
                    format!("Failed to read workspace {id}"),
                    format!("{err:#}"),
                );
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        state.id = Value::Unknown;
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        state.id = prior_state.id;
        Some((state, prior_private_state, vec![]))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = configured_client(&self.client, diags).await?;
        match client.create_workspace(&planned_state.to_workspace()).await {
            Ok(workspace) => {
                tracing::info!(id = %workspace.id, "Created NGWAF workspace");
                let mut state = planned_state;
                state.id = Value::Value(Cow::Owned(workspace.id));
                Some((state, planned_private_state))
            }
            Err(err) => {
                diags.root_error("Failed to create the workspace", format!("{err:#}"));
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some(client) = configured_client(&self.client, diags).await else {
            return Some((prior_state, planned_private_state));
        };
        match client
            .update_workspace(as_str(&prior_state.id), &planned_state.to_workspace())
            .await
        {
            Ok(_) => Some((planned_state, planned_private_state)),
            Err(err) => {
                diags.root_error("Failed to update the workspace", format!("{err:#}"));
                Some((prior_state, planned_private_state))
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = configured_client(&self.client, diags).await?;
        let id = as_str(&prior_state.id);
        match client.delete_workspace(id).await {
            Ok(()) => {
                tracing::info!(id, "Deleted NGWAF workspace");
                Some(())
            }
            Err(err) if is_not_found(&err) => {
                tracing::warn!(id, "Workspace already deleted");
                Some(())
            }
            Err(err) => {
                diags.root_error(format!("Failed to delete workspace {id}"), format!("{err:#}"));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = WorkspaceState {
            id: Value::Value(Cow::Owned(id)),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    const REMOTE: &str = r#"{
        "id": "ws1",
        "name": "prod",
        "description": "Production",
        "mode": "block",
        "ip_anonymization": "",
        "client_ip_headers": ["Fastly-Client-IP"],
        "default_blocking_response_code": 403,
        "attack_signal_thresholds": {"one_minute": 100, "ten_minutes": 500, "one_hour": 1000, "immediate": true}
    }"#;

    fn config() -> WorkspaceState {
        WorkspaceState {
            name: ValueString::from("prod"),
            description: ValueString::from("Production"),
            mode: ValueString::from("log"),
            attack_signal_thresholds: Value::Value(ThresholdsBlock {
                one_minute: Value::Value(100),
                ten_minutes: Value::Null,
                one_hour: Value::Null,
                immediate: Value::Null,
            }),
            ..Default::default()
        }
    }

    async fn resource(fake: &FakeTransport) -> WorkspaceResource {
        let handle = ClientHandle::default();
        handle.set(FastlyClient::new(fake.clone())).await;
        WorkspaceResource::new(handle)
    }

    #[tokio::test]
    async fn create_sends_the_defaults() {
        let fake = FakeTransport::default();
        fake.respond(Method::POST, "/ngwaf/v1/workspaces", 200, REMOTE);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();

        let (planned, private) = resource
            .plan_create(&mut diags, config(), config(), Default::default())
            .await
            .unwrap();
        assert!(planned.id.is_unknown());
        let (state, _) = resource
            .create(&mut diags, planned.clone(), config(), private, Default::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.id, ValueString::from("ws1"));
        assert_eq!(state.mode, planned.mode);
        assert_eq!(
            fake.json_body("POST /ngwaf/v1/workspaces").unwrap(),
            serde_json::json!({
                "name": "prod",
                "description": "Production",
                "mode": "log",
                "default_blocking_response_code": 406,
                "attack_signal_thresholds": {
                    "one_minute": 100,
                    "ten_minutes": 10000,
                    "one_hour": 10000,
                    "immediate": false,
                },
            })
        );
    }

    #[tokio::test]
    async fn read_flattens_the_workspace() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/ngwaf/v1/workspaces/ws1", 200, REMOTE);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();

        let (imported, private) = resource
            .import(&mut diags, "ws1".to_owned())
            .await
            .unwrap();
        let (state, _) = resource
            .read(&mut diags, imported, private, Default::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.mode, ValueString::from("block"));
        assert_eq!(state.ip_anonymization, Value::Null);
        assert_eq!(
            state.client_ip_headers,
            Value::Value(vec![ValueString::from("Fastly-Client-IP")])
        );
        assert_eq!(state.default_blocking_response_code, Value::Value(403));
        assert!(state.attack_signal_thresholds.is_null());

        let mut with_thresholds = config();
        with_thresholds.id = ValueString::from("ws1");
        let (state, _) = resource
            .read(&mut diags, with_thresholds, Default::default(), Default::default())
            .await
            .unwrap();
        let thresholds = state.attack_signal_thresholds.as_ref_option().unwrap();
        assert_eq!(thresholds.one_hour, Value::Value(1000));
        assert_eq!(thresholds.immediate, Value::Value(true));
    }

    #[tokio::test]
    async fn deleted_workspace_leaves_the_state() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/ngwaf/v1/workspaces/ws1", 404, r#"{"msg": "not found"}"#);
        fake.respond(Method::DELETE, "/ngwaf/v1/workspaces/ws1", 404, r#"{"msg": "not found"}"#);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();
        let mut state = config();
        state.id = ValueString::from("ws1");

        let read = resource
            .read(&mut diags, state.clone(), Default::default(), Default::default())
            .await;
        assert!(read.is_none());
        let destroyed = resource
            .destroy(&mut diags, state, Default::default(), Default::default())
            .await;
        assert!(destroyed.is_some());
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn validate_rejects_unknown_modes() {
        let mut state = config();
        state.mode = ValueString::from("monitor");
        state.ip_anonymization = ValueString::from("hashed");
        state.default_blocking_response_code = Value::Value(200);
        let mut diags = Diagnostics::default();

        state.validate(&mut diags, AttributePath::root());
        assert_eq!(diags.errors.len(), 2);
        assert_eq!(diags.errors[0].detail, "Expected one of: block, log, off");
    }
}
