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
use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{is_not_found, ClientHandle};
use crate::utils::{as_str, configured_client, WithNormalize};

use super::handler::{ServiceAttributeHandler, VersionRef};
use super::state::{register_common, ServiceState};
use super::ServiceDefinition;

/// Fastly service, its configuration being spread over the handlers of `D`
#[derive(Debug)]
pub struct ServiceResource<D: ServiceDefinition> {
    pub(super) client: ClientHandle,
    pub(super) handlers: Vec<Box<dyn ServiceAttributeHandler<D::State>>>,
}

impl<D: ServiceDefinition> ServiceResource<D> {
    pub fn new(client: ClientHandle) -> Self {
        Self {
            client,
            handlers: D::handlers(),
        }
    }

    fn normalize(&self, diags: &mut Diagnostics, state: &mut D::State) {
        state.normalize(diags);
        for handler in &self.handlers {
            handler.normalize(state);
        }
    }

    async fn plan(&self, diags: &mut Diagnostics, prior: &D::State, state: &mut D::State) {
        self.normalize(diags, state);
        for handler in &self.handlers {
            handler.plan(diags, prior, state).await;
        }
    }
}

fn known_version(version: &Value<i64>) -> i64 {
    version.as_ref_option().copied().unwrap_or_default()
}

/// Version the prior state was read from, and new versions are cloned from
fn base_version<S: ServiceState>(prior: &S) -> i64 {
    let common = prior.common();
    let active = known_version(common.active_version);
    let cloned = known_version(common.cloned_version);
    if (!common.activate() && cloned > 0) || active == 0 {
        cloned
    } else {
        active
    }
}

#[async_trait]
impl<D: ServiceDefinition> Resource for ServiceResource<D> {
    type State<'a> = D::State;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let mut block = Block {
            version: 1,
            description: Description::plain(D::DESCRIPTION),
            ..Default::default()
        };
        register_common(&mut block);
        for handler in &self.handlers {
            handler.register(&mut block);
        }
        Some(Schema { version: 1, block })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        let mut config = config;
        self.normalize(diags, &mut config);
        for handler in &self.handlers {
            handler.validate(diags, &config);
        }

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
        let state = self.read_service(diags, &client, state).await?;
        Some((state, private_state))
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        self.plan(diags, &D::State::default(), &mut state).await;

        let activate = state.common().activate();
        let common = state.common_mut();
        *common.id = Value::Unknown;
        *common.cloned_version = Value::Unknown;
        *common.active_version = if activate {
            Value::Unknown
        } else {
            Value::Value(0)
        };

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
        self.plan(diags, &prior_state, &mut state).await;

        let prior = prior_state.common();
        let new_version = state.common().version_comment != prior.version_comment
            || self
                .handlers
                .iter()
                .any(|handler| handler.has_change(&prior_state, &state));
        let activate = state.common().activate();
        // a draft left inactive gets activated without cloning
        let pending_draft = activate
            && !prior.activate()
            && known_version(prior.active_version) != known_version(prior.cloned_version);

        let common = state.common_mut();
        *common.active_version = *prior.active_version;
        *common.cloned_version = *prior.cloned_version;
        if new_version {
            *common.cloned_version = Value::Unknown;
        }
        if (new_version && activate) || pending_draft {
            *common.active_version = Value::Unknown;
        }

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
        let mut state = planned_state;

        let service = match client
            .create_service(
                as_str(state.common().name),
                as_str(state.common().comment),
                D::SERVICE_TYPE,
            )
            .await
        {
            Ok(service) => service,
            Err(err) => {
                diags.root_error("Failed to create the service", format!("{err:#}"));
                return None;
            }
        };
        let version = service
            .versions
            .iter()
            .map(|v| v.number())
            .max()
            .or(service.version)
            .filter(|&v| v > 0)
            .unwrap_or(1);
        tracing::info!(service_id = %service.id, version, "Created Fastly service");

        let common = state.common_mut();
        *common.id = Value::Value(Cow::Owned(service.id.clone()));
        *common.cloned_version = Value::Value(version);

        let target = VersionRef {
            client: &client,
            service_id: &service.id,
            version,
        };
        if self
            .apply_version(diags, target, &D::State::default(), &mut state)
            .await
            .is_none()
        {
            self.recover(diags, target, 0, &mut state).await;
        }

        Some((state, planned_private_state))
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
        let mut state = planned_state;
        let prior = prior_state.common();
        let service_id = as_str(prior.id).to_owned();
        let active = known_version(prior.active_version);

        if state.common().name != prior.name || state.common().comment != prior.comment {
            if let Err(err) = client
                .update_service(
                    &service_id,
                    as_str(state.common().name),
                    as_str(state.common().comment),
                )
                .await
            {
                diags.root_error("Failed to update the service", format!("{err:#}"));
                return Some((prior_state, planned_private_state));
            }
        }

        if state.common().cloned_version.is_unknown() {
            let base = base_version(&prior_state);
            let version = match client.clone_version(&service_id, base).await {
                Ok(version) => version.number(),
                Err(err) => {
                    diags.root_error(
                        format!("Failed to clone version {base}"),
                        format!("{err:#}"),
                    );
                    let mut current = prior_state.clone();
                    let common = current.common_mut();
                    *common.name = state.common().name.clone();
                    *common.comment = state.common().comment.clone();
                    return Some((current, planned_private_state));
                }
            };
            *state.common_mut().cloned_version = Value::Value(version);

            let target = VersionRef {
                client: &client,
                service_id: &service_id,
                version,
            };
            if self
                .apply_version(diags, target, &prior_state, &mut state)
                .await
                .is_none()
            {
                self.recover(diags, target, active, &mut state).await;
            }
        } else if state.common().active_version.is_unknown() {
            let version = known_version(prior.cloned_version);
            *state.common_mut().active_version = match client
                .activate_version(&service_id, version)
                .await
            {
                Ok(()) => Value::Value(version),
                Err(err) => {
                    diags.error(
                        format!("Failed to activate version {version}"),
                        format!("{err:#}"),
                        AttributePath::new("activate"),
                    );
                    Value::Value(active)
                }
            };
        }

        Some((state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = configured_client(&self.client, diags).await?;
        let common = prior_state.common();
        let service_id = as_str(common.id);
        let active = known_version(common.active_version);

        if common.force_destroy() && active > 0 {
            if let Err(err) = client.deactivate_version(service_id, active).await {
                if !is_not_found(&err) {
                    diags.root_error("Failed to deactivate the service", format!("{err:#}"));
                    return None;
                }
            }
        }

        match client.delete_service(service_id).await {
            Ok(()) => Some(()),
            Err(err) if is_not_found(&err) => {
                tracing::warn!(service_id, "Service already deleted");
                Some(())
            }
            Err(err) => {
                diags.root_error("Failed to delete the service", format!("{err:#}"));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = D::State::default();
        let common = state.common_mut();
        *common.id = Value::Value(Cow::Owned(id));
        *common.activate = Value::Value(true);
        *common.force_destroy = Value::Value(false);

        Some((state, Default::default()))
    }
}
