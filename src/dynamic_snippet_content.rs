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
use tf_provider::schema::{AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{is_not_found, ClientHandle};
use crate::utils::{
    as_str, attribute, configured_client, default_value, split_id, WithNormalize, WithSchema,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSnippetContentState {
    pub id: ValueString<'static>,
    pub service_id: ValueString<'static>,
    pub snippet_id: ValueString<'static>,
    pub content: ValueString<'static>,
    pub manage_snippets: ValueBool,
}

impl WithSchema for DynamicSnippetContentState {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Content of a dynamic VCL snippet"),
                attributes: map! {
                    "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "`service_id/snippet_id`"),
                    "service_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the service"),
                    "snippet_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the dynamic snippet"),
                    "content" => attribute(AttributeType::String, AttributeConstraint::Required, "VCL code of the snippet"),
                    "manage_snippets" => attribute(
                        AttributeType::Bool,
                        AttributeConstraint::OptionalComputed,
                        "Revert the changes made outside of Terraform (default false)",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl WithNormalize for DynamicSnippetContentState {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_value(&mut self.manage_snippets, false);
    }
}

#[derive(Debug, Default)]
pub struct DynamicSnippetContentResource {
    client: ClientHandle,
}

impl DynamicSnippetContentResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    async fn put(&self, diags: &mut Diagnostics, state: &DynamicSnippetContentState) -> Option<()> {
        let client = configured_client(&self.client, diags).await?;
        let service_id = as_str(&state.service_id);
        let snippet_id = as_str(&state.snippet_id);
        tracing::debug!(service_id, snippet_id, "Updating dynamic snippet content");
        match client
            .update_dynamic_snippet(service_id, snippet_id, as_str(&state.content))
            .await
        {
            Ok(_) => Some(()),
            Err(err) => {
                diags.error(
                    "Failed to update the snippet content",
                    format!("{err:#}"),
                    AttributePath::new("content"),
                );
                None
            }
        }
    }
}

#[async_trait]
impl Resource for DynamicSnippetContentResource {
    type State<'a> = DynamicSnippetContentState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(DynamicSnippetContentState::schema())
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
        let snippet = match client
            .get_dynamic_snippet(as_str(&state.service_id), as_str(&state.snippet_id))
            .await
        {
            Ok(snippet) => snippet,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(
                    id = as_str(&state.id),
                    "Snippet not found, removing it from the state"
                );
                return None;
            }
            Err(err) => {
                diags.root_error("Failed to read the snippet content", format!("{err:#}"));
                return Some((state, private_state));
            }
        };

        let mut state = state;
        if state.manage_snippets == Value::Value(true) {
            state.content = Value::Value(Cow::Owned(snippet.content.unwrap_or_default()));
        }
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

        let mut replace = Vec::new();
        if state.service_id != prior_state.service_id {
            replace.push(AttributePath::new("service_id"));
        }
        if state.snippet_id != prior_state.snippet_id {
            replace.push(AttributePath::new("snippet_id"));
        }
        Some((state, prior_private_state, replace))
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
        let mut state = planned_state;
        self.put(diags, &state).await?;
        state.id = Value::Value(Cow::Owned(format!(
            "{}/{}",
            as_str(&state.service_id),
            as_str(&state.snippet_id)
        )));
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
        if planned_state.content != prior_state.content
            && self.put(diags, &planned_state).await.is_none()
        {
            return Some((prior_state, planned_private_state));
        }
        Some((planned_state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = configured_client(&self.client, diags).await?;
        match client
            .update_dynamic_snippet(
                as_str(&prior_state.service_id),
                as_str(&prior_state.snippet_id),
                "",
            )
            .await
        {
            Ok(_) => Some(()),
            Err(err) if is_not_found(&err) => Some(()),
            Err(err) => {
                diags.root_error("Failed to reset the snippet content", format!("{err:#}"));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some((service_id, snippet_id)) = split_id(&id) else {
            diags.root_error(
                format!("Invalid import id `{id}`"),
                "Expected `service_id/snippet_id`",
            );
            return None;
        };
        let state = DynamicSnippetContentState {
            service_id: Value::Value(Cow::Owned(service_id.to_owned())),
            snippet_id: Value::Value(Cow::Owned(snippet_id.to_owned())),
            manage_snippets: Value::Value(true),
            content: Value::Null,
            id: Value::Value(Cow::Owned(id.clone())),
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

    const PATH: &str = "/service/sid/snippet/snip";

    fn state(content: &'static str, manage: bool) -> DynamicSnippetContentState {
        DynamicSnippetContentState {
            id: ValueString::from("sid/snip"),
            service_id: ValueString::from("sid"),
            snippet_id: ValueString::from("snip"),
            content: ValueString::from(content),
            manage_snippets: Value::Value(manage),
        }
    }

    async fn resource(fake: &FakeTransport) -> DynamicSnippetContentResource {
        let handle = ClientHandle::default();
        handle.set(FastlyClient::new(fake.clone())).await;
        DynamicSnippetContentResource::new(handle)
    }

    #[tokio::test]
    async fn create_puts_the_content() {
        let fake = FakeTransport::default();
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();
        let mut planned = state("if (req.http.X) { error 403; }", false);
        planned.id = Value::Unknown;

        let (created, _) = resource
            .create(&mut diags, planned.clone(), planned, Default::default(), Default::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(created.id, ValueString::from("sid/snip"));
        assert_eq!(
            fake.form_value(&format!("PUT {PATH}"), "content").as_deref(),
            Some("if (req.http.X) { error 403; }")
        );
    }

    #[tokio::test]
    async fn remote_content_is_only_read_when_managed() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, PATH, 200, r#"{"snippet_id": "snip", "content": "remote"}"#);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();

        let (unmanaged, _) = resource
            .read(&mut diags, state("local", false), Default::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(unmanaged.content, ValueString::from("local"));

        let (managed, _) = resource
            .read(&mut diags, state("local", true), Default::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(managed.content, ValueString::from("remote"));
    }

    #[tokio::test]
    async fn failed_update_keeps_the_prior_state() {
        let fake = FakeTransport::default();
        fake.respond(Method::PUT, PATH, 400, r#"{"msg": "Bad request", "detail": "VCL syntax"}"#);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();
        let prior = state("old", false);
        let planned = state("new", false);

        let (updated, _) = resource
            .update(
                &mut diags,
                prior.clone(),
                planned.clone(),
                planned,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated, prior);
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn destroy_resets_the_content() {
        let fake = FakeTransport::default();
        let resource = resource(&fake).await;

        let destroyed = resource
            .destroy(
                &mut Diagnostics::default(),
                state("code", false),
                Default::default(),
                Default::default(),
            )
            .await;
        assert!(destroyed.is_some());
        assert_eq!(
            fake.form_value(&format!("PUT {PATH}"), "content").as_deref(),
            Some("")
        );
    }
}
