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
use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueMap, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{is_not_found, ClientHandle, DictionaryItem, DictionaryItemOp, FastlyClient};
use crate::service::set_diff::MapDiff;
use crate::utils::{
    as_str, attribute, configured_client, default_value, split_id, WithNormalize, WithSchema,
    WithValidate,
};

type Items = ValueMap<'static, ValueString<'static>>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryItemsState {
    pub id: ValueString<'static>,
    pub service_id: ValueString<'static>,
    pub dictionary_id: ValueString<'static>,
    pub manage_items: ValueBool,
    pub items: Items,
}

impl DictionaryItemsState {
    /// Known `(key, value)` pairs
    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .flatten()
            .filter_map(|(k, v)| Some((k.as_ref(), v.as_deref_option()?)))
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().flatten().map(|(k, _)| k.as_ref())
    }

    /// Keep the keys tracked by `self` or `prior` that exist in `remote`, with their remote values
    fn track_remote(&mut self, prior: &DictionaryItemsState, remote: Vec<DictionaryItem>) {
        let remote = remote
            .into_iter()
            .map(|item| (item.item_key, item.item_value))
            .collect::<HashMap<_, _>>();
        let items = self
            .keys()
            .chain(prior.keys())
            .filter_map(|key| {
                let value = remote.get(key)?;
                Some((Cow::Owned(key.to_owned()), Value::Value(Cow::Owned(value.clone()))))
            })
            .collect::<BTreeMap<_, _>>();
        self.items = Value::Value(items);
    }
}

impl WithSchema for DictionaryItemsState {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Items of a dictionary of a Fastly service"),
                attributes: map! {
                    "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "`service_id/dictionary_id`"),
                    "service_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the service"),
                    "dictionary_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the dictionary"),
                    "manage_items" => attribute(
                        AttributeType::Bool,
                        AttributeConstraint::OptionalComputed,
                        "Remove the items added outside of Terraform (default false)",
                    ),
                    "items" => attribute(
                        AttributeType::Map(AttributeType::String.into()),
                        AttributeConstraint::Optional,
                        "Items of the dictionary",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl WithNormalize for DictionaryItemsState {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_value(&mut self.manage_items, false);
    }
}

impl WithValidate for DictionaryItemsState {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for key in self.items.iter().flatten().map(|(k, _)| k) {
            if key.is_empty() || key.len() > 256 {
                diags.error(
                    format!("Invalid item key `{key}`"),
                    "Dictionary keys must have between 1 and 256 characters",
                    attr_path.clone().attribute("items"),
                );
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DictionaryItemsResource {
    client: ClientHandle,
}

impl DictionaryItemsResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    /// Send the diff from `prior` to `state`
    ///
    /// When a batch fails, the items of `state` are replaced by the ones
    /// actually stored, as earlier chunks may have been committed.
    async fn apply(
        client: &FastlyClient,
        prior: &DictionaryItemsState,
        state: &mut DictionaryItemsState,
    ) -> Result<()> {
        let ops = {
            let diff = MapDiff::compute(prior.pairs(), state.pairs());
            diff.deleted
                .iter()
                .map(|&k| DictionaryItemOp::delete(k))
                .chain(diff.added.iter().map(|&(k, v)| DictionaryItemOp::create(k, v)))
                .chain(diff.modified.iter().map(|&(k, v)| DictionaryItemOp::update(k, v)))
                .collect::<Vec<_>>()
        };
        if ops.is_empty() {
            return Ok(());
        }

        let service_id = as_str(&state.service_id).to_owned();
        let dictionary_id = as_str(&state.dictionary_id).to_owned();
        tracing::debug!(
            %service_id,
            %dictionary_id,
            count = ops.len(),
            "Updating dictionary items"
        );
        let Err(err) = client
            .batch_dictionary_items(&service_id, &dictionary_id, &ops)
            .await
        else {
            return Ok(());
        };

        match client.list_dictionary_items(&service_id, &dictionary_id).await {
            Ok(remote) => state.track_remote(prior, remote),
            Err(list_err) => {
                tracing::warn!(
                    %dictionary_id,
                    "Failed to list the items after a failed batch: {list_err:#}"
                );
                state.items = Value::Value(
                    prior
                        .items
                        .iter()
                        .flatten()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                );
            }
        }
        Err(err)
    }
}

#[async_trait]
impl Resource for DictionaryItemsResource {
    type State<'a> = DictionaryItemsState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(DictionaryItemsState::schema())
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
        let remote = match client
            .list_dictionary_items(as_str(&state.service_id), as_str(&state.dictionary_id))
            .await
        {
            Ok(remote) => remote
                .into_iter()
                .map(|item| (item.item_key, item.item_value))
                .collect::<HashMap<_, _>>(),
            Err(err) if is_not_found(&err) => {
                tracing::warn!(
                    id = as_str(&state.id),
                    "Dictionary not found, removing it from the state"
                );
                return None;
            }
            Err(err) => {
                diags.root_error("Failed to read the dictionary items", format!("{err:#}"));
                return Some((state, private_state));
            }
        };

        let mut state = state;
        if state.manage_items == Value::Value(true) {
            state.items = Value::Value(
                remote
                    .into_iter()
                    .map(|(k, v)| (Cow::Owned(k), Value::Value(Cow::Owned(v))))
                    .collect(),
            );
        } else if let Value::Value(items) = &mut state.items {
            items.retain(|k, _| remote.contains_key(k.as_ref()));
            for (k, v) in items.iter_mut() {
                if let Some(value) = remote.get(k.as_ref()) {
                    *v = Value::Value(Cow::Owned(value.clone()));
                }
            }
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
        if state.dictionary_id != prior_state.dictionary_id {
            replace.push(AttributePath::new("dictionary_id"));
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
        let client = configured_client(&self.client, diags).await?;
        let mut state = planned_state;
        state.id = Value::Value(Cow::Owned(format!(
            "{}/{}",
            as_str(&state.service_id),
            as_str(&state.dictionary_id)
        )));

        if let Err(err) = Self::apply(&client, &DictionaryItemsState::default(), &mut state).await {
            diags.root_error("Failed to create the dictionary items", format!("{err:#}"));
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
        if let Err(err) = Self::apply(&client, &prior_state, &mut state).await {
            diags.root_error("Failed to update the dictionary items", format!("{err:#}"));
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
        let mut empty = DictionaryItemsState {
            service_id: prior_state.service_id.clone(),
            dictionary_id: prior_state.dictionary_id.clone(),
            ..Default::default()
        };
        match Self::apply(&client, &prior_state, &mut empty).await {
            Ok(()) => Some(()),
            Err(err) if is_not_found(&err) => Some(()),
            Err(err) => {
                diags.root_error("Failed to delete the dictionary items", format!("{err:#}"));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some((service_id, dictionary_id)) = split_id(&id) else {
            diags.root_error(
                format!("Invalid import id `{id}`"),
                "Expected `service_id/dictionary_id`",
            );
            return None;
        };
        let state = DictionaryItemsState {
            service_id: Value::Value(Cow::Owned(service_id.to_owned())),
            dictionary_id: Value::Value(Cow::Owned(dictionary_id.to_owned())),
            manage_items: Value::Value(true),
            items: Value::Value(BTreeMap::new()),
            id: Value::Value(Cow::Owned(id.clone())),
        };
        Some((state, Default::default()))
    }
}
