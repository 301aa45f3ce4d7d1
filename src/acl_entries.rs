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
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{
    AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueList, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{is_not_found, AclEntry, AclEntryOp, ClientHandle, FastlyClient};
use crate::service::set_diff::SetDiff;
use crate::utils::{
    as_str, attribute, bool_value, check_unique_keys, configured_client, default_value,
    number_value, split_id, string_value, WithNormalize, WithSchema, WithValidate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclEntryBlock {
    pub id: ValueString<'static>,
    pub ip: ValueString<'static>,
    pub subnet: ValueNumber,
    pub negated: ValueBool,
    pub comment: ValueString<'static>,
}

impl AclEntryBlock {
    fn key(&self) -> String {
        match self.subnet {
            Value::Value(subnet) => format!("{}/{subnet}", as_str(&self.ip)),
            _ => as_str(&self.ip).to_owned(),
        }
    }

    fn flatten(entry: AclEntry) -> Self {
        Self {
            id: string_value(Some(entry.id)),
            ip: string_value(Some(entry.ip)),
            subnet: number_value(entry.subnet),
            negated: bool_value(entry.negated.or(Some(false))),
            comment: string_value(entry.comment),
        }
    }

    fn op(&self, op: &'static str, id: Option<String>) -> AclEntryOp {
        AclEntryOp {
            op,
            id,
            ip: self.ip.as_deref_option().map(str::to_owned),
            subnet: self.subnet.as_ref_option().copied(),
            negated: self.negated.as_ref_option().copied(),
            comment: self.comment.as_deref_option().map(str::to_owned),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclEntriesState {
    pub id: ValueString<'static>,
    pub service_id: ValueString<'static>,
    pub acl_id: ValueString<'static>,
    pub manage_entries: ValueBool,
    pub entry: ValueList<Value<AclEntryBlock>>,
}

impl AclEntriesState {
    fn entries(&self) -> impl Iterator<Item = &AclEntryBlock> {
        self.entry.iter().flatten().flatten()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut AclEntryBlock> {
        self.entry.iter_mut().flatten().flatten()
    }

    /// Set the ids of the entries from the remote ones, by key
    fn fill_ids(&mut self, remote: &[AclEntry]) {
        let ids = remote
            .iter()
            .map(|entry| (AclEntryBlock::flatten(entry.clone()).key(), entry.id.clone()))
            .collect::<HashMap<_, _>>();
        for entry in self.entries_mut() {
            entry.id = string_value(ids.get(&entry.key()).cloned());
        }
    }

    /// Keep the tracked entries of `self` or `prior` found in `remote`, as stored remotely
    fn track_remote(&mut self, prior: &AclEntriesState, remote: Vec<AclEntry>) {
        let mut remote = remote
            .into_iter()
            .map(|entry| {
                let entry = AclEntryBlock::flatten(entry);
                (entry.key(), entry)
            })
            .collect::<HashMap<_, _>>();
        let entries = self
            .entries()
            .chain(prior.entries())
            .map(AclEntryBlock::key)
            .filter_map(|key| remote.remove(&key))
            .map(Value::Value)
            .collect();
        self.entry = Value::Value(entries);
    }
}

impl WithSchema for AclEntriesState {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Entries of an ACL of a Fastly service"),
                attributes: map! {
                    "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "`service_id/acl_id`"),
                    "service_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the service"),
                    "acl_id" => attribute(AttributeType::String, AttributeConstraint::Required, "ID of the ACL"),
                    "manage_entries" => attribute(
                        AttributeType::Bool,
                        AttributeConstraint::OptionalComputed,
                        "Remove the entries added outside of Terraform (default false)",
                    ),
                },
                blocks: map! {
                    "entry" => NestedBlock::Set(Block {
                        description: Description::plain("ACL entry"),
                        attributes: map! {
                            "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "ID of the entry"),
                            "ip" => attribute(AttributeType::String, AttributeConstraint::Required, "IP address"),
                            "subnet" => attribute(AttributeType::Number, AttributeConstraint::Optional, "Prefix length of the subnet"),
                            "negated" => attribute(AttributeType::Bool, AttributeConstraint::OptionalComputed, "Exclude the addresses from the ACL (default false)"),
                            "comment" => attribute(AttributeType::String, AttributeConstraint::Optional, "Free form comment"),
                        },
                        ..Default::default()
                    }),
                },
                ..Default::default()
            },
        }
    }
}

impl WithNormalize for AclEntriesState {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_value(&mut self.manage_entries, false);
        for entry in self.entries_mut() {
            default_value(&mut entry.negated, false);
        }
    }
}

impl WithValidate for AclEntriesState {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let keys = self.entries().map(AclEntryBlock::key).collect::<Vec<_>>();
        check_unique_keys(
            diags,
            attr_path.clone().attribute("entry"),
            keys.iter().map(String::as_str),
        );
        for entry in self.entries() {
            if let Value::Value(subnet) = entry.subnet {
                if !(0..=128).contains(&subnet) {
                    diags.error(
                        format!("Invalid subnet {subnet} for `{}`", as_str(&entry.ip)),
                        "The prefix length must be between 0 and 128",
                        attr_path.clone().attribute("entry"),
                    );
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct AclEntriesResource {
    client: ClientHandle,
}

impl AclEntriesResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    /// Send the diff from `prior` to `state`, then refresh the entry ids
    ///
    /// When a batch fails, the entries of `state` are replaced by the ones
    /// actually stored, as earlier chunks may have been committed.
    async fn apply(
        client: &FastlyClient,
        prior: &AclEntriesState,
        state: &mut AclEntriesState,
    ) -> Result<()> {
        let service_id = as_str(&state.service_id).to_owned();
        let acl_id = as_str(&state.acl_id).to_owned();

        let ops = {
            let diff = SetDiff::compute(prior.entries(), state.entries(), AclEntryBlock::key);
            diff.deleted
                .iter()
                .map(|entry| AclEntryOp::delete(as_str(&entry.id)))
                .chain(diff.added.iter().map(|entry| entry.op("create", None)))
                .chain(diff.modified.iter().map(|(old, new)| {
                    new.op("update", old.id.as_deref_option().map(str::to_owned))
                }))
                .collect::<Vec<_>>()
        };
        let applied = if ops.is_empty() {
            Ok(())
        } else {
            tracing::debug!(%service_id, %acl_id, count = ops.len(), "Updating ACL entries");
            client.batch_acl_entries(&service_id, &acl_id, &ops).await
        };

        let remote = match client.list_acl_entries(&service_id, &acl_id).await {
            Ok(remote) => remote,
            Err(err) => {
                if applied.is_err() {
                    let entries = prior.entries().cloned().map(Value::Value).collect();
                    state.entry = Value::Value(entries);
                }
                return applied.and(Err(err));
            }
        };
        match applied {
            Ok(()) => {
                state.fill_ids(&remote);
                Ok(())
            }
            Err(err) => {
                state.track_remote(prior, remote);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Resource for AclEntriesResource {
    type State<'a> = AclEntriesState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AclEntriesState::schema())
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
            .list_acl_entries(as_str(&state.service_id), as_str(&state.acl_id))
            .await
        {
            Ok(remote) => remote,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(
                    id = as_str(&state.id),
                    "ACL not found, removing it from the state"
                );
                return None;
            }
            Err(err) => {
                diags.root_error("Failed to read the ACL entries", format!("{err:#}"));
                return Some((state, private_state));
            }
        };

        let mut state = state;
        if state.manage_entries == Value::Value(true) {
            let mut entries = remote
                .into_iter()
                .map(AclEntryBlock::flatten)
                .collect::<Vec<_>>();
            entries.sort_by_key(AclEntryBlock::key);
            state.entry = Value::Value(entries.into_iter().map(Value::Value).collect());
        } else {
            let remote = remote
                .into_iter()
                .map(|entry| {
                    let entry = AclEntryBlock::flatten(entry);
                    (entry.key(), entry)
                })
                .collect::<HashMap<_, _>>();
            if let Value::Value(entries) = &mut state.entry {
                entries.retain(|entry| match entry {
                    Value::Value(entry) => remote.contains_key(&entry.key()),
                    _ => false,
                });
                for entry in entries.iter_mut().flatten() {
                    if let Some(current) = remote.get(&entry.key()) {
                        *entry = current.clone();
                    }
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
        for entry in state.entries_mut() {
            entry.id = Value::Unknown;
        }
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
        if state.acl_id != prior_state.acl_id {
            replace.push(AttributePath::new("acl_id"));
        }

        let ids = prior_state
            .entries()
            .map(|entry| (entry.key(), entry.id.clone()))
            .collect::<HashMap<_, _>>();
        for entry in state.entries_mut() {
            entry.id = ids.get(&entry.key()).cloned().unwrap_or(Value::Unknown);
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
            as_str(&state.acl_id)
        )));

        if let Err(err) = Self::apply(&client, &AclEntriesState::default(), &mut state).await {
            diags.root_error("Failed to create the ACL entries", format!("{err:#}"));
            for entry in state.entries_mut() {
                if entry.id.is_unknown() {
                    entry.id = Value::Null;
                }
            }
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
            diags.root_error("Failed to update the ACL entries", format!("{err:#}"));
            if state.entries().any(|entry| entry.id.is_unknown()) {
                return Some((prior_state, planned_private_state));
            }
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
        let ops = prior_state
            .entries()
            .filter_map(|entry| entry.id.as_deref_option())
            .map(AclEntryOp::delete)
            .collect::<Vec<_>>();
        if ops.is_empty() {
            return Some(());
        }

        match client
            .batch_acl_entries(
                as_str(&prior_state.service_id),
                as_str(&prior_state.acl_id),
                &ops,
            )
            .await
        {
            Ok(()) => Some(()),
            Err(err) if is_not_found(&err) => Some(()),
            Err(err) => {
                diags.root_error("Failed to delete the ACL entries", format!("{err:#}"));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some((service_id, acl_id)) = split_id(&id) else {
            diags.root_error(
                format!("Invalid import id `{id}`"),
                "Expected `service_id/acl_id`",
            );
            return None;
        };
        let state = AclEntriesState {
            service_id: Value::Value(Cow::Owned(service_id.to_owned())),
            acl_id: Value::Value(Cow::Owned(acl_id.to_owned())),
            // pull every remote entry on the next read
            manage_entries: Value::Value(true),
            id: Value::Value(Cow::Owned(id.clone())),
            entry: Value::Value(Vec::new()),
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::client::testing::FakeTransport;

    fn entry(ip: &'static str, subnet: Option<i64>, comment: &'static str) -> Value<AclEntryBlock> {
        Value::Value(AclEntryBlock {
            id: Value::Null,
            ip: ValueString::from(ip),
            subnet: subnet.into(),
            negated: Value::Null,
            comment: ValueString::from(comment),
        })
    }

    fn config(entries: Vec<Value<AclEntryBlock>>) -> AclEntriesState {
        AclEntriesState {
            service_id: ValueString::from("sid"),
            acl_id: ValueString::from("aid"),
            entry: Value::Value(entries),
            ..Default::default()
        }
    }

    async fn resource(fake: &FakeTransport) -> AclEntriesResource {
        let handle = ClientHandle::default();
        handle.set(FastlyClient::new(fake.clone())).await;
        AclEntriesResource::new(handle)
    }

    const REMOTE: &str = r#"[
        {"id": "e1", "ip": "10.0.0.0", "subnet": 8, "negated": "0", "comment": "office"},
        {"id": "e2", "ip": "192.168.0.1", "negated": "1"}
    ]"#;

    #[tokio::test]
    async fn update_sends_a_single_batch() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/service/sid/acl/aid/entries", 200, REMOTE);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();

        let mut prior = config(vec![
            entry("10.0.0.0", Some(8), "old"),
            entry("172.16.0.1", None, "gone"),
        ]);
        prior.normalize(&mut diags);
        prior.id = ValueString::from("sid/aid");
        if let Value::Value(entries) = &mut prior.entry {
            entries[0].as_mut_option().unwrap().id = ValueString::from("e1");
            entries[1].as_mut_option().unwrap().id = ValueString::from("e0");
        }
        let proposed = config(vec![
            entry("10.0.0.0", Some(8), "office"),
            entry("192.168.0.1", None, ""),
        ]);

        let (planned, private, replace) = resource
            .plan_update(
                &mut diags,
                prior.clone(),
                proposed.clone(),
                proposed,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert!(replace.is_empty());
        let (state, _) = resource
            .update(
                &mut diags,
                prior,
                planned.clone(),
                planned,
                private,
                Default::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{diags:?}");
        let body = fake.json_body("PATCH /service/sid/acl/aid/entries").unwrap();
        let ops = body["entries"].as_array().unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], serde_json::json!({"op": "delete", "id": "e0"}));
        assert_eq!(ops[1]["op"], "create");
        assert_eq!(ops[1]["ip"], "192.168.0.1");
        assert_eq!(ops[2]["op"], "update");
        assert_eq!(ops[2]["id"], "e1");
        assert_eq!(ops[2]["comment"], "office");
        let ids = state.entries().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![ValueString::from("e1"), ValueString::from("e2")]);
    }

    #[tokio::test]
    async fn failed_chunk_keeps_the_committed_entries() {
        const PATH: &str = "/service/sid/acl/aid/entries";
        let fake = FakeTransport::default();
        fake.respond_once(Method::PATCH, PATH, 200, "{}");
        fake.respond(Method::PATCH, PATH, 500, r#"{"msg": "Internal error"}"#);
        let ip = |i: usize| format!("10.0.{}.{}", i / 256, i % 256);
        let committed = (0..1000)
            .map(|i| serde_json::json!({"id": format!("e{i}"), "ip": ip(i)}))
            .collect::<Vec<_>>();
        for page in committed.chunks(100) {
            fake.respond_once(Method::GET, PATH, 200, &serde_json::json!(page).to_string());
        }
        fake.respond_once(Method::GET, PATH, 200, "[]");
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();
        let proposed = config(
            (0..1001)
                .map(|i| {
                    Value::Value(AclEntryBlock {
                        id: Value::Null,
                        ip: Value::Value(Cow::Owned(ip(i))),
                        subnet: Value::Null,
                        negated: Value::Null,
                        comment: Value::Null,
                    })
                })
                .collect(),
        );

        let (planned, private) = resource
            .plan_create(&mut diags, proposed.clone(), proposed, Default::default())
            .await
            .unwrap();
        let (state, _) = resource
            .create(&mut diags, planned.clone(), planned, private, Default::default())
            .await
            .unwrap();

        assert_eq!(diags.errors.len(), 1);
        let patches = fake.paths().iter().filter(|p| p.starts_with("PATCH")).count();
        assert_eq!(patches, 2);
        assert_eq!(state.entries().count(), 1000);
        assert!(state.entries().all(|entry| entry.id.is_value()));
        assert!(!state.entries().any(|entry| as_str(&entry.ip) == "10.0.3.232"));
    }

    #[tokio::test]
    async fn unmanaged_read_only_refreshes_known_entries() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/service/sid/acl/aid/entries", 200, REMOTE);
        let resource = resource(&fake).await;
        let mut state = config(vec![
            entry("10.0.0.0", Some(8), "office"),
            entry("172.16.0.1", None, "deleted remotely"),
        ]);
        state.manage_entries = Value::Value(false);

        let (state, _) = resource
            .read(
                &mut Diagnostics::default(),
                state,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        let keys = state.entries().map(AclEntryBlock::key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["10.0.0.0/8"]);
        assert_eq!(state.entries().next().unwrap().id, ValueString::from("e1"));
    }

    #[tokio::test]
    async fn import_then_read_pulls_every_entry() {
        let fake = FakeTransport::default();
        fake.respond(Method::GET, "/service/sid/acl/aid/entries", 200, REMOTE);
        let resource = resource(&fake).await;
        let mut diags = Diagnostics::default();

        assert!(resource.import(&mut diags, "sid".to_owned()).await.is_none());
        let (state, private) = resource
            .import(&mut diags, "sid/aid".to_owned())
            .await
            .unwrap();
        let (state, _) = resource
            .read(&mut diags, state, private, Default::default())
            .await
            .unwrap();

        assert_eq!(diags.errors.len(), 1);
        let keys = state.entries().map(AclEntryBlock::key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["10.0.0.0/8", "192.168.0.1"]);
        assert_eq!(state.entries().nth(1).unwrap().negated, Value::Value(true));
    }

    #[tokio::test]
    async fn destroy_ignores_a_deleted_acl() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::PATCH,
            "/service/sid/acl/aid/entries",
            404,
            r#"{"msg": "Record not found"}"#,
        );
        let resource = resource(&fake).await;
        let mut state = config(vec![entry("10.0.0.0", Some(8), "")]);
        if let Value::Value(entries) = &mut state.entry {
            entries[0].as_mut_option().unwrap().id = ValueString::from("e1");
        }
        let mut diags = Diagnostics::default();

        let destroyed = resource
            .destroy(&mut diags, state, Default::default(), Default::default())
            .await;
        assert!(destroyed.is_some());
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn invalid_subnet_and_duplicates() {
        let state = config(vec![
            entry("10.0.0.0", Some(200), ""),
            entry("10.0.0.0", Some(200), ""),
        ]);
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::root());
        assert_eq!(diags.errors.len(), 3);
    }
}
