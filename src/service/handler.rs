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

use std::collections::BTreeMap;
use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tf_provider::schema::{Block, NestedBlock};
use tf_provider::value::{Value, ValueList};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{FastlyClient, FormParams};
use crate::utils::check_unique_keys;

use super::set_diff::SetDiff;

/// Service version being read or modified
#[derive(Debug, Clone, Copy)]
pub struct VersionRef<'a> {
    pub client: &'a FastlyClient,
    pub service_id: &'a str,
    pub version: i64,
}

/// Part of a service configuration, mapped to a subset of the service state `S`
#[async_trait]
pub trait ServiceAttributeHandler<S>: Send + Sync + Debug {
    /// Name of the attribute or block managed by the handler
    fn name(&self) -> &'static str;

    /// Add the attributes and blocks of the handler to the resource schema
    fn register(&self, block: &mut Block);

    /// Fill defaults of optional+computed attributes
    fn normalize(&self, state: &mut S);

    /// Carry over computed attributes from `prior`, or mark them unknown
    async fn plan(&self, diags: &mut Diagnostics, prior: &S, planned: &mut S) {
        _ = diags;
        _ = prior;
        _ = planned;
    }

    fn validate(&self, diags: &mut Diagnostics, state: &S);

    /// Check if applying `planned` over `prior` requires a new version
    fn has_change(&self, prior: &S, planned: &S) -> bool;

    /// Apply the changes from `prior` to `planned` on a draft version
    async fn process(&self, target: VersionRef<'_>, prior: &S, planned: &S) -> Result<()>;

    /// Flatten the remote configuration of `target` into `state`
    async fn read(&self, target: VersionRef<'_>, state: &mut S) -> Result<()>;

    /// Fill computed attributes once `state` has been applied
    async fn refresh(&self, target: VersionRef<'_>, state: &mut S) -> Result<()> {
        _ = target;
        _ = state;
        Ok(())
    }
}

/// Nested block type of a service, backed by a versioned API collection
#[async_trait]
pub trait ServiceBlock:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the Terraform block
    const NAME: &'static str;
    /// Path of the API collection below the service version
    const COLLECTION: &'static str;
    /// Whether the block has computed attributes to fill after apply
    const HAS_COMPUTED: bool = false;

    type Model: DeserializeOwned + Send;

    fn schema() -> Block;
    fn key(&self) -> &str;
    fn flatten(model: Self::Model) -> Self;
    fn params(&self) -> FormParams;

    fn normalize(&mut self) {}

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        _ = diags;
        _ = attr_path;
    }

    /// Checks spanning all the blocks of the set
    fn validate_set(blocks: &[&Self], diags: &mut Diagnostics, attr_path: AttributePath) {
        _ = blocks;
        _ = diags;
        _ = attr_path;
    }

    /// Copy computed attributes from `from`, or mark them unknown without it
    fn keep_computed(&mut self, from: Option<&Self>) {
        _ = from;
    }

    /// Copy attributes that only exist in the configuration
    fn keep_local(&mut self, current: &Self) {
        _ = current;
    }

    async fn list(target: VersionRef<'_>) -> Result<Vec<Self>> {
        let models: Vec<Self::Model> = target
            .client
            .list_versioned(target.service_id, target.version, Self::COLLECTION)
            .await?;
        Ok(models.into_iter().map(Self::flatten).collect())
    }

    async fn create(&self, target: VersionRef<'_>) -> Result<()> {
        target
            .client
            .create_versioned(
                target.service_id,
                target.version,
                Self::COLLECTION,
                self.params(),
            )
            .await?;
        Ok(())
    }

    /// Update the block, `prior` giving the name it is known by
    async fn update(&self, prior: &Self, target: VersionRef<'_>) -> Result<()> {
        target
            .client
            .update_versioned(
                target.service_id,
                target.version,
                Self::COLLECTION,
                prior.key(),
                self.params(),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, target: VersionRef<'_>) -> Result<()> {
        target
            .client
            .delete_versioned(
                target.service_id,
                target.version,
                Self::COLLECTION,
                self.key(),
            )
            .await
    }
}

pub type Blocks<B> = ValueList<Value<B>>;

/// Known blocks of a set
pub fn known<B>(blocks: &Blocks<B>) -> impl Iterator<Item = &B> {
    blocks.iter().flatten().flatten()
}

/// Handler of a set of `B` blocks stored in the state `S`
pub struct BlockSet<B, S> {
    get: fn(&S) -> &Blocks<B>,
    get_mut: fn(&mut S) -> &mut Blocks<B>,
}

impl<B, S> BlockSet<B, S> {
    pub fn new(get: fn(&S) -> &Blocks<B>, get_mut: fn(&mut S) -> &mut Blocks<B>) -> Self {
        Self { get, get_mut }
    }
}

impl<B: ServiceBlock, S> Debug for BlockSet<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSet").field("name", &B::NAME).finish()
    }
}

#[async_trait]
impl<B, S> ServiceAttributeHandler<S> for BlockSet<B, S>
where
    B: ServiceBlock,
    S: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        B::NAME
    }

    fn register(&self, block: &mut Block) {
        block
            .blocks
            .insert(B::NAME.to_owned(), NestedBlock::Set(B::schema()));
    }

    fn normalize(&self, state: &mut S) {
        for block in (self.get_mut)(state).iter_mut().flatten().flatten() {
            block.normalize();
        }
    }

    async fn plan(&self, _diags: &mut Diagnostics, prior: &S, planned: &mut S) {
        let prior = known((self.get)(prior))
            .map(|b| (b.key(), b))
            .collect::<BTreeMap<_, _>>();
        for block in (self.get_mut)(planned).iter_mut().flatten().flatten() {
            let from = prior.get(block.key()).copied();
            block.keep_computed(from);
        }
    }

    fn validate(&self, diags: &mut Diagnostics, state: &S) {
        let blocks = (self.get)(state);
        check_unique_keys(
            diags,
            AttributePath::new(B::NAME),
            known(blocks).map(B::key),
        );
        for block in known(blocks) {
            block.validate(diags, AttributePath::new(B::NAME));
        }
        B::validate_set(
            &known(blocks).collect::<Vec<_>>(),
            diags,
            AttributePath::new(B::NAME),
        );
    }

    fn has_change(&self, prior: &S, planned: &S) -> bool {
        !SetDiff::compute(known((self.get)(prior)), known((self.get)(planned)), |b| {
            b.key().to_owned()
        })
        .is_empty()
    }

    async fn process(&self, target: VersionRef<'_>, prior: &S, planned: &S) -> Result<()> {
        let diff = SetDiff::compute(known((self.get)(prior)), known((self.get)(planned)), |b| {
            b.key().to_owned()
        });

        for block in diff.deleted {
            tracing::debug!(block = B::NAME, name = block.key(), "Deleting block");
            block.delete(target).await?;
        }
        for block in diff.added {
            tracing::debug!(block = B::NAME, name = block.key(), "Creating block");
            block.create(target).await?;
        }
        for (old, new) in diff.modified {
            tracing::debug!(block = B::NAME, name = old.key(), "Updating block");
            new.update(old, target).await?;
        }
        Ok(())
    }

    async fn read(&self, target: VersionRef<'_>, state: &mut S) -> Result<()> {
        let mut remote = B::list(target).await?;

        let current = (self.get_mut)(state);
        {
            let local = known(current)
                .map(|b| (b.key(), b))
                .collect::<BTreeMap<_, _>>();
            for block in &mut remote {
                if let Some(local) = local.get(block.key()) {
                    block.keep_local(local);
                }
            }
        }
        remote.sort_by(|a, b| a.key().cmp(b.key()));
        *current = Value::Value(remote.into_iter().map(Value::Value).collect());
        Ok(())
    }

    async fn refresh(&self, target: VersionRef<'_>, state: &mut S) -> Result<()> {
        if !B::HAS_COMPUTED || known((self.get)(state)).next().is_none() {
            return Ok(());
        }
        let remote = B::list(target).await?;
        let remote = remote
            .iter()
            .map(|b| (b.key(), b))
            .collect::<BTreeMap<_, _>>();
        for block in (self.get_mut)(state).iter_mut().flatten().flatten() {
            if let Some(from) = remote.get(block.key()) {
                block.keep_computed(Some(from));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use reqwest::Method;
    use serde::{Deserialize, Serialize};
    use tf_provider::schema::Block;
    use tf_provider::value::{Value, ValueNumber, ValueString};

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Origin {
        name: ValueString<'static>,
        port: ValueNumber,
        id: ValueString<'static>,
    }

    #[derive(Debug, Deserialize)]
    struct OriginModel {
        name: String,
        port: i64,
        id: String,
    }

    fn origin(name: &str, port: i64) -> Origin {
        Origin {
            name: Value::Value(Cow::Owned(name.to_owned())),
            port: Value::Value(port),
            id: Value::Null,
        }
    }

    impl ServiceBlock for Origin {
        const NAME: &'static str = "origin";
        const COLLECTION: &'static str = "origin";
        const HAS_COMPUTED: bool = true;
        type Model = OriginModel;

        fn schema() -> Block {
            Block::default()
        }
        fn key(&self) -> &str {
            crate::utils::as_str(&self.name)
        }
        fn flatten(model: OriginModel) -> Self {
            Self {
                name: Value::Value(Cow::Owned(model.name)),
                port: Value::Value(model.port),
                id: Value::Value(Cow::Owned(model.id)),
            }
        }
        fn params(&self) -> FormParams {
            FormParams::new()
                .string("name", &self.name)
                .number("port", &self.port)
        }
        fn keep_computed(&mut self, from: Option<&Self>) {
            self.id = from.map_or(Value::Unknown, |from| from.id.clone());
        }
    }

    #[derive(Debug, Default)]
    struct State {
        origin: Blocks<Origin>,
    }

    fn handler() -> BlockSet<Origin, State> {
        BlockSet::new(|s| &s.origin, |s| &mut s.origin)
    }

    fn state(blocks: Vec<Origin>) -> State {
        State {
            origin: Value::Value(blocks.into_iter().map(Value::Value).collect()),
        }
    }

    #[tokio::test]
    async fn process_deletes_then_creates_then_updates() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };

        let prior = state(vec![origin("a", 80), origin("b", 80), origin("c", 80)]);
        let planned = state(vec![origin("b", 443), origin("c", 80), origin("d", 80)]);

        handler().process(target, &prior, &planned).await.unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "DELETE /service/sid/version/2/origin/a",
                "POST /service/sid/version/2/origin",
                "PUT /service/sid/version/2/origin/b",
            ]
        );
        assert_eq!(
            fake.form_value("PUT /service/sid/version/2/origin/b", "port")
                .as_deref(),
            Some("443")
        );
        assert!(handler().has_change(&prior, &planned));
        assert!(!handler().has_change(&prior, &prior));
    }

    #[tokio::test]
    async fn plan_carries_computed_ids_by_key() {
        let mut with_id = origin("a", 80);
        with_id.id = Value::Value(Cow::Borrowed("id-a"));
        let prior = state(vec![with_id]);
        let mut planned = state(vec![origin("a", 8080), origin("new", 80)]);

        handler()
            .plan(&mut Diagnostics::default(), &prior, &mut planned)
            .await;

        let ids = known(&planned.origin)
            .map(|b| b.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![ValueString::from("id-a"), Value::Unknown]);
    }

    #[tokio::test]
    async fn read_and_refresh_use_the_remote_collection() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/sid/version/3/origin",
            200,
            r#"[{"name":"z","port":80,"id":"id-z"},{"name":"a","port":443,"id":"id-a"}]"#,
        );
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 3,
        };

        let mut read = State::default();
        handler().read(target, &mut read).await.unwrap();
        let names = known(&read.origin).map(|b| b.key()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "z"]);

        let mut applied = state(vec![Origin {
            id: Value::Unknown,
            ..origin("a", 443)
        }]);
        handler().refresh(target, &mut applied).await.unwrap();
        assert_eq!(
            known(&applied.origin).next().map(|b| b.id.clone()),
            Some(ValueString::from("id-a"))
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut diags = Diagnostics::default();
        handler().validate(&mut diags, &state(vec![origin("a", 80), origin("a", 81)]));
        assert_eq!(diags.errors.len(), 1);
    }
}
