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
use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::{ServiceBlock, VersionRef};
use crate::utils::{as_str, default_value, number_value, string_value};

use super::{block, defaulted, name_attribute, optional, required};

/// Director types of the API: 1 random, 3 hash, 4 client
const DIRECTOR_TYPES: &[i64] = &[1, 3, 4];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorBlock {
    pub name: ValueString<'static>,
    pub backends: ValueList<ValueString<'static>>,
    #[serde(rename = "type")]
    pub director_type: ValueNumber,
    pub quorum: ValueNumber,
    pub retries: ValueNumber,
    pub shield: ValueString<'static>,
    pub comment: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct DirectorModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    backends: Vec<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt_i64")]
    director_type: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    quorum: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    retries: Option<i64>,
    #[serde(default)]
    shield: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl DirectorBlock {
    fn backend_names(&self) -> BTreeSet<&str> {
        self.backends
            .iter()
            .flatten()
            .filter_map(|b| b.as_deref_option())
            .collect()
    }

    /// Link and unlink backends so the director uses exactly `self.backends`
    async fn sync_backends(&self, linked: BTreeSet<&str>, target: VersionRef<'_>) -> Result<()> {
        let wanted = self.backend_names();
        let name = self.key();

        for backend in linked.difference(&wanted) {
            target
                .client
                .remove_director_backend(target.service_id, target.version, name, backend)
                .await?;
        }
        for backend in wanted.difference(&linked) {
            target
                .client
                .add_director_backend(target.service_id, target.version, name, backend)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceBlock for DirectorBlock {
    const NAME: &'static str = "director";
    const COLLECTION: &'static str = "director";
    type Model = DirectorModel;

    fn schema() -> Block {
        block(
            "Group of backends with a load balancing policy",
            map! {
                "name" => name_attribute("director"),
                "backends" => required(AttributeType::Set(Box::new(AttributeType::String)), "Names of the backends of the director"),
                "type" => defaulted(AttributeType::Number, "Load balancing policy: 1 random, 3 hash, 4 client (default 1)"),
                "quorum" => defaulted(AttributeType::Number, "Percentage of healthy backends for the director to be up (default 75)"),
                "retries" => defaulted(AttributeType::Number, "Number of backends tried on failure (default 5)"),
                "shield" => optional(AttributeType::String, "POP used as shield"),
                "comment" => optional(AttributeType::String, "Free form comment"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: DirectorModel) -> Self {
        let mut backends = model.backends;
        backends.sort();
        Self {
            name: string_value(model.name),
            backends: Value::Value(
                backends
                    .into_iter()
                    .map(|b| Value::Value(Cow::Owned(b)))
                    .collect(),
            ),
            director_type: number_value(model.director_type),
            quorum: number_value(model.quorum),
            retries: number_value(model.retries),
            shield: string_value(model.shield),
            comment: string_value(model.comment),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .number("type", &self.director_type)
            .number("quorum", &self.quorum)
            .number("retries", &self.retries)
            .string("shield", &self.shield)
            .string("comment", &self.comment)
    }

    fn normalize(&mut self) {
        default_value(&mut self.director_type, 1);
        default_value(&mut self.quorum, 75);
        default_value(&mut self.retries, 5);
        if let Value::Value(backends) = &mut self.backends {
            backends.sort();
            backends.dedup();
        }
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(director_type) = self.director_type {
            if !DIRECTOR_TYPES.contains(&director_type) {
                diags.error(
                    format!("Invalid director type {director_type}"),
                    "Expected one of: 1 (random), 3 (hash), 4 (client)",
                    attr_path.clone().attribute("type"),
                );
            }
        }
        if let Value::Value(quorum) = self.quorum {
            if !(0..=100).contains(&quorum) {
                diags.error(
                    format!("Invalid quorum {quorum}"),
                    "The quorum is a percentage between 0 and 100",
                    attr_path.attribute("quorum"),
                );
            }
        }
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
        self.sync_backends(BTreeSet::new(), target).await
    }

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
        self.sync_backends(prior.backend_names(), target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    fn director(backends: &[&'static str]) -> DirectorBlock {
        let mut director = DirectorBlock {
            name: ValueString::from("pool"),
            backends: Value::Value(backends.iter().map(|b| ValueString::from(*b)).collect()),
            director_type: Value::Null,
            quorum: Value::Null,
            retries: Value::Null,
            shield: Value::Null,
            comment: Value::Null,
        };
        director.normalize();
        director
    }

    #[tokio::test]
    async fn create_links_every_backend() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };

        director(&["b", "a"]).create(target).await.unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "POST /service/sid/version/2/director",
                "POST /service/sid/version/2/director/pool/backend/a",
                "POST /service/sid/version/2/director/pool/backend/b",
            ]
        );
        assert_eq!(
            fake.form_value("POST /service/sid/version/2/director", "quorum")
                .as_deref(),
            Some("75")
        );
    }

    #[tokio::test]
    async fn update_links_only_the_difference() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };

        director(&["b", "c"])
            .update(&director(&["a", "b"]), target)
            .await
            .unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "PUT /service/sid/version/2/director/pool",
                "DELETE /service/sid/version/2/director/pool/backend/a",
                "POST /service/sid/version/2/director/pool/backend/c",
            ]
        );
    }

    #[test]
    fn flatten_sorts_backends() {
        let director = DirectorBlock::flatten(
            serde_json::from_str(
                r#"{"name": "pool", "backends": ["z", "a"], "type": 3, "quorum": "50", "retries": 2}"#,
            )
            .unwrap(),
        );
        assert_eq!(director.backend_names().into_iter().collect::<Vec<_>>(), vec!["a", "z"]);
        assert_eq!(director.director_type, Value::Value(3));
    }
}
