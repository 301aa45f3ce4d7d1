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
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::{Value, ValueBool, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{lenient, FormParams};
use crate::service::handler::{ServiceBlock, VersionRef};
use crate::utils::{as_str, bool_value, default_value, raw_string_value, string_value};

use super::{block, defaulted, name_attribute, required};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VclBlock {
    pub name: ValueString<'static>,
    pub content: ValueString<'static>,
    pub main: ValueBool,
}

#[derive(Debug, Deserialize)]
pub struct VclModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    main: Option<bool>,
}

impl VclBlock {
    fn is_main(&self) -> bool {
        self.main == Value::Value(true)
    }

    async fn set_main(&self, target: VersionRef<'_>) -> Result<()> {
        if self.is_main() {
            target
                .client
                .set_main_vcl(target.service_id, target.version, self.key())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceBlock for VclBlock {
    const NAME: &'static str = "vcl";
    const COLLECTION: &'static str = "vcl";
    type Model = VclModel;

    fn schema() -> Block {
        block(
            "Custom VCL file uploaded to the service",
            map! {
                "name" => name_attribute("VCL file"),
                "content" => required(AttributeType::String, "VCL code"),
                "main" => defaulted(AttributeType::Bool, "Whether this file is the main VCL (default false)"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: VclModel) -> Self {
        Self {
            name: string_value(model.name),
            content: raw_string_value(model.content),
            main: bool_value(model.main),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("content", &self.content)
    }

    fn normalize(&mut self) {
        default_value(&mut self.main, false);
    }

    fn validate_set(blocks: &[&Self], diags: &mut Diagnostics, attr_path: AttributePath) {
        let main = blocks.iter().filter(|vcl| vcl.is_main()).count();
        if main > 1 {
            diags.error(
                format!("{main} VCL files are marked as main"),
                "At most one `vcl` block may have `main = true`",
                attr_path.attribute("main"),
            );
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
        self.set_main(target).await
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
        if !prior.is_main() {
            self.set_main(target).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    fn vcl(name: &'static str, main: bool) -> VclBlock {
        VclBlock {
            name: ValueString::from(name),
            content: ValueString::from("sub vcl_recv { }"),
            main: Value::Value(main),
        }
    }

    #[tokio::test]
    async fn main_vcl_is_set_after_create() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };

        vcl("main", true).create(target).await.unwrap();
        vcl("lib", false).create(target).await.unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "POST /service/sid/version/2/vcl",
                "PUT /service/sid/version/2/vcl/main/main",
                "POST /service/sid/version/2/vcl",
            ]
        );
    }

    #[tokio::test]
    async fn update_sets_main_only_when_it_changes() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 2,
        };

        vcl("a", true).update(&vcl("a", true), target).await.unwrap();
        vcl("b", true).update(&vcl("b", false), target).await.unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "PUT /service/sid/version/2/vcl/a",
                "PUT /service/sid/version/2/vcl/b",
                "PUT /service/sid/version/2/vcl/b/main",
            ]
        );
    }

    #[test]
    fn single_main_vcl() {
        let a = vcl("a", true);
        let b = vcl("b", true);
        let mut diags = Diagnostics::default();
        VclBlock::validate_set(&[&a, &b], &mut diags, AttributePath::new("vcl"));
        assert_eq!(diags.errors.len(), 1);
    }
}
