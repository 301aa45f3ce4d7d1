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
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeConstraint, AttributeType, Block, Description, NestedBlock};
use tf_provider::value::{self, Value, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::client::is_not_found;
use crate::utils::{as_str, attribute, string_value};

use super::blocks::{
    BackendBlock, DomainBlock, HealthcheckBlock, LoggingHttpsBlock, LoggingSyslogBlock,
};
use super::handler::{BlockSet, Blocks, ServiceAttributeHandler, ServiceBlock, VersionRef};
use super::hash_stream::read_package;
use super::state::service_state;
use super::ServiceDefinition;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageBlock {
    pub filename: ValueString<'static>,
    pub source_code_hash: ValueString<'static>,
    pub hashsum: ValueString<'static>,
}

service_state! {
    /// State of a `fastly_service_compute`
    pub struct ComputeServiceState {
        #[serde(with = "value::serde_as_vec")]
        pub package: Value<PackageBlock>,
        pub domain: Blocks<DomainBlock>,
        pub backend: Blocks<BackendBlock>,
        pub healthcheck: Blocks<HealthcheckBlock>,
        pub logging_syslog: Blocks<LoggingSyslogBlock>,
        pub logging_https: Blocks<LoggingHttpsBlock>,
    }
}

#[derive(Debug)]
pub struct ComputeService;

impl ServiceDefinition for ComputeService {
    const SERVICE_TYPE: &'static str = "wasm";
    const DESCRIPTION: &'static str = "Fastly Compute service running a WebAssembly package";

    type State = ComputeServiceState;

    fn handlers() -> Vec<Box<dyn ServiceAttributeHandler<ComputeServiceState>>> {
        let handlers: Vec<Box<dyn ServiceAttributeHandler<ComputeServiceState>>> = vec![
            set(|s| &s.domain, |s| &mut s.domain),
            set(|s| &s.healthcheck, |s| &mut s.healthcheck),
            set(|s| &s.backend, |s| &mut s.backend),
            set(|s| &s.logging_syslog, |s| &mut s.logging_syslog),
            set(|s| &s.logging_https, |s| &mut s.logging_https),
            Box::new(PackageHandler),
        ];
        handlers
    }
}

fn set<B: ServiceBlock>(
    get: fn(&ComputeServiceState) -> &Blocks<B>,
    get_mut: fn(&mut ComputeServiceState) -> &mut Blocks<B>,
) -> Box<dyn ServiceAttributeHandler<ComputeServiceState>> {
    Box::new(BlockSet::new(get, get_mut))
}

/// WebAssembly package of the service, uploaded from a local file
#[derive(Debug)]
struct PackageHandler;

fn uploaded_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}

#[async_trait]
impl ServiceAttributeHandler<ComputeServiceState> for PackageHandler {
    fn name(&self) -> &'static str {
        "package"
    }

    fn register(&self, block: &mut Block) {
        block.blocks.insert(
            "package".to_owned(),
            NestedBlock::Optional(Block {
                description: Description::plain("WebAssembly package deployed on the service"),
                attributes: map! {
                    "filename" => attribute(
                        AttributeType::String,
                        AttributeConstraint::Required,
                        "Path of the package archive",
                    ),
                    "source_code_hash" => attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "SHA-512 of the package in hex, computed from the file when not set",
                    ),
                    "hashsum" => attribute(
                        AttributeType::String,
                        AttributeConstraint::Computed,
                        "Hash of the package reported by Fastly",
                    ),
                },
                ..Default::default()
            }),
        );
    }

    fn normalize(&self, _state: &mut ComputeServiceState) {}

    async fn plan(
        &self,
        diags: &mut Diagnostics,
        prior: &ComputeServiceState,
        planned: &mut ComputeServiceState,
    ) {
        let Value::Value(package) = &mut planned.package else {
            return;
        };
        let prior = prior.package.as_ref_option();

        if let Value::Value(filename) = &package.filename {
            // a hash equal to the prior one was not set by the configuration
            let inherited = package.source_code_hash.is_null()
                || prior.is_some_and(|prior| prior.source_code_hash == package.source_code_hash);
            if inherited {
                match read_package(filename).await {
                    Ok((_, hash)) => package.source_code_hash = Value::Value(Cow::Owned(hash)),
                    Err(err) => diags.error(
                        "Failed to hash the package",
                        format!("{err:#}"),
                        AttributePath::new("package").index(0).attribute("filename"),
                    ),
                }
            }
        } else if package.source_code_hash.is_null() {
            package.source_code_hash = Value::Unknown;
        }

        package.hashsum = match prior {
            Some(prior)
                if prior.filename == package.filename
                    && prior.source_code_hash == package.source_code_hash =>
            {
                prior.hashsum.clone()
            }
            _ => Value::Unknown,
        };
    }

    fn validate(&self, diags: &mut Diagnostics, state: &ComputeServiceState) {
        if let Value::Value(package) = &state.package {
            if let Value::Value(hash) = &package.source_code_hash {
                if hash.len() != 128 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                    diags.error(
                        "Invalid `source_code_hash`",
                        "Expected the SHA-512 of the package in hex",
                        AttributePath::new("package")
                            .index(0)
                            .attribute("source_code_hash"),
                    );
                }
            }
        }
    }

    fn has_change(&self, prior: &ComputeServiceState, planned: &ComputeServiceState) -> bool {
        match (&prior.package, &planned.package) {
            (Value::Value(prior), Value::Value(planned)) => {
                prior.filename != planned.filename
                    || prior.source_code_hash != planned.source_code_hash
            }
            (prior, planned) => prior.is_value() != planned.is_value(),
        }
    }

    async fn process(
        &self,
        target: VersionRef<'_>,
        prior: &ComputeServiceState,
        planned: &ComputeServiceState,
    ) -> Result<()> {
        if !self.has_change(prior, planned) {
            return Ok(());
        }
        let Value::Value(package) = &planned.package else {
            return Ok(());
        };
        let filename = as_str(&package.filename);
        let (content, hash) = read_package(filename).await?;
        tracing::info!(
            service_id = target.service_id,
            version = target.version,
            size = content.len(),
            %hash,
            "Uploading package"
        );
        target
            .client
            .upload_package(
                target.service_id,
                target.version,
                uploaded_name(filename),
                content,
            )
            .await?;
        Ok(())
    }

    async fn read(&self, target: VersionRef<'_>, state: &mut ComputeServiceState) -> Result<()> {
        let Value::Value(package) = &mut state.package else {
            return Ok(());
        };
        package.hashsum = match target
            .client
            .get_package(target.service_id, target.version)
            .await
        {
            Ok(remote) => string_value(remote.metadata.hashsum),
            Err(err) if is_not_found(&err) => Value::Null,
            Err(err) => return Err(err),
        };
        Ok(())
    }

    async fn refresh(&self, target: VersionRef<'_>, state: &mut ComputeServiceState) -> Result<()> {
        if state
            .package
            .as_ref_option()
            .is_some_and(|package| package.hashsum.is_unknown())
        {
            self.read(target, state).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use reqwest::Method;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::{FastlyClient, RequestBody};

    fn package_file(content: &[u8]) -> (NamedTempFile, String) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        let name = file.path().to_string_lossy().into_owned();
        (file, name)
    }

    fn with_package(filename: &str) -> ComputeServiceState {
        ComputeServiceState {
            package: Value::Value(PackageBlock {
                filename: Value::Value(Cow::Owned(filename.to_owned())),
                source_code_hash: Value::Null,
                hashsum: Value::Null,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn plan_hashes_the_package() {
        let (_path, filename) = package_file(b"wasm");
        let mut planned = with_package(&filename);
        let mut diags = Diagnostics::default();

        PackageHandler
            .plan(&mut diags, &ComputeServiceState::default(), &mut planned)
            .await;

        assert!(diags.errors.is_empty());
        let package = planned.package.as_ref_option().unwrap();
        assert_eq!(as_str(&package.source_code_hash).len(), 128);
        assert!(package.hashsum.is_unknown());
        PackageHandler.validate(&mut diags, &planned);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn changed_file_is_detected() {
        let (_path, filename) = package_file(b"v1");
        let mut prior = with_package(&filename);
        PackageHandler
            .plan(&mut Diagnostics::default(), &ComputeServiceState::default(), &mut prior)
            .await;
        if let Value::Value(package) = &mut prior.package {
            package.hashsum = ValueString::from("remote");
        }

        // proposed state inherits the prior hash
        let mut unchanged = prior.clone();
        PackageHandler
            .plan(&mut Diagnostics::default(), &prior, &mut unchanged)
            .await;
        assert!(!PackageHandler.has_change(&prior, &unchanged));
        assert_eq!(unchanged, prior);

        std::fs::write(&filename, b"v2").unwrap();
        let mut changed = prior.clone();
        PackageHandler
            .plan(&mut Diagnostics::default(), &prior, &mut changed)
            .await;
        assert!(PackageHandler.has_change(&prior, &changed));
        assert!(changed.package.as_ref_option().unwrap().hashsum.is_unknown());
    }

    #[tokio::test]
    async fn package_is_uploaded_as_multipart() {
        let (_path, filename) = package_file(b"wasm");
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/sid/version/1/package",
            200,
            r#"{"id": "pkg", "metadata": {"hashsum": "abc"}}"#,
        );
        let client = FastlyClient::new(fake.clone());
        let target = VersionRef {
            client: &client,
            service_id: "sid",
            version: 1,
        };
        let mut planned = with_package(&filename);
        PackageHandler
            .plan(&mut Diagnostics::default(), &ComputeServiceState::default(), &mut planned)
            .await;

        PackageHandler
            .process(target, &ComputeServiceState::default(), &planned)
            .await
            .unwrap();
        PackageHandler.refresh(target, &mut planned).await.unwrap();

        let upload = &fake.requests()[0];
        assert_eq!(upload.path(), "/service/sid/version/1/package");
        match &upload.body {
            RequestBody::Multipart {
                field,
                filename: uploaded,
                content,
            } => {
                assert_eq!(field, "package");
                assert_eq!(uploaded, uploaded_name(&filename));
                assert_eq!(content, b"wasm");
            }
            body => panic!("unexpected body {body:?}"),
        }
        assert_eq!(
            planned.package.as_ref_option().unwrap().hashsum,
            ValueString::from("abc")
        );
    }

    #[test]
    fn uploaded_name_strips_directories() {
        assert_eq!(uploaded_name("pkg/app.tar.gz"), "app.tar.gz");
        assert_eq!(uploaded_name("app.tar.gz"), "app.tar.gz");
    }
}
