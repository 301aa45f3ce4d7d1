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

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{is_not_found, FastlyClient};
use crate::utils::{as_str, raw_string_value, string_value};

use super::handler::VersionRef;
use super::state::ServiceState;
use super::{ServiceDefinition, ServiceResource};

impl<D: ServiceDefinition> ServiceResource<D> {
    /// Refresh `state` from the remote service
    ///
    /// Returns `None` when the service does not exist anymore.
    pub(super) async fn read_service(
        &self,
        diags: &mut Diagnostics,
        client: &FastlyClient,
        mut state: D::State,
    ) -> Option<D::State> {
        let service_id = as_str(state.common().id).to_owned();
        let details = match client.get_service_details(&service_id).await {
            Ok(details) if details.deleted_at.is_none() => details,
            Ok(_) => {
                tracing::warn!(%service_id, "Service has been deleted outside of Terraform");
                return None;
            }
            Err(err) if is_not_found(&err) => {
                tracing::warn!(%service_id, "Service not found, removing it from the state");
                return None;
            }
            Err(err) => {
                diags.root_error(
                    format!("Failed to read service {service_id}"),
                    format!("{err:#}"),
                );
                return Some(state);
            }
        };

        let activate = state.common().activate();
        let active = details.active_version();
        let cloned = state
            .common()
            .cloned_version
            .as_ref_option()
            .copied()
            .unwrap_or_default();
        let version = if activate && active > 0 {
            active
        } else if cloned > 0 {
            cloned
        } else {
            details.latest_version()
        };

        let common = state.common_mut();
        *common.name = string_value(details.name.clone());
        *common.comment = raw_string_value(details.comment.clone());
        *common.active_version = Value::Value(active);
        if cloned == 0 {
            *common.cloned_version = Value::Value(version);
        }
        if common.version_comment.is_value() {
            let comment = details
                .versions
                .iter()
                .find(|v| v.number() == version)
                .and_then(|v| v.comment.clone());
            *common.version_comment = string_value(comment);
        }

        if version == 0 {
            return Some(state);
        }
        let target = VersionRef {
            client,
            service_id: &service_id,
            version,
        };
        self.read_handlers(diags, target, &mut state).await;
        Some(state)
    }

    /// Flatten every handler of the version `target` into `state`
    pub(super) async fn read_handlers(
        &self,
        diags: &mut Diagnostics,
        target: VersionRef<'_>,
        state: &mut D::State,
    ) {
        for handler in &self.handlers {
            if let Err(err) = handler.read(target, state).await {
                diags.error(
                    format!("Failed to read `{}`", handler.name()),
                    format!("{err:#}"),
                    AttributePath::new(handler.name()),
                );
            }
        }
    }
}
