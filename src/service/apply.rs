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

use crate::utils::DisplayJoinable;

use super::handler::VersionRef;
use super::state::ServiceState;
use super::{ServiceDefinition, ServiceResource};

impl<D: ServiceDefinition> ServiceResource<D> {
    /// Apply `state` over `prior` on the draft version `target`, then validate and activate it
    ///
    /// Returns `None` when a step failed, the error being reported in `diags`.
    pub(super) async fn apply_version(
        &self,
        diags: &mut Diagnostics,
        target: VersionRef<'_>,
        prior: &D::State,
        state: &mut D::State,
    ) -> Option<()> {
        for handler in &self.handlers {
            if let Err(err) = handler.process(target, prior, state).await {
                diags.error(
                    format!("Failed to apply `{}`", handler.name()),
                    format!("{err:#}"),
                    AttributePath::new(handler.name()),
                );
                return None;
            }
        }

        if let Value::Value(comment) = state.common().version_comment {
            if let Err(err) = target
                .client
                .update_version_comment(target.service_id, target.version, comment)
                .await
            {
                diags.error(
                    "Failed to set the version comment",
                    format!("{err:#}"),
                    AttributePath::new("version_comment"),
                );
                return None;
            }
        }

        let validation = match target
            .client
            .validate_version(target.service_id, target.version)
            .await
        {
            Ok(validation) => validation,
            Err(err) => {
                diags.root_error(
                    format!("Failed to validate version {}", target.version),
                    format!("{err:#}"),
                );
                return None;
            }
        };
        for warning in &validation.warnings {
            diags.root_warning(
                format!("Version {} has warnings", target.version),
                warning.clone(),
            );
        }
        if !validation.is_ok() {
            diags.root_error(
                format!("Version {} is invalid", target.version),
                validation
                    .msg
                    .iter()
                    .chain(&validation.errors)
                    .join_with("\n")
                    .to_string(),
            );
            return None;
        }

        if state.common().activate() {
            if let Err(err) = target
                .client
                .activate_version(target.service_id, target.version)
                .await
            {
                diags.error(
                    format!("Failed to activate version {}", target.version),
                    format!("{err:#}"),
                    AttributePath::new("activate"),
                );
                return None;
            }
            *state.common_mut().active_version = Value::Value(target.version);
        }

        for handler in &self.handlers {
            if let Err(err) = handler.refresh(target, state).await {
                diags.error(
                    format!("Failed to refresh `{}`", handler.name()),
                    format!("{err:#}"),
                    AttributePath::new(handler.name()),
                );
                return None;
            }
        }
        Some(())
    }

    /// Replace the planned values of a failed apply with what the draft version holds
    pub(super) async fn recover(
        &self,
        diags: &mut Diagnostics,
        target: VersionRef<'_>,
        active_version: i64,
        state: &mut D::State,
    ) {
        let common = state.common_mut();
        if common.active_version.is_unknown() {
            *common.active_version = Value::Value(active_version);
        }
        self.read_handlers(diags, target, state).await;
    }
}
