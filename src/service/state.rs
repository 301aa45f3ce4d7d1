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

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType, Block};
use tf_provider::value::{ValueBool, ValueNumber, ValueString};

use crate::utils::{attribute, WithNormalize};

pub const DEFAULT_COMMENT: &str = "Managed by Terraform";

/// Attributes shared by every service resource
#[derive(Debug)]
pub struct Common<'s> {
    pub id: &'s ValueString<'static>,
    pub name: &'s ValueString<'static>,
    pub comment: &'s ValueString<'static>,
    pub version_comment: &'s ValueString<'static>,
    pub activate: &'s ValueBool,
    pub force_destroy: &'s ValueBool,
    pub active_version: &'s ValueNumber,
    pub cloned_version: &'s ValueNumber,
}

#[derive(Debug)]
pub struct CommonMut<'s> {
    pub id: &'s mut ValueString<'static>,
    pub name: &'s mut ValueString<'static>,
    pub comment: &'s mut ValueString<'static>,
    pub version_comment: &'s mut ValueString<'static>,
    pub activate: &'s mut ValueBool,
    pub force_destroy: &'s mut ValueBool,
    pub active_version: &'s mut ValueNumber,
    pub cloned_version: &'s mut ValueNumber,
}

pub trait ServiceState:
    Debug
    + Default
    + Clone
    + PartialEq
    + Serialize
    + DeserializeOwned
    + WithNormalize
    + Send
    + Sync
    + 'static
{
    fn common(&self) -> Common<'_>;
    fn common_mut(&mut self) -> CommonMut<'_>;
}

impl Common<'_> {
    pub fn activate(&self) -> bool {
        self.activate.as_ref_option().copied().unwrap_or(true)
    }

    pub fn force_destroy(&self) -> bool {
        self.force_destroy.as_ref_option().copied().unwrap_or(false)
    }
}

/// Add the shared attributes to a service schema
pub fn register_common(block: &mut Block) {
    let attributes = [
        (
            "id",
            attribute(
                AttributeType::String,
                AttributeConstraint::Computed,
                "ID of the service",
            ),
        ),
        (
            "name",
            attribute(
                AttributeType::String,
                AttributeConstraint::Required,
                "Unique name of the service",
            ),
        ),
        (
            "comment",
            attribute(
                AttributeType::String,
                AttributeConstraint::OptionalComputed,
                "Description of the service (default \"Managed by Terraform\")",
            ),
        ),
        (
            "version_comment",
            attribute(
                AttributeType::String,
                AttributeConstraint::Optional,
                "Description of the service version",
            ),
        ),
        (
            "activate",
            attribute(
                AttributeType::Bool,
                AttributeConstraint::OptionalComputed,
                "Activate the new versions of the service (default true)",
            ),
        ),
        (
            "force_destroy",
            attribute(
                AttributeType::Bool,
                AttributeConstraint::OptionalComputed,
                "Deactivate the service before deleting it (default false)",
            ),
        ),
        (
            "active_version",
            attribute(
                AttributeType::Number,
                AttributeConstraint::Computed,
                "Currently active version of the service, 0 when none is",
            ),
        ),
        (
            "cloned_version",
            attribute(
                AttributeType::Number,
                AttributeConstraint::Computed,
                "Latest version modified by Terraform",
            ),
        ),
    ];
    block.attributes.extend(
        attributes
            .into_iter()
            .map(|(name, attr)| (name.to_owned(), attr)),
    );
}

/// Declare a service state: the shared attributes followed by the given fields
macro_rules! service_state {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($(#[$field_meta:meta])* pub $field:ident: $ty:ty,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub id: tf_provider::value::ValueString<'static>,
            pub name: tf_provider::value::ValueString<'static>,
            pub comment: tf_provider::value::ValueString<'static>,
            pub version_comment: tf_provider::value::ValueString<'static>,
            pub activate: tf_provider::value::ValueBool,
            pub force_destroy: tf_provider::value::ValueBool,
            pub active_version: tf_provider::value::ValueNumber,
            pub cloned_version: tf_provider::value::ValueNumber,
            $($(#[$field_meta])* pub $field: $ty,)*
        }

        impl $crate::service::state::ServiceState for $name {
            fn common(&self) -> $crate::service::state::Common<'_> {
                $crate::service::state::Common {
                    id: &self.id,
                    name: &self.name,
                    comment: &self.comment,
                    version_comment: &self.version_comment,
                    activate: &self.activate,
                    force_destroy: &self.force_destroy,
                    active_version: &self.active_version,
                    cloned_version: &self.cloned_version,
                }
            }

            fn common_mut(&mut self) -> $crate::service::state::CommonMut<'_> {
                $crate::service::state::CommonMut {
                    id: &mut self.id,
                    name: &mut self.name,
                    comment: &mut self.comment,
                    version_comment: &mut self.version_comment,
                    activate: &mut self.activate,
                    force_destroy: &mut self.force_destroy,
                    active_version: &mut self.active_version,
                    cloned_version: &mut self.cloned_version,
                }
            }
        }

        impl $crate::utils::WithNormalize for $name {
            fn normalize(&mut self, _diags: &mut tf_provider::Diagnostics) {
                $crate::utils::default_str(&mut self.comment, $crate::service::state::DEFAULT_COMMENT);
                $crate::utils::default_value(&mut self.activate, true);
                $crate::utils::default_value(&mut self.force_destroy, false);
            }
        }
    };
}

pub(crate) use service_state;
