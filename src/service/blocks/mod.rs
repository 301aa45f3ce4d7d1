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

use std::collections::HashMap;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description};

use crate::utils::attribute;

mod acl;
mod backend;
mod cache_setting;
mod condition;
mod dictionary;
mod director;
mod domain;
mod gzip;
mod header;
mod healthcheck;
mod logging_https;
mod logging_syslog;
mod request_setting;
mod response_object;
mod snippet;
mod vcl;

pub use acl::AclBlock;
pub use backend::BackendBlock;
pub use cache_setting::CacheSettingBlock;
pub use condition::ConditionBlock;
pub use dictionary::DictionaryBlock;
pub use director::DirectorBlock;
pub use domain::DomainBlock;
pub use gzip::GzipBlock;
pub use header::HeaderBlock;
pub use healthcheck::HealthcheckBlock;
pub use logging_https::LoggingHttpsBlock;
pub use logging_syslog::LoggingSyslogBlock;
pub use request_setting::RequestSettingBlock;
pub use response_object::ResponseObjectBlock;
pub use snippet::{DynamicSnippetBlock, SnippetBlock};
pub use vcl::VclBlock;

pub(super) fn block(description: &str, attributes: HashMap<String, Attribute>) -> Block {
    Block {
        attributes,
        description: Description::plain(description),
        ..Default::default()
    }
}

pub(super) fn required(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Required, description)
}

pub(super) fn optional(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Optional, description)
}

/// Optional attribute whose value is filled by a default or by the API
pub(super) fn defaulted(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::OptionalComputed, description)
}

pub(super) fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Computed, description)
}

pub(super) fn name_attribute(what: &str) -> Attribute {
    required(
        AttributeType::String,
        &format!("Unique name of the {what} within the service"),
    )
}

pub(super) const CONDITION_DESCRIPTION: &str = "Name of the condition applied to this object";
