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

use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block};
use tf_provider::value::ValueString;

use crate::client::FormParams;
use crate::service::handler::ServiceBlock;
use crate::utils::{as_str, string_value};

use super::{block, name_attribute, optional};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBlock {
    pub name: ValueString<'static>,
    pub comment: ValueString<'static>,
}

#[derive(Debug, Deserialize)]
pub struct DomainModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl ServiceBlock for DomainBlock {
    const NAME: &'static str = "domain";
    const COLLECTION: &'static str = "domain";
    type Model = DomainModel;

    fn schema() -> Block {
        block(
            "Domain name the service responds to",
            map! {
                "name" => name_attribute("domain"),
                "comment" => optional(AttributeType::String, "Free form comment"),
            },
        )
    }

    fn key(&self) -> &str {
        as_str(&self.name)
    }

    fn flatten(model: DomainModel) -> Self {
        Self {
            name: string_value(model.name),
            comment: string_value(model.comment),
        }
    }

    fn params(&self) -> FormParams {
        FormParams::new()
            .string("name", &self.name)
            .string("comment", &self.comment)
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn empty_comment_is_null() {
        let model: DomainModel =
            serde_json::from_str(r#"{"name": "example.com", "comment": "", "version": 3}"#)
                .unwrap();
        let domain = DomainBlock::flatten(model);

        assert_eq!(domain.key(), "example.com");
        assert_eq!(domain.comment, Value::Null);
        assert_eq!(
            domain.params().0,
            vec![("name".to_owned(), "example.com".to_owned())]
        );
    }
}
