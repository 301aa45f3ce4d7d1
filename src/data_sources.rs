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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueList, ValueNumber, ValueString};
use tf_provider::{DataSource, Diagnostics};

use crate::client::ClientHandle;
use crate::utils::{
    attribute, configured_client, number_value, raw_string_value, string_value, WithSchema,
};

fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Computed, description)
}

fn string_list(values: Vec<String>) -> ValueList<ValueString<'static>> {
    Value::Value(
        values
            .into_iter()
            .map(|value| Value::Value(Cow::Owned(value)))
            .collect(),
    )
}

fn computed_schema(description: &str, attributes: HashMap<String, Attribute>) -> Schema {
    Schema {
        version: 1,
        block: Block {
            version: 1,
            description: Description::plain(description),
            attributes,
            ..Default::default()
        },
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpRangesState {
    pub cidr_blocks: ValueList<ValueString<'static>>,
    pub ipv6_cidr_blocks: ValueList<ValueString<'static>>,
}

impl WithSchema for IpRangesState {
    fn schema() -> Schema {
        computed_schema(
            "IP ranges of the Fastly network",
            map! {
                "cidr_blocks" => computed(AttributeType::List(AttributeType::String.into()), "IPv4 ranges"),
                "ipv6_cidr_blocks" => computed(AttributeType::List(AttributeType::String.into()), "IPv6 ranges"),
            },
        )
    }
}

#[derive(Debug, Default)]
pub struct IpRangesDataSource {
    client: ClientHandle,
}

impl IpRangesDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for IpRangesDataSource {
    type State<'a> = IpRangesState;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(IpRangesState::schema())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        _config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = configured_client(&self.client, diags).await?;
        match client.public_ip_list().await {
            Ok(list) => Some(IpRangesState {
                cidr_blocks: string_list(list.addresses),
                ipv6_cidr_blocks: string_list(list.ipv6_addresses),
            }),
            Err(err) => {
                diags.root_error("Failed to read the IP ranges", format!("{err:#}"));
                None
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pop {
    pub code: ValueString<'static>,
    pub name: ValueString<'static>,
    pub group: ValueString<'static>,
    pub shield: ValueString<'static>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatacentersState {
    pub pops: ValueList<Value<Pop>>,
}

impl WithSchema for DatacentersState {
    fn schema() -> Schema {
        computed_schema(
            "Points of presence of the Fastly network",
            map! {
                "pops" => computed(
                    AttributeType::AttributeList(map! {
                        "code" => computed(AttributeType::String, "Code of the POP"),
                        "name" => computed(AttributeType::String, "Name of the POP"),
                        "group" => computed(AttributeType::String, "Region of the POP"),
                        "shield" => computed(AttributeType::String, "Shield code of the POP"),
                    }),
                    "List of POPs",
                ),
            },
        )
    }
}

#[derive(Debug, Default)]
pub struct DatacentersDataSource {
    client: ClientHandle,
}

impl DatacentersDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for DatacentersDataSource {
    type State<'a> = DatacentersState;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(DatacentersState::schema())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        _config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = configured_client(&self.client, diags).await?;
        let mut datacenters = match client.datacenters().await {
            Ok(datacenters) => datacenters,
            Err(err) => {
                diags.root_error("Failed to read the datacenters", format!("{err:#}"));
                return None;
            }
        };
        datacenters.sort_by(|a, b| a.code.cmp(&b.code));

        let pops = datacenters
            .into_iter()
            .map(|dc| {
                Value::Value(Pop {
                    code: string_value(Some(dc.code)),
                    name: string_value(Some(dc.name)),
                    group: string_value(Some(dc.group)),
                    shield: string_value(dc.shield),
                })
            })
            .collect();
        Some(DatacentersState {
            pops: Value::Value(pops),
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub id: ValueString<'static>,
    pub name: ValueString<'static>,
    #[serde(rename = "type")]
    pub service_type: ValueString<'static>,
    pub comment: ValueString<'static>,
    pub version: ValueNumber,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesState {
    pub ids: ValueList<ValueString<'static>>,
    pub details: ValueList<Value<ServiceDetails>>,
}

impl WithSchema for ServicesState {
    fn schema() -> Schema {
        computed_schema(
            "Services of the Fastly account",
            map! {
                "ids" => computed(AttributeType::List(AttributeType::String.into()), "IDs of the services"),
                "details" => computed(
                    AttributeType::AttributeList(map! {
                        "id" => computed(AttributeType::String, "ID of the service"),
                        "name" => computed(AttributeType::String, "Name of the service"),
                        "type" => computed(AttributeType::String, "Type of the service: `vcl` or `wasm`"),
                        "comment" => computed(AttributeType::String, "Description of the service"),
                        "version" => computed(AttributeType::Number, "Active version of the service"),
                    }),
                    "Details of the services",
                ),
            },
        )
    }
}

#[derive(Debug, Default)]
pub struct ServicesDataSource {
    client: ClientHandle,
}

impl ServicesDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for ServicesDataSource {
    type State<'a> = ServicesState;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ServicesState::schema())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        _config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = configured_client(&self.client, diags).await?;
        let mut services = match client.list_services().await {
            Ok(services) => services,
            Err(err) => {
                diags.root_error("Failed to list the services", format!("{err:#}"));
                return None;
            }
        };
        services.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::debug!(count = services.len(), "Listed Fastly services");

        let ids = services.iter().map(|s| s.id.clone()).collect();
        let details = services
            .into_iter()
            .map(|service| {
                Value::Value(ServiceDetails {
                    id: string_value(Some(service.id)),
                    name: string_value(service.name),
                    service_type: string_value(service.service_type),
                    comment: raw_string_value(service.comment),
                    version: number_value(service.version),
                })
            })
            .collect();
        Some(ServicesState {
            ids: string_list(ids),
            details: Value::Value(details),
        })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::client::FastlyClient;

    async fn handle(fake: &FakeTransport) -> ClientHandle {
        let handle = ClientHandle::default();
        handle.set(FastlyClient::new(fake.clone())).await;
        handle
    }

    #[tokio::test]
    async fn ip_ranges() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/public-ip-list",
            200,
            r#"{"addresses": ["23.235.32.0/20"], "ipv6_addresses": ["2a04:4e40::/32"]}"#,
        );
        let source = IpRangesDataSource::new(handle(&fake).await);

        let state = source
            .read(&mut Diagnostics::default(), Default::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(state.cidr_blocks, string_list(vec!["23.235.32.0/20".to_owned()]));
        assert_eq!(state.ipv6_cidr_blocks, string_list(vec!["2a04:4e40::/32".to_owned()]));
    }

    #[tokio::test]
    async fn datacenters_are_sorted_by_code() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/datacenters",
            200,
            r#"[
                {"code": "LHR", "name": "London", "group": "Europe", "shield": "london-uk"},
                {"code": "AMS", "name": "Amsterdam", "group": "Europe"}
            ]"#,
        );
        let source = DatacentersDataSource::new(handle(&fake).await);

        let state = source
            .read(&mut Diagnostics::default(), Default::default(), Default::default())
            .await
            .unwrap();
        let pops = state.pops.unwrap_or_default();
        assert_eq!(pops.len(), 2);
        let ams = pops[0].as_ref_option().unwrap();
        assert_eq!(ams.code, ValueString::from("AMS"));
        assert_eq!(ams.shield, Value::Null);
        assert_eq!(
            pops[1].as_ref_option().unwrap().shield,
            ValueString::from("london-uk")
        );
    }

    #[tokio::test]
    async fn services_span_every_page() {
        let fake = FakeTransport::default();
        let page = (0..100)
            .map(|i| format!(r#"{{"id": "s{i:03}", "name": "svc", "type": "vcl", "version": 1}}"#))
            .collect::<Vec<_>>()
            .join(",");
        fake.respond_once(Method::GET, "/service", 200, &format!("[{page}]"));
        fake.respond_once(
            Method::GET,
            "/service",
            200,
            r#"[{"id": "last", "name": "edge", "type": "wasm", "comment": "", "version": 4}]"#,
        );
        let source = ServicesDataSource::new(handle(&fake).await);
        let mut diags = Diagnostics::default();

        let state = source
            .read(&mut diags, Default::default(), Default::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(fake.requests().len(), 2);
        let ids = state.ids.unwrap_or_default();
        assert_eq!(ids.len(), 101);
        assert_eq!(ids[100], ValueString::from("s099"));
        let details = state.details.unwrap_or_default();
        let edge = details[0].as_ref_option().unwrap();
        assert_eq!(edge.id, ValueString::from("last"));
        assert_eq!(edge.service_type, ValueString::from("wasm"));
        assert_eq!(edge.comment, ValueString::from(""));
        assert_eq!(edge.version, Value::Value(4));
    }

    #[tokio::test]
    async fn unconfigured_provider() {
        let source = IpRangesDataSource::default();
        let mut diags = Diagnostics::default();

        assert!(source
            .read(&mut diags, Default::default(), Default::default())
            .await
            .is_none());
        assert_eq!(diags.errors[0].summary, "Fastly provider is not configured");
    }
}
