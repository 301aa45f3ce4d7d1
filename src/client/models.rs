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

use serde::Deserialize;

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Version {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub number: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub locked: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Version {
    pub fn number(&self) -> i64 {
        self.number.unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Service {
    #[serde(alias = "service_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub version: Option<i64>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub active_version: Option<Version>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl ServiceDetail {
    /// Number of the active version, 0 when nothing is active
    pub fn active_version(&self) -> i64 {
        self.active_version
            .as_ref()
            .map(Version::number)
            .or_else(|| {
                self.versions
                    .iter()
                    .find(|v| v.is_active())
                    .map(Version::number)
            })
            .unwrap_or_default()
    }

    pub fn latest_version(&self) -> i64 {
        self.versions
            .iter()
            .map(Version::number)
            .max()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(
        default,
        rename = "general.default_ttl",
        deserialize_with = "lenient::opt_i64"
    )]
    pub default_ttl: Option<i64>,
    #[serde(default, rename = "general.default_host")]
    pub default_host: Option<String>,
    #[serde(
        default,
        rename = "general.stale_if_error",
        deserialize_with = "lenient::opt_bool"
    )]
    pub stale_if_error: Option<bool>,
    #[serde(
        default,
        rename = "general.stale_if_error_ttl",
        deserialize_with = "lenient::opt_i64"
    )]
    pub stale_if_error_ttl: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hashsum: Option<String>,
    #[serde(default)]
    pub files_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: PackageMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PublicIpList {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub ipv6_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Datacenter {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub shield: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_detail_versions() {
        let detail: ServiceDetail = serde_json::from_str(
            r#"{
                "id": "SU1Z0isxPaozGVKXdv0eY",
                "name": "demo",
                "type": "vcl",
                "active_version": null,
                "versions": [
                    {"number": 1, "active": false, "locked": true},
                    {"number": 2, "active": true, "locked": true},
                    {"number": 3, "active": false, "locked": false}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(detail.active_version(), 2);
        assert_eq!(detail.latest_version(), 3);
        assert_eq!(detail.service_type.as_deref(), Some("vcl"));
    }

    #[test]
    fn settings_use_general_prefix() {
        let settings: Settings = serde_json::from_str(
            r#"{"general.default_ttl": 3600, "general.default_host": "", "general.stale_if_error": false, "general.stale_if_error_ttl": "43200"}"#,
        )
        .unwrap();

        assert_eq!(settings.default_ttl, Some(3600));
        assert_eq!(settings.default_host.as_deref(), Some(""));
        assert_eq!(settings.stale_if_error, Some(false));
        assert_eq!(settings.stale_if_error_ttl, Some(43200));
    }
}
