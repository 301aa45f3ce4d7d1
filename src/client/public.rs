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

use anyhow::{Context, Result};

use super::models::{Datacenter, PublicIpList};
use super::FastlyClient;

impl FastlyClient {
    pub async fn public_ip_list(&self) -> Result<PublicIpList> {
        self.get(&["public-ip-list"])
            .await
            .context("Failed to fetch Fastly public IP list")
    }

    pub async fn datacenters(&self) -> Result<Vec<Datacenter>> {
        self.get(&["datacenters"])
            .await
            .context("Failed to fetch Fastly datacenters")
    }
}
