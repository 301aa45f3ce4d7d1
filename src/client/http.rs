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

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use super::{ApiRequest, ApiResponse, RequestBody, Transport};

pub const DEFAULT_BASE_URL: &str = "https://api.fastly.com";

/// Transport sending requests over HTTPS with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Fastly API url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid Fastly API url: {base_url}"));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "terraform-provider-fastly/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid Fastly API url: {}", self.base_url))?
            .pop_if_empty()
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Fastly-Key", api_key);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(form) => builder.form(&form.0),
            RequestBody::Json(json) => builder.json(&json),
            RequestBody::Multipart {
                field,
                filename,
                content,
            } => {
                let part = Part::bytes(content)
                    .file_name(filename)
                    .mime_str("application/gzip")?;
                builder.multipart(Form::new().part(field, part))
            }
        };

        let response = builder.send().await.map_err(super::FastlyError::from)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(super::FastlyError::from)?
            .to_vec();

        Ok(ApiResponse { status, body })
    }
}
