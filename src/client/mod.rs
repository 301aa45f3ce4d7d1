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
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tf_provider::value::{Value, ValueBool, ValueNumber, ValueString};
use tokio::sync::RwLock;

mod acl;
mod dictionary;
mod error;
mod http;
pub mod lenient;
pub mod models;
mod ngwaf;
mod public;
mod service;
mod snippet;

#[cfg(test)]
pub(crate) mod testing;

pub use acl::{AclEntry, AclEntryOp};
pub use dictionary::{DictionaryItem, DictionaryItemOp};
pub use error::{is_not_found, FastlyError};
pub use http::{HttpTransport, DEFAULT_BASE_URL};
pub use ngwaf::{AttackSignalThresholds, Workspace};

/// Maximum number of operations accepted by a batch endpoint
pub const BATCH_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Form(FormParams),
    Json(serde_json::Value),
    Multipart {
        field: String,
        filename: String,
        content: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let request = Self {
            method,
            segments: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        };
        // collection names like `logging/syslog` span several segments
        segments
            .into_iter()
            .fold(request, |request, s| request.collection(s.as_ref()))
    }

    /// Request on a path below `/service/{id}/version/{number}`
    pub fn versioned(method: Method, service_id: &str, version: i64, collection: &str) -> Self {
        Self::new(method, ["service", service_id, "version"])
            .segment(version.to_string())
            .collection(collection)
    }

    /// Append a path segment that is taken verbatim (names may contain `/`)
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a `/` separated path
    pub fn collection(mut self, path: &str) -> Self {
        self.segments.extend(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        );
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn form(mut self, form: FormParams) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn json(mut self, json: serde_json::Value) -> Self {
        self.body = RequestBody::Json(json);
        self
    }

    /// Path of the request, for logging and matching
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    /// Send a request to the Fastly API
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Ordered form fields for the Fastly configuration endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(pub Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.push((name.to_owned(), value.into()));
        self
    }

    pub fn string(self, name: &str, value: &ValueString<'_>) -> Self {
        match value {
            Value::Value(value) => self.raw(name, value.as_ref()),
            _ => self,
        }
    }

    pub fn number(self, name: &str, value: &ValueNumber) -> Self {
        match value {
            Value::Value(value) => self.raw(name, value.to_string()),
            _ => self,
        }
    }

    /// Booleans are sent the way the API stores them: `1` or `0`
    pub fn bool(self, name: &str, value: &ValueBool) -> Self {
        match value {
            Value::Value(value) => self.raw(name, if *value { "1" } else { "0" }),
            _ => self,
        }
    }

    pub fn joined<'a, 'b: 'a, I>(self, name: &str, values: I, sep: &str) -> Self
    where
        I: IntoIterator<Item = &'a ValueString<'b>>,
    {
        let joined = values
            .into_iter()
            .filter_map(|v| v.as_deref_option())
            .collect::<Vec<_>>()
            .join(sep);
        self.raw(name, joined)
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Client for the Fastly API
#[derive(Debug, Clone)]
pub struct FastlyClient {
    transport: Arc<dyn Transport>,
}

impl FastlyClient {
    pub fn new<T: Transport>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Send a request and fail on any non success status
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.clone();
        let path = request.path();
        tracing::debug!(%method, %path, "Fastly API request");

        let response = self.transport.send(request).await?;
        if response.status >= 400 {
            tracing::debug!(%method, %path, status = response.status, "Fastly API error");
            return Err(FastlyError::from_response(response.status, &response.body).into());
        }
        Ok(response)
    }

    /// Send a request and decode the JSON response
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let path = request.path();
        let response = self.execute(request).await?;
        serde_json::from_slice(&response.body)
            .map_err(|source| FastlyError::Decode { path, source }.into())
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.fetch(ApiRequest::new(Method::GET, segments)).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: FormParams,
    ) -> Result<T> {
        self.fetch(ApiRequest::new(Method::POST, segments).form(form))
            .await
    }

    pub async fn put_form<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: FormParams,
    ) -> Result<T> {
        self.fetch(ApiRequest::new(Method::PUT, segments).form(form))
            .await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        json: serde_json::Value,
    ) -> Result<T> {
        self.fetch(ApiRequest::new(Method::POST, segments).json(json))
            .await
    }

    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        json: serde_json::Value,
    ) -> Result<T> {
        self.fetch(ApiRequest::new(Method::PATCH, segments).json(json))
            .await
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<()> {
        self.execute(ApiRequest::new(Method::DELETE, segments))
            .await?;
        Ok(())
    }
}

/// Slot holding the client once the provider has been configured
#[derive(Debug, Clone, Default)]
pub struct ClientHandle {
    inner: Arc<RwLock<Option<FastlyClient>>>,
}

impl ClientHandle {
    pub async fn set(&self, client: FastlyClient) {
        *self.inner.write().await = Some(client);
    }

    pub async fn get(&self) -> Result<FastlyClient> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or_else(|| FastlyError::NotConfigured.into())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;

    #[test]
    fn request_splits_collection_paths() {
        let request = ApiRequest::new(Method::GET, ["service", "abc", "version", "3"])
            .segment("my/logger");
        assert_eq!(
            request.segments,
            vec!["service", "abc", "version", "3", "my/logger"]
        );

        let request = ApiRequest::new(Method::GET, ["service/abc/version/3/logging/syslog"]);
        assert_eq!(request.path(), "/service/abc/version/3/logging/syslog");
    }

    #[test]
    fn form_params_skip_null_and_unknown() {
        let form = FormParams::new()
            .string("name", &Value::from("origin"))
            .string("comment", &Value::Null)
            .number("port", &Value::Value(443))
            .number("weight", &Value::Unknown)
            .bool("use_ssl", &Value::Value(true))
            .bool("auto_loadbalance", &Value::Value(false));

        assert_eq!(
            form.0,
            vec![
                ("name".to_owned(), "origin".to_owned()),
                ("port".to_owned(), "443".to_owned()),
                ("use_ssl".to_owned(), "1".to_owned()),
                ("auto_loadbalance".to_owned(), "0".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn error_status_becomes_fastly_error() {
        let fake = FakeTransport::default();
        fake.respond(
            Method::GET,
            "/service/missing/details",
            404,
            r#"{"msg":"Record not found"}"#,
        );
        let client = FastlyClient::new(fake.clone());

        let err = client
            .get::<serde_json::Value>(&["service", "missing", "details"])
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
        assert_eq!(fake.paths(), vec!["GET /service/missing/details"]);
    }

    #[tokio::test]
    async fn unconfigured_handle_errors() {
        let handle = ClientHandle::default();
        let err = handle.get().await.unwrap_err();
        assert_eq!(err.to_string(), "Fastly provider is not configured");

        handle
            .set(FastlyClient::new(FakeTransport::default()))
            .await;
        assert!(handle.get().await.is_ok());
    }
}
