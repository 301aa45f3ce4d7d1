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

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;

use super::{ApiRequest, ApiResponse, RequestBody, Transport};

#[derive(Debug)]
struct Canned {
    method: Method,
    path: String,
    status: u16,
    body: String,
    once: bool,
}

/// In-memory transport recording requests and serving canned responses
///
/// Unmatched requests get a `200 {}` response.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    canned: Arc<Mutex<Vec<Canned>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl FakeTransport {
    /// Serve `body` for every matching request
    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, status, body, false);
    }

    /// Serve `body` for the next matching request only
    pub(crate) fn respond_once(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, status, body, true);
    }

    fn push(&self, method: Method, path: &str, status: u16, body: &str, once: bool) {
        self.canned.lock().unwrap().push(Canned {
            method,
            path: path.to_owned(),
            status,
            body: body.to_owned(),
            once,
        });
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD /path` of every request sent so far
    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path()))
            .collect()
    }

    /// Value of a form field of the request sent to `METHOD /path`
    pub(crate) fn form_value(&self, request: &str, name: &str) -> Option<String> {
        self.requests()
            .into_iter()
            .filter(|r| format!("{} {}", r.method, r.path()) == request)
            .find_map(|r| match r.body {
                RequestBody::Form(form) => form.get(name).map(str::to_owned),
                _ => None,
            })
    }

    /// JSON body of the last request sent to `METHOD /path`
    pub(crate) fn json_body(&self, request: &str) -> Option<serde_json::Value> {
        self.requests()
            .into_iter()
            .filter(|r| format!("{} {}", r.method, r.path()) == request)
            .filter_map(|r| match r.body {
                RequestBody::Json(json) => Some(json),
                _ => None,
            })
            .last()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.path();
        self.requests.lock().unwrap().push(request.clone());

        let mut canned = self.canned.lock().unwrap();
        let matches = |c: &Canned| c.method == request.method && c.path == path;
        let position = canned
            .iter()
            .position(|c| c.once && matches(c))
            .or_else(|| canned.iter().position(matches));
        let response = match position {
            Some(i) => {
                let response = ApiResponse {
                    status: canned[i].status,
                    body: canned[i].body.clone().into_bytes(),
                };
                if canned[i].once {
                    canned.remove(i);
                }
                response
            }
            None => ApiResponse {
                status: 200,
                body: b"{}".to_vec(),
            },
        };
        Ok(response)
    }
}
