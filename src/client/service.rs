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
use reqwest::Method;
use serde::de::DeserializeOwned;

use super::models::{Package, Service, ServiceDetail, Settings, ValidationResult, Version};
use super::{ApiRequest, FastlyClient, FormParams, RequestBody};

const SERVICES_PER_PAGE: usize = 100;

impl FastlyClient {
    pub async fn create_service(
        &self,
        name: &str,
        comment: &str,
        service_type: &str,
    ) -> Result<Service> {
        let form = FormParams::new()
            .raw("name", name)
            .raw("comment", comment)
            .raw("type", service_type);
        self.post_form(&["service"], form)
            .await
            .with_context(|| format!("Failed to create service {name}"))
    }

    pub async fn get_service_details(&self, service_id: &str) -> Result<ServiceDetail> {
        self.get(&["service", service_id, "details"]).await
    }

    pub async fn update_service(&self, service_id: &str, name: &str, comment: &str) -> Result<()> {
        let form = FormParams::new().raw("name", name).raw("comment", comment);
        let _: Service = self.put_form(&["service", service_id], form).await?;
        Ok(())
    }

    pub async fn delete_service(&self, service_id: &str) -> Result<()> {
        tracing::info!(service_id, "Deleting Fastly service");
        self.delete(&["service", service_id]).await
    }

    /// List all the services of the account
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let mut services = Vec::new();
        for page in 1.. {
            let batch: Vec<Service> = self
                .fetch(
                    ApiRequest::new(Method::GET, ["service"])
                        .query("page", page)
                        .query("per_page", SERVICES_PER_PAGE),
                )
                .await?;
            let len = batch.len();
            services.extend(batch);
            if len < SERVICES_PER_PAGE {
                break;
            }
        }
        Ok(services)
    }

    pub async fn clone_version(&self, service_id: &str, version: i64) -> Result<Version> {
        tracing::info!(service_id, version, "Cloning Fastly service version");
        self.fetch(ApiRequest::versioned(
            Method::PUT,
            service_id,
            version,
            "clone",
        ))
        .await
        .with_context(|| format!("Failed to clone version {version} of service {service_id}"))
    }

    pub async fn activate_version(&self, service_id: &str, version: i64) -> Result<()> {
        tracing::info!(service_id, version, "Activating Fastly service version");
        self.execute(ApiRequest::versioned(
            Method::PUT,
            service_id,
            version,
            "activate",
        ))
        .await
        .with_context(|| format!("Failed to activate version {version} of service {service_id}"))?;
        Ok(())
    }

    pub async fn deactivate_version(&self, service_id: &str, version: i64) -> Result<()> {
        tracing::info!(service_id, version, "Deactivating Fastly service version");
        self.execute(ApiRequest::versioned(
            Method::PUT,
            service_id,
            version,
            "deactivate",
        ))
        .await
        .with_context(|| {
            format!("Failed to deactivate version {version} of service {service_id}")
        })?;
        Ok(())
    }

    pub async fn update_version_comment(
        &self,
        service_id: &str,
        version: i64,
        comment: &str,
    ) -> Result<()> {
        self.execute(
            ApiRequest::versioned(Method::PUT, service_id, version, "")
                .form(FormParams::new().raw("comment", comment)),
        )
        .await?;
        Ok(())
    }

    pub async fn validate_version(
        &self,
        service_id: &str,
        version: i64,
    ) -> Result<ValidationResult> {
        self.fetch(ApiRequest::versioned(
            Method::GET,
            service_id,
            version,
            "validate",
        ))
        .await
    }

    pub async fn get_settings(&self, service_id: &str, version: i64) -> Result<Settings> {
        self.fetch(ApiRequest::versioned(
            Method::GET,
            service_id,
            version,
            "settings",
        ))
        .await
    }

    pub async fn update_settings(
        &self,
        service_id: &str,
        version: i64,
        form: FormParams,
    ) -> Result<()> {
        self.execute(ApiRequest::versioned(Method::PUT, service_id, version, "settings").form(form))
            .await
            .with_context(|| format!("Failed to update settings of service {service_id}"))?;
        Ok(())
    }

    pub async fn get_package(&self, service_id: &str, version: i64) -> Result<Package> {
        self.fetch(ApiRequest::versioned(
            Method::GET,
            service_id,
            version,
            "package",
        ))
        .await
    }

    pub async fn upload_package(
        &self,
        service_id: &str,
        version: i64,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Package> {
        let mut request = ApiRequest::versioned(Method::PUT, service_id, version, "package");
        request.body = RequestBody::Multipart {
            field: "package".to_owned(),
            filename: filename.to_owned(),
            content,
        };
        self.fetch(request)
            .await
            .with_context(|| format!("Failed to upload package {filename}"))
    }

    /// Make `name` the main VCL of the version
    pub async fn set_main_vcl(&self, service_id: &str, version: i64, name: &str) -> Result<()> {
        self.execute(
            ApiRequest::versioned(Method::PUT, service_id, version, "vcl")
                .segment(name)
                .collection("main"),
        )
        .await
        .with_context(|| format!("Failed to set {name} as main VCL"))?;
        Ok(())
    }

    pub async fn add_director_backend(
        &self,
        service_id: &str,
        version: i64,
        director: &str,
        backend: &str,
    ) -> Result<()> {
        self.execute(
            ApiRequest::versioned(Method::POST, service_id, version, "director")
                .segment(director)
                .collection("backend")
                .segment(backend),
        )
        .await
        .with_context(|| format!("Failed to add backend {backend} to director {director}"))?;
        Ok(())
    }

    pub async fn remove_director_backend(
        &self,
        service_id: &str,
        version: i64,
        director: &str,
        backend: &str,
    ) -> Result<()> {
        self.execute(
            ApiRequest::versioned(Method::DELETE, service_id, version, "director")
                .segment(director)
                .collection("backend")
                .segment(backend),
        )
        .await
        .with_context(|| {
            format!("Failed to remove backend {backend} from director {director}")
        })?;
        Ok(())
    }

    /// List the objects of a versioned collection (`backend`, `logging/syslog`, ...)
    pub async fn list_versioned<T: DeserializeOwned>(
        &self,
        service_id: &str,
        version: i64,
        collection: &str,
    ) -> Result<Vec<T>> {
        self.fetch(ApiRequest::versioned(
            Method::GET,
            service_id,
            version,
            collection,
        ))
        .await
        .with_context(|| format!("Failed to list {collection} of service {service_id}"))
    }

    pub async fn create_versioned(
        &self,
        service_id: &str,
        version: i64,
        collection: &str,
        form: FormParams,
    ) -> Result<serde_json::Value> {
        self.fetch(ApiRequest::versioned(Method::POST, service_id, version, collection).form(form))
            .await
            .with_context(|| format!("Failed to create {collection} in service {service_id}"))
    }

    pub async fn update_versioned(
        &self,
        service_id: &str,
        version: i64,
        collection: &str,
        name: &str,
        form: FormParams,
    ) -> Result<serde_json::Value> {
        self.fetch(
            ApiRequest::versioned(Method::PUT, service_id, version, collection)
                .segment(name)
                .form(form),
        )
        .await
        .with_context(|| format!("Failed to update {collection} {name} in service {service_id}"))
    }

    pub async fn delete_versioned(
        &self,
        service_id: &str,
        version: i64,
        collection: &str,
        name: &str,
    ) -> Result<()> {
        self.execute(
            ApiRequest::versioned(Method::DELETE, service_id, version, collection).segment(name),
        )
        .await
        .with_context(|| format!("Failed to delete {collection} {name} in service {service_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use crate::client::testing::FakeTransport;
    use crate::client::{FastlyClient, FormParams};

    #[tokio::test]
    async fn list_services_pages_until_short_page() {
        let fake = FakeTransport::default();
        let full_page = serde_json::to_string(
            &(0..100)
                .map(|i| serde_json::json!({"id": format!("svc{i}"), "name": "s"}))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        fake.respond_once(Method::GET, "/service", 200, &full_page);
        fake.respond_once(Method::GET, "/service", 200, r#"[{"id":"last"}]"#);
        let client = FastlyClient::new(fake.clone());

        let services = client.list_services().await.unwrap();

        assert_eq!(services.len(), 101);
        assert_eq!(services[100].id, "last");
        let pages = fake
            .requests()
            .iter()
            .map(|r| r.query.clone())
            .collect::<Vec<_>>();
        assert_eq!(pages[0][0], ("page".to_owned(), "1".to_owned()));
        assert_eq!(pages[1][0], ("page".to_owned(), "2".to_owned()));
    }

    #[tokio::test]
    async fn versioned_objects_are_addressed_by_name() {
        let fake = FakeTransport::default();
        let client = FastlyClient::new(fake.clone());

        client
            .update_versioned(
                "sid",
                4,
                "logging/syslog",
                "my logger",
                FormParams::new().raw("port", "514"),
            )
            .await
            .unwrap();
        client
            .delete_versioned("sid", 4, "backend", "origin")
            .await
            .unwrap();
        client
            .update_version_comment("sid", 4, "release")
            .await
            .unwrap();

        assert_eq!(
            fake.paths(),
            vec![
                "PUT /service/sid/version/4/logging/syslog/my logger",
                "DELETE /service/sid/version/4/backend/origin",
                "PUT /service/sid/version/4",
            ]
        );
        assert_eq!(
            fake.form_value("PUT /service/sid/version/4/logging/syslog/my logger", "port")
                .as_deref(),
            Some("514")
        );
    }
}
