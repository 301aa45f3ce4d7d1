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

mod apply;
pub mod blocks;
pub mod compute;
pub mod handler;
mod hash_stream;
mod read;
mod resource;
pub mod set_diff;
pub mod state;
pub mod vcl;

pub use compute::ComputeService;
pub use handler::ServiceAttributeHandler;
pub use resource::ServiceResource;
pub use state::ServiceState;
pub use vcl::VclService;

/// Kind of service managed by a [`ServiceResource`]
pub trait ServiceDefinition: Debug + Send + Sync + 'static {
    /// Service type sent on creation: `vcl` or `wasm`
    const SERVICE_TYPE: &'static str;
    const DESCRIPTION: &'static str;

    type State: ServiceState;

    /// Handlers of the service, in processing order
    fn handlers() -> Vec<Box<dyn ServiceAttributeHandler<Self::State>>>;
}
