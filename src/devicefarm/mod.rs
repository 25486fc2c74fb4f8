pub mod arn;
mod aws;
mod cache;
mod client;
#[cfg(test)]
pub mod fake;
mod interfaces;
mod lookup;

pub use aws::{AwsDeviceFarmClient, DEVICE_FARM_REGION};
pub use cache::ResourceCache;
pub use client::DeviceFarmApi;
pub use interfaces::*;
pub use lookup::{
    find_device_pool, find_project, find_test_spec, is_restricted_default_spec, list_test_specs,
};
