use crate::error::DeviceFarmError;
use crate::prelude::*;

use super::client::DeviceFarmApi;
use super::interfaces::{DevicePool, Project, Upload, UploadCategory, UploadStatus};

/// Curated spec types present on every account that these frameworks cannot use.
///
/// The service may add more curated defaults over time, they would not be filtered out.
const RESTRICTED_DEFAULT_SPEC_TYPES: [&str; 4] = [
    "APPIUM_RUBY_TEST_SPEC",
    "APPIUM_NODE_TEST_SPEC",
    "APPIUM_WEB_RUBY_TEST_SPEC",
    "APPIUM_WEB_NODE_TEST_SPEC",
];

pub fn is_restricted_default_spec(upload: &Upload) -> bool {
    upload.category == Some(UploadCategory::Curated)
        && upload
            .upload_type
            .as_deref()
            .is_some_and(|upload_type| RESTRICTED_DEFAULT_SPEC_TYPES.contains(&upload_type))
}

fn is_usable_test_spec(upload: &Upload) -> bool {
    upload.status == UploadStatus::Succeeded
        && upload
            .upload_type
            .as_deref()
            .is_some_and(|upload_type| upload_type.contains("TEST_SPEC"))
        && !is_restricted_default_spec(upload)
}

pub async fn find_project(api: &dyn DeviceFarmApi, name: &str) -> Result<Project> {
    api.list_projects()
        .await?
        .into_iter()
        .find(|project| project.name == name)
        .ok_or_else(|| DeviceFarmError::configuration(format!("Project '{name}' not found.")).into())
}

pub async fn find_device_pool(
    api: &dyn DeviceFarmApi,
    project: &Project,
    name: &str,
) -> Result<DevicePool> {
    api.list_device_pools(&project.arn)
        .await?
        .into_iter()
        .find(|pool| pool.name == name)
        .ok_or_else(|| {
            DeviceFarmError::configuration(format!(
                "DevicePool '{name}' not found in project '{}'.",
                project.name
            ))
            .into()
        })
}

/// Custom test specs of a project that a user may pick.
pub async fn list_test_specs(api: &dyn DeviceFarmApi, project: &Project) -> Result<Vec<Upload>> {
    Ok(api
        .list_uploads(&project.arn)
        .await?
        .into_iter()
        .filter(is_usable_test_spec)
        .collect())
}

pub async fn find_test_spec(
    api: &dyn DeviceFarmApi,
    project: &Project,
    name: &str,
) -> Result<Upload> {
    list_test_specs(api, project)
        .await?
        .into_iter()
        .find(|upload| upload.name == name)
        .ok_or_else(|| DeviceFarmError::configuration(format!("TestSpec '{name}' not found.")).into())
}
