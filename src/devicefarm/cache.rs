use std::collections::HashMap;

use crate::prelude::*;

use super::client::DeviceFarmApi;
use super::interfaces::{DevicePool, Project, Upload, VpceConfiguration};
use super::lookup::list_test_specs;

/// Caller-owned memo of the resources listed from the service.
///
/// Nothing is cached implicitly: entries are filled on first access and stay until
/// [`ResourceCache::invalidate`] or [`ResourceCache::refresh`] is called.
#[derive(Default)]
pub struct ResourceCache {
    projects: Option<Vec<Project>>,
    device_pools: HashMap<String, Vec<DevicePool>>,
    test_specs: HashMap<String, Vec<Upload>>,
    vpce_configurations: Option<Vec<VpceConfiguration>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Drops everything and eagerly reloads the project list.
    pub async fn refresh(&mut self, api: &dyn DeviceFarmApi) -> Result<()> {
        self.invalidate();
        self.projects(api).await?;
        Ok(())
    }

    pub async fn projects(&mut self, api: &dyn DeviceFarmApi) -> Result<&[Project]> {
        if self.projects.is_none() {
            self.projects = Some(api.list_projects().await?);
        }
        Ok(self.projects.as_deref().unwrap_or_default())
    }

    pub async fn project(&mut self, api: &dyn DeviceFarmApi, name: &str) -> Result<Project> {
        self.projects(api)
            .await?
            .iter()
            .find(|project| project.name == name)
            .cloned()
            .ok_or_else(|| anyhow!("Project '{name}' not found."))
    }

    pub async fn device_pools(
        &mut self,
        api: &dyn DeviceFarmApi,
        project_name: &str,
    ) -> Result<&[DevicePool]> {
        if !self.device_pools.contains_key(project_name) {
            let project = self.project(api, project_name).await?;
            let pools = api.list_device_pools(&project.arn).await?;
            self.device_pools.insert(project_name.to_owned(), pools);
        }
        Ok(self
            .device_pools
            .get(project_name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub async fn test_specs(
        &mut self,
        api: &dyn DeviceFarmApi,
        project_name: &str,
    ) -> Result<&[Upload]> {
        if !self.test_specs.contains_key(project_name) {
            let project = self.project(api, project_name).await?;
            let specs = list_test_specs(api, &project).await?;
            self.test_specs.insert(project_name.to_owned(), specs);
        }
        Ok(self
            .test_specs
            .get(project_name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// An account without VPC access lists nothing rather than failing.
    pub async fn vpce_configurations(&mut self, api: &dyn DeviceFarmApi) -> &[VpceConfiguration] {
        if self.vpce_configurations.is_none() {
            let configurations = api.list_vpce_configurations().await.unwrap_or_else(|err| {
                debug!("Could not list VPC endpoint configurations: {err:#}");
                vec![]
            });
            self.vpce_configurations = Some(configurations);
        }
        self.vpce_configurations.as_deref().unwrap_or_default()
    }
}
