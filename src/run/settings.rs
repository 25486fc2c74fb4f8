use crate::devicefarm::{DeviceSelection, DeviceTarget};
use crate::error::DeviceFarmError;
use crate::prelude::*;
use crate::schedule::{
    validate_device_target, BillingMethod, CustomerArtifactPaths, Location, Radios,
    RunConfiguration, TestSettings, DEFAULT_JOB_TIMEOUT_MINUTES,
};

pub const MIN_JOB_TIMEOUT_MINUTES: u32 = 5;
pub const MAX_JOB_TIMEOUT_MINUTES: u32 = 600;

/// Devices a job runs on, by pool name or ad-hoc selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSettings {
    Pool(String),
    Selection(DeviceSelection),
}

/// A fully merged job: what to upload, where to run it and how to judge it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSettings {
    pub project: String,
    pub devices: DeviceSettings,
    /// Glob of the application, unused for web apps
    pub app: Option<String>,
    pub is_web_app: bool,
    pub run_name: Option<String>,
    pub test: TestSettings,
    pub job_timeout_minutes: u32,
    pub video_capture: bool,
    pub skip_app_resign: bool,
    pub billing_method: BillingMethod,
    pub extra_data: Option<String>,
    pub vpce_service_name: Option<String>,
    pub location: Option<Location>,
    pub radios: Option<Radios>,
    pub customer_artifact_paths: Option<CustomerArtifactPaths>,
    pub ignore_run_error: bool,
    pub store_results: bool,
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

impl JobSettings {
    pub fn new(project: impl Into<String>, devices: DeviceSettings, test: TestSettings) -> Self {
        Self {
            project: project.into(),
            devices,
            app: None,
            is_web_app: false,
            run_name: None,
            test,
            job_timeout_minutes: DEFAULT_JOB_TIMEOUT_MINUTES,
            video_capture: true,
            skip_app_resign: false,
            billing_method: BillingMethod::Metered,
            extra_data: None,
            vpce_service_name: None,
            location: None,
            radios: None,
            customer_artifact_paths: None,
            ignore_run_error: false,
            store_results: false,
        }
    }

    /// Everything that can be checked before talking to the service.
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(DeviceFarmError::configuration("Project must be set.").into());
        }
        match &self.devices {
            DeviceSettings::Pool(name) if name.trim().is_empty() => {
                return Err(DeviceFarmError::configuration("DevicePool must be set.").into());
            }
            DeviceSettings::Pool(_) => {}
            DeviceSettings::Selection(selection) => {
                validate_device_target(&DeviceTarget::Selection(selection.clone()))?
            }
        }
        if !self.is_web_app && is_blank(self.app.as_deref()) {
            return Err(
                DeviceFarmError::configuration("Application Artifact must be set.").into(),
            );
        }
        if !(MIN_JOB_TIMEOUT_MINUTES..=MAX_JOB_TIMEOUT_MINUTES).contains(&self.job_timeout_minutes)
        {
            return Err(DeviceFarmError::configuration(format!(
                "Job timeout must be between {MIN_JOB_TIMEOUT_MINUTES} and {MAX_JOB_TIMEOUT_MINUTES} minutes, got {}",
                self.job_timeout_minutes
            ))
            .into());
        }
        if self.extra_data.as_deref().is_some_and(|data| data.trim().is_empty()) {
            return Err(DeviceFarmError::configuration("Extra data must be set.").into());
        }
        if self
            .vpce_service_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DeviceFarmError::configuration("VPCE Service must be set.").into());
        }
        self.test.validate()
    }

    /// Run configuration without the uploaded extra data or the VPC, those are attached later.
    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            billing_method: self.billing_method,
            location: self.location.unwrap_or_default(),
            radios: self.radios.unwrap_or_default(),
            customer_artifact_paths: self.customer_artifact_paths.clone(),
            ..Default::default()
        }
    }
}
