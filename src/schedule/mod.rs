use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::artifact::Workspace;
use crate::devicefarm::arn::console_url;
use crate::devicefarm::{
    find_test_spec, DeviceFarmApi, DevicePlatform, DeviceTarget, ExecutionConfiguration, Project,
    ScheduleRunRequest,
};
use crate::error::DeviceFarmError;
use crate::prelude::*;
use crate::upload::{ArtifactPurpose, UploadClient, UploadType};

mod configuration;
mod test_spec;

pub use configuration::{
    BillingMethod, CustomerArtifactPaths, Location, Radios, RunConfiguration,
    DEFAULT_JOB_TIMEOUT_MINUTES, DEFAULT_LOCALE,
};
pub use test_spec::{
    is_test_type, ScheduleRunTest, TestKind, TestSettings, APP_PERFORMANCE_MONITORING_PARAMETER,
};

const APPIUM_VERSION_PARAMETER: &str = "appium_version";

/// Everything needed to schedule one run once the app and the test are uploaded.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub name: String,
    /// Ignored for web apps
    pub app_arn: Option<String>,
    pub is_web_app: bool,
    pub device_target: DeviceTarget,
    pub test: ScheduleRunTest,
    pub job_timeout_minutes: u32,
    pub configuration: RunConfiguration,
    pub video_capture: bool,
    pub skip_app_resign: bool,
    /// VPC endpoint service to attach the run to, when opted in
    pub vpce_service_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub arn: String,
    pub name: String,
    pub console_url: Option<String>,
}

/// A device selection must cap the number of devices.
pub fn validate_device_target(target: &DeviceTarget) -> Result<()> {
    match target {
        DeviceTarget::Selection(selection) if selection.max_devices.unwrap_or(0) == 0 => {
            Err(DeviceFarmError::InvalidDeviceSelection.into())
        }
        _ => Ok(()),
    }
}

fn no_unmetered_slots(platform: Option<DevicePlatform>) -> anyhow::Error {
    let slots = match platform {
        Some(platform) => platform.to_string(),
        None => "android or ios".to_string(),
    };
    DeviceFarmError::configuration(format!(
        "Your account does not have unmetered {slots} device slots. Please change your build settings to run on metered devices."
    ))
    .into()
}

pub struct RunScheduler<'a> {
    api: &'a dyn DeviceFarmApi,
    uploads: UploadClient<'a>,
}

impl<'a> RunScheduler<'a> {
    pub fn new(api: &'a dyn DeviceFarmApi, cancellation: CancellationToken) -> Self {
        Self {
            api,
            uploads: UploadClient::new(api, cancellation),
        }
    }

    pub fn with_upload_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.uploads = self.uploads.with_poll_interval(poll_interval);
        self
    }

    pub fn uploads(&self) -> &UploadClient<'a> {
        &self.uploads
    }

    /// Fails unless the account has unmetered slots for `platform`. `None` stands for a web
    /// app, which may use the slots of either platform.
    pub async fn check_unmetered_slots(&self, platform: Option<DevicePlatform>) -> Result<()> {
        let settings = self.api.get_account_settings().await?.unwrap_or_default();
        let slots = match platform {
            Some(platform) => settings.unmetered_slots(platform),
            None => settings.unmetered_slots_for_web(),
        };
        debug!("Unmetered slots available: {slots}");
        if slots == 0 {
            return Err(no_unmetered_slots(platform));
        }
        Ok(())
    }

    /// Validates `settings`, uploads the test package if the kind needs one and builds the
    /// test section of the run.
    pub async fn build_test(
        &self,
        project: &Project,
        workspace: &Workspace,
        settings: &TestSettings,
        is_web_app: bool,
    ) -> Result<ScheduleRunTest> {
        settings.validate()?;

        let kind = settings.kind.effective(is_web_app);
        if kind != settings.kind {
            info!("Testing a web app, running {kind} instead of {}", settings.kind);
        }

        let test_package_arn = match UploadType::for_test(kind) {
            Some(_) => {
                let pattern = settings.package.as_deref().unwrap_or_default();
                info!("Using {kind} test package '{}'", workspace.expand(pattern));
                let upload = self
                    .uploads
                    .upload_artifact(project, workspace, pattern, ArtifactPurpose::TestPackage(kind))
                    .await?;
                Some(upload.arn)
            }
            None => None,
        };

        let test_spec_arn = match settings.test_spec_name.as_deref() {
            Some(name) => {
                info!("Using TestSpec '{name}'");
                Some(find_test_spec(self.api, project, name).await?.arn)
            }
            None => None,
        };

        let parameters = settings.remote_parameters();
        if let Some(version) = parameters.get(APPIUM_VERSION_PARAMETER) {
            info!("Using appium version: {version}");
        }

        Ok(ScheduleRunTest {
            kind,
            test_package_arn,
            test_spec_arn,
            filter: settings
                .filter
                .as_deref()
                .filter(|filter| !filter.is_empty())
                .map(|filter| workspace.expand(filter)),
            parameters,
        })
    }

    /// ARNs of the VPC endpoint configuration named `service_name`.
    ///
    /// An account without any configuration, or whose configurations cannot be listed, runs
    /// without a VPC.
    async fn vpce_configuration_arns(&self, service_name: &str) -> Result<Option<Vec<String>>> {
        let configurations = match self.api.list_vpce_configurations().await {
            Ok(configurations) => configurations,
            Err(err) => {
                debug!("Could not list VPCE configurations, running without a VPC: {err:#}");
                return Ok(None);
            }
        };
        if configurations.is_empty() {
            debug!("No VPCE configuration on the account, running without a VPC");
            return Ok(None);
        }

        info!("Using VPCE Configuration '{service_name}'");
        let vpce = configurations
            .into_iter()
            .find(|vpce| vpce.service_name == service_name)
            .ok_or_else(|| {
                DeviceFarmError::configuration(format!("VPCE Service '{service_name}' not found."))
            })?;
        Ok(Some(vec![vpce.arn]))
    }

    pub async fn schedule(&self, project: &Project, request: RunRequest) -> Result<RunHandle> {
        validate_device_target(&request.device_target)?;

        let mut configuration = request.configuration;
        if let Some(service_name) = request.vpce_service_name.as_deref() {
            configuration.vpce_configuration_arns =
                self.vpce_configuration_arns(service_name).await?;
        }

        let kind = request.test.kind;
        info!("Scheduling '{kind}' run '{}'", request.name);
        let run = self
            .api
            .schedule_run(&ScheduleRunRequest {
                project_arn: project.arn.clone(),
                name: request.name,
                app_arn: if request.is_web_app {
                    None
                } else {
                    request.app_arn
                },
                device_target: request.device_target,
                test: request.test,
                configuration,
                execution: ExecutionConfiguration::new(
                    request.job_timeout_minutes,
                    request.video_capture,
                    request.skip_app_resign,
                ),
            })
            .await
            .context("Failed to schedule the run")?;

        let console_url = match console_url(&run.arn) {
            Ok(url) => {
                info!("View the {kind} run in the AWS Device Farm Console: {url}");
                Some(url)
            }
            Err(_) => {
                warn!("Could not parse project ID and run ID from run ARN: {}", run.arn);
                None
            }
        };

        Ok(RunHandle {
            arn: run.arn,
            name: run.name,
            console_url,
        })
    }
}
