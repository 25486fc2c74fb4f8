use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, sts::AssumeRoleProvider};
use aws_sdk_devicefarm::Client;
use aws_sdk_devicefarm::config::{Credentials, Region};
use aws_sdk_devicefarm::types as remote;
use rand::{Rng, distributions::Alphanumeric};

use crate::config::AwsCredentials;
use crate::prelude::*;
use crate::upload::UploadType;

use super::client::DeviceFarmApi;
use super::interfaces::{
    AccountSettings, Artifact, ArtifactCategory, Counters, DeviceTarget, DevicePool,
    ExecutionResult, Job, Project, Run, ScheduleRunRequest, Suite, Test, Upload, UploadCategory,
    UploadStatus, VpceConfiguration,
};

/// Device Farm is only available in this region.
pub const DEVICE_FARM_REGION: &str = "us-west-2";
/// Longest session allowed when the role is itself assumed through role chaining.
pub const ROLE_SESSION_DURATION: Duration = Duration::from_secs(3600);
const ROLE_SESSION_NAME_LENGTH: usize = 8;
const CREDENTIALS_PROVIDER_NAME: &str = "devicefarm-runner";

pub struct AwsDeviceFarmClient {
    client: Client,
}

fn random_session_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ROLE_SESSION_NAME_LENGTH)
        .map(char::from)
        .collect()
}

impl AwsDeviceFarmClient {
    pub async fn new(credentials: &AwsCredentials) -> Result<Self> {
        let region = Region::new(DEVICE_FARM_REGION);
        let config = match credentials {
            AwsCredentials::Role { role_arn } => {
                let base = aws_config::defaults(BehaviorVersion::latest())
                    .region(region.clone())
                    .load()
                    .await;
                let session_name = random_session_name();
                debug!("Assuming role {role_arn} with session {session_name}");
                let provider = AssumeRoleProvider::builder(role_arn.clone())
                    .session_name(session_name)
                    .session_length(ROLE_SESSION_DURATION)
                    .region(region)
                    .configure(&base)
                    .build()
                    .await;
                aws_sdk_devicefarm::config::Builder::from(&base)
                    .credentials_provider(provider)
                    .build()
            }
            AwsCredentials::AccessKeys {
                access_key_id,
                secret_access_key,
            } => {
                let credentials = Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                );
                aws_sdk_devicefarm::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
                    .build()
            }
        };

        Ok(Self {
            client: Client::from_conf(config),
        })
    }
}

fn convert_upload(upload: &remote::Upload) -> Upload {
    Upload {
        name: upload.name().unwrap_or_default().to_owned(),
        arn: upload.arn().unwrap_or_default().to_owned(),
        url: upload.url().map(String::from),
        content_type: upload.content_type().map(String::from),
        upload_type: upload.r#type().map(|t| t.as_str().to_owned()),
        status: upload
            .status()
            .map(|status| UploadStatus::from_remote(status.as_str()))
            .unwrap_or(UploadStatus::Initializing),
        category: upload
            .category()
            .map(|category| UploadCategory::from_remote(category.as_str())),
        metadata: upload.metadata().map(String::from),
        message: upload.message().map(String::from),
    }
}

fn non_negative(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

fn convert_run(run: &remote::Run) -> Run {
    let counters = run
        .counters()
        .map(|counters| Counters {
            passed: non_negative(counters.passed()),
            warned: non_negative(counters.warned()),
            failed: non_negative(counters.failed()),
            errored: non_negative(counters.errored()),
            skipped: non_negative(counters.skipped()),
            stopped: counters.stopped().and_then(|v| u32::try_from(v).ok()),
            total: non_negative(counters.total()),
        })
        .unwrap_or_default();

    Run {
        arn: run.arn().unwrap_or_default().to_owned(),
        name: run.name().unwrap_or_default().to_owned(),
        status: run
            .status()
            .map(|status| status.as_str().to_owned())
            .unwrap_or_default(),
        result: run
            .result()
            .and_then(|result| ExecutionResult::from_remote(result.as_str())),
        counters,
    }
}

fn build_test(request: &ScheduleRunRequest) -> Result<remote::ScheduleRunTest> {
    let test = &request.test;
    let parameters = (!test.parameters.is_empty()).then(|| {
        test.parameters
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    });
    remote::ScheduleRunTest::builder()
        .r#type(remote::TestType::from(test.kind.as_str()))
        .set_test_package_arn(test.test_package_arn.clone())
        .set_test_spec_arn(test.test_spec_arn.clone())
        .set_filter(test.filter.clone())
        .set_parameters(parameters)
        .build()
        .context("Failed to build the run test")
}

fn build_configuration(request: &ScheduleRunRequest) -> Result<remote::ScheduleRunConfiguration> {
    let configuration = &request.configuration;
    let location = remote::Location::builder()
        .latitude(configuration.location.latitude)
        .longitude(configuration.location.longitude)
        .build()
        .context("Failed to build the device location")?;
    let radios = remote::Radios::builder()
        .bluetooth(configuration.radios.bluetooth)
        .gps(configuration.radios.gps)
        .nfc(configuration.radios.nfc)
        .wifi(configuration.radios.wifi)
        .build();
    let customer_artifact_paths = configuration.customer_artifact_paths.as_ref().map(|paths| {
        remote::CustomerArtifactPaths::builder()
            .set_android_paths(Some(paths.android_paths.clone()))
            .set_ios_paths(Some(paths.ios_paths.clone()))
            .build()
    });

    Ok(remote::ScheduleRunConfiguration::builder()
        .billing_method(remote::BillingMethod::from(
            configuration.billing_method.as_str(),
        ))
        .locale(configuration.locale.clone())
        .set_auxiliary_apps(Some(configuration.auxiliary_apps.clone()))
        .location(location)
        .radios(radios)
        .set_customer_artifact_paths(customer_artifact_paths)
        .set_vpce_configuration_arns(configuration.vpce_configuration_arns.clone())
        .set_extra_data_package_arn(configuration.extra_data_package_arn.clone())
        .build())
}

fn build_device_selection(
    selection: &super::interfaces::DeviceSelection,
) -> Result<remote::DeviceSelectionConfiguration> {
    let filters = selection
        .filters
        .iter()
        .map(|filter| {
            remote::DeviceFilter::builder()
                .attribute(remote::DeviceFilterAttribute::from(filter.attribute.as_str()))
                .operator(remote::RuleOperator::from(filter.operator.as_str()))
                .set_values(Some(filter.values.clone()))
                .build()
                .context("Failed to build a device filter")
        })
        .collect::<Result<Vec<_>>>()?;
    let max_devices = selection
        .max_devices
        .and_then(|max| i32::try_from(max).ok())
        .context("Invalid max devices")?;
    remote::DeviceSelectionConfiguration::builder()
        .set_filters(Some(filters))
        .max_devices(max_devices)
        .build()
        .context("Failed to build the device selection")
}

#[async_trait(?Send)]
impl DeviceFarmApi for AwsDeviceFarmClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_projects()
                .set_next_token(next_token)
                .send()
                .await
                .context("Failed to list projects")?;
            projects.extend(response.projects().iter().map(|project| Project {
                name: project.name().unwrap_or_default().to_owned(),
                arn: project.arn().unwrap_or_default().to_owned(),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(projects)
    }

    async fn list_device_pools(&self, project_arn: &str) -> Result<Vec<DevicePool>> {
        let mut pools = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_device_pools()
                .arn(project_arn)
                .set_next_token(next_token)
                .send()
                .await
                .context("Failed to list device pools")?;
            pools.extend(response.device_pools().iter().map(|pool| DevicePool {
                name: pool.name().unwrap_or_default().to_owned(),
                arn: pool.arn().unwrap_or_default().to_owned(),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(pools)
    }

    async fn list_uploads(&self, project_arn: &str) -> Result<Vec<Upload>> {
        let mut uploads = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_uploads()
                .arn(project_arn)
                .set_next_token(next_token)
                .send()
                .await
                .context("Failed to list uploads")?;
            uploads.extend(response.uploads().iter().map(convert_upload));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(uploads)
    }

    async fn list_vpce_configurations(&self) -> Result<Vec<VpceConfiguration>> {
        let response = self
            .client
            .list_vpce_configurations()
            .send()
            .await
            .context("Failed to list VPC endpoint configurations")?;
        Ok(response
            .vpce_configurations()
            .iter()
            .map(|vpce| VpceConfiguration {
                arn: vpce.arn().unwrap_or_default().to_owned(),
                service_name: vpce.vpce_service_name().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    async fn get_account_settings(&self) -> Result<Option<AccountSettings>> {
        let response = match self.client.get_account_settings().send().await {
            Ok(response) => response,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|err| err.is_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(err).context("Failed to get account settings"),
        };

        Ok(response.account_settings().map(|settings| {
            let unmetered = |platform: remote::DevicePlatform| {
                settings
                    .unmetered_devices()
                    .and_then(|devices| devices.get(&platform).copied())
                    .and_then(|count| u32::try_from(count).ok())
                    .unwrap_or(0)
            };
            AccountSettings {
                unmetered_android_slots: unmetered(remote::DevicePlatform::Android),
                unmetered_ios_slots: unmetered(remote::DevicePlatform::Ios),
            }
        }))
    }

    async fn create_upload(
        &self,
        project_arn: &str,
        name: &str,
        upload_type: UploadType,
        content_type: &str,
    ) -> Result<Upload> {
        let response = self
            .client
            .create_upload()
            .project_arn(project_arn)
            .name(name)
            .r#type(remote::UploadType::from(upload_type.to_string().as_str()))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to create upload for {name}"))?;
        let upload = response
            .upload()
            .with_context(|| format!("No upload returned for {name}"))?;
        Ok(convert_upload(upload))
    }

    async fn get_upload(&self, upload_arn: &str) -> Result<Upload> {
        let response = self
            .client
            .get_upload()
            .arn(upload_arn)
            .send()
            .await
            .with_context(|| format!("Failed to get upload {upload_arn}"))?;
        let upload = response
            .upload()
            .with_context(|| format!("Upload {upload_arn} not found"))?;
        Ok(convert_upload(upload))
    }

    async fn schedule_run(&self, request: &ScheduleRunRequest) -> Result<Run> {
        let execution = &request.execution;
        let execution_configuration = remote::ExecutionConfiguration::builder()
            .set_job_timeout_minutes(
                execution
                    .job_timeout_minutes
                    .and_then(|minutes| i32::try_from(minutes).ok()),
            )
            .video_capture(execution.video_capture)
            .skip_app_resign(execution.skip_app_resign)
            .build();

        let mut call = self
            .client
            .schedule_run()
            .project_arn(&request.project_arn)
            .name(&request.name)
            .set_app_arn(request.app_arn.clone())
            .test(build_test(request)?)
            .configuration(build_configuration(request)?)
            .execution_configuration(execution_configuration);
        call = match &request.device_target {
            DeviceTarget::Pool(pool_arn) => call.device_pool_arn(pool_arn),
            DeviceTarget::Selection(selection) => {
                call.device_selection_configuration(build_device_selection(selection)?)
            }
        };

        let response = call
            .send()
            .await
            .with_context(|| format!("Failed to schedule run '{}'", request.name))?;
        let run = response.run().context("No run returned by the schedule call")?;
        Ok(convert_run(run))
    }

    async fn get_run(&self, run_arn: &str) -> Result<Run> {
        let response = self
            .client
            .get_run()
            .arn(run_arn)
            .send()
            .await
            .with_context(|| format!("Failed to get run {run_arn}"))?;
        let run = response
            .run()
            .with_context(|| format!("Run {run_arn} not found"))?;
        Ok(convert_run(run))
    }

    async fn list_jobs(&self, run_arn: &str) -> Result<Vec<Job>> {
        let mut jobs = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_jobs()
                .arn(run_arn)
                .set_next_token(next_token)
                .send()
                .await
                .with_context(|| format!("Failed to list jobs of {run_arn}"))?;
            jobs.extend(response.jobs().iter().map(|job| Job {
                arn: job.arn().unwrap_or_default().to_owned(),
                name: job.name().unwrap_or_default().to_owned(),
                os: job.device().and_then(|device| device.os()).map(String::from),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(jobs)
    }

    async fn list_suites(&self, job_arn: &str) -> Result<Vec<Suite>> {
        let mut suites = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_suites()
                .arn(job_arn)
                .set_next_token(next_token)
                .send()
                .await
                .with_context(|| format!("Failed to list suites of {job_arn}"))?;
            suites.extend(response.suites().iter().map(|suite| Suite {
                arn: suite.arn().unwrap_or_default().to_owned(),
                name: suite.name().unwrap_or_default().to_owned(),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(suites)
    }

    async fn list_tests(&self, suite_arn: &str) -> Result<Vec<Test>> {
        let mut tests = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_tests()
                .arn(suite_arn)
                .set_next_token(next_token)
                .send()
                .await
                .with_context(|| format!("Failed to list tests of {suite_arn}"))?;
            tests.extend(response.tests().iter().map(|test| Test {
                arn: test.arn().unwrap_or_default().to_owned(),
                name: test.name().unwrap_or_default().to_owned(),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(tests)
    }

    async fn list_artifacts(
        &self,
        run_arn: &str,
        category: ArtifactCategory,
    ) -> Result<Vec<Artifact>> {
        let mut artifacts = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_artifacts()
                .arn(run_arn)
                .r#type(remote::ArtifactCategory::from(category.as_str()))
                .set_next_token(next_token)
                .send()
                .await
                .with_context(|| format!("Failed to list {category} artifacts of {run_arn}"))?;
            artifacts.extend(response.artifacts().iter().map(|artifact| Artifact {
                arn: artifact.arn().unwrap_or_default().to_owned(),
                name: artifact.name().unwrap_or_default().to_owned(),
                extension: artifact.extension().unwrap_or_default().to_owned(),
                url: artifact.url().unwrap_or_default().to_owned(),
            }));
            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        Ok(artifacts)
    }
}
