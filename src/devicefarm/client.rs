use async_trait::async_trait;

use crate::prelude::*;

use super::interfaces::{
    AccountSettings, Artifact, ArtifactCategory, DevicePool, Job, Project, Run,
    ScheduleRunRequest, Suite, Test, Upload, VpceConfiguration,
};
use crate::upload::UploadType;

/// `DeviceFarmApi` is the remote test-execution service as seen by the orchestration core.
///
/// Request and response shapes are owned by the service; implementations only translate
/// them to the value types of [`super::interfaces`]. Listing operations return every page.
#[async_trait(?Send)]
pub trait DeviceFarmApi {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_device_pools(&self, project_arn: &str) -> Result<Vec<DevicePool>>;

    async fn list_uploads(&self, project_arn: &str) -> Result<Vec<Upload>>;

    /// Lists the VPC endpoint configurations of the account.
    ///
    /// Accounts without private devices are typically denied this call, callers must treat
    /// an error as "no VPC capability".
    async fn list_vpce_configurations(&self) -> Result<Vec<VpceConfiguration>>;

    /// Returns `None` when the account has no settings to report.
    async fn get_account_settings(&self) -> Result<Option<AccountSettings>>;

    /// Creates an upload slot, the returned upload carries the signed URL to PUT the payload to.
    async fn create_upload(
        &self,
        project_arn: &str,
        name: &str,
        upload_type: UploadType,
        content_type: &str,
    ) -> Result<Upload>;

    async fn get_upload(&self, upload_arn: &str) -> Result<Upload>;

    async fn schedule_run(&self, request: &ScheduleRunRequest) -> Result<Run>;

    async fn get_run(&self, run_arn: &str) -> Result<Run>;

    async fn list_jobs(&self, run_arn: &str) -> Result<Vec<Job>>;

    async fn list_suites(&self, job_arn: &str) -> Result<Vec<Suite>>;

    async fn list_tests(&self, suite_arn: &str) -> Result<Vec<Test>>;

    async fn list_artifacts(&self, run_arn: &str, category: ArtifactCategory)
    -> Result<Vec<Artifact>>;
}
