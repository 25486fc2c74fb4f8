//! In-memory [`DeviceFarmApi`] used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::prelude::*;
use crate::upload::UploadType;

use super::client::DeviceFarmApi;
use super::interfaces::*;

pub const ACCOUNT_ARN_PREFIX: &str = "arn:aws:devicefarm:us-west-2:123456789012";
pub const PROJECT_ID: &str = "5e01a8c7-c861-4c0a-b1d5-12345EXAMPLE";
pub const RUN_ID: &str = "7a4c6b3e-run0-4f5e-9d21-12345EXAMPLE";

pub fn run_arn() -> String {
    format!("{ACCOUNT_ARN_PREFIX}:run:{PROJECT_ID}/{RUN_ID}")
}

pub fn run_with(status: &str, result: Option<ExecutionResult>, counters: Counters) -> Run {
    Run {
        arn: run_arn(),
        name: "nightly".into(),
        status: status.into(),
        result,
        counters,
    }
}

pub struct FakeState {
    pub projects: Vec<Project>,
    pub device_pools: Vec<DevicePool>,
    pub uploads: Vec<Upload>,
    pub vpce_configurations: Vec<VpceConfiguration>,
    pub vpce_error: bool,
    pub account_settings: Option<AccountSettings>,
    /// Signed URL handed out by `create_upload`
    pub upload_url: Option<String>,
    /// Statuses returned by successive `get_upload` calls, `SUCCEEDED` once drained
    pub upload_statuses: VecDeque<UploadStatus>,
    pub upload_metadata: Option<String>,
    pub created_uploads: Vec<(String, UploadType)>,
    pub scheduled: Vec<ScheduleRunRequest>,
    /// Runs returned by successive `get_run` calls, the last one repeats
    pub runs: VecDeque<Run>,
    pub jobs: Vec<Job>,
    pub suites: HashMap<String, Vec<Suite>>,
    pub tests: HashMap<String, Vec<Test>>,
    pub artifacts: HashMap<ArtifactCategory, Vec<Artifact>>,
    pub calls: HashMap<&'static str, usize>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            projects: vec![Project {
                name: "demo".into(),
                arn: format!("{ACCOUNT_ARN_PREFIX}:project:{PROJECT_ID}"),
            }],
            device_pools: vec![DevicePool {
                name: "Top Devices".into(),
                arn: format!("{ACCOUNT_ARN_PREFIX}:devicepool:{PROJECT_ID}/top-devices"),
            }],
            uploads: vec![],
            vpce_configurations: vec![],
            vpce_error: false,
            account_settings: None,
            upload_url: None,
            upload_statuses: VecDeque::new(),
            upload_metadata: None,
            created_uploads: vec![],
            scheduled: vec![],
            runs: VecDeque::new(),
            jobs: vec![],
            suites: HashMap::new(),
            tests: HashMap::new(),
            artifacts: HashMap::new(),
            calls: HashMap::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeDeviceFarm {
    pub state: RefCell<FakeState>,
}

impl FakeDeviceFarm {
    pub fn project(&self) -> Project {
        self.state.borrow().projects[0].clone()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .borrow()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.borrow().calls.values().sum()
    }

    fn record(&self, operation: &'static str) {
        *self.state.borrow_mut().calls.entry(operation).or_default() += 1;
    }

    fn upload(&self, index: usize, status: UploadStatus) -> Upload {
        let state = self.state.borrow();
        let (name, upload_type) = &state.created_uploads[index];
        Upload {
            name: name.clone(),
            arn: format!("{ACCOUNT_ARN_PREFIX}:upload:{PROJECT_ID}/upload-{index}"),
            url: state.upload_url.clone(),
            content_type: Some("application/octet-stream".into()),
            upload_type: Some(upload_type.to_string()),
            status,
            category: Some(UploadCategory::Private),
            metadata: state.upload_metadata.clone(),
            message: None,
        }
    }
}

#[async_trait(?Send)]
impl DeviceFarmApi for FakeDeviceFarm {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.record("list_projects");
        Ok(self.state.borrow().projects.clone())
    }

    async fn list_device_pools(&self, _project_arn: &str) -> Result<Vec<DevicePool>> {
        self.record("list_device_pools");
        Ok(self.state.borrow().device_pools.clone())
    }

    async fn list_uploads(&self, _project_arn: &str) -> Result<Vec<Upload>> {
        self.record("list_uploads");
        Ok(self.state.borrow().uploads.clone())
    }

    async fn list_vpce_configurations(&self) -> Result<Vec<VpceConfiguration>> {
        self.record("list_vpce_configurations");
        let state = self.state.borrow();
        if state.vpce_error {
            bail!("AccessDeniedException: not authorized to list VPCE configurations");
        }
        Ok(state.vpce_configurations.clone())
    }

    async fn get_account_settings(&self) -> Result<Option<AccountSettings>> {
        self.record("get_account_settings");
        Ok(self.state.borrow().account_settings.clone())
    }

    async fn create_upload(
        &self,
        _project_arn: &str,
        name: &str,
        upload_type: UploadType,
        content_type: &str,
    ) -> Result<Upload> {
        self.record("create_upload");
        assert_eq!(content_type, "application/octet-stream");
        let index = {
            let mut state = self.state.borrow_mut();
            state.created_uploads.push((name.to_owned(), upload_type));
            state.created_uploads.len() - 1
        };
        Ok(self.upload(index, UploadStatus::Initializing))
    }

    async fn get_upload(&self, upload_arn: &str) -> Result<Upload> {
        self.record("get_upload");
        let index = upload_arn
            .rsplit_once("upload-")
            .and_then(|(_, index)| index.parse::<usize>().ok())
            .context("Unknown upload")?;
        let status = self
            .state
            .borrow_mut()
            .upload_statuses
            .pop_front()
            .unwrap_or(UploadStatus::Succeeded);
        Ok(self.upload(index, status))
    }

    async fn schedule_run(&self, request: &ScheduleRunRequest) -> Result<Run> {
        self.record("schedule_run");
        self.state.borrow_mut().scheduled.push(request.clone());
        let mut run = run_with("PENDING", None, Counters::default());
        run.name = request.name.clone();
        Ok(run)
    }

    async fn get_run(&self, _run_arn: &str) -> Result<Run> {
        self.record("get_run");
        let mut state = self.state.borrow_mut();
        let run = if state.runs.len() > 1 {
            state.runs.pop_front()
        } else {
            state.runs.front().cloned()
        };
        run.context("No run scripted")
    }

    async fn list_jobs(&self, _run_arn: &str) -> Result<Vec<Job>> {
        self.record("list_jobs");
        Ok(self.state.borrow().jobs.clone())
    }

    async fn list_suites(&self, job_arn: &str) -> Result<Vec<Suite>> {
        self.record("list_suites");
        Ok(self
            .state
            .borrow()
            .suites
            .get(job_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_tests(&self, suite_arn: &str) -> Result<Vec<Test>> {
        self.record("list_tests");
        Ok(self
            .state
            .borrow()
            .tests
            .get(suite_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_artifacts(
        &self,
        _run_arn: &str,
        category: ArtifactCategory,
    ) -> Result<Vec<Artifact>> {
        self.record("list_artifacts");
        Ok(self
            .state
            .borrow()
            .artifacts
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }
}
