use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::schedule::{RunConfiguration, ScheduleRunTest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePool {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpceConfiguration {
    pub arn: String,
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Initializing,
    Processing,
    Succeeded,
    Failed,
    Other(String),
}

impl UploadStatus {
    pub fn from_remote(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "INITIALIZED" | "INITIALIZING" => UploadStatus::Initializing,
            "PROCESSING" => UploadStatus::Processing,
            "SUCCEEDED" => UploadStatus::Succeeded,
            "FAILED" => UploadStatus::Failed,
            _ => UploadStatus::Other(status.to_owned()),
        }
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Initializing => write!(f, "INITIALIZED"),
            UploadStatus::Processing => write!(f, "PROCESSING"),
            UploadStatus::Succeeded => write!(f, "SUCCEEDED"),
            UploadStatus::Failed => write!(f, "FAILED"),
            UploadStatus::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Who authored an upload. Curated uploads are provided by the service on every account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadCategory {
    Curated,
    Private,
    Other(String),
}

impl UploadCategory {
    pub fn from_remote(category: &str) -> Self {
        match category {
            "CURATED" => UploadCategory::Curated,
            "PRIVATE" => UploadCategory::Private,
            other => UploadCategory::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub arn: String,
    /// Short-lived signed URL the payload must be PUT to
    pub url: Option<String>,
    pub content_type: Option<String>,
    /// Remote upload type tag, e.g. `ANDROID_APP` or `APPIUM_NODE_TEST_SPEC`
    pub upload_type: Option<String>,
    pub status: UploadStatus,
    pub category: Option<UploadCategory>,
    pub metadata: Option<String>,
    pub message: Option<String>,
}

impl Upload {
    /// Diagnostic details reported by the service when processing fails.
    pub fn diagnostics(&self) -> Option<String> {
        match (&self.metadata, &self.message) {
            (Some(metadata), Some(message)) => Some(format!("{message} {metadata}")),
            (Some(details), None) | (None, Some(details)) => Some(details.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionResult {
    Passed,
    Warned,
    Failed,
    Skipped,
    Errored,
    Stopped,
}

impl ExecutionResult {
    /// Parses the remote result; `PENDING` and unknown values are "no result yet".
    pub fn from_remote(result: &str) -> Option<Self> {
        match result.to_ascii_uppercase().as_str() {
            "PASSED" => Some(ExecutionResult::Passed),
            "WARNED" => Some(ExecutionResult::Warned),
            "FAILED" => Some(ExecutionResult::Failed),
            "SKIPPED" => Some(ExecutionResult::Skipped),
            "ERRORED" => Some(ExecutionResult::Errored),
            "STOPPED" => Some(ExecutionResult::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionResult::Passed => "PASSED",
            ExecutionResult::Warned => "WARNED",
            ExecutionResult::Failed => "FAILED",
            ExecutionResult::Skipped => "SKIPPED",
            ExecutionResult::Errored => "ERRORED",
            ExecutionResult::Stopped => "STOPPED",
        }
    }
}

impl Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-run test counters.
///
/// `stopped` is optional: the service does not always report it, and absent
/// only means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub passed: u32,
    pub warned: u32,
    pub failed: u32,
    pub errored: u32,
    pub skipped: u32,
    pub stopped: Option<u32>,
    pub total: u32,
}

impl Counters {
    pub fn stopped_or_zero(&self) -> u32 {
        self.stopped.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub arn: String,
    pub name: String,
    /// Remote execution status, e.g. `PENDING`, `RUNNING` or `COMPLETED`
    pub status: String,
    pub result: Option<ExecutionResult>,
    pub counters: Counters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub arn: String,
    pub name: String,
    /// OS version of the device the job ran on
    pub os: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub arn: String,
    pub name: String,
    pub extension: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    File,
    Log,
    Screenshot,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 3] = [
        ArtifactCategory::File,
        ArtifactCategory::Log,
        ArtifactCategory::Screenshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::File => "FILE",
            ArtifactCategory::Log => "LOG",
            ArtifactCategory::Screenshot => "SCREENSHOT",
        }
    }
}

impl Display for ArtifactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePlatform {
    Android,
    Ios,
}

impl Display for DevicePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePlatform::Android => write!(f, "Android"),
            DevicePlatform::Ios => write!(f, "IOS"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSettings {
    pub unmetered_android_slots: u32,
    pub unmetered_ios_slots: u32,
}

impl AccountSettings {
    pub fn unmetered_slots(&self, platform: DevicePlatform) -> u32 {
        match platform {
            DevicePlatform::Android => self.unmetered_android_slots,
            DevicePlatform::Ios => self.unmetered_ios_slots,
        }
    }

    /// Web apps can run on either platform, so the best of both counts.
    pub fn unmetered_slots_for_web(&self) -> u32 {
        self.unmetered_android_slots.max(self.unmetered_ios_slots)
    }
}

/// Rule narrowing the devices a run may be scheduled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceFilter {
    /// e.g. `PLATFORM`, `OS_VERSION`, `MODEL`
    pub attribute: String,
    /// e.g. `EQUALS`, `IN`, `GREATER_THAN_OR_EQUALS`
    pub operator: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceSelection {
    #[serde(default)]
    pub filters: Vec<DeviceFilter>,
    pub max_devices: Option<u32>,
}

/// Where a run executes: a named pool or an ad-hoc device selection, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    Pool(String),
    Selection(DeviceSelection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfiguration {
    /// Only set when it differs from the service default
    pub job_timeout_minutes: Option<u32>,
    pub video_capture: bool,
    pub skip_app_resign: bool,
}

/// Fully resolved schedule-run call, as sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRunRequest {
    pub project_arn: String,
    pub name: String,
    pub app_arn: Option<String>,
    pub device_target: DeviceTarget,
    pub test: ScheduleRunTest,
    pub configuration: RunConfiguration,
    pub execution: ExecutionConfiguration,
}
