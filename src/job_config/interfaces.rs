use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::devicefarm::DeviceSelection;
use crate::schedule::{Location, Radios, TestKind};

/// Job-level configuration from a devicefarm.yaml file
///
/// Describes what to run and where. CLI arguments always take precedence over these values.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    pub project: Option<String>,
    pub device_pool: Option<String>,
    /// Ad-hoc device filters, used instead of a device pool
    pub device_selection: Option<DeviceSelection>,
    /// Glob of the application to test, relative to the job file
    pub app: Option<String>,
    pub web_app: Option<bool>,
    /// May reference environment variables, e.g. `nightly-${BUILD_NUMBER}`
    pub run_name: Option<String>,
    pub test: Option<TestOptions>,
    pub run: Option<RunOptions>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TestOptions {
    #[serde(rename = "type")]
    pub kind: Option<TestKind>,
    /// Glob of the test package
    pub package: Option<String>,
    pub filter: Option<String>,
    /// Scalars only, numbers and booleans are sent as their string form
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    /// Name of a custom test spec upload
    pub spec: Option<String>,
    pub app_performance_monitoring: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RunOptions {
    pub job_timeout_minutes: Option<u32>,
    pub video_capture: Option<bool>,
    pub skip_app_resign: Option<bool>,
    pub unmetered: Option<bool>,
    /// Glob of a zip archive extracted on the devices
    pub extra_data: Option<String>,
    pub vpce_service_name: Option<String>,
    pub location: Option<Location>,
    pub radios: Option<Radios>,
    pub customer_artifact_paths: Option<ArtifactPathOptions>,
    pub ignore_run_error: Option<bool>,
    pub store_results: Option<bool>,
}

/// Comma separated device paths pulled back after the run
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactPathOptions {
    pub android: Option<String>,
    pub ios: Option<String>,
}
