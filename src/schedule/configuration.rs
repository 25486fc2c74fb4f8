use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::devicefarm::ExecutionConfiguration;

/// Job timeout the service applies when none is requested.
pub const DEFAULT_JOB_TIMEOUT_MINUTES: u32 = 60;
pub const DEFAULT_LOCALE: &str = "en_US";

lazy_static! {
    static ref PATH_SEPARATOR: Regex = Regex::new(r"\s*,\s*").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMethod {
    #[default]
    Metered,
    Unmetered,
}

impl BillingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMethod::Metered => "METERED",
            BillingMethod::Unmetered => "UNMETERED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Location {
    /// Seattle
    fn default() -> Self {
        Self {
            latitude: 47.6204,
            longitude: -122.3491,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Radios {
    pub bluetooth: bool,
    pub gps: bool,
    pub nfc: bool,
    pub wifi: bool,
}

impl Default for Radios {
    fn default() -> Self {
        Self {
            bluetooth: true,
            gps: true,
            nfc: true,
            wifi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerArtifactPaths {
    pub android_paths: Vec<String>,
    pub ios_paths: Vec<String>,
}

impl CustomerArtifactPaths {
    /// Builds the device-side paths to pull back after the run from comma separated lists.
    pub fn from_lists(android: Option<&str>, ios: Option<&str>) -> Self {
        Self {
            android_paths: android.map(split_path_list).unwrap_or_default(),
            ios_paths: ios.map(split_path_list).unwrap_or_default(),
        }
    }
}

/// Splits on commas, ignoring whitespace around each separator.
fn split_path_list(list: &str) -> Vec<String> {
    PATH_SEPARATOR.split(list).map(String::from).collect()
}

/// Device and billing settings of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub billing_method: BillingMethod,
    pub locale: String,
    /// Always empty, auxiliary apps are not supported
    pub auxiliary_apps: Vec<String>,
    pub location: Location,
    pub radios: Radios,
    pub customer_artifact_paths: Option<CustomerArtifactPaths>,
    pub vpce_configuration_arns: Option<Vec<String>>,
    pub extra_data_package_arn: Option<String>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            billing_method: BillingMethod::default(),
            locale: DEFAULT_LOCALE.to_owned(),
            auxiliary_apps: vec![],
            location: Location::default(),
            radios: Radios::default(),
            customer_artifact_paths: None,
            vpce_configuration_arns: None,
            extra_data_package_arn: None,
        }
    }
}

impl ExecutionConfiguration {
    /// The timeout is only overridden when it differs from the service default.
    pub fn new(job_timeout_minutes: u32, video_capture: bool, skip_app_resign: bool) -> Self {
        Self {
            job_timeout_minutes: (job_timeout_minutes != DEFAULT_JOB_TIMEOUT_MINUTES)
                .then_some(job_timeout_minutes),
            video_capture,
            skip_app_resign,
        }
    }
}
