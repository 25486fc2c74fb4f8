use std::collections::BTreeMap;

use crate::error::DeviceFarmError;
use crate::prelude::*;
use crate::run::{DeviceSettings, JobSettings, RunArgs};
use crate::schedule::{BillingMethod, CustomerArtifactPaths, TestSettings, DEFAULT_JOB_TIMEOUT_MINUTES};

use super::{JobConfig, RunOptions, TestOptions};

/// Handles merging of CLI arguments with the job file
///
/// Implements the precedence rule: CLI > job file > default
pub struct ConfigMerger;

impl ConfigMerger {
    pub fn merge(cli: &RunArgs, config: Option<&JobConfig>) -> Result<JobSettings> {
        let default_config = JobConfig::default();
        let config = config.unwrap_or(&default_config);
        let default_run = RunOptions::default();
        let run = config.run.as_ref().unwrap_or(&default_run);

        let devices = match (&cli.device_pool, &config.device_pool, &config.device_selection) {
            (Some(pool), _, _) | (None, Some(pool), _) => DeviceSettings::Pool(pool.clone()),
            (None, None, Some(selection)) => DeviceSettings::Selection(selection.clone()),
            (None, None, None) => DeviceSettings::Pool(String::new()),
        };

        let mut job = JobSettings::new(
            Self::merge_option(&cli.project, config.project.as_ref()).unwrap_or_default(),
            devices,
            Self::merge_test(cli, config.test.as_ref())?,
        );
        job.app = Self::merge_option(&cli.app, config.app.as_ref());
        job.is_web_app = cli.web_app || config.web_app.unwrap_or(false);
        job.run_name = Self::merge_option(&cli.run_name, config.run_name.as_ref());

        job.job_timeout_minutes = cli
            .job_timeout_minutes
            .or(run.job_timeout_minutes)
            .unwrap_or(DEFAULT_JOB_TIMEOUT_MINUTES);
        job.video_capture = !cli.no_video_capture && run.video_capture.unwrap_or(true);
        job.skip_app_resign = cli.skip_app_resign || run.skip_app_resign.unwrap_or(false);
        job.billing_method = if cli.unmetered || run.unmetered.unwrap_or(false) {
            BillingMethod::Unmetered
        } else {
            BillingMethod::Metered
        };
        job.extra_data = Self::merge_option(&cli.extra_data, run.extra_data.as_ref());
        job.vpce_service_name =
            Self::merge_option(&cli.vpce_service_name, run.vpce_service_name.as_ref());
        job.location = run.location;
        job.radios = run.radios;
        job.customer_artifact_paths = run.customer_artifact_paths.as_ref().map(|paths| {
            CustomerArtifactPaths::from_lists(paths.android.as_deref(), paths.ios.as_deref())
        });
        job.ignore_run_error = cli.ignore_run_error || run.ignore_run_error.unwrap_or(false);
        job.store_results = cli.store_results || run.store_results.unwrap_or(false);

        Ok(job)
    }

    fn merge_test(cli: &RunArgs, config: Option<&TestOptions>) -> Result<TestSettings> {
        let kind = cli
            .test_type
            .or(config.and_then(|test| test.kind))
            .ok_or_else(|| DeviceFarmError::configuration("A test type must be set."))?;

        let mut test = TestSettings::new(kind);
        test.package = Self::merge_option(&cli.test_package, config.and_then(|t| t.package.as_ref()));
        test.filter = Self::merge_option(&cli.test_filter, config.and_then(|t| t.filter.as_ref()));
        test.test_spec_name =
            Self::merge_option(&cli.test_spec, config.and_then(|t| t.spec.as_ref()));
        test.app_performance_monitoring = !cli.no_app_performance_monitoring
            && config
                .and_then(|t| t.app_performance_monitoring)
                .unwrap_or(true);

        let mut parameters = BTreeMap::new();
        if let Some(config) = config {
            for (key, value) in &config.parameters {
                parameters.insert(key.clone(), Self::scalar_to_string(key, value)?);
            }
        }
        for (key, value) in &cli.test_parameters {
            parameters.insert(key.clone(), value.clone());
        }
        test.parameters = parameters;

        Ok(test)
    }

    fn scalar_to_string(key: &str, value: &serde_yaml::Value) -> Result<String> {
        match value {
            serde_yaml::Value::String(value) => Ok(value.clone()),
            serde_yaml::Value::Number(value) => Ok(value.to_string()),
            serde_yaml::Value::Bool(value) => Ok(value.to_string()),
            _ => bail!("Test parameter '{key}' must be a scalar"),
        }
    }

    /// Helper to merge Option values with precedence: CLI > config > None
    fn merge_option<T: Clone>(cli_value: &Option<T>, config_value: Option<&T>) -> Option<T> {
        cli_value.clone().or_else(|| config_value.cloned())
    }
}
