use std::path::{Path, PathBuf};

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::archive::archive_run;
use crate::artifact::Workspace;
use crate::config::DeviceFarmConfig;
use crate::devicefarm::{
    find_device_pool, find_project, AwsDeviceFarmClient, DeviceFarmApi, DeviceTarget,
};
use crate::job_config::merger::ConfigMerger;
use crate::job_config::JobConfig;
use crate::poll::{RunPoller, TestResultSnapshot};
use crate::prelude::*;
use crate::schedule::{BillingMethod, RunHandle, RunRequest, RunScheduler, TestKind};
use crate::upload::{ArtifactPurpose, UploadType};
use crate::verdict::BuildVerdict;

pub mod helpers;
mod settings;

pub use settings::{DeviceSettings, JobSettings, MAX_JOB_TIMEOUT_MINUTES, MIN_JOB_TIMEOUT_MINUTES};

/// Overrides the project of the job when set and non-empty.
pub const PROJECT_OVERRIDE_VAR: &str = "AWSDEVICEFARM_PROJECT";
/// Overrides the device pool of the job when set.
pub const DEVICE_POOL_OVERRIDE_VAR: &str = "AWSDEVICEFARM_DEVICE_POOL";
pub const BUILD_TAG_VAR: &str = "BUILD_TAG";
pub const DEFAULT_RUN_NAME: &str = "devicefarm-run";
const STAGING_DIR_NAME: &str = ".devicefarm";

fn parse_key_value(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to the job file. Otherwise devicefarm.yaml is looked up from the current directory
    /// to the repository root
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Name of the device farm project
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the device pool to run on
    #[arg(long)]
    pub device_pool: Option<String>,

    /// Glob of the application to test (.apk, .ipa or .zip)
    #[arg(long)]
    pub app: Option<String>,

    /// Test a web app, no application is uploaded
    #[arg(long)]
    pub web_app: bool,

    /// Name of the run, defaults to $BUILD_TAG
    #[arg(long)]
    pub run_name: Option<String>,

    #[arg(long, value_enum)]
    pub test_type: Option<TestKind>,

    /// Glob of the test package
    #[arg(long)]
    pub test_package: Option<String>,

    /// Filter of the tests to run, for instrumentation and XCTest kinds only
    #[arg(long)]
    pub test_filter: Option<String>,

    /// Test parameter as KEY=VALUE, may be repeated
    #[arg(long = "test-parameter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub test_parameters: Vec<(String, String)>,

    /// Name of a custom test spec to run the tests with
    #[arg(long)]
    pub test_spec: Option<String>,

    #[arg(long)]
    pub no_app_performance_monitoring: bool,

    /// Maximum duration of each device job, from 5 to 600 minutes
    #[arg(long)]
    pub job_timeout_minutes: Option<u32>,

    #[arg(long)]
    pub no_video_capture: bool,

    #[arg(long)]
    pub skip_app_resign: bool,

    /// Run on the unmetered device slots of the account
    #[arg(long)]
    pub unmetered: bool,

    /// Glob of a zip archive extracted on the devices
    #[arg(long)]
    pub extra_data: Option<String>,

    /// Attach the run to this VPC endpoint service, when the account has VPC configurations
    #[arg(long)]
    pub vpce_service_name: Option<String>,

    /// Judge an errored run on its test counters
    #[arg(long)]
    pub ignore_run_error: bool,

    /// Download the artifacts of the run once it is complete
    #[arg(long)]
    pub store_results: bool,

    /// Where stored results are written, defaults to the job directory
    #[arg(long)]
    pub results_dir: Option<PathBuf>,
}

/// A completed run and how the build should be judged.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: RunHandle,
    pub snapshot: TestResultSnapshot,
    pub verdict: BuildVerdict,
}

fn apply_overrides(job: &mut JobSettings, workspace: &Workspace) {
    if let Some(project) = workspace.var(PROJECT_OVERRIDE_VAR).filter(|p| !p.is_empty()) {
        info!("Using overloaded project '{project}' from build parameters");
        job.project = project.to_owned();
    }
    if let Some(pool) = workspace.var(DEVICE_POOL_OVERRIDE_VAR) {
        info!("Using overloaded device pool '{pool}' from build parameters");
        job.devices = DeviceSettings::Pool(pool.to_owned());
    }
}

fn run_name(job: &JobSettings, workspace: &Workspace) -> String {
    match job.run_name.as_deref().filter(|name| !name.trim().is_empty()) {
        Some(name) => workspace.expand(name),
        None => workspace
            .var(BUILD_TAG_VAR)
            .unwrap_or(DEFAULT_RUN_NAME)
            .to_owned(),
    }
}

/// Uploads the job's artifacts, schedules the run, waits for it and judges it.
pub async fn schedule_and_wait(
    api: &dyn DeviceFarmApi,
    job: &JobSettings,
    workspace: &Workspace,
    cancellation: CancellationToken,
) -> Result<RunOutcome> {
    let mut job = job.clone();
    apply_overrides(&mut job, workspace);
    job.validate()?;

    let scheduler = RunScheduler::new(api, cancellation.clone());

    if job.billing_method == BillingMethod::Unmetered {
        let platform = match (job.is_web_app, job.app.as_deref()) {
            (false, Some(app)) => UploadType::for_app(Path::new(&workspace.expand(app)))?.platform(),
            _ => None,
        };
        scheduler.check_unmetered_slots(platform).await?;
    }

    info!("Using Project '{}'", job.project);
    let project = find_project(api, &job.project).await?;

    let device_target = match &job.devices {
        DeviceSettings::Pool(name) => {
            info!("Using DevicePool '{name}'");
            DeviceTarget::Pool(find_device_pool(api, &project, name).await?.arn)
        }
        DeviceSettings::Selection(selection) => {
            info!(
                "Using a device selection of up to {} devices",
                selection.max_devices.unwrap_or_default()
            );
            DeviceTarget::Selection(selection.clone())
        }
    };

    let app_arn = match job.app.as_deref() {
        _ if job.is_web_app => {
            info!("Testing a Web App.");
            None
        }
        Some(app) => {
            info!("Using App '{}'", workspace.expand(app));
            let upload = scheduler
                .uploads()
                .upload_artifact(&project, workspace, app, ArtifactPurpose::App)
                .await?;
            Some(upload.arn)
        }
        None => None,
    };

    let name = run_name(&job, workspace);

    info!("Getting test to schedule.");
    let test = scheduler
        .build_test(&project, workspace, &job.test, job.is_web_app)
        .await?;

    let mut configuration = job.run_configuration();
    if let Some(extra_data) = job.extra_data.as_deref() {
        info!("Using Extra Data '{}'", workspace.expand(extra_data));
        let upload = scheduler
            .uploads()
            .upload_artifact(&project, workspace, extra_data, ArtifactPurpose::ExtraData)
            .await?;
        configuration.extra_data_package_arn = Some(upload.arn);
    }

    let handle = scheduler
        .schedule(
            &project,
            RunRequest {
                name,
                app_arn,
                is_web_app: job.is_web_app,
                device_target,
                test,
                job_timeout_minutes: job.job_timeout_minutes,
                configuration,
                video_capture: job.video_capture,
                skip_app_resign: job.skip_app_resign,
                vpce_service_name: job.vpce_service_name.clone(),
            },
        )
        .await?;

    info!("Waiting for test run to complete.");
    let snapshot = RunPoller::new(api, cancellation)
        .wait_for_completion(&handle.arn)
        .await?;
    info!("Test run is complete.");

    let verdict = snapshot.verdict(job.ignore_run_error);
    Ok(RunOutcome {
        run: handle,
        snapshot,
        verdict,
    })
}

pub async fn run(
    args: RunArgs,
    config: &DeviceFarmConfig,
    cancellation: CancellationToken,
) -> Result<BuildVerdict> {
    let current_dir = std::env::current_dir()?;
    let discovered = JobConfig::discover_and_load(args.config.as_deref(), &current_dir)?;
    let job_dir = match &discovered {
        Some(discovered) => {
            info!("Using job config {}", discovered.path.display());
            discovered.directory().to_path_buf()
        }
        None => current_dir,
    };
    let job = ConfigMerger::merge(&args, discovered.as_ref().map(|d| &d.config))?;
    debug!("job: {job:#?}");

    let workspace = Workspace::new(&job_dir, job_dir.join(STAGING_DIR_NAME))
        .with_env(std::env::vars().collect());

    let api = AwsDeviceFarmClient::new(&config.aws_credentials()?).await?;

    start_opened_group!("Running the tests on AWS Device Farm");
    let outcome = schedule_and_wait(&api, &job, &workspace, cancellation).await?;
    end_group!();

    info!(
        "Run {} is {}:\n{}",
        outcome.snapshot.run_name,
        outcome.snapshot.display_status(),
        helpers::build_counters_table(&outcome.snapshot)
    );

    if job.store_results {
        start_group!("Storing the results");
        let results_dir = args
            .results_dir
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref()))
            .unwrap_or(job_dir);
        archive_run(&api, &outcome.run.arn, &results_dir).await?;
        end_group!();
    }

    info!("Build verdict: {}", outcome.verdict);
    Ok(outcome.verdict)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::devicefarm::fake::{run_with, FakeDeviceFarm};
    use crate::devicefarm::{AccountSettings, Counters, DeviceSelection, ExecutionResult};
    use crate::error::{error_kind, DeviceFarmError};
    use crate::http_stub::HttpStub;
    use crate::schedule::{TestSettings, DEFAULT_JOB_TIMEOUT_MINUTES};

    struct Setup {
        stub: HttpStub,
        fake: FakeDeviceFarm,
        dir: tempfile::TempDir,
    }

    async fn setup(result: ExecutionResult, counters: Counters) -> Setup {
        let stub = HttpStub::start().await;
        let fake = FakeDeviceFarm::default();
        {
            let mut state = fake.state.borrow_mut();
            state.upload_url = Some(stub.route("/signed", 200, ""));
            state.runs = [run_with("COMPLETED", Some(result), counters)].into();
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app/build")).unwrap();
        std::fs::write(dir.path().join("app/build/app-debug.apk"), "apk").unwrap();
        std::fs::write(dir.path().join("app/build/app-androidTest.apk"), "tests").unwrap();
        Setup { stub, fake, dir }
    }

    fn workspace(setup: &Setup, env: &[(&str, &str)]) -> Workspace {
        Workspace::new(setup.dir.path(), setup.dir.path().join(".devicefarm")).with_env(
            env.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn instrumentation_job() -> JobSettings {
        let mut test = TestSettings::new(TestKind::Instrumentation);
        test.package = Some("app/build/*-androidTest.apk".into());
        let mut job = JobSettings::new("demo", DeviceSettings::Pool("Top Devices".into()), test);
        job.app = Some("app/build/app-debug.apk".into());
        job
    }

    #[tokio::test]
    async fn test_schedule_and_wait_passed_run() {
        let setup = setup(
            ExecutionResult::Passed,
            Counters {
                passed: 10,
                total: 10,
                ..Default::default()
            },
        )
        .await;
        let workspace = workspace(&setup, &[("BUILD_TAG", "jenkins-android-42")]);

        let outcome = schedule_and_wait(
            &setup.fake,
            &instrumentation_job(),
            &workspace,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.verdict, BuildVerdict::Success);
        assert!(outcome.snapshot.is_completed());
        let state = setup.fake.state.borrow();
        assert_eq!(
            state.created_uploads,
            vec![
                ("app-debug.apk".to_string(), UploadType::AndroidApp),
                (
                    "app-androidTest.apk".to_string(),
                    UploadType::TestPackage(TestKind::Instrumentation)
                ),
            ]
        );
        let scheduled = &state.scheduled[0];
        assert_eq!(scheduled.name, "jenkins-android-42");
        assert_eq!(
            scheduled.device_target,
            DeviceTarget::Pool(state.device_pools[0].arn.clone())
        );
        assert!(scheduled.app_arn.is_some());
        assert!(scheduled.test.test_package_arn.is_some());
        assert_eq!(scheduled.execution.job_timeout_minutes, None);
        assert_eq!(setup.stub.requests().len(), 2);
        assert!(setup.dir.path().join(".devicefarm/app-debug.apk").is_file());
    }

    #[tokio::test]
    async fn test_skipped_tests_fail_a_warned_run() {
        let setup = setup(
            ExecutionResult::Warned,
            Counters {
                passed: 7,
                warned: 1,
                skipped: 3,
                total: 11,
                ..Default::default()
            },
        )
        .await;
        let mut job = instrumentation_job();
        job.run_name = Some("nightly-${BUILD_NUMBER}".into());

        let outcome = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[("BUILD_NUMBER", "7")]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.verdict, BuildVerdict::Failure);
        assert_eq!(setup.fake.state.borrow().scheduled[0].name, "nightly-7");
    }

    #[tokio::test]
    async fn test_ignored_run_error_judged_on_counters() {
        let setup = setup(
            ExecutionResult::Errored,
            Counters {
                passed: 5,
                failed: 2,
                stopped: Some(0),
                total: 7,
                ..Default::default()
            },
        )
        .await;
        let mut job = instrumentation_job();
        job.ignore_run_error = true;

        let outcome = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.verdict, BuildVerdict::Failure);
        assert_eq!(setup.fake.state.borrow().scheduled[0].name, DEFAULT_RUN_NAME);
    }

    #[tokio::test]
    async fn test_invalid_device_selection_makes_no_call() {
        let setup = setup(ExecutionResult::Passed, Counters::default()).await;
        let mut job = instrumentation_job();
        job.devices = DeviceSettings::Selection(DeviceSelection {
            filters: vec![],
            max_devices: Some(0),
        });

        let err = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error_kind(&err),
            Some(DeviceFarmError::InvalidDeviceSelection)
        ));
        assert_eq!(setup.fake.total_calls(), 0);
        assert!(setup.stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_build_parameter_overrides() {
        let setup = setup(ExecutionResult::Passed, Counters::default()).await;
        {
            let mut state = setup.fake.state.borrow_mut();
            let mut staging = state.projects[0].clone();
            staging.name = "staging".into();
            state.projects.push(staging);
        }
        let mut job = instrumentation_job();
        job.project = "unknown".into();
        job.devices = DeviceSettings::Pool("unknown".into());

        let ok = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(
                &setup,
                &[
                    ("AWSDEVICEFARM_PROJECT", "staging"),
                    ("AWSDEVICEFARM_DEVICE_POOL", "Top Devices"),
                ],
            ),
            CancellationToken::new(),
        )
        .await;
        assert!(ok.is_ok(), "{ok:?}");

        let err = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[("AWSDEVICEFARM_PROJECT", "")]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Project 'unknown' not found.");
    }

    #[tokio::test]
    async fn test_unmetered_run_without_slots() {
        let setup = setup(ExecutionResult::Passed, Counters::default()).await;
        let mut job = instrumentation_job();
        job.billing_method = BillingMethod::Unmetered;

        let err = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unmetered Android device slots"));
        assert_eq!(setup.fake.calls("create_upload"), 0);

        setup.fake.state.borrow_mut().account_settings = Some(AccountSettings {
            unmetered_android_slots: 1,
            unmetered_ios_slots: 0,
        });
        let outcome = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            setup.fake.state.borrow().scheduled[0]
                .configuration
                .billing_method,
            BillingMethod::Unmetered
        );
        assert_eq!(outcome.verdict, BuildVerdict::Success);
    }

    #[tokio::test]
    async fn test_web_app_with_extra_data() {
        let setup = setup(ExecutionResult::Passed, Counters::default()).await;
        std::fs::write(setup.dir.path().join("fixtures.zip"), "zip").unwrap();
        std::fs::write(setup.dir.path().join("tests.zip"), "zip").unwrap();
        let mut test = TestSettings::new(TestKind::AppiumNode);
        test.package = Some("tests.zip".into());
        let mut job = JobSettings::new("demo", DeviceSettings::Pool("Top Devices".into()), test);
        job.is_web_app = true;
        job.extra_data = Some("*.zip".into());
        job.job_timeout_minutes = DEFAULT_JOB_TIMEOUT_MINUTES;

        // Two zips match the extra data glob
        let err = schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            error_kind(&err),
            Some(DeviceFarmError::Ambiguous { .. })
        ));

        job.extra_data = Some("fixtures.zip".into());
        schedule_and_wait(
            &setup.fake,
            &job,
            &workspace(&setup, &[]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let state = setup.fake.state.borrow();
        let scheduled = state.scheduled.last().unwrap();
        assert_eq!(scheduled.app_arn, None);
        assert_eq!(scheduled.test.kind, TestKind::AppiumWebNode);
        assert!(scheduled.configuration.extra_data_package_arn.is_some());
        assert_eq!(
            state.created_uploads.last().unwrap(),
            &("fixtures.zip".to_string(), UploadType::ExternalData)
        );
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("event_count=6000").unwrap(),
            ("event_count".to_string(), "6000".to_string())
        );
        assert_eq!(
            parse_key_value("tags=@smoke=true").unwrap(),
            ("tags".to_string(), "@smoke=true".to_string())
        );
        assert!(parse_key_value("=6000").is_err());
        assert!(parse_key_value("event_count").is_err());
    }
}
