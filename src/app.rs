use std::path::PathBuf;

use crate::{
    archive,
    config::{CredentialsConfig, DeviceFarmConfig},
    devicefarm::AwsDeviceFarmClient,
    list,
    local_logger::{DEVICEFARM_U8_COLOR_CODE, init_local_logger},
    prelude::*,
    run,
    verdict::BuildVerdict,
};
use clap::{
    Parser, Subcommand,
    builder::{Styles, styling},
};
use tokio_util::sync::CancellationToken;

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(
            styling::Ansi256Color(DEVICEFARM_U8_COLOR_CODE).on_default() | styling::Effects::BOLD,
        )
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Run mobile tests on AWS Device Farm from CI",
    styles = create_styles()
)]
pub struct Cli {
    /// The configuration name to use
    /// If provided, the configuration will be loaded from ~/.config/devicefarm/{config-name}.yaml
    /// Otherwise, loads from ~/.config/devicefarm/config.yaml
    #[arg(long, env = "DEVICEFARM_CONFIG_NAME", global = true)]
    pub config_name: Option<String>,

    /// IAM role assumed to call AWS Device Farm
    #[arg(long, env = "AWSDEVICEFARM_ROLE_ARN", global = true, hide_env_values = true)]
    pub role_arn: Option<String>,

    /// Access key pair used instead of a role. The `AWS_*` variables stay reserved for the base
    /// credentials a role is assumed with
    #[arg(long, env = "AWSDEVICEFARM_ACCESS_KEY_ID", global = true, hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWSDEVICEFARM_SECRET_KEY", global = true, hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Persist the credentials given on the command line to the configuration file
    #[arg(long, global = true)]
    pub save_credentials: bool,

    /// Exit code of an unstable build, when some tests warned
    #[arg(long, env = "DEVICEFARM_UNSTABLE_EXIT_CODE", global = true, default_value_t = 2)]
    pub unstable_exit_code: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload the artifacts, schedule a run on AWS Device Farm and wait for its verdict
    Run(Box<run::RunArgs>),
    /// Download the artifacts of a finished run
    Archive {
        /// ARN of the run
        run_arn: String,
        /// Directory receiving the results folder
        #[arg(long, default_value = ".")]
        dest: String,
    },
    /// List device farm resources
    List(list::ListArgs),
}

impl Cli {
    fn credential_overrides(&self) -> CredentialsConfig {
        CredentialsConfig {
            role_arn: self.role_arn.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}

pub fn exit_code(verdict: BuildVerdict, unstable_exit_code: i32) -> i32 {
    match verdict {
        BuildVerdict::Success => 0,
        BuildVerdict::Unstable => unstable_exit_code,
        BuildVerdict::Failure => 1,
    }
}

/// The first Ctrl-C cancels `cancellation`, interrupting any wait. The second one exits.
fn cancel_on_ctrl_c(cancellation: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, press Ctrl-C again to exit right away");
        cancellation.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Parses the command line and runs the command, returning the process exit code.
pub async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_local_logger()?;

    let config =
        DeviceFarmConfig::load_with_override(cli.config_name.as_deref(), &cli.credential_overrides())?;
    if cli.save_credentials {
        config.persist(cli.config_name.as_deref())?;
        info!("Credentials saved");
    }

    let cancellation = CancellationToken::new();
    cancel_on_ctrl_c(cancellation.clone());

    match cli.command {
        Commands::Run(args) => {
            let verdict = run::run(*args, &config, cancellation).await?;
            Ok(exit_code(verdict, cli.unstable_exit_code))
        }
        Commands::Archive { run_arn, dest } => {
            let api = AwsDeviceFarmClient::new(&config.aws_credentials()?).await?;
            // In the context of the CI, it is likely that a ~ made its way here without being expanded by the shell
            let dest = PathBuf::from(shellexpand::tilde(&dest).as_ref());
            let summary = archive::archive_run(&api, &run_arn, &dest).await?;
            info!(
                "{} artifacts downloaded, {} skipped",
                summary.downloaded, summary.skipped
            );
            Ok(0)
        }
        Commands::List(args) => {
            let api = AwsDeviceFarmClient::new(&config.aws_credentials()?).await?;
            list::run(args, &api).await?;
            Ok(0)
        }
    }
}
