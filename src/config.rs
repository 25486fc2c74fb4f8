use std::{env, fs, path::PathBuf};

use crate::error::DeviceFarmError;
use crate::prelude::*;
use nestify::nest;
use serde::{Deserialize, Serialize};

nest! {
    #[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent configuration of the device farm CLI.
    ///
    /// Stored at `~/.config/devicefarm/config.yaml` (XDG aware). It holds the AWS credentials
    /// shared by every job run from this machine, load it with
    /// [`DeviceFarmConfig::load_with_override`].
    pub struct DeviceFarmConfig {
        pub credentials: pub struct CredentialsConfig {
            pub role_arn: Option<String>,
            pub access_key_id: Option<String>,
            pub secret_access_key: Option<String>,
        }
    }
}

/// How the AWS client authenticates. Exactly one of the two is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwsCredentials {
    Role { role_arn: String },
    AccessKeys {
        access_key_id: String,
        secret_access_key: String,
    },
}

/// `~/.config/devicefarm/{config_name}.yaml`, `config.yaml` when no name is given.
fn get_configuration_file_path(config_name: Option<&str>) -> Result<PathBuf> {
    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = env::var("HOME").context("HOME env variable not set")?;
            PathBuf::from(home).join(".config")
        }
    };
    let config_dir = config_dir.join("devicefarm");

    Ok(match config_name {
        Some(name) => config_dir.join(format!("{name}.yaml")),
        None => config_dir.join("config.yaml"),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl DeviceFarmConfig {
    /// Loads the configuration, or a default one if the file does not exist.
    ///
    /// Every credential given in `overrides` replaces the stored one.
    pub fn load_with_override(
        config_name: Option<&str>,
        overrides: &CredentialsConfig,
    ) -> Result<Self> {
        let config_path = get_configuration_file_path(config_name)?;

        let mut config = match fs::read(&config_path) {
            Ok(config_str) => {
                let config: DeviceFarmConfig = serde_yaml::from_slice(&config_str).context(
                    format!("Failed to parse device farm config at {}", config_path.display()),
                )?;
                debug!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                DeviceFarmConfig::default()
            }
            Err(e) => bail!("Failed to load config: {e}"),
        };

        let credentials = &mut config.credentials;
        if overrides.role_arn.is_some() {
            credentials.role_arn = overrides.role_arn.clone();
        }
        if overrides.access_key_id.is_some() {
            credentials.access_key_id = overrides.access_key_id.clone();
        }
        if overrides.secret_access_key.is_some() {
            credentials.secret_access_key = overrides.secret_access_key.clone();
        }

        Ok(config)
    }

    pub fn persist(&self, config_name: Option<&str>) -> Result<()> {
        let config_path = get_configuration_file_path(config_name)?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_str = serde_yaml::to_string(self)?;
        fs::write(&config_path, config_str)?;
        debug!("Config written to {}", config_path.display());

        Ok(())
    }

    /// Picks the role ARN or the access key pair, rejecting anything ambiguous.
    pub fn aws_credentials(&self) -> Result<AwsCredentials> {
        let credentials = &self.credentials;
        let role_arn = non_empty(&credentials.role_arn);
        let access_key_id = non_empty(&credentials.access_key_id);
        let secret_access_key = non_empty(&credentials.secret_access_key);

        match (role_arn, access_key_id, secret_access_key) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(DeviceFarmError::configuration(
                "Either IAM Role ARN or AKID/SKID must be set, not both.",
            )
            .into()),
            (Some(role_arn), None, None) => {
                if !role_arn.starts_with("arn:") {
                    return Err(DeviceFarmError::configuration(format!(
                        "Invalid IAM Role ARN '{role_arn}'"
                    ))
                    .into());
                }
                Ok(AwsCredentials::Role {
                    role_arn: role_arn.to_owned(),
                })
            }
            (None, Some(access_key_id), Some(secret_access_key)) => Ok(AwsCredentials::AccessKeys {
                access_key_id: access_key_id.to_owned(),
                secret_access_key: secret_access_key.to_owned(),
            }),
            _ => Err(DeviceFarmError::configuration(
                "Either IAM Role ARN or AKID/SKID must be set.",
            )
            .into()),
        }
    }
}
