use crate::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

mod interfaces;
pub mod merger;

pub use interfaces::*;

/// Job file names in priority order
const CONFIG_FILENAMES: &[&str] = &[
    "devicefarm.yaml",
    "devicefarm.yml",
    ".devicefarm.yaml",
    ".devicefarm.yml",
];

/// A job file and where it was found. Artifact globs resolve from its directory.
#[derive(Debug)]
pub struct DiscoveredJobConfig {
    pub config: JobConfig,
    pub path: PathBuf,
}

impl DiscoveredJobConfig {
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

impl JobConfig {
    /// Discover and load the job file
    ///
    /// An explicit `config_path_override` must exist. Otherwise the file names are tried in
    /// priority order in `current_dir`, then in each parent up to the repository root.
    /// Returns `Ok(None)` when nothing is found.
    pub fn discover_and_load(
        config_path_override: Option<&Path>,
        current_dir: &Path,
    ) -> Result<Option<DiscoveredJobConfig>> {
        if let Some(config_path) = config_path_override {
            let config = Self::load_from_path(config_path)
                .with_context(|| format!("Failed to load job config from {}", config_path.display()))?;
            let path = config_path
                .canonicalize()
                .unwrap_or_else(|_| config_path.to_path_buf());
            return Ok(Some(DiscoveredJobConfig { config, path }));
        }

        for dir in Self::get_search_directories(current_dir) {
            for filename in CONFIG_FILENAMES {
                let candidate_path = dir.join(filename);
                if candidate_path.exists() {
                    debug!("Found job config at {}", candidate_path.display());
                    let config = Self::load_from_path(&candidate_path)?;
                    let path = candidate_path.canonicalize().unwrap_or(candidate_path);
                    return Ok(Some(DiscoveredJobConfig { config, path }));
                }
            }
        }

        Ok(None)
    }

    /// `current_dir`, then its parents up to the repository root when inside one
    fn get_search_directories(current_dir: &Path) -> Vec<PathBuf> {
        let mut dirs = vec![current_dir.to_path_buf()];

        if let Some(repository_root) = crate::run::helpers::find_repository_root(current_dir) {
            let start = current_dir
                .canonicalize()
                .unwrap_or_else(|_| current_dir.to_path_buf());
            for parent in start.ancestors().skip(1) {
                if !parent.starts_with(&repository_root) {
                    break;
                }
                dirs.push(parent.to_path_buf());
            }
        }

        dirs
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let config_content = fs::read(path)
            .with_context(|| format!("Failed to read job config at {}", path.display()))?;

        let config: Self = serde_yaml::from_slice(&config_content)
            .with_context(|| format!("Failed to parse job config at {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.device_pool.is_some() && self.device_selection.is_some() {
            bail!("Invalid job config: set either device-pool or device-selection, not both");
        }
        if let Some(test) = &self.test {
            for (key, value) in &test.parameters {
                if !matches!(
                    value,
                    serde_yaml::Value::String(_)
                        | serde_yaml::Value::Number(_)
                        | serde_yaml::Value::Bool(_)
                ) {
                    bail!("Invalid job config: test parameter '{key}' must be a scalar");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TestKind;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
project: demo
device-pool: Top Devices
app: app/build/outputs/apk/**/*.apk
run-name: nightly-${BUILD_NUMBER}
test:
  type: INSTRUMENTATION
  package: app/build/outputs/apk/androidTest/**/*.apk
  filter: com.example.LoginTest
run:
  job-timeout-minutes: 90
  unmetered: true
  video-capture: false
  radios:
    bluetooth: false
    gps: true
    nfc: true
    wifi: true
  customer-artifact-paths:
    android: /sdcard/logs, /sdcard/screens
"#;

    #[test]
    fn test_deserialize_full_config() {
        let config: JobConfig = serde_yaml::from_str(FULL_CONFIG).unwrap();

        assert_eq!(config.project.as_deref(), Some("demo"));
        assert_eq!(config.device_pool.as_deref(), Some("Top Devices"));
        let test = config.test.unwrap();
        assert_eq!(test.kind, Some(TestKind::Instrumentation));
        assert_eq!(test.filter.as_deref(), Some("com.example.LoginTest"));
        let run = config.run.unwrap();
        assert_eq!(run.job_timeout_minutes, Some(90));
        assert_eq!(run.video_capture, Some(false));
        assert!(!run.radios.unwrap().bluetooth);
        assert_eq!(
            run.customer_artifact_paths.unwrap().android.as_deref(),
            Some("/sdcard/logs, /sdcard/screens")
        );
    }

    #[test]
    fn test_deserialize_device_selection_and_parameters() {
        let yaml = r#"
project: demo
device-selection:
  max-devices: 2
  filters:
    - attribute: PLATFORM
      operator: EQUALS
      values: [ANDROID]
test:
  type: BUILTIN_FUZZ
  parameters:
    event_count: 6000
    throttle: "50"
"#;
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let selection = config.device_selection.unwrap();
        assert_eq!(selection.max_devices, Some(2));
        assert_eq!(selection.filters[0].values, vec!["ANDROID"]);
        assert_eq!(config.test.unwrap().parameters.len(), 2);
    }

    #[test]
    fn test_validate_pool_and_selection_conflict() {
        let yaml = r#"
device-pool: Top Devices
device-selection:
  max-devices: 2
"#;
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("not both")
        );
    }

    #[test]
    fn test_validate_rejects_nested_parameter() {
        let yaml = r#"
test:
  type: CALABASH
  parameters:
    tags: [smoke, login]
"#;
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_path_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("devicefarm.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        assert!(JobConfig::load_from_path(&config_path).is_err());
    }

    #[test]
    fn test_discover_with_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("android-job.yaml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let discovered = JobConfig::discover_and_load(Some(&config_path), Path::new("/"))
            .unwrap()
            .unwrap();

        assert_eq!(discovered.config.project.as_deref(), Some("demo"));
        assert_eq!(discovered.directory(), temp_dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_with_explicit_path_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("missing.yaml");

        assert!(JobConfig::discover_and_load(Some(&config_path), temp_dir.path()).is_err());
    }

    #[test]
    fn test_discover_priority_yaml_over_yml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("devicefarm.yaml"), "project: from-yaml").unwrap();
        fs::write(temp_dir.path().join("devicefarm.yml"), "project: from-yml").unwrap();

        let discovered = JobConfig::discover_and_load(None, temp_dir.path())
            .unwrap()
            .unwrap();

        assert_eq!(discovered.config.project.as_deref(), Some("from-yaml"));
    }

    #[test]
    fn test_discover_up_to_repository_root() {
        let temp_dir = TempDir::new().unwrap();
        let repository = temp_dir.path().join("mobile-app");
        let nested = repository.join("android").join("app");
        fs::create_dir_all(repository.join(".git")).unwrap();
        fs::create_dir_all(&nested).unwrap();
        fs::write(repository.join(".devicefarm.yml"), "project: demo").unwrap();
        // Outside of the repository, never reached
        fs::write(temp_dir.path().join("devicefarm.yaml"), "project: other").unwrap();

        let discovered = JobConfig::discover_and_load(None, &nested).unwrap().unwrap();

        assert_eq!(discovered.config.project.as_deref(), Some("demo"));
        assert_eq!(discovered.directory(), repository.canonicalize().unwrap());
    }

    #[test]
    fn test_discover_outside_repository_checks_current_dir_only() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("devicefarm.yaml"), "project: demo").unwrap();

        assert!(JobConfig::discover_and_load(None, &nested).unwrap().is_none());
    }
}
