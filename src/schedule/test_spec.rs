use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DeviceFarmError;
use crate::prelude::*;

/// Parameter sent with every kind when app performance monitoring is turned off.
pub const APP_PERFORMANCE_MONITORING_PARAMETER: &str = "app_performance_monitoring";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    BuiltinFuzz,
    BuiltinExplorer,
    AppiumJavaJunit,
    AppiumJavaTestng,
    AppiumPython,
    AppiumRuby,
    AppiumNode,
    AppiumWebJavaJunit,
    AppiumWebJavaTestng,
    AppiumWebPython,
    AppiumWebRuby,
    AppiumWebNode,
    Calabash,
    Instrumentation,
    Uiautomator,
    Uiautomation,
    Xctest,
    XctestUi,
}

impl TestKind {
    pub const ALL: [TestKind; 18] = [
        TestKind::BuiltinFuzz,
        TestKind::BuiltinExplorer,
        TestKind::AppiumJavaJunit,
        TestKind::AppiumJavaTestng,
        TestKind::AppiumPython,
        TestKind::AppiumRuby,
        TestKind::AppiumNode,
        TestKind::AppiumWebJavaJunit,
        TestKind::AppiumWebJavaTestng,
        TestKind::AppiumWebPython,
        TestKind::AppiumWebRuby,
        TestKind::AppiumWebNode,
        TestKind::Calabash,
        TestKind::Instrumentation,
        TestKind::Uiautomator,
        TestKind::Uiautomation,
        TestKind::Xctest,
        TestKind::XctestUi,
    ];

    /// Remote test type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::BuiltinFuzz => "BUILTIN_FUZZ",
            TestKind::BuiltinExplorer => "BUILTIN_EXPLORER",
            TestKind::AppiumJavaJunit => "APPIUM_JAVA_JUNIT",
            TestKind::AppiumJavaTestng => "APPIUM_JAVA_TESTNG",
            TestKind::AppiumPython => "APPIUM_PYTHON",
            TestKind::AppiumRuby => "APPIUM_RUBY",
            TestKind::AppiumNode => "APPIUM_NODE",
            TestKind::AppiumWebJavaJunit => "APPIUM_WEB_JAVA_JUNIT",
            TestKind::AppiumWebJavaTestng => "APPIUM_WEB_JAVA_TESTNG",
            TestKind::AppiumWebPython => "APPIUM_WEB_PYTHON",
            TestKind::AppiumWebRuby => "APPIUM_WEB_RUBY",
            TestKind::AppiumWebNode => "APPIUM_WEB_NODE",
            TestKind::Calabash => "CALABASH",
            TestKind::Instrumentation => "INSTRUMENTATION",
            TestKind::Uiautomator => "UIAUTOMATOR",
            TestKind::Uiautomation => "UIAUTOMATION",
            TestKind::Xctest => "XCTEST",
            TestKind::XctestUi => "XCTEST_UI",
        }
    }

    /// Built-in kinds run without a test package and only carry inline parameters.
    pub fn is_builtin(&self) -> bool {
        matches!(self, TestKind::BuiltinFuzz | TestKind::BuiltinExplorer)
    }

    /// The `_WEB_` counterpart of an Appium kind. Any other kind, web variants included, is
    /// returned unchanged.
    pub fn for_web_app(self) -> Self {
        match self {
            TestKind::AppiumJavaJunit => TestKind::AppiumWebJavaJunit,
            TestKind::AppiumJavaTestng => TestKind::AppiumWebJavaTestng,
            TestKind::AppiumPython => TestKind::AppiumWebPython,
            TestKind::AppiumRuby => TestKind::AppiumWebRuby,
            TestKind::AppiumNode => TestKind::AppiumWebNode,
            other => other,
        }
    }

    /// The kind that is actually scheduled for this run.
    pub fn effective(self, is_web_app: bool) -> Self {
        if is_web_app { self.for_web_app() } else { self }
    }

    pub fn supports_filter(&self) -> bool {
        matches!(
            self,
            TestKind::Instrumentation | TestKind::Uiautomator | TestKind::Xctest | TestKind::XctestUi
        )
    }

    /// Parameter keys this kind accepts, on top of [`APP_PERFORMANCE_MONITORING_PARAMETER`].
    pub fn allowed_parameters(&self) -> &'static [&'static str] {
        match self {
            TestKind::BuiltinFuzz => &["event_count", "throttle", "seed"],
            TestKind::BuiltinExplorer => &["username", "password"],
            TestKind::AppiumJavaJunit
            | TestKind::AppiumJavaTestng
            | TestKind::AppiumPython
            | TestKind::AppiumWebJavaJunit
            | TestKind::AppiumWebJavaTestng
            | TestKind::AppiumWebPython => &["appium_version"],
            TestKind::Calabash => &["tags", "profile"],
            _ => &[],
        }
    }
}

impl Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown test type '{s}'"))
    }
}

/// Whether `candidate` names the kind that was selected, once both sides went through the
/// web substitution.
pub fn is_test_type(selected: TestKind, is_web_app: bool, candidate: TestKind) -> bool {
    selected.effective(is_web_app) == candidate.effective(is_web_app)
}

/// The test section of a schedule-run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRunTest {
    pub kind: TestKind,
    /// Absent for built-in kinds
    pub test_package_arn: Option<String>,
    pub test_spec_arn: Option<String>,
    pub filter: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

/// What the user asked to run, before anything is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSettings {
    pub kind: TestKind,
    /// Glob of the test package, required for every non built-in kind
    pub package: Option<String>,
    pub filter: Option<String>,
    pub parameters: BTreeMap<String, String>,
    /// Name of a custom test spec upload, runs in the standard environment when absent
    pub test_spec_name: Option<String>,
    pub app_performance_monitoring: bool,
}

impl TestSettings {
    pub fn new(kind: TestKind) -> Self {
        Self {
            kind,
            package: None,
            filter: None,
            parameters: BTreeMap::new(),
            test_spec_name: None,
            app_performance_monitoring: true,
        }
    }

    /// Checks everything that can be checked without talking to the service.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind;
        let package = self.package.as_deref().filter(|p| !p.trim().is_empty());

        if kind.is_builtin() {
            if package.is_some() {
                warn!("Ignoring the test package, {kind} runs without one");
            }
        } else {
            let Some(package) = package else {
                return Err(DeviceFarmError::configuration(format!(
                    "A test package must be set to run {kind} tests"
                ))
                .into());
            };
            if kind == TestKind::Calabash && !package.to_ascii_lowercase().ends_with(".zip") {
                return Err(
                    DeviceFarmError::configuration("Calabash content must be of type .zip").into(),
                );
            }
        }

        if self.filter.as_deref().is_some_and(|f| !f.is_empty()) && !kind.supports_filter() {
            return Err(DeviceFarmError::configuration(format!(
                "{kind} tests do not support a filter"
            ))
            .into());
        }

        for key in self.parameters.keys() {
            if !kind.allowed_parameters().contains(&key.as_str())
                && key != APP_PERFORMANCE_MONITORING_PARAMETER
            {
                return Err(DeviceFarmError::configuration(format!(
                    "Unknown parameter '{key}' for {kind} tests"
                ))
                .into());
            }
        }

        if kind == TestKind::BuiltinFuzz {
            for (key, label) in [("event_count", "EventCount"), ("seed", "Seed")] {
                if let Some(value) = self.parameters.get(key) {
                    if !value.is_empty() && !value.chars().all(|c| c.is_ascii_digit()) {
                        return Err(DeviceFarmError::configuration(format!(
                            "{label} must be a number."
                        ))
                        .into());
                    }
                }
            }
        }

        if self
            .test_spec_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DeviceFarmError::configuration("A test Spec must be selected").into());
        }

        Ok(())
    }

    /// Parameters as sent to the service: empty values dropped, monitoring flag appended.
    pub fn remote_parameters(&self) -> BTreeMap<String, String> {
        let mut parameters: BTreeMap<String, String> = self
            .parameters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !self.app_performance_monitoring {
            parameters.insert(
                APP_PERFORMANCE_MONITORING_PARAMETER.to_owned(),
                "false".to_owned(),
            );
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_kind;
    use rstest::rstest;

    const APPIUM_KINDS: [TestKind; 5] = [
        TestKind::AppiumJavaJunit,
        TestKind::AppiumJavaTestng,
        TestKind::AppiumPython,
        TestKind::AppiumRuby,
        TestKind::AppiumNode,
    ];

    #[test]
    fn test_web_substitution_for_appium_kinds() {
        for kind in APPIUM_KINDS {
            let web = kind.effective(true);
            assert!(web.as_str().starts_with("APPIUM_WEB_"), "{kind} -> {web}");
            assert_eq!(web.for_web_app(), web, "substitution must be idempotent");
            assert_eq!(kind.effective(false), kind);
            assert!(is_test_type(kind, true, kind));
            assert!(is_test_type(kind, true, web));
            assert!(is_test_type(web, true, kind));
        }
    }

    #[test]
    fn test_web_substitution_leaves_other_kinds_alone() {
        for kind in TestKind::ALL
            .into_iter()
            .filter(|kind| !APPIUM_KINDS.contains(kind))
        {
            assert_eq!(kind.effective(true), kind);
        }
        assert!(!is_test_type(TestKind::AppiumNode, true, TestKind::AppiumRuby));
        assert!(!is_test_type(TestKind::AppiumNode, false, TestKind::AppiumWebNode));
    }

    #[rstest]
    #[case("APPIUM_WEB_PYTHON", TestKind::AppiumWebPython)]
    #[case("xctest_ui", TestKind::XctestUi)]
    #[case(" builtin_fuzz ", TestKind::BuiltinFuzz)]
    fn test_parse_kind(#[case] input: &str, #[case] expected: TestKind) {
        assert_eq!(input.parse::<TestKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert!("ESPRESSO".parse::<TestKind>().is_err());
    }

    #[test]
    fn test_validate_requires_package() {
        let settings = TestSettings::new(TestKind::Instrumentation);
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            error_kind(&err),
            Some(DeviceFarmError::Configuration(_))
        ));

        assert!(TestSettings::new(TestKind::BuiltinExplorer).validate().is_ok());
    }

    #[rstest]
    #[case("event_count", "100", true)]
    #[case("event_count", "1e3", false)]
    #[case("seed", "-1", false)]
    #[case("throttle", "fast", true)]
    fn test_validate_fuzz_numbers(#[case] key: &str, #[case] value: &str, #[case] ok: bool) {
        let mut settings = TestSettings::new(TestKind::BuiltinFuzz);
        settings.parameters.insert(key.into(), value.into());
        assert_eq!(settings.validate().is_ok(), ok);
    }

    #[test]
    fn test_validate_calabash_zip() {
        let mut settings = TestSettings::new(TestKind::Calabash);
        settings.package = Some("features/*.tar".into());
        assert!(settings.validate().is_err());
        settings.package = Some("features/features.ZIP".into());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_foreign_parameters() {
        let mut settings = TestSettings::new(TestKind::AppiumNode);
        settings.package = Some("tests.zip".into());
        settings.parameters.insert("appium_version".into(), "1.9.1".into());
        assert!(settings.validate().is_err());

        settings.kind = TestKind::AppiumPython;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_filter_support() {
        let mut settings = TestSettings::new(TestKind::Calabash);
        settings.package = Some("features.zip".into());
        settings.filter = Some("com.example.SmokeTest".into());
        assert!(settings.validate().is_err());

        settings.kind = TestKind::Instrumentation;
        settings.package = Some("app-androidTest.apk".into());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_remote_parameters() {
        let mut settings = TestSettings::new(TestKind::BuiltinFuzz);
        settings.parameters.insert("event_count".into(), "6000".into());
        settings.parameters.insert("seed".into(), String::new());
        settings.app_performance_monitoring = false;

        assert_eq!(
            settings.remote_parameters(),
            BTreeMap::from([
                ("app_performance_monitoring".to_string(), "false".to_string()),
                ("event_count".to_string(), "6000".to_string()),
            ])
        );
    }
}
