use std::{fmt::Display, path::Path};

use crate::devicefarm::DevicePlatform;
use crate::error::DeviceFarmError;
use crate::prelude::*;
use crate::schedule::TestKind;

/// Upload type tags accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadType {
    AndroidApp,
    IosApp,
    ExternalData,
    TestPackage(TestKind),
    TestSpec(TestKind),
}

fn extension_of(file: &Path) -> Option<String> {
    file.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn unsupported(context: &'static str, file: &Path) -> Error {
    DeviceFarmError::UnsupportedArtifactType {
        context,
        file: file.display().to_string(),
    }
    .into()
}

impl UploadType {
    /// Infers the application upload type from the file extension.
    pub fn for_app(file: &Path) -> Result<Self> {
        match extension_of(file).as_deref() {
            Some("apk") => Ok(UploadType::AndroidApp),
            Some("ipa") | Some("zip") => Ok(UploadType::IosApp),
            _ => Err(unsupported("app", file)),
        }
    }

    /// Extra data is only accepted as a zip archive.
    pub fn for_extra_data(file: &Path) -> Result<Self> {
        match extension_of(file).as_deref() {
            Some("zip") => Ok(UploadType::ExternalData),
            _ => Err(unsupported("extra data", file)),
        }
    }

    /// Package type for a test kind, `None` for built-in kinds.
    pub fn for_test(kind: TestKind) -> Option<Self> {
        (!kind.is_builtin()).then_some(UploadType::TestPackage(kind))
    }

    pub fn platform(&self) -> Option<DevicePlatform> {
        match self {
            UploadType::AndroidApp => Some(DevicePlatform::Android),
            UploadType::IosApp => Some(DevicePlatform::Ios),
            _ => None,
        }
    }
}

impl Display for UploadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadType::AndroidApp => write!(f, "ANDROID_APP"),
            UploadType::IosApp => write!(f, "IOS_APP"),
            UploadType::ExternalData => write!(f, "EXTERNAL_DATA"),
            UploadType::TestPackage(kind) => write!(f, "{kind}_TEST_PACKAGE"),
            UploadType::TestSpec(kind) => write!(f, "{kind}_TEST_SPEC"),
        }
    }
}
