use std::path::Path;
use std::time::Duration;

use console::style;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::fs::File;
use tokio_util::sync::CancellationToken;

use crate::artifact::Workspace;
use crate::devicefarm::{DeviceFarmApi, Project, Upload, UploadStatus};
use crate::error::DeviceFarmError;
use crate::prelude::*;
use crate::request_client::STREAMING_CLIENT;
use crate::run::helpers::sleep_or_cancel;
use crate::schedule::TestKind;

mod upload_type;

pub use upload_type::UploadType;

/// Content type requested for every upload slot.
pub const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";
pub const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a staged file is uploaded as. Decides how its upload type is inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPurpose {
    App,
    ExtraData,
    TestPackage(TestKind),
}

impl ArtifactPurpose {
    pub fn upload_type(&self, file: &Path) -> Result<UploadType> {
        match self {
            ArtifactPurpose::App => UploadType::for_app(file),
            ArtifactPurpose::ExtraData => UploadType::for_extra_data(file),
            ArtifactPurpose::TestPackage(kind) => UploadType::for_test(*kind).ok_or_else(|| {
                DeviceFarmError::configuration(format!("{kind} tests have no package to upload"))
                    .into()
            }),
        }
    }
}

pub struct UploadClient<'a> {
    api: &'a dyn DeviceFarmApi,
    cancellation: CancellationToken,
    poll_interval: Duration,
}

async fn put_file(url: &str, path: &Path, content_type: &str) -> Result<()> {
    let file = File::open(path)
        .await
        .context(format!("Failed to open file at path: {}", path.display()))?;
    let size = file.metadata().await?.len();
    debug!("Uploading {size} bytes from {}", path.display());

    let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
    let response = STREAMING_CLIENT
        .put(url)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, size)
        .body(body)
        .send()
        .await
        .context(format!("Failed to upload {}", path.display()))?;

    if !response.status().is_success() {
        let status = response.status();
        debug!(
            "Upload response body: {}",
            response.text().await.unwrap_or_default()
        );
        return Err(DeviceFarmError::UploadTransport {
            status: status.as_u16(),
        }
        .into());
    }

    Ok(())
}

impl<'a> UploadClient<'a> {
    pub fn new(api: &'a dyn DeviceFarmApi, cancellation: CancellationToken) -> Self {
        Self {
            api,
            cancellation,
            poll_interval: UPLOAD_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Uploads `file` to `project` as `upload_type`.
    ///
    /// When `synchronous`, waits until the service finished processing the upload, so the
    /// returned ARN is usable right away.
    pub async fn upload(
        &self,
        project: &Project,
        file: &Path,
        upload_type: UploadType,
        synchronous: bool,
    ) -> Result<Upload> {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("Cannot upload {}, it has no file name", file.display()))?;

        let upload = self
            .api
            .create_upload(&project.arn, &name, upload_type, UPLOAD_CONTENT_TYPE)
            .await?;
        debug!("Created {upload_type} upload {}", upload.arn);

        let url = upload
            .url
            .as_deref()
            .with_context(|| format!("No upload URL returned for {name}"))?;
        put_file(
            url,
            file,
            upload.content_type.as_deref().unwrap_or(UPLOAD_CONTENT_TYPE),
        )
        .await?;

        if !synchronous {
            return Ok(upload);
        }

        loop {
            let current = self.api.get_upload(&upload.arn).await?;
            match current.status {
                UploadStatus::Succeeded => {
                    info!("Upload {} succeeded", style(&name).bold());
                    return Ok(current);
                }
                UploadStatus::Failed => {
                    return Err(DeviceFarmError::UploadProcessing {
                        name,
                        details: current.diagnostics(),
                    }
                    .into());
                }
                ref status => {
                    info!("Waiting for upload {name} to be ready (current status: {status})");
                    sleep_or_cancel(&self.cancellation, self.poll_interval, "the upload").await?;
                }
            }
        }
    }

    /// Expands and resolves `pattern` in the workspace, then uploads the staged copy.
    pub async fn upload_artifact(
        &self,
        project: &Project,
        workspace: &Workspace,
        pattern: &str,
        purpose: ArtifactPurpose,
    ) -> Result<Upload> {
        let staged = workspace.resolve(pattern)?;
        let upload_type = purpose.upload_type(&staged)?;
        self.upload(project, &staged, upload_type, true).await
    }
}
