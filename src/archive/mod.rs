//! Mirrors the jobs, suites and tests of a finished run as local directories and downloads
//! every artifact of the run under the test it belongs to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::devicefarm::arn::Arn;
use crate::devicefarm::{Artifact, ArtifactCategory, DeviceFarmApi};
use crate::prelude::*;
use crate::run::helpers::download_file;

pub const RESULTS_DIR_NAME: &str = "AWS Device Farm Results";

/// Local directories of a run, keyed by the resource id of each node.
#[derive(Debug, Default)]
pub struct ArtifactTree {
    pub jobs: HashMap<String, PathBuf>,
    pub suites: HashMap<String, PathBuf>,
    pub tests: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub results_dir: PathBuf,
    pub downloaded: usize,
    pub skipped: usize,
}

/// Remote names may contain a path separator.
fn dir_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

fn create_node(parent: &Path, name: &str) -> Result<PathBuf> {
    let dir = parent.join(dir_name(name));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    Ok(dir)
}

/// `{name}-{id}.{extension}`, the extension may be reported with a leading dot.
pub fn artifact_file_name(artifact: &Artifact, id: &str) -> String {
    let extension = artifact
        .extension
        .strip_prefix('.')
        .unwrap_or(&artifact.extension);
    dir_name(&format!("{}-{id}.{extension}", artifact.name))
}

pub async fn build_tree(
    api: &dyn DeviceFarmApi,
    run_arn: &Arn,
    results_dir: &Path,
) -> Result<ArtifactTree> {
    let mut tree = ArtifactTree::default();

    for job in api.list_jobs(&run_arn.to_string()).await? {
        let arn: Arn = job.arn.parse()?;
        // Two jobs may share a name, the OS version tells them apart
        let suffix = job.os.as_deref().unwrap_or(arn.short_id());
        let dir = create_node(results_dir, &format!("{}-{suffix}", job.name))?;
        tree.jobs.insert(arn.resource_id().to_owned(), dir);
    }

    for (job_id, job_dir) in &tree.jobs {
        let job_arn = run_arn.with_resource("job", job_id);
        for suite in api.list_suites(&job_arn.to_string()).await? {
            let arn: Arn = suite.arn.parse()?;
            let dir = create_node(job_dir, &suite.name)?;
            tree.suites.insert(arn.resource_id().to_owned(), dir);
        }
    }

    for (suite_id, suite_dir) in &tree.suites {
        let suite_arn = run_arn.with_resource("suite", suite_id);
        for test in api.list_tests(&suite_arn.to_string()).await? {
            let arn: Arn = test.arn.parse()?;
            let dir = create_node(suite_dir, &test.name)?;
            tree.tests.insert(arn.resource_id().to_owned(), dir);
        }
    }

    debug!(
        "Archive tree has {} jobs, {} suites and {} tests",
        tree.jobs.len(),
        tree.suites.len(),
        tree.tests.len()
    );
    Ok(tree)
}

/// Downloads every artifact of `run_arn` under `dest_root/AWS Device Farm Results`.
///
/// A failed download stops the archive, files written before it stay on disk.
pub async fn archive_run(
    api: &dyn DeviceFarmApi,
    run_arn: &str,
    dest_root: &Path,
) -> Result<ArchiveSummary> {
    let run_arn: Arn = run_arn.parse()?;
    let results_dir = dest_root.join(RESULTS_DIR_NAME);
    std::fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create directory {}", results_dir.display()))?;
    info!(
        "Storing AWS Device Farm results in directory {}",
        results_dir.display()
    );

    let tree = build_tree(api, &run_arn, &results_dir).await?;

    info!("Downloading AWS Device Farm results archive...");
    let mut summary = ArchiveSummary {
        results_dir,
        downloaded: 0,
        skipped: 0,
    };
    for category in ArtifactCategory::ALL {
        for artifact in api.list_artifacts(&run_arn.to_string(), category).await? {
            let arn: Arn = artifact.arn.parse()?;
            let Some(test_dir) = arn.parent_id().and_then(|test_id| tree.tests.get(test_id))
            else {
                warn!("Skipping {category} artifact {}, its test is unknown", artifact.arn);
                summary.skipped += 1;
                continue;
            };

            let path = test_dir.join(artifact_file_name(&artifact, arn.short_id()));
            let url = Url::parse(&artifact.url)
                .with_context(|| format!("Invalid URL for artifact {}", artifact.name))?;
            download_file(&url, &path)
                .await
                .with_context(|| format!("Failed to download {category} artifact {}", artifact.name))?;
            summary.downloaded += 1;
        }
    }

    info!("Results archive saved in {}", summary.results_dir.display());
    Ok(summary)
}
