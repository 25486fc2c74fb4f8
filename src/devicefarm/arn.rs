use std::{fmt::Display, str::FromStr};

use crate::prelude::*;

const COMPONENT_COUNT: usize = 7;
const RESOURCE_TYPE_INDEX: usize = 5;
const RESOURCE_ID_INDEX: usize = 6;

pub const CONSOLE_BASE_URL: &str = "https://console.aws.amazon.com/devicefarm/home?#/projects";

/// A device farm ARN, e.g. `arn:aws:devicefarm:us-west-2:123456789012:run:project-id/run-id`.
///
/// The resource type and resource id live at fixed colon-delimited positions. The resource
/// id is a slash-delimited path: a job id is its run id plus one segment, a suite id is its
/// job id plus one segment, and so on down to artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    components: Vec<String>,
}

impl FromStr for Arn {
    type Err = Error;

    fn from_str(arn: &str) -> Result<Self> {
        let components: Vec<String> = arn.splitn(COMPONENT_COUNT, ':').map(String::from).collect();
        if components.len() != COMPONENT_COUNT
            || components[0] != "arn"
            || components[RESOURCE_ID_INDEX].is_empty()
        {
            bail!("Malformed ARN '{arn}'");
        }
        Ok(Self { components })
    }
}

impl Display for Arn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join(":"))
    }
}

impl Arn {
    pub fn resource_type(&self) -> &str {
        &self.components[RESOURCE_TYPE_INDEX]
    }

    pub fn resource_id(&self) -> &str {
        &self.components[RESOURCE_ID_INDEX]
    }

    /// Same partition, region and account, pointing at another resource.
    pub fn with_resource(&self, resource_type: &str, resource_id: &str) -> Self {
        let mut components = self.components.clone();
        components[RESOURCE_TYPE_INDEX] = resource_type.to_owned();
        components[RESOURCE_ID_INDEX] = resource_id.to_owned();
        Self { components }
    }

    /// The resource id of the owning node, i.e. everything before the last `/`.
    pub fn parent_id(&self) -> Option<&str> {
        self.resource_id()
            .rsplit_once('/')
            .map(|(parent, _)| parent)
    }

    /// Last segment of the resource id.
    pub fn short_id(&self) -> &str {
        let id = self.resource_id();
        id.rsplit_once('/').map(|(_, short)| short).unwrap_or(id)
    }
}

/// Returns the `(project id, run id)` pair of a run ARN.
pub fn project_and_run_ids(run_arn: &str) -> Result<(String, String)> {
    let arn: Arn = run_arn.parse()?;
    let mut ids = arn.resource_id().split('/');
    match (ids.next(), ids.next()) {
        (Some(project_id), Some(run_id)) if !project_id.is_empty() && !run_id.is_empty() => {
            Ok((project_id.to_owned(), run_id.to_owned()))
        }
        _ => bail!("Malformed run ARN '{run_arn}'"),
    }
}

/// Web console link for a run.
pub fn console_url(run_arn: &str) -> Result<String> {
    let (project_id, run_id) = project_and_run_ids(run_arn)?;
    Ok(format!("{CONSOLE_BASE_URL}/{project_id}/runs/{run_id}"))
}
