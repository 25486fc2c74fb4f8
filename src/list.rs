use clap::{Args, Subcommand};
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

use crate::devicefarm::{DeviceFarmApi, ResourceCache};
use crate::prelude::*;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(subcommand)]
    resource: ListResource,
}

#[derive(Subcommand, Debug)]
enum ListResource {
    /// Projects of the account
    Projects,
    /// Device pools of a project
    DevicePools {
        #[arg(long, env = "AWSDEVICEFARM_PROJECT")]
        project: String,
    },
    /// Custom test specs of a project, the curated ones included
    TestSpecs {
        #[arg(long, env = "AWSDEVICEFARM_PROJECT")]
        project: String,
    },
    /// VPC endpoint configurations of the account
    Vpce,
}

#[derive(Debug, Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ARN")]
    arn: String,
}

fn build_table(rows: Vec<ResourceRow>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Color::BOLD));
    table.to_string()
}

async fn list_rows(
    resource: &ListResource,
    api: &dyn DeviceFarmApi,
    cache: &mut ResourceCache,
) -> Result<Vec<ResourceRow>> {
    let rows = match resource {
        ListResource::Projects => cache
            .projects(api)
            .await?
            .iter()
            .map(|p| ResourceRow {
                name: p.name.clone(),
                arn: p.arn.clone(),
            })
            .collect(),
        ListResource::DevicePools { project } => cache
            .device_pools(api, project)
            .await?
            .iter()
            .map(|p| ResourceRow {
                name: p.name.clone(),
                arn: p.arn.clone(),
            })
            .collect(),
        ListResource::TestSpecs { project } => cache
            .test_specs(api, project)
            .await?
            .iter()
            .map(|spec| ResourceRow {
                name: spec.name.clone(),
                arn: spec.arn.clone(),
            })
            .collect(),
        ListResource::Vpce => cache
            .vpce_configurations(api)
            .await
            .iter()
            .map(|vpce| ResourceRow {
                name: vpce.service_name.clone(),
                arn: vpce.arn.clone(),
            })
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect(),
    };
    Ok(rows)
}

pub async fn run(args: ListArgs, api: &dyn DeviceFarmApi) -> Result<()> {
    let mut cache = ResourceCache::new();
    let rows = list_rows(&args.resource, api, &mut cache).await?;
    if rows.is_empty() {
        info!("Nothing to list");
        return Ok(());
    }
    info!("\n{}", build_table(rows));
    Ok(())
}
