//! Device Farm sweepers

use super::{SweepError, SweepOptions, SweepReport, Sweeper};
use crate::aws::errors::{error_chain, skip_sweep_error};
use crate::aws::DeviceFarmClient;
use crate::finder::devicefarm::is_not_found_exception;
use crate::finder::ResourceKind;
use async_trait::async_trait;
use aws_sdk_devicefarm::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_devicefarm::operation::list_instance_profiles::ListInstanceProfilesError;
use aws_sdk_devicefarm::operation::list_projects::ListProjectsError;
use aws_sdk_devicefarm::Client;
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::future::Future;

/// A listed resource that may be swept
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    arn: String,
    name: Option<String>,
}

impl Target {
    fn new(arn: Option<&str>, name: Option<&str>) -> Option<Self> {
        let arn = arn.filter(|a| !a.is_empty())?;
        Some(Self {
            arn: arn.to_string(),
            name: name.map(str::to_string),
        })
    }
}

/// Whatever a listing produced before it stopped
struct Listing<E> {
    targets: Vec<Target>,
    error: Option<E>,
}

async fn list_projects(conn: &Client) -> Listing<SdkError<ListProjectsError>> {
    let mut targets = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = match conn.list_projects().set_next_token(next_token.take()).send().await {
            Ok(page) => page,
            Err(err) => {
                return Listing {
                    targets,
                    error: Some(err),
                }
            }
        };

        targets.extend(
            page.projects
                .unwrap_or_default()
                .iter()
                .filter_map(|p| Target::new(p.arn(), p.name())),
        );

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Listing {
        targets,
        error: None,
    }
}

async fn list_instance_profiles(conn: &Client) -> Listing<SdkError<ListInstanceProfilesError>> {
    let mut targets = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = match conn
            .list_instance_profiles()
            .set_next_token(next_token.take())
            .send()
            .await
        {
            Ok(page) => page,
            Err(err) => {
                return Listing {
                    targets,
                    error: Some(err),
                }
            }
        };

        targets.extend(
            page.instance_profiles
                .unwrap_or_default()
                .iter()
                .filter_map(|p| Target::new(p.arn(), p.name())),
        );

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Listing {
        targets,
        error: None,
    }
}

/// Delete every listed target that passes the name filter, then account for
/// the listing failure if there was one
async fn sweep_listing<LE, DE, D, Fut>(
    mut report: SweepReport,
    resource: &'static str,
    listing: Listing<LE>,
    options: &SweepOptions,
    delete: D,
) -> SweepReport
where
    LE: ProvideErrorMetadata + Error,
    DE: ProvideErrorMetadata + Error,
    D: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), DE>>,
{
    report.found = listing.targets.len();

    let (targets, filtered): (Vec<Target>, Vec<Target>) = listing
        .targets
        .into_iter()
        .partition(|t| options.matches_name(t.name.as_deref()));
    report.filtered = filtered.len();

    let outcomes: Vec<(String, Result<(), DE>)> = stream::iter(targets)
        .map(|target| {
            let deletion = delete(target.arn.clone());
            async move { (target.arn, deletion.await) }
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    for (arn, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                tracing::debug!("Deleted {} ({})", resource, arn);
                report.deleted += 1;
            }
            Err(err) if is_not_found_exception(&err) => {
                tracing::debug!("{} ({}) already gone", resource, arn);
                report.already_gone += 1;
            }
            Err(err) => {
                let sweep_err = SweepError::Delete {
                    resource,
                    id: arn,
                    code: err.code().map(str::to_string),
                    message: error_chain(&err),
                };
                tracing::error!("{}", sweep_err);
                report.errors.push(sweep_err);
            }
        }
    }

    if let Some(err) = listing.error {
        let code = err.code().map(str::to_string);
        let message = error_chain(&err);

        if skip_sweep_error(code.as_deref(), &message) {
            tracing::warn!(
                "Skipping {} sweep for {}: {}",
                resource,
                report.region,
                message
            );
            report.skipped = true;
        } else {
            report.errors.push(SweepError::List {
                resource,
                region: report.region.clone(),
                code,
                message,
            });
        }
    }

    report.finish()
}

/// Deletes Device Farm projects, and with them their pools, uploads and
/// network profiles
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectSweeper;

#[async_trait]
impl Sweeper for ProjectSweeper {
    fn name(&self) -> &'static str {
        ResourceKind::Project.type_name()
    }

    async fn sweep(&self, client: &DeviceFarmClient, options: &SweepOptions) -> SweepReport {
        let conn = client.conn();
        let report = SweepReport::new(self.name(), client.region());
        let listing = list_projects(conn).await;

        sweep_listing(report, "DeviceFarm Project", listing, options, |arn| async move {
            conn.delete_project().arn(arn).send().await.map(|_| ())
        })
        .await
    }
}

/// Deletes Device Farm instance profiles
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceProfileSweeper;

#[async_trait]
impl Sweeper for InstanceProfileSweeper {
    fn name(&self) -> &'static str {
        ResourceKind::InstanceProfile.type_name()
    }

    async fn sweep(&self, client: &DeviceFarmClient, options: &SweepOptions) -> SweepReport {
        let conn = client.conn();
        let report = SweepReport::new(self.name(), client.region());
        let listing = list_instance_profiles(conn).await;

        sweep_listing(
            report,
            "DeviceFarm Instance Profile",
            listing,
            options,
            |arn| async move {
                conn.delete_instance_profile()
                    .arn(arn)
                    .send()
                    .await
                    .map(|_| ())
            },
        )
        .await
    }
}
