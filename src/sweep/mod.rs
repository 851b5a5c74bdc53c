//! Sweepers
//!
//! Sweepers delete resources left behind by acceptance tests. They are
//! collected in a [`SweeperRegistry`] that the caller builds and hands to the
//! sweep entry point; nothing registers itself at load time.
//!
//! # Example
//!
//! ```ignore
//! use tdfarm::sweep::{SweepOptions, SweeperRegistry};
//!
//! async fn sweep(client: &tdfarm::aws::DeviceFarmClient) -> anyhow::Result<()> {
//!     let registry = SweeperRegistry::with_defaults();
//!     let reports = registry.run(client, &SweepOptions::default()).await?;
//!     for report in reports {
//!         println!("{}", report.summary_line());
//!     }
//!     Ok(())
//! }
//! ```

pub mod devicefarm;

pub use devicefarm::{InstanceProfileSweeper, ProjectSweeper};

use crate::aws::DeviceFarmClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Default number of deletions in flight per sweeper
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Knobs for a sweep run
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Sweepers to run (plus their dependencies); empty runs all
    pub run: Vec<String>,
    /// Keep going when a sweeper reports errors
    pub allow_failures: bool,
    /// Deletions in flight per sweeper
    pub concurrency: usize,
    /// Only sweep resources whose name starts with this
    pub name_prefix: Option<String>,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            run: Vec::new(),
            allow_failures: false,
            concurrency: DEFAULT_CONCURRENCY,
            name_prefix: None,
        }
    }
}

impl SweepOptions {
    /// Whether a resource with this name is in scope
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        match self.name_prefix.as_deref() {
            None | Some("") => true,
            Some(prefix) => name.is_some_and(|n| n.starts_with(prefix)),
        }
    }
}

/// Sweep failures
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("sweeper {0} is already registered")]
    Duplicate(String),

    #[error("no sweeper named {0}")]
    Unknown(String),

    #[error("sweeper dependency cycle through {0}")]
    Cycle(String),

    #[error("error listing {resource} for {region}: {message}")]
    List {
        resource: &'static str,
        region: String,
        code: Option<String>,
        message: String,
    },

    #[error("error deleting {resource} ({id}): {message}")]
    Delete {
        resource: &'static str,
        id: String,
        code: Option<String>,
        message: String,
    },

    #[error(
        "sweeper {} failed in {} with {} error(s)",
        .report.sweeper,
        .report.region,
        .report.errors.len()
    )]
    Failed { report: Box<SweepReport> },
}

/// What one sweeper did in one region
#[derive(Debug)]
pub struct SweepReport {
    pub sweeper: &'static str,
    pub region: String,
    /// Resources listed
    pub found: usize,
    /// Resources deleted by this run
    pub deleted: usize,
    /// Resources that disappeared before we got to them
    pub already_gone: usize,
    /// Resources left alone by the name filter
    pub filtered: usize,
    /// The region or account can't be swept, see `aws::errors::skip_sweep_error`
    pub skipped: bool,
    pub errors: Vec<SweepError>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl SweepReport {
    pub fn new(sweeper: &'static str, region: &str) -> Self {
        Self {
            sweeper,
            region: region.to_string(),
            found: 0,
            deleted: 0,
            already_gone: 0,
            filtered: 0,
            skipped: false,
            errors: Vec::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Stamp the elapsed time since `started_at`
    pub fn finish(mut self) -> Self {
        self.duration = (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self
    }

    pub fn summary_line(&self) -> String {
        if self.skipped && self.errors.is_empty() {
            return format!("{} [{}]: skipped", self.sweeper, self.region);
        }

        format!(
            "{} [{}]: found {}, deleted {}, already gone {}, filtered {}, errors {} ({:.1}s)",
            self.sweeper,
            self.region,
            self.found,
            self.deleted,
            self.already_gone,
            self.filtered,
            self.errors.len(),
            self.duration.as_secs_f64()
        )
    }
}

/// A cleanup routine for one resource type
#[async_trait]
pub trait Sweeper: Send + Sync {
    /// Unique name, by convention the Terraform resource type
    fn name(&self) -> &'static str;

    /// Sweepers that must run before this one
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Sweep one region, collecting every failure in the report
    async fn sweep(&self, client: &DeviceFarmClient, options: &SweepOptions) -> SweepReport;
}

/// Explicitly built set of sweepers
#[derive(Default)]
pub struct SweeperRegistry {
    sweepers: Vec<Box<dyn Sweeper>>,
}

impl SweeperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in Device Farm sweepers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.sweepers.push(Box::new(ProjectSweeper));
        registry.sweepers.push(Box::new(InstanceProfileSweeper));
        registry
    }

    pub fn register(&mut self, sweeper: impl Sweeper + 'static) -> Result<(), SweepError> {
        if self.get(sweeper.name()).is_some() {
            return Err(SweepError::Duplicate(sweeper.name().to_string()));
        }
        self.sweepers.push(Box::new(sweeper));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Sweeper> {
        self.sweepers
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sweepers.iter().map(|s| s.name()).collect()
    }

    /// Order in which sweepers run
    ///
    /// Selected sweepers (all of them when `run` is empty) plus everything
    /// they depend on, dependencies first, registration order otherwise.
    pub fn plan(&self, run: &[String]) -> Result<Vec<&dyn Sweeper>, SweepError> {
        let roots: Vec<&str> = if run.is_empty() {
            self.names()
        } else {
            run.iter().map(String::as_str).collect()
        };

        let mut done = HashSet::new();
        let mut visiting = HashSet::new();
        let mut order = Vec::new();

        for root in roots {
            self.visit(root, &mut visiting, &mut done, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visiting: &mut HashSet<&'static str>,
        done: &mut HashSet<&'static str>,
        order: &mut Vec<&'a dyn Sweeper>,
    ) -> Result<(), SweepError> {
        let sweeper = self
            .get(name)
            .ok_or_else(|| SweepError::Unknown(name.to_string()))?;

        if done.contains(sweeper.name()) {
            return Ok(());
        }
        if !visiting.insert(sweeper.name()) {
            return Err(SweepError::Cycle(sweeper.name().to_string()));
        }

        for dependency in sweeper.dependencies() {
            self.visit(dependency, visiting, done, order)?;
        }

        visiting.remove(sweeper.name());
        done.insert(sweeper.name());
        order.push(sweeper);
        Ok(())
    }

    /// Run the planned sweepers against one region
    ///
    /// Stops at the first failing sweeper unless `allow_failures` is set.
    pub async fn run(
        &self,
        client: &DeviceFarmClient,
        options: &SweepOptions,
    ) -> Result<Vec<SweepReport>, SweepError> {
        let plan = self.plan(&options.run)?;
        let mut reports = Vec::with_capacity(plan.len());

        for sweeper in plan {
            tracing::info!("Running sweeper {} in {}", sweeper.name(), client.region());

            let report = sweeper.sweep(client, options).await;
            tracing::info!("{}", report.summary_line());

            if report.failed() && !options.allow_failures {
                return Err(SweepError::Failed {
                    report: Box::new(report),
                });
            }
            reports.push(report);
        }

        Ok(reports)
    }
}
