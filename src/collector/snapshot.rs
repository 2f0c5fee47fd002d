// Snapshot collector
// Runs the per-scrape query plan against the data source and streams one
// observation per label combination into the sink

use crate::collector::sink::{Observation, ObservationSink};
use crate::descriptors::{DescriptorSet, MetricDescriptor};
use crate::errors::CollectError;
use crate::metrics::{SCRAPE_DURATION, SCRAPE_FAILURES};
use crate::query::{AlertFilter, AlertStatus, Priority};
use crate::source::{DataSource, Team};
use std::sync::Arc;
use tracing::{debug, error};

const FAMILY_ALERTS_CREATED: &str = "alerts_created_total";
const FAMILY_ALERTS_STATUS: &str = "alerts_status_count";
const FAMILY_TEAMS: &str = "teams_count";
const FAMILY_USERS: &str = "users_count";

/// Outcome of one `collect` run.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub observations: usize,
    pub failures: Vec<CollectError>,
}

impl ScrapeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Holds no per-scrape state: every call to `collect` repeats the full
/// query plan from scratch.
#[derive(Clone)]
pub struct SnapshotCollector {
    source: Arc<dyn DataSource>,
    descriptors: Arc<DescriptorSet>,
}

struct Emitter<'s, K> {
    sink: &'s mut K,
    emitted: usize,
}

impl<K: ObservationSink> Emitter<'_, K> {
    fn emit(&mut self, descriptor: &MetricDescriptor, value: f64, label_values: Vec<String>) {
        self.sink.emit(Observation::new(descriptor, value, label_values));
        self.emitted += 1;
    }
}

impl SnapshotCollector {
    pub fn new(source: Arc<dyn DataSource>, descriptors: Arc<DescriptorSet>) -> Self {
        Self {
            source,
            descriptors,
        }
    }

    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    /// Query every family and push the results into `sink`. A failing family
    /// is logged and recorded in the report; the others still run.
    pub async fn collect<K>(&self, sink: &mut K) -> ScrapeReport
    where
        K: ObservationSink + Send,
    {
        let _timer = SCRAPE_DURATION.start_timer();
        debug!("scraping opsgenie api");

        let mut out = Emitter { sink, emitted: 0 };
        let mut report = ScrapeReport::default();

        let outcomes = [
            self.collect_alerts_created(&mut out).await,
            self.collect_alerts_status(&mut out, AlertStatus::Open).await,
            self.collect_alerts_status(&mut out, AlertStatus::Closed).await,
            self.collect_teams(&mut out).await,
            self.collect_users(&mut out).await,
        ];
        for outcome in outcomes {
            if let Err(err) = outcome {
                error!(family = err.family(), error = %err, "opsgenie collection failed");
                SCRAPE_FAILURES.with_label_values(&[err.family()]).inc();
                report.failures.push(err);
            }
        }

        report.observations = out.emitted;
        debug!(
            observations = report.observations,
            failures = report.failures.len(),
            "opsgenie scrape finished"
        );
        report
    }

    async fn collect_alerts_created<K: ObservationSink>(
        &self,
        out: &mut Emitter<'_, K>,
    ) -> Result<(), CollectError> {
        let desc = &self.descriptors.alerts_created_total;

        let total = self.count(FAMILY_ALERTS_CREATED, AlertFilter::new()).await?;
        out.emit(desc, total, vec![String::new(), String::new()]);

        for team in self.teams(FAMILY_ALERTS_CREATED).await? {
            for priority in Priority::ALL {
                let filter = AlertFilter::new()
                    .team(team.name.as_str())
                    .priority(priority.as_str());
                let value = self.count(FAMILY_ALERTS_CREATED, filter).await?;
                out.emit(
                    desc,
                    value,
                    vec![team.name.clone(), priority.as_str().to_string()],
                );
            }
        }
        Ok(())
    }

    async fn collect_alerts_status<K: ObservationSink>(
        &self,
        out: &mut Emitter<'_, K>,
        status: AlertStatus,
    ) -> Result<(), CollectError> {
        let desc = &self.descriptors.alerts_status_count;
        let status = status.as_str();

        let total = self
            .count(FAMILY_ALERTS_STATUS, AlertFilter::new().status(status))
            .await?;
        out.emit(
            desc,
            total,
            vec![status.to_string(), String::new(), String::new()],
        );

        for team in self.teams(FAMILY_ALERTS_STATUS).await? {
            for priority in Priority::ALL {
                let filter = AlertFilter::new()
                    .team(team.name.as_str())
                    .status(status)
                    .priority(priority.as_str());
                let value = self.count(FAMILY_ALERTS_STATUS, filter).await?;
                let labels = vec![
                    status.to_string(),
                    team.name.clone(),
                    priority.as_str().to_string(),
                ];
                out.emit(desc, value, labels);
            }
        }
        Ok(())
    }

    async fn collect_teams<K: ObservationSink>(
        &self,
        out: &mut Emitter<'_, K>,
    ) -> Result<(), CollectError> {
        let teams = self.teams(FAMILY_TEAMS).await?;
        out.emit(&self.descriptors.teams_count, teams.len() as f64, vec![]);
        Ok(())
    }

    async fn collect_users<K: ObservationSink>(
        &self,
        out: &mut Emitter<'_, K>,
    ) -> Result<(), CollectError> {
        let roles = self
            .source
            .count_users_by_role()
            .await
            .map_err(|source| CollectError::Enumeration {
                family: FAMILY_USERS,
                resource: "users",
                source,
            })?;

        for (role, count) in roles {
            out.emit(&self.descriptors.users_count, count, vec![role]);
        }
        Ok(())
    }

    async fn count(&self, family: &'static str, filter: AlertFilter) -> Result<f64, CollectError> {
        let query = filter.to_query();
        match self.source.count_alerts(&query).await {
            Ok(value) => Ok(value),
            Err(source) => Err(CollectError::Query {
                family,
                query,
                source,
            }),
        }
    }

    async fn teams(&self, family: &'static str) -> Result<Vec<Team>, CollectError> {
        self.source
            .list_teams()
            .await
            .map_err(|source| CollectError::Enumeration {
                family,
                resource: "teams",
                source,
            })
    }
}
