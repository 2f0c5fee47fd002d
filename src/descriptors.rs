// Metric descriptor catalog
// This file defines the fixed set of metric families the exporter
// produces from Opsgenie data

use prometheus::Opts;

pub const NAMESPACE: &str = "opsgenie";

pub const LABEL_PRIORITY: &str = "priority";
pub const LABEL_STATUS: &str = "status";
pub const LABEL_TEAM: &str = "team";
pub const LABEL_USER_ROLE: &str = "role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<&'static str>,
}

impl MetricDescriptor {
    /// Takes the fully qualified name and help text from `opts`.
    pub fn new(opts: Opts, kind: MetricKind, label_names: &[&'static str]) -> Self {
        Self {
            name: opts.fq_name(),
            help: opts.help,
            kind,
            label_names: label_names.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.label_names
    }
}

/// The four families exposed on every scrape. Built once at startup and
/// shared read-only between scrapes.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    pub alerts_created_total: MetricDescriptor,
    pub alerts_status_count: MetricDescriptor,
    pub teams_count: MetricDescriptor,
    pub users_count: MetricDescriptor,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::with_namespace(NAMESPACE)
    }

    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            alerts_created_total: MetricDescriptor::new(
                Opts::new("created_total", "opsgenie alert metrics")
                    .namespace(namespace)
                    .subsystem("alerts"),
                MetricKind::Counter,
                &[LABEL_TEAM, LABEL_PRIORITY],
            ),
            alerts_status_count: MetricDescriptor::new(
                Opts::new("status_count", "opsgenie alert metrics")
                    .namespace(namespace)
                    .subsystem("alerts"),
                MetricKind::Gauge,
                &[LABEL_STATUS, LABEL_TEAM, LABEL_PRIORITY],
            ),
            teams_count: MetricDescriptor::new(
                Opts::new("count", "opsgenie team metrics")
                    .namespace(namespace)
                    .subsystem("teams"),
                MetricKind::Gauge,
                &[],
            ),
            users_count: MetricDescriptor::new(
                Opts::new("count", "opsgenie user metrics")
                    .namespace(namespace)
                    .subsystem("users"),
                MetricKind::Gauge,
                &[LABEL_USER_ROLE],
            ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        [
            &self.alerts_created_total,
            &self.alerts_status_count,
            &self.teams_count,
            &self.users_count,
        ]
        .into_iter()
    }

    pub fn contains(&self, descriptor: &MetricDescriptor) -> bool {
        self.iter().any(|d| std::ptr::eq(d, descriptor))
    }
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self::new()
    }
}
