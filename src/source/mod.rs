// Data source module
// Defines the boundary between the snapshot collector and the remote
// incident-management API

pub mod opsgenie;

use crate::errors::ExporterError;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use opsgenie::OpsgenieClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Number of users holding each role.
pub type UserRoleCount = BTreeMap<String, f64>;

/// Remote queries the collector relies on. Implementations are shared
/// between concurrent scrapes.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Count alerts matching an Opsgenie query; an empty query matches all.
    async fn count_alerts(&self, query: &str) -> Result<f64, ExporterError>;

    async fn list_teams(&self) -> Result<Vec<Team>, ExporterError>;

    async fn count_users_by_role(&self) -> Result<UserRoleCount, ExporterError>;
}
