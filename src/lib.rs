// Library root module for opsgenie-exporter
// Exposes Opsgenie alerts, teams and users as Prometheus metrics

pub mod collector;
pub mod config;
pub mod control;
pub mod descriptors;
pub mod errors;
pub mod metrics;
pub mod query;
pub mod server;
pub mod source;
