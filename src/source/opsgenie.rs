// Opsgenie REST transport
// This file implements the data source against the Opsgenie v2 REST API:
// alert counts, team listing and paged user listing grouped by role

use crate::config::OpsgenieConfig;
use crate::control::RequestLimiter;
use crate::errors::ExporterError;
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};
use crate::source::{DataSource, Team, UserRoleCount};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone)]
pub struct OpsgenieClient {
    http: Client,
    base: Url,
    api_key: String,
    limiter: RequestLimiter,
    max_retry_elapsed: Duration,
    user_page_size: u32,
}

impl OpsgenieClient {
    pub fn new(cfg: &OpsgenieConfig) -> Result<Self, ExporterError> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .gzip(true)
            .user_agent(concat!("opsgenie-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExporterError::Transport(format!("build http client: {e}")))?;

        Ok(Self {
            http,
            base: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            limiter: RequestLimiter::new(cfg.max_inflight, cfg.rate_per_sec),
            max_retry_elapsed: cfg.max_retry_elapsed(),
            user_page_size: cfg.user_page_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    /// GET an API path and decode the JSON body, retrying transient
    /// failures until the retry budget is spent.
    async fn get_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExporterError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ExporterError::Url(format!("{path}: {e}")))?;

        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(self.max_retry_elapsed),
            multiplier: 2.0,
            ..Default::default()
        };

        let result = retry(backoff, || {
            let url = url.clone();
            async move {
                self.get_once(method, url, query).await.map_err(|e| {
                    if e.is_transient() {
                        debug!(method, error = %e, "transient opsgenie error, retrying");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await;

        if let Err(err) = &result {
            REQ_ERRORS.with_label_values(&[method]).inc();
            warn!(method, error = %err, "opsgenie request failed");
        }
        result
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        method: &'static str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ExporterError> {
        let _permit = self.limiter.acquire().await?;
        let _timer = REQ_LATENCY.with_label_values(&[method]).start_timer();

        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("GenieKey {}", self.api_key))
            .query(query)
            .send()
            .await
            .map_err(|e| ExporterError::Transport(format!("{method} send: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExporterError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        resp.json()
            .await
            .map_err(|e| ExporterError::Decode(format!("{method} body: {e}")))
    }
}

#[async_trait]
impl DataSource for OpsgenieClient {
    async fn count_alerts(&self, query: &str) -> Result<f64, ExporterError> {
        let params: Vec<(&str, String)> = if query.is_empty() {
            Vec::new()
        } else {
            vec![("query", query.to_string())]
        };
        let resp: Envelope<AlertCount> = self
            .get_json("count_alerts", "v2/alerts/count", &params)
            .await?;
        Ok(resp.data.count as f64)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, ExporterError> {
        let resp: Envelope<Vec<TeamRecord>> = self.get_json("list_teams", "v2/teams", &[]).await?;
        Ok(resp.data.into_iter().map(|t| Team::new(t.name)).collect())
    }

    async fn count_users_by_role(&self) -> Result<UserRoleCount, ExporterError> {
        let mut counts = UserRoleCount::new();
        let mut offset: u64 = 0;
        loop {
            let params = [
                ("limit", self.user_page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: UsersPage = self.get_json("list_users", "v2/users", &params).await?;
            let fetched = page.data.len() as u64;

            for user in page.data {
                match user.role {
                    Some(role) if !role.name.is_empty() => {
                        *counts.entry(role.name).or_insert(0.0) += 1.0;
                    }
                    _ => debug!(user = %user.username, "skipping opsgenie user without role"),
                }
            }

            offset += fetched;
            match page.total_count {
                Some(total) if offset < total && fetched > 0 => continue,
                None if fetched == u64::from(self.user_page_size) => continue,
                _ => break,
            }
        }
        Ok(counts)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AlertCount {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct TeamRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersPage {
    #[serde(default)]
    data: Vec<UserRecord>,
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    username: String,
    role: Option<RoleRecord>,
}

#[derive(Debug, Deserialize)]
struct RoleRecord {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_users_page() {
        let page: UsersPage = serde_json::from_str(
            r#"{
                "totalCount": 3,
                "data": [
                    {"username": "a@example.com", "role": {"id": "Admin", "name": "Admin"}},
                    {"username": "b@example.com", "role": {"id": "User", "name": "User"}},
                    {"username": "c@example.com"}
                ],
                "took": 0.1,
                "requestId": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(page.total_count, Some(3));
        assert_eq!(page.data.len(), 3);
        assert!(page.data[2].role.is_none());
    }

    #[test]
    fn decodes_alert_count() {
        let resp: Envelope<AlertCount> =
            serde_json::from_str(r#"{"data":{"count":42},"took":0.01,"requestId":"x"}"#).unwrap();
        assert_eq!(resp.data.count, 42);
    }

    #[test]
    fn transient_classification() {
        assert!(ExporterError::Transport("reset".into()).is_transient());
        for status in [429, 500, 503] {
            let err = ExporterError::Provider {
                status,
                body: String::new(),
            };
            assert!(err.is_transient());
        }
        let err = ExporterError::Provider {
            status: 401,
            body: String::new(),
        };
        assert!(!err.is_transient());
        assert!(!ExporterError::Decode("bad".into()).is_transient());
    }
}
