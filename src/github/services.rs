use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GithubConfig;

/// The subset of repository fields the client cares about. Everything else
/// in the upstream payload is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub watchers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
}

/// Upstream repo lookup. `Ok(None)` means the upstream answered but not with
/// success (unknown user, rate limit); a transport failure is an `Err`.
#[async_trait]
pub trait RepoLookup: Send + Sync {
    async fn recent_repos(&self, username: &str) -> anyhow::Result<Option<Vec<RepoSummary>>>;
}

pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        // GitHub rejects requests without a User-Agent.
        let http = reqwest::Client::builder()
            .user_agent(concat!("devconnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build github http client")?;
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl RepoLookup for GithubClient {
    async fn recent_repos(&self, username: &str) -> anyhow::Result<Option<Vec<RepoSummary>>> {
        let url = format!("{}/users/{}/repos", self.api_base, username);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("per_page", "5"),
                ("sort", "created:asc"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .context("github request")?;

        if !response.status().is_success() {
            warn!(username = %username, status = %response.status(), "github lookup non-success");
            return Ok(None);
        }

        let repos = response
            .json::<Vec<RepoSummary>>()
            .await
            .context("decode github response")?;
        Ok(Some(repos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_summary_decodes_github_shape() {
        let body = serde_json::json!([{
            "name": "devconnect",
            "html_url": "https://github.com/dev/devconnect",
            "description": null,
            "stargazers_count": 3,
            "watchers_count": 3,
            "forks_count": 1,
            "full_name": "dev/devconnect",
            "private": false
        }]);
        let repos: Vec<RepoSummary> = serde_json::from_value(body).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "devconnect");
        assert!(repos[0].description.is_none());
        assert_eq!(repos[0].stargazers_count, 3);
    }

    #[test]
    fn repo_summary_tolerates_missing_counters() {
        let body = serde_json::json!([{
            "name": "tiny",
            "html_url": "https://github.com/dev/tiny"
        }]);
        let repos: Vec<RepoSummary> = serde_json::from_value(body).unwrap();
        assert_eq!(repos[0].forks_count, 0);
    }
}
