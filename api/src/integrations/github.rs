use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

use ghn::thread::{Thread, ThreadRepository, ThreadSubject};

use crate::error::GhnApiError;

use super::{Provider, APP_USER_AGENT};

const GITHUB_BASE_URL: &str = "https://api.github.com";

/// The GitHub Notifications API client backing [`Provider`]. Always
/// fetches with `all=true`: GitHub's default (unread-only) would hide
/// re-ingest updates on threads the user has already read, and the store
/// owns read/unread state independently via `Notification::is_read` (§3,
/// §4.10).
#[derive(Clone)]
pub struct GithubProvider {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl GithubProvider {
    pub fn new(auth_token: &str, base_url: Option<String>, page_size: usize) -> anyhow::Result<Self> {
        Ok(GithubProvider {
            client: build_client(auth_token).context("Failed to build GitHub HTTP client")?,
            base_url: base_url.unwrap_or_else(|| GITHUB_BASE_URL.to_string()),
            page_size,
        })
    }

    async fn fetch_page(
        &self,
        page: u32,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut url = format!(
            "{}/notifications?all=true&page={page}&per_page={}",
            self.base_url, self.page_size
        );
        if let Some(since) = since {
            url.push_str(&format!("&since={}", since.to_rfc3339()));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to call the GitHub notifications endpoint")?
            .error_for_status()
            .context("The GitHub notifications endpoint returned an error status")?;

        let raw: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse the GitHub notifications response")?;
        Ok(raw)
    }
}

#[async_trait]
impl Provider for GithubProvider {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Thread>, GhnApiError> {
        let mut threads = Vec::new();
        let mut page = 1u32;
        loop {
            let raw_page = self
                .fetch_page(page, since)
                .await
                .map_err(GhnApiError::Provider)?;
            let is_last_page = raw_page.len() < self.page_size;

            for raw in raw_page {
                match serde_json::from_value::<GithubNotificationDto>(raw.clone()) {
                    Ok(dto) => threads.push(dto.into_thread(raw)),
                    Err(err) => {
                        tracing::warn!("Skipping malformed GitHub notification: {err}");
                    }
                }
            }

            if is_last_page {
                break;
            }
            page += 1;
        }
        Ok(threads)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_subject(&self, url: &str) -> Result<Vec<u8>, GhnApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch a GitHub notification subject")
            .map_err(GhnApiError::Provider)?
            .error_for_status()
            .context("The GitHub subject endpoint returned an error status")
            .map_err(GhnApiError::Provider)?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read a GitHub notification subject body")
            .map_err(GhnApiError::Provider)?;
        Ok(bytes.to_vec())
    }
}

fn build_client(auth_token: &str) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert("Accept", HeaderValue::from_static("application/vnd.github.v3+json"));
    let mut auth_header_value: HeaderValue = format!("token {auth_token}").parse().unwrap();
    auth_header_value.set_sensitive(true);
    headers.insert("Authorization", auth_header_value);

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(APP_USER_AGENT)
        .build()
}

#[derive(Debug, Deserialize)]
struct GithubNotificationDto {
    id: String,
    unread: bool,
    reason: String,
    updated_at: DateTime<Utc>,
    last_read_at: Option<DateTime<Utc>>,
    subscription_url: Option<String>,
    subject: GithubSubjectDto,
    repository: GithubRepositoryDto,
}

#[derive(Debug, Deserialize)]
struct GithubSubjectDto {
    title: String,
    url: Option<String>,
    latest_comment_url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GithubRepositoryDto {
    full_name: String,
    id: u64,
    node_id: String,
    description: Option<String>,
    private: bool,
    default_branch: Option<String>,
    pushed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl GithubNotificationDto {
    fn into_thread(self, raw: Value) -> Thread {
        let repository_raw = raw
            .get("repository")
            .cloned()
            .unwrap_or(Value::Null);

        Thread {
            external_id: self.id,
            repository: ThreadRepository {
                full_name: self.repository.full_name,
                github_id: self.repository.id.to_string(),
                github_node_id: self.repository.node_id,
                description: self.repository.description,
                private: self.repository.private,
                default_branch: self.repository.default_branch,
                pushed_at: self.repository.pushed_at,
                updated_at: self.repository.updated_at,
                raw: repository_raw,
            },
            subject: ThreadSubject {
                kind: self.subject.kind,
                title: self.subject.title,
                url: self.subject.url,
                latest_comment_url: self.subject.latest_comment_url,
            },
            reason: self.reason,
            unread: self.unread,
            updated_at: self.updated_at,
            last_read_at: self.last_read_at,
            subscription_url: self.subscription_url,
            raw,
        }
    }
}
