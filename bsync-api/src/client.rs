//! The API client.

use std::sync::Arc;
use std::time::Duration;

use bsync_common::model::{Tag, UserLevel};
use bsync_common::page::PageSelector;
use bsync_common::PAGE_LIMIT;
use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};

use crate::error::ApiError;
use crate::rate_limit::RateLimit;

/// Inter-attempt sleeps for transport-level failures.
const BACKOFF_MS: [u64; 10] = [100, 250, 250, 500, 500, 500, 1000, 1000, 1000, 1000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Get,
    Post,
    /// A GET encoded as POST with `X-HTTP-Method-Override`, for parameter
    /// sets that would not fit in a URL.
    GetAsPost,
}

/// The account the client authenticated as.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i32,
    pub name: String,
    pub level: UserLevel,
}

/// Authenticated client for the upstream JSON API.
///
/// Cloning is cheap and clones share the same limiter; the client may be
/// used from any number of tasks concurrently.
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    login: String,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimit>,
    user: UserInfo,
}

impl Api {
    /// Build a client and verify the credentials against `profile`.
    ///
    /// The user agent identifies the bot account, and once the profile is
    /// known, the account's numeric id as well.
    pub async fn new(
        login: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        limiter: Arc<RateLimit>,
    ) -> Result<Self, ApiError> {
        let login = login.into();
        let base_url = base_url.into();

        let user_agent = format!("hoshino.bot user {login}");

        let mut api = Self {
            client: Client::builder().user_agent(&user_agent).build()?,
            login,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
            user: UserInfo {
                id: 0,
                name: String::new(),
                level: UserLevel::Anonymous,
            },
        };

        // Verify login
        let profile: Value = api
            .fetch("profile", json!({ "only": "id,name,level" }))
            .await?;

        let id = profile.get("id").and_then(Value::as_i64);
        let name = profile.get("name").and_then(Value::as_str);

        let (Some(id), Some(name)) = (id, name) else {
            return Err(ApiError::InvalidProfile(profile));
        };

        let level = profile
            .get("level")
            .and_then(Value::as_u64)
            .and_then(|code| UserLevel::try_from(code as u8).ok())
            .unwrap_or(UserLevel::Anonymous);

        api.user = UserInfo {
            id: id as i32,
            name: name.to_string(),
            level,
        };

        // Be nice to the operators, tell them who we are
        api.client = Client::builder()
            .user_agent(format!("{user_agent} (#{})", api.user.id))
            .build()?;

        info!(
            "logged in as {} (user #{}), level: {}",
            api.user.name, api.user.id, api.user.level
        );

        Ok(api)
    }

    #[must_use]
    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: Value) -> Result<T, ApiError> {
        self.request(RequestKind::Get, path, params).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Value,
    ) -> Result<T, ApiError> {
        self.request(RequestKind::Post, path, params).await
    }

    /// Semantically a GET, but carried as a POST body so the parameter set
    /// (e.g. a 1000-element name list) is not bound by URL length limits.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Value,
    ) -> Result<T, ApiError> {
        self.request(RequestKind::GetAsPost, path, params).await
    }

    /// One page of the tag index.
    pub async fn tags(&self, page: PageSelector, limit: usize) -> Result<Vec<Tag>, ApiError> {
        if limit > PAGE_LIMIT {
            return Err(ApiError::LimitTooLarge {
                limit,
                max: PAGE_LIMIT,
            });
        }

        self.get("tags", json!({ "page": page, "limit": limit }))
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        kind: RequestKind,
        path: &str,
        params: Value,
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}.json", self.base_url, path);

        for delay in BACKOFF_MS {
            let req = self.build_request(kind, &url, &params);

            self.limiter.acquire().await;

            let begin = Instant::now();
            let res = match req.send().await {
                Ok(res) => res,
                Err(err) => {
                    // Transport-level failure, sleep and retry
                    warn!("transport error: {err}");
                    warn!("{kind:?} - {url} ({:?})", begin.elapsed());
                    sleep(Duration::from_millis(delay)).await;
                    continue;
                }
            };

            let status = res.status().as_u16();
            debug!("{kind:?}: {status} - {url} ({:?})", begin.elapsed());

            if status >= 400 {
                return Err(ApiError::UpstreamHttp {
                    status,
                    url,
                    body: res.text().await.unwrap_or_default(),
                });
            }

            let body = match res.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!("failed to read response: {err}");
                    warn!("{kind:?} - {url}");
                    sleep(Duration::from_millis(delay)).await;
                    continue;
                }
            };

            return match serde_json::from_str(&body) {
                Ok(decoded) => Ok(decoded),
                Err(err) => {
                    error!("JSON error: {err}");
                    error!("{kind:?}: {status} - {url}");

                    if kind == RequestKind::Get {
                        error!("parameters:");
                        if let Some(params) = params.as_object() {
                            for (key, val) in params {
                                error!("    {key} = {val}");
                            }
                        }
                    } else {
                        error!(
                            "body: {}",
                            serde_json::to_string_pretty(&params).unwrap_or_default()
                        );
                    }

                    Err(ApiError::UpstreamParse(err))
                }
            };
        }

        Err(ApiError::UpstreamUnavailable {
            tries: BACKOFF_MS.len(),
            url,
        })
    }

    fn build_request(&self, kind: RequestKind, url: &str, params: &Value) -> RequestBuilder {
        let req = match kind {
            RequestKind::Get => self.client.get(url).query(&query_pairs(params)),
            RequestKind::Post => self.client.post(url).json(params),
            RequestKind::GetAsPost => self
                .client
                .post(url)
                .header("X-HTTP-Method-Override", "get")
                .json(params),
        };

        req.basic_auth(&self.login, Some(&self.api_key))
    }
}

/// Flatten a JSON parameter object into URL query pairs.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(params) = params.as_object() else {
        return Vec::new();
    };

    params
        .iter()
        .map(|(key, val)| {
            let val = match val {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };

            (key.clone(), val)
        })
        .collect()
}
