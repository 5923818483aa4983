//! Cookie-authenticated client for the private web API.
//!
//! Login is a two-step form flow: the login page hands out a `dogwebl`
//! cookie which is echoed back as `_authentication_token` together with
//! the credentials. The resulting session cookies live in the shared jar
//! and are sent with every later request.

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, Instrument};
use url::Url;

use super::urls;
use super::{Account, MetricDetail, MetricName, MetricsApi};
use crate::error::{LeashError, Result};
use crate::observability::spans;

const AUTH_COOKIE: &str = "dogwebl";

#[derive(Deserialize)]
struct MetricList {
    metrics: Vec<MetricName>,
}

#[derive(Deserialize)]
struct HostsAndTags {
    #[serde(alias = "numContexts", alias = "NumContexts")]
    num_contexts: u64,
}

pub struct WebClient {
    account: Account,
    root: Url,
    jar: Arc<Jar>,
    http: reqwest::Client,
    session: OnceCell<()>,
}

impl WebClient {
    /// Client for `https://{team}.datadoghq.com/`.
    pub fn new(account: Account, timeout: Duration) -> Result<Self> {
        let root = urls::root_url(&account.team)?;
        Self::with_root(account, root, timeout)
    }

    /// Client against an explicit root URL.
    pub fn with_root(account: Account, root: Url, timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .build()?;

        Ok(WebClient {
            account,
            root,
            jar,
            http,
            session: OnceCell::new(),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.initialized()
    }

    async fn login(&self) -> Result<()> {
        let token = self.fetch_auth_token().await?;
        let login_url = urls::login_url(&self.root)?;

        let form = [
            ("username", self.account.user.as_str()),
            ("password", self.account.password.as_str()),
            ("_authentication_token", token.as_str()),
        ];
        let response = self.http.post(login_url).form(&form).send().await?;
        if response.status() != StatusCode::OK {
            return Err(LeashError::LoginRejected {
                status: response.status().as_u16(),
            });
        }

        info!(team = %self.account.team, user = %self.account.user, "logged in");
        Ok(())
    }

    async fn fetch_auth_token(&self) -> Result<String> {
        let login_url = urls::login_url(&self.root)?;
        let response = self.http.get(login_url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            return Err(LeashError::Status {
                url: login_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let cookies = self.jar.cookies(&login_url).ok_or(LeashError::CookieNotFound)?;
        let cookies = cookies.to_str().map_err(|_| LeashError::CookieNotFound)?;
        find_cookie(cookies, AUTH_COOKIE).ok_or(LeashError::CookieNotFound)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        if !self.is_logged_in() {
            return Err(LeashError::NotAuthenticated);
        }

        debug!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            return Err(LeashError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| LeashError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl MetricsApi for WebClient {
    async fn ensure_authenticated(&self) -> Result<()> {
        self.session
            .get_or_try_init(|| self.login().instrument(spans::login_span(&self.account.team)))
            .await?;
        Ok(())
    }

    async fn enumerate_names(&self, window: u32) -> Result<Vec<MetricName>> {
        let url = urls::metric_list_url(&self.root, window)?;
        let list: MetricList = self.get_json(url).await?;
        Ok(list.metrics)
    }

    async fn fetch_detail(&self, name: &MetricName, window: u32) -> Result<MetricDetail> {
        let url = urls::hosts_and_tags_url(&self.root, name.as_str(), window)?;
        let hosts_tags: HostsAndTags = self.get_json(url).await?;
        Ok(MetricDetail {
            name: name.clone(),
            num_contexts: hosts_tags.num_contexts,
        })
    }
}

/// Value of `name` in a `Cookie` header (`a=1; b=2`).
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
