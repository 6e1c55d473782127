//! reqwest-backed client for a Virtuoso-style triple store.
//!
//! Writes go to the SPARQL Graph Store CRUD endpoint with authentication;
//! queries go to the public SPARQL endpoint as form-encoded POSTs.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Request, Response, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::digest::DigestChallenge;
use super::error::{Result, StoreError};
use super::results::{parse_select_results, QueryRow};
use super::TripleStore;
use crate::config::{AuthScheme, RetryConfig, StoreConfig};
use crate::sanitize::{redact_endpoint, truncate_body};
use crate::secrets::StoreCredentials;

const TURTLE: &str = "text/turtle";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Cached digest challenge plus the nonce count already used against it.
struct DigestState {
    challenge: DigestChallenge,
    nc: u32,
}

/// Triple store reached over HTTP.
pub struct HttpTripleStore {
    client: Client,
    crud_endpoint: String,
    sparql_endpoint: String,
    credentials: StoreCredentials,
    auth: AuthScheme,
    retry: RetryConfig,
    digest: Mutex<Option<DigestState>>,
}

impl std::fmt::Debug for HttpTripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTripleStore")
            .field("crud_endpoint", &redact_endpoint(&self.crud_endpoint))
            .field("sparql_endpoint", &redact_endpoint(&self.sparql_endpoint))
            .field("auth", &self.auth)
            .finish()
    }
}

impl HttpTripleStore {
    /// Creates a client with a pooled connection set sized from the config.
    pub fn new(config: &StoreConfig, credentials: StoreCredentials) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| StoreError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            crud_endpoint: config.crud_endpoint(),
            sparql_endpoint: config.sparql_endpoint(),
            credentials,
            auth: config.auth,
            retry: config.retry.clone(),
            digest: Mutex::new(None),
        })
    }

    pub fn sparql_endpoint(&self) -> &str {
        &self.sparql_endpoint
    }

    fn crud_request(
        &self,
        method: Method,
        graph_uri: &str,
        body: Option<&str>,
        timeout: Duration,
    ) -> reqwest::Result<Request> {
        let mut builder = self
            .client
            .request(method, &self.crud_endpoint)
            .query(&[("graph", graph_uri)])
            .timeout(timeout);
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, TURTLE)
                .body(body.to_string());
        }
        if self.auth == AuthScheme::Basic {
            builder = builder.basic_auth(
                &self.credentials.username,
                Some(self.credentials.password.expose_secret()),
            );
        }
        builder.build()
    }

    /// Adds a digest `Authorization` header if a challenge is cached.
    fn apply_digest(&self, mut request: Request) -> Request {
        let cached = {
            let mut guard = match self.digest.lock() {
                Ok(g) => g,
                Err(poisoned) => {
                    warn!("Digest state lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            guard.as_mut().map(|state| {
                state.nc += 1;
                (state.challenge.clone(), state.nc)
            })
        };
        let Some((challenge, nc)) = cached else {
            return request;
        };

        let url = request.url();
        let uri = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        let header = challenge.authorization(
            &self.credentials.username,
            self.credentials.password.expose_secret(),
            request.method().as_str(),
            &uri,
            nc,
            &cnonce[..16],
        );
        match HeaderValue::from_str(&header) {
            Ok(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Could not encode digest authorization header"),
        }
        request
    }

    fn store_challenge(&self, challenge: DigestChallenge) {
        let mut guard = match self.digest.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(DigestState { challenge, nc: 0 });
    }

    /// Sends one authenticated CRUD request, answering a digest challenge once.
    async fn send_crud(
        &self,
        method: Method,
        graph_uri: &str,
        body: Option<&str>,
        timeout: Duration,
    ) -> reqwest::Result<Response> {
        let request = self.crud_request(method.clone(), graph_uri, body, timeout)?;
        let request = if self.auth == AuthScheme::Digest {
            self.apply_digest(request)
        } else {
            request
        };
        let response = self.client.execute(request).await?;

        if self.auth != AuthScheme::Digest || response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(DigestChallenge::parse);
        let Some(challenge) = challenge else {
            return Ok(response);
        };

        debug!(realm = %challenge.realm, "Answering digest challenge");
        self.store_challenge(challenge);
        let request = self.apply_digest(self.crud_request(method, graph_uri, body, timeout)?);
        self.client.execute(request).await
    }

    async fn send_query(&self, sparql: &str, timeout: Duration) -> reqwest::Result<Response> {
        self.client
            .post(&self.sparql_endpoint)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", sparql)])
            .timeout(timeout)
            .send()
            .await
    }

    /// Runs `attempt` until it yields a non-retryable answer or the budget runs out.
    ///
    /// Timeouts back off longer than other failures.
    async fn with_retry<F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<Response>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut n = 0;

        loop {
            n += 1;
            match attempt().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !self.retry.retryable_statuses.contains(&status) {
                        return Ok(response);
                    }
                    if n >= max_attempts {
                        return Err(StoreError::RetriesExhausted {
                            status,
                            attempts: n,
                        });
                    }
                    warn!(
                        operation,
                        attempt = n,
                        max_attempts,
                        status,
                        "Store answered with retryable status"
                    );
                    tokio::time::sleep(Duration::from_millis(self.retry.error_backoff_ms)).await;
                }
                Err(e) => {
                    let timed_out = e.is_timeout();
                    let message = e.without_url().to_string();
                    if n >= max_attempts {
                        return Err(if timed_out {
                            StoreError::Timeout { attempts: n }
                        } else {
                            StoreError::Transport {
                                attempts: n,
                                message,
                            }
                        });
                    }
                    let backoff = if timed_out {
                        self.retry.timeout_backoff_ms
                    } else {
                        self.retry.error_backoff_ms
                    };
                    warn!(
                        operation,
                        attempt = n,
                        max_attempts,
                        timed_out,
                        backoff_ms = backoff,
                        error = %message,
                        "Store request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }
}

async fn rejected(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED.as_u16() || status == StatusCode::FORBIDDEN.as_u16() {
        return StoreError::Auth(format!("HTTP {}", status));
    }
    StoreError::Rejected {
        status,
        body: truncate_body(&body),
    }
}

#[async_trait]
impl TripleStore for HttpTripleStore {
    async fn write(&self, graph_uri: &str, data: String, timeout: Duration) -> Result<()> {
        let this = self;
        let data = data.as_str();
        debug!(
            endpoint = %redact_endpoint(&self.crud_endpoint),
            graph = graph_uri,
            bytes = data.len(),
            "Writing triples"
        );

        let response = self
            .with_retry("write", move || {
                this.send_crud(Method::POST, graph_uri, Some(data), timeout)
            })
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            _ => Err(rejected(response).await),
        }
    }

    async fn query(&self, sparql: &str, timeout: Duration) -> Result<Vec<QueryRow>> {
        let this = self;
        let response = self
            .with_retry("query", move || this.send_query(sparql, timeout))
            .await?;

        if response.status() != StatusCode::OK {
            return Err(rejected(response).await);
        }
        let body = response.text().await.map_err(|e| StoreError::Transport {
            attempts: 1,
            message: e.without_url().to_string(),
        })?;
        Ok(parse_select_results(&body))
    }

    async fn delete_graph(&self, graph_uri: &str, timeout: Duration) -> Result<()> {
        let this = self;
        let response = self
            .with_retry("delete", move || {
                this.send_crud(Method::DELETE, graph_uri, None, timeout)
            })
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::GraphNotFound(graph_uri.to_string())),
            _ => Err(rejected(response).await),
        }
    }
}
