//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use analytics::{HeatmapCache, QueryBudget};
use engine_core::{AuthErrorCode, Error};
use event_store::EventStore;
use moka::future::Cache;
use realtime::{Hub, Relay};
use tracing::{debug, warn};

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};

/// Cache TTL for role-service answers (30 seconds).
const ROLE_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum role cache entries.
const ROLE_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Identity of an authenticated dashboard admin.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin_id: String,
}

/// Role-service client.
///
/// Consumed for two things only: excluding admin self-traffic from
/// ingestion, and gating the dashboard read endpoints. Answers are cached
/// for 30 seconds to keep the role service off the hot path.
#[derive(Clone)]
pub struct RoleClient {
    /// Role service URL (e.g. "http://role-service:8080")
    base_url: String,
    http_client: reqwest::Client,
    /// user id -> is admin
    admin_cache: Cache<String, bool>,
    /// admin token -> admin id
    token_cache: Cache<String, String>,
    /// Deterministic answers when no URL is configured (tests/dev).
    mock_mode: bool,
}

impl RoleClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
            admin_cache: Cache::builder()
                .max_capacity(ROLE_CACHE_MAX_CAPACITY)
                .time_to_live(ROLE_CACHE_TTL)
                .build(),
            token_cache: Cache::builder()
                .max_capacity(ROLE_CACHE_MAX_CAPACITY)
                .time_to_live(ROLE_CACHE_TTL)
                .build(),
            mock_mode,
        }
    }

    /// Whether this user id belongs to an admin account.
    ///
    /// Fails open: a role-service outage must never drop visitor traffic,
    /// so lookup errors answer `false` after a warning.
    pub async fn is_admin_user(&self, user_id: &str) -> bool {
        if let Some(cached) = self.admin_cache.get(user_id).await {
            debug!("Role cache hit");
            return cached;
        }

        let is_admin = if self.mock_mode {
            user_id.starts_with("admin")
        } else {
            match self.remote_role(user_id).await {
                Ok(role) => role == "admin",
                Err(e) => {
                    warn!(error = %e, user_id = %user_id, "Role lookup failed, not excluding");
                    false
                }
            }
        };

        self.admin_cache.insert(user_id.to_string(), is_admin).await;
        is_admin
    }

    async fn remote_role(&self, user_id: &str) -> Result<String, Error> {
        #[derive(serde::Deserialize)]
        struct RoleResponse {
            role: String,
        }

        let url = format!("{}/internal/roles/{}", self.base_url, user_id);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::internal(format!("Role service unavailable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::internal(format!(
                "Role service returned {}",
                response.status()
            )));
        }

        let body: RoleResponse = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("Invalid role response: {}", e)))?;
        Ok(body.role)
    }

    /// Verifies a dashboard admin token.
    pub async fn verify_admin_token(&self, token: &str) -> Result<AdminIdentity, Error> {
        if let Some(admin_id) = self.token_cache.get(token).await {
            return Ok(AdminIdentity { admin_id });
        }

        let admin_id = if self.mock_mode {
            // Deterministic mock: tokens prefixed "adm_" are valid admins.
            if token.starts_with("adm_") {
                format!("admin-{:x}", simple_hash(token))
            } else {
                return Err(Error::auth(
                    AuthErrorCode::InvalidToken,
                    "Invalid admin token",
                ));
            }
        } else {
            self.remote_verify(token).await?
        };

        self.token_cache
            .insert(token.to_string(), admin_id.clone())
            .await;
        Ok(AdminIdentity { admin_id })
    }

    async fn remote_verify(&self, token: &str) -> Result<String, Error> {
        #[derive(serde::Serialize)]
        struct VerifyRequest<'a> {
            token: &'a str,
        }
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct VerifyResponse {
            valid: bool,
            role: Option<String>,
            admin_id: Option<String>,
        }

        let url = format!("{}/internal/auth/verify", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&VerifyRequest { token })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Role service request failed");
                Error::internal(format!("Role service unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Error::auth(
                AuthErrorCode::InvalidToken,
                "Invalid admin token",
            ));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("Invalid verify response: {}", e)))?;

        if !body.valid {
            return Err(Error::auth(
                AuthErrorCode::InvalidToken,
                "Invalid admin token",
            ));
        }
        if body.role.as_deref() != Some("admin") {
            return Err(Error::auth(
                AuthErrorCode::NotAdmin,
                "Token lacks the admin role",
            ));
        }
        body.admin_id
            .ok_or_else(|| Error::internal("Verify response missing adminId"))
    }
}

fn simple_hash(s: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (in-memory engine in the single-node deployment).
    pub store: Arc<dyn EventStore>,
    /// Relay (rooms + active-recording slot).
    pub relay: Relay,
    /// Heatmap snapshot cache.
    pub heatmaps: Arc<HeatmapCache>,
    /// Role-service client.
    pub role_client: RoleClient,
    /// Ingestion admission control.
    pub rate_limiter: SharedRateLimiter,
    /// Hard time budget for aggregation compute.
    pub budget: QueryBudget,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, hub: Arc<Hub>, role_url: impl Into<String>) -> Self {
        Self::with_rate_limit(store, hub, role_url, RateLimitConfig::default())
    }

    /// Create with custom admission-control config.
    pub fn with_rate_limit(
        store: Arc<dyn EventStore>,
        hub: Arc<Hub>,
        role_url: impl Into<String>,
        rate_config: RateLimitConfig,
    ) -> Self {
        Self {
            relay: Relay::new(hub, store.clone()),
            store,
            heatmaps: Arc::new(HeatmapCache::new()),
            role_client: RoleClient::new(role_url),
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
            budget: QueryBudget::default(),
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        self.relay.hub()
    }

    /// Start the rate limiter cleanup background task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // 5 minutes
            loop {
                interval.tick().await;
                rate_limiter.cleanup_stale(Duration::from_secs(600));
            }
        })
    }
}
