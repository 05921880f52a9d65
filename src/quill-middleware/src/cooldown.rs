//! Cooldowns.
//!
//! Each invocation draws one token from a bucket chosen by [`Scope`]. A
//! bucket holds up to `limit` tokens and refills at `limit` tokens per
//! window. Buckets live in a [`CooldownStore`] and expire two windows after
//! their last use, either lazily on the next check or when the store is
//! swept.

use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use dashmap::DashMap;
use quill_router::{Context, Handler, Middleware, handler, middleware};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::catch::{CatchFn, call_catch};
use crate::error::MiddlewareError;

bitflags! {
    /// Which parts of an invocation select its bucket.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Scope: u8 {
        /// The matched command.
        const COMMAND = 1;
        /// The invoking user.
        const USER    = 1 << 1;
        const CHANNEL = 1 << 2;
        const GUILD   = 1 << 3;
        /// One bucket for everything.
        const GLOBAL  = 1 << 4;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::COMMAND | Self::USER
    }
}

impl Scope {
    /// Bucket key for an invocation, such as `command_ping_user_10`.
    pub fn key(self, ctx: &Context) -> String {
        let mut parts: Vec<String> = Vec::new();

        if self.contains(Self::COMMAND) {
            let path = ctx.path().join(" ");
            let command = if path.is_empty() { ctx.command.clone() } else { path };
            parts.extend(["command".to_string(), command]);
        }
        if self.contains(Self::USER) {
            parts.extend(["user".to_string(), ctx.user.id.to_string()]);
        }
        if self.contains(Self::CHANNEL) {
            parts.extend(["channel".to_string(), ctx.channel.id.to_string()]);
        }
        if self.contains(Self::GUILD) {
            let guild = ctx.guild_id().map(|id| id.to_string()).unwrap_or_default();
            parts.extend(["guild".to_string(), guild]);
        }
        if self.contains(Self::GLOBAL) {
            parts.push("global".to_string());
        }

        parts.join("_")
    }
}

/// Limit and window of a cooldown.
///
/// ```toml
/// limit = 2
/// window_secs = 10
/// scope = "COMMAND | USER"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Invocations allowed per window.
    pub limit: u32,
    pub window_secs: u64,
    #[serde(default)]
    pub scope: Scope,
}

impl CooldownConfig {
    pub fn new(limit: u32, window: Duration, scope: Scope) -> Self {
        Self {
            limit,
            window_secs: window.as_secs(),
            scope,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    updated: Instant,
    expires: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant, ttl: Duration) -> Self {
        Self {
            tokens: capacity,
            updated: now,
            expires: now + ttl,
        }
    }

    fn refill(&mut self, now: Instant, capacity: f64, window: Duration) {
        let elapsed = now.saturating_duration_since(self.updated).as_secs_f64();
        self.tokens = (self.tokens + elapsed * capacity / window.as_secs_f64()).min(capacity);
        self.updated = now;
    }
}

/// Token buckets keyed by invocation scope.
///
/// Cloning shares the buckets, so one store can back several cooldown
/// middlewares.
#[derive(Debug, Clone, Default)]
pub struct CooldownStore {
    buckets: Arc<DashMap<String, Bucket>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a token from the bucket under `key`.
    ///
    /// Returns how long until a token is available when the bucket is empty.
    pub fn check(&self, key: &str, config: &CooldownConfig) -> Result<(), Duration> {
        self.check_at(key, config, Instant::now())
    }

    pub fn check_at(
        &self,
        key: &str,
        config: &CooldownConfig,
        now: Instant,
    ) -> Result<(), Duration> {
        let window = config.window();
        if window.is_zero() {
            return Ok(());
        }
        if config.limit == 0 {
            return Err(window);
        }

        let capacity = f64::from(config.limit);
        let ttl = window * 2;
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(capacity, now, ttl));

        if bucket.expires <= now {
            *bucket = Bucket::full(capacity, now, ttl);
        }
        bucket.refill(now, capacity, window);
        bucket.expires = now + ttl;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let missing = 1.0 - bucket.tokens;
        Err(Duration::from_secs_f64(missing * window.as_secs_f64() / capacity))
    }

    /// Drop expired buckets, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.expires > now);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sweep the store every `every` on the current tokio runtime.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    info!(removed, remaining = store.len(), "swept cooldown buckets");
                }
            }
        })
    }
}

/// Limit how often the wrapped handler runs.
///
/// Rejected invocations go to `catch` with a
/// [`MiddlewareError::CoolingDown`].
pub fn cooldown(
    store: CooldownStore,
    config: CooldownConfig,
    catch: Option<CatchFn>,
) -> Middleware {
    let config = Arc::new(config);
    middleware(move |next: Handler| {
        let store = store.clone();
        let config = config.clone();
        let catch = catch.clone();
        handler(move |ctx| {
            let next = next.clone();
            let store = store.clone();
            let config = config.clone();
            let catch = catch.clone();
            Box::pin(async move {
                let key = config.scope.key(ctx);
                if let Err(retry_after) = store.check(&key, &config) {
                    debug!(key = %key, ?retry_after, "cooldown active");
                    let err = MiddlewareError::CoolingDown { retry_after };
                    call_catch(ctx, catch.as_ref(), err).await;
                    return;
                }
                next(ctx).await;
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catch::catch_error;
    use pretty_assertions::assert_eq;
    use quill_router::testing::{MockClient, RecordingResponder};
    use quill_router::{Id, Router, User};

    fn config(limit: u32, secs: u64, scope: Scope) -> CooldownConfig {
        CooldownConfig::new(limit, Duration::from_secs(secs), scope)
    }

    #[tokio::test]
    async fn test_bucket_refills_over_window() {
        let store = CooldownStore::new();
        let config = config(2, 10, Scope::GLOBAL);
        let start = Instant::now();

        assert_eq!(store.check_at("k", &config, start), Ok(()));
        assert_eq!(store.check_at("k", &config, start), Ok(()));
        assert_eq!(
            store.check_at("k", &config, start),
            Err(Duration::from_secs(5))
        );

        // Half a window refills one of two tokens.
        assert_eq!(store.check_at("k", &config, start + Duration::from_secs(5)), Ok(()));
        assert!(store.check_at("k", &config, start + Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = CooldownStore::new();
        let config = config(1, 60, Scope::USER);
        let now = Instant::now();

        assert_eq!(store.check_at("a", &config, now), Ok(()));
        assert_eq!(store.check_at("b", &config, now), Ok(()));
        assert!(store.check_at("a", &config, now).is_err());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expiry_and_sweep() {
        let store = CooldownStore::new();
        let config = config(1, 10, Scope::GLOBAL);
        let start = Instant::now();

        store.check_at("old", &config, start).unwrap();
        store.check_at("new", &config, start + Duration::from_secs(15)).unwrap();

        assert_eq!(store.sweep_at(start + Duration::from_secs(20)), 1);
        assert_eq!(store.len(), 1);

        // A lazily expired bucket starts full again.
        let later = start + Duration::from_secs(60);
        assert_eq!(store.check_at("new", &config, later), Ok(()));
    }

    #[tokio::test]
    async fn test_degenerate_configs() {
        let store = CooldownStore::new();
        let now = Instant::now();

        assert_eq!(
            store.check_at("k", &config(0, 10, Scope::GLOBAL), now),
            Err(Duration::from_secs(10))
        );
        for _ in 0..5 {
            assert_eq!(store.check_at("k", &config(1, 0, Scope::GLOBAL), now), Ok(()));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let config: CooldownConfig = toml::from_str(
            r#"
            limit = 3
            window_secs = 30
            scope = "COMMAND | CHANNEL"
            "#,
        )
        .unwrap();
        assert_eq!(config, self::config(3, 30, Scope::COMMAND | Scope::CHANNEL));

        let config: CooldownConfig = toml::from_str("limit = 1\nwindow_secs = 5").unwrap();
        assert_eq!(config.scope, Scope::COMMAND | Scope::USER);
    }

    fn context(router: &Arc<Router>, user: u64) -> (Context, Arc<RecordingResponder>) {
        let responder = Arc::new(RecordingResponder::new());
        let id = router.find(&["ping"]).unwrap();
        let ctx = Context::builder(router.clone(), responder.clone(), Arc::new(MockClient::new()))
            .route(id)
            .command("PING")
            .user(User {
                id: Id::new(user),
                ..Default::default()
            })
            .build();
        (ctx, responder)
    }

    #[test]
    fn test_scope_key() {
        let mut router = Router::new();
        router.root().on("ping", Some(handler(|_ctx| Box::pin(async {}))));
        let router = Arc::new(router);
        let (ctx, _) = context(&router, 10);

        assert_eq!((Scope::COMMAND | Scope::USER).key(&ctx), "command_ping_user_10");
        assert_eq!((Scope::CHANNEL | Scope::GUILD).key(&ctx), "channel_0_guild_");
        assert_eq!(Scope::GLOBAL.key(&ctx), "global");
    }

    #[tokio::test]
    async fn test_cooldown_middleware() {
        let store = CooldownStore::new();
        let mut router = Router::new();
        router
            .root()
            .use_middleware([cooldown(
                store.clone(),
                config(1, 60, Scope::USER),
                Some(catch_error()),
            )])
            .on(
                "ping",
                Some(handler(|ctx| {
                    Box::pin(async move {
                        let _ = ctx.reply("pong").await;
                    })
                })),
            );
        let router = Arc::new(router);

        let (mut ctx, responder) = context(&router, 10);
        ctx.call().await.unwrap();
        ctx.call().await.unwrap();
        let replies = responder.replies();
        assert_eq!(replies[0], "pong");
        assert_eq!(replies[1], "slow down, try again in 60s");

        let (mut ctx, responder) = context(&router, 11);
        ctx.call().await.unwrap();
        assert_eq!(responder.replies(), vec!["pong".to_string()]);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task() {
        let store = CooldownStore::new();
        store.check("k", &config(1, 1, Scope::GLOBAL)).unwrap();

        let sweeper = store.spawn_sweeper(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.is_empty());
        sweeper.abort();
    }
}
