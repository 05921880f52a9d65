//! Reusable middleware for quill routers.
//!
//! - [`catch`]: how a middleware reports a rejected invocation.
//! - [`channel`]: guards on the channel a command is used in and the
//!   permissions of the member using it.
//! - [`cooldown`]: per-user, per-channel or global rate limits.
//!
//! ```rust,ignore
//! use quill_middleware::{
//!     CooldownConfig, CooldownStore, Scope, catch_reply, cooldown, require_nsfw,
//! };
//!
//! let store = CooldownStore::new();
//! let _sweeper = store.spawn_sweeper(Duration::from_secs(3600));
//!
//! router
//!     .root()
//!     .use_middleware([
//!         require_nsfw(Some(catch_reply("Not here."))),
//!         cooldown(
//!             store.clone(),
//!             CooldownConfig::new(2, Duration::from_secs(10), Scope::USER),
//!             None,
//!         ),
//!     ])
//!     .on("meme", Some(meme));
//! ```

pub mod catch;
pub mod channel;
pub mod cooldown;
pub mod error;

pub use catch::{CatchFn, ERROR_KEY, catch_error, catch_reply};
pub use channel::{channel_kind, require_nsfw, require_permissions};
pub use cooldown::{CooldownConfig, CooldownStore, Scope, cooldown};
pub use error::MiddlewareError;
