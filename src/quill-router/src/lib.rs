//! Command routing for chat bots.
//!
//! Commands are declared with one-line signatures and arranged in a tree of
//! nested sub-commands. The same tree serves free-text commands and the
//! platform's structured (slash) commands.
//!
//! # Signatures
//!
//! ```text
//! ban <@user> [reason] [days int min:0 max:7]
//! ```
//!
//! `<...>` is required and `[...]` optional. Sigils `:` `@` `#` `&` declare
//! emoji, user, channel and role arguments; `int`, `float` and `bool` after
//! the name declare numeric and boolean ones. `min:`, `max:` and `options:`
//! attach constraints.
//!
//! # Building a tree
//!
//! ```rust,ignore
//! use quill_router::{Router, handler};
//!
//! let mut router = Router::new();
//! router
//!     .root()
//!     .on("ping", Some(handler(|ctx| Box::pin(async move {
//!         let _ = ctx.reply("pong").await;
//!     }))))
//!     .alias("p");
//!
//! router.root().on("config", None).on("set <key> <value>", Some(set_handler));
//! ```
//!
//! # Dispatching
//!
//! ```rust,ignore
//! let router = Arc::new(router);
//! if let Some(matched) = router.parse_message(&event.content) {
//!     let mut ctx =
//!         Context::from_message(router.clone(), &event, matched, responder, client).await?;
//!     ctx.call().await?;
//! }
//! ```
//!
//! Structured commands go through [`Context::from_interaction`] and
//! autocomplete requests through [`Context::from_autocomplete`] and
//! [`Router::call_autocomplete`]. Exported routes are pushed to the platform
//! with [`register_commands`].

pub mod argument;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod interaction;
pub mod model;
pub mod resolve;
pub mod route;
pub mod signature;
pub mod validate;
pub mod value;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use argument::{Argument, ArgumentKind, AutocompleteHandler, Bound, Choice};
pub use client::{PlatformClient, Responder};
pub use config::RouterConfig;
pub use context::{Context, ContextBuilder, InteractionEvent, MessageEvent, Vars};
pub use dispatch::{MessageMatch, Outcome, tokenize};
pub use error::{
    ClientError, ConfigError, ExportError, RespondError, RouterError, RouterResult, SignatureError,
    SignatureResult, ValidationError,
};
pub use export::{
    CommandRegistrar, CommandSchema, OptionSchema, RegisteredCommand, export_commands,
    register_commands,
};
pub use interaction::{InteractionOption, OptionKind, OptionValue};
pub use model::{
    Channel, ChannelKind, Emoji, EntityKind, Guild, Id, Member, Message, Permissions, Role, User,
};
pub use resolve::{OptionResolver, PositionalResolver, RawInput, Resolver, Scope};
pub use route::{
    FindOptions, Group, Handler, Middleware, Route, RouteBuilder, RouteId, Router, handler,
    middleware,
};
pub use signature::{Signature, parse_signature};
pub use validate::validate;
pub use value::{ArgValue, Arguments};

#[cfg(test)]
mod tests;
