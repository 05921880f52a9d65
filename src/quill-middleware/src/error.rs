//! Rejections raised by middleware.

use std::time::Duration;

use quill_router::{ChannelKind, ClientError, Permissions};
use thiserror::Error;

/// Why a middleware stopped an invocation.
///
/// Stored in the context under [`ERROR_KEY`](crate::catch::ERROR_KEY) before
/// the catch function runs. `Display` is suitable as a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    #[error("this command can only be used in an NSFW channel")]
    ChannelNotNsfw,

    #[error("this command can only be used in {expected} channels")]
    ChannelKind {
        expected: ChannelKind,
        actual: ChannelKind,
    },

    #[error("this command can only be used in a server")]
    GuildOnly,

    #[error("you are missing permissions: {missing}")]
    MissingPermissions { missing: Permissions },

    /// The invoking member or their roles could not be fetched.
    #[error("could not check permissions: {0}")]
    PermissionLookup(ClientError),

    /// The invocation's cooldown bucket is empty.
    #[error("slow down, try again in {}s", .retry_after.as_secs_f64().ceil())]
    CoolingDown { retry_after: Duration },
}
