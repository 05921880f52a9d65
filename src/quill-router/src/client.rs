//! Capabilities the router needs from the messaging platform.

use async_trait::async_trait;

use crate::argument::Choice;
use crate::error::{ClientError, RespondError};
use crate::model::{Channel, Guild, Id, Member, Message, Role, User};

/// Entity lookups. Implementations must be safe to call concurrently.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn user(&self, id: Id) -> Result<User, ClientError>;

    /// A user's membership in a guild. `NotFound` if the user is not a member.
    async fn member(&self, guild_id: Id, user_id: Id) -> Result<Member, ClientError>;

    async fn channel(&self, id: Id) -> Result<Channel, ClientError>;

    async fn guild(&self, id: Id) -> Result<Guild, ClientError>;

    /// A role of a guild. `NotFound` if the guild has no such role.
    async fn role(&self, guild_id: Id, role_id: Id) -> Result<Role, ClientError>;
}

/// Sends responses for one invocation.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send a message to the invocation's channel.
    async fn send(&self, text: &str) -> Result<Message, RespondError>;

    /// Reply to the invocation.
    async fn reply(&self, text: &str) -> Result<Message, RespondError>;

    /// Answer an autocomplete request.
    async fn suggest(&self, _choices: &[Choice]) -> Result<(), RespondError> {
        Err(RespondError::Unsupported("autocomplete"))
    }
}
