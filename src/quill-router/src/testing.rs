//! In-memory collaborators for tests.
//!
//! Compiled for this crate's tests and, through the `test-util` feature,
//! for tests of crates building on the router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::argument::Choice;
use crate::client::{PlatformClient, Responder};
use crate::error::{ClientError, RespondError};
use crate::export::{CommandRegistrar, CommandSchema, RegisteredCommand};
use crate::model::{Channel, EntityKind, Guild, Id, Member, Message, Role, User};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`PlatformClient`] backed by maps.
#[derive(Debug, Default)]
pub struct MockClient {
    users: HashMap<Id, User>,
    members: HashMap<(Id, Id), Member>,
    channels: HashMap<Id, Channel>,
    guilds: HashMap<Id, Guild>,
    roles: HashMap<(Id, Id), Role>,
    failing: bool,
    lookups: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    /// Add a guild member; the user becomes known as well.
    pub fn with_member(mut self, member: Member) -> Self {
        self.users.insert(member.user.id, member.user.clone());
        self.members.insert((member.guild_id, member.user.id), member);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel.id, channel);
        self
    }

    pub fn with_guild(mut self, guild: Guild) -> Self {
        self.guilds.insert(guild.id, guild);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert((role.guild_id, role.id), role);
        self
    }

    /// Make every lookup fail as if the platform were down.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup<K, V>(
        &self,
        map: &HashMap<K, V>,
        key: &K,
        kind: EntityKind,
        id: Id,
    ) -> Result<V, ClientError>
    where
        K: std::hash::Hash + Eq,
        V: Clone,
    {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ClientError::Unavailable("mock platform is down".to_string()));
        }
        map.get(key)
            .cloned()
            .ok_or(ClientError::NotFound { kind, id })
    }
}

#[async_trait]
impl PlatformClient for MockClient {
    async fn user(&self, id: Id) -> Result<User, ClientError> {
        self.lookup(&self.users, &id, EntityKind::User, id)
    }

    async fn member(&self, guild_id: Id, user_id: Id) -> Result<Member, ClientError> {
        self.lookup(&self.members, &(guild_id, user_id), EntityKind::Member, user_id)
    }

    async fn channel(&self, id: Id) -> Result<Channel, ClientError> {
        self.lookup(&self.channels, &id, EntityKind::Channel, id)
    }

    async fn guild(&self, id: Id) -> Result<Guild, ClientError> {
        self.lookup(&self.guilds, &id, EntityKind::Guild, id)
    }

    async fn role(&self, guild_id: Id, role_id: Id) -> Result<Role, ClientError> {
        self.lookup(&self.roles, &(guild_id, role_id), EntityKind::Role, role_id)
    }
}

/// A [`Responder`] that records everything it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
    suggestions: Mutex<Vec<Vec<Choice>>>,
    next_id: AtomicU64,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<String> {
        lock(&self.replies).clone()
    }

    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    pub fn suggestions(&self) -> Vec<Vec<Choice>> {
        lock(&self.suggestions).clone()
    }

    fn message(&self, content: &str) -> Message {
        Message {
            id: Id::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            channel_id: Id::default(),
            content: content.to_string(),
        }
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send(&self, text: &str) -> Result<Message, RespondError> {
        lock(&self.sent).push(text.to_string());
        Ok(self.message(text))
    }

    async fn reply(&self, text: &str) -> Result<Message, RespondError> {
        lock(&self.replies).push(text.to_string());
        Ok(self.message(text))
    }

    async fn suggest(&self, choices: &[Choice]) -> Result<(), RespondError> {
        lock(&self.suggestions).push(choices.to_vec());
        Ok(())
    }
}

/// A [`CommandRegistrar`] that starts with a fixed command list and records
/// changes.
#[derive(Debug, Default)]
pub struct MockRegistrar {
    existing: Vec<RegisteredCommand>,
    created: Mutex<Vec<String>>,
    edited: Mutex<Vec<(Id, String)>>,
    next_id: AtomicU64,
}

impl MockRegistrar {
    pub fn with_existing(existing: Vec<RegisteredCommand>) -> Self {
        Self {
            existing,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<String> {
        lock(&self.created).clone()
    }

    pub fn edited(&self) -> Vec<(Id, String)> {
        lock(&self.edited).clone()
    }
}

#[async_trait]
impl CommandRegistrar for MockRegistrar {
    async fn commands(&self, _guild_id: Option<Id>) -> Result<Vec<RegisteredCommand>, ClientError> {
        Ok(self.existing.clone())
    }

    async fn create_command(
        &self,
        _guild_id: Option<Id>,
        command: &CommandSchema,
    ) -> Result<RegisteredCommand, ClientError> {
        lock(&self.created).push(command.name.clone());
        Ok(RegisteredCommand {
            id: Id::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            name: command.name.clone(),
        })
    }

    async fn edit_command(
        &self,
        _guild_id: Option<Id>,
        command_id: Id,
        command: &CommandSchema,
    ) -> Result<RegisteredCommand, ClientError> {
        lock(&self.edited).push((command_id, command.name.clone()));
        Ok(RegisteredCommand {
            id: command_id,
            name: command.name.clone(),
        })
    }
}
