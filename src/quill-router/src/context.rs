//! Per-invocation execution context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::argument::ArgumentKind;
use crate::client::{PlatformClient, Responder};
use crate::dispatch::MessageMatch;
use crate::error::{RespondError, RouterError, RouterResult};
use crate::interaction::InteractionOption;
use crate::model::{Channel, ChannelKind, Emoji, Guild, Id, Member, Message, Role, User};
use crate::resolve::RawInput;
use crate::route::{Route, RouteId, Router};
use crate::value::{ArgValue, Arguments};

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub guild_id: Option<Id>,
    pub channel_id: Id,
    pub author: User,
    pub content: String,
}

/// An inbound structured command or autocomplete request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(default)]
    pub guild_id: Option<Id>,
    pub channel_id: Id,
    pub user: User,
    /// Top-level command name.
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// Typed scratch space shared by middleware and the handler of one
/// invocation.
#[derive(Default)]
pub struct Vars {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Vars {
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// The value under `key`, if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl fmt::Debug for Vars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Everything a handler knows about one invocation.
pub struct Context {
    router: Arc<Router>,
    route: Option<RouteId>,
    responder: Arc<dyn Responder>,
    client: Arc<dyn PlatformClient>,
    /// Prefix the command was invoked with (`/` for structured commands).
    pub prefix: String,
    /// Command path as invoked, such as `config set`.
    pub command: String,
    /// `None` in direct messages.
    pub guild: Option<Guild>,
    pub channel: Channel,
    pub user: User,
    pub input: RawInput,
    /// Text after the command path as typed. Empty for structured commands.
    pub argument_text: String,
    /// Converted arguments, filled in by [`Router::call`].
    pub arguments: Arguments,
    pub vars: Vars,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("route", &self.route)
            .field("prefix", &self.prefix)
            .field("command", &self.command)
            .field("guild", &self.guild)
            .field("channel", &self.channel)
            .field("user", &self.user)
            .field("input", &self.input)
            .field("argument_text", &self.argument_text)
            .field("arguments", &self.arguments)
            .field("vars", &self.vars)
            .finish()
    }
}

/// Builder for [`Context`].
pub struct ContextBuilder {
    context: Context,
}

impl ContextBuilder {
    pub fn route(mut self, id: RouteId) -> Self {
        self.context.route = Some(id);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.context.prefix = prefix.into();
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.context.command = command.into();
        self
    }

    pub fn guild(mut self, guild: Option<Guild>) -> Self {
        self.context.guild = guild;
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.context.channel = channel;
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.context.user = user;
        self
    }

    pub fn input(mut self, input: RawInput) -> Self {
        self.context.input = input;
        self
    }

    pub fn argument_text(mut self, text: impl Into<String>) -> Self {
        self.context.argument_text = text.into();
        self
    }

    pub fn build(self) -> Context {
        self.context
    }
}

impl Context {
    pub fn builder(
        router: Arc<Router>,
        responder: Arc<dyn Responder>,
        client: Arc<dyn PlatformClient>,
    ) -> ContextBuilder {
        let prefix = router.config().prefix.clone();
        ContextBuilder {
            context: Context {
                router,
                route: None,
                responder,
                client,
                prefix,
                command: String::new(),
                guild: None,
                channel: Channel::default(),
                user: User::default(),
                input: RawInput::default(),
                argument_text: String::new(),
                arguments: Arguments::new(),
                vars: Vars::default(),
            },
        }
    }

    /// Context for a text command matched by [`Router::parse_message`].
    ///
    /// Guild and channel are fetched through the client; lookup failures
    /// are returned.
    pub async fn from_message(
        router: Arc<Router>,
        event: &MessageEvent,
        matched: MessageMatch,
        responder: Arc<dyn Responder>,
        client: Arc<dyn PlatformClient>,
    ) -> RouterResult<Self> {
        let (guild, channel) =
            fetch_location(client.as_ref(), event.guild_id, event.channel_id).await?;

        Ok(Self::builder(router, responder, client)
            .route(matched.route)
            .command(matched.command)
            .guild(guild)
            .channel(channel)
            .user(event.author.clone())
            .input(RawInput::Positional(matched.arguments))
            .argument_text(matched.text)
            .build())
    }

    /// Context for a structured command.
    pub async fn from_interaction(
        router: Arc<Router>,
        event: &InteractionEvent,
        responder: Arc<dyn Responder>,
        client: Arc<dyn PlatformClient>,
    ) -> RouterResult<Self> {
        let found = router.find_interaction(&event.name, &event.options);
        Self::interaction(router, found, event, responder, client).await
    }

    /// Context for an autocomplete request, positioned at the route that
    /// owns the focused option.
    pub async fn from_autocomplete(
        router: Arc<Router>,
        event: &InteractionEvent,
        responder: Arc<dyn Responder>,
        client: Arc<dyn PlatformClient>,
    ) -> RouterResult<Self> {
        let found = router.find_focused(&event.name, &event.options);
        Self::interaction(router, found, event, responder, client).await
    }

    async fn interaction(
        router: Arc<Router>,
        found: Option<(RouteId, &[InteractionOption])>,
        event: &InteractionEvent,
        responder: Arc<dyn Responder>,
        client: Arc<dyn PlatformClient>,
    ) -> RouterResult<Self> {
        let Some((route, options)) = found else {
            return Err(RouterError::RouteNotFound {
                command: event.name.clone(),
            });
        };

        let (guild, channel) =
            fetch_location(client.as_ref(), event.guild_id, event.channel_id).await?;
        let command = router.path(route).join(" ");
        let options = options.to_vec();

        Ok(Self::builder(router, responder, client)
            .route(route)
            .prefix("/")
            .command(command)
            .guild(guild)
            .channel(channel)
            .user(event.user.clone())
            .input(RawInput::Options(options))
            .build())
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn route_id(&self) -> Option<RouteId> {
        self.route
    }

    /// The matched route.
    pub fn route(&self) -> Option<&Route> {
        self.route.map(|id| self.router.route(id))
    }

    pub(crate) fn set_route(&mut self, id: RouteId) {
        self.route = Some(id);
    }

    pub fn responder(&self) -> &Arc<dyn Responder> {
        &self.responder
    }

    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }

    pub fn guild_id(&self) -> Option<Id> {
        self.guild.as_ref().map(|g| g.id)
    }

    /// Names from the root to the matched route.
    pub fn path(&self) -> Vec<&str> {
        self.route
            .map(|id| self.router.path(id))
            .unwrap_or_default()
    }

    /// Help text for the matched route, e.g. `Usage: !config set <key> <value>`.
    pub fn usage_text(&self) -> String {
        let usage = self
            .route
            .map(|id| self.router.full_usage(id))
            .unwrap_or_else(|| self.command.clone());
        format!(
            "{}{}{}",
            self.router.config().usage_prefix,
            self.prefix,
            usage
        )
    }

    /// Run the matched route through [`Router::call`].
    pub async fn call(&mut self) -> RouterResult<crate::dispatch::Outcome> {
        let Some(id) = self.route else {
            return Err(RouterError::RouteNotFound {
                command: self.command.clone(),
            });
        };
        let router = Arc::clone(&self.router);
        router.call(id, self).await
    }

    pub async fn reply(&self, text: impl AsRef<str>) -> Result<Message, RespondError> {
        let text = text.as_ref();
        if text.trim().is_empty() {
            return Err(RespondError::EmptyText);
        }
        self.responder.reply(text).await
    }

    pub async fn send(&self, text: impl AsRef<str>) -> Result<Message, RespondError> {
        let text = text.as_ref();
        if text.trim().is_empty() {
            return Err(RespondError::EmptyText);
        }
        self.responder.send(text).await
    }

    /// Reply with the route's usage text.
    pub async fn usage(&self) -> Result<Message, RespondError> {
        self.reply(self.usage_text()).await
    }

    /// The converted value of a declared argument.
    ///
    /// # Panics
    ///
    /// If no route is attached, the route has no argument `name`, or the
    /// argument is not of kind `kind`. These are bugs in the command, not
    /// bad input.
    fn arg(&self, name: &str, kind: ArgumentKind) -> Option<&ArgValue> {
        let Some(route) = self.route() else {
            panic!("argument '{name}' requested on a context without a route");
        };
        let Some(argument) = route.argument(name) else {
            panic!("command '{}' has no argument named '{name}'", route.name());
        };
        if argument.kind != kind {
            panic!(
                "argument '{name}' of command '{}' is {}, not {kind}",
                route.name(),
                argument.kind
            );
        }
        self.arguments.get(&argument.name)
    }

    pub fn string_arg(&self, name: &str) -> Option<&str> {
        self.arg(name, ArgumentKind::String).and_then(ArgValue::as_str)
    }

    pub fn int_arg(&self, name: &str) -> Option<i64> {
        match self.arg(name, ArgumentKind::Integer)? {
            ArgValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float_arg(&self, name: &str) -> Option<f64> {
        match self.arg(name, ArgumentKind::Float)? {
            ArgValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        match self.arg(name, ArgumentKind::Boolean)? {
            ArgValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn emoji_arg(&self, name: &str) -> Option<&Emoji> {
        match self.arg(name, ArgumentKind::Emoji)? {
            ArgValue::Emoji(v) => Some(v),
            _ => None,
        }
    }

    pub fn user_arg(&self, name: &str) -> Option<&User> {
        self.arg(name, ArgumentKind::User).and_then(ArgValue::as_user)
    }

    /// Guild membership of a user argument; `None` outside guilds.
    pub fn member_arg(&self, name: &str) -> Option<&Member> {
        match self.arg(name, ArgumentKind::User)? {
            ArgValue::Member(v) => Some(v),
            _ => None,
        }
    }

    pub fn channel_arg(&self, name: &str) -> Option<&Channel> {
        match self.arg(name, ArgumentKind::Channel)? {
            ArgValue::Channel(v) => Some(v),
            _ => None,
        }
    }

    /// Channel argument, only if it is of the given channel kind.
    pub fn channel_arg_of(&self, name: &str, kind: ChannelKind) -> Option<&Channel> {
        self.channel_arg(name).filter(|c| c.kind == kind)
    }

    pub fn role_arg(&self, name: &str) -> Option<&Role> {
        match self.arg(name, ArgumentKind::Role)? {
            ArgValue::Role(v) => Some(v),
            _ => None,
        }
    }
}

async fn fetch_location(
    client: &dyn PlatformClient,
    guild_id: Option<Id>,
    channel_id: Id,
) -> RouterResult<(Option<Guild>, Channel)> {
    let guild = async {
        match guild_id {
            Some(id) => client.guild(id).await.map(Some),
            None => Ok(None),
        }
    };
    let (guild, channel) = futures::try_join!(guild, client.channel(channel_id))?;
    Ok((guild, channel))
}
