//! Argument resolution.
//!
//! Text commands deliver positional string tokens; structured interactions
//! deliver named, already typed options. Each mode has its own [`Resolver`]
//! and both produce the same [`Arguments`] map. Reference arguments are
//! looked up through the [`PlatformClient`] concurrently, and the first
//! failed lookup aborts the whole resolution.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::argument::{Argument, ArgumentKind};
use crate::client::PlatformClient;
use crate::error::{ClientError, RouterError, RouterResult, ValidationError};
use crate::interaction::{InteractionOption, OptionValue};
use crate::model::{EntityKind, Id, parse_emoji};
use crate::route::Route;
use crate::value::{ArgValue, Arguments};

/// Where lookups happen.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    /// The guild of the invocation, `None` in direct messages.
    pub guild_id: Option<Id>,
    pub client: &'a dyn PlatformClient,
}

/// Turns raw invocation input into converted arguments.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, route: &Route, scope: Scope<'_>) -> RouterResult<Arguments>;
}

/// Raw input of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    /// Tokens following the command path of a text command.
    Positional(Vec<String>),
    /// Options at the depth of the matched route of a structured command.
    Options(Vec<InteractionOption>),
}

impl Default for RawInput {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl RawInput {
    /// Resolve with the strategy matching the input mode.
    pub async fn resolve(&self, route: &Route, scope: Scope<'_>) -> RouterResult<Arguments> {
        match self {
            Self::Positional(tokens) => PositionalResolver::new(tokens).resolve(route, scope).await,
            Self::Options(options) => OptionResolver::new(options).resolve(route, scope).await,
        }
    }
}

/// Resolves arguments by index from text tokens.
pub struct PositionalResolver<'t> {
    tokens: &'t [String],
}

impl<'t> PositionalResolver<'t> {
    pub fn new(tokens: &'t [String]) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Resolver for PositionalResolver<'_> {
    async fn resolve(&self, route: &Route, scope: Scope<'_>) -> RouterResult<Arguments> {
        if self.tokens.len() < route.required_count() {
            return Err(ValidationError::Usage.into());
        }

        let mut resolved = Arguments::new();
        let mut pending = Vec::new();

        for argument in route.arguments() {
            let Some(token) = self.tokens.get(argument.index) else {
                continue;
            };

            match convert_text(argument, token)? {
                Converted::Value(value) => {
                    resolved.insert(argument.name.clone(), value);
                }
                Converted::Lookup(reference) => pending.push((argument, reference)),
                Converted::Empty => {}
            }
        }

        resolved.extend(lookup_all(pending, scope).await?);
        Ok(resolved)
    }
}

/// Resolves arguments by exported name from structured options.
pub struct OptionResolver<'o> {
    options: &'o [InteractionOption],
}

impl<'o> OptionResolver<'o> {
    pub fn new(options: &'o [InteractionOption]) -> Self {
        Self { options }
    }

    fn option(&self, argument: &Argument) -> Option<&'o InteractionOption> {
        let name = argument.export_name();
        self.options
            .iter()
            .find(|o| !o.is_subcommand() && o.name == name)
    }
}

#[async_trait]
impl Resolver for OptionResolver<'_> {
    async fn resolve(&self, route: &Route, scope: Scope<'_>) -> RouterResult<Arguments> {
        let mut resolved = Arguments::new();
        let mut pending = Vec::new();

        for argument in route.arguments() {
            let Some(value) = self.option(argument).and_then(|o| o.value.as_ref()) else {
                continue;
            };

            match convert_option(argument, value)? {
                Converted::Value(value) => {
                    resolved.insert(argument.name.clone(), value);
                }
                Converted::Lookup(reference) => pending.push((argument, reference)),
                Converted::Empty => {}
            }
        }

        resolved.extend(lookup_all(pending, scope).await?);
        Ok(resolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    User(Id),
    Channel(Id),
    Role(Id),
}

impl Reference {
    fn kind(self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Channel(_) => EntityKind::Channel,
            Self::Role(_) => EntityKind::Role,
        }
    }
}

enum Converted {
    Value(ArgValue),
    Lookup(Reference),
    /// Nothing usable was given; treated as absent.
    Empty,
}

fn malformed(argument: &Argument, expected: &'static str) -> ValidationError {
    ValidationError::Malformed {
        argument: argument.name.clone(),
        expected,
    }
}

fn invalid_reference(argument: &Argument, kind: EntityKind) -> ValidationError {
    ValidationError::InvalidReference {
        argument: argument.name.clone(),
        kind,
    }
}

fn convert_text(argument: &Argument, token: &str) -> Result<Converted, ValidationError> {
    if token.is_empty() {
        return Ok(match argument.kind {
            ArgumentKind::String => Converted::Value(ArgValue::String(String::new())),
            _ => Converted::Empty,
        });
    }

    let converted = match argument.kind {
        ArgumentKind::String => Converted::Value(ArgValue::String(token.to_string())),
        ArgumentKind::Integer => {
            Converted::Value(ArgValue::Integer(parse_integer(argument, token)?))
        }
        ArgumentKind::Float => Converted::Value(ArgValue::Float(parse_float(argument, token)?)),
        ArgumentKind::Boolean => {
            Converted::Value(ArgValue::Boolean(parse_boolean(argument, token)?))
        }
        ArgumentKind::Emoji => Converted::Value(ArgValue::Emoji(
            parse_emoji(token).ok_or_else(|| malformed(argument, "a valid emoji"))?,
        )),
        ArgumentKind::User => Converted::Lookup(Reference::User(
            Id::from_user_mention(token)
                .ok_or_else(|| invalid_reference(argument, EntityKind::User))?,
        )),
        ArgumentKind::Channel => Converted::Lookup(Reference::Channel(
            Id::from_channel_mention(token)
                .ok_or_else(|| invalid_reference(argument, EntityKind::Channel))?,
        )),
        ArgumentKind::Role => Converted::Lookup(Reference::Role(
            Id::from_role_mention(token)
                .ok_or_else(|| invalid_reference(argument, EntityKind::Role))?,
        )),
    };
    Ok(converted)
}

fn convert_option(argument: &Argument, value: &OptionValue) -> Result<Converted, ValidationError> {
    if let OptionValue::String(text) = value {
        if text.is_empty() {
            return convert_text(argument, text);
        }
        // Values typed as strings by the platform go through the text rules,
        // except references which arrive as bare ids.
        if !argument.kind.is_reference() {
            return convert_text(argument, text);
        }
    }

    let converted = match (argument.kind, value) {
        (ArgumentKind::String, value) => Converted::Value(ArgValue::String(value.to_string())),
        (ArgumentKind::Integer, OptionValue::Integer(v)) => Converted::Value(ArgValue::Integer(*v)),
        (ArgumentKind::Integer, OptionValue::Number(v)) => Converted::Value(ArgValue::Integer(
            integral(*v).ok_or_else(|| malformed(argument, "an integer"))?,
        )),
        (ArgumentKind::Integer, _) => return Err(malformed(argument, "an integer")),
        (ArgumentKind::Float, OptionValue::Number(v)) if v.is_finite() => {
            Converted::Value(ArgValue::Float(*v))
        }
        (ArgumentKind::Float, OptionValue::Integer(v)) => {
            Converted::Value(ArgValue::Float(*v as f64))
        }
        (ArgumentKind::Float, _) => return Err(malformed(argument, "a floating point number")),
        (ArgumentKind::Boolean, OptionValue::Boolean(v)) => Converted::Value(ArgValue::Boolean(*v)),
        (ArgumentKind::Boolean, _) => return Err(malformed(argument, "a true/false value")),
        (ArgumentKind::Emoji, _) => return Err(malformed(argument, "a valid emoji")),
        (kind, value) => {
            let entity = match kind {
                ArgumentKind::Channel => EntityKind::Channel,
                ArgumentKind::Role => EntityKind::Role,
                _ => EntityKind::User,
            };
            let id = option_id(value).ok_or_else(|| invalid_reference(argument, entity))?;
            Converted::Lookup(match entity {
                EntityKind::Channel => Reference::Channel(id),
                EntityKind::Role => Reference::Role(id),
                _ => Reference::User(id),
            })
        }
    };
    Ok(converted)
}

fn option_id(value: &OptionValue) -> Option<Id> {
    match value {
        OptionValue::String(text) => text.parse().ok(),
        OptionValue::Integer(v) => u64::try_from(*v).ok().map(Id::new),
        _ => None,
    }
}

/// `v` as an integer, if it is whole and fits in an `i64`.
fn integral(v: f64) -> Option<i64> {
    // 2^63, the first f64 past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v)).then_some(v as i64)
}

fn parse_integer(argument: &Argument, token: &str) -> Result<i64, ValidationError> {
    token
        .trim()
        .parse()
        .map_err(|_| malformed(argument, "an integer"))
}

fn parse_float(argument: &Argument, token: &str) -> Result<f64, ValidationError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(argument, "a floating point number"))
}

fn parse_boolean(argument: &Argument, token: &str) -> Result<bool, ValidationError> {
    match token.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(malformed(argument, "a true/false value")),
    }
}

/// Run all reference lookups concurrently, failing on the first error.
async fn lookup_all(
    pending: Vec<(&Argument, Reference)>,
    scope: Scope<'_>,
) -> RouterResult<Vec<(String, ArgValue)>> {
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    debug!(count = pending.len(), "resolving references");
    try_join_all(pending.into_iter().map(|(argument, reference)| async move {
        let value = lookup(argument, reference, scope).await?;
        Ok::<_, RouterError>((argument.name.clone(), value))
    }))
    .await
}

async fn lookup(
    argument: &Argument,
    reference: Reference,
    scope: Scope<'_>,
) -> RouterResult<ArgValue> {
    let client = scope.client;
    let result = match reference {
        Reference::User(id) => match scope.guild_id {
            Some(guild_id) => client.member(guild_id, id).await.map(ArgValue::Member),
            None => client.user(id).await.map(ArgValue::User),
        },
        Reference::Channel(id) => match client.channel(id).await {
            Ok(channel) if channel.guild_id == scope.guild_id => Ok(ArgValue::Channel(channel)),
            Ok(_) => Err(ClientError::not_found(EntityKind::Channel, id)),
            Err(err) => Err(err),
        },
        Reference::Role(id) => match scope.guild_id {
            Some(guild_id) => client.role(guild_id, id).await.map(ArgValue::Role),
            None => Err(ClientError::not_found(EntityKind::Role, id)),
        },
    };

    result.map_err(|err| {
        if err.is_not_found() {
            invalid_reference(argument, reference.kind()).into()
        } else {
            RouterError::Resolution(err)
        }
    })
}
