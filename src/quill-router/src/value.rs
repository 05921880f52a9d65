//! Converted argument values.

use std::collections::HashMap;
use std::fmt;

use crate::argument::ArgumentKind;
use crate::model::{Channel, Emoji, Member, Role, User};

/// A converted argument value, one variant per argument kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Emoji(Emoji),
    /// A user resolved outside of a guild.
    User(User),
    /// A user resolved as a member of the current guild.
    Member(Member),
    Channel(Channel),
    Role(Role),
}

impl ArgValue {
    /// The argument kind this value belongs to.
    pub fn kind(&self) -> ArgumentKind {
        match self {
            Self::String(_) => ArgumentKind::String,
            Self::Integer(_) => ArgumentKind::Integer,
            Self::Float(_) => ArgumentKind::Float,
            Self::Boolean(_) => ArgumentKind::Boolean,
            Self::Emoji(_) => ArgumentKind::Emoji,
            Self::User(_) | Self::Member(_) => ArgumentKind::User,
            Self::Channel(_) => ArgumentKind::Channel,
            Self::Role(_) => ArgumentKind::Role,
        }
    }

    /// Check if this is an empty string.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    /// Check if this value equals a choice value.
    pub fn matches_choice(&self, choice: &str) -> bool {
        match self {
            Self::String(v) => v == choice,
            Self::Integer(v) => choice.trim().parse::<i64>().is_ok_and(|c| c == *v),
            Self::Float(v) => choice.trim().parse::<f64>().is_ok_and(|c| c == *v),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// The user behind a user or member value.
    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Member(member) => Some(&member.user),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Emoji(v) => write!(f, "{v}"),
            Self::User(v) => f.write_str(&v.mention()),
            Self::Member(v) => f.write_str(&v.user.mention()),
            Self::Channel(v) => f.write_str(&v.mention()),
            Self::Role(v) => f.write_str(&v.mention()),
        }
    }
}

/// Resolved arguments of one invocation, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: HashMap<String, ArgValue>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) -> Option<ArgValue> {
        self.values.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ArgValue)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (String, ArgValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, ArgValue)> for Arguments {
    fn extend<T: IntoIterator<Item = (String, ArgValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}
