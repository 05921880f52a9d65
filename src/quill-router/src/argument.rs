//! Typed argument declarations.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::interaction::InteractionOption;

static EXPORT_NAME_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));

/// Semantic type of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Emoji,
    User,
    Channel,
    Role,
}

impl ArgumentKind {
    /// Kind selected by a leading sigil in a signature token.
    pub fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            ':' => Some(Self::Emoji),
            '@' => Some(Self::User),
            '#' => Some(Self::Channel),
            '&' => Some(Self::Role),
            _ => None,
        }
    }

    /// Kind selected by a type keyword following the argument name.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "int" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Check if values of this kind are looked up through the platform client.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::User | Self::Channel | Self::Role)
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Emoji => "emoji",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
        };
        f.write_str(name)
    }
}

/// A numeric bound.
///
/// Integer arguments carry integer bounds and float arguments float bounds.
/// On string arguments an integer bound limits the length in characters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Integer(i64),
    Float(f64),
}

impl Bound {
    /// Parse a bound for an argument of the given kind.
    pub fn parse(kind: ArgumentKind, raw: &str) -> Option<Self> {
        match kind {
            ArgumentKind::Integer => raw.parse().ok().map(Self::Integer),
            ArgumentKind::String => raw.parse::<u32>().ok().map(|n| Self::Integer(n.into())),
            ArgumentKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Float),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One allowed value of a choice-restricted argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Text shown to the user.
    pub name: String,
    /// Value compared against the resolved argument.
    pub value: String,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Produces completion candidates for the option a user is typing.
pub type AutocompleteHandler =
    Arc<dyn Fn(&Context, &InteractionOption) -> Vec<Choice> + Send + Sync>;

/// A typed parameter of a route.
#[derive(Clone, Default)]
pub struct Argument {
    /// Position among the route's arguments, in signature order.
    pub index: usize,
    /// Lowercase identifier, unique within the route.
    pub name: String,
    pub description: String,
    pub required: bool,
    pub kind: ArgumentKind,
    pub choices: Vec<Choice>,
    pub min: Option<Bound>,
    pub max: Option<Bound>,
    pub autocomplete: Option<AutocompleteHandler>,
}

impl Argument {
    /// Create an argument with no constraints.
    pub fn new(index: usize, name: impl Into<String>, kind: ArgumentKind, required: bool) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
            required,
            ..Default::default()
        }
    }

    /// Name as registered with the platform: lowercase, restricted to word
    /// characters and `-`.
    pub fn export_name(&self) -> String {
        export_name(&self.name)
    }

    /// Set the description.
    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Append a choice.
    pub fn choice(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.choices.push(Choice::new(name, value));
        self
    }

    /// Set both bounds.
    pub fn bounds(&mut self, min: Option<Bound>, max: Option<Bound>) -> &mut Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Attach an autocomplete handler.
    pub fn autocomplete<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Context, &InteractionOption) -> Vec<Choice> + Send + Sync + 'static,
    {
        self.autocomplete = Some(Arc::new(handler));
        self
    }
}

/// Lowercase `name` and strip everything but word characters and `-`.
pub fn export_name(name: &str) -> String {
    EXPORT_NAME_STRIP
        .replace_all(&name.to_lowercase(), "")
        .into_owned()
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .field("choices", &self.choices)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.name == other.name
            && self.description == other.description
            && self.required == other.required
            && self.kind == other.kind
            && self.choices == other.choices
            && self.min == other.min
            && self.max == other.max
            && self.autocomplete.is_some() == other.autocomplete.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_sigil_and_keyword() {
        assert_eq!(ArgumentKind::from_sigil(':'), Some(ArgumentKind::Emoji));
        assert_eq!(ArgumentKind::from_sigil('@'), Some(ArgumentKind::User));
        assert_eq!(ArgumentKind::from_sigil('#'), Some(ArgumentKind::Channel));
        assert_eq!(ArgumentKind::from_sigil('&'), Some(ArgumentKind::Role));
        assert_eq!(ArgumentKind::from_sigil('a'), None);

        assert_eq!(ArgumentKind::from_keyword("int"), Some(ArgumentKind::Integer));
        assert_eq!(ArgumentKind::from_keyword("float"), Some(ArgumentKind::Float));
        assert_eq!(ArgumentKind::from_keyword("bool"), Some(ArgumentKind::Boolean));
        assert_eq!(ArgumentKind::from_keyword("string"), None);
    }

    #[test]
    fn test_bound_parse() {
        assert_eq!(
            Bound::parse(ArgumentKind::Integer, "-5"),
            Some(Bound::Integer(-5))
        );
        assert_eq!(Bound::parse(ArgumentKind::Integer, "1.5"), None);
        assert_eq!(
            Bound::parse(ArgumentKind::Float, "1.5"),
            Some(Bound::Float(1.5))
        );
        assert_eq!(Bound::parse(ArgumentKind::Float, "inf"), None);
        assert_eq!(
            Bound::parse(ArgumentKind::String, "32"),
            Some(Bound::Integer(32))
        );
        assert_eq!(Bound::parse(ArgumentKind::String, "-1"), None);
        assert_eq!(Bound::parse(ArgumentKind::Boolean, "1"), None);
    }

    #[test]
    fn test_export_name() {
        let arg = Argument::new(0, "Channel Name!", ArgumentKind::String, true);
        assert_eq!(arg.export_name(), "channelname");
        assert_eq!(export_name("user-id_2"), "user-id_2");
    }

    #[test]
    fn test_equality_ignores_handler_identity() {
        let mut a = Argument::new(0, "query", ArgumentKind::String, true);
        let mut b = a.clone();
        a.autocomplete(|_, _| Vec::new());
        assert_ne!(a, b);
        b.autocomplete(|_, _| vec![Choice::new("x", "x")]);
        assert_eq!(a, b);
    }
}
