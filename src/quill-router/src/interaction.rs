//! Structured interaction payloads and route lookup over option trees.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::argument::export_name;
use crate::route::{RouteId, Router};

/// Option types of a structured command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    pub fn is_subcommand(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }
}

/// A value as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// One option of a structured invocation. Sub-command options nest the
/// options of the sub-command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<OptionValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
    /// Set on the option the user is currently typing.
    #[serde(default)]
    pub focused: bool,
}

impl InteractionOption {
    /// A leaf option carrying a value.
    pub fn value(name: impl Into<String>, kind: OptionKind, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value: Some(value),
            options: Vec::new(),
            focused: false,
        }
    }

    /// A sub-command option wrapping its own options.
    pub fn subcommand(name: impl Into<String>, options: Vec<InteractionOption>) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommand,
            value: None,
            options,
            focused: false,
        }
    }

    /// A sub-command group option wrapping sub-commands.
    pub fn group(name: impl Into<String>, options: Vec<InteractionOption>) -> Self {
        Self {
            kind: OptionKind::SubCommandGroup,
            ..Self::subcommand(name, options)
        }
    }

    /// Mark the option as focused.
    pub fn focus(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn is_subcommand(&self) -> bool {
        self.kind.is_subcommand()
    }

    /// Check if this option or any nested option is focused.
    pub fn has_focus(&self) -> bool {
        self.focused || self.options.iter().any(Self::has_focus)
    }
}

impl Router {
    /// Route for a structured command and the options at the depth reached.
    ///
    /// Descends through the first sub-command option at each level. Returns
    /// `None` if a sub-command names no child or the reached route has no
    /// handler.
    pub fn find_interaction<'o>(
        &self,
        name: &str,
        options: &'o [InteractionOption],
    ) -> Option<(RouteId, &'o [InteractionOption])> {
        let mut current = self.interaction_child(RouteId::ROOT, name)?;
        let mut options = options;

        while let Some(sub) = options.iter().find(|o| o.is_subcommand()) {
            current = self.interaction_child(current, &sub.name)?;
            options = &sub.options;
        }

        if self.route(current).has_handler() {
            Some((current, options))
        } else {
            debug!(command = name, "interaction reached a route without a handler");
            None
        }
    }

    /// Autocomplete variant of [`find_interaction`](Self::find_interaction).
    ///
    /// Stops at the first level where a value option is focused and returns
    /// that level's route and options. Returns `None` if nothing is focused.
    pub fn find_focused<'o>(
        &self,
        name: &str,
        options: &'o [InteractionOption],
    ) -> Option<(RouteId, &'o [InteractionOption])> {
        let mut current = self.interaction_child(RouteId::ROOT, name)?;
        let mut options = options;

        loop {
            if options
                .iter()
                .any(|o| !o.is_subcommand() && o.has_focus())
            {
                return Some((current, options));
            }

            let sub = options.iter().find(|o| o.is_subcommand())?;
            current = self.interaction_child(current, &sub.name)?;
            options = &sub.options;
        }
    }

    /// Child by name, falling back to the exported form of child names.
    fn interaction_child(&self, parent: RouteId, name: &str) -> Option<RouteId> {
        self.child(parent, name, false).or_else(|| {
            self.children(parent)
                .find(|&id| export_name(self.route(id).name()) == name)
        })
    }
}
