//! Error types for the command router.
//!
//! The taxonomy separates what a command author got wrong at registration
//! time ([`SignatureError`], [`ExportError`]) from what a user got wrong
//! while invoking a command ([`ValidationError`]) and from failures of the
//! platform behind the router ([`ClientError`], [`RespondError`]).

use thiserror::Error;

use crate::model::{EntityKind, Id};

/// Errors produced while compiling a command signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The signature has no route name.
    #[error("signature has no command name: '{signature}'")]
    MissingName {
        /// The full signature text.
        signature: String,
    },

    /// An opening `<` or `[` without its matching closer.
    #[error("unterminated '{opener}' at byte {position} in signature: {signature}")]
    Unterminated {
        /// The full signature text.
        signature: String,
        /// The opening delimiter.
        opener: char,
        /// Byte offset of the opener within the signature.
        position: usize,
    },

    /// Delimiters with nothing (or only a sigil) between them.
    #[error("empty argument declaration at byte {position} in signature: {signature}")]
    EmptyArgument {
        /// The full signature text.
        signature: String,
        /// Byte offset of the opener within the signature.
        position: usize,
    },

    /// Two arguments of the same route share a name.
    #[error("duplicate argument '{argument}' in signature: {signature}")]
    DuplicateArgument {
        /// The full signature text.
        signature: String,
        /// The repeated argument name.
        argument: String,
    },

    /// A word inside an argument declaration that is neither a type keyword
    /// nor a `key:value` attribute.
    #[error("unexpected '{token}' in declaration of argument '{argument}'")]
    UnexpectedToken {
        /// The argument being declared.
        argument: String,
        /// The offending word.
        token: String,
    },

    /// An attribute key the parser does not know.
    #[error("unknown attribute '{attribute}' on argument '{argument}'")]
    UnknownAttribute {
        /// The argument being declared.
        argument: String,
        /// The attribute key.
        attribute: String,
    },

    /// An attribute whose value cannot be used for the argument's type.
    #[error("invalid {attribute} value '{value}' for argument '{argument}'")]
    InvalidAttribute {
        /// The argument being declared.
        argument: String,
        /// The attribute key.
        attribute: String,
        /// The raw attribute value.
        value: String,
    },
}

/// User-facing validation failures.
///
/// The `Display` output is the text replied to the invoking user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Fewer arguments than the route requires; answered with usage text.
    #[error("not enough arguments")]
    Usage,

    /// A required argument is absent or empty.
    #[error("The {argument} argument is required.")]
    Required {
        /// Argument name.
        argument: String,
    },

    /// The raw value does not parse as the declared type.
    #[error("{argument} must be {expected}.")]
    Malformed {
        /// Argument name.
        argument: String,
        /// What was expected, e.g. "an integer".
        expected: &'static str,
    },

    /// A numeric value below the declared minimum.
    #[error("{argument} must be at least {min}.")]
    BelowMinimum {
        /// Argument name.
        argument: String,
        /// The declared minimum.
        min: String,
    },

    /// A numeric value above the declared maximum.
    #[error("{argument} must be at most {max}.")]
    AboveMaximum {
        /// Argument name.
        argument: String,
        /// The declared maximum.
        max: String,
    },

    /// A string shorter than the declared minimum length.
    #[error("{argument} must be at least {min} characters long.")]
    TooShort {
        /// Argument name.
        argument: String,
        /// Minimum length in characters.
        min: String,
    },

    /// A string longer than the declared maximum length.
    #[error("{argument} must be at most {max} characters long.")]
    TooLong {
        /// Argument name.
        argument: String,
        /// Maximum length in characters.
        max: String,
    },

    /// A value outside the argument's declared choices.
    #[error("unknown argument value for {argument}: {value}")]
    InvalidValue {
        /// Argument name.
        argument: String,
        /// The rejected value.
        value: String,
    },

    /// A mention that does not point at an entity in the current scope.
    #[error("{argument} must be a valid {kind}.")]
    InvalidReference {
        /// Argument name.
        argument: String,
        /// The kind of entity expected.
        kind: EntityKind,
    },
}

/// Errors reported by a [`PlatformClient`](crate::client::PlatformClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The platform answered but has no such entity.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// The id that was looked up.
        id: Id,
    },

    /// The platform could not be reached or failed.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// Shorthand for a not-found error.
    pub fn not_found(kind: EntityKind, id: Id) -> Self {
        Self::NotFound { kind, id }
    }

    /// Check if this error only means the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors reported by a [`Responder`](crate::client::Responder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RespondError {
    /// Refused to send an empty message.
    #[error("text is empty")]
    EmptyText,

    /// The responder cannot perform this kind of response.
    #[error("responder does not support {0}")]
    Unsupported(&'static str),

    /// The platform rejected the response.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors raised while translating routes into structured command schemas
/// or pushing them to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// An exported route has no description.
    #[error("command '{path}' has no description")]
    MissingDescription {
        /// Space-separated route path.
        path: String,
    },

    /// An argument of an exported route has no description.
    #[error("argument '{argument}' of command '{path}' has no description")]
    MissingArgumentDescription {
        /// Space-separated route path.
        path: String,
        /// Argument name.
        argument: String,
    },

    /// A route or argument name is empty once reduced to the allowed
    /// character set.
    #[error("'{name}' in command '{path}' is not a valid command name")]
    InvalidName {
        /// Space-separated route path.
        path: String,
        /// The offending name.
        name: String,
    },

    /// A choice value that does not parse as the argument's type.
    #[error("choice '{value}' of argument '{argument}' in command '{path}' does not match its type")]
    InvalidChoice {
        /// Space-separated route path.
        path: String,
        /// Argument name.
        argument: String,
        /// The choice value.
        value: String,
    },

    /// Sub-commands nest deeper than the platform allows.
    #[error("command '{path}' nests sub-commands too deeply")]
    TooDeep {
        /// Space-separated route path.
        path: String,
    },

    /// The registered commands could not be listed.
    #[error("listing registered commands failed: {source}")]
    ListCommands {
        /// The platform error.
        #[source]
        source: ClientError,
    },

    /// The platform rejected a command.
    #[error("command registration failed for '{command}': {source}")]
    Registration {
        /// Command name.
        command: String,
        /// The platform error.
        #[source]
        source: ClientError,
    },
}

/// Errors loading a [`RouterConfig`](crate::config::RouterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value '{value}' for {variable}")]
    InvalidValue {
        /// Variable name.
        variable: &'static str,
        /// The raw value.
        value: String,
    },

    /// A configuration file failed to parse.
    #[error("invalid router configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Umbrella error for dispatching an invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouterError {
    /// The invocation's arguments were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A lookup through the platform client failed.
    #[error("argument resolution failed: {0}")]
    Resolution(#[from] ClientError),

    /// A reply could not be delivered.
    #[error("response failed: {0}")]
    Respond(#[from] RespondError),

    /// A signature failed to compile.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Export or registration failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// A structured interaction names no registered command.
    #[error("no command matches '{command}'")]
    RouteNotFound {
        /// The invoked command name.
        command: String,
    },

    /// The route is a pure namespace and cannot be called.
    #[error("route '{path}' has no handler")]
    NoHandler {
        /// Space-separated route path.
        path: String,
    },

    /// An autocomplete request did not name a known argument.
    #[error("unknown option")]
    UnknownOption,

    /// The focused argument has no autocomplete handler.
    #[error("argument '{argument}' is not registered for autocomplete")]
    NotAutocomplete {
        /// Argument name.
        argument: String,
    },
}

/// Result type for dispatch operations.
pub type RouterResult<T> = std::result::Result<T, RouterError>;

/// Result type for signature compilation.
pub type SignatureResult<T> = std::result::Result<T, SignatureError>;
