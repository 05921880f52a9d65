//! Matching text commands and running routes.

use tracing::{debug, warn};

use crate::argument::Choice;
use crate::context::Context;
use crate::error::{RouterError, RouterResult, ValidationError};
use crate::interaction::InteractionOption;
use crate::resolve::{RawInput, Scope};
use crate::route::{FindOptions, RouteId, Router};
use crate::validate::validate;

/// Most suggestions a platform accepts for one autocomplete request.
pub const MAX_SUGGESTIONS: usize = 25;

/// Split command text shell-style, so quoted text stays one token.
///
/// Text with unbalanced quotes is kept as a single token, so `don't stop`
/// matches no command with a path. Handlers that take free text should read
/// [`MessageMatch::text`] instead.
pub fn tokenize(text: &str) -> Vec<String> {
    shlex::split(text).unwrap_or_else(|| vec![text.to_string()])
}

/// A text command matched against the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMatch {
    pub route: RouteId,
    /// Path segments as typed, joined by spaces.
    pub command: String,
    /// Tokens after the command path.
    pub arguments: Vec<String>,
    /// Untokenized text after the command path.
    pub text: String,
}

/// How a call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The middleware chain ran.
    Handled,
    /// Arguments were rejected; the user was told why.
    Rejected(ValidationError),
}

impl Router {
    /// Match a message against the configured prefix and the route tree.
    pub fn parse_message(&self, text: &str) -> Option<MessageMatch> {
        let body = text.strip_prefix(self.config().prefix.as_str())?.trim();
        let mut tokens = tokenize(body);
        let options = FindOptions {
            match_case: self.config().match_case,
        };

        let (route, depth) = self.descend(RouteId::ROOT, &tokens, options)?;
        let arguments = tokens.split_off(depth);

        Some(MessageMatch {
            route,
            command: tokens.join(" "),
            arguments,
            text: skip_words(body, depth).to_string(),
        })
    }

    /// Run a route for an invocation.
    ///
    /// Attaches the route to the context, resolves and validates declared
    /// arguments, then runs the handler wrapped in the route's middleware.
    /// Rejected arguments are answered with a reply and reported as
    /// [`Outcome::Rejected`]; lookup and reply failures are errors.
    pub async fn call(&self, id: RouteId, ctx: &mut Context) -> RouterResult<Outcome> {
        ctx.set_route(id);
        let route = self.route(id);

        let Some(handler) = route.handler().cloned() else {
            return Err(RouterError::NoHandler {
                path: self.path(id).join(" "),
            });
        };

        if route.argument_count() > 0 {
            let scope = Scope {
                guild_id: ctx.guild_id(),
                client: ctx.client().as_ref(),
            };
            let resolved = ctx.input.resolve(route, scope).await.and_then(|arguments| {
                validate(route, &arguments)?;
                Ok(arguments)
            });

            match resolved {
                Ok(arguments) => ctx.arguments = arguments,
                Err(RouterError::Validation(err)) => {
                    debug!(command = %ctx.command, error = %err, "arguments rejected");
                    let text = match err {
                        ValidationError::Usage => ctx.usage_text(),
                        ref other => other.to_string(),
                    };
                    ctx.reply(text).await?;
                    return Ok(Outcome::Rejected(err));
                }
                Err(err) => {
                    warn!(command = %ctx.command, error = %err, "argument resolution failed");
                    return Err(err);
                }
            }
        }

        let chain = route
            .middleware()
            .iter()
            .rev()
            .fold(handler, |next, wrap| wrap(next));
        chain(ctx).await;

        Ok(Outcome::Handled)
    }

    /// Answer an autocomplete request for a route.
    ///
    /// Finds the focused option in the context's structured input, runs the
    /// matching argument's autocomplete handler and sends the suggestions.
    pub async fn call_autocomplete(
        &self,
        id: RouteId,
        ctx: &mut Context,
    ) -> RouterResult<Vec<Choice>> {
        ctx.set_route(id);
        let route = self.route(id);

        let RawInput::Options(options) = &ctx.input else {
            return Err(RouterError::UnknownOption);
        };
        let focused = focused_option(options).ok_or(RouterError::UnknownOption)?;

        let argument = route
            .arguments()
            .iter()
            .find(|a| a.export_name() == focused.name)
            .ok_or(RouterError::UnknownOption)?;
        let Some(complete) = argument.autocomplete.clone() else {
            return Err(RouterError::NotAutocomplete {
                argument: argument.name.clone(),
            });
        };

        let mut choices = complete(ctx, focused);
        if choices.len() > MAX_SUGGESTIONS {
            debug!(count = choices.len(), "truncating suggestions");
            choices.truncate(MAX_SUGGESTIONS);
        }

        ctx.responder().suggest(&choices).await?;
        Ok(choices)
    }
}

/// `text` without its first `count` whitespace-separated words.
fn skip_words(text: &str, count: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn focused_option(options: &[InteractionOption]) -> Option<&InteractionOption> {
    options
        .iter()
        .filter(|o| !o.is_subcommand())
        .find_map(|o| if o.focused { Some(o) } else { focused_option(&o.options) })
}
