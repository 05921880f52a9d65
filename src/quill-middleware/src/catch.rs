//! Reporting rejected invocations.

use quill_router::{Context, Handler, handler};
use tracing::debug;

use crate::error::MiddlewareError;

/// Runs when a middleware rejects an invocation. Passing `None` to a
/// middleware rejects silently.
pub type CatchFn = Handler;

/// Context scratch key holding the [`MiddlewareError`] of a rejection.
pub const ERROR_KEY: &str = "middleware.err";

/// A catch function that replies with fixed text.
pub fn catch_reply(text: impl Into<String>) -> CatchFn {
    let text = text.into();
    handler(move |ctx| {
        let text = text.clone();
        Box::pin(async move {
            if let Err(err) = ctx.reply(&text).await {
                debug!(error = %err, "catch reply failed");
            }
        })
    })
}

/// A catch function that replies with the rejection itself.
pub fn catch_error() -> CatchFn {
    handler(|ctx| {
        Box::pin(async move {
            let Some(text) = ctx
                .vars
                .get::<MiddlewareError>(ERROR_KEY)
                .map(ToString::to_string)
            else {
                return;
            };
            if let Err(err) = ctx.reply(text).await {
                debug!(error = %err, "catch reply failed");
            }
        })
    })
}

/// Record `err` on the context and run the catch function, if any.
pub(crate) async fn call_catch(ctx: &mut Context, catch: Option<&CatchFn>, err: MiddlewareError) {
    debug!(command = %ctx.command, error = %err, "invocation rejected by middleware");
    let Some(catch) = catch else {
        return;
    };
    ctx.vars.set(ERROR_KEY, err);
    catch(ctx).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_router::Router;
    use quill_router::testing::{MockClient, RecordingResponder};
    use std::sync::Arc;

    fn context() -> (Context, Arc<RecordingResponder>) {
        let responder = Arc::new(RecordingResponder::new());
        let ctx = Context::builder(
            Arc::new(Router::new()),
            responder.clone(),
            Arc::new(MockClient::new()),
        )
        .build();
        (ctx, responder)
    }

    #[tokio::test]
    async fn test_catch_reply() {
        let (mut ctx, responder) = context();
        let catch = catch_reply("nope");
        call_catch(&mut ctx, Some(&catch), MiddlewareError::ChannelNotNsfw).await;

        assert_eq!(responder.replies(), vec!["nope".to_string()]);
        assert_eq!(
            ctx.vars.get::<MiddlewareError>(ERROR_KEY),
            Some(&MiddlewareError::ChannelNotNsfw)
        );
    }

    #[tokio::test]
    async fn test_catch_error_replies_with_rejection() {
        let (mut ctx, responder) = context();
        call_catch(&mut ctx, Some(&catch_error()), MiddlewareError::ChannelNotNsfw).await;

        assert_eq!(
            responder.replies(),
            vec!["this command can only be used in an NSFW channel".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_catch_is_silent() {
        let (mut ctx, responder) = context();
        call_catch(&mut ctx, None, MiddlewareError::ChannelNotNsfw).await;

        assert!(responder.replies().is_empty());
        assert!(!ctx.vars.contains(ERROR_KEY));
    }
}
