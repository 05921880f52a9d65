//! Scenario tests that drive the router end to end.

mod autocomplete_tests;

use std::sync::Arc;

use crate::context::{Context, MessageEvent};
use crate::dispatch::Outcome;
use crate::error::RouterResult;
use crate::model::{Channel, Guild, Id, Member, Role, User};
use crate::route::{Handler, Middleware, Router, handler, middleware};
use crate::testing::{MockClient, RecordingResponder};

pub(crate) const GUILD: Id = Id::new(1);
pub(crate) const CHANNEL: Id = Id::new(2);

/// A guild with one text channel, two members and a role.
pub(crate) fn guild_client() -> MockClient {
    let member = |id, name: &str| Member {
        user: User {
            id: Id::new(id),
            name: name.to_string(),
            bot: false,
        },
        guild_id: GUILD,
        ..Default::default()
    };

    MockClient::new()
        .with_guild(Guild {
            id: GUILD,
            name: "home".into(),
            ..Default::default()
        })
        .with_channel(Channel {
            id: CHANNEL,
            guild_id: Some(GUILD),
            name: "general".into(),
            ..Default::default()
        })
        .with_member(member(10, "ana"))
        .with_member(member(11, "ben"))
        .with_role(Role {
            id: Id::new(30),
            guild_id: GUILD,
            name: "mods".into(),
            ..Default::default()
        })
}

/// Handler that replies with a fixed text.
pub(crate) fn replying(text: &'static str) -> Handler {
    handler(move |ctx| {
        Box::pin(async move {
            let _ = ctx.reply(text).await;
        })
    })
}

/// Middleware that replies with `label` before running the handler.
pub(crate) fn tagging(label: &'static str) -> Middleware {
    middleware(move |next: Handler| {
        handler(move |ctx| {
            let next = next.clone();
            Box::pin(async move {
                let _ = ctx.reply(label).await;
                next(ctx).await;
            })
        })
    })
}

/// Parse, build a context and call, as a bot's message loop would.
pub(crate) async fn dispatch_text(
    router: &Arc<Router>,
    client: Arc<MockClient>,
    text: &str,
) -> (RouterResult<Outcome>, Arc<RecordingResponder>) {
    let responder = Arc::new(RecordingResponder::new());
    let event = MessageEvent {
        guild_id: Some(GUILD),
        channel_id: CHANNEL,
        author: User {
            id: Id::new(10),
            name: "ana".into(),
            bot: false,
        },
        content: text.to_string(),
    };

    let matched = router
        .parse_message(&event.content)
        .expect("message should match a command");
    let mut ctx = Context::from_message(router.clone(), &event, matched, responder.clone(), client)
        .await
        .expect("context should build");

    (ctx.call().await, responder)
}
