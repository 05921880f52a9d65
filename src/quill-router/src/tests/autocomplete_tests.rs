use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{CHANNEL, GUILD, guild_client, replying};
use crate::argument::Choice;
use crate::context::{Context, InteractionEvent};
use crate::error::RouterError;
use crate::interaction::{InteractionOption, OptionKind, OptionValue};
use crate::model::User;
use crate::route::Router;
use crate::testing::RecordingResponder;

const SONGS: [&str; 4] = ["bohemian", "bolero", "blackbird", "yesterday"];

fn music_router() -> Arc<Router> {
    let mut router = Router::new();
    router
        .root()
        .on("music", None)
        .on("queue", None)
        .on("add <song> [position int]", Some(replying("queued")))
        .autocomplete("song", |ctx, option| {
            let typed = option.value.as_ref().map(ToString::to_string).unwrap_or_default();
            assert_eq!(ctx.command, "music queue add");
            SONGS
                .iter()
                .filter(|s| s.starts_with(typed.as_str()))
                .map(|s| Choice::new(*s, *s))
                .collect()
        });
    router
        .root()
        .on("many <word>", Some(replying("many")))
        .autocomplete("word", |_, _| {
            (0..40).map(|i| Choice::new(format!("w{i}"), format!("w{i}"))).collect()
        });
    Arc::new(router)
}

fn event(name: &str, options: Vec<InteractionOption>) -> InteractionEvent {
    InteractionEvent {
        guild_id: Some(GUILD),
        channel_id: CHANNEL,
        user: User::default(),
        name: name.to_string(),
        options,
    }
}

fn text(name: &str, value: &str) -> InteractionOption {
    InteractionOption::value(name, OptionKind::String, OptionValue::String(value.to_string()))
}

fn position() -> InteractionOption {
    InteractionOption::value("position", OptionKind::Integer, OptionValue::Integer(1))
}

async fn complete(
    router: &Arc<Router>,
    event: &InteractionEvent,
) -> (Result<Vec<Choice>, RouterError>, Arc<RecordingResponder>) {
    let responder = Arc::new(RecordingResponder::new());
    let mut ctx = Context::from_autocomplete(
        router.clone(),
        event,
        responder.clone(),
        Arc::new(guild_client()),
    )
    .await
    .expect("focused route should be found");
    let id = ctx.route_id().expect("context has a route");

    (router.call_autocomplete(id, &mut ctx).await, responder)
}

#[tokio::test]
async fn test_focused_option_three_levels_deep() {
    let router = music_router();
    let event = event(
        "music",
        vec![InteractionOption::group(
            "queue",
            vec![InteractionOption::subcommand(
                "add",
                vec![
                    text("song", "bo").focus(),
                    position(),
                ],
            )],
        )],
    );

    let (choices, responder) = complete(&router, &event).await;
    let expected = vec![Choice::new("bohemian", "bohemian"), Choice::new("bolero", "bolero")];
    assert_eq!(choices, Ok(expected.clone()));
    assert_eq!(responder.suggestions(), vec![expected]);
    assert!(responder.replies().is_empty());
}

#[tokio::test]
async fn test_argument_without_autocomplete() {
    let router = music_router();
    let event = event(
        "music",
        vec![InteractionOption::group(
            "queue",
            vec![InteractionOption::subcommand(
                "add",
                vec![
                    text("song", "bo"),
                    position().focus(),
                ],
            )],
        )],
    );

    let (result, responder) = complete(&router, &event).await;
    assert_eq!(
        result,
        Err(RouterError::NotAutocomplete {
            argument: "position".into()
        })
    );
    assert!(responder.suggestions().is_empty());
}

#[tokio::test]
async fn test_nothing_focused_has_no_route() {
    let router = music_router();
    let event = event(
        "music",
        vec![InteractionOption::group(
            "queue",
            vec![InteractionOption::subcommand("add", vec![text("song", "bo")])],
        )],
    );

    let err = Context::from_autocomplete(
        router,
        &event,
        Arc::new(RecordingResponder::new()),
        Arc::new(guild_client()),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err,
        RouterError::RouteNotFound {
            command: "music".into()
        }
    );
}

#[tokio::test]
async fn test_suggestions_are_capped() {
    let router = music_router();
    let event = event("many", vec![text("word", "w").focus()]);

    let (choices, responder) = complete(&router, &event).await;
    let choices = choices.unwrap();
    assert_eq!(choices.len(), crate::dispatch::MAX_SUGGESTIONS);
    assert_eq!(choices[0], Choice::new("w0", "w0"));
    assert_eq!(responder.suggestions()[0].len(), 25);
}
