//! Guards on where an invocation comes from and who sent it.

use std::iter;

use futures::future::join_all;
use quill_router::{ChannelKind, Context, Handler, Middleware, Permissions, handler, middleware};
use tracing::debug;

use crate::catch::{CatchFn, call_catch};
use crate::error::MiddlewareError;

/// Only run the handler in channels marked NSFW.
pub fn require_nsfw(catch: Option<CatchFn>) -> Middleware {
    middleware(move |next: Handler| {
        let catch = catch.clone();
        handler(move |ctx| {
            let next = next.clone();
            let catch = catch.clone();
            Box::pin(async move {
                if !ctx.channel.nsfw {
                    call_catch(ctx, catch.as_ref(), MiddlewareError::ChannelNotNsfw).await;
                    return;
                }
                next(ctx).await;
            })
        })
    })
}

/// Only run the handler in channels of the given kind.
pub fn channel_kind(kind: ChannelKind, catch: Option<CatchFn>) -> Middleware {
    middleware(move |next: Handler| {
        let catch = catch.clone();
        handler(move |ctx| {
            let next = next.clone();
            let catch = catch.clone();
            Box::pin(async move {
                let actual = ctx.channel.kind;
                if actual != kind {
                    let err = MiddlewareError::ChannelKind {
                        expected: kind,
                        actual,
                    };
                    call_catch(ctx, catch.as_ref(), err).await;
                    return;
                }
                next(ctx).await;
            })
        })
    })
}

/// Only run the handler for members holding every permission in `required`.
///
/// The member and their roles are fetched through the context's client.
/// Invocations outside a guild are rejected.
pub fn require_permissions(required: Permissions, catch: Option<CatchFn>) -> Middleware {
    middleware(move |next: Handler| {
        let catch = catch.clone();
        handler(move |ctx| {
            let next = next.clone();
            let catch = catch.clone();
            Box::pin(async move {
                let granted = match member_permissions(ctx).await {
                    Ok(granted) => granted,
                    Err(err) => {
                        call_catch(ctx, catch.as_ref(), err).await;
                        return;
                    }
                };

                let missing = required.difference(granted);
                if !missing.is_empty() {
                    debug!(user = %ctx.user.id, %missing, "missing permissions");
                    let err = MiddlewareError::MissingPermissions { missing };
                    call_catch(ctx, catch.as_ref(), err).await;
                    return;
                }
                next(ctx).await;
            })
        })
    })
}

async fn member_permissions(ctx: &Context) -> Result<Permissions, MiddlewareError> {
    let Some(guild) = ctx.guild.as_ref() else {
        return Err(MiddlewareError::GuildOnly);
    };
    let client = ctx.client();

    let member = client
        .member(guild.id, ctx.user.id)
        .await
        .map_err(MiddlewareError::PermissionLookup)?;

    // Roles deleted since the member was fetched grant nothing.
    let ids = iter::once(guild.id).chain(member.roles.iter().copied());
    let mut roles = Vec::new();
    for role in join_all(ids.map(|id| client.role(guild.id, id))).await {
        match role {
            Ok(role) => roles.push(role),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(MiddlewareError::PermissionLookup(err)),
        }
    }

    Ok(Permissions::for_member(guild, &member, &roles))
}
