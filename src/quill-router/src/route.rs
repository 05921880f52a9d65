//! Route tree.
//!
//! Routes live in an arena owned by [`Router`] and are addressed by
//! [`RouteId`]. Parents own their children through the `children` map; the
//! `parent` link is a plain id used for path reconstruction and alias
//! registration.
//!
//! The tree is built once through [`RouteBuilder`] and then shared read-only,
//! usually as `Arc<Router>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::argument::{Argument, Choice};
use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::SignatureResult;
use crate::interaction::InteractionOption;
use crate::signature::{Signature, parse_signature};

/// A command handler.
pub type Handler = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync>;

/// Wraps a handler, deciding whether and how to run it.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Build a [`Handler`] from a closure returning a boxed future.
///
/// ```ignore
/// let ping = handler(|ctx| Box::pin(async move {
///     let _ = ctx.reply("pong").await;
/// }));
/// ```
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`Middleware`] from a closure.
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Address of a route inside a [`Router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl RouteId {
    /// The unnamed root every top-level command hangs off.
    pub const ROOT: RouteId = RouteId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

#[derive(Debug, Clone)]
struct Alias {
    /// Alias as written, for case-sensitive lookups.
    name: String,
    /// Lowercase key of the aliased child.
    target: String,
}

/// A node in the command tree.
pub struct Route {
    name: String,
    usage: String,
    description: String,
    parent: Option<RouteId>,
    children: IndexMap<String, RouteId>,
    aliases: HashMap<String, Alias>,
    handler: Option<Handler>,
    middleware: Vec<Middleware>,
    arguments: Vec<Argument>,
    exported: bool,
}

impl Route {
    fn root() -> Self {
        Self {
            name: String::new(),
            usage: String::new(),
            description: String::new(),
            parent: None,
            children: IndexMap::new(),
            aliases: HashMap::new(),
            handler: None,
            middleware: Vec::new(),
            arguments: Vec::new(),
            exported: false,
        }
    }

    /// Name as written in the signature.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The route's own signature text.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parent(&self) -> Option<RouteId> {
        self.parent
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Middleware applied to this route's handler, outermost first.
    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    /// Declared arguments in signature order.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn required_count(&self) -> usize {
        self.arguments.iter().filter(|a| a.required).count()
    }

    /// Check if this route is registered as a structured command.
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// Alias names registered for direct children, as written.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .values()
            .map(|a| (a.name.as_str(), a.target.as_str()))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("handler", &self.handler.is_some())
            .field("middleware", &self.middleware.len())
            .field("arguments", &self.arguments)
            .field("exported", &self.exported)
            .finish()
    }
}

/// Options for [`Router::find_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Require segments to match names exactly instead of ignoring case.
    pub match_case: bool,
}

/// The command tree.
pub struct Router {
    routes: Vec<Route>,
    config: RouterConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("config", &self.config)
            .finish()
    }
}

impl Router {
    /// Create a router with default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: vec![Route::root()],
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Builder for the root route.
    pub fn root(&mut self) -> RouteBuilder<'_> {
        self.at(RouteId::ROOT)
    }

    /// Builder for an existing route.
    pub fn at(&mut self, id: RouteId) -> RouteBuilder<'_> {
        assert!(id.0 < self.routes.len(), "route {id:?} does not exist");
        RouteBuilder { router: self, id }
    }

    /// The route behind `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not produced by this router.
    pub fn route(&self, id: RouteId) -> &Route {
        &self.routes[id.0]
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id.0)
    }

    pub fn parent(&self, id: RouteId) -> Option<RouteId> {
        self.route(id).parent
    }

    /// Direct children of a route, in registration order.
    pub fn children(&self, id: RouteId) -> impl Iterator<Item = RouteId> + '_ {
        self.route(id).children.values().copied()
    }

    /// Resolve one segment against the children and aliases of `parent`.
    pub fn child(&self, parent: RouteId, segment: &str, match_case: bool) -> Option<RouteId> {
        let route = self.route(parent);
        let key = segment.to_lowercase();

        if let Some(&id) = route.children.get(&key)
            && (!match_case || self.route(id).name == segment)
        {
            return Some(id);
        }

        if let Some(alias) = route.aliases.get(&key)
            && (!match_case || alias.name == segment)
        {
            return route.children.get(&alias.target).copied();
        }

        None
    }

    /// Find the route for a command path, ignoring case.
    ///
    /// Descends while segments name children; the deepest route reached is
    /// returned only if it has a handler. Trailing segments that match no
    /// child are left for the caller (they are usually arguments).
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<RouteId> {
        self.find_with(path, FindOptions::default())
    }

    pub fn find_with<S: AsRef<str>>(&self, path: &[S], options: FindOptions) -> Option<RouteId> {
        let (id, _) = self.descend(RouteId::ROOT, path, options)?;
        Some(id)
    }

    /// Deepest handler route along `path` and the number of segments consumed.
    pub(crate) fn descend<S: AsRef<str>>(
        &self,
        from: RouteId,
        path: &[S],
        options: FindOptions,
    ) -> Option<(RouteId, usize)> {
        let mut current = from;
        let mut depth = 0;

        for segment in path {
            match self.child(current, segment.as_ref(), options.match_case) {
                Some(next) => {
                    current = next;
                    depth += 1;
                }
                None => break,
            }
        }

        if self.route(current).has_handler() {
            Some((current, depth))
        } else {
            debug!(path = ?self.path(current), "no handler at end of path");
            None
        }
    }

    /// Names from the root to `id`, root excluded.
    pub fn path(&self, id: RouteId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(id);

        while let Some(cur) = current {
            let route = self.route(cur);
            if route.parent.is_none() {
                break;
            }
            names.push(route.name.as_str());
            current = route.parent;
        }

        names.reverse();
        names
    }

    /// Usage text including the names of all ancestors, such as
    /// `config set <key> <value>`.
    pub fn full_usage(&self, id: RouteId) -> String {
        let route = self.route(id);
        let mut parts: Vec<&str> = Vec::new();
        if let Some(parent) = route.parent {
            parts = self.path(parent);
        }
        parts.push(&route.usage);
        parts.join(" ")
    }

    /// Total number of routes, root included.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.len() <= 1
    }

    fn insert(
        &mut self,
        parent: RouteId,
        signature: Signature,
        handler: Option<Handler>,
        middleware: Vec<Middleware>,
        exported: bool,
    ) -> RouteId {
        let id = RouteId(self.routes.len());
        let key = signature.name.to_lowercase();

        self.routes.push(Route {
            name: signature.name,
            usage: signature.usage,
            description: String::new(),
            parent: Some(parent),
            children: IndexMap::new(),
            aliases: HashMap::new(),
            handler,
            middleware,
            arguments: signature.arguments,
            exported,
        });

        let parent_route = &mut self.routes[parent.0];
        if parent_route.children.insert(key.clone(), id).is_some() {
            warn!(name = %key, "replacing existing route");
        }
        debug!(name = %key, ?parent, ?id, "registered route");

        id
    }
}

/// Chainable builder over one route.
///
/// [`on`](Self::on) returns a builder for the new child, so chained calls
/// build nested commands.
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    id: RouteId,
}

impl<'r> RouteBuilder<'r> {
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Register a child route from a signature.
    ///
    /// The child snapshots this route's middleware and export flag.
    ///
    /// # Panics
    ///
    /// If the signature is malformed. Use [`try_on`](Self::try_on) to get
    /// the error instead.
    pub fn on(self, signature: &str, handler: Option<Handler>) -> RouteBuilder<'r> {
        match self.try_on(signature, handler) {
            Ok(child) => child,
            Err(err) => panic!("invalid command signature: {err}"),
        }
    }

    /// Register a child route, returning signature errors.
    pub fn try_on(
        self,
        signature: &str,
        handler: Option<Handler>,
    ) -> SignatureResult<RouteBuilder<'r>> {
        let signature = parse_signature(signature)?;
        let parent = self.router.route(self.id);
        let middleware = parent.middleware.clone();
        let exported = parent.exported;

        let id = self
            .router
            .insert(self.id, signature, handler, middleware, exported);
        Ok(RouteBuilder {
            router: self.router,
            id,
        })
    }

    /// Register several children that share extra middleware.
    ///
    /// Middleware added through the [`Group`] applies to routes registered
    /// through it and not to this route.
    pub fn group<F>(self, build: F) -> Self
    where
        F: FnOnce(&mut Group<'_>),
    {
        let route = self.router.route(self.id);
        let mut group = Group {
            middleware: route.middleware.clone(),
            exported: route.exported,
            target: self.id,
            router: &mut *self.router,
        };
        build(&mut group);
        self
    }

    /// Append middleware. Children registered afterwards inherit it.
    pub fn use_middleware<I>(self, middleware: I) -> Self
    where
        I: IntoIterator<Item = Middleware>,
    {
        self.router.routes[self.id.0].middleware.extend(middleware);
        self
    }

    /// Register an alternate name for this route in its parent.
    pub fn alias(self, name: &str) -> Self {
        let route = self.router.route(self.id);
        let Some(parent) = route.parent else {
            warn!(alias = name, "the root route cannot have aliases");
            return self;
        };

        let target = route.name.to_lowercase();
        let key = name.to_lowercase();
        let parent_route = &mut self.router.routes[parent.0];
        if parent_route.children.contains_key(&key) {
            warn!(alias = name, "alias is shadowed by a command of the same name");
        }
        parent_route.aliases.insert(
            key,
            Alias {
                name: name.to_string(),
                target,
            },
        );
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.router.routes[self.id.0].description = description.into();
        self
    }

    /// Mark the route for structured command registration. Children created
    /// afterwards inherit the flag.
    pub fn export(self, exported: bool) -> Self {
        self.router.routes[self.id.0].exported = exported;
        self
    }

    /// Edit an argument after registration.
    ///
    /// # Panics
    ///
    /// If the route has no argument named `name`.
    pub fn argument<F>(self, name: &str, edit: F) -> Self
    where
        F: FnOnce(&mut Argument),
    {
        let route = &mut self.router.routes[self.id.0];
        let Some(argument) = route
            .arguments
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        else {
            panic!("route '{}' has no argument named '{name}'", route.name);
        };
        edit(argument);
        self
    }

    /// Attach an autocomplete handler to an argument.
    ///
    /// # Panics
    ///
    /// If the route has no argument named `name`.
    pub fn autocomplete<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Context, &InteractionOption) -> Vec<Choice> + Send + Sync + 'static,
    {
        self.argument(name, |argument| {
            argument.autocomplete(handler);
        })
    }
}

/// Registers sibling routes that share middleware.
pub struct Group<'r> {
    router: &'r mut Router,
    target: RouteId,
    middleware: Vec<Middleware>,
    exported: bool,
}

impl Group<'_> {
    /// Append middleware for routes registered through this group from now on.
    pub fn use_middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Middleware>,
    {
        self.middleware.extend(middleware);
        self
    }

    /// Register a route under the group's parent.
    ///
    /// # Panics
    ///
    /// If the signature is malformed.
    pub fn on(&mut self, signature: &str, handler: Option<Handler>) -> RouteBuilder<'_> {
        let signature = match parse_signature(signature) {
            Ok(signature) => signature,
            Err(err) => panic!("invalid command signature: {err}"),
        };
        let id = self.router.insert(
            self.target,
            signature,
            handler,
            self.middleware.clone(),
            self.exported,
        );
        RouteBuilder {
            router: &mut *self.router,
            id,
        }
    }
}
