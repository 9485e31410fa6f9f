//! Packet dispatch: routes decoded packets to handlers.
//!
//! A [`Dispatcher`] maps a route (`namespace%command`) to an ordered list
//! of registrations. A route can have several handlers: they run in the
//! order they were registered until one returns [`Flow::Handled`]. Chat
//! uses this to put filters and commands in front of the room broadcast.
//!
//! Registrations made with [`Dispatcher::on_once`] claim at most one packet
//! per connection; a call that returns [`Flow::Continue`] does not count.
//! Which ones already fired is per-connection state, kept in a
//! [`ConnectionScope`] that the connection loop owns; the dispatcher itself
//! is shared by every connection and never mutated after startup.
//!
//! The dispatcher holds no game state. Handlers receive the state `S` (the
//! server's `World`) by mutable reference for the duration of one packet.

use std::collections::{HashMap, HashSet};

use igloo_protocol::{Packet, Route};
use igloo_transport::ConnectionId;

/// What a handler decided about a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Stop: later handlers on this route don't see the packet.
    Handled,
    /// Let the next handler on this route look at it.
    Continue,
}

type PacketHandler<S> = Box<dyn Fn(&mut S, ConnectionId, &Packet) -> Flow + Send + Sync>;
type DisconnectHook<S> = Box<dyn Fn(&mut S, ConnectionId) + Send + Sync>;

struct Registration<S> {
    /// Unique across the dispatcher; keys the once-per-connection set.
    key: usize,
    name: &'static str,
    once: bool,
    handler: PacketHandler<S>,
}

/// Per-connection dispatch state.
#[derive(Debug)]
pub struct ConnectionScope {
    conn_id: ConnectionId,
    fired: HashSet<usize>,
    disconnected: bool,
}

impl ConnectionScope {
    pub fn new(conn_id: ConnectionId) -> Self {
        Self {
            conn_id,
            fired: HashSet::new(),
            disconnected: false,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Whether the disconnect hooks already ran.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Route table plus disconnect hooks.
pub struct Dispatcher<S> {
    routes: HashMap<Route, Vec<Registration<S>>>,
    disconnect_hooks: Vec<(&'static str, DisconnectHook<S>)>,
    next_key: usize,
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            disconnect_hooks: Vec::new(),
            next_key: 0,
        }
    }
}

impl<S> Dispatcher<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `route`, after any handlers already there.
    pub fn on<F>(&mut self, route: impl Into<Route>, name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(&mut S, ConnectionId, &Packet) -> Flow + Send + Sync + 'static,
    {
        self.register(route.into(), name, false, Box::new(handler))
    }

    /// Like [`on`](Self::on), but once the handler returns
    /// [`Flow::Handled`] it is skipped for the rest of the connection.
    /// Other handlers on the route are unaffected.
    pub fn on_once<F>(&mut self, route: impl Into<Route>, name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(&mut S, ConnectionId, &Packet) -> Flow + Send + Sync + 'static,
    {
        self.register(route.into(), name, true, Box::new(handler))
    }

    /// Registers a hook run when a connection closes.
    pub fn on_disconnect<F>(&mut self, name: &'static str, hook: F) -> &mut Self
    where
        F: Fn(&mut S, ConnectionId) + Send + Sync + 'static,
    {
        self.disconnect_hooks.push((name, Box::new(hook)));
        self
    }

    fn register(
        &mut self,
        route: Route,
        name: &'static str,
        once: bool,
        handler: PacketHandler<S>,
    ) -> &mut Self {
        let key = self.next_key;
        self.next_key += 1;
        tracing::trace!(%route, name, once, "handler registered");
        self.routes.entry(route).or_default().push(Registration {
            key,
            name,
            once,
            handler,
        });
        self
    }

    /// Names of the handlers on `route`, in the order they run.
    pub fn handlers(&self, route: &Route) -> Vec<&'static str> {
        self.routes
            .get(route)
            .map(|regs| regs.iter().map(|r| r.name).collect())
            .unwrap_or_default()
    }

    /// Runs the handlers for `packet`'s route in order until one returns
    /// [`Flow::Handled`]. Returns `Continue` if nobody claimed it.
    pub fn dispatch(&self, state: &mut S, scope: &mut ConnectionScope, packet: &Packet) -> Flow {
        let route = packet.route();
        let Some(registrations) = self.routes.get(&route) else {
            tracing::trace!(conn_id = %scope.conn_id, %route, "no handler for route");
            return Flow::Continue;
        };

        for registration in registrations {
            if registration.once && scope.fired.contains(&registration.key) {
                continue;
            }
            tracing::trace!(
                conn_id = %scope.conn_id,
                %route,
                handler = registration.name,
                "dispatching"
            );
            if (registration.handler)(state, scope.conn_id, packet) == Flow::Handled {
                if registration.once {
                    scope.fired.insert(registration.key);
                }
                return Flow::Handled;
            }
        }

        tracing::trace!(conn_id = %scope.conn_id, %route, "packet unclaimed");
        Flow::Continue
    }

    /// Runs every disconnect hook for the connection, once. Later calls
    /// for the same scope do nothing.
    pub fn disconnect(&self, state: &mut S, scope: &mut ConnectionScope) {
        if std::mem::replace(&mut scope.disconnected, true) {
            return;
        }
        for (name, hook) in &self.disconnect_hooks {
            tracing::trace!(conn_id = %scope.conn_id, hook = name, "disconnect hook");
            hook(state, scope.conn_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    fn packet(ns: &str, cmd: &str) -> Packet {
        Packet::new(ns, cmd, Vec::new())
    }

    fn scope() -> ConnectionScope {
        ConnectionScope::new(ConnectionId::new(1))
    }

    #[test]
    fn test_dispatch_runs_in_registration_order() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher
            .on("s%sm", "first", |log, _, _| {
                log.0.push("first".into());
                Flow::Continue
            })
            .on("s%sm", "second", |log, _, _| {
                log.0.push("second".into());
                Flow::Continue
            });

        let mut log = Log::default();
        let flow = dispatcher.dispatch(&mut log, &mut scope(), &packet("s", "sm"));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(log.0, vec!["first", "second"]);
        assert_eq!(dispatcher.handlers(&Route::new("s", "sm")), vec!["first", "second"]);
    }

    #[test]
    fn test_dispatch_handled_stops_fallthrough() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher
            .on("s%sm", "filter", |log, _, _| {
                log.0.push("filter".into());
                Flow::Handled
            })
            .on("s%sm", "broadcast", |log, _, _| {
                log.0.push("broadcast".into());
                Flow::Handled
            });

        let mut log = Log::default();
        let flow = dispatcher.dispatch(&mut log, &mut scope(), &packet("s", "sm"));
        assert_eq!(flow, Flow::Handled);
        assert_eq!(log.0, vec!["filter"]);
    }

    #[test]
    fn test_dispatch_unknown_route_is_unclaimed() {
        let dispatcher = Dispatcher::<Log>::new();
        let mut log = Log::default();
        let flow = dispatcher.dispatch(&mut log, &mut scope(), &packet("z", "zz"));
        assert_eq!(flow, Flow::Continue);
        assert!(log.0.is_empty());
    }

    #[test]
    fn test_on_once_fires_once_per_connection() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher
            .on_once("s%gi", "inventory", |log, _, _| {
                log.0.push("inventory".into());
                Flow::Handled
            })
            .on("s%gi", "fallback", |log, _, _| {
                log.0.push("fallback".into());
                Flow::Handled
            });

        let mut log = Log::default();
        let mut first = scope();
        dispatcher.dispatch(&mut log, &mut first, &packet("s", "gi"));
        dispatcher.dispatch(&mut log, &mut first, &packet("s", "gi"));

        let mut second = ConnectionScope::new(ConnectionId::new(2));
        dispatcher.dispatch(&mut log, &mut second, &packet("s", "gi"));

        assert_eq!(log.0, vec!["inventory", "fallback", "inventory"]);
    }

    #[test]
    fn test_on_once_continue_keeps_the_handler_armed() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher.on_once("s%gi", "inventory", |log, _, packet| {
            log.0.push(format!("inventory:{}", packet.arg(0).unwrap_or("")));
            if packet.arg(0) == Some("ready") {
                Flow::Handled
            } else {
                Flow::Continue
            }
        });

        let mut log = Log::default();
        let mut scope = scope();
        let early = Packet::new("s", "gi", vec!["early".into()]);
        let ready = Packet::new("s", "gi", vec!["ready".into()]);
        assert_eq!(dispatcher.dispatch(&mut log, &mut scope, &early), Flow::Continue);
        assert_eq!(dispatcher.dispatch(&mut log, &mut scope, &ready), Flow::Handled);
        assert_eq!(dispatcher.dispatch(&mut log, &mut scope, &ready), Flow::Continue);

        assert_eq!(log.0, vec!["inventory:early", "inventory:ready"]);
    }

    #[test]
    fn test_handler_sees_connection_and_args() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher.on("s%jr", "join", |log, conn, packet| {
            log.0.push(format!("{conn}:{}", packet.arg(0).unwrap_or("")));
            Flow::Handled
        });

        let mut log = Log::default();
        let packet = Packet::new("s", "jr", vec!["111".into()]);
        dispatcher.dispatch(&mut log, &mut scope(), &packet);
        assert_eq!(log.0, vec!["conn-1:111"]);
    }

    #[test]
    fn test_disconnect_runs_hooks_once() {
        let mut dispatcher = Dispatcher::<Log>::new();
        dispatcher
            .on_disconnect("leave table", |log, _| log.0.push("table".into()))
            .on_disconnect("leave room", |log, _| log.0.push("room".into()));

        let mut log = Log::default();
        let mut scope = scope();
        dispatcher.disconnect(&mut log, &mut scope);
        dispatcher.disconnect(&mut log, &mut scope);

        assert!(scope.is_disconnected());
        assert_eq!(log.0, vec!["table", "room"]);
    }
}
