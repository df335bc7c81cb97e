//! Screens the app can show and which of them are reachable.

use oneview_shared::MessageId;

use crate::auth_session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    SendMessage,
    MessageView { id: MessageId },
}

/// A request from a screen to move somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(Route),
    Back,
}

/// The set of routes available for a session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStack {
    Unauthenticated,
    Authenticated,
}

impl RouteStack {
    /// `None` while the session is still loading: render nothing yet.
    pub fn for_session(state: &SessionState) -> Option<Self> {
        if state.loading {
            None
        } else if state.is_authenticated() {
            Some(RouteStack::Authenticated)
        } else {
            Some(RouteStack::Unauthenticated)
        }
    }

    pub fn initial_route(self) -> Route {
        match self {
            RouteStack::Unauthenticated => Route::Login,
            RouteStack::Authenticated => Route::Dashboard,
        }
    }

    pub fn contains(self, route: &Route) -> bool {
        match self {
            RouteStack::Unauthenticated => matches!(route, Route::Login | Route::Register),
            RouteStack::Authenticated => matches!(
                route,
                Route::Dashboard | Route::SendMessage | Route::MessageView { .. }
            ),
        }
    }
}

/// Back-stack of routes inside the current [`RouteStack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    stack: Option<RouteStack>,
    history: Vec<Route>,
}

impl Navigator {
    pub fn new(state: &SessionState) -> Self {
        let mut nav = Self {
            stack: None,
            history: Vec::new(),
        };
        nav.sync(state);
        nav
    }

    /// Route on top, or `None` while loading.
    pub fn current(&self) -> Option<&Route> {
        self.history.last()
    }

    /// Follow session changes. Switching stacks resets history to the new
    /// stack's first screen.
    pub fn sync(&mut self, state: &SessionState) {
        let stack = RouteStack::for_session(state);
        if stack != self.stack {
            self.stack = stack;
            self.history = stack.map(|s| vec![s.initial_route()]).unwrap_or_default();
        }
    }

    /// Apply a screen's navigation request. Routes outside the current stack
    /// are ignored.
    pub fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Back => {
                if self.history.len() > 1 {
                    self.history.pop();
                }
            }
            Navigation::To(route) => match self.stack {
                Some(stack) if stack.contains(&route) => {
                    if let Some(pos) = self.history.iter().position(|r| *r == route) {
                        self.history.truncate(pos + 1);
                    } else {
                        self.history.push(route);
                    }
                }
                _ => tracing::warn!(?route, "ignoring navigation outside the active stack"),
            },
        }
    }
}
