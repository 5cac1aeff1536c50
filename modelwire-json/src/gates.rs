//! Route-level authorization hooks.
//!
//! A gate returns `None` to allow access to a route and `Some(message)` to
//! veto it. Read vetoes drop the property from the output; write vetoes fail
//! the whole read.

use crate::error::{JsonError, Result};
use modelwire_model::PropertyRoute;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A read or write authorization predicate.
pub type RouteGate = Arc<dyn Fn(&PropertyRoute) -> Option<String> + Send + Sync>;

/// The pair of gates consulted once per property per conversion.
#[derive(Clone, Default)]
pub struct AccessGates {
    read: Option<RouteGate>,
    write: Option<RouteGate>,
}

impl AccessGates {
    /// Gates that allow every route.
    pub fn allow_all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_read_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&PropertyRoute) -> Option<String> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(gate));
        self
    }

    #[must_use]
    pub fn with_write_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&PropertyRoute) -> Option<String> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(gate));
        self
    }

    /// Returns the veto message for reading `route`, if any.
    pub fn can_read(&self, route: &PropertyRoute) -> Option<String> {
        self.read.as_ref().and_then(|gate| gate(route))
    }

    /// Returns the veto message for writing `route`, if any.
    pub fn can_write(&self, route: &PropertyRoute) -> Option<String> {
        self.write.as_ref().and_then(|gate| gate(route))
    }

    pub fn assert_can_write(&self, route: &PropertyRoute) -> Result<()> {
        match self.can_write(route) {
            None => Ok(()),
            Some(reason) => {
                warn!(%route, %reason, "write rejected by access gate");
                Err(JsonError::UnauthorizedWrite {
                    route: route.to_string(),
                    reason,
                })
            }
        }
    }
}

impl fmt::Debug for AccessGates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGates")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}
