// src/popstate.rs
use crate::history::LocationSource;
use crate::parser;
use crate::state::{PageState, Transition};
use tracing::debug;

/// Re-derives page state from the address bar after back/forward.
/// It only reads the location, so it can never write a history entry.
#[derive(Debug, Default)]
pub struct PopstateListener {
    attached: bool,
}

impl PopstateListener {
    /// Returns `true` when this call did the attaching.
    pub fn attach(&mut self) -> bool {
        let newly = !self.attached;
        self.attached = true;
        newly
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Outer `None` means the listener is detached and nothing happened;
    /// inner `None` means a modal-only location was applied.
    pub fn dispatch<L: LocationSource + ?Sized>(
        &self,
        source: &L,
        state: &mut PageState,
        default_tab: &str,
    ) -> Option<Option<Transition>> {
        if !self.attached {
            return None;
        }
        let location = source.location();
        debug!(href = %location.href(), "popstate");
        let parsed = parser::parse(&location.pathname, &location.search);
        Some(state.apply_location(&parsed, default_tab))
    }
}
