// src/browser.rs
//! Binds the navigator to the real browser History API.

use crate::controller::Navigator;
use crate::history::{HistoryWriter, Location, LocationSource};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub struct BrowserHistory {
    window: web_sys::Window,
}

impl BrowserHistory {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        Ok(Self { window })
    }
}

impl LocationSource for BrowserHistory {
    fn location(&self) -> Location {
        let location = self.window.location();
        Location {
            pathname: location.pathname().unwrap_or_else(|_| "/".to_string()),
            search: location.search().unwrap_or_default(),
        }
    }
}

impl HistoryWriter for BrowserHistory {
    fn push(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|history| history.push_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            warn!(url, error = ?e, "pushState failed");
        }
    }

    fn replace(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            warn!(url, error = ?e, "replaceState failed");
        }
    }
}

/// A `popstate` listener on the window, removed again on drop.
pub struct PopstateSubscription {
    window: web_sys::Window,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl PopstateSubscription {
    pub fn new(mut on_pop: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| on_pop()));
        window.add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref())?;
        Ok(Self { window, callback })
    }
}

impl Drop for PopstateSubscription {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("popstate", self.callback.as_ref().unchecked_ref());
    }
}

/// Routes browser back/forward into a shared navigator.
pub fn subscribe_navigator(
    navigator: &Rc<RefCell<Navigator<BrowserHistory>>>,
) -> Result<PopstateSubscription, JsValue> {
    let navigator = Rc::clone(navigator);
    PopstateSubscription::new(move || deliver_popstate(Rc::clone(&navigator)))
}

/// Runs the popstate handler, or retries on the next task while a
/// navigation holds the navigator.
fn deliver_popstate(navigator: Rc<RefCell<Navigator<BrowserHistory>>>) {
    let busy = match navigator.try_borrow_mut() {
        Ok(mut nav) => {
            nav.handle_popstate();
            false
        }
        Err(_) => true,
    };
    if !busy {
        return;
    }
    debug!("Navigator busy, deferring popstate");
    let Some(window) = web_sys::window() else { return };
    let retry = Closure::once_into_js(move || deliver_popstate(navigator));
    if let Err(e) = window.set_timeout_with_callback(retry.unchecked_ref()) {
        warn!(error = ?e, "Could not defer popstate, location and state may diverge");
    }
}
