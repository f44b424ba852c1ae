//! Developer trace events.
//!
//! `dev_trace!` emits a compact JSON event (`{"component":..,"op":..,..}`) at TRACE level on
//! target `racedata::dev`, and also records it in a thread-local capture buffer when one is
//! active. Tests use the buffer to assert on engine behavior without installing a global
//! logger.

use std::cell::RefCell;

/// Log target for developer trace events.
pub const DEV_TARGET: &str = "racedata::dev";

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Stops capturing on drop.
pub struct CaptureGuard {
    _private: (),
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURE.with(|c| *c.borrow_mut() = None);
    }
}

/// Start capturing trace events emitted on the current thread.
#[must_use]
pub fn capture() -> CaptureGuard {
    CAPTURE.with(|c| *c.borrow_mut() = Some(Vec::new()));
    CaptureGuard { _private: () }
}

#[doc(hidden)]
pub fn record(event: &str) {
    CAPTURE.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(event.to_owned());
        }
    });
}

/// Remove and return everything captured so far on this thread.
pub fn take() -> Vec<String> {
    CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Captured events that mention `op`, without draining the buffer.
pub fn events_for(op: &str) -> Vec<String> {
    let needle = format!("\"op\":\"{op}\"");
    CAPTURE.with(|c| {
        c.borrow()
            .as_ref()
            .map(|buf| buf.iter().filter(|e| e.contains(&needle)).cloned().collect())
            .unwrap_or_default()
    })
}

/// Emit a developer trace event: `dev_trace!("cache", "evict", "key" => key)`.
#[macro_export]
macro_rules! dev_trace {
    ($component:expr, $op:expr $(, $k:literal => $v:expr)* $(,)?) => {{
        let mut __ev = serde_json::Map::new();
        __ev.insert("component".to_string(), serde_json::json!($component));
        __ev.insert("op".to_string(), serde_json::json!($op));
        $( __ev.insert($k.to_string(), serde_json::json!($v)); )*
        let __line = serde_json::Value::Object(__ev).to_string();
        $crate::utils::devlog::record(&__line);
        log::trace!(target: $crate::utils::devlog::DEV_TARGET, "{}", __line);
    }};
}
