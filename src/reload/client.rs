//! Browser-side reload client.
//!
//! The client is plain JavaScript appended to the injection target, or
//! shipped as `reload-client.js` behind the stand-in background page when
//! no background is declared. It connects once at load time; it does not
//! reconnect if the socket drops.
//!
//! # Client Flow
//!
//! 1. Module loads, opens `ws://{host}:{port}`
//! 2. Server sends `{"type":"connected"}`, client logs it
//! 3. Build finishes, server sends `{"type":"update"}`
//! 4. Client calls `runtime.reload()`

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// File name of the standalone reload client script.
pub const CLIENT_SCRIPT_FILE: &str = "reload-client.js";

/// Reload client template. `$WS_URL` is a JSON string literal.
const CLIENT_TEMPLATE: &str = r#"
// crx-plugin reload client
;(() => {
  const runtime = (globalThis.chrome ?? globalThis.browser).runtime;
  const socket = new WebSocket($WS_URL);
  socket.addEventListener("message", (event) => {
    let payload;
    try {
      payload = JSON.parse(event.data);
    } catch (_) {
      return;
    }
    if (payload.type === "connected") {
      console.log("[crx-plugin] reload channel connected");
    } else if (payload.type === "update") {
      runtime.reload();
    }
  });
})();
"#;

/// Stand-in background page. Extension CSP forbids inline scripts, so
/// the client is loaded from a sibling file.
const STAND_IN_PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Background</title>
</head>
<body>
    <script src="$CLIENT_SCRIPT"></script>
</body>
</html>
"#;

// ============================================================================
// Public Functions
// ============================================================================

/// Returns the reload client source for the given server URL.
#[must_use]
pub fn reload_snippet(ws_url: &str) -> String {
    let literal = Value::String(ws_url.to_string()).to_string();
    CLIENT_TEMPLATE.replace("$WS_URL", &literal)
}

/// Returns the stand-in background page.
#[must_use]
pub fn stand_in_page() -> String {
    STAND_IN_PAGE_TEMPLATE.replace("$CLIENT_SCRIPT", CLIENT_SCRIPT_FILE)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_embeds_url() {
        let snippet = reload_snippet("ws://localhost:3060");
        assert!(snippet.contains(r#"new WebSocket("ws://localhost:3060")"#));
        assert!(!snippet.contains("$WS_URL"));
    }

    #[test]
    fn test_snippet_handles_both_messages() {
        let snippet = reload_snippet("ws://localhost:3060");
        assert!(snippet.contains(r#"payload.type === "connected""#));
        assert!(snippet.contains(r#"payload.type === "update""#));
        assert!(snippet.contains("runtime.reload()"));
    }

    #[test]
    fn test_snippet_escapes_url() {
        let snippet = reload_snippet(r#"ws://evil"host:1"#);
        assert!(snippet.contains(r#""ws://evil\"host:1""#));
    }

    #[test]
    fn test_snippet_starts_on_new_line() {
        assert!(reload_snippet("ws://localhost:3060").starts_with('\n'));
    }

    #[test]
    fn test_stand_in_page_loads_client_script() {
        let page = stand_in_page();
        assert!(page.contains("<!DOCTYPE html>"));
        assert!(page.contains(r#"<script src="reload-client.js"></script>"#));
    }
}
