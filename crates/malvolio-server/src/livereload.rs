//! Live reload over WebSocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint clients connect to.
pub const RELOAD_SOCKET_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Output changed, reload the page
    Reload,

    /// The last rebuild failed; the page is left as is
    BuildFailed {
        /// Error description
        message: String,
    },

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new reload hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open.
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the client script tag before the closing `</body>`, or append it
/// when the document has none.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

/// Client-side script. Connects back to the serving host, so it works for
/// any bind address or port.
pub const RELOAD_CLIENT_SCRIPT: &str = r#"
(function() {
  'use strict';

  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var attempts = 0;

  function connect() {
    var ws = new WebSocket(scheme + location.host + '/__livereload');

    ws.onopen = function() {
      attempts = 0;
    };

    ws.onmessage = function(event) {
      var msg = JSON.parse(event.data);

      switch (msg.type) {
        case 'reload':
          location.reload();
          break;

        case 'build_failed':
          console.error('[livereload] Build failed:', msg.message);
          break;

        case 'connected':
          console.log('[livereload] Connected');
          break;
      }
    };

    ws.onclose = function() {
      if (attempts < 10) {
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }
    };
  }

  connect();
})();
"#;
