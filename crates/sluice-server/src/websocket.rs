//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload {
        /// Category whose output changed
        category: String,
    },

    /// Only stylesheets changed; swap them without reloading
    Css {
        category: String,
        /// URL paths of the rewritten stylesheets
        paths: Vec<String>,
    },

    /// Connection established
    Connected,
}

impl ReloadMessage {
    /// Pick the narrowest reload for a set of written URL paths.
    pub fn for_paths(category: &str, paths: Vec<String>) -> Self {
        let all_css = !paths.is_empty()
            && paths
                .iter()
                .all(|p| p.to_ascii_lowercase().ends_with(".css"));

        if all_css {
            ReloadMessage::Css {
                category: category.to_string(),
                paths,
            }
        } else {
            ReloadMessage::Reload {
                category: category.to_string(),
            }
        }
    }
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side reload script. Connects back to `ws_path` on the serving host.
pub fn reload_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{}';
  var ws = new WebSocket(url);
  var reconnectAttempts = 0;
  var maxReconnectAttempts = 10;

  function refreshStylesheets() {{
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
      var href = link.getAttribute('href');
      if (!href) return;
      var base = href.split('?')[0];
      link.setAttribute('href', base + '?v=' + Date.now());
    }});
  }}

  ws.onopen = function() {{
    console.log('[sluice] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    var msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        console.log('[sluice] ' + msg.category + ' changed, reloading');
        location.reload();
        break;

      case 'css':
        console.log('[sluice] ' + msg.category + ' stylesheets changed');
        refreshStylesheets();
        break;

      case 'connected':
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[sluice] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};
}})();
"#,
        ws_path
    )
}
