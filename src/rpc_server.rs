//! tagshelf RPC Server: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready",...} once at startup, {"event":"notify","level":"success","message":"..."}
//!
//! Requests run concurrently; responses may arrive out of order and are matched by `id`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use tagshelf::app::App;
use tagshelf::logging;
use tagshelf::rpc_handler::handle_method;
use tagshelf::services::notifier::Notifier;
use tagshelf::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tagshelf::types::notification::Notification;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Forwards notifications to the client as `notify` events.
struct StdoutNotifier {
    out: mpsc::UnboundedSender<Value>,
}

impl Notifier for StdoutNotifier {
    fn notify(&self, notification: Notification) {
        let event = json!({
            "event": "notify",
            "level": notification.level,
            "message": notification.message,
        });
        // the writer only goes away at shutdown
        let _ = self.out.send(event);
    }
}

/// Single writer so concurrent responses never interleave on stdout.
async fn write_lines(mut rx: mpsc::UnboundedReceiver<Value>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let line = format!("{}\n", message);
        if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() {
    let mut settings_engine = SettingsEngine::new(None);
    let load_result = settings_engine.load();
    settings_engine.apply_env_overrides();
    logging::init(&settings_engine.get_settings().logging.filter);

    if let Err(e) = load_result {
        warn!("using default settings: {}", e);
    }
    info!(config = settings_engine.get_config_path(), "settings loaded");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(write_lines(out_rx));

    let notifier = Arc::new(StdoutNotifier { out: out_tx.clone() });
    let app = match App::new(settings_engine, notifier) {
        Ok(app) => Arc::new(Mutex::new(app)),
        Err(e) => {
            error!("failed to initialize tagshelf: {}", e);
            std::process::exit(1);
        }
    };

    // Initial load; a failure is reported as a notify event and the library starts empty
    let _ = app.lock().await.bookmarks.load_data().await;

    let _ = out_tx.send(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    // Max 200 RPC requests per second
    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out_tx.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let app = app.clone();
        let out = out_tx.clone();
        tokio::spawn(async move {
            let response = match handle_method(&app, &method, &params).await {
                Ok(val) => json!({"id": id, "result": val}),
                Err(err) => json!({"id": id, "error": err}),
            };
            let _ = out.send(response);
        });
    }

    info!("stdin closed, shutting down");
    // the App's notifier holds a sender too; the writer drains until every in-flight request finishes
    drop(app);
    drop(out_tx);
    let _ = writer.await;
}
