// Headless coaching client
//
// Connects to a coaching backend, keeps the session alive across outages and
// logs the traffic and the derived state. Useful for exercising a backend
// without an editor attached. `RUST_LOG` controls verbosity.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use kodegen_coach_client::anchors::EditorView;
use kodegen_coach_client::review::FileOpener;
use kodegen_coach_client::{
    CoachContext, CoachOptions, ConnectionState, InboundKind, ScreenRect, WebSocketTransport,
};
use tokio::sync::{broadcast, watch};

#[derive(Debug, Parser)]
#[command(
    name = "kodegen-coach-client",
    about = "Headless client for the coaching backend",
    author,
    version
)]
struct Cli {
    /// Backend WebSocket endpoint
    #[arg(long, env = "COACH_SERVER_URL", default_value = kodegen_coach_client::types::options::DEFAULT_SERVER_URL)]
    server_url: String,

    /// Name reported in the handshake
    #[arg(long, env = "COACH_CLIENT_NAME")]
    client_name: Option<String>,

    /// Workspace to start a coaching session for once connected
    #[arg(long, env = "COACH_WORKSPACE")]
    workspace: Option<String>,

    /// Initial hint level (0-3)
    #[arg(long)]
    hint_level: Option<i64>,

    /// Bound on queued mutations awaiting acknowledgment
    #[arg(long, default_value_t = kodegen_coach_client::types::options::DEFAULT_MAX_PENDING_OPERATIONS)]
    max_pending: usize,
}

/// Editor view with nothing on screen
struct HeadlessView {
    scroll: watch::Sender<u64>,
}

impl EditorView for HeadlessView {
    fn resolve(&self, _line: u32, _column: u32) -> Option<ScreenRect> {
        None
    }

    fn scroll_events(&self) -> watch::Receiver<u64> {
        self.scroll.subscribe()
    }
}

/// File opener that only logs the request
struct LogOpener;

impl FileOpener for LogOpener {
    fn open_file(&self, file: &str) {
        log::info!("Review wants {file} opened");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut builder = CoachOptions::builder()
        .server_url(cli.server_url)
        .max_pending_operations(cli.max_pending);
    if let Some(name) = cli.client_name {
        builder = builder.client_name(name);
    }
    let options = builder.try_build()?;
    log::info!("Connecting to {}", options.server_url);

    let transport = WebSocketTransport::new(options.server_url.clone());
    let (scroll, _) = watch::channel(0);
    let context = CoachContext::new(
        transport,
        options,
        Arc::new(HeadlessView { scroll }),
        Arc::new(LogOpener),
    );

    let _traffic: Vec<_> = InboundKind::ALL
        .into_iter()
        .map(|kind| {
            context
                .bus()
                .on(kind, |message| log::debug!("<- {}", message.kind()))
        })
        .collect();

    if let Some(level) = cli.hint_level {
        context.set_hint_level(level);
    }

    let mut status = Box::pin(context.session().status_stream());
    let mut ambient = context.coaching().ambient_notices();
    let mut started = false;

    context.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
            Some(update) = status.next() => {
                if update.show_reconnect_notice() {
                    log::warn!(
                        "Still reconnecting (attempt {}): {}",
                        update.reconnect_attempt,
                        update.last_error.as_deref().unwrap_or("unknown error")
                    );
                }
                if update.state == ConnectionState::Active && !started {
                    started = true;
                    if let Some(workspace) = &cli.workspace {
                        context.start_session(workspace.clone());
                    }
                }
            }
            notice = ambient.recv() => match notice {
                Ok(message) => log::info!("[{:?}] {}", message.kind.effective(), message.body),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Skipped {skipped} ambient notice(s)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }

        let pending = context.session().interrupted_operations();
        if !pending.is_empty() {
            log::info!("{} operation(s) retrying", pending.len());
        }
    }

    context.shutdown().await?;
    Ok(())
}
