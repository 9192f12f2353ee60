use tracing::{info, warn};

use crate::shutdown::ShutdownToken;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Triggers `token` on Ctrl+C or SIGTERM. The task exits once the token is
/// triggered from anywhere.
pub fn setup_signal_shutdown_handler(token: &ShutdownToken) -> tokio::task::JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = token.triggered() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    info!("Interrupt received, stopping virtual users");
                    token.trigger();
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    info!("SIGTERM received, stopping virtual users");
                    token.trigger();
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = token.triggered() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    info!("Interrupt received, stopping virtual users");
                    token.trigger();
                }
            }
        }
    })
}
