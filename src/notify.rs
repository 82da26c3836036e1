use std::path::Path;

/// Progress reported by the version control layer while it works
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A state machine step for one target branch
    Step { branch: String, step: String },
    /// Checkout notification for a single path
    Checkout { kind: String, path: String },
    /// Checkout progress, `completed` out of `total` paths
    CheckoutProgress { completed: usize, total: usize },
    /// Objects received during a fetch
    Transfer {
        received: usize,
        total: usize,
        bytes: usize,
    },
    /// Objects sent during a push
    PushTransfer {
        current: usize,
        total: usize,
        bytes: usize,
    },
    /// A message relayed from the remote
    Remote(String),
    /// Result of pushing a single reference
    PushStatus { reference: String },
    /// A credential lookup for the given url
    Credentials { url: String },
}

/// Receives progress, conflict and error notifications.
///
/// Nothing returned from a sink ever changes the outcome of a run.
pub trait NotificationSink {
    fn on_progress(&self, event: ProgressEvent);
    fn on_conflict_file(&self, path: &Path);
    fn on_error(&self, message: &str);
}

/// Forwards every notification to the `log` facade
pub struct LogSink;

impl NotificationSink for LogSink {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Step { branch, step } => log::debug!("[{}] {}", branch, step),
            ProgressEvent::Checkout { kind, path } => log::debug!("checkout {}: {}", kind, path),
            ProgressEvent::CheckoutProgress { completed, total } => {
                log::debug!("checkout progress: {}/{}", completed, total)
            }
            ProgressEvent::Transfer {
                received,
                total,
                bytes,
            } => {
                if total > 0 {
                    log::debug!(
                        "Transfer progress: {}/{} objects ({:.1}%), {} bytes",
                        received,
                        total,
                        (received as f64 / total as f64) * 100.0,
                        bytes
                    );
                }
            }
            ProgressEvent::PushTransfer {
                current,
                total,
                bytes,
            } => {
                if total > 0 {
                    log::debug!(
                        "Push progress: {}/{} objects ({:.1}%), {} bytes",
                        current,
                        total,
                        (current as f64 / total as f64) * 100.0,
                        bytes
                    );
                }
            }
            ProgressEvent::Remote(message) => log::info!("Remote: {}", message),
            ProgressEvent::PushStatus { reference } => log::info!("📤 {} updated", reference),
            ProgressEvent::Credentials { url } => log::debug!("Credentials requested for {}", url),
        }
    }

    fn on_conflict_file(&self, path: &Path) {
        log::warn!("⚠️  Conflict in {}", path.display());
    }

    fn on_error(&self, message: &str) {
        log::error!("❌ {}", message);
    }
}

#[cfg(test)]
pub use recording::RecordingSink;
