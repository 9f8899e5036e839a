use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

pub fn enable_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Receive with a timeout so a missing message fails the test instead of
/// hanging it. `None` means the channel is closed.
pub async fn recv_within<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    match tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await {
        Ok(v) => v,
        Err(_) => panic!("no message received within {RECV_TIMEOUT:?}"),
    }
}

/// Asserts nothing arrives for a short while.
pub async fn assert_idle<T: std::fmt::Debug>(rx: &mut mpsc::Receiver<T>) {
    if let Ok(v) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
        panic!("unexpected message: {v:?}");
    }
}
