//! Bridges SIGINT into the cancellation flag the driver polls.

use offload_castore::retry::CancelFlag;
use tracing::warn;

/// Conventional exit code for a process terminated by SIGINT.
pub const SIGINT_EXIT_CODE: i32 = 130;

/// Installs the Ctrl-C watcher and hands back the flag it sets.
///
/// The first SIGINT only flips the flag, so in-flight work gets a chance
/// to cancel the remote operation; a second SIGINT exits immediately.
/// Only the runtime's signal driver observes the signal; worker tasks
/// never see it.
pub fn install() -> CancelFlag {
    let flag = CancelFlag::new();
    let observed = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("unable to register SIGINT handler");
            return;
        }
        warn!("interrupt received, cancelling remote execution");
        observed.set();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(SIGINT_EXIT_CODE);
        }
    });
    flag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn installs_without_firing() {
        let flag = install();
        assert!(!flag.is_set());
    }
}
