use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels a token when Ctrl-C arrives while a command runs.
///
/// The listener stops when this value is dropped, so Ctrl-C outside of a
/// command falls back to the default handling.
pub struct CtrlCGuard {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl CtrlCGuard {
    pub fn install() -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let listener = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        child.cancel();
                    }
                }
            }
        });
        Self { token, listener }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CtrlCGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
