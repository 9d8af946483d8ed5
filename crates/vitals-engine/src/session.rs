use crate::Result;
use async_trait::async_trait;
use vitals_core::ObservedResponse;

/// A single browsing session the engine navigates and listens to.
///
/// `next_response` must be cancel safe: the supervisor races it against its
/// poll ticker and drops it whenever the ticker wins.
#[async_trait]
pub trait ConsoleSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn reload(&mut self) -> Result<()>;

    /// Reload bypassing the HTTP cache
    async fn hard_reload(&mut self) -> Result<()>;

    /// Next finished response in arrival order. `None` once the session is gone.
    async fn next_response(&mut self) -> Option<ObservedResponse>;

    async fn close(&mut self) -> Result<()>;
}
