use crate::domain::{ScanVerdict, Vote};
use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Abstract URL reputation service.
///
/// The HTTP client in `engine::scan` is the production implementation; tests
/// plug in counting or scripted scanners.
pub trait Scanner: Send + Sync {
    /// Classify a URL. Fails with `GuardError::Network` on transport failure
    /// or a non-success status.
    fn scan(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<ScanVerdict>> + Send + '_>>;

    /// Send user feedback about a URL.
    fn report(
        &self,
        url: &str,
        vote: Vote,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
