pub mod cache;
pub mod cancel;
pub mod inflight;
pub mod interceptor;
pub mod interstitial;
pub mod proxy;
pub mod scan;

pub use cache::VerdictCache;
pub use interceptor::{InterceptorOptions, NavigationInterceptor};
pub use interstitial::{InterstitialAction, InterstitialController, InterstitialParams, ReportOutcome};
pub use proxy::ProxyService;
pub use scan::HttpScanClient;
