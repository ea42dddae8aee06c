pub mod allowlist;
pub mod platform;
pub mod scanner;

pub use allowlist::{AllowlistEntry, AllowlistStore, InMemoryAllowlist};
pub use platform::{ProxyControl, TabControl};
pub use scanner::Scanner;
