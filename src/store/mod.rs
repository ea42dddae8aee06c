pub mod allowlist;
pub mod settings;
pub mod sqlite;

pub use allowlist::SqliteAllowlist;
pub use settings::SettingsStore;
pub use sqlite::Database;
