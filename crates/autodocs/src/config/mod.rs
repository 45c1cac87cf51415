pub mod loader;
pub mod schema;

pub use loader::{
    apply_overrides, load_settings, load_settings_from_str, load_settings_with_env,
    validate_settings,
};
pub use schema::{default_routes, ProviderSettings, RetrySettings, RouteEntry, Settings};
