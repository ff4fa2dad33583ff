use serde::Deserialize;

use garage_core::config::Config;
use garage_domain::profile::{DEFAULT_FULL_NAME, FallbackDefaults};
use garage_domain::role::Role;
use garage_session::SessionSettings;
use garage_session::settings::DEFAULT_CONNECTION_ERROR;

/// Console service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the backend project (auth and REST share it), e.g.
    /// "https://abc.supabase.co". Env var: `BACKEND_URL`.
    pub backend_url: String,
    /// Public API key sent as `apikey` on every backend request.
    /// Env var: `BACKEND_ANON_KEY`.
    pub backend_anon_key: String,
    /// TCP port to listen on (default 3120). Env var: `CONSOLE_PORT`.
    #[serde(default = "default_console_port")]
    pub console_port: u16,
    /// Table holding canonical profiles (default "profiles").
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
    /// Database function verifying employee credentials
    /// (default "verify_employee_credentials").
    #[serde(default = "default_employee_login_rpc")]
    pub employee_login_rpc: String,
    /// Role given to federated users with no profile row and no role in their
    /// metadata (default "owner"). Env var: `GARAGE_FALLBACK_ROLE`.
    #[serde(default = "default_fallback_role", rename = "garage_fallback_role")]
    pub fallback_role: Role,
    /// Display name for such users (default "Usuario").
    #[serde(default = "default_fallback_full_name")]
    pub fallback_full_name: String,
    /// Message surfaced when the identity provider cannot be reached.
    #[serde(default = "default_connection_error")]
    pub connection_error_message: String,
    /// Refresh the federated token this many seconds before it expires
    /// (default 60).
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u32,
    /// How long login endpoints wait for the session to settle (default 5000).
    #[serde(default = "default_login_wait_ms")]
    pub login_wait_ms: u64,
    /// Browser sessions unused for this long are signed out locally and
    /// forgotten (default 8 hours).
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Mark the session cookie `Secure` (default true). Turn off only for
    /// plain-HTTP development setups.
    #[serde(default = "default_session_cookie_secure")]
    pub session_cookie_secure: bool,
}

impl Config for ConsoleConfig {}

impl ConsoleConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            fallback: FallbackDefaults {
                role: self.fallback_role,
                full_name: self.fallback_full_name.clone(),
            },
            connection_error: self.connection_error_message.clone(),
        }
    }
}

fn default_console_port() -> u16 {
    3120
}

fn default_profiles_table() -> String {
    "profiles".to_owned()
}

fn default_employee_login_rpc() -> String {
    "verify_employee_credentials".to_owned()
}

fn default_fallback_role() -> Role {
    Role::Owner
}

fn default_fallback_full_name() -> String {
    DEFAULT_FULL_NAME.to_owned()
}

fn default_connection_error() -> String {
    DEFAULT_CONNECTION_ERROR.to_owned()
}

fn default_token_refresh_margin_secs() -> u32 {
    60
}

fn default_login_wait_ms() -> u64 {
    5000
}

fn default_session_idle_secs() -> u64 {
    8 * 60 * 60
}

fn default_session_cookie_secure() -> bool {
    true
}
