use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::ConsoleConfig;
use crate::infra::gotrue::GoTrueProvider;
use crate::infra::rest::RestEmployeeDirectory;
use crate::registry::{ClientSession, ConsoleSession, SessionBackend, SessionRegistry};
use crate::usecase::employee_login::EmployeeLoginUseCase;
use crate::usecase::federated_login::FederatedLoginUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub directory: RestEmployeeDirectory,
    pub login_wait: Duration,
    pub cookie_secure: bool,
}

impl AppState {
    /// Wire the backend adapters. Client sessions are mounted lazily on
    /// first sign-in.
    pub fn from_config(config: &ConsoleConfig, client: Client) -> Self {
        let directory = RestEmployeeDirectory::new(
            client.clone(),
            &config.backend_url,
            config.backend_anon_key.clone(),
            config.employee_login_rpc.clone(),
        );
        Self {
            sessions: Arc::new(SessionRegistry::new(SessionBackend::from_config(config, client))),
            directory,
            login_wait: Duration::from_millis(config.login_wait_ms),
            cookie_secure: config.session_cookie_secure,
        }
    }

    pub fn employee_login(&self, client: &ClientSession) -> EmployeeLoginUseCase<RestEmployeeDirectory, ConsoleSession> {
        EmployeeLoginUseCase {
            directory: self.directory.clone(),
            session: Arc::clone(&client.session),
        }
    }

    pub fn federated_login(&self, client: &ClientSession) -> FederatedLoginUseCase<GoTrueProvider, ConsoleSession> {
        FederatedLoginUseCase {
            provider: Arc::clone(&client.provider),
            session: Arc::clone(&client.session),
            settle_timeout: self.login_wait,
        }
    }
}
