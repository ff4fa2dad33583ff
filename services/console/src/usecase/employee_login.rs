use std::sync::Arc;

use tracing::{info, warn};

use garage_domain::profile::ShadowRecord;
use garage_session::SessionState;

use crate::domain::repository::{EmployeeDirectory, SessionPort};
use crate::domain::types::Credentials;
use crate::error::ConsoleError;

#[derive(Debug)]
pub struct EmployeeLoginOutput {
    pub record: ShadowRecord,
    pub state: SessionState,
}

/// Verifies staff credentials against the directory, then adopts the record
/// as the shadow session.
pub struct EmployeeLoginUseCase<D: EmployeeDirectory, A: SessionPort> {
    pub directory: D,
    pub session: Arc<A>,
}

impl<D: EmployeeDirectory, A: SessionPort> EmployeeLoginUseCase<D, A> {
    pub async fn execute(&self, input: Credentials) -> Result<EmployeeLoginOutput, ConsoleError> {
        let email = input.normalized_email().ok_or(ConsoleError::InvalidCredentials)?;

        let record = match self.directory.verify_credentials(&email, &input.password).await? {
            Some(record) => record,
            None => {
                warn!(email = %email, "employee credentials rejected");
                return Err(ConsoleError::InvalidCredentials);
            }
        };

        self.session.adopt_shadow_session(record.clone())?;
        info!(account_id = %record.id, role = %record.role, "employee signed in");

        Ok(EmployeeLoginOutput {
            record,
            state: self.session.snapshot(),
        })
    }
}
