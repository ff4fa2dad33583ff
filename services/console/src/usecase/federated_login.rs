use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use garage_domain::id::FederatedUserId;
use garage_session::SessionState;

use crate::domain::repository::{PasswordSignIn, SessionPort};
use crate::domain::types::Credentials;
use crate::error::ConsoleError;

#[derive(Debug)]
pub struct FederatedLoginOutput {
    pub user_id: FederatedUserId,
    pub state: SessionState,
}

/// Signs in through the identity provider and waits (bounded) for the
/// reconciler to resolve the new user's profile.
pub struct FederatedLoginUseCase<G: PasswordSignIn, A: SessionPort> {
    pub provider: Arc<G>,
    pub session: Arc<A>,
    pub settle_timeout: Duration,
}

impl<G: PasswordSignIn, A: SessionPort> FederatedLoginUseCase<G, A> {
    pub async fn execute(&self, input: Credentials) -> Result<FederatedLoginOutput, ConsoleError> {
        let email = input.normalized_email().ok_or(ConsoleError::InvalidCredentials)?;

        let session = self.provider.sign_in_with_password(&email, &input.password).await?;
        let user_id = session.user.id;

        let state = match tokio::time::timeout(self.settle_timeout, self.session.profile_resolved_for(&user_id)).await {
            Ok(state) => state,
            Err(_) => {
                warn!(user_id = %user_id, "profile not resolved in time; returning pending session");
                self.session.snapshot()
            }
        };

        if let Some(profile) = state.profile.as_ref().filter(|p| p.belongs_to(&user_id)) {
            if !profile.role.is_federated_eligible() {
                warn!(user_id = %user_id, role = %profile.role, "federated user holds a shadow-only role");
            }
        }

        Ok(FederatedLoginOutput { user_id, state })
    }
}
