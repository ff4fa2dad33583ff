//! Hybrid identity and session reconciliation.
//!
//! Unifies a federated provider session (owners, superadmins) and a
//! locally-issued shadow session (managers, operators, auditors) into one
//! role-bearing [`Principal`](garage_domain::principal::Principal).
//!
//! [`SessionFacade`](facade::SessionFacade) is the only surface the rest of the
//! console should depend on.

pub mod cancel;
pub mod error;
pub mod event;
pub mod facade;
pub mod port;
pub mod reconciler;
pub mod resolver;
pub mod settings;
pub mod shadow;
pub mod state;

pub use error::{ProfileLookupError, SessionError};
pub use event::{AuthChangeEvent, AuthEventBus, AuthEventKind, AuthSubscription, ProviderSession, ProviderUser};
pub use facade::SessionFacade;
pub use port::{IdentityProvider, ProfileStore, ShadowStore};
pub use settings::SessionSettings;
pub use state::SessionState;
