//! Session and profile management.
//!
//! A session is either anonymous or authenticated with a role and profile.
//! Two providers implement the same [`SessionProvider`] surface; one is
//! picked at startup from `auth.provider`.

pub mod extras;
pub mod identity;
pub mod local;
pub mod remote;

use crate::config::{Config, ProviderKind};
use crate::error::GigResult;
use crate::models::{ProfilePatch, Role, UserProfile};
use crate::store::KeyValueStore;

pub use extras::{compose_profile, ProfileExtras};
pub use identity::{AuthGrant, HttpIdentityProvider, Identity, IdentityProvider};
pub use local::LocalSessionProvider;
pub use remote::RemoteSessionProvider;

/// Who is using the application right now
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState<'a> {
    Anonymous,
    Authenticated {
        role: Role,
        profile: &'a UserProfile,
    },
}

impl SessionState<'_> {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated { role, .. } => Some(*role),
        }
    }
}

/// Register, sign in, sign out and edit the current profile.
///
/// Every mutation takes `&mut self`, so one operation runs to completion
/// before the next can start.
pub trait SessionProvider {
    /// Short name for logs and `/whoami`
    fn kind(&self) -> &'static str;

    fn register(&mut self, name: &str, email: &str, password: &str) -> GigResult<UserProfile>;

    fn login(&mut self, email: &str, password: &str) -> GigResult<UserProfile>;

    /// Clear the session. Calling it while anonymous is fine.
    fn logout(&mut self) -> GigResult<()>;

    /// Merge `patch` into the current profile. `Ok(None)` when anonymous.
    fn update_user(&mut self, patch: &ProfilePatch) -> GigResult<Option<UserProfile>>;

    fn current(&self) -> Option<&UserProfile>;

    fn state(&self) -> SessionState<'_> {
        match self.current() {
            Some(profile) => SessionState::Authenticated {
                role: profile.role,
                profile,
            },
            None => SessionState::Anonymous,
        }
    }
}

/// Compose the provider named in the configuration over `store`.
/// With `debug` set, identity service transport failures are printed to stderr.
pub fn build_provider(
    config: &Config,
    store: Box<dyn KeyValueStore>,
    debug: bool,
) -> Box<dyn SessionProvider> {
    match config.auth.provider {
        ProviderKind::Local => Box::new(LocalSessionProvider::new(store, config.auth.clone())),
        ProviderKind::Remote => Box::new(RemoteSessionProvider::new(
            Box::new(HttpIdentityProvider::new(&config.identity).with_debug(debug)),
            store,
        )),
    }
}
