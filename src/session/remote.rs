//! Session provider that delegates authentication to an identity service.
//!
//! The service owns uid, email, display name and photo. Everything else is
//! kept locally as [`ProfileExtras`] under `profile_<uid>`, seeded the first
//! time an identity signs in and overlaid on every read.

use super::extras::{compose_profile, ProfileExtras};
use super::identity::{AuthGrant, Identity, IdentityProvider};
use super::SessionProvider;
use crate::error::GigResult;
use crate::forms::{validate_account, validate_login};
use crate::models::{ProfilePatch, UserProfile};
use crate::store::{
    profile_key, read_json, write_json, KeyValueStore, CURRENT_IDENTITY_KEY, TOKEN_KEY,
};
use chrono::Utc;

struct RemoteSession {
    token: String,
    identity: Identity,
    profile: UserProfile,
}

pub struct RemoteSessionProvider {
    identity: Box<dyn IdentityProvider>,
    store: Box<dyn KeyValueStore>,
    session: Option<RemoteSession>,
}

impl RemoteSessionProvider {
    /// Construct over an identity service, resuming the last signed-in identity if stored
    pub fn new(identity: Box<dyn IdentityProvider>, store: Box<dyn KeyValueStore>) -> Self {
        let mut provider = Self {
            identity,
            store,
            session: None,
        };
        provider.session = provider.restore();
        provider
    }

    fn restore(&self) -> Option<RemoteSession> {
        let token: String = read_json(self.store.as_ref(), TOKEN_KEY)?;
        let identity: Identity = read_json(self.store.as_ref(), CURRENT_IDENTITY_KEY)?;
        let extras = self.extras(&identity.uid).unwrap_or_default();
        let profile = compose_profile(&identity, &extras, Utc::now());
        Some(RemoteSession {
            token,
            identity,
            profile,
        })
    }

    fn extras(&self, uid: &str) -> Option<ProfileExtras> {
        read_json(self.store.as_ref(), &profile_key(uid))
    }

    fn save_extras(&self, uid: &str, extras: &ProfileExtras) -> GigResult<()> {
        write_json(self.store.as_ref(), &profile_key(uid), extras)
    }

    /// Persist the grant and compose the signed-in profile
    fn start(&mut self, grant: AuthGrant) -> GigResult<UserProfile> {
        let now = Utc::now();
        let uid = grant.identity.uid.clone();
        let extras = match self.extras(&uid) {
            Some(extras) => extras,
            None => {
                let extras = ProfileExtras::seeded(None, now);
                self.save_extras(&uid, &extras)?;
                extras
            }
        };

        write_json(self.store.as_ref(), TOKEN_KEY, &grant.token)?;
        write_json(self.store.as_ref(), CURRENT_IDENTITY_KEY, &grant.identity)?;

        let profile = compose_profile(&grant.identity, &extras, now);
        self.session = Some(RemoteSession {
            token: grant.token,
            identity: grant.identity,
            profile: profile.clone(),
        });
        Ok(profile)
    }
}

impl SessionProvider for RemoteSessionProvider {
    fn kind(&self) -> &'static str {
        "remote"
    }

    fn register(&mut self, name: &str, email: &str, password: &str) -> GigResult<UserProfile> {
        validate_account(name, email, password)?;
        let grant = self.identity.sign_up(name.trim(), email.trim(), password)?;
        // A new account always starts from fresh extras
        let extras = ProfileExtras::seeded(Some(name.trim().to_string()), Utc::now());
        self.save_extras(&grant.identity.uid, &extras)?;
        self.start(grant)
    }

    fn login(&mut self, email: &str, password: &str) -> GigResult<UserProfile> {
        validate_login(email, password)?;
        let grant = self.identity.sign_in(email.trim(), password)?;
        self.start(grant)
    }

    fn logout(&mut self) -> GigResult<()> {
        if self.session.is_none() {
            return Ok(());
        }
        // The in-memory session ends only once the stored keys are gone
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(CURRENT_IDENTITY_KEY)?;
        match self.session.take() {
            Some(session) => self.identity.sign_out(&session.token),
            None => Ok(()),
        }
    }

    fn update_user(&mut self, patch: &ProfilePatch) -> GigResult<Option<UserProfile>> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        let token = session.token.clone();
        let mut identity = session.identity.clone();

        // Name and photo belong to the identity service
        let name_changed = patch
            .name
            .as_deref()
            .is_some_and(|n| identity.display_name.as_deref() != Some(n));
        let photo_changed = patch
            .avatar_url
            .as_deref()
            .is_some_and(|p| identity.photo_url.as_deref() != Some(p));
        if name_changed || photo_changed {
            // Unchanged fields are resent as they are, never cleared
            let name = patch.name.as_deref().or(identity.display_name.as_deref());
            let photo = patch.avatar_url.as_deref().or(identity.photo_url.as_deref());
            identity = self.identity.update_identity(&token, name, photo)?;
            write_json(self.store.as_ref(), CURRENT_IDENTITY_KEY, &identity)?;
        }

        let now = Utc::now();
        let mut extras = self.extras(&identity.uid).unwrap_or_default();
        extras.merge_patch(patch, now);
        self.save_extras(&identity.uid, &extras)?;

        let profile = compose_profile(&identity, &extras, now);
        self.session = Some(RemoteSession {
            token,
            identity,
            profile: profile.clone(),
        });
        Ok(Some(profile))
    }

    fn current(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.profile)
    }
}
