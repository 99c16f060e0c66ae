//! Session provider backed by a local user directory.
//!
//! Login tries the directory first, then the configured demo accounts, then
//! (if enabled) accepts any plausible email as a job seeker.

use super::SessionProvider;
use crate::config::{AuthConfig, DemoAccount};
use crate::error::{GigError, GigResult};
use crate::forms::{is_plausible_email, validate_account, validate_login};
use crate::models::{name_from_email, ProfilePatch, Role, UserProfile};
use crate::store::{read_json, write_json, KeyValueStore, CURRENT_USER_KEY, USER_DIRECTORY_KEY};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A registered account. The password is kept only as a bcrypt hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub email: String,
    pub password_hash: String,
    pub profile: UserProfile,
}

/// Where the signed-in account came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOrigin {
    Directory,
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    origin: AccountOrigin,
    profile: UserProfile,
}

pub struct LocalSessionProvider {
    store: Box<dyn KeyValueStore>,
    auth: AuthConfig,
    session: Option<StoredSession>,
}

impl LocalSessionProvider {
    /// Construct over `store`, restoring a persisted session if one is readable
    pub fn new(store: Box<dyn KeyValueStore>, auth: AuthConfig) -> Self {
        let session = read_json::<StoredSession>(store.as_ref(), CURRENT_USER_KEY);
        Self {
            store,
            auth,
            session,
        }
    }

    pub fn origin(&self) -> Option<AccountOrigin> {
        self.session.as_ref().map(|s| s.origin)
    }

    fn directory(&self) -> Vec<DirectoryEntry> {
        read_json(self.store.as_ref(), USER_DIRECTORY_KEY).unwrap_or_default()
    }

    fn save_directory(&self, entries: &[DirectoryEntry]) -> GigResult<()> {
        write_json(self.store.as_ref(), USER_DIRECTORY_KEY, entries)
    }

    fn start(&mut self, origin: AccountOrigin, mut profile: UserProfile) -> GigResult<UserProfile> {
        profile.last_active = Utc::now();
        let session = StoredSession { origin, profile };
        write_json(self.store.as_ref(), CURRENT_USER_KEY, &session)?;
        let profile = session.profile.clone();
        self.session = Some(session);
        Ok(profile)
    }

    fn demo_profile(&self, email: &str, role: Role, name: Option<&str>) -> UserProfile {
        let email = email.trim().to_lowercase();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| name_from_email(&email));
        UserProfile::new(format!("demo-{}", email), email, name, role, Utc::now())
    }

    fn match_demo(&self, email: &str, password: &str) -> Option<&DemoAccount> {
        self.auth
            .demo_accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim()) && a.password == password)
    }
}

impl SessionProvider for LocalSessionProvider {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn register(&mut self, name: &str, email: &str, password: &str) -> GigResult<UserProfile> {
        validate_account(name, email, password)?;
        let email = email.trim();

        let mut entries = self.directory();
        if entries.iter().any(|e| e.email.eq_ignore_ascii_case(email)) {
            return Err(GigError::DuplicateEmail(email.to_string()));
        }

        let password_hash = bcrypt::hash(password, self.auth.hash_cost)
            .map_err(|e| GigError::Persistence(format!("password hashing failed: {}", e)))?;
        let profile = UserProfile::new(
            uuid::Uuid::new_v4().to_string(),
            email.to_string(),
            name.trim().to_string(),
            Role::JobSeeker,
            Utc::now(),
        );

        entries.push(DirectoryEntry {
            email: email.to_string(),
            password_hash,
            profile: profile.clone(),
        });
        self.save_directory(&entries)?;
        self.start(AccountOrigin::Directory, profile)
    }

    fn login(&mut self, email: &str, password: &str) -> GigResult<UserProfile> {
        validate_login(email, password)?;

        // A known address only ever authenticates against its own hash
        let known = self
            .directory()
            .into_iter()
            .find(|e| e.email.eq_ignore_ascii_case(email.trim()));
        if let Some(entry) = known {
            let ok = bcrypt::verify(password, &entry.password_hash).unwrap_or(false);
            if !ok {
                return Err(GigError::InvalidCredentials);
            }
            return self.start(AccountOrigin::Directory, entry.profile);
        }

        if let Some(account) = self.match_demo(email, password) {
            let profile = self.demo_profile(&account.email, account.role, account.name.as_deref());
            return self.start(AccountOrigin::Demo, profile);
        }

        if self.auth.allow_any_email
            && is_plausible_email(email)
            && password.chars().count() >= self.auth.min_password_len
        {
            let profile = self.demo_profile(email, Role::JobSeeker, None);
            return self.start(AccountOrigin::Demo, profile);
        }

        Err(GigError::InvalidCredentials)
    }

    fn logout(&mut self) -> GigResult<()> {
        self.session = None;
        self.store.remove(CURRENT_USER_KEY)
    }

    fn update_user(&mut self, patch: &ProfilePatch) -> GigResult<Option<UserProfile>> {
        let Some(mut session) = self.session.clone() else {
            return Ok(None);
        };

        patch.apply_to(&mut session.profile);
        session.profile.last_active = Utc::now();
        write_json(self.store.as_ref(), CURRENT_USER_KEY, &session)?;

        if session.origin == AccountOrigin::Directory {
            let mut entries = self.directory();
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| e.email.eq_ignore_ascii_case(&session.profile.email))
            {
                entry.profile = session.profile.clone();
                self.save_directory(&entries)?;
            }
        }

        let profile = session.profile.clone();
        self.session = Some(session);
        Ok(Some(profile))
    }

    fn current(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.profile)
    }
}
