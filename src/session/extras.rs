//! Locally persisted profile fields for delegated identities.
//!
//! The identity service only knows uid, email, display name and photo. The
//! rest of the profile lives here, keyed by uid.

use super::identity::Identity;
use crate::models::patch::{merge_preferences, merge_security, merge_stats};
use crate::models::{name_from_email, Preferences, ProfilePatch, Role, Security, Stats, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileExtras {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<Role>,
    pub joined_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub stats: Option<Stats>,
    pub security: Option<Security>,
    pub preferences: Option<Preferences>,
}

impl ProfileExtras {
    /// Defaults written the first time an identity is seen
    pub fn seeded(name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            name,
            joined_at: Some(now),
            stats: Some(Stats::default()),
            preferences: Some(Preferences::default()),
            ..Default::default()
        }
    }

    /// Same merge rules as [`ProfilePatch::apply_to`], over optional fields
    pub fn merge_patch(&mut self, patch: &ProfilePatch, now: DateTime<Utc>) {
        if let Some(v) = &patch.name {
            self.name = Some(v.clone());
        }
        if let Some(v) = &patch.phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = &patch.location {
            self.location = Some(v.clone());
        }
        if let Some(v) = &patch.bio {
            self.bio = Some(v.clone());
        }
        if let Some(v) = &patch.avatar_url {
            self.avatar_url = Some(v.clone());
        }
        if let Some(role) = patch.role {
            self.role = Some(role);
        }
        if let Some(p) = &patch.stats {
            merge_stats(self.stats.get_or_insert_with(Default::default), p);
        }
        if let Some(p) = &patch.security {
            merge_security(self.security.get_or_insert_with(Default::default), p);
        }
        if let Some(p) = &patch.preferences {
            merge_preferences(self.preferences.get_or_insert_with(Default::default), p);
        }
        self.last_active = Some(now);
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Overlay provider-asserted fields on local extras.
///
/// Name and photo come from the provider when it has them; email always
/// does. Everything else comes from the extras or defaults.
pub fn compose_profile(identity: &Identity, extras: &ProfileExtras, now: DateTime<Utc>) -> UserProfile {
    let name = non_empty(&identity.display_name)
        .or_else(|| non_empty(&extras.name))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if identity.email.is_empty() {
                "User".to_string()
            } else {
                name_from_email(&identity.email)
            }
        });

    let avatar_url = non_empty(&identity.photo_url)
        .or_else(|| non_empty(&extras.avatar_url))
        .unwrap_or_default()
        .to_string();

    UserProfile {
        id: identity.uid.clone(),
        email: identity.email.clone(),
        name,
        role: identity.role.or(extras.role).unwrap_or_default(),
        phone: extras.phone.clone().unwrap_or_default(),
        location: extras.location.clone().unwrap_or_default(),
        bio: extras.bio.clone().unwrap_or_default(),
        avatar_url,
        joined_at: extras.joined_at.or(identity.created_at).unwrap_or(now),
        last_active: extras.last_active.unwrap_or(now),
        stats: extras.stats.clone().unwrap_or_default(),
        security: extras.security.clone().unwrap_or_default(),
        preferences: extras.preferences.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PreferencesPatch, Theme};

    fn identity() -> Identity {
        Identity {
            uid: "uid-1".to_string(),
            email: "maya@x.com".to_string(),
            display_name: None,
            photo_url: None,
            created_at: None,
            role: None,
        }
    }

    #[test]
    fn test_provider_fields_take_precedence() {
        let mut id = identity();
        id.display_name = Some("Maya R".to_string());
        id.photo_url = Some("https://img/p.png".to_string());
        let extras = ProfileExtras {
            name: Some("Local Maya".to_string()),
            avatar_url: Some("local.png".to_string()),
            bio: Some("Illustrator".to_string()),
            ..Default::default()
        };
        let p = compose_profile(&id, &extras, Utc::now());
        assert_eq!(p.name, "Maya R");
        assert_eq!(p.avatar_url, "https://img/p.png");
        assert_eq!(p.bio, "Illustrator");
        assert_eq!(p.email, "maya@x.com");
        assert_eq!(p.id, "uid-1");
    }

    #[test]
    fn test_name_fallbacks() {
        let extras = ProfileExtras {
            name: Some("Local Maya".to_string()),
            ..Default::default()
        };
        assert_eq!(compose_profile(&identity(), &extras, Utc::now()).name, "Local Maya");
        assert_eq!(
            compose_profile(&identity(), &ProfileExtras::default(), Utc::now()).name,
            "Maya"
        );

        let mut id = identity();
        id.email = String::new();
        assert_eq!(compose_profile(&id, &ProfileExtras::default(), Utc::now()).name, "User");
    }

    #[test]
    fn test_joined_at_fallbacks() {
        let now = Utc::now();
        let created = now - chrono::Duration::days(30);
        let mut id = identity();
        id.created_at = Some(created);
        assert_eq!(compose_profile(&id, &ProfileExtras::default(), now).joined_at, created);
        assert_eq!(compose_profile(&identity(), &ProfileExtras::default(), now).joined_at, now);
    }

    #[test]
    fn test_merge_patch_nested() {
        let now = Utc::now();
        let mut extras = ProfileExtras::seeded(None, now);
        extras.preferences.as_mut().unwrap().theme = Theme::Light;
        let patch = ProfilePatch {
            preferences: Some(PreferencesPatch {
                language: Some("bn".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        extras.merge_patch(&patch, now);
        let prefs = extras.preferences.unwrap();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, "bn");
        assert_eq!(extras.last_active, Some(now));
    }

    #[test]
    fn test_merge_patch_creates_missing_sub_objects() {
        let mut extras = ProfileExtras::default();
        let patch = ProfilePatch::from_assignments(&["security.lastLoginIp=1.2.3.4"]).unwrap();
        extras.merge_patch(&patch, Utc::now());
        let security = extras.security.unwrap();
        assert_eq!(security.last_login_ip, "1.2.3.4");
        assert!(!security.two_factor_enabled);
    }
}
