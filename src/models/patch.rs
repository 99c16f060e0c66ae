//! Profile patches and their merge rules.
//!
//! Scalars overwrite. The nested `stats`, `security` and `preferences`
//! objects merge field by field, so a patch touching only
//! `preferences.language` leaves the theme alone. Patches carry no `id` or
//! `email`, so neither can change through this path.

use super::user::{Preferences, Role, Security, Stats, Theme, UserProfile};
use crate::error::{GigError, GigResult};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatsPatch {
    pub posts: Option<u32>,
    pub projects: Option<u32>,
    pub followers: Option<u32>,
    pub following: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityPatch {
    pub two_factor_enabled: Option<bool>,
    pub last_login_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub language: Option<String>,
}

/// Partial update of a [`UserProfile`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<Role>,
    pub stats: Option<StatsPatch>,
    pub security: Option<SecurityPatch>,
    pub preferences: Option<PreferencesPatch>,
}

pub fn merge_stats(stats: &mut Stats, patch: &StatsPatch) {
    if let Some(v) = patch.posts {
        stats.posts = v;
    }
    if let Some(v) = patch.projects {
        stats.projects = v;
    }
    if let Some(v) = patch.followers {
        stats.followers = v;
    }
    if let Some(v) = patch.following {
        stats.following = v;
    }
}

pub fn merge_security(security: &mut Security, patch: &SecurityPatch) {
    if let Some(v) = patch.two_factor_enabled {
        security.two_factor_enabled = v;
    }
    if let Some(v) = &patch.last_login_ip {
        security.last_login_ip = v.clone();
    }
}

pub fn merge_preferences(prefs: &mut Preferences, patch: &PreferencesPatch) {
    if let Some(v) = patch.theme {
        prefs.theme = v;
    }
    if let Some(v) = &patch.language {
        prefs.language = v.clone();
    }
}

fn overwrite(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl ProfilePatch {
    /// Merge into a profile. Does not touch `last_active`; callers refresh it.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        overwrite(&mut profile.name, &self.name);
        overwrite(&mut profile.phone, &self.phone);
        overwrite(&mut profile.location, &self.location);
        overwrite(&mut profile.bio, &self.bio);
        overwrite(&mut profile.avatar_url, &self.avatar_url);
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(stats) = &self.stats {
            merge_stats(&mut profile.stats, stats);
        }
        if let Some(security) = &self.security {
            merge_security(&mut profile.security, security);
        }
        if let Some(prefs) = &self.preferences {
            merge_preferences(&mut profile.preferences, prefs);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build a patch from `key=value` pairs such as `preferences.language=bn`.
    ///
    /// Every bad pair is reported, not just the first.
    pub fn from_assignments<S: AsRef<str>>(pairs: &[S]) -> GigResult<Self> {
        let mut patch = Self::default();
        let mut errors = Vec::new();

        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                errors.push(format!("Expected key=value, got '{}'", pair));
                continue;
            };
            if let Err(e) = patch.assign(key.trim(), value.trim()) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(GigError::Validation(errors))
        }
    }

    fn assign(&mut self, key: &str, value: &str) -> Result<(), String> {
        let count = || {
            value
                .parse::<u32>()
                .map_err(|_| format!("{} must be a non-negative integer", key))
        };

        match key {
            "name" => self.name = Some(value.to_string()),
            "phone" => self.phone = Some(value.to_string()),
            "location" => self.location = Some(value.to_string()),
            "bio" => self.bio = Some(value.to_string()),
            "avatarUrl" | "avatar_url" | "avatar" => self.avatar_url = Some(value.to_string()),
            "role" => {
                self.role =
                    Some(Role::from_str(value).ok_or_else(|| format!("Unknown role '{}'", value))?)
            }
            "stats.posts" => self.stats.get_or_insert_with(Default::default).posts = Some(count()?),
            "stats.projects" => {
                self.stats.get_or_insert_with(Default::default).projects = Some(count()?)
            }
            "stats.followers" => {
                self.stats.get_or_insert_with(Default::default).followers = Some(count()?)
            }
            "stats.following" => {
                self.stats.get_or_insert_with(Default::default).following = Some(count()?)
            }
            "security.twoFactorEnabled" | "security.two_factor_enabled" => {
                let flag = value
                    .parse::<bool>()
                    .map_err(|_| format!("{} must be true or false", key))?;
                self.security
                    .get_or_insert_with(Default::default)
                    .two_factor_enabled = Some(flag);
            }
            "security.lastLoginIp" | "security.last_login_ip" => {
                self.security.get_or_insert_with(Default::default).last_login_ip =
                    Some(value.to_string())
            }
            "preferences.theme" => {
                let theme =
                    Theme::from_str(value).ok_or_else(|| format!("Unknown theme '{}'", value))?;
                self.preferences.get_or_insert_with(Default::default).theme = Some(theme);
            }
            "preferences.language" => {
                self.preferences.get_or_insert_with(Default::default).language =
                    Some(value.to_string())
            }
            "email" | "id" => return Err(format!("{} cannot be changed", key)),
            _ => return Err(format!("Unknown profile field '{}'", key)),
        }
        Ok(())
    }
}
