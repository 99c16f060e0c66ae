//! Accounts, roles and the profile view model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    JobProvider,
    #[default]
    JobSeeker,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "job_provider" | "job-provider" | "provider" => Some(Self::JobProvider),
            "job_seeker" | "job-seeker" | "seeker" => Some(Self::JobSeeker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::JobProvider => "job_provider",
            Self::JobSeeker => "job_seeker",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Self::Admin
    }

    /// Job seekers browse and apply; everyone else may post
    pub fn can_post_jobs(&self) -> bool {
        *self != Self::JobSeeker
    }

    /// Admins cannot apply for jobs
    pub fn can_apply(&self) -> bool {
        *self != Self::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub posts: u32,
    pub projects: u32,
    pub followers: u32,
    pub following: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Security {
    pub two_factor_enabled: bool,
    pub last_login_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
        }
    }
}

/// The profile shown for the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    pub joined_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub preferences: Preferences,
}

impl UserProfile {
    /// Fresh profile with defaulted sub-objects and both timestamps at `now`
    pub fn new(id: String, email: String, name: String, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            name,
            role,
            phone: String::new(),
            location: String::new(),
            bio: String::new(),
            avatar_url: String::new(),
            joined_at: now,
            last_active: now,
            stats: Stats::default(),
            security: Security::default(),
            preferences: Preferences::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Active => Self::Blocked,
            Self::Blocked => Self::Active,
        }
    }
}

/// A row of the admin user list fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    pub join_date: NaiveDate,
}

/// Display name derived from an email: local-part with the first letter upper-cased
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "User".to_string(),
    }
}
