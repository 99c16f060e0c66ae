use crate::forms::is_plausible_email;
use crate::models::Role;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Which session provider the shell is composed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local user directory plus demo credentials
    #[default]
    Local,
    /// Delegated identity service plus local profile extras
    Remote,
}

impl ProviderKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" | "delegated" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// A fixed demo login accepted when the local directory has no match
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

/// Configuration for authentication
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Accept any plausible email with a long enough password as a job seeker
    #[serde(default = "default_true")]
    pub allow_any_email: bool,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    /// bcrypt cost for stored password hashes
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
    #[serde(default = "default_demo_accounts")]
    pub demo_accounts: Vec<DemoAccount>,
}

fn default_true() -> bool {
    true
}

fn default_min_password_len() -> usize {
    4
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_demo_accounts() -> Vec<DemoAccount> {
    vec![
        DemoAccount {
            email: "admin@gmail.com".to_string(),
            password: "admin".to_string(),
            role: Role::Admin,
            name: Some("Admin User".to_string()),
        },
        DemoAccount {
            email: "test@gmail.com".to_string(),
            password: "test".to_string(),
            role: Role::JobProvider,
            name: Some("Test User".to_string()),
        },
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            allow_any_email: default_true(),
            min_password_len: default_min_password_len(),
            hash_cost: default_hash_cost(),
            demo_accounts: default_demo_accounts(),
        }
    }
}

/// Configuration for the delegated identity service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_register_path")]
    pub register_path: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_login_path() -> String {
    "/login".to_string()
}
fn default_register_path() -> String {
    "/register".to_string()
}
fn default_profile_path() -> String {
    "/profile".to_string()
}
fn default_timeout_ms() -> u64 {
    12_000
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            register_path: default_register_path(),
            profile_path: default_profile_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Optional replacements for the bundled fixture files
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FixturesConfig {
    #[serde(default)]
    pub jobs: Option<PathBuf>,
    #[serde(default)]
    pub categories: Option<PathBuf>,
    #[serde(default)]
    pub users: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Where persisted session state lives (default: .gigboard/data)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
}

/// One config file as written. Every key is optional so a layer overrides
/// only what it names.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigLayer {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub auth: Option<AuthLayer>,
    #[serde(default)]
    pub identity: Option<IdentityLayer>,
    #[serde(default)]
    pub fixtures: FixturesConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthLayer {
    pub provider: Option<ProviderKind>,
    pub allow_any_email: Option<bool>,
    pub min_password_len: Option<usize>,
    pub hash_cost: Option<u32>,
    pub demo_accounts: Option<Vec<DemoAccount>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IdentityLayer {
    pub base_url: Option<String>,
    pub login_path: Option<String>,
    pub register_path: Option<String>,
    pub profile_path: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ConfigLayer {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let layer: ConfigLayer = toml::from_str(&content)?;
        Ok(layer)
    }
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.gigboard/config.local.toml) > project (.gigboard/config.toml) > user (~/.gigboard/config.toml)
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".gigboard").join("config.toml");
            if user_config.exists() {
                config.merge(ConfigLayer::load(&user_config)?);
            }
        }

        let project_config = root.join(".gigboard").join("config.toml");
        if project_config.exists() {
            config.merge(ConfigLayer::load(&project_config)?);
        }

        // Should be gitignored
        let local_config = root.join(".gigboard").join("config.local.toml");
        if local_config.exists() {
            config.merge(ConfigLayer::load(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path over the built-in defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge(ConfigLayer::load(path)?);
        Ok(config)
    }

    /// Merge a layer into this config (the layer takes priority).
    /// Only keys the layer actually sets are overridden.
    pub fn merge(&mut self, other: ConfigLayer) {
        override_with(&mut self.data_dir, other.data_dir.map(Some));

        if let Some(auth) = other.auth {
            override_with(&mut self.auth.provider, auth.provider);
            override_with(&mut self.auth.allow_any_email, auth.allow_any_email);
            override_with(&mut self.auth.min_password_len, auth.min_password_len);
            override_with(&mut self.auth.hash_cost, auth.hash_cost);
            override_with(&mut self.auth.demo_accounts, auth.demo_accounts);
        }

        if let Some(identity) = other.identity {
            override_with(&mut self.identity.base_url, identity.base_url);
            override_with(&mut self.identity.login_path, identity.login_path);
            override_with(&mut self.identity.register_path, identity.register_path);
            override_with(&mut self.identity.profile_path, identity.profile_path);
            override_with(&mut self.identity.timeout_ms, identity.timeout_ms);
        }

        override_with(&mut self.fixtures.jobs, other.fixtures.jobs.map(Some));
        override_with(&mut self.fixtures.categories, other.fixtures.categories.map(Some));
        override_with(&mut self.fixtures.users, other.fixtures.users.map(Some));
    }

    /// Resolve the data directory against the project root
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(".gigboard").join("data"),
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.auth.min_password_len == 0 {
            errors.push(ValidationError {
                field: "auth.min_password_len".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        // bcrypt accepts costs 4..=31
        if !(4..=31).contains(&self.auth.hash_cost) {
            errors.push(ValidationError {
                field: "auth.hash_cost".to_string(),
                message: format!("Must be between 4 and 31, got {}", self.auth.hash_cost),
            });
        }

        let mut seen = HashSet::new();
        for (i, account) in self.auth.demo_accounts.iter().enumerate() {
            if !is_plausible_email(&account.email) {
                errors.push(ValidationError {
                    field: format!("auth.demo_accounts[{}].email", i),
                    message: format!("Invalid email '{}'", account.email),
                });
            }
            if account.password.is_empty() {
                errors.push(ValidationError {
                    field: format!("auth.demo_accounts[{}].password", i),
                    message: "Password must not be empty".to_string(),
                });
            }
            if !seen.insert(account.email.to_lowercase()) {
                errors.push(ValidationError {
                    field: format!("auth.demo_accounts[{}].email", i),
                    message: format!("Duplicate demo account '{}'", account.email),
                });
            }
        }

        if self.auth.provider == ProviderKind::Remote
            && !(self.identity.base_url.starts_with("http://")
                || self.identity.base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "identity.base_url".to_string(),
                message: format!(
                    "Must be an http(s) URL, got '{}'",
                    self.identity.base_url
                ),
            });
        }

        if self.identity.timeout_ms == 0 {
            errors.push(ValidationError {
                field: "identity.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.provider, ProviderKind::Local);
        assert_eq!(config.auth.demo_accounts.len(), 2);
        assert_eq!(config.identity.timeout_ms, 12_000);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
data_dir = "state"

[auth]
provider = "remote"
min_password_len = 6

[[auth.demo_accounts]]
email = "boss@example.test"
password = "bosspw"
role = "admin"

[identity]
base_url = "https://id.example.test"
timeout_ms = 5000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.provider, ProviderKind::Remote);
        assert_eq!(config.auth.min_password_len, 6);
        assert!(config.auth.allow_any_email);
        assert_eq!(config.auth.demo_accounts.len(), 1);
        assert_eq!(config.auth.demo_accounts[0].role, Role::Admin);
        assert_eq!(config.identity.login_path, "/login");
        assert_eq!(config.identity.timeout_ms, 5000);
        assert_eq!(config.data_dir(Path::new("/proj")), PathBuf::from("/proj/state"));
    }

    #[test]
    fn test_default_data_dir() {
        let config = Config::default();
        assert_eq!(
            config.data_dir(Path::new("/proj")),
            PathBuf::from("/proj/.gigboard/data")
        );
    }

    fn layer(toml: &str) -> ConfigLayer {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_merge_keeps_unset_paths() {
        let mut base = Config::default();
        base.data_dir = Some(PathBuf::from("base"));
        base.fixtures.jobs = Some(PathBuf::from("jobs.json"));

        base.merge(layer(
            "[auth]\nallow_any_email = false\n\n[fixtures]\nusers = \"users.json\"\n",
        ));

        assert_eq!(base.data_dir, Some(PathBuf::from("base")));
        assert_eq!(base.fixtures.jobs, Some(PathBuf::from("jobs.json")));
        assert_eq!(base.fixtures.users, Some(PathBuf::from("users.json")));
        assert!(!base.auth.allow_any_email);
        assert_eq!(base.auth.demo_accounts.len(), 2);
    }

    #[test]
    fn test_merge_sections_key_by_key() {
        let mut config = Config::default();
        config.merge(layer(
            "[auth]\nprovider = \"remote\"\nmin_password_len = 8\n\n[identity]\nbase_url = \"https://id.example.test\"\n",
        ));
        config.merge(layer("[auth]\nhash_cost = 6\n\n[identity]\ntimeout_ms = 500\n"));

        assert_eq!(config.auth.provider, ProviderKind::Remote);
        assert_eq!(config.auth.min_password_len, 8);
        assert_eq!(config.auth.hash_cost, 6);
        assert_eq!(config.identity.base_url, "https://id.example.test");
        assert_eq!(config.identity.timeout_ms, 500);
        assert_eq!(config.identity.login_path, "/login");
    }

    #[test]
    fn test_load_layers_keep_lower_provider() {
        let dir = TempDir::new().unwrap();
        let gig = dir.path().join(".gigboard");
        std::fs::create_dir_all(&gig).unwrap();
        std::fs::write(
            gig.join("config.toml"),
            "[auth]\nprovider = \"remote\"\n\n[identity]\nbase_url = \"https://id.example.test\"\n",
        )
        .unwrap();
        std::fs::write(gig.join("config.local.toml"), "data_dir = \"state\"\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("state")));
        assert_eq!(config.auth.provider, ProviderKind::Remote);
        assert_eq!(config.identity.base_url, "https://id.example.test");
    }

    #[test]
    fn test_load_from_starts_at_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[auth]\nallow_any_email = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.auth.allow_any_email);
        assert_eq!(config.auth.min_password_len, 4);
        assert_eq!(config.auth.demo_accounts.len(), 2);
    }

    #[test]
    fn test_load_layers_project_and_local() {
        let dir = TempDir::new().unwrap();
        let gig = dir.path().join(".gigboard");
        std::fs::create_dir_all(&gig).unwrap();
        std::fs::write(gig.join("config.toml"), "data_dir = \"project-data\"\n").unwrap();
        std::fs::write(
            gig.join("config.local.toml"),
            "[auth]\nprovider = \"remote\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("project-data")));
        assert_eq!(config.auth.provider, ProviderKind::Remote);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.auth.min_password_len = 0;
        config.auth.hash_cost = 2;
        config.auth.provider = ProviderKind::Remote;
        config.identity.base_url = "ftp://nope".to_string();
        config.auth.demo_accounts.push(DemoAccount {
            email: "ADMIN@gmail.com".to_string(),
            password: String::new(),
            role: Role::Admin,
            name: None,
        });

        let errors = config.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "auth.min_password_len",
                "auth.hash_cost",
                "auth.demo_accounts[2].password",
                "auth.demo_accounts[2].email",
                "identity.base_url",
            ]
        );
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(ProviderKind::from_str("Remote"), Some(ProviderKind::Remote));
        assert_eq!(ProviderKind::from_str("delegated"), Some(ProviderKind::Remote));
        assert_eq!(ProviderKind::from_str("local"), Some(ProviderKind::Local));
        assert!(ProviderKind::from_str("firebase").is_none());
    }
}
