//! Bundled job, category and user data.
//!
//! The JSON files under `data/` are compiled in. Any of them can be replaced
//! by a file named in `[fixtures]`.

use crate::catalog::Catalog;
use crate::config::FixturesConfig;
use crate::models::{Category, DirectoryUser, JobPosting};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

const JOBS_JSON: &str = include_str!("../data/jobs.json");
const CATEGORIES_JSON: &str = include_str!("../data/categories.json");
const USERS_JSON: &str = include_str!("../data/users.json");

fn load<T: DeserializeOwned>(bundled: &str, name: &str, override_path: Option<&Path>) -> Result<Vec<T>> {
    match override_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {} fixture: {}", name, path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {} fixture: {}", name, path.display()))
        }
        None => serde_json::from_str(bundled)
            .with_context(|| format!("Bundled {} fixture is malformed", name)),
    }
}

pub fn load_jobs(config: &FixturesConfig) -> Result<Vec<JobPosting>> {
    load(JOBS_JSON, "jobs", config.jobs.as_deref())
}

pub fn load_categories(config: &FixturesConfig) -> Result<Vec<Category>> {
    load(CATEGORIES_JSON, "categories", config.categories.as_deref())
}

pub fn load_users(config: &FixturesConfig) -> Result<Vec<DirectoryUser>> {
    load(USERS_JSON, "users", config.users.as_deref())
}

/// Build a catalog from the bundled data plus any configured overrides
pub fn load_catalog(config: &FixturesConfig) -> Result<Catalog> {
    Ok(Catalog::new(
        load_jobs(config)?,
        load_categories(config)?,
        load_users(config)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_fixtures_parse() {
        let catalog = load_catalog(&FixturesConfig::default()).unwrap();
        assert_eq!(catalog.jobs().len(), 12);
        assert_eq!(catalog.categories().len(), 6);
        assert_eq!(catalog.users().len(), 6);
    }

    #[test]
    fn test_bundled_jobs_are_consistent() {
        let catalog = load_catalog(&FixturesConfig::default()).unwrap();
        let ids: HashSet<u32> = catalog.jobs().iter().map(|j| j.id).collect();
        assert_eq!(ids.len(), catalog.jobs().len());
        for job in catalog.jobs() {
            assert!(
                catalog.categories().iter().any(|c| c.name == job.category),
                "job {} has unknown category {}",
                job.id,
                job.category
            );
        }
    }

    #[test]
    fn test_override_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("categories.json");
        std::fs::write(&path, r#"[{"id":9,"name":"Music","icon":"M","description":"Audio"}]"#).unwrap();

        let config = FixturesConfig {
            categories: Some(path),
            ..Default::default()
        };
        let categories = load_categories(&config).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Music");
        assert_eq!(load_jobs(&config).unwrap().len(), 12);
    }

    #[test]
    fn test_override_errors_name_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.json");
        std::fs::write(&path, "not json").unwrap();

        let config = FixturesConfig {
            jobs: Some(path),
            ..Default::default()
        };
        let err = load_jobs(&config).unwrap_err();
        assert!(format!("{}", err).contains("jobs.json"));

        let missing = FixturesConfig {
            users: Some(tmp.path().join("nope.json")),
            ..Default::default()
        };
        assert!(load_users(&missing).is_err());
    }
}
