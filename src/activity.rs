use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL record of session transitions and catalog changes.
///
/// Credentials never reach this log; only emails, ids and outcomes do.
pub struct ActivityLog {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl ActivityLog {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_start(&mut self, provider: &str) -> Result<()> {
        self.log("run_start", json!({ "provider": provider }))
    }

    pub fn register(&mut self, email: &str, ok: bool, error: Option<&str>) -> Result<()> {
        self.log(
            "register",
            json!({ "email": email, "ok": ok, "error": error }),
        )
    }

    pub fn login(&mut self, email: &str, ok: bool, error: Option<&str>) -> Result<()> {
        self.log("login", json!({ "email": email, "ok": ok, "error": error }))
    }

    pub fn logout(&mut self, email: Option<&str>) -> Result<()> {
        self.log("logout", json!({ "email": email }))
    }

    /// Log a profile edit by the names of the fields it touched
    pub fn profile_update(&mut self, email: &str, fields: &[String]) -> Result<()> {
        self.log(
            "profile_update",
            json!({ "email": email, "fields": fields }),
        )
    }

    pub fn job_posted(&mut self, job_id: u32, title: &str, posted_by: &str) -> Result<()> {
        self.log(
            "job_posted",
            json!({ "job_id": job_id, "title": title, "posted_by": posted_by }),
        )
    }

    pub fn job_removed(&mut self, job_id: u32, by: &str) -> Result<()> {
        self.log("job_removed", json!({ "job_id": job_id, "by": by }))
    }

    pub fn category_added(&mut self, id: u32, name: &str) -> Result<()> {
        self.log("category_added", json!({ "id": id, "name": name }))
    }

    pub fn category_removed(&mut self, id: u32, name: &str) -> Result<()> {
        self.log("category_removed", json!({ "id": id, "name": name }))
    }

    pub fn user_status(&mut self, user_id: u32, status: &str) -> Result<()> {
        self.log(
            "user_status",
            json!({ "user_id": user_id, "status": status }),
        )
    }

    pub fn user_removed(&mut self, user_id: u32) -> Result<()> {
        self.log("user_removed", json!({ "user_id": user_id }))
    }

    pub fn application(&mut self, job_id: u32, email: &str) -> Result<()> {
        self.log(
            "application",
            json!({ "job_id": job_id, "email": email }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_events(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_are_jsonl_with_envelope() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("activity").join("run-1.jsonl");
        let mut log = ActivityLog::new(&path, "run-1").unwrap();

        log.run_start("local").unwrap();
        log.login("maya@x.com", true, None).unwrap();
        log.job_posted(13, "Logo", "maya@x.com").unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["type"], "run_start");
        assert_eq!(events[1]["run_id"], "run-1");
        assert_eq!(events[1]["email"], "maya@x.com");
        assert!(events[1]["ts"].is_string());
        assert_eq!(events[2]["job_id"], 13);
    }

    #[test]
    fn test_appends_across_opens() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run.jsonl");
        {
            let mut log = ActivityLog::new(&path, "a").unwrap();
            log.logout(None).unwrap();
        }
        let mut log = ActivityLog::new(&path, "a").unwrap();
        log.register("x@y.com", false, Some("duplicate")).unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["ok"], false);
        assert_eq!(events[1]["error"], "duplicate");
    }
}
