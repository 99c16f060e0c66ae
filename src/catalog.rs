//! Working copies of the job, category and user fixtures.
//!
//! Mutations (posting a job, removing a category, blocking a user) change
//! only the in-memory copy. Role gates mirror what each page of the web app
//! allowed.

use crate::error::{GigError, GigResult};
use crate::filter::{filter_jobs, filter_users, FilterCriteria};
use crate::forms::{ApplicationForm, CategoryForm, JobForm};
use crate::models::{Category, DirectoryUser, JobPosting, Role, UserProfile, UserStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const FEATURED_LIMIT: usize = 6;
pub const RELATED_LIMIT: usize = 3;
pub const RECENT_LIMIT: usize = 5;

/// Admin overview counts and the head of each list
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_jobs: usize,
    pub total_users: usize,
    pub total_categories: usize,
    pub blocked_users: usize,
    pub recent_jobs: Vec<JobPosting>,
    pub recent_users: Vec<DirectoryUser>,
}

/// Acknowledgement of a submitted application. Nothing is sent anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationReceipt {
    pub job_id: u32,
    pub job_title: String,
    pub applicant: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    jobs: Vec<JobPosting>,
    categories: Vec<Category>,
    users: Vec<DirectoryUser>,
}

fn require_admin(role: Option<Role>, action: &str) -> GigResult<()> {
    match role {
        Some(r) if r.is_admin() => Ok(()),
        _ => Err(GigError::Forbidden(format!("only admins can {}", action))),
    }
}

impl Catalog {
    pub fn new(jobs: Vec<JobPosting>, categories: Vec<Category>, users: Vec<DirectoryUser>) -> Self {
        Self {
            jobs,
            categories,
            users,
        }
    }

    pub fn jobs(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn users(&self) -> &[DirectoryUser] {
        &self.users
    }

    pub fn job(&self, id: u32) -> GigResult<&JobPosting> {
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| GigError::NotFound(format!("job {}", id)))
    }

    /// Home page listing: the first few jobs in fixture order
    pub fn featured(&self) -> &[JobPosting] {
        &self.jobs[..self.jobs.len().min(FEATURED_LIMIT)]
    }

    /// Other jobs in the same category, excluding `job` itself
    pub fn related_jobs(&self, job: &JobPosting) -> Vec<&JobPosting> {
        self.jobs
            .iter()
            .filter(|j| j.category == job.category && j.id != job.id)
            .take(RELATED_LIMIT)
            .collect()
    }

    pub fn search(&self, criteria: &FilterCriteria) -> Vec<&JobPosting> {
        filter_jobs(&self.jobs, criteria)
    }

    /// Jobs whose `postedBy` is the given email, compared case-insensitively
    pub fn jobs_posted_by(&self, email: &str) -> Vec<&JobPosting> {
        self.jobs
            .iter()
            .filter(|j| j.posted_by.eq_ignore_ascii_case(email.trim()))
            .collect()
    }

    /// Post a job as `poster`. Job seekers are refused.
    pub fn add_job(&mut self, form: &JobForm, poster: &UserProfile) -> GigResult<&JobPosting> {
        if !poster.role.can_post_jobs() {
            return Err(GigError::Forbidden(format!(
                "{} accounts cannot post jobs",
                poster.role
            )));
        }
        form.validate(&self.categories)?;

        let id = self.jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        self.jobs.push(JobPosting {
            id,
            title: form.title.trim().to_string(),
            category: form.category.clone(),
            budget: form.budget.trim().to_string(),
            delivery_time: form.delivery_time.trim().to_string(),
            description: form.description.trim().to_string(),
            posted_by: poster.email.clone(),
            posted_date: Utc::now().date_naive(),
        });
        self.job(id)
    }

    /// Remove a job. Admins may remove any job, providers only their own.
    pub fn delete_job(&mut self, id: u32, actor: &UserProfile) -> GigResult<JobPosting> {
        let pos = self
            .jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| GigError::NotFound(format!("job {}", id)))?;
        let own = self.jobs[pos].posted_by.eq_ignore_ascii_case(&actor.email);
        if !actor.role.is_admin() && !(own && actor.role.can_post_jobs()) {
            return Err(GigError::Forbidden(
                "only admins or the poster can remove a job".to_string(),
            ));
        }
        Ok(self.jobs.remove(pos))
    }

    pub fn add_category(&mut self, form: &CategoryForm, role: Option<Role>) -> GigResult<&Category> {
        require_admin(role, "manage categories")?;
        form.validate(&self.categories)?;

        let id = self.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        self.categories.push(Category {
            id,
            name: form.name.trim().to_string(),
            icon: form.icon.trim().to_string(),
            description: form.description.trim().to_string(),
        });
        self.categories
            .last()
            .ok_or_else(|| GigError::NotFound(format!("category {}", id)))
    }

    /// Remove a category by id. Jobs filed under it are left as they are.
    pub fn remove_category(&mut self, id: u32, role: Option<Role>) -> GigResult<Category> {
        require_admin(role, "manage categories")?;
        let pos = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| GigError::NotFound(format!("category {}", id)))?;
        Ok(self.categories.remove(pos))
    }

    pub fn filter_users(&self, query: &str, role: Option<Role>) -> Vec<&DirectoryUser> {
        filter_users(&self.users, query, role)
    }

    pub fn delete_user(&mut self, id: u32, role: Option<Role>) -> GigResult<DirectoryUser> {
        require_admin(role, "manage users")?;
        let pos = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| GigError::NotFound(format!("user {}", id)))?;
        Ok(self.users.remove(pos))
    }

    /// Flip a user between active and blocked, returning the new status
    pub fn toggle_user_status(&mut self, id: u32, role: Option<Role>) -> GigResult<UserStatus> {
        require_admin(role, "manage users")?;
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| GigError::NotFound(format!("user {}", id)))?;
        user.status = user.status.toggled();
        Ok(user.status)
    }

    pub fn dashboard(&self, role: Option<Role>) -> GigResult<Dashboard> {
        require_admin(role, "view the dashboard")?;
        Ok(Dashboard {
            total_jobs: self.jobs.len(),
            total_users: self.users.len(),
            total_categories: self.categories.len(),
            blocked_users: self
                .users
                .iter()
                .filter(|u| u.status == UserStatus::Blocked)
                .count(),
            recent_jobs: self.jobs.iter().take(RECENT_LIMIT).cloned().collect(),
            recent_users: self.users.iter().take(RECENT_LIMIT).cloned().collect(),
        })
    }

    /// Submit an application for a job. Admins cannot apply.
    pub fn apply(
        &self,
        job_id: u32,
        role: Option<Role>,
        form: &ApplicationForm,
    ) -> GigResult<ApplicationReceipt> {
        let job = self.job(job_id)?;
        if let Some(role) = role {
            if !role.can_apply() {
                return Err(GigError::Forbidden(format!(
                    "{} accounts cannot apply for jobs",
                    role
                )));
            }
        }
        form.validate()?;
        Ok(ApplicationReceipt {
            job_id: job.id,
            job_title: job.title.clone(),
            applicant: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            submitted_at: Utc::now(),
        })
    }
}
