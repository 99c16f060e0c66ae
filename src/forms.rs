//! Form input and validation.
//!
//! Validators collect every problem before failing so the caller can show
//! the whole list at once.

use crate::error::{GigError, GigResult};
use crate::models::Category;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub const MIN_JOB_DESCRIPTION: usize = 50;
pub const MAX_JOB_TITLE: usize = 100;
pub const MAX_JOB_DESCRIPTION: usize = 2000;
pub const MAX_CATEGORY_DESCRIPTION: usize = 200;
/// bcrypt only reads the first 72 bytes of a password
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Something that looks like `local@domain.tld`
pub fn is_plausible_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn finish(errors: Vec<String>) -> GigResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GigError::Validation(errors))
    }
}

fn required(errors: &mut Vec<String>, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(message.to_string());
    }
}

/// Fields a login attempt must carry
pub fn validate_login(email: &str, password: &str) -> GigResult<()> {
    let mut errors = Vec::new();
    required(&mut errors, email, "Email is required");
    if password.is_empty() {
        errors.push("Password is required".to_string());
    } else if password.len() > MAX_PASSWORD_BYTES {
        errors.push(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        ));
    }
    finish(errors)
}

/// Fields an account must have before it is created
pub fn validate_account(name: &str, email: &str, password: &str) -> GigResult<()> {
    let mut errors = Vec::new();
    required(&mut errors, name, "Name is required");
    if email.trim().is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_plausible_email(email) {
        errors.push(format!("'{}' is not a valid email address", email.trim()));
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    finish(errors)
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> GigResult<()> {
        let mut errors = match validate_account(&self.name, &self.email, &self.password) {
            Ok(()) => Vec::new(),
            Err(e) => e.messages(),
        };
        if self.confirm_password.is_empty() {
            errors.push("Please confirm the password".to_string());
        } else if self.password != self.confirm_password {
            errors.push("Passwords do not match".to_string());
        }
        finish(errors)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobForm {
    pub title: String,
    pub budget: String,
    pub delivery_time: String,
    pub category: String,
    pub description: String,
}

impl JobForm {
    pub fn validate(&self, categories: &[Category]) -> GigResult<()> {
        let mut errors = Vec::new();
        required(&mut errors, &self.title, "Job title is required");
        if self.title.chars().count() > MAX_JOB_TITLE {
            errors.push(format!("Job title must be at most {} characters", MAX_JOB_TITLE));
        }
        required(&mut errors, &self.budget, "Budget is required");
        required(&mut errors, &self.delivery_time, "Delivery time is required");
        if self.category.is_empty() {
            errors.push("Category is required".to_string());
        } else if !categories.iter().any(|c| c.name == self.category) {
            errors.push(format!("Unknown category '{}'", self.category));
        }
        required(&mut errors, &self.description, "Description is required");
        let len = self.description.chars().count();
        if len < MIN_JOB_DESCRIPTION {
            errors.push(format!(
                "Description must be at least {} characters",
                MIN_JOB_DESCRIPTION
            ));
        } else if len > MAX_JOB_DESCRIPTION {
            errors.push(format!(
                "Description must be at most {} characters",
                MAX_JOB_DESCRIPTION
            ));
        }
        finish(errors)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryForm {
    pub name: String,
    pub icon: String,
    pub description: String,
}

impl CategoryForm {
    pub fn validate(&self, existing: &[Category]) -> GigResult<()> {
        let mut errors = Vec::new();
        required(&mut errors, &self.name, "Category name is required");
        required(&mut errors, &self.icon, "Category icon is required");
        required(&mut errors, &self.description, "Category description is required");
        if self.description.chars().count() > MAX_CATEGORY_DESCRIPTION {
            errors.push(format!(
                "Category description must be at most {} characters",
                MAX_CATEGORY_DESCRIPTION
            ));
        }
        if existing.iter().any(|c| c.same_name(&self.name)) {
            errors.push("Category with this name already exists".to_string());
        }
        finish(errors)
    }
}

/// Job application. Only the required fields are checked.
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub languages: String,
    pub experience: String,
    pub skills: String,
    pub portfolio: String,
    pub resume: String,
    pub cover_letter: String,
    pub delivery_time: String,
    pub budget: String,
}

impl ApplicationForm {
    pub fn validate(&self) -> GigResult<()> {
        let mut errors = Vec::new();
        required(&mut errors, &self.full_name, "Full name is required");
        required(&mut errors, &self.email, "Email is required");
        required(&mut errors, &self.phone, "Phone number is required");
        required(&mut errors, &self.country, "Country is required");
        required(&mut errors, &self.resume, "Resume upload is required");
        required(&mut errors, &self.delivery_time, "Delivery time is required");
        required(&mut errors, &self.budget, "Proposed budget is required");
        finish(errors)
    }
}
