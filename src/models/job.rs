//! Job postings and categories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A job listing from the fixture (or posted during the session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: u32,
    pub title: String,
    pub category: String,
    /// Currency amount as written, e.g. "$250"
    pub budget: String,
    /// Duration as written, e.g. "5 days" or "2 weeks"
    pub delivery_time: String,
    pub description: String,
    /// Email or display name of the poster
    pub posted_by: String,
    pub posted_date: NaiveDate,
}

impl JobPosting {
    /// Budget digits read as an integer. See [`leading_number`].
    pub fn budget_value(&self) -> u64 {
        leading_number(&self.budget)
    }

    /// Delivery digits read as a day count. "1 week" reads as 1.
    pub fn delivery_days(&self) -> u64 {
        leading_number(&self.delivery_time)
    }

    /// First 160 characters of the description, for listings
    pub fn summary(&self) -> String {
        let mut s: String = self.description.chars().take(160).collect();
        if self.description.chars().count() > 160 {
            s.push_str("...");
        }
        s
    }
}

/// Strip every non-digit and read what is left as a base-10 integer.
///
/// No digits yields 0. A digit run too long for `u64` saturates.
pub fn leading_number(s: &str) -> u64 {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// A job category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub icon: String,
    pub description: String,
}

impl Category {
    /// Category names are unique regardless of case
    pub fn same_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
