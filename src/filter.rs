//! Search and filter over job and user listings.
//!
//! All predicates are ANDed. An inactive predicate matches everything, so
//! default criteria return the input unchanged. Input order is preserved.

use crate::models::{DirectoryUser, JobPosting, Role};

/// Budget ranges offered by the job list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBucket {
    Under100,
    From100To300,
    From300To500,
    Over500,
}

impl PriceBucket {
    pub const ALL: [PriceBucket; 4] = [
        Self::Under100,
        Self::From100To300,
        Self::From300To500,
        Self::Over500,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "under-100" => Some(Self::Under100),
            "100-300" => Some(Self::From100To300),
            "300-500" => Some(Self::From300To500),
            "over-500" => Some(Self::Over500),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under100 => "under-100",
            Self::From100To300 => "100-300",
            Self::From300To500 => "300-500",
            Self::Over500 => "over-500",
        }
    }

    /// Both ends inclusive for the bounded buckets: 300 is in both middle ones
    pub fn contains(&self, value: u64) -> bool {
        match self {
            Self::Under100 => value < 100,
            Self::From100To300 => (100..=300).contains(&value),
            Self::From300To500 => (300..=500).contains(&value),
            Self::Over500 => value > 500,
        }
    }
}

/// Delivery-time ranges in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryBucket {
    UpTo3,
    From4To7,
    From8To14,
    Over14,
}

impl DeliveryBucket {
    pub const ALL: [DeliveryBucket; 4] = [Self::UpTo3, Self::From4To7, Self::From8To14, Self::Over14];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1-3" => Some(Self::UpTo3),
            "4-7" => Some(Self::From4To7),
            "8-14" => Some(Self::From8To14),
            "over-14" => Some(Self::Over14),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpTo3 => "1-3",
            Self::From4To7 => "4-7",
            Self::From8To14 => "8-14",
            Self::Over14 => "over-14",
        }
    }

    pub fn contains(&self, days: u64) -> bool {
        match self {
            Self::UpTo3 => days <= 3,
            Self::From4To7 => (4..=7).contains(&days),
            Self::From8To14 => (8..=14).contains(&days),
            Self::Over14 => days > 14,
        }
    }
}

/// Current job list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub query: String,
    pub category: Option<String>,
    pub price: Option<PriceBucket>,
    pub delivery: Option<DeliveryBucket>,
}

impl FilterCriteria {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when any predicate would narrow the list
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
            || self.category.is_some()
            || self.price.is_some()
            || self.delivery.is_some()
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        self.matches_text(job)
            && self.matches_category(job)
            && self.matches_price(job)
            && self.matches_delivery(job)
    }

    fn matches_text(&self, job: &JobPosting) -> bool {
        if self.query.trim().is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        job.title.to_lowercase().contains(&needle) || job.description.to_lowercase().contains(&needle)
    }

    // Exact, case-sensitive comparison
    fn matches_category(&self, job: &JobPosting) -> bool {
        self.category.as_ref().map_or(true, |c| job.category == *c)
    }

    fn matches_price(&self, job: &JobPosting) -> bool {
        self.price.map_or(true, |b| b.contains(job.budget_value()))
    }

    fn matches_delivery(&self, job: &JobPosting) -> bool {
        self.delivery.map_or(true, |b| b.contains(job.delivery_days()))
    }

    /// One-line description for the shell prompt
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.query.trim().is_empty() {
            parts.push(format!("query=\"{}\"", self.query));
        }
        if let Some(c) = &self.category {
            parts.push(format!("category={}", c));
        }
        if let Some(p) = self.price {
            parts.push(format!("price={}", p.as_str()));
        }
        if let Some(d) = self.delivery {
            parts.push(format!("delivery={}", d.as_str()));
        }
        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Jobs matching every active predicate, in input order
pub fn filter_jobs<'a>(jobs: &'a [JobPosting], criteria: &FilterCriteria) -> Vec<&'a JobPosting> {
    jobs.iter().filter(|job| criteria.matches(job)).collect()
}

/// Admin user search: name or email substring, optional exact role
pub fn filter_users<'a>(
    users: &'a [DirectoryUser],
    query: &str,
    role: Option<Role>,
) -> Vec<&'a DirectoryUser> {
    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|u| {
            needle.trim().is_empty()
                || u.name.to_lowercase().contains(&needle)
                || u.email.to_lowercase().contains(&needle)
        })
        .filter(|u| role.map_or(true, |r| u.role == r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;
    use chrono::NaiveDate;

    fn job(id: u32, title: &str, category: &str, budget: &str, delivery: &str) -> JobPosting {
        JobPosting {
            id,
            title: title.to_string(),
            category: category.to_string(),
            budget: budget.to_string(),
            delivery_time: delivery.to_string(),
            description: format!("Description for {}", title),
            posted_by: "test@gmail.com".to_string(),
            posted_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn sample() -> Vec<JobPosting> {
        vec![
            job(1, "Logo", "Design", "$100", "3 days"),
            job(2, "API", "Dev", "$600", "20 days"),
            job(3, "Landing page", "Dev", "$300", "7 days"),
            job(4, "Banner", "Design", "$50", "1 week"),
            job(5, "Copy edit", "Writing", "Negotiable", "10 days"),
        ]
    }

    fn ids(jobs: &[&JobPosting]) -> Vec<u32> {
        jobs.iter().map(|j| j.id).collect()
    }

    #[test]
    fn test_no_criteria_returns_everything_in_order() {
        let jobs = sample();
        let result = filter_jobs(&jobs, &FilterCriteria::default());
        assert_eq!(ids(&result), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_under_100_excludes_100_and_600() {
        let jobs = vec![
            job(1, "Logo", "Design", "$100", "3 days"),
            job(2, "API", "Dev", "$600", "20 days"),
        ];
        let criteria = FilterCriteria {
            price: Some(PriceBucket::Under100),
            ..Default::default()
        };
        assert!(filter_jobs(&jobs, &criteria).is_empty());
    }

    #[test]
    fn test_price_bucket_boundaries_inclusive() {
        assert!(!PriceBucket::Under100.contains(100));
        assert!(PriceBucket::From100To300.contains(100));
        assert!(PriceBucket::From100To300.contains(300));
        assert!(PriceBucket::From300To500.contains(300));
        assert!(PriceBucket::From300To500.contains(500));
        assert!(!PriceBucket::Over500.contains(500));
        assert!(PriceBucket::Over500.contains(501));
    }

    #[test]
    fn test_delivery_bucket_boundaries() {
        assert!(DeliveryBucket::UpTo3.contains(0));
        assert!(DeliveryBucket::UpTo3.contains(3));
        assert!(DeliveryBucket::From4To7.contains(4));
        assert!(DeliveryBucket::From4To7.contains(7));
        assert!(DeliveryBucket::From8To14.contains(14));
        assert!(DeliveryBucket::Over14.contains(15));
        assert!(!DeliveryBucket::Over14.contains(14));
    }

    #[test]
    fn test_week_reads_as_one_day() {
        let jobs = sample();
        let criteria = FilterCriteria {
            delivery: Some(DeliveryBucket::UpTo3),
            ..Default::default()
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![1, 4]);
    }

    #[test]
    fn test_no_digit_budget_reads_as_zero() {
        let jobs = sample();
        let criteria = FilterCriteria {
            price: Some(PriceBucket::Under100),
            ..Default::default()
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![4, 5]);
    }

    #[test]
    fn test_text_matches_title_or_description_case_insensitive() {
        let jobs = sample();
        let criteria = FilterCriteria {
            query: "LOGO".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![1]);

        let criteria = FilterCriteria {
            query: "description for".to_string(),
            ..Default::default()
        };
        assert_eq!(filter_jobs(&jobs, &criteria).len(), 5);
    }

    #[test]
    fn test_whitespace_query_is_inactive() {
        let jobs = sample();
        let criteria = FilterCriteria {
            query: "   ".to_string(),
            ..Default::default()
        };
        assert!(!criteria.is_active());
        assert_eq!(filter_jobs(&jobs, &criteria).len(), 5);
    }

    #[test]
    fn test_category_is_case_sensitive() {
        let jobs = sample();
        let criteria = FilterCriteria {
            category: Some("design".to_string()),
            ..Default::default()
        };
        assert!(filter_jobs(&jobs, &criteria).is_empty());

        let criteria = FilterCriteria {
            category: Some("Design".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![1, 4]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let jobs = sample();
        let criteria = FilterCriteria {
            category: Some("Dev".to_string()),
            price: Some(PriceBucket::From100To300),
            delivery: Some(DeliveryBucket::From4To7),
            ..Default::default()
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![3]);
    }

    #[test]
    fn test_every_combination_is_ordered_subset() {
        let jobs = sample();
        let prices = std::iter::once(None).chain(PriceBucket::ALL.into_iter().map(Some));
        for price in prices {
            let deliveries = std::iter::once(None).chain(DeliveryBucket::ALL.into_iter().map(Some));
            for delivery in deliveries {
                for category in [None, Some("Dev".to_string())] {
                    let criteria = FilterCriteria {
                        query: String::new(),
                        category: category.clone(),
                        price,
                        delivery,
                    };
                    let result = ids(&filter_jobs(&jobs, &criteria));
                    let mut sorted = result.clone();
                    sorted.sort();
                    assert_eq!(result, sorted);
                    assert!(result.iter().all(|id| jobs.iter().any(|j| j.id == *id)));
                }
            }
        }
    }

    #[test]
    fn test_clear_restores_full_list() {
        let jobs = sample();
        let mut criteria = FilterCriteria {
            query: "api".to_string(),
            category: Some("Dev".to_string()),
            price: Some(PriceBucket::Over500),
            delivery: Some(DeliveryBucket::Over14),
        };
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![2]);
        criteria.clear();
        assert_eq!(ids(&filter_jobs(&jobs, &criteria)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bucket_labels() {
        for b in PriceBucket::ALL {
            assert_eq!(PriceBucket::from_str(b.as_str()), Some(b));
        }
        for b in DeliveryBucket::ALL {
            assert_eq!(DeliveryBucket::from_str(b.as_str()), Some(b));
        }
        assert!(PriceBucket::from_str("cheap").is_none());
    }

    #[test]
    fn test_filter_users() {
        let users = vec![
            DirectoryUser {
                id: 1,
                name: "Admin User".to_string(),
                email: "admin@gmail.com".to_string(),
                role: Role::Admin,
                status: UserStatus::Active,
                join_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
            DirectoryUser {
                id: 2,
                name: "Sara Khan".to_string(),
                email: "sara@mail.com".to_string(),
                role: Role::JobSeeker,
                status: UserStatus::Blocked,
                join_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            },
        ];
        assert_eq!(filter_users(&users, "", None).len(), 2);
        assert_eq!(filter_users(&users, "SARA", None)[0].id, 2);
        assert_eq!(filter_users(&users, "gmail", None)[0].id, 1);
        assert!(filter_users(&users, "sara", Some(Role::Admin)).is_empty());
    }
}
