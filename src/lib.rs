//! Core of the gigboard job marketplace: listing filters, the job/category/
//! user catalog, and session management over a local directory or a
//! delegated identity service.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod fixtures;
pub mod forms;
pub mod models;
pub mod session;
pub mod store;

pub use catalog::{ApplicationReceipt, Catalog, Dashboard};
pub use config::Config;
pub use error::{GigError, GigResult};
pub use filter::{filter_jobs, filter_users, DeliveryBucket, FilterCriteria, PriceBucket};
pub use session::{build_provider, SessionProvider, SessionState};
pub use store::{FileStore, KeyValueStore, MemoryStore};
