pub mod job;
pub mod patch;
pub mod user;

pub use job::{leading_number, Category, JobPosting};
pub use patch::{PreferencesPatch, ProfilePatch, SecurityPatch, StatsPatch};
pub use user::{
    name_from_email, DirectoryUser, Preferences, Role, Security, Stats, Theme, UserProfile,
    UserStatus,
};
