pub mod database;
pub mod notification;
pub mod pull_request;
pub mod repo;
pub mod rule;
pub mod sync_state;
pub mod tag;
pub mod user;
pub mod view;

pub use database::Database;
pub use notification::{NewNotification, NotificationRepository};
pub use pull_request::PullRequestRepository;
pub use repo::RepoRepository;
pub use rule::RuleRepository;
pub use sync_state::SyncStateRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
pub use view::ViewRepository;
