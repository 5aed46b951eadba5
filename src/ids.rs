use typed_id::TypedId;
use uuid::Uuid;

use crate::{
    notification::Notification, pull_request::PullRequest, repo::Repo, rule::Rule, tag::Tag,
    view::View,
};

pub type RepoId = TypedId<Uuid, Repo>;
pub type PullRequestId = TypedId<Uuid, PullRequest>;
pub type NotificationId = TypedId<Uuid, Notification>;
pub type TagId = TypedId<Uuid, Tag>;
pub type ViewId = TypedId<Uuid, View>;
pub type RuleId = TypedId<Uuid, Rule>;
