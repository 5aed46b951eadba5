mod health_check;
mod notification;

pub use health_check::ping;
pub use notification::scope as notification_scope;
