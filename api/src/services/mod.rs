pub mod rule_service;
pub mod view_service;

pub use rule_service::RuleService;
pub use view_service::ViewService;
