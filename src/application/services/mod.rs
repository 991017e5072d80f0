pub mod session_service;
pub mod timeline_service;

pub use session_service::{SessionService, UserData};
pub use timeline_service::TimelineService;
