pub mod time_unit;
pub mod wayback_query;

pub use time_unit::TimeUnit;
pub use wayback_query::{WaybackQuery, WaybackQueryInputs};
