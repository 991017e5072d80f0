pub mod post;
pub mod profile;
pub mod relay_list;

pub use post::{Post, KIND_CONTACTS, KIND_METADATA, KIND_RELAY_LIST, KIND_TEXT_NOTE};
pub use profile::{Profile, ProfileRecord};
pub use relay_list::{RelayList, RelayUsage};
