//! Worker event tools.

pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod status;

pub use events::{SwMessageParams, SwPushParams, SwSyncParams, message_impl, push_impl, sync_impl};
pub use fetch::{SwFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};
pub use status::status_impl;
