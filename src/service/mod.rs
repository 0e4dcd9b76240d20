//! Service layer: dispatcher, broadcast engine, and the relay task.

pub mod broadcast;
pub mod dispatcher;
pub mod relay;

pub use dispatcher::{Dispatcher, MAX_MEMBERS_PER_SESSION};
pub use relay::{RelayCommand, RelayHandle};
