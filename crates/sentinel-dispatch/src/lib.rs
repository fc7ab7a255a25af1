pub mod antidelete;
pub mod connection;
pub mod dispatcher;
pub mod membership;
pub mod status;

pub use connection::Connectivity;
pub use dispatcher::{Disposition, Dispatcher, AUTO_REACTION};
pub use status::{StatusAction, STATUS_REACTIONS};
