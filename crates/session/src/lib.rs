pub mod error;
pub mod session;
pub mod storage;
pub mod stores;

pub use error::SessionError;
pub use session::Session;
pub use storage::*;
pub use stores::*;
