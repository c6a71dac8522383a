pub mod cancel;
pub mod session_lock;

pub use cancel::{CancelMap, CancelToken};
pub use session_lock::SessionLockMap;
