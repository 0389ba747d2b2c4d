pub mod session;

pub use session::{session_middleware, CurrentSession, RequireSession};
