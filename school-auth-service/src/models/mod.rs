pub mod account;
pub mod session;

pub use account::{Account, AuthProvider, Identity, NewAccount, Role};
pub use session::{Session, SessionToken, SessionUser};
