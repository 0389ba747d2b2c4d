pub mod registration;
pub mod session;
pub mod social;

pub use registration::register;
pub use session::{login, redirect, session, signout};
pub use social::{google_callback, google_login};
