//! Services layer: account storage, the sign-in pipeline, session signing and
//! the external identity provider.

pub mod account_store;
pub mod auth;
mod database;
pub mod error;
pub mod metrics;
pub mod oauth;
mod session_codec;

pub use account_store::{
    AccountStore, Accounts, InMemoryAccountStore, MongoAccountStore, StoreError,
};
pub use auth::{AuthService, CredentialSource, IdentitySource, OAuthSource, SignedIn};
pub use database::MongoDb;
pub use error::ServiceError;
pub use oauth::{GoogleOAuthClient, MockOAuthProvider, OAuthProvider, Pkce, ProviderProfile};
pub use session_codec::{DecodedSession, SessionCodec};
