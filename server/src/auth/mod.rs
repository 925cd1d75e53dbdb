//! Authentication resolution
//!
//! - `strategy` - Trust modes and the `Authenticator` trait
//! - `proxy` / `directory` / `local` - One authenticator per trust mode
//! - `provisioner` - Find-or-create of stored users
//! - `session` - Server-side sessions behind signed tokens
//! - `resolver` - Ties the above together per request

pub mod directory;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod local;
pub mod password;
pub mod provisioner;
pub mod proxy;
pub mod resolver;
pub mod session;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::{
    DirectoryAuthenticator, DirectoryClient, DirectoryConnection, DirectoryEntry, DirectoryError,
};
pub use error::AuthError;
pub use identity::{AuthRequest, Credentials, IdentityAssertion};
pub use local::LocalAuthenticator;
pub use provisioner::UserProvisioner;
pub use proxy::ProxyHeaderExtractor;
pub use resolver::{AuthResolver, Resolved};
pub use session::{SessionManager, SessionToken};
pub use strategy::{AuthStrategy, Authenticator};
