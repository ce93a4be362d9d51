mod checker;
mod credentials;
mod errors;
mod mind;
mod strategy;

pub use checker::CredentialsChecker;
pub use credentials::{Credentials, username_from_request};
pub use errors::AuthError;
pub use mind::{ANONYMOUS_USERNAME, IlogMindFactory, Mind, MindFactory};
pub use strategy::{LoginOutcome, LoginRequest, PersistentSessionWrapper};
