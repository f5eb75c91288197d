mod credentials;
mod token;

pub use credentials::Credentials;
pub use token::{Account, AuthToken, Role, AUTH_TOKEN_COOKIE};
