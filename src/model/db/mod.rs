//! Database representations of the system's persistent data.

pub mod admin;
pub mod demographic;
pub mod election;
pub mod invitation;
pub mod vote;
pub mod voter;
pub mod voter_log;

use rand::RngCore;

use crate::error::Result;

/// Bytes of salt in a password hash.
const PASSWORD_SALT_BYTES: usize = 16;

/// Hash a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0_u8; PASSWORD_SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &argon2::Config::default(),
    )?)
}
