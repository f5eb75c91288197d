use serde::{Deserialize, Serialize};

/// A username/password login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                username: "aris".to_string(),
                password: "hunter2hunter2".to_string(),
            }
        }
    }
}
