//! Launchpad auth library
//!
//! Pure building blocks for identity and access, no I/O:
//! - `password`: Argon2id credential hashing
//! - `token`: signed, expiring session and reset tokens
//! - `policy`: the role/ownership permission matrix

pub mod password;
pub mod policy;
pub mod token;
