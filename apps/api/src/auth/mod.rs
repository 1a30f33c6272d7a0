// Token issuance/validation, password hashing and the caller extractors.

pub mod extract;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod users;
