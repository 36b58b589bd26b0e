//! `stockledger-auth`: bearer token verification, decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;

pub use claims::{validate_claims, OwnerClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
