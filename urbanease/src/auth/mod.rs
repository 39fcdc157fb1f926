//! Authentication and authorization.
//!
//! Two sign-in methods are supported, tried in this order for every request:
//!
//! 1. **Session cookie**: `POST /api/auth/login` verifies an email/password pair and issues an
//!    HS256 JWT in an HttpOnly cookie. The token names the account; the account itself is read
//!    again on every request, so role changes and deletions apply immediately.
//! 2. **Proxy header**: an identity-aware proxy in front of the service forwards the signed-in
//!    user's email in a configured header. Unknown emails can be provisioned as residents.
//!
//! Authorization is role based. `ADMIN` and `MUNICIPAL_STAFF` are staff; see
//! [`current_user::require_staff`].
//!
//! # Modules
//!
//! - [`current_user`]: the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor
//! - [`password`]: Argon2 hashing and password rules
//! - [`session`]: session token and cookie handling

pub mod current_user;
pub mod password;
pub mod session;
