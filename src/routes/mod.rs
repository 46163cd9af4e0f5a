//! Routers grouped by access level. `create_router` applies the auth layer
//! to `authenticated` and `admin`; `public` is open.

/// Anonymous, read-only content.
pub mod public;

/// Caller-scoped user endpoints. Requires a valid token and an active account.
pub mod authenticated;

/// Content management. Every active, authenticated user is an admin.
pub mod admin;
