// handlers/mod.rs - Resource handlers
//
// users: account lifecycle, sessions and password reset (public + protected)
// plans: per-user plan CRUD (protected)
//
// Protected handlers run behind `middleware::require_auth` and read the
// caller from `Extension<Principal>`.

pub mod plans;
pub mod users;
