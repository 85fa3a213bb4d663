/// Middleware modules for the API server
///
/// Authentication lives in `kakari_shared::auth::middleware` so it can be
/// exercised without the HTTP crate; this module holds the API-only layers.
///
/// - Security headers

pub mod security;
