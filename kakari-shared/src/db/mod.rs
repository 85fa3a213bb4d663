/// Database layer for Kakari
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded migration runner
///
/// Queries live on the models in [`crate::models`].

pub mod migrations;
pub mod pool;
