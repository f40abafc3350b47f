//! Database layer: pool, migrations and the Postgres account store.

mod accounts;
mod pool;

pub use accounts::PgAccountStore;
pub use pool::{create_pool, run_migrations, DbPool};
