pub mod connection;
pub mod games;
pub mod matches;
pub mod models;
pub mod players;
pub mod profiles;
pub mod seasons;
pub mod setup;

#[cfg(test)]
pub mod testutil;

pub use connection::{create_pool, get_connection, DbConn, DbPool};
pub use models::*;
