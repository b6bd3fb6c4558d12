//! Ripvault-DB: Database schema, migrations, and query operations
//!
//! SQLite storage for workflows and the disc info cache, using rusqlite
//! with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use ripvault_common::Workflow;
//! use ripvault_db::pool::{init_pool, get_conn};
//! use ripvault_db::queries::workflows;
//!
//! let pool = init_pool("/var/lib/ripvault/ripvault.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let wf = Workflow::new("1234-ABCD", 0, "MOVIE_DISC", "Movie");
//! workflows::upsert_workflow(&conn, &wf).unwrap();
//! ```

pub mod migrations;
pub mod pool;
pub mod queries;
