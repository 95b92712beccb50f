//! # classmetrics
//!
//! A declarative analytics query compiler for classroom telemetry.
//!
//! ## Architecture
//!
//! Requests name measures, dimensions, filters and an optional time bucket.
//! The compiler resolves every name against an immutable schema registry and
//! emits parameterised SQL for the target dialect:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                QueryRequest (JSON / builder)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler + schema registry]
//! ┌─────────────────────────────────────────────────────────┐
//! │   resolve names → join plan → filters → time bucket      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CompiledQuery (SQL text + bound parameters)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [connector]
//! ┌─────────────────────────────────────────────────────────┐
//! │                         rows                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod compiler;
pub mod config;
pub mod connector;
pub mod request;
pub mod schema;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compiler::{
        CompileError, CompileOptions, CompileResult, CompiledQuery, Compiler,
    };
    pub use crate::connector::{QueryResult, SqliteConnector, StorageConnector};
    pub use crate::request::{
        FilterClause, FilterOperator, ParamValue, QueryRequest, SortDirection,
        TimeDimensionClause,
    };
    pub use crate::schema::{Granularity, SchemaRegistry};
    pub use crate::sql::{Dialect, SqlDialect};
}

pub use compiler::{CompileError, CompiledQuery, Compiler};
pub use request::QueryRequest;
pub use schema::SchemaRegistry;
pub use sql::Dialect;
