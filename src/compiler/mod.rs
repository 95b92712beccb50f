//! Query compiler: turns a [`QueryRequest`] into a [`CompiledQuery`].
//!
//! ```text
//! request ─► resolve names ─► join plan ─► filters ─► time bucket ─► assemble
//!                 │               │
//!                 └── registry ───┘
//! ```
//!
//! Compilation is a pure function of (request, registry, options): it holds
//! no state, performs no I/O, and is safe to run on any number of threads
//! against one shared registry.
//!
//! # Example
//!
//! ```ignore
//! use classmetrics::compiler::Compiler;
//! use classmetrics::request::QueryRequest;
//! use classmetrics::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::classroom()?;
//! let request = QueryRequest::new().measure("sessions.count").dimension("users.role");
//! let compiled = Compiler::new(&registry).compile(&request)?;
//! println!("{}", compiled.sql);
//! ```

mod assemble;
mod error;
mod filter;
mod granularity;
mod output;
mod resolver;

pub use assemble::output_alias;
pub use error::{CompileError, CompileResult};
pub use filter::{escape_like, ParamBinder, LIKE_ESCAPE};
pub use granularity::{bucket_expr, date_part, dimension_expr};
pub use output::{ColumnRole, CompiledQuery, OutputColumn, SelectItem};
pub use resolver::{JoinFragment, JoinPlan, TableResolver};

use crate::request::QueryRequest;
use crate::schema::SchemaRegistry;
use crate::sql::Dialect;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct CompileOptions {
    /// Target SQL dialect.
    pub dialect: Dialect,
    /// Upper bound on LIMIT; larger requests are clamped.
    pub max_limit: Option<u64>,
}

impl CompileOptions {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = Some(max_limit);
        self
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles requests against a borrowed registry.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    registry: &'a SchemaRegistry,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.options.dialect = dialect;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub fn compile(&self, request: &QueryRequest) -> CompileResult<CompiledQuery> {
        assemble::assemble(self.registry, &self.options, request)
    }

    /// Parse the JSON wire format and compile it.
    pub fn compile_json(&self, json: &str) -> CompileResult<CompiledQuery> {
        self.compile(&QueryRequest::from_json(json)?)
    }
}
