//! Schema registry: tables, measures, dimensions and the join adjacency
//! between them.

mod classroom;
mod definitions;
mod error;
mod registry;
mod relationships;

pub use classroom::PRIORITY;
pub use definitions::{
    AggregationKind, DimensionDefinition, DimensionKind, Granularity, MeasureDefinition,
    TableDefinition,
};
pub use error::{SchemaError, SchemaResult};
pub use registry::{Catalogue, CatalogueEntry, SchemaRegistry, SchemaRegistryBuilder};
pub use relationships::{JoinGraph, JoinPath, JoinStep};
