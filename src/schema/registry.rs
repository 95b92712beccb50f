//! The immutable schema registry.
//!
//! Built once at startup through [`SchemaRegistryBuilder`], which validates
//! every definition, then shared read-only (by reference or `Arc`) with any
//! number of concurrent compilations.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token as SqlToken;

use super::definitions::{DimensionDefinition, MeasureDefinition, TableDefinition};
use super::error::{SchemaError, SchemaResult};
use super::relationships::{JoinGraph, JoinStep};

static MEMBER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*\.[a-z][a-z0-9_]*$").expect("member id pattern is valid")
});

// ============================================================================
// Registry
// ============================================================================

/// Catalogue of every measure and dimension, plus the tables and join
/// adjacency they live in.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableDefinition>,
    measures: BTreeMap<String, MeasureDefinition>,
    dimensions: BTreeMap<String, DimensionDefinition>,
    joins: JoinGraph,
    priority: Vec<String>,
    fallback: String,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn lookup_measure(&self, id: &str) -> SchemaResult<&MeasureDefinition> {
        self.measures
            .get(id)
            .ok_or_else(|| SchemaError::MeasureNotFound(id.to_string()))
    }

    pub fn lookup_dimension(&self, id: &str) -> SchemaResult<&DimensionDefinition> {
        self.dimensions
            .get(id)
            .ok_or_else(|| SchemaError::DimensionNotFound(id.to_string()))
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Alias of a registered table.
    pub fn alias(&self, table: &str) -> Option<&str> {
        self.table(table).map(|t| t.alias.as_str())
    }

    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    /// Measures, sorted by identifier.
    pub fn measures(&self) -> impl Iterator<Item = &MeasureDefinition> {
        self.measures.values()
    }

    /// Dimensions, sorted by identifier.
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionDefinition> {
        self.dimensions.values()
    }

    pub fn joins(&self) -> &JoinGraph {
        &self.joins
    }

    /// Primary-table preference, most preferred first.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Primary table used when no required table appears in the priority list.
    pub fn fallback_table(&self) -> &str {
        &self.fallback
    }

    /// Read-only listing for client discovery.
    pub fn catalogue(&self) -> Catalogue {
        Catalogue {
            measures: self
                .measures()
                .map(|m| CatalogueEntry {
                    name: m.id.clone(),
                    kind: m.aggregation.as_str().to_string(),
                    table: m.table.clone(),
                    description: m.description.clone(),
                })
                .collect(),
            dimensions: self
                .dimensions()
                .map(|d| CatalogueEntry {
                    name: d.id.clone(),
                    kind: d.kind.as_str().to_string(),
                    table: d.table.clone(),
                    description: d.description.clone(),
                })
                .collect(),
        }
    }
}

/// Schema introspection payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalogue {
    pub measures: Vec<CatalogueEntry>,
    pub dimensions: Vec<CatalogueEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    pub name: String,
    /// Aggregation kind for measures, value kind for dimensions.
    #[serde(rename = "type")]
    pub kind: String,
    pub table: String,
    pub description: String,
}

// ============================================================================
// Builder
// ============================================================================

/// Collects definitions and validates them as a whole in [`build`](Self::build).
#[derive(Debug, Default)]
#[must_use = "builders have no effect until build() is called"]
pub struct SchemaRegistryBuilder {
    tables: Vec<TableDefinition>,
    measures: Vec<MeasureDefinition>,
    dimensions: Vec<DimensionDefinition>,
    joins: JoinGraph,
    priority: Vec<String>,
    fallback: Option<String>,
}

impl SchemaRegistryBuilder {
    pub fn table(mut self, name: &str, alias: &str) -> Self {
        self.tables.push(TableDefinition::new(name, alias));
        self
    }

    pub fn measure(mut self, measure: MeasureDefinition) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn dimension(mut self, dimension: DimensionDefinition) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Declare how `target` is reached when `primary` is the FROM table.
    pub fn join(mut self, primary: &str, target: &str, steps: Vec<JoinStep>) -> Self {
        self.joins.add_path(primary, target, steps);
        self
    }

    pub fn priority<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Defaults to the first priority table.
    pub fn fallback(mut self, table: &str) -> Self {
        self.fallback = Some(table.to_string());
        self
    }

    pub fn build(mut self) -> SchemaResult<SchemaRegistry> {
        self.check_tables()?;

        let mut seen = HashSet::new();
        let mut measures = BTreeMap::new();
        for measure in std::mem::take(&mut self.measures) {
            check_member(&measure.id, &mut seen)?;
            self.check_table_ref(&measure.id, &measure.table)?;
            check_expression(&measure.id, &measure.sql)?;
            measures.insert(measure.id.clone(), measure);
        }

        let mut dimensions = BTreeMap::new();
        for dimension in std::mem::take(&mut self.dimensions) {
            check_member(&dimension.id, &mut seen)?;
            self.check_table_ref(&dimension.id, &dimension.table)?;
            check_expression(&dimension.id, &dimension.sql)?;
            if dimension.grain.is_some() && !dimension.is_time() {
                return Err(SchemaError::GrainOnNonTimeDimension(dimension.id));
            }
            dimensions.insert(dimension.id.clone(), dimension);
        }

        for (primary, path) in self.joins.iter() {
            let context = format!("join {} -> {}", primary, path.target);
            self.check_table_ref(&context, primary)?;
            self.check_table_ref(&context, &path.target)?;
            for step in &path.steps {
                self.check_table_ref(&context, &step.table)?;
                self.check_table_ref(&context, &step.from_table)?;
            }
        }

        for table in &self.priority {
            self.check_table_ref("priority", table)?;
        }

        let fallback = self
            .fallback
            .clone()
            .or_else(|| self.priority.first().cloned())
            .or_else(|| self.tables.first().map(|t| t.name.clone()))
            .ok_or_else(|| SchemaError::UnknownTable {
                context: "fallback".into(),
                table: String::new(),
            })?;
        self.check_table_ref("fallback", &fallback)?;

        Ok(SchemaRegistry {
            tables: self.tables,
            measures,
            dimensions,
            joins: self.joins,
            priority: self.priority,
            fallback,
        })
    }

    fn check_tables(&self) -> SchemaResult<()> {
        let mut names = HashSet::new();
        let mut aliases: HashMap<&str, &str> = HashMap::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if let Some(first) = aliases.insert(table.alias.as_str(), table.name.as_str()) {
                return Err(SchemaError::DuplicateAlias {
                    alias: table.alias.clone(),
                    first: first.to_string(),
                    second: table.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_table_ref(&self, context: &str, table: &str) -> SchemaResult<()> {
        if self.tables.iter().any(|t| t.name == table) {
            Ok(())
        } else {
            Err(SchemaError::UnknownTable {
                context: context.to_string(),
                table: table.to_string(),
            })
        }
    }
}

fn check_member(id: &str, seen: &mut HashSet<String>) -> SchemaResult<()> {
    if !MEMBER_ID.is_match(id) {
        return Err(SchemaError::InvalidIdentifier(id.to_string()));
    }
    if !seen.insert(id.to_string()) {
        return Err(SchemaError::DuplicateMember(id.to_string()));
    }
    Ok(())
}

/// The expression must parse as exactly one SQL expression.
fn check_expression(member: &str, sql: &str) -> SchemaResult<()> {
    let invalid = |message: String| SchemaError::InvalidExpression {
        member: member.to_string(),
        message,
    };

    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(sql)
        .map_err(|e| invalid(e.to_string()))?;
    parser.parse_expr().map_err(|e| invalid(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != SqlToken::EOF {
        return Err(invalid(format!("unexpected trailing input at '{}'", next.token)));
    }
    Ok(())
}
