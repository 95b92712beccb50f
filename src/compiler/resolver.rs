//! Table dependency resolution: primary table choice and join derivation.

use std::collections::BTreeSet;

use tracing::debug;

use crate::schema::{JoinStep, SchemaRegistry};
use crate::sql::{table_col, Expr, ExprExt, Query, TableRef};

use super::error::{CompileError, CompileResult};

/// One `LEFT JOIN table AS alias ON condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFragment {
    pub table: String,
    pub alias: String,
    pub on: Expr,
}

/// Primary table plus the joins that bring every other required table in.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub primary: String,
    pub primary_alias: String,
    pub joins: Vec<JoinFragment>,
}

impl JoinPlan {
    /// Set FROM and append the joins to `query`.
    pub fn apply(&self, query: Query) -> Query {
        let from = TableRef::new(&self.primary).with_alias(&self.primary_alias);
        self.joins.iter().fold(query.from(from), |q, join| {
            q.left_join(
                TableRef::new(&join.table).with_alias(&join.alias),
                join.on.clone(),
            )
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.joins.iter().map(|j| j.table.as_str()))
    }
}

pub struct TableResolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> TableResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// First priority table present in `required`, else the fallback.
    pub fn primary_table(&self, required: &BTreeSet<String>) -> &'a str {
        self.registry
            .priority()
            .iter()
            .find(|t| required.contains(t.as_str()))
            .map(String::as_str)
            .unwrap_or_else(|| self.registry.fallback_table())
    }

    /// Build the join plan for `required`.
    ///
    /// Joins follow the adjacency declaration order for the primary table,
    /// whatever order the tables were requested in. Intermediate tables shared
    /// by several paths are joined once.
    pub fn resolve(&self, required: &BTreeSet<String>) -> CompileResult<JoinPlan> {
        let primary = self.primary_table(required);
        let mut joined: Vec<&str> = vec![primary];
        let mut joins = Vec::new();

        for path in self.registry.joins().paths_from(primary) {
            if !required.contains(&path.target) || joined.contains(&path.target.as_str()) {
                continue;
            }
            for step in &path.steps {
                if joined.contains(&step.table.as_str()) {
                    continue;
                }
                joins.push(self.fragment(primary, step)?);
                joined.push(step.table.as_str());
            }
        }

        if let Some(missing) = required.iter().find(|t| !joined.contains(&t.as_str())) {
            return Err(CompileError::UnreachableJoin {
                primary: primary.to_string(),
                table: missing.clone(),
            });
        }

        debug!(primary, joins = joins.len(), "resolved join plan");

        Ok(JoinPlan {
            primary: primary.to_string(),
            primary_alias: self.alias(primary, primary)?.to_string(),
            joins,
        })
    }

    fn fragment(&self, primary: &str, step: &JoinStep) -> CompileResult<JoinFragment> {
        let from_alias = self.alias(primary, &step.from_table)?;
        let alias = self.alias(primary, &step.table)?;
        Ok(JoinFragment {
            table: step.table.clone(),
            alias: alias.to_string(),
            on: table_col(from_alias, &step.from_column).eq(table_col(alias, &step.to_column)),
        })
    }

    fn alias(&self, primary: &str, table: &str) -> CompileResult<&'a str> {
        self.registry
            .alias(table)
            .ok_or_else(|| CompileError::UnreachableJoin {
                primary: primary.to_string(),
                table: table.to_string(),
            })
    }
}
