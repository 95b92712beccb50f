//! Declarative join adjacency between registered tables.
//!
//! For every primary table the graph lists, in declaration order, the tables
//! reachable from it and the ordered join steps that reach each one. Steps
//! may pass through an intermediate table (`sessions -> classrooms -> schools`).

use serde::Serialize;

/// One join: bring `table` in with `from_table.from_column = table.to_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub table: String,
    pub from_table: String,
    pub from_column: String,
    pub to_column: String,
}

impl JoinStep {
    pub fn new(
        table: impl Into<String>,
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
        }
    }
}

/// Steps reaching `target` from a primary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinPath {
    pub target: String,
    pub steps: Vec<JoinStep>,
}

/// Ordered adjacency map: primary table -> reachable table -> join steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinGraph {
    edges: Vec<(String, Vec<JoinPath>)>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the path from `primary` to `target`.
    ///
    /// A second registration for the same pair replaces the first but keeps
    /// its position.
    pub fn add_path(&mut self, primary: &str, target: &str, steps: Vec<JoinStep>) {
        let path = JoinPath {
            target: target.to_string(),
            steps,
        };
        let idx = match self.edges.iter().position(|(p, _)| p == primary) {
            Some(idx) => idx,
            None => {
                self.edges.push((primary.to_string(), Vec::new()));
                self.edges.len() - 1
            }
        };
        let paths = &mut self.edges[idx].1;
        match paths.iter_mut().find(|p| p.target == target) {
            Some(existing) => *existing = path,
            None => paths.push(path),
        }
    }

    /// Paths leaving `primary`, in declaration order.
    pub fn paths_from(&self, primary: &str) -> &[JoinPath] {
        self.edges
            .iter()
            .find(|(p, _)| p == primary)
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn path(&self, primary: &str, target: &str) -> Option<&JoinPath> {
        self.paths_from(primary).iter().find(|p| p.target == target)
    }

    /// Every (primary, path) pair, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JoinPath)> {
        self.edges
            .iter()
            .flat_map(|(primary, paths)| paths.iter().map(move |p| (primary.as_str(), p)))
    }
}
