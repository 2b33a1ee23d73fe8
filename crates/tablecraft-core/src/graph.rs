use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{FieldType, TableLayout, TableSchema};

/// Table-to-table "depends on" relation, keyed in input order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Tables a schema must be generated after: ref targets, its parent and a
/// pointer's source table.
pub fn dependencies_of(schema: &TableSchema) -> BTreeSet<String> {
    let mut deps: BTreeSet<String> = schema
        .fields
        .iter()
        .filter_map(|field| match &field.field_type {
            FieldType::Ref { table, .. } => Some(table.clone()),
            _ => None,
        })
        .collect();

    match &schema.layout {
        TableLayout::Child { parent, .. } => {
            deps.insert(parent.clone());
        }
        TableLayout::Pointer { source_table, .. } => {
            deps.insert(source_table.clone());
        }
        TableLayout::Independent { .. }
        | TableLayout::Versioned { .. }
        | TableLayout::Records { .. } => {}
    }

    deps
}

impl DependencyGraph {
    /// Build the graph, rejecting duplicate tables and references to tables
    /// outside the set.
    pub fn build(schemas: &[TableSchema]) -> Result<Self> {
        let mut edges = IndexMap::with_capacity(schemas.len());
        for schema in schemas {
            if edges
                .insert(schema.name.clone(), dependencies_of(schema))
                .is_some()
            {
                return Err(Error::DuplicateTable(schema.name.clone()));
            }
        }

        for (table, deps) in &edges {
            if let Some(missing) = deps.iter().find(|dep| !edges.contains_key(*dep)) {
                return Err(Error::UnknownTableReference {
                    table: table.clone(),
                    reference: missing.clone(),
                });
            }
        }

        Ok(Self { edges })
    }

    pub fn dependencies(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(table)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Depth-first post-order over all tables, dependencies first.
    ///
    /// Uses an explicit stack with three-state marking so cycles are
    /// reported instead of recursing without bound.
    pub fn topo_order(&self) -> Result<Vec<String>> {
        let mut state: HashMap<&str, VisitState> = HashMap::with_capacity(self.edges.len());
        let mut order = Vec::with_capacity(self.edges.len());

        for (root, root_deps) in &self.edges {
            if state.contains_key(root.as_str()) {
                continue;
            }

            state.insert(root, VisitState::InProgress);
            let mut stack = vec![(root.as_str(), root_deps.iter())];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                match frame.1.next() {
                    Some(dep) => match state.get(dep.as_str()) {
                        Some(VisitState::Done) => {}
                        Some(VisitState::InProgress) => {
                            let start = stack
                                .iter()
                                .position(|(name, _)| *name == dep.as_str())
                                .unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|(name, _)| name.to_string()).collect();
                            cycle.push(dep.clone());
                            return Err(Error::CyclicDependency { cycle });
                        }
                        None => {
                            if let Some(deps) = self.edges.get(dep) {
                                state.insert(dep, VisitState::InProgress);
                                stack.push((dep.as_str(), deps.iter()));
                            }
                        }
                    },
                    None => {
                        state.insert(node, VisitState::Done);
                        order.push(node.to_string());
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }
}

/// Order schemas so every table comes strictly after the tables it depends on.
///
/// The loader's order is only used to break ties; it is never trusted as a
/// dependency order.
pub fn resolve_generation_order(schemas: Vec<TableSchema>) -> Result<Vec<TableSchema>> {
    let graph = DependencyGraph::build(&schemas)?;
    let order = graph.topo_order()?;
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        order = ?order,
        "resolved generation order"
    );

    let mut by_name: HashMap<String, TableSchema> = schemas
        .into_iter()
        .map(|schema| (schema.name.clone(), schema))
        .collect();

    Ok(order
        .iter()
        .filter_map(|name| by_name.remove(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, TableKind};
    use crate::types::CountRange;

    fn master(name: &str, refs: &[&str]) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            kind: TableKind::Master,
            fields: refs
                .iter()
                .map(|target| {
                    FieldDef::new(
                        format!("{target}_id"),
                        FieldType::Ref {
                            table: target.to_string(),
                            field: "id".to_string(),
                        },
                    )
                })
                .collect(),
            layout: TableLayout::Independent { count: 1 },
        }
    }

    fn child(name: &str, parent: &str) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            kind: TableKind::Transactional,
            fields: Vec::new(),
            layout: TableLayout::Child {
                parent: parent.to_string(),
                parent_key: Vec::new(),
                per_parent: CountRange::ONE,
            },
        }
    }

    fn pointer(name: &str, source: &str) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            kind: TableKind::Pointer,
            fields: Vec::new(),
            layout: TableLayout::Pointer {
                source_table: source.to_string(),
                key: vec!["id".to_string()],
                latest_field: "version".to_string(),
            },
        }
    }

    fn names(schemas: &[TableSchema]) -> Vec<&str> {
        schemas.iter().map(|schema| schema.name.as_str()).collect()
    }

    #[test]
    fn dependencies_cover_refs_parent_and_source() {
        let mut lines = child("lines", "orders");
        lines.fields = master("x", &["products"]).fields;
        assert_eq!(
            dependencies_of(&lines).into_iter().collect::<Vec<_>>(),
            vec!["orders".to_string(), "products".to_string()]
        );
        assert_eq!(
            dependencies_of(&pointer("latest", "versions"))
                .into_iter()
                .collect::<Vec<_>>(),
            vec!["versions".to_string()]
        );
    }

    #[test]
    fn order_places_dependencies_first() {
        let schemas = vec![
            pointer("latest_products", "products"),
            child("order_lines", "orders"),
            master("orders", &["users", "products"]),
            master("products", &[]),
            master("users", &[]),
        ];
        let graph = DependencyGraph::build(&schemas).expect("graph");
        let ordered = resolve_generation_order(schemas).expect("order");
        let order = names(&ordered);
        assert_eq!(order.len(), 5);

        for (index, table) in order.iter().enumerate() {
            for dep in graph.dependencies(table).expect("node") {
                let dep_index = order
                    .iter()
                    .position(|name| *name == dep.as_str())
                    .expect("dependency present");
                assert!(dep_index < index, "{dep} must precede {table}");
            }
        }
    }

    #[test]
    fn order_is_stable_for_independent_tables() {
        let schemas = vec![master("b", &[]), master("a", &[]), master("c", &[])];
        let ordered = resolve_generation_order(schemas).expect("order");
        assert_eq!(names(&ordered), vec!["b", "a", "c"]);
    }

    #[test]
    fn mutual_references_are_reported_as_cycle() {
        let schemas = vec![master("a", &["b"]), master("b", &["a"])];
        let err = resolve_generation_order(schemas).unwrap_err();
        match err {
            Error::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let err = resolve_generation_order(vec![master("a", &["a"])]).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let err = resolve_generation_order(vec![child("lines", "orders")]).unwrap_err();
        match err {
            Error::UnknownTableReference { table, reference } => {
                assert_eq!(table, "lines");
                assert_eq!(reference, "orders");
            }
            other => panic!("expected unknown reference, got {other}"),
        }
    }

    #[test]
    fn duplicate_tables_are_rejected() {
        let err = DependencyGraph::build(&[master("a", &[]), master("a", &[])]).unwrap_err();
        assert!(matches!(err, Error::DuplicateTable(name) if name == "a"));
    }

    #[test]
    fn long_chains_do_not_recurse() {
        let depth = 20_000;
        let mut schemas = vec![master("t0", &[])];
        for index in 1..depth {
            let previous = format!("t{}", index - 1);
            schemas.push(master(&format!("t{index}"), &[previous.as_str()]));
        }
        schemas.reverse();

        let ordered = resolve_generation_order(schemas).expect("order");
        assert_eq!(ordered.first().map(|schema| schema.name.as_str()), Some("t0"));
        assert_eq!(ordered.len(), depth);
    }
}
