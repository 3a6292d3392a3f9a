//! Foreign-key dependency ordering.
//!
//! Tables are ordered by depth-first post-order over the foreign-key graph so
//! that referenced tables come before the tables that reference them. Cycles
//! cannot be ordered; the edge that closes a cycle is recorded and the
//! referencing table is emitted with a forward reference, which works because
//! foreign-key enforcement is off while the schema is created.

use crate::catalog::MigrationCatalog;
use crate::core::{QualifiedName, Table};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// A foreign-key edge that closes a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CyclicEdge {
    /// Referencing table.
    pub from: QualifiedName,

    /// Referenced table, still being visited when the edge was found.
    pub to: QualifiedName,
}

/// Emission order for a catalog.
#[derive(Debug)]
pub struct ResolvedOrder<'a> {
    /// Every catalog table exactly once.
    pub tables: Vec<&'a Table>,

    pub cyclic_edges: Vec<CyclicEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order the catalog's tables so referenced tables come first.
///
/// Roots are taken in catalog order and edges in foreign-key order, so the
/// result is deterministic. References to tables outside the catalog are not
/// edges.
pub fn resolve(catalog: &MigrationCatalog) -> ResolvedOrder<'_> {
    let tables = catalog.tables();
    let positions: HashMap<&QualifiedName, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.name, i))
        .collect();

    let adjacency: Vec<Vec<usize>> = tables
        .iter()
        .map(|t| {
            t.foreign_keys
                .iter()
                .filter_map(|fk| positions.get(&fk.ref_table).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    let mut cyclic_edges = Vec::new();
    // (node, index of the next edge to explore)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..tables.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            match adjacency[node].get(top.1).copied() {
                Some(next) => {
                    top.1 += 1;
                    match marks[next] {
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                        Mark::InProgress => {
                            let edge = CyclicEdge {
                                from: tables[node].name.clone(),
                                to: tables[next].name.clone(),
                            };
                            if !cyclic_edges.contains(&edge) {
                                warn!(
                                    "Cyclic foreign key {} -> {}: created as a forward reference",
                                    edge.from, edge.to
                                );
                                cyclic_edges.push(edge);
                            }
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    order.push(&tables[node]);
                    stack.pop();
                }
            }
        }
    }

    ResolvedOrder {
        tables: order,
        cyclic_edges,
    }
}
