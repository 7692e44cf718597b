//! Dependency resolution between derived fields and their parents.

use crate::error::CyclicDependencyError;
use crate::form::{Field, FieldId};
use ahash::{AHashMap, AHashSet};
use std::fmt;
use tracing::{debug, warn};

/// A non-fatal problem found while resolving dependencies.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionWarning {
    /// A derived field lists a parent id that is not in the form.
    MissingParent {
        field_id: FieldId,
        label: String,
        parent_id: FieldId,
    },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::MissingParent {
                label, parent_id, ..
            } => write!(
                f,
                "Field '{}' depends on '{}', which no longer exists; it is treated as empty",
                label, parent_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    id: FieldId,
    label: String,
    is_derived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// The parent → child graph of a form's fields.
///
/// Nodes keep the order of the field list they were built from, which makes
/// every traversal deterministic.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    positions: AHashMap<FieldId, usize>,
    parents: AHashMap<FieldId, Vec<FieldId>>,
    children: AHashMap<FieldId, Vec<FieldId>>,
    warnings: Vec<ResolutionWarning>,
}

impl DependencyGraph {
    /// Builds the graph. Parent ids that do not exist are dropped from the
    /// graph and reported as warnings.
    pub fn build(fields: &[Field]) -> Self {
        let positions: AHashMap<FieldId, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id().clone(), i))
            .collect();

        let mut parents: AHashMap<FieldId, Vec<FieldId>> = AHashMap::new();
        let mut children: AHashMap<FieldId, Vec<FieldId>> = AHashMap::new();
        let mut warnings = Vec::new();

        for field in fields {
            for parent_id in field.parent_ids() {
                if !positions.contains_key(parent_id) {
                    warn!(
                        field = field.display_name(),
                        parent = %parent_id,
                        "derived field references a missing parent"
                    );
                    warnings.push(ResolutionWarning::MissingParent {
                        field_id: field.id().clone(),
                        label: field.display_name().to_string(),
                        parent_id: parent_id.clone(),
                    });
                    continue;
                }
                parents
                    .entry(field.id().clone())
                    .or_default()
                    .push(parent_id.clone());
                children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(field.id().clone());
            }
        }

        let nodes = fields
            .iter()
            .map(|f| Node {
                id: f.id().clone(),
                label: f.display_name().to_string(),
                is_derived: f.is_derived(),
            })
            .collect();

        Self {
            nodes,
            positions,
            parents,
            children,
            warnings,
        }
    }

    /// Existing parents of a field, in the order the field lists them.
    pub fn parents_of(&self, id: &FieldId) -> &[FieldId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Fields that directly depend on `id`.
    pub fn children_of(&self, id: &FieldId) -> &[FieldId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.positions.contains_key(id)
    }

    /// Orders all derived fields so that each comes after every parent.
    ///
    /// Ties are broken by position in the field list.
    pub fn order(&self) -> Result<Vec<FieldId>, CyclicDependencyError> {
        let mut marks: AHashMap<&FieldId, Mark> = AHashMap::new();
        let mut stack: Vec<&FieldId> = Vec::new();
        let mut order = Vec::new();

        for node in self.nodes.iter().filter(|n| n.is_derived) {
            self.visit(&node.id, &mut marks, &mut stack, &mut order)?;
        }
        debug!(count = order.len(), "resolved derived field order");
        Ok(order)
    }

    /// Derived fields transitively downstream of `id`, in recomputation order.
    pub fn downstream_of(&self, id: &FieldId) -> Result<Vec<FieldId>, CyclicDependencyError> {
        let mut affected: AHashSet<&FieldId> = AHashSet::new();
        let mut pending: Vec<&FieldId> = self.children_of(id).iter().collect();
        while let Some(next) = pending.pop() {
            if affected.insert(next) {
                pending.extend(self.children_of(next));
            }
        }
        Ok(self
            .order()?
            .into_iter()
            .filter(|id| affected.contains(id))
            .collect())
    }

    fn visit<'a>(
        &'a self,
        id: &'a FieldId,
        marks: &mut AHashMap<&'a FieldId, Mark>,
        stack: &mut Vec<&'a FieldId>,
        order: &mut Vec<FieldId>,
    ) -> Result<(), CyclicDependencyError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(self.cycle_error(stack, id)),
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        stack.push(id);
        for parent in self.parents_of(id) {
            if self.is_derived(parent) {
                self.visit(parent, marks, stack, order)?;
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        order.push(id.clone());
        Ok(())
    }

    fn is_derived(&self, id: &FieldId) -> bool {
        self.positions
            .get(id)
            .is_some_and(|&i| self.nodes[i].is_derived)
    }

    fn label_of(&self, id: &FieldId) -> String {
        self.positions
            .get(id)
            .map(|&i| self.nodes[i].label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Builds the error for a cycle closing at `repeated`.
    fn cycle_error(&self, stack: &[&FieldId], repeated: &FieldId) -> CyclicDependencyError {
        let start = stack.iter().position(|id| *id == repeated).unwrap_or(0);
        let field_ids: Vec<FieldId> = stack[start..]
            .iter()
            .map(|id| (*id).clone())
            .chain(std::iter::once(repeated.clone()))
            .collect();
        let labels = field_ids.iter().map(|id| self.label_of(id)).collect();
        CyclicDependencyError { field_ids, labels }
    }
}

/// The recomputation plan of a form.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Derived field ids in recomputation order.
    pub order: Vec<FieldId>,
    pub warnings: Vec<ResolutionWarning>,
}

/// Resolves the recomputation order of every derived field in `fields`.
pub fn resolve(fields: &[Field]) -> Result<Resolution, CyclicDependencyError> {
    let graph = DependencyGraph::build(fields);
    let order = graph.order()?;
    Ok(Resolution {
        order,
        warnings: graph.warnings,
    })
}
