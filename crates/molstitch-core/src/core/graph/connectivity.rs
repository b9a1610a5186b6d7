use crate::core::models::ids::AtomId;
use crate::core::models::topology::BondOrder;
use slotmap::SecondaryMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;
use thiserror::Error;

/// An undirected graph edge, stored in normalized (smaller id first) form
/// unless it was explicitly directed by a traversal.
pub type Edge = (AtomId, AtomId);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Atom {0:?} is not a node of the connectivity graph")]
    NodeNotFound(AtomId),
    #[error("Atoms {0:?} and {1:?} are not connected by an edge")]
    NotAdjacent(AtomId, AtomId),
    #[error("Cannot rotate around an edge defined by a single node")]
    SameNode,
    #[error("Cannot rotate around a locked edge")]
    LockedEdge,
    #[error("Rotation axis has zero length")]
    DegenerateAxis,
    #[error("Unknown neighbor search mode '{0}'")]
    UnknownMode(String),
}

/// How [`ConnectivityGraph::neighbors_within`] interprets the edge distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborMode {
    /// All neighbors up to `n` edges away.
    #[default]
    Upto,
    /// Only neighbors exactly `n` edges away.
    Exact,
}

impl FromStr for NeighborMode {
    type Err = GraphError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upto" => Ok(Self::Upto),
            "exact" => Ok(Self::Exact),
            _ => Err(GraphError::UnknownMode(s.to_string())),
        }
    }
}

/// Inclusive ancestor/descendant count bounds applied as the final filter of
/// [`ConnectivityGraph::find_rotatable_edges`]. The defaults exclude terminal
/// bonds (a rotation moving zero atoms, or all but one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotatableBounds {
    pub min_descendants: usize,
    pub min_ancestors: usize,
    pub max_descendants: Option<usize>,
    pub max_ancestors: Option<usize>,
}

impl Default for RotatableBounds {
    fn default() -> Self {
        Self {
            min_descendants: 1,
            min_ancestors: 1,
            max_descendants: None,
            max_ancestors: None,
        }
    }
}

impl RotatableBounds {
    fn admits(&self, ancestors: usize, descendants: usize) -> bool {
        descendants >= self.min_descendants
            && ancestors >= self.min_ancestors
            && self.max_descendants.is_none_or(|max| descendants <= max)
            && self.max_ancestors.is_none_or(|max| ancestors <= max)
    }
}

fn normalize(a: AtomId, b: AtomId) -> Edge {
    if a <= b { (a, b) } else { (b, a) }
}

/// Undirected connectivity graph over atom identities.
///
/// Edges carry an integer bond order and may be individually locked against
/// rotation. The graph is owned by a [`Molecule`](crate::core::models::molecule::Molecule)
/// and kept in sync with its bond list; it stores no coordinates itself, so
/// rotations are computed here as node sets and applied by the molecule.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
    orders: HashMap<Edge, BondOrder>,
    locked: HashSet<Edge>,
}

impl ConnectivityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: AtomId) {
        if !self.adjacency.contains_key(id) {
            self.adjacency.insert(id, Vec::new());
        }
    }

    pub fn contains_node(&self, id: AtomId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Removes a node together with every incident edge and lock entry.
    pub fn remove_node(&mut self, id: AtomId) {
        let neighbors = match self.adjacency.remove(id) {
            Some(neighbors) => neighbors,
            None => return,
        };
        for neighbor in neighbors {
            if let Some(adj) = self.adjacency.get_mut(neighbor) {
                adj.retain(|&other| other != id);
            }
            let edge = normalize(id, neighbor);
            self.orders.remove(&edge);
            self.locked.remove(&edge);
        }
    }

    /// Adds an edge between two existing nodes. Idempotent: re-adding an
    /// existing edge keeps its original order.
    pub fn add_edge(&mut self, a: AtomId, b: AtomId, order: BondOrder) -> Result<(), GraphError> {
        if !self.adjacency.contains_key(a) {
            return Err(GraphError::NodeNotFound(a));
        }
        if !self.adjacency.contains_key(b) {
            return Err(GraphError::NodeNotFound(b));
        }
        let edge = normalize(a, b);
        if self.orders.contains_key(&edge) {
            return Ok(());
        }
        self.orders.insert(edge, order);
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        Ok(())
    }

    pub fn remove_edge(&mut self, a: AtomId, b: AtomId) {
        let edge = normalize(a, b);
        if self.orders.remove(&edge).is_none() {
            return;
        }
        self.locked.remove(&edge);
        if let Some(adj) = self.adjacency.get_mut(a) {
            adj.retain(|&other| other != b);
        }
        if let Some(adj) = self.adjacency.get_mut(b) {
            adj.retain(|&other| other != a);
        }
    }

    pub fn has_edge(&self, a: AtomId, b: AtomId) -> bool {
        self.orders.contains_key(&normalize(a, b))
    }

    pub fn edge_order(&self, a: AtomId, b: AtomId) -> Option<BondOrder> {
        self.orders.get(&normalize(a, b)).copied()
    }

    pub fn neighbors(&self, id: AtomId) -> Option<&[AtomId]> {
        self.adjacency.get(id).map(|v| v.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.orders.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.adjacency.keys()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.orders.keys().copied()
    }

    /// Atoms within `n` edges of `node` ("upto") or exactly `n` edges away
    /// ("exact"); undirected breadth-first expansion. The anchor node itself
    /// is never part of the result.
    pub fn neighbors_within(
        &self,
        node: AtomId,
        n: usize,
        mode: NeighborMode,
    ) -> Result<HashSet<AtomId>, GraphError> {
        if !self.adjacency.contains_key(node) {
            return Err(GraphError::NodeNotFound(node));
        }

        let mut result = HashSet::new();
        let mut seen = HashSet::from([node]);
        let mut queue = VecDeque::from([(node, 0usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            if depth == n {
                continue;
            }
            for &neighbor in &self.adjacency[current] {
                if !seen.insert(neighbor) {
                    continue;
                }
                match mode {
                    NeighborMode::Upto => {
                        result.insert(neighbor);
                    }
                    NeighborMode::Exact if depth + 1 == n => {
                        result.insert(neighbor);
                    }
                    NeighborMode::Exact => {}
                }
                queue.push_back((neighbor, depth + 1));
            }
        }
        Ok(result)
    }

    /// All nodes that come after the directed edge a→b, i.e. reachable from
    /// `b` without passing back through `a`. Returns the empty set when `b`
    /// is a leaf relative to `a`.
    pub fn descendants(&self, a: AtomId, b: AtomId) -> Result<HashSet<AtomId>, GraphError> {
        if !self.adjacency.contains_key(a) {
            return Err(GraphError::NodeNotFound(a));
        }
        if !self.adjacency.contains_key(b) {
            return Err(GraphError::NodeNotFound(b));
        }
        if !self.has_edge(a, b) {
            return Err(GraphError::NotAdjacent(a, b));
        }

        let mut result = HashSet::new();
        let mut seen = HashSet::from([a, b]);
        let mut queue: VecDeque<AtomId> = self.adjacency[b]
            .iter()
            .copied()
            .filter(|&id| id != a)
            .collect();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            result.insert(current);
            queue.extend(self.adjacency[current].iter().copied());
        }
        Ok(result)
    }

    /// All nodes that come before the directed edge a→b;
    /// `ancestors(a, b) == descendants(b, a)`.
    pub fn ancestors(&self, a: AtomId, b: AtomId) -> Result<HashSet<AtomId>, GraphError> {
        self.descendants(b, a)
    }

    /// Minimal set of independent rings covering all ring bonds (Paton's
    /// algorithm over a spanning forest).
    pub fn cycle_basis(&self) -> Vec<Vec<AtomId>> {
        let mut cycles = Vec::new();
        let mut remaining: Vec<AtomId> = self.adjacency.keys().collect();
        remaining.sort();
        let mut assigned: HashSet<AtomId> = HashSet::new();

        for &root in &remaining {
            if assigned.contains(&root) {
                continue;
            }
            let mut stack = vec![root];
            let mut pred: HashMap<AtomId, AtomId> = HashMap::from([(root, root)]);
            let mut used: HashMap<AtomId, HashSet<AtomId>> =
                HashMap::from([(root, HashSet::new())]);

            while let Some(z) = stack.pop() {
                let z_used = used[&z].clone();
                for &neighbor in &self.adjacency[z] {
                    if !used.contains_key(&neighbor) {
                        pred.insert(neighbor, z);
                        stack.push(neighbor);
                        used.insert(neighbor, HashSet::from([z]));
                    } else if !z_used.contains(&neighbor) {
                        // Found a cycle: walk predecessors back to the
                        // spanning-tree path of `neighbor`.
                        let path_nodes = &used[&neighbor];
                        let mut cycle = vec![neighbor, z];
                        let mut p = pred[&z];
                        while !path_nodes.contains(&p) && p != neighbor {
                            cycle.push(p);
                            p = pred[&p];
                        }
                        if p != neighbor {
                            cycle.push(p);
                        }
                        cycles.push(cycle);
                        used.get_mut(&neighbor).unwrap().insert(z);
                    }
                }
            }
            assigned.extend(pred.keys().copied());
        }
        cycles
    }

    /// Whether the edge between `a` and `b` lies on any ring of the given
    /// cycle basis.
    pub fn edge_in_cycle(&self, a: AtomId, b: AtomId, cycles: &[Vec<AtomId>]) -> bool {
        cycles
            .iter()
            .any(|cycle| cycle.contains(&a) && cycle.contains(&b))
    }

    /// Depth-first tree edges from `root`, each oriented root→leaf.
    fn dfs_edges(&self, root: AtomId) -> Result<Vec<Edge>, GraphError> {
        if !self.adjacency.contains_key(root) {
            return Err(GraphError::NodeNotFound(root));
        }
        let mut edges = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for &neighbor in self.adjacency[current].iter().rev() {
                if visited.insert(neighbor) {
                    edges.push((current, neighbor));
                    stack.push(neighbor);
                }
            }
        }
        Ok(edges)
    }

    /// Reorients the given edges (all edges if `None`) to point away from
    /// `root`, following a depth-first traversal.
    pub fn direct_edges(
        &self,
        root: AtomId,
        edges: Option<&[Edge]>,
    ) -> Result<Vec<Edge>, GraphError> {
        let subset: Option<HashSet<Edge>> =
            edges.map(|list| list.iter().map(|&(a, b)| normalize(a, b)).collect());
        let directed = self
            .dfs_edges(root)?
            .into_iter()
            .filter(|&(a, b)| match &subset {
                Some(set) => set.contains(&normalize(a, b)),
                None => true,
            })
            .collect();
        Ok(directed)
    }

    /// Finds all rotatable edges: unlocked, single-order, and not part of any
    /// ring (cycle basis computed once per call). If `root` is given, the
    /// result is restricted to edges reachable from it and oriented
    /// root→leaf. The ancestor/descendant bounds are applied last.
    pub fn find_rotatable_edges(
        &self,
        root: Option<AtomId>,
        bounds: &RotatableBounds,
    ) -> Result<Vec<Edge>, GraphError> {
        let cycles = self.cycle_basis();
        let candidates: HashSet<Edge> = self
            .orders
            .iter()
            .filter(|&(&(a, b), &order)| {
                order == BondOrder::Single
                    && !self.locked.contains(&normalize(a, b))
                    && !self.edge_in_cycle(a, b, &cycles)
            })
            .map(|(&edge, _)| edge)
            .collect();

        let mut edges: Vec<Edge> = match root {
            Some(root) => self
                .dfs_edges(root)?
                .into_iter()
                .filter(|&(a, b)| candidates.contains(&normalize(a, b)))
                .collect(),
            None => {
                let mut list: Vec<Edge> = candidates.iter().copied().collect();
                list.sort();
                list
            }
        };

        let mut admitted = Vec::with_capacity(edges.len());
        for edge in edges.drain(..) {
            let descendants = self.descendants(edge.0, edge.1)?.len();
            let ancestors = self.descendants(edge.1, edge.0)?.len();
            if bounds.admits(ancestors, descendants) {
                admitted.push(edge);
            }
        }
        Ok(admitted)
    }

    /// Locks an existing edge, excluding it from rotation. Locking is a
    /// logical restriction independent of cycle membership.
    pub fn lock_edge(&mut self, a: AtomId, b: AtomId) -> Result<(), GraphError> {
        if !self.has_edge(a, b) {
            return Err(GraphError::NotAdjacent(a, b));
        }
        self.locked.insert(normalize(a, b));
        Ok(())
    }

    pub fn unlock_edge(&mut self, a: AtomId, b: AtomId) {
        self.locked.remove(&normalize(a, b));
    }

    pub fn is_locked(&self, a: AtomId, b: AtomId) -> bool {
        self.locked.contains(&normalize(a, b))
    }

    pub fn locked_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.locked.iter().copied()
    }

    pub fn unlocked_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.orders
            .keys()
            .filter(|edge| !self.locked.contains(*edge))
            .copied()
    }

    pub fn lock_all(&mut self) {
        self.locked = self.orders.keys().copied().collect();
    }

    pub fn unlock_all(&mut self) {
        self.locked.clear();
    }

    /// Validates a rotation about the edge n1→n2 and returns the set of
    /// nodes it moves: the descendants of the edge plus `n2` itself, or
    /// every node when `descendants_only` is false. `n2` is the fixed pivot
    /// in either case.
    pub fn rotation_targets(
        &self,
        n1: AtomId,
        n2: AtomId,
        descendants_only: bool,
    ) -> Result<Vec<AtomId>, GraphError> {
        if n1 == n2 {
            return Err(GraphError::SameNode);
        }
        if self.is_locked(n1, n2) {
            return Err(GraphError::LockedEdge);
        }
        if descendants_only {
            let mut targets: Vec<AtomId> = self.descendants(n1, n2)?.into_iter().collect();
            targets.push(n2);
            Ok(targets)
        } else {
            if !self.adjacency.contains_key(n1) {
                return Err(GraphError::NodeNotFound(n1));
            }
            if !self.has_edge(n1, n2) {
                return Err(GraphError::NotAdjacent(n1, n2));
            }
            Ok(self.adjacency.keys().collect())
        }
    }
}
