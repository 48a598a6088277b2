use std::collections::{BTreeSet, VecDeque};

/// Directed graph of sink relations between water bodies.
///
/// Vertices and edges live in ordered sets so every traversal is
/// reproducible. Cycles are tolerated.
#[derive(Debug, Clone)]
pub struct Digraph<T> {
    vertices: BTreeSet<T>,
    edges: BTreeSet<(T, T)>,
}

impl<T> Default for Digraph<T> {
    fn default() -> Self {
        Self {
            vertices: BTreeSet::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl<T: Copy + Ord> Digraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = T> + '_ {
        self.vertices.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (T, T)> + '_ {
        self.edges.iter().copied()
    }

    pub fn contains_vertex(&self, vertex: T) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn contains_edge(&self, from: T, to: T) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn add_vertex(&mut self, vertex: T) -> bool {
        self.vertices.insert(vertex)
    }

    /// Removes `vertex` together with every edge touching it.
    pub fn remove_vertex(&mut self, vertex: T) -> bool {
        self.edges.retain(|(from, to)| *from != vertex && *to != vertex);
        self.vertices.remove(&vertex)
    }

    pub fn add_edge(&mut self, from: T, to: T) -> bool {
        self.edges.insert((from, to))
    }

    pub fn remove_edge(&mut self, from: T, to: T) -> bool {
        self.edges.remove(&(from, to))
    }

    pub fn direct_successors(&self, vertex: T) -> Vec<T> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == vertex)
            .map(|(_, to)| *to)
            .collect()
    }

    pub fn direct_predecessors(&self, vertex: T) -> Vec<T> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == vertex)
            .map(|(from, _)| *from)
            .collect()
    }

    /// Number of vertices reachable from `vertex` through one or more edges.
    pub fn count_successors(&self, vertex: T) -> usize {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<T> = self.direct_successors(vertex).into();
        while let Some(next) = queue.pop_front() {
            if visited.insert(next) {
                queue.extend(self.direct_successors(next));
            }
        }
        visited.len()
    }

    /// Vertices with the most transitive successors first; ties keep vertex order.
    pub fn vertices_by_successor_count(&self) -> Vec<T> {
        let mut ranked: Vec<(usize, T)> = self
            .vertices
            .iter()
            .map(|vertex| (self.count_successors(*vertex), *vertex))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.into_iter().map(|(_, vertex)| vertex).collect()
    }
}
