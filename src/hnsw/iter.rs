//! Iteration over one layer of the graph.
//!
//! `fmap` scans the arena linearly; `for_all` walks breadth-first from the
//! entry point, so it only sees what is reachable. Both hand the visitor the
//! node's rank (its layer count), its vector, and the vectors of its
//! neighbors at the requested layer.
//!
//! Iteration reads live state; run it on a quiescent index if a consistent
//! snapshot matters.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::hnsw::visited::VisitedSet;
use crate::hnsw::{slot, stripe, Hnsw, Pointer};
use crate::surface::Surface;

impl<V, S: Surface<V>> Hnsw<V, S> {
    /// Linear scan over every node that exists on `level`.
    ///
    /// A level at or above the graph's top visits nothing. The first visitor
    /// error aborts the scan.
    pub fn fmap<E, F>(&self, level: usize, mut visit: F) -> Result<(), E>
    where
        F: FnMut(usize, &V, &[&V]) -> Result<(), E>,
    {
        let size = self.size();
        for addr in 0..size as Pointer {
            let (rank, edges) = self.layer_view(addr, level);
            if rank > level {
                self.visit_node(rank, addr, &edges, &mut visit)?;
            }
        }
        Ok(())
    }

    /// Breadth-first walk from the entry point restricted to `level`.
    pub fn for_all<E, F>(&self, level: usize, mut visit: F) -> Result<(), E>
    where
        F: FnMut(usize, &V, &[&V]) -> Result<(), E>,
    {
        let (head, graph_level, size) = self.snapshot();
        if size == 0 || level >= graph_level {
            return Ok(());
        }

        let mut visited = VisitedSet::with_capacity(size);
        let mut frontier = VecDeque::new();
        visited.insert(head);
        frontier.push_back(head);

        while let Some(addr) = frontier.pop_front() {
            let (rank, edges) = self.layer_view(addr, level);
            self.visit_node(rank, addr, &edges, &mut visit)?;
            for &e in edges.iter() {
                if visited.insert(e) {
                    frontier.push_back(e);
                }
            }
        }
        Ok(())
    }

    /// Rank and copied layer adjacency of one node.
    fn layer_view(&self, addr: Pointer, level: usize) -> (usize, Vec<Pointer>) {
        let shard = self.stripes[stripe(addr)].read();
        match shard.nodes.get(slot(addr)) {
            Some(c) => (
                c.len(),
                c.get(level).map(|n| n.to_vec()).unwrap_or_default(),
            ),
            None => (0, Vec::new()),
        }
    }

    fn visit_node<E, F>(
        &self,
        rank: usize,
        addr: Pointer,
        edges: &[Pointer],
        visit: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(usize, &V, &[&V]) -> Result<(), E>,
    {
        let node = self.vector(addr);
        let vectors: Vec<Arc<V>> = edges.iter().map(|&e| self.vector(e)).collect();
        let refs: Vec<&V> = vectors.iter().map(|a| a.as_ref()).collect();
        visit(rank, &node, &refs)
    }
}
