//! Layer search primitives and K-nearest query.
//!
//! Two building blocks drive both insert and search: `skip`, a greedy
//! hill-climb that rides a single layer to a local minimum, and
//! `search_layer`, a bounded best-first beam over one layer.

use std::collections::BinaryHeap;

use crate::hnsw::queue::{into_ascending, Farthest, Nearest, Vertex};
use crate::hnsw::visited::VisitedSet;
use crate::hnsw::{Hnsw, Pointer};
use crate::surface::Surface;

impl<V, S: Surface<V>> Hnsw<V, S> {
    /// Greedy descent on one layer: move to the closest neighbor while any
    /// neighbor improves on the current node, stop at the local minimum.
    pub(crate) fn skip(&self, level: usize, start: Pointer, q: &V) -> Pointer {
        let mut addr = start;
        loop {
            let next = self.skip_to_nearest(level, addr, q);
            if next == addr {
                return addr;
            }
            addr = next;
        }
    }

    /// One hill-climb step; returns the input address when no neighbor is
    /// strictly closer.
    fn skip_to_nearest(&self, level: usize, addr: Pointer, q: &V) -> Pointer {
        let mut best = addr;
        let mut dist = self.surface.distance(&self.vector(addr), q);

        for e in self.neighbors(addr, level) {
            let d = self.surface.distance(&self.vector(e), q);
            if d < dist {
                dist = d;
                best = e;
            }
        }

        best
    }

    /// Bounded best-first search on one layer.
    ///
    /// Returns a farthest-first heap of at most `ef` vertices: the frontier
    /// pops nearest-first, the result set evicts its farthest member when a
    /// closer vertex arrives, and the walk stops once the nearest open
    /// candidate is farther than the worst kept result.
    pub(crate) fn search_layer(
        &self,
        level: usize,
        entry: Pointer,
        q: &V,
        ef: usize,
    ) -> BinaryHeap<Farthest> {
        let mut visited = VisitedSet::with_capacity(ef.max(64));
        visited.insert(entry);

        let seed = Vertex {
            distance: self.surface.distance(&self.vector(entry), q),
            addr: entry,
        };
        let mut candidates: BinaryHeap<Nearest> = BinaryHeap::with_capacity(ef + 1);
        let mut results: BinaryHeap<Farthest> = BinaryHeap::with_capacity(ef + 1);
        candidates.push(Nearest(seed));
        results.push(Farthest(seed));

        while let Some(Nearest(c)) = candidates.pop() {
            let farthest = match results.peek() {
                Some(Farthest(f)) => f.distance,
                None => break,
            };
            if c.distance > farthest {
                break;
            }

            for e in self.neighbors(c.addr, level) {
                if visited.contains(e) {
                    continue;
                }
                visited.insert(e);
                let item = Vertex {
                    distance: self.surface.distance(&self.vector(e), q),
                    addr: e,
                };
                if results.len() < ef {
                    // The entry already seeded the result set; pushing it
                    // again would duplicate it.
                    if e != entry {
                        results.push(Farthest(item));
                    }
                    candidates.push(Nearest(item));
                } else if results
                    .peek()
                    .is_some_and(|Farthest(f)| item.distance < f.distance)
                {
                    results.push(Farthest(item));
                    results.pop();
                    candidates.push(Nearest(item));
                }
            }
        }

        results
    }

    /// K nearest vectors to `q`, ascending by distance.
    ///
    /// `ef_search` bounds the layer-0 beam; the empty index yields an empty
    /// list, and `k` larger than the index returns what exists.
    pub fn search(&self, q: &V, k: usize, ef_search: usize) -> Vec<V>
    where
        V: Clone,
    {
        let (head, level, size) = self.snapshot();
        if size == 0 || k == 0 {
            return Vec::new();
        }

        let mut entry = head;
        for lvl in (0..level).rev() {
            entry = self.skip(lvl, entry, q);
        }

        let mut w = self.search_layer(0, entry, q, ef_search);
        while w.len() > k {
            w.pop();
        }

        into_ascending(w)
            .iter()
            .map(|v| self.vector(v.addr).as_ref().clone())
            .collect()
    }
}
