//! Insertion: level sampling, neighborhood construction, bidirectional
//! linking, and degree-cap shrinking.

use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::hnsw::queue::{into_ascending, Farthest, Vertex};
use crate::hnsw::{slot, stripe, Connections, Hnsw, Neighbors, Pointer};
use crate::surface::Surface;

impl<V, S: Surface<V>> Hnsw<V, S> {
    /// Inserts a vector.
    ///
    /// The node is assigned the next pointer in the arena and linked on
    /// layers `0..=L` for a sampled level `L`. Edges are bidirectional on a
    /// best-effort basis: every neighbor gets a back-link, but a later
    /// shrink on either side may drop one direction.
    pub fn insert(&self, v: V) {
        let level = self.random_level();
        let vector = Arc::new(v);

        // First insert claims the arena under the core write lock.
        if self.core.read().heap.is_empty() {
            let mut core = self.core.write();
            if core.heap.is_empty() {
                core.heap.push(vector);
                core.head = 0;
                core.level = level + 1;
                let mut shard = self.stripes[stripe(0)].write();
                *shard.slot_mut(slot(0)) = vec![Neighbors::new(); level + 1];
                return;
            }
        }

        let (mut entry, graph_level) = {
            let core = self.core.read();
            (core.head, core.level)
        };

        // Ride the layers above the target level down to a good entry.
        for lvl in (level + 1..graph_level).rev() {
            entry = self.skip(lvl, entry, &vector);
        }

        // Collect the closest M per layer; the beam keeps ef_construction
        // candidates and the farthest are dropped first.
        let top = level.min(graph_level - 1);
        let mut connections: Connections = vec![Neighbors::new(); level + 1];
        for lvl in (0..=top).rev() {
            let cap = self.layer_cap(lvl);
            let mut w = self.search_layer(lvl, entry, &vector, self.config.ef_construction);
            while w.len() > cap {
                w.pop();
            }
            connections[lvl] = into_ascending(w).iter().map(|v| v.addr).collect();
        }

        // Publish the node; its pointer is the pre-insertion arena length.
        let addr = {
            let mut core = self.core.write();
            let addr = core.heap.len() as Pointer;
            let mut shard = self.stripes[stripe(addr)].write();
            core.heap.push(Arc::clone(&vector));
            *shard.slot_mut(slot(addr)) = connections.clone();
            addr
        };

        for (lvl, edges) in connections.iter().enumerate() {
            for &e in edges.iter() {
                self.add_connection(lvl, e, addr);
            }
        }

        for (lvl, edges) in connections.iter().enumerate() {
            let cap = self.layer_cap(lvl);
            for &e in edges.iter() {
                self.shrink(lvl, e, cap, addr, &vector);
            }
        }

        // A node that out-levels the graph becomes the new entry point. Two
        // racing inserts may both qualify; the higher one wins here.
        let mut core = self.core.write();
        if level + 1 > core.level {
            core.level = level + 1;
            core.head = addr;
        }
    }

    #[inline]
    fn layer_cap(&self, level: usize) -> usize {
        if level == 0 {
            self.config.m0
        } else {
            self.config.m
        }
    }

    /// Appends `dst` to the adjacency of `src` at `level`.
    fn add_connection(&self, level: usize, src: Pointer, dst: Pointer) {
        let mut shard = self.stripes[stripe(src)].write();
        let node = shard.slot_mut(slot(src));
        if node.len() <= level {
            node.resize_with(level + 1, Neighbors::new);
        }
        node[level].push(dst);
    }

    /// Re-caps the adjacency of `addr` at `level` after a back-link pushed
    /// it over `cap`, keeping the closest survivors in ascending order.
    fn shrink(&self, level: usize, addr: Pointer, cap: usize, fresh: Pointer, fresh_vector: &V) {
        let current = self.neighbors(addr, level);
        if current.len() <= cap {
            return;
        }

        let base = self.vector(addr);
        let mut kept: BinaryHeap<Farthest> = BinaryHeap::with_capacity(current.len());
        for &n in current.iter() {
            if n == fresh {
                continue;
            }
            kept.push(Farthest(Vertex {
                distance: self.surface.distance(&base, &self.vector(n)),
                addr: n,
            }));
        }
        while kept.len() > cap - 1 {
            kept.pop();
        }

        // The freshly linked node survives unconditionally: dropping it here
        // could sever the only path into it.
        kept.push(Farthest(Vertex {
            distance: self.surface.distance(&base, fresh_vector),
            addr: fresh,
        }));

        let pruned: Neighbors = into_ascending(kept).iter().map(|v| v.addr).collect();
        let mut shard = self.stripes[stripe(addr)].write();
        let node = shard.slot_mut(slot(addr));
        if node.len() > level {
            node[level] = pruned;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hnsw::{Config, Hnsw, Pointer};
    use crate::surface::Euclidean;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn index(m: usize) -> Hnsw<Vec<f32>, Euclidean> {
        Hnsw::with_random_source(Euclidean, Config::with_m(m), StdRng::seed_from_u64(11))
    }

    #[test]
    fn pointers_follow_insert_order() {
        let h = index(4);
        for i in 0..10 {
            h.insert(vec![i as f32]);
        }
        assert_eq!(h.size(), 10);
        for addr in 0..10u32 {
            assert_eq!(h.vector(addr).as_ref(), &vec![addr as f32]);
        }
    }

    #[test]
    fn degree_caps_hold() {
        let h = index(4);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..300 {
            h.insert((0..8).map(|_| rng.gen_range(-1.0..1.0)).collect());
        }
        let config = *h.config();
        for addr in 0..h.size() as Pointer {
            for level in 0..h.rank(addr) {
                let cap = if level == 0 { config.m0 } else { config.m };
                let edges = h.connections(addr, level);
                assert!(
                    edges.len() <= cap,
                    "node {addr} layer {level} holds {} edges, cap {cap}",
                    edges.len()
                );
            }
        }
    }

    #[test]
    fn no_self_loops_and_pointers_in_range() {
        let h = index(4);
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..200 {
            h.insert((0..4).map(|_| rng.gen_range(-1.0..1.0)).collect());
        }
        let size = h.size() as Pointer;
        for addr in 0..size {
            for level in 0..h.rank(addr) {
                for e in h.connections(addr, level) {
                    assert_ne!(e, addr, "self-loop at node {addr} layer {level}");
                    assert!(e < size, "dangling pointer {e} at node {addr}");
                }
            }
        }
    }

    #[test]
    fn linking_is_bidirectional_below_the_caps() {
        // With few nodes nothing gets shrunk, so every edge must have its
        // reverse.
        let h = index(8);
        for i in 0..10 {
            h.insert(vec![i as f32, 0.0]);
        }
        for addr in 0..h.size() as Pointer {
            for level in 0..h.rank(addr) {
                for e in h.connections(addr, level) {
                    assert!(
                        h.connections(e, level).contains(&addr),
                        "edge {addr}->{e} at layer {level} lacks its reverse"
                    );
                }
            }
        }
    }

    #[test]
    fn duplicate_vectors_get_fresh_pointers() {
        let h = index(4);
        h.insert(vec![1.0, 1.0]);
        h.insert(vec![1.0, 1.0]);
        assert_eq!(h.size(), 2);
        let found = h.search(&vec![1.0, 1.0], 2, 50);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn head_tracks_highest_node() {
        let h = index(4);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            h.insert((0..2).map(|_| rng.gen_range(-1.0..1.0)).collect());
        }
        // The entry point must carry the maximum rank in the arena.
        let max_rank = (0..h.size() as Pointer).map(|a| h.rank(a)).max().unwrap();
        assert_eq!(h.level(), max_rank);
        let head = h.head().unwrap();
        let head_addr = (0..h.size() as Pointer)
            .find(|&a| h.vector(a).as_ref() == &head && h.rank(a) == max_rank);
        assert!(head_addr.is_some(), "head does not reach the top layer");
    }
}
