//! Concurrent Hierarchical Navigable Small World graph.
//!
//! The graph is an append-only arena of nodes addressed by a 32-bit
//! [`Pointer`], plus a per-node stack of adjacency lists, one per layer.
//! Every node lives on layer 0; each next layer keeps an exponentially
//! thinner sample, so a search can descend from a sparse top layer to the
//! dense bottom in logarithmic expected time.
//!
//! # Storage layout
//!
//! Vectors and adjacency are stored struct-of-arrays:
//!
//! - the vector arena (`Vec<Arc<V>>`), the entry point and the level counter
//!   sit under one core read-write lock;
//! - adjacency lists are sharded across [`STRIPES`] read-write locks by
//!   `addr % STRIPES`. Each stripe *owns* the lists of its nodes, so the
//!   lock-protects-data relationship is structural, not a convention.
//!
//! Lock discipline: the core lock is acquired before any stripe lock, never
//! the other way around, and at most one stripe is held at a time. Distance
//! computations always run on copied adjacency, never on a borrow held
//! across a lock boundary.

pub(crate) mod queue;
pub(crate) mod visited;

mod codec;
mod insert;
mod iter;
mod pipe;
mod search;

pub use pipe::Pipe;

use crate::random::{default_source, RandomSource};
use crate::surface::Surface;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use std::sync::Arc;

/// Stable index of a node in the arena. Pointer 0 is an ordinary node;
/// emptiness is `size() == 0`, not a sentinel.
pub type Pointer = u32;

/// Neighbor list at a single layer.
pub(crate) type Neighbors = SmallVec<[Pointer; 16]>;

/// Per-layer adjacency of one node; the node exists on layers `0..len()`.
pub(crate) type Connections = Vec<Neighbors>;

/// Width of the striped lock array. Power of two so the stripe of a pointer
/// is a mask, not a division.
pub(crate) const STRIPES: usize = 1024;

#[inline]
pub(crate) fn stripe(addr: Pointer) -> usize {
    addr as usize & (STRIPES - 1)
}

#[inline]
pub(crate) fn slot(addr: Pointer) -> usize {
    addr as usize / STRIPES
}

/// Construction parameters. Immutable once the index exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Candidate beam width during construction. Typical 100..500.
    pub ef_construction: usize,
    /// Degree cap per node on layers above 0. Typical 5..48.
    pub m: usize,
    /// Degree cap on layer 0, usually `2 * m`.
    pub m0: usize,
    /// Scale of the exponential level distribution, usually `1 / log2(m)`.
    pub m_l: f64,
}

impl Config {
    /// Derives `m0` and `m_l` from the degree cap, the usual way to tune.
    pub fn with_m(m: usize) -> Self {
        Self {
            ef_construction: 200,
            m,
            m0: m * 2,
            m_l: 1.0 / (m as f64).log2(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_m(16)
    }
}

/// State guarded by the core lock: the vector arena, the entry point, and
/// the level counter (one past the highest occupied layer).
struct Core<V> {
    heap: Vec<Arc<V>>,
    head: Pointer,
    level: usize,
}

/// Adjacency shard: connection stacks of every node whose pointer falls in
/// this stripe, indexed by `addr / STRIPES`.
#[derive(Default)]
struct Shard {
    nodes: Vec<Connections>,
}

impl Shard {
    /// Slot for `addr / STRIPES`, growing the shard if concurrent inserts
    /// published a later pointer of this stripe first.
    fn slot_mut(&mut self, slot: usize) -> &mut Connections {
        if slot >= self.nodes.len() {
            self.nodes.resize_with(slot + 1, Connections::new);
        }
        &mut self.nodes[slot]
    }
}

/// Concurrent HNSW index over an opaque vector payload `V`.
///
/// Inserts and searches are thread-safe through `&self`; share the index
/// behind an [`Arc`] to run them from several threads.
pub struct Hnsw<V, S> {
    config: Config,
    surface: S,
    core: RwLock<Core<V>>,
    stripes: Box<[RwLock<Shard>]>,
    random: Mutex<Box<dyn RandomSource>>,
}

impl<V, S: Surface<V>> Hnsw<V, S> {
    /// Index with default parameters and an entropy-seeded random source.
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, Config::default())
    }

    pub fn with_config(surface: S, config: Config) -> Self {
        Self::with_random_source(surface, config, default_source())
    }

    /// Full constructor; a seeded `source` makes level assignment
    /// reproducible (the graph itself still depends on insert interleaving).
    pub fn with_random_source(
        surface: S,
        config: Config,
        source: impl RandomSource + 'static,
    ) -> Self {
        let stripes: Vec<RwLock<Shard>> =
            (0..STRIPES).map(|_| RwLock::new(Shard::default())).collect();
        Self {
            config,
            surface,
            core: RwLock::new(Core {
                heap: Vec::new(),
                head: 0,
                level: 0,
            }),
            stripes: stripes.into_boxed_slice(),
            random: Mutex::new(Box::new(source)),
        }
    }

    /// Number of nodes in the arena.
    pub fn size(&self) -> usize {
        self.core.read().heap.len()
    }

    /// One past the highest occupied layer; 0 when the index is empty.
    pub fn level(&self) -> usize {
        self.core.read().level
    }

    /// Vector of the current entry point, `None` when the index is empty.
    pub fn head(&self) -> Option<V>
    where
        V: Clone,
    {
        let core = self.core.read();
        core.heap
            .get(core.head as usize)
            .map(|v| v.as_ref().clone())
    }

    /// Surface passthrough.
    pub fn distance(&self, a: &V, b: &V) -> f32 {
        self.surface.distance(a, b)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copy of the adjacency of `addr` at `level`; empty when the node does
    /// not reach that layer.
    pub fn connections(&self, addr: Pointer, level: usize) -> Vec<Pointer> {
        self.neighbors(addr, level).to_vec()
    }

    /// Number of layers `addr` exists on (its top layer plus one).
    pub fn rank(&self, addr: Pointer) -> usize {
        let shard = self.stripes[stripe(addr)].read();
        shard.nodes.get(slot(addr)).map(|c| c.len()).unwrap_or(0)
    }

    /// Head, level and size under a single core read.
    pub(crate) fn snapshot(&self) -> (Pointer, usize, usize) {
        let core = self.core.read();
        (core.head, core.level, core.heap.len())
    }

    pub(crate) fn vector(&self, addr: Pointer) -> Arc<V> {
        self.core.read().heap[addr as usize].clone()
    }

    pub(crate) fn neighbors(&self, addr: Pointer, level: usize) -> Neighbors {
        let shard = self.stripes[stripe(addr)].read();
        shard
            .nodes
            .get(slot(addr))
            .and_then(|c| c.get(level))
            .cloned()
            .unwrap_or_default()
    }

    /// Samples the top layer of a new node: `floor(-log2(U) * m_l)` with
    /// uniform `U` in `(0, 1)`; the measure-zero endpoints are resampled.
    pub(crate) fn random_level(&self) -> usize {
        let mut random = self.random.lock();
        loop {
            let u = random.next_i63() as f64 / (1u64 << 63) as f64;
            if u > 0.0 && u < 1.0 {
                return (-u.log2() * self.config.m_l).floor() as usize;
            }
        }
    }
}
