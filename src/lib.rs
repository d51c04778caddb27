//! smallworld: a concurrent in-memory HNSW index.
//!
//! Hierarchical Navigable Small World graphs (Malkov & Yashunin, 2016) keep
//! the best recall/speed trade-off among in-RAM approximate nearest-neighbor
//! structures. This crate implements the graph engine alone: a layered
//! proximity graph over an opaque vector payload, with thread-safe insert
//! and search, batch ingestion over a channel, and binary snapshots into any
//! byte-keyed key-value store.
//!
//! # Usage
//!
//! ```rust
//! use smallworld::{Euclidean, Hnsw, KeyVec};
//!
//! let index = Hnsw::new(KeyVec::surface(Euclidean));
//! index.insert(KeyVec::new(0, vec![0.0, 0.0]));
//! index.insert(KeyVec::new(1, vec![1.0, 0.0]));
//! index.insert(KeyVec::new(2, vec![0.0, 1.0]));
//!
//! let hits = index.search(&KeyVec::new(0, vec![0.1, 0.1]), 1, 10);
//! assert_eq!(hits[0].key, 0);
//! ```
//!
//! The payload type is anything a [`Surface`] can measure; [`ContraMap`]
//! lifts a surface on raw vectors to key-carrying wrappers like [`KeyVec`].
//!
//! # Concurrency
//!
//! Insert and search take `&self` and may run from any number of threads;
//! share the index behind an `Arc` and use [`Hnsw::pipe`] for parallel bulk
//! loads. Two runs with the same seed can still produce different (equally
//! valid) graphs when inserts interleave differently.
//!
//! # What this crate is not
//!
//! No deletions, no parameter changes after construction, no disk-resident
//! graph, no sharding, no quantization. Snapshots are whole-graph, not
//! incremental.

pub mod codec;
pub mod error;
pub mod hnsw;
pub mod random;
pub mod surface;
pub mod vector;

pub use codec::{KvRead, KvWrite, Wire, ROOT_KEY};
pub use error::{Error, Result};
pub use hnsw::{Config, Hnsw, Pipe, Pointer};
pub use random::RandomSource;
pub use surface::{ContraMap, Cosine, Euclidean, FromFn, Surface};
pub use vector::KeyVec;
