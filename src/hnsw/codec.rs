//! Snapshot I/O for the graph.
//!
//! `write` freezes the whole structure (core lock plus every stripe, all
//! exclusive) and emits header and node records; `read` rebuilds a freshly
//! constructed index from them. A write followed by a read reproduces the
//! entry point, the level, every vector and every adjacency list.

use std::sync::Arc;

use crate::codec::{decode_node, encode_node, node_key, Header, KvRead, KvWrite, Wire, ROOT_KEY};
use crate::error::{Error, Result};
use crate::hnsw::{slot, stripe, Connections, Hnsw, Pointer};
use crate::surface::Surface;

impl<V, S: Surface<V>> Hnsw<V, S> {
    /// Writes a consistent snapshot into `store`.
    pub fn write<W: KvWrite>(&self, store: &mut W) -> Result<()>
    where
        V: Wire,
    {
        let core = self.core.write();
        let shards: Vec<_> = self.stripes.iter().map(|s| s.write()).collect();

        let header = Header {
            ef_construction: self.config.ef_construction as u32,
            m: self.config.m as u32,
            m0: self.config.m0 as u32,
            m_l: self.config.m_l,
            size: core.heap.len() as u32,
            head: core.head,
            level: core.level as u32,
        };
        store.put(ROOT_KEY, &header.encode())?;

        let empty = Connections::new();
        let mut buf = Vec::new();
        for (addr, vector) in core.heap.iter().enumerate() {
            let addr = addr as Pointer;
            let connections = shards[stripe(addr)]
                .nodes
                .get(slot(addr))
                .unwrap_or(&empty);
            buf.clear();
            encode_node(connections, vector.as_ref(), &mut buf);
            store.put(&node_key(addr), &buf)?;
        }
        Ok(())
    }

    /// Replaces this index with the snapshot in `store`.
    ///
    /// Config fields are restored from the header; pointers are range-checked
    /// against the recorded size.
    pub fn read<R: KvRead>(&mut self, store: &R) -> Result<()>
    where
        V: Wire,
    {
        let bytes = store
            .get(ROOT_KEY)?
            .ok_or_else(|| Error::Codec("missing header record".into()))?;
        let header = Header::decode(&bytes)?;
        if header.size > 0 && header.head >= header.size {
            return Err(Error::PointerOutOfRange {
                addr: header.head,
                size: header.size,
            });
        }

        for shard in self.stripes.iter_mut() {
            shard.get_mut().nodes.clear();
        }
        let core = self.core.get_mut();
        core.heap.clear();
        core.heap.reserve(header.size as usize);

        for addr in 0..header.size {
            let bytes = store
                .get(&node_key(addr))?
                .ok_or_else(|| Error::Codec(format!("missing record for node {addr}")))?;
            let (connections, vector) = decode_node::<V>(&bytes)?;
            for layer in &connections {
                for &p in layer {
                    if p >= header.size {
                        return Err(Error::PointerOutOfRange {
                            addr: p,
                            size: header.size,
                        });
                    }
                }
            }
            core.heap.push(Arc::new(vector));
            *self.stripes[stripe(addr)].get_mut().slot_mut(slot(addr)) = connections;
        }

        let core = self.core.get_mut();
        core.head = header.head;
        core.level = header.level as usize;
        self.config.ef_construction = header.ef_construction as usize;
        self.config.m = header.m as usize;
        self.config.m0 = header.m0 as usize;
        self.config.m_l = header.m_l;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{KvRead, KvWrite};
    use crate::hnsw::{Config, Hnsw};
    use crate::surface::Euclidean;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStore {
        records: HashMap<Vec<u8>, Vec<u8>>,
    }

    impl KvRead for MemStore {
        fn get(&self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
            Ok(self.records.get(key).cloned())
        }
    }

    impl KvWrite for MemStore {
        fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
            self.records.insert(key.to_vec(), value.to_vec());
            Ok(())
        }
    }

    #[test]
    fn empty_index_roundtrips() {
        let mut store = MemStore::default();
        let fresh: Hnsw<Vec<f32>, Euclidean> = Hnsw::new(Euclidean);
        fresh.write(&mut store).unwrap();

        let mut reread: Hnsw<Vec<f32>, Euclidean> = Hnsw::with_config(Euclidean, Config::with_m(4));
        reread.read(&store).unwrap();
        assert_eq!(reread.size(), 0);
        assert_eq!(reread.level(), 0);
    }

    #[test]
    fn small_graph_roundtrips_exactly() {
        let index: Hnsw<Vec<f32>, Euclidean> =
            Hnsw::with_random_source(Euclidean, Config::with_m(4), StdRng::seed_from_u64(1));
        for i in 0..40 {
            index.insert(vec![i as f32, (i % 7) as f32]);
        }
        let mut store = MemStore::default();
        index.write(&mut store).unwrap();

        let mut reread: Hnsw<Vec<f32>, Euclidean> = Hnsw::new(Euclidean);
        reread.read(&store).unwrap();

        assert_eq!(reread.size(), index.size());
        assert_eq!(reread.level(), index.level());
        assert_eq!(reread.head(), index.head());
        assert_eq!(reread.config(), index.config());
        for addr in 0..index.size() as u32 {
            assert_eq!(reread.rank(addr), index.rank(addr));
            for level in 0..index.rank(addr) {
                assert_eq!(reread.connections(addr, level), index.connections(addr, level));
            }
        }
    }

    #[test]
    fn missing_header_is_a_codec_error() {
        let store = MemStore::default();
        let mut index: Hnsw<Vec<f32>, Euclidean> = Hnsw::new(Euclidean);
        let err = index.read(&store).unwrap_err();
        assert!(err.to_string().contains("header"));
    }
}
