//! Batch insert through a bounded channel.
//!
//! A pipe owns a set of worker threads, each draining the channel into
//! [`Hnsw::insert`]. Closing the pipe drops the sender, lets the workers
//! drain what is queued, and joins them.

use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::hnsw::Hnsw;
use crate::surface::Surface;

/// Handle to a running batch-insert pipeline.
pub struct Pipe<V> {
    sender: Option<Sender<V>>,
    workers: Vec<JoinHandle<()>>,
}

impl<V> Pipe<V> {
    /// Queues a vector for insertion, blocking while the channel is full.
    pub fn send(&self, v: V) {
        if let Some(sender) = &self.sender {
            // Workers outlive the sender unless one of them panicked.
            sender.send(v).expect("pipe workers terminated");
        }
    }

    /// Closes the channel, drains it, and waits for every worker.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<V> Drop for Pipe<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<V, S> Hnsw<V, S>
where
    V: Send + Sync + 'static,
    S: Surface<V> + Send + Sync + 'static,
{
    /// Opens a bounded channel drained by `workers` insert threads.
    ///
    /// The pipe holds its own handle on the index; clone the `Arc` when the
    /// caller keeps using it directly.
    pub fn pipe(self: Arc<Self>, workers: usize) -> Pipe<V> {
        let workers = workers.max(1);
        let (sender, receiver) = bounded(workers);
        let handles = (0..workers)
            .map(|_| {
                let index = Arc::clone(&self);
                let receiver = receiver.clone();
                thread::spawn(move || {
                    for v in receiver {
                        index.insert(v);
                    }
                })
            })
            .collect();
        Pipe {
            sender: Some(sender),
            workers: handles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::Config;
    use crate::surface::Euclidean;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pipe_inserts_everything_sent() {
        let index = Arc::new(Hnsw::with_random_source(
            Euclidean,
            Config::with_m(4),
            StdRng::seed_from_u64(31),
        ));
        let pipe = Arc::clone(&index).pipe(2);
        for i in 0..200 {
            pipe.send(vec![i as f32, (i * 7 % 13) as f32]);
        }
        pipe.close();
        assert_eq!(index.size(), 200);
    }

    #[test]
    fn dropping_the_pipe_joins_workers() {
        let index = Arc::new(Hnsw::with_random_source(
            Euclidean,
            Config::with_m(4),
            StdRng::seed_from_u64(32),
        ));
        {
            let pipe = Arc::clone(&index).pipe(3);
            for i in 0..50 {
                pipe.send(vec![i as f32]);
            }
        }
        // Drop joined the workers, so every send has landed.
        assert_eq!(index.size(), 50);
    }

    #[test]
    fn zero_workers_still_drains() {
        let index = Arc::new(Hnsw::with_random_source(
            Euclidean,
            Config::with_m(4),
            StdRng::seed_from_u64(33),
        ));
        let pipe = Arc::clone(&index).pipe(0);
        pipe.send(vec![1.0]);
        pipe.close();
        assert_eq!(index.size(), 1);
    }
}
