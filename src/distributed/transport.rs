use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::distributed::context::DistributedContext;
use crate::distributed::tags::Tag;
use crate::foundation::error::{CompositeError, CompositeResult};

/// Point-to-point transport between ranks.
///
/// Sends are buffered and return immediately; receives block until a message with the given
/// source and tag arrives. Messages between one pair of ranks with the same tag are delivered in
/// send order.
pub trait Communicator: Send + Sync {
    /// Queue `payload` for rank `dest`.
    fn send(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> CompositeResult<()>;

    /// Block until the message from `src` tagged `tag` arrives.
    fn recv(&self, src: usize, tag: Tag) -> CompositeResult<Vec<u8>>;

    /// Block until every rank has reached the barrier.
    fn barrier(&self) -> CompositeResult<()>;
}

/// Options for [`LocalCluster`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClusterOpts {
    /// Fail a receive or barrier after this long instead of blocking forever.
    pub recv_timeout: Option<Duration>,
}

// Reusable barrier that can give up; a rank that times out withdraws its arrival.
struct RankBarrier {
    size: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
}

impl RankBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Returns `false` when `timeout` passed before every rank arrived.
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut st = self.state.lock();
        let generation = st.generation;
        st.arrived += 1;
        if st.arrived == self.size {
            st.arrived = 0;
            st.generation = st.generation.wrapping_add(1);
            self.cvar.notify_all();
            return true;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        while st.generation == generation {
            match deadline {
                Some(d) => {
                    let timed_out = self.cvar.wait_until(&mut st, d).timed_out();
                    if timed_out && st.generation == generation {
                        st.arrived -= 1;
                        return false;
                    }
                }
                None => self.cvar.wait(&mut st),
            }
        }
        true
    }
}

struct Envelope {
    src: usize,
    tag: Tag,
    payload: Vec<u8>,
}

struct Inbox {
    rx: mpsc::Receiver<Envelope>,
    // Messages that arrived before anyone asked for them.
    stash: HashMap<(usize, Tag), VecDeque<Vec<u8>>>,
}

/// One rank's endpoint of an in-process [`LocalCluster`].
pub struct LocalComm {
    rank: usize,
    outboxes: Vec<mpsc::Sender<Envelope>>,
    inbox: Mutex<Inbox>,
    barrier: Arc<RankBarrier>,
    recv_timeout: Option<Duration>,
}

impl Communicator for LocalComm {
    fn send(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> CompositeResult<()> {
        let tx = self.outboxes.get(dest).ok_or_else(|| {
            CompositeError::transport(format!("rank {} sent to unknown rank {dest}", self.rank))
        })?;
        tx.send(Envelope {
            src: self.rank,
            tag,
            payload,
        })
        .map_err(|_| CompositeError::transport(format!("rank {dest} is gone")))
    }

    fn recv(&self, src: usize, tag: Tag) -> CompositeResult<Vec<u8>> {
        if src >= self.outboxes.len() {
            return Err(CompositeError::transport(format!(
                "rank {} receives from unknown rank {src}",
                self.rank
            )));
        }

        let mut inbox = self.inbox.lock();
        if let Some(queue) = inbox.stash.get_mut(&(src, tag))
            && let Some(payload) = queue.pop_front()
        {
            return Ok(payload);
        }

        loop {
            let env = match self.recv_timeout {
                Some(t) => inbox.rx.recv_timeout(t).map_err(|e| {
                    CompositeError::transport(format!(
                        "rank {} waiting for {tag:?} from {src}: {e}",
                        self.rank
                    ))
                })?,
                None => inbox.rx.recv().map_err(|e| {
                    CompositeError::transport(format!(
                        "rank {} waiting for {tag:?} from {src}: {e}",
                        self.rank
                    ))
                })?,
            };
            if env.src == src && env.tag == tag {
                return Ok(env.payload);
            }
            inbox
                .stash
                .entry((env.src, env.tag))
                .or_default()
                .push_back(env.payload);
        }
    }

    fn barrier(&self) -> CompositeResult<()> {
        if self.barrier.wait(self.recv_timeout) {
            Ok(())
        } else {
            Err(CompositeError::transport(format!(
                "rank {} timed out at barrier",
                self.rank
            )))
        }
    }
}

/// In-process cluster: one mailbox per rank plus a shared barrier.
pub struct LocalCluster;

impl LocalCluster {
    /// Endpoints for `size` ranks, index = rank.
    pub fn endpoints(size: usize, opts: LocalClusterOpts) -> CompositeResult<Vec<LocalComm>> {
        if size == 0 {
            return Err(CompositeError::validation("cluster needs at least one rank"));
        }
        let (txs, rxs): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel::<Envelope>()).unzip();
        let barrier = Arc::new(RankBarrier::new(size));
        Ok(rxs
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| LocalComm {
                rank,
                outboxes: txs.clone(),
                inbox: Mutex::new(Inbox {
                    rx,
                    stash: HashMap::new(),
                }),
                barrier: barrier.clone(),
                recv_timeout: opts.recv_timeout,
            })
            .collect())
    }

    /// Contexts for `size` ranks sharing one in-process transport.
    pub fn contexts(
        size: usize,
        opts: LocalClusterOpts,
    ) -> CompositeResult<Vec<DistributedContext>> {
        Self::endpoints(size, opts)?
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| DistributedContext::new(rank, size, Arc::new(comm)))
            .collect()
    }

    /// Run `rank_fn` on `size` threads, one per rank, and collect the results in rank order.
    pub fn run<T, F>(size: usize, opts: LocalClusterOpts, rank_fn: F) -> CompositeResult<Vec<T>>
    where
        T: Send,
        F: Fn(&DistributedContext) -> CompositeResult<T> + Sync,
    {
        let contexts = Self::contexts(size, opts)?;
        let rank_fn = &rank_fn;
        std::thread::scope(|s| {
            let handles: Vec<_> = contexts
                .into_iter()
                .map(|ctx| s.spawn(move || rank_fn(&ctx)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| {
                    h.join().map_err(|_| {
                        CompositeError::transport(format!("rank {rank} thread panicked"))
                    })?
                })
                .collect()
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/distributed/transport.rs"]
mod tests;
