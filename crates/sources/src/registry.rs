//! The TCP client registry.
//!
//! Owned by the listener: a client is inserted once its socket is
//! configured, removed on disconnect, read error or stop, and `shutdown`
//! cancels every live client exactly once. The registry also keeps each
//! client's task handle so `stop` can wait for the sockets to actually
//! close before returning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    clients: Mutex<HashMap<u64, Client>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct Client {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return its opaque id.
    pub(crate) fn insert(&self, token: CancellationToken) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .clients
            .lock()
            .expect("client registry lock")
            .insert(id, Client { token, task: None });
        id
    }

    /// Record the client's task handle; a no-op when the client already
    /// disconnected between spawn and this call.
    pub(crate) fn attach_task(&self, id: u64, task: JoinHandle<()>) {
        if let Some(client) = self
            .inner
            .clients
            .lock()
            .expect("client registry lock")
            .get_mut(&id)
        {
            client.task = Some(task);
        }
    }

    /// Remove a client; harmless when it is already gone.
    pub(crate) fn remove(&self, id: u64) {
        self.inner
            .clients
            .lock()
            .expect("client registry lock")
            .remove(&id);
    }

    /// Number of live clients.
    pub fn len(&self) -> usize {
        self.inner.clients.lock().expect("client registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every live client and hand back their task handles so the
    /// caller can wait for the sockets to close. Draining the map first
    /// means each client is cancelled exactly once even if shutdown is
    /// called twice.
    pub(crate) fn shutdown(&self) -> Vec<JoinHandle<()>> {
        let clients: Vec<_> = {
            let mut guard = self.inner.clients.lock().expect("client registry lock");
            guard.drain().collect()
        };

        let mut tasks = Vec::with_capacity(clients.len());
        for (_, client) in clients {
            client.token.cancel();
            if let Some(task) = client.task {
                tasks.push(task);
            }
        }
        tasks
    }
}
