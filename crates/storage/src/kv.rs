use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::entry::Entry;

/// Store de strings com expiração preguiçosa: uma chave vencida só é
/// removida quando alguém tenta lê-la. Não existe varredura em background.
#[derive(Debug, Default)]
pub struct KvStore {
    data: DashMap<String, Entry>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria ou substitui a entrada. `ttl` zero gera uma entrada já expirada.
    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.data.insert(key, Entry::new(value, expires_at));
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.data.get(key)?;
        if !entry.is_expired() {
            return Some(entry.value.clone());
        }
        drop(entry);

        // Um SET concorrente pode ter substituído a entrada entre o get e o remove
        if self.data.remove_if(key, |_, e| e.is_expired()).is_some() {
            debug!("key expirada removida: {key}");
        }
        None
    }

    /// Número de entradas armazenadas, incluindo as vencidas ainda não lidas.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
