use std::sync::Arc;

use tokio::time::Duration;

use crate::kv::KvStore;
use crate::list::ListStore;

/// Estado compartilhado entre todas as conexões.
#[derive(Debug, Default)]
struct SharedState {
    strings: KvStore,
    lists: ListStore,
}

/// Handle para o banco de dados in-memory. Clonar é barato.
///
/// Strings e listas vivem em keyspaces separados: `SET k` não interfere na
/// lista `k` e vice-versa.
#[derive(Debug, Clone, Default)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    // --- String operations ---

    pub fn get(&self, key: &str) -> Option<String> {
        self.shared.strings.get(key)
    }

    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        self.shared.strings.set(key, value, ttl);
    }

    /// Número de strings armazenadas, contando as vencidas que ninguém leu.
    pub fn string_count(&self) -> usize {
        self.shared.strings.len()
    }

    // --- List operations ---

    pub fn lpush(&self, key: &str, values: Vec<String>) -> usize {
        self.shared.lists.push_front(key, values)
    }

    pub fn rpush(&self, key: &str, values: Vec<String>) -> usize {
        self.shared.lists.push_back(key, values)
    }

    pub fn lpop(&self, key: &str, count: usize) -> Vec<String> {
        self.shared.lists.pop_front(key, count)
    }

    pub fn llen(&self, key: &str) -> usize {
        self.shared.lists.len(key)
    }

    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Vec<String> {
        self.shared.lists.range(key, start, stop)
    }

    /// Ver [`ListStore::blpop`].
    pub async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Option<String> {
        self.shared.lists.blpop(key, timeout).await
    }

    /// Clientes bloqueados em BLPOP na chave.
    pub fn blocked_clients(&self, key: &str) -> usize {
        self.shared.lists.waiting(key)
    }
}
