use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::blocking::Waiters;

/// Estado protegido pelo lock único do store de listas.
///
/// Listas e filas de espera do BLPOP ficam sob o mesmo mutex, então uma
/// operação de lista nunca observa a fila de waiters pela metade.
#[derive(Debug, Default)]
pub(crate) struct ListState {
    lists: HashMap<String, VecDeque<String>>,
    pub(crate) waiters: Waiters,
}

impl ListState {
    /// Remove até `count` elementos do início. A chave some quando a lista esvazia.
    pub(crate) fn pop_front(&mut self, key: &str, count: usize) -> Vec<String> {
        let Some(list) = self.lists.get_mut(key) else {
            return Vec::new();
        };
        let n = count.min(list.len());
        let popped: Vec<String> = list.drain(..n).collect();
        if list.is_empty() {
            self.lists.remove(key);
        }
        popped
    }

    pub(crate) fn has_items(&self, key: &str) -> bool {
        self.lists.get(key).is_some_and(|list| !list.is_empty())
    }

    fn push(&mut self, key: &str, values: Vec<String>, front: bool) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        for value in values {
            if front {
                list.push_front(value);
            } else {
                list.push_back(value);
            }
        }
        let len = list.len();

        // Acorda no máximo um cliente bloqueado por chamada de push
        self.waiters.wake_one(key);
        len
    }
}

/// Store de listas ordenadas de strings, criadas implicitamente no primeiro push.
#[derive(Debug, Default)]
pub struct ListStore {
    state: Mutex<ListState>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ListState> {
        // Nenhuma operação deixa o estado inconsistente no meio, então um
        // lock envenenado ainda pode ser usado.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insere cada valor no início, na ordem dada: `a b c` resulta em `c b a`.
    pub fn push_front(&self, key: &str, values: Vec<String>) -> usize {
        self.lock().push(key, values, true)
    }

    /// Anexa os valores ao final, na ordem dada.
    pub fn push_back(&self, key: &str, values: Vec<String>) -> usize {
        self.lock().push(key, values, false)
    }

    pub fn pop_front(&self, key: &str, count: usize) -> Vec<String> {
        self.lock().pop_front(key, count)
    }

    pub fn len(&self, key: &str) -> usize {
        self.lock().lists.get(key).map_or(0, VecDeque::len)
    }

    /// Leitura de intervalo com índices inclusivos.
    ///
    /// Índices negativos contam a partir do fim e ambos são limitados a
    /// `[0, len - 1]`; se o início passa do fim (ou do tamanho da lista) o
    /// resultado é vazio.
    pub fn range(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let state = self.lock();
        let Some(list) = state.lists.get(key) else {
            return Vec::new();
        };

        let len = list.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let end = if end < 0 { (len + end).max(0) } else { end };
        if start >= len || start > end {
            return Vec::new();
        }
        let end = end.min(len - 1);

        list.range(start as usize..=end as usize).cloned().collect()
    }

    /// Número de clientes bloqueados em BLPOP para a chave.
    pub fn waiting(&self, key: &str) -> usize {
        self.lock().waiters.count(key)
    }
}
