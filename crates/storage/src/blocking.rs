use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::list::ListStore;

type WaiterId = u64;

/// Cliente parado em BLPOP. O sinal carrega a chave que recebeu dados.
#[derive(Debug)]
struct Waiter {
    id: WaiterId,
    signal: oneshot::Sender<String>,
}

/// Filas FIFO de clientes bloqueados, uma por chave.
///
/// Vive dentro do `ListState`, portanto toda operação aqui já roda sob o
/// lock das listas.
#[derive(Debug, Default)]
pub(crate) struct Waiters {
    queues: HashMap<String, VecDeque<Waiter>>,
    next_id: WaiterId,
}

impl Waiters {
    /// Registra um waiter. `front` coloca no início da fila (cliente que já
    /// era o mais antigo e perdeu a corrida pelo elemento).
    fn register(&mut self, key: &str, front: bool) -> (WaiterId, oneshot::Receiver<String>) {
        let id = self.next_id;
        self.next_id += 1;

        let (signal, rx) = oneshot::channel();
        let queue = self.queues.entry(key.to_string()).or_default();
        let waiter = Waiter { id, signal };
        if front {
            queue.push_front(waiter);
        } else {
            queue.push_back(waiter);
        }
        (id, rx)
    }

    /// Remove o waiter se ele ainda estiver na fila. Retorna false se ele já
    /// tinha sido retirado por um push.
    fn remove(&mut self, key: &str, id: WaiterId) -> bool {
        let Some(queue) = self.queues.get_mut(key) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|w| w.id != id);
        let removed = queue.len() != before;
        if queue.is_empty() {
            self.queues.remove(key);
        }
        removed
    }

    /// Entrega um sinal ao primeiro waiter ainda ouvindo. Waiters cujo
    /// receptor já foi descartado são removidos sem contar como acordados.
    pub(crate) fn wake_one(&mut self, key: &str) -> bool {
        let Some(queue) = self.queues.get_mut(key) else {
            return false;
        };

        let mut woken = false;
        while let Some(waiter) = queue.pop_front() {
            // send nunca bloqueia; falha só se o receptor não existe mais
            if waiter.signal.send(key.to_string()).is_ok() {
                debug!("waiter {} acordado para '{key}'", waiter.id);
                woken = true;
                break;
            }
        }
        if queue.is_empty() {
            self.queues.remove(key);
        }
        woken
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.queues.get(key).map_or(0, VecDeque::len)
    }
}

/// Garante que o waiter sai da fila em qualquer saída do BLPOP: timeout,
/// desconexão do cliente (future descartado) ou shutdown.
struct WaiterGuard<'a> {
    store: &'a ListStore,
    key: &'a str,
    id: WaiterId,
    armed: bool,
}

impl WaiterGuard<'_> {
    /// O waiter foi acordado e já saiu da fila pelo push.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.store.lock();
        if !state.waiters.remove(self.key, self.id) && state.has_items(self.key) {
            // Fomos acordados mas estamos desistindo: repassa o sinal para
            // que o dado não fique parado com outro cliente esperando.
            state.waiters.wake_one(self.key);
        }
    }
}

impl ListStore {
    /// Pop bloqueante do início da lista.
    ///
    /// Retorna imediatamente se a lista tem elementos, ou `None` se o prazo
    /// já venceu (`Duration::ZERO`). Caso contrário entra
    /// na fila da chave e espera um push, no máximo até `timeout` (`None`
    /// espera indefinidamente). Se, ao acordar, outro cliente já levou o
    /// elemento, volta para o início da fila e continua esperando pelo tempo
    /// que resta.
    pub async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Option<String> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut lost_race = false;

        loop {
            let (id, signal) = {
                let mut state = self.lock();
                if let Some(value) = state.pop_front(key, 1).pop() {
                    return Some(value);
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return None;
                }
                state.waiters.register(key, lost_race)
            };
            let guard = WaiterGuard {
                store: self,
                key,
                id,
                armed: true,
            };
            debug!("waiter {id} bloqueado em '{key}' (timeout: {timeout:?})");

            let result = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, signal).await {
                    Ok(result) => result,
                    Err(_) => {
                        debug!("waiter {id} expirou em '{key}'");
                        drop(guard);
                        return None;
                    }
                },
                None => signal.await,
            };

            match result {
                Ok(_) => guard.disarm(),
                // Sender descartado sem sinal: o guard limpa e tentamos de novo
                Err(_) => drop(guard),
            }
            lost_race = true;
        }
    }
}
