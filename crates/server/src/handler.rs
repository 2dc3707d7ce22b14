use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::debug;

use galedb_common::{CommandError, ConnectionError};
use galedb_protocol::{Command, Frame};
use galedb_storage::Db;

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
///
/// Erros de protocolo e de comando viram respostas `-ERR` e o loop segue;
/// só erros de I/O (ou um frame grande demais) encerram a conexão.
pub async fn handle_connection(
    mut conn: Connection,
    db: Db,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let request = tokio::select! {
            result = conn.read_request() => result,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let args = match request {
            Ok(Some(args)) => args,
            Ok(None) => return Ok(()), // EOF
            Err(ConnectionError::Protocol(e)) if e.is_recoverable() => {
                debug!("frame inválido: {e}");
                conn.write_frame(&Frame::Error(e.to_string())).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let cmd = match Command::from_args(args) {
            Ok(cmd) => cmd,
            Err(e) => {
                conn.write_frame(&Frame::Error(e.to_string())).await?;
                continue;
            }
        };

        debug!("comando recebido: {cmd:?}");

        let response = match execute_command(cmd, &db) {
            Execution::Reply(frame) => frame,
            Execution::Block { key, timeout } => {
                // A espera não segura nenhum lock; se o cliente cair ou o
                // servidor desligar, o future é descartado e o waiter sai da fila.
                tokio::select! {
                    value = db.blpop(&key, timeout) => blpop_reply(&key, value),
                    _ = conn.closed() => {
                        debug!("cliente desconectou durante BLPOP em '{key}'");
                        return Ok(());
                    }
                    _ = shutdown.recv() => {
                        return Ok(());
                    }
                }
            }
        };

        conn.write_frame(&response).await?;
    }
}

/// Resultado de um comando: resposta pronta ou um BLPOP que precisa esperar.
#[derive(Debug, PartialEq)]
enum Execution {
    Reply(Frame),
    Block {
        key: String,
        timeout: Option<Duration>,
    },
}

/// Executa um comando. Só o BLPOP é devolvido para o loop da conexão, que
/// espera fora de qualquer lock.
fn execute_command(cmd: Command, db: &Db) -> Execution {
    let frame = match cmd {
        Command::Ping => Frame::Simple("PONG".into()),
        Command::Echo(msg) => Frame::Simple(msg),
        Command::Get(key) => db.get(&key).map_or(Frame::Null, Frame::from),
        Command::Set {
            key,
            value,
            expire_ms,
        } => {
            let ttl = expire_ms.map(|ms| Duration::from_millis(ms.max(0) as u64));
            db.set(key, value, ttl);
            Frame::Simple("OK".into())
        }
        Command::LPush { key, values } => Frame::Integer(db.lpush(&key, values) as i64),
        Command::RPush { key, values } => Frame::Integer(db.rpush(&key, values) as i64),
        Command::LRange { key, start, stop } => {
            Frame::Array(db.lrange(&key, start, stop).into_iter().map(Frame::from).collect())
        }
        Command::LLen(key) => Frame::Integer(db.llen(&key) as i64),
        Command::LPop { key, count: None } => {
            db.lpop(&key, 1).pop().map_or(Frame::Null, Frame::from)
        }
        Command::LPop {
            key,
            count: Some(count),
        } => {
            let items = db.lpop(&key, count);
            if items.is_empty() {
                Frame::Null
            } else {
                Frame::Array(items.into_iter().map(Frame::from).collect())
            }
        }
        Command::BLPop { key, timeout } => return Execution::Block { key, timeout },
        Command::Unknown(name) => Frame::Error(CommandError::Unknown(name).to_string()),
    };
    Execution::Reply(frame)
}

fn blpop_reply(key: &str, value: Option<String>) -> Frame {
    match value {
        Some(value) => Frame::Array(vec![Frame::bulk(key), Frame::from(value)]),
        None => Frame::Null,
    }
}
