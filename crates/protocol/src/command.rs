use std::time::Duration;

use galedb_common::CommandError;

use crate::Parse;

/// Número de argumentos aceitos por um comando, contando o próprio nome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(expected) => n == expected,
            Arity::AtLeast(min) => n >= min,
        }
    }
}

/// Tabela estática de comandos suportados.
const COMMANDS: &[(&str, Arity)] = &[
    ("PING", Arity::Exactly(1)),
    ("ECHO", Arity::Exactly(2)),
    ("SET", Arity::AtLeast(3)),
    ("GET", Arity::Exactly(2)),
    ("LPUSH", Arity::AtLeast(3)),
    ("RPUSH", Arity::AtLeast(3)),
    ("LRANGE", Arity::Exactly(4)),
    ("LLEN", Arity::Exactly(2)),
    ("LPOP", Arity::AtLeast(2)),
    ("BLPOP", Arity::Exactly(3)),
];

/// Procura um comando pelo nome, sem diferenciar maiúsculas.
pub fn lookup(name: &str) -> Option<(&'static str, Arity)> {
    COMMANDS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .copied()
}

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Echo(String),
    Get(String),
    Set {
        key: String,
        value: String,
        /// Valor bruto de `PX`; zero ou negativo expira imediatamente.
        expire_ms: Option<i64>,
    },
    LPush {
        key: String,
        values: Vec<String>,
    },
    RPush {
        key: String,
        values: Vec<String>,
    },
    LRange {
        key: String,
        start: i64,
        stop: i64,
    },
    LLen(String),
    LPop {
        key: String,
        count: Option<usize>,
    },
    BLPop {
        key: String,
        /// `None` espera indefinidamente.
        timeout: Option<Duration>,
    },
    Unknown(String),
}

impl Command {
    /// Converte os argumentos de uma requisição em um Command.
    ///
    /// A aridade é checada antes de qualquer outra validação. Um nome
    /// desconhecido não é erro aqui: vira `Command::Unknown` com o nome
    /// exatamente como o cliente enviou.
    pub fn from_args(args: Vec<String>) -> Result<Command, CommandError> {
        let mut args = args.into_iter();
        let Some(raw_name) = args.next() else {
            return Err(CommandError::Empty);
        };
        let Some((name, arity)) = lookup(&raw_name) else {
            return Ok(Command::Unknown(raw_name));
        };
        if !arity.accepts(args.len() + 1) {
            return Err(CommandError::WrongArity(name.to_string()));
        }

        let mut parse = Parse::new(name, args.collect());

        let cmd = match name {
            "PING" => Command::Ping,
            "ECHO" => Command::Echo(parse.next_string()?),
            "GET" => Command::Get(parse.next_string()?),
            "SET" => parse_set(&mut parse)?,
            "LPUSH" => Command::LPush {
                key: parse.next_string()?,
                values: parse.rest(),
            },
            "RPUSH" => Command::RPush {
                key: parse.next_string()?,
                values: parse.rest(),
            },
            "LRANGE" => Command::LRange {
                key: parse.next_string()?,
                start: parse.next_int("invalid start or end index")?,
                stop: parse.next_int("invalid start or end index")?,
            },
            "LLEN" => Command::LLen(parse.next_string()?),
            "LPOP" => {
                let key = parse.next_string()?;
                // A contagem só vale com exatamente um argumento extra;
                // inválida ou não positiva vale 1.
                let count = match parse.rest().as_slice() {
                    [raw] => Some(
                        raw.parse::<i64>()
                            .ok()
                            .filter(|n| *n > 0)
                            .map_or(1, |n| n as usize),
                    ),
                    _ => None,
                };
                Command::LPop { key, count }
            }
            "BLPOP" => {
                let key = parse.next_string()?;
                let timeout = parse_timeout(&parse.next_string()?)?;
                Command::BLPop { key, timeout }
            }
            // Nome na tabela sem parser: tratado como desconhecido
            _ => Command::Unknown(raw_name),
        };

        Ok(cmd)
    }
}

fn parse_set(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let value = parse.next_string()?;

    // Só `PX <ms>` é reconhecido; outros tokens extras são ignorados.
    let options = parse.rest();
    let expire_ms = match options.as_slice() {
        [opt, ms, ..] if opt.eq_ignore_ascii_case("PX") => Some(
            ms.parse::<i64>()
                .map_err(|_| CommandError::InvalidArgument("PX value must be integer".into()))?,
        ),
        _ => None,
    };

    Ok(Command::Set {
        key,
        value,
        expire_ms,
    })
}

/// Timeout do BLPOP em segundos (aceita frações).
///
/// Zero significa sem limite. Um valor negativo é um prazo já vencido: o
/// BLPOP retira um elemento se houver, senão responde nulo na hora.
fn parse_timeout(raw: &str) -> Result<Option<Duration>, CommandError> {
    let secs = raw
        .parse::<f64>()
        .ok()
        .filter(|secs| !secs.is_nan())
        .ok_or_else(|| CommandError::InvalidArgument("timeout must be a number".into()))?;

    if secs == 0.0 {
        return Ok(None);
    }
    if secs < 0.0 {
        return Ok(Some(Duration::ZERO));
    }
    // Grande demais para um Duration: na prática, sem limite
    Ok(Duration::try_from_secs_f64(secs).ok())
}
