use std::io::{self, Cursor, Write};

use bytes::BytesMut;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use galedb_common::{ConnectionError, DEFAULT_PORT, GaleResult, ProtocolError};
use galedb_protocol::Frame;

#[derive(Parser, Debug)]
#[command(name = "galedb-cli", about = "GaleDB CLI client")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let mut stream = TcpStream::connect(&addr).await?;

    if !args.command.is_empty() {
        let reply = request(&mut stream, &args.command).await?;
        println!("{}", format_frame(&reply));
        return Ok(());
    }

    println!("Conectado a {addr}");
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("galedb> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        match request(&mut stream, &tokens).await {
            Ok(reply) => println!("{}", format_frame(&reply)),
            Err(e) => {
                println!("(error) {e}");
                break;
            }
        }
    }

    Ok(())
}

/// Envia uma requisição e espera a resposta completa.
async fn request(stream: &mut TcpStream, tokens: &[String]) -> GaleResult<Frame> {
    let parts: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let mut buf = BytesMut::new();
    Frame::array_from_strs(&parts).encode(&mut buf);
    stream.write_all(&buf).await?;

    let mut response = BytesMut::with_capacity(4096);
    loop {
        if stream.read_buf(&mut response).await? == 0 {
            return Err(ConnectionError::ConnectionReset.into());
        }
        match Frame::decode(&mut Cursor::new(&response[..])) {
            Ok(frame) => return Ok(frame),
            Err(ProtocolError::Incomplete) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Separa a linha em tokens; aspas duplas agrupam espaços e aceitam `\"`.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;
    let mut in_quote = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quote = !in_quote;
                current.get_or_insert_with(String::new);
            }
            '\\' if in_quote => {
                if let Some(escaped) = chars.next() {
                    current.get_or_insert_with(String::new).push(escaped);
                }
            }
            c if c.is_whitespace() && !in_quote => {
                tokens.extend(current.take());
            }
            c => current.get_or_insert_with(String::new).push(c),
        }
    }
    tokens.extend(current);
    tokens
}

/// Formata um frame no estilo do redis-cli.
fn format_frame(frame: &Frame) -> String {
    match frame {
        Frame::Simple(s) => s.clone(),
        Frame::Error(s) => format!("(error) ERR {s}"),
        Frame::Integer(n) => format!("(integer) {n}"),
        Frame::Bulk(data) => format!("\"{}\"", String::from_utf8_lossy(data)),
        Frame::Null => "(nil)".to_string(),
        Frame::Array(frames) if frames.is_empty() => "(empty array)".to_string(),
        Frame::Array(frames) => frames
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}) {}", i + 1, format_frame(f)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
