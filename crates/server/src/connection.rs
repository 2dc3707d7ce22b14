use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use galedb_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, MAX_FRAME_SIZE, ProtocolError};
use galedb_protocol::{Frame, parse_request};

/// Wrapper sobre TcpStream com buffer: lê requisições e escreve respostas.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê uma requisição completa do stream. Retorna None no EOF.
    ///
    /// Erros de protocolo recuperáveis chegam como `ConnectionError::Protocol`
    /// com a parte inválida já descartada do buffer.
    pub async fn read_request(&mut self) -> Result<Option<Vec<String>>, ConnectionError> {
        loop {
            if let Some(args) = self.parse_request()? {
                return Ok(Some(args));
            }

            if self.buffer.len() > MAX_FRAME_SIZE {
                return Err(ProtocolError::FrameTooLarge(self.buffer.len()).into());
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    /// Escreve um frame no stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Completa quando o peer fecha a conexão (ou a leitura falha).
    ///
    /// Usado enquanto um comando bloqueante espera: o que chegar nesse meio
    /// tempo fica no buffer para a próxima `read_request`.
    pub async fn closed(&mut self) {
        loop {
            if self.buffer.len() > MAX_FRAME_SIZE {
                // Para de ler; o erro aparece na próxima read_request
                return std::future::pending().await;
            }
            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }

    fn parse_request(&mut self) -> Result<Option<Vec<String>>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match parse_request(&mut cursor) {
            Ok(args) => {
                let len = cursor.position() as usize;
                self.buffer.advance(len);
                Ok(Some(args))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => {
                let len = cursor.position() as usize;
                self.buffer.advance(len);
                Err(e.into())
            }
        }
    }
}
