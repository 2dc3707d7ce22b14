use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use galedb_common::{MAX_FRAME_SIZE, ProtocolError};

/// Resposta tipada enviada ao cliente (subconjunto RESP2).
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    /// Mensagem de erro sem o prefixo `ERR`, adicionado no encode.
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Encoda o frame no buffer de saída.
    ///
    /// Uma string vazia vira `$0\r\n\r\n`; apenas `Frame::Null` gera `$-1`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Error(msg) => {
                dst.put(&b"-ERR "[..]);
                dst.put(msg.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                dst.put(n.to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put(data.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                dst.put(data.as_ref());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Null => {
                dst.put(&b"$-1\r\n"[..]);
            }
            Frame::Array(frames) => {
                dst.put_u8(b'*');
                dst.put(frames.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                for frame in frames {
                    frame.encode(dst);
                }
            }
        }
    }

    /// Decodifica uma resposta a partir do cursor (lado do cliente).
    ///
    /// Retorna `Incomplete` enquanto o buffer não contém o frame inteiro; nesse
    /// caso a posição do cursor não tem significado e o chamador deve tentar de
    /// novo a partir do início com mais dados.
    pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        match get_u8(src)? {
            b'+' => Ok(Frame::Simple(get_text(src)?)),
            b'-' => {
                let text = get_text(src)?;
                let msg = text.strip_prefix("ERR ").unwrap_or(&text);
                Ok(Frame::Error(msg.to_string()))
            }
            b':' => Ok(Frame::Integer(get_decimal(src)?)),
            b'$' => match get_decimal(src)? {
                -1 => Ok(Frame::Null),
                len if len < 0 => Err(ProtocolError::InvalidInteger(len.to_string())),
                len => {
                    let len = len as usize;
                    if len > MAX_FRAME_SIZE {
                        return Err(ProtocolError::FrameTooLarge(len));
                    }
                    if src.remaining() < len + 2 {
                        return Err(ProtocolError::Incomplete);
                    }
                    let start = src.position() as usize;
                    let data = Bytes::copy_from_slice(&src.get_ref()[start..start + len]);
                    src.advance(len + 2);
                    Ok(Frame::Bulk(data))
                }
            },
            b'*' => {
                let count = get_decimal(src)?;
                if count < 0 {
                    return Ok(Frame::Null);
                }
                let mut frames = Vec::with_capacity((count as usize).min(1024));
                for _ in 0..count {
                    frames.push(Frame::decode(src)?);
                }
                Ok(Frame::Array(frames))
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Helper: cria um Frame::Bulk a partir de &str.
    pub fn bulk(s: &str) -> Frame {
        Frame::Bulk(Bytes::from(s.to_string()))
    }

    /// Helper: cria um Array de Bulk strings a partir de &[&str].
    ///
    /// É também o formato usado pelos clientes para enviar requisições.
    pub fn array_from_strs(strs: &[&str]) -> Frame {
        Frame::Array(strs.iter().map(|s| Frame::bulk(s)).collect())
    }
}

impl From<String> for Frame {
    fn from(s: String) -> Self {
        Frame::Bulk(Bytes::from(s))
    }
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

fn get_crlf_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    match buf[start..].windows(2).position(|w| w == b"\r\n") {
        Some(offset) => {
            src.set_position((start + offset + 2) as u64);
            Ok(&buf[start..start + offset])
        }
        None => Err(ProtocolError::Incomplete),
    }
}

fn get_text(src: &mut Cursor<&[u8]>) -> Result<String, ProtocolError> {
    let line = get_crlf_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
}

fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let line = get_crlf_line(src)?;
    let s = std::str::from_utf8(line).map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?;
    s.parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(e.to_string()))
}
