use std::io::Cursor;

use galedb_common::{MAX_REQUEST_ARGS, ProtocolError};

/// Decodifica uma requisição do buffer: `*N`, seguido de N pares
/// (linha de comprimento, linha de payload).
///
/// As linhas terminam em `\n`; espaços e `\r` finais são descartados. A linha
/// de comprimento (`$len`) é consumida sem validação contra o payload.
///
/// Em caso de `Incomplete` nada deve ser consumido pelo chamador. Em
/// `InvalidFormat` e `InvalidCount` o cursor fica logo após a primeira linha,
/// para que a próxima leitura comece na linha seguinte.
pub fn parse_request(src: &mut Cursor<&[u8]>) -> Result<Vec<String>, ProtocolError> {
    let header = trimmed(get_line(src)?);

    let Some(count) = header.strip_prefix(b"*") else {
        return Err(ProtocolError::InvalidFormat);
    };
    let count = std::str::from_utf8(count)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n <= MAX_REQUEST_ARGS)
        .ok_or_else(|| ProtocolError::InvalidCount(String::from_utf8_lossy(count).into_owned()))?;

    let mut payloads = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        get_line(src)?; // $len
        payloads.push(trimmed(get_line(src)?));
    }

    // Só converte depois de consumir o frame inteiro, assim um payload
    // inválido não deixa o restante do frame no buffer.
    payloads
        .into_iter()
        .map(|p| {
            String::from_utf8(p.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
        })
        .collect()
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    match buf[start..].iter().position(|b| *b == b'\n') {
        Some(offset) => {
            src.set_position((start + offset + 1) as u64);
            Ok(&buf[start..start + offset])
        }
        None => Err(ProtocolError::Incomplete),
    }
}

fn trimmed(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}
