/// Erros de parsing do protocolo.
///
/// As mensagens das variantes que chegam ao cliente seguem o texto dos
/// servidores compatíveis com RESP, por isso estão em inglês.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("invalid format")]
    InvalidFormat,
    #[error("invalid multibulk length: {0}")]
    InvalidCount(String),
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
}

impl ProtocolError {
    /// Indica se a conexão pode continuar lendo o próximo frame depois deste erro.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProtocolError::Incomplete | ProtocolError::FrameTooLarge(_))
    }
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Erros de parsing/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),
    #[error("{0}")]
    InvalidArgument(String),
}

/// Erro top-level do GaleDB.
#[derive(Debug, thiserror::Error)]
pub enum GaleError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type alias.
pub type GaleResult<T> = Result<T, GaleError>;

// Conversão implícita de io::Error → GaleError (via ConnectionError)
impl From<std::io::Error> for GaleError {
    fn from(e: std::io::Error) -> Self {
        GaleError::Connection(ConnectionError::Io(e))
    }
}
