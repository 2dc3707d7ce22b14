use galedb_common::CommandError;

/// Cursor sobre os argumentos de uma requisição, já sem o nome do comando.
///
/// A aridade é validada antes pelo router, então `next_string` só falha se
/// um handler pedir mais argumentos do que a tabela permite.
pub struct Parse {
    command: &'static str,
    parts: std::vec::IntoIter<String>,
}

impl Parse {
    pub fn new(command: &'static str, args: Vec<String>) -> Parse {
        Parse {
            command,
            parts: args.into_iter(),
        }
    }

    /// Retorna o próximo argumento.
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        self.parts
            .next()
            .ok_or_else(|| CommandError::WrongArity(self.command.to_string()))
    }

    /// Retorna o próximo argumento, se houver.
    pub fn next_optional(&mut self) -> Option<String> {
        self.parts.next()
    }

    /// Retorna o próximo argumento como i64. `err` é a mensagem em caso de falha.
    pub fn next_int(&mut self, err: &str) -> Result<i64, CommandError> {
        self.next_string()?
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidArgument(err.to_string()))
    }

    /// Consome todos os argumentos restantes.
    pub fn rest(&mut self) -> Vec<String> {
        self.parts.by_ref().collect()
    }
}
