use tokio::time::Instant;

/// Entrada no store de strings: valor + expiração absoluta opcional.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) value: String,
    pub(crate) expires_at: Option<Instant>,
}

impl Entry {
    pub(crate) fn new(value: String, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.expires_at
            .map(|t| Instant::now() >= t)
            .unwrap_or(false)
    }
}
