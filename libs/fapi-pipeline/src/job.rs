use std::path::{Path, PathBuf};

/// Одна запись на диск: payload + путь назначения.
///
/// Создаётся endpoint'ом на каждый принятый запрос, забирается ровно
/// одним writer'ом и выбрасывается после попытки записи (успешной или нет).
#[derive(Debug)]
pub struct WriteJob {
    payload: Vec<u8>,
    destination: PathBuf,
}

impl WriteJob {
    pub fn new(payload: impl Into<Vec<u8>>, destination: impl Into<PathBuf>) -> Self {
        Self {
            payload: payload.into(),
            destination: destination.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}
