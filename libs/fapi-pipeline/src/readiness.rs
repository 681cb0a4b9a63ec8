use std::sync::Arc;

use parking_lot::RwLock;

/// Флаг готовности процесса.
///
/// `false` при старте, выставляется в `true` один раз после того, как
/// upload-каталог создан, writer'ы запущены и listener привязан.
/// Клон разделяет один и тот же флаг; независимые экземпляры не
/// влияют друг на друга.
#[derive(Clone, Debug, Default)]
pub struct Readiness {
    ready: Arc<RwLock<bool>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.write() = ready;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.read()
    }
}
