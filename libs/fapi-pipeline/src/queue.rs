use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{PipelineError, WriteJob};

// ═══════════════════════════════════════════════════════════════
//  Admission
// ═══════════════════════════════════════════════════════════════

/// Результат попытки поставить job в очередь.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Job в очереди. Запись на диск ещё не выполнена.
    Admitted,
    /// Job выброшен, в очередь не попал.
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Сигнал отмены сработал раньше, чем освободилось место.
    Cancelled,
    /// Writer pool остановлен (только при shutdown).
    Closed,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Cancelled => write!(f, "cancelled"),
            Rejection::Closed => write!(f, "closed"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  WriteQueue: producer side
// ═══════════════════════════════════════════════════════════════

/// Создать bounded FIFO очередь записи ёмкостью `capacity`.
///
/// `WriteQueue` клонируется для каждого producer'а, `JobReceiver`
/// отдаётся writer pool'у.
pub fn write_queue(capacity: usize) -> Result<(WriteQueue, JobReceiver), PipelineError> {
    if capacity == 0 {
        return Err(PipelineError::InvalidConfig {
            field: "queue_capacity",
            detail: "must be > 0".into(),
        });
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((WriteQueue { tx }, JobReceiver { rx }))
}

/// Producer-сторона очереди. Единственный механизм back-pressure:
/// при заполненной очереди `admit` ждёт, а не дропает.
#[derive(Clone, Debug)]
pub struct WriteQueue {
    tx: mpsc::Sender<WriteJob>,
}

impl WriteQueue {
    /// Поставить job в очередь.
    ///
    /// Есть место: `Admitted` сразу. Очередь полна: ждём свободный
    /// слот либо срабатывание `cancel`, что наступит раньше. При
    /// одновременной готовности приоритет у свободного слота.
    pub async fn admit(&self, job: WriteJob, cancel: &CancellationToken) -> Admission {
        if self.tx.capacity() == 0 {
            tracing::debug!(
                capacity = self.capacity(),
                path = %job.destination().display(),
                "write queue full, waiting for a slot"
            );
        }

        tokio::select! {
            biased;

            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(job);
                    Admission::Admitted
                }
                Err(_) => Admission::Rejected(Rejection::Closed),
            },
            _ = cancel.cancelled() => Admission::Rejected(Rejection::Cancelled),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Jobs admitted but not yet picked up by a writer.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ═══════════════════════════════════════════════════════════════
//  JobReceiver: consumer side
// ═══════════════════════════════════════════════════════════════

/// Consumer-сторона очереди. Возвращает `None`, когда все
/// `WriteQueue` выброшены и очередь вычерпана.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<WriteJob>,
}

impl JobReceiver {
    /// Блокирующее чтение для writer-потоков. Нельзя вызывать из async контекста.
    pub fn blocking_recv(&mut self) -> Option<WriteJob> {
        self.rx.blocking_recv()
    }

    pub async fn recv(&mut self) -> Option<WriteJob> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WriteJob> {
        self.rx.try_recv().ok()
    }
}
