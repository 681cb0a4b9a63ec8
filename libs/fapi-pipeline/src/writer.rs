use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::buffer::{BufferPool, WriteBuffer};
use crate::{JobReceiver, PipelineError, WriteJob};

// ═══════════════════════════════════════════════════════════════
//  Stats
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct WriterStats {
    written: AtomicU64,
    failed: AtomicU64,
}

impl WriterStats {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════
//  WriterPool
// ═══════════════════════════════════════════════════════════════

/// Фиксированный набор writer-потоков, вычерпывающих очередь записи.
///
/// Каждый поток выполняет одну блокирующую запись за раз. Потоки живут,
/// пока живёт хотя бы один `WriteQueue`; после закрытия очереди они
/// дописывают оставшиеся jobs и завершаются.
pub struct WriterPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<WriterStats>,
}

impl WriterPool {
    pub fn spawn(
        receiver: JobReceiver,
        workers: usize,
        buffers: Arc<BufferPool<WriteBuffer>>,
    ) -> Result<Self, PipelineError> {
        if workers == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "workers",
                detail: "must be > 0".into(),
            });
        }

        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(WriterStats::default());
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let receiver = receiver.clone();
            let buffers = buffers.clone();
            let stats = stats.clone();
            let handle = std::thread::Builder::new()
                .name(format!("fapi-writer-{index}"))
                .spawn(move || run_worker(index, &receiver, &buffers, &stats))
                .map_err(|source| PipelineError::Spawn { index, source })?;
            handles.push(handle);
        }

        tracing::info!(workers, "writer pool started");
        Ok(Self { handles, stats })
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> Arc<WriterStats> {
        self.stats.clone()
    }

    /// Дождаться завершения всех writer'ов.
    ///
    /// Блокирует до тех пор, пока все `WriteQueue` не выброшены и
    /// очередь не вычерпана.
    pub fn join(self) -> Arc<WriterStats> {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!("writer thread panicked");
            }
        }
        tracing::info!(
            written = self.stats.written(),
            failed = self.stats.failed(),
            "writer pool stopped"
        );
        self.stats
    }
}

fn run_worker(
    index: usize,
    receiver: &Mutex<JobReceiver>,
    buffers: &BufferPool<WriteBuffer>,
    stats: &WriterStats,
) {
    tracing::debug!(worker = index, "writer started");
    loop {
        let job = receiver.lock().blocking_recv();
        let Some(job) = job else { break };

        match write_job(&job, buffers) {
            Ok(()) => {
                stats.written.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    worker = index,
                    path = %job.destination().display(),
                    bytes = job.payload().len(),
                    "payload written"
                );
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(worker = index, error = %e, "write failed, job dropped");
            }
        }
    }
    tracing::debug!(worker = index, "writer stopped");
}

/// Записать один job: create/truncate → write через буфер → flush.
///
/// Буфер возвращается в пул до закрытия файла, независимо от исхода.
pub fn write_job(job: &WriteJob, buffers: &BufferPool<WriteBuffer>) -> Result<(), PipelineError> {
    let path = job.destination();
    let mut file = File::create(path).map_err(|e| PipelineError::write("create", path, e))?;

    let mut buf = buffers.acquire();
    buf.write_through(&mut file, job.payload())
        .map_err(|e| PipelineError::write("write", path, e))?;
    buf.flush_into(&mut file)
        .map_err(|e| PipelineError::write("flush", path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_job_round_trips_payload_larger_than_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let buffers = BufferPool::write_buffers(1, 64);

        write_job(&WriteJob::new(payload.clone(), &path), &buffers).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), payload);
        assert_eq!(buffers.idle(), 1);
    }

    #[test]
    fn write_job_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, b"a much longer previous content").unwrap();
        let buffers = BufferPool::write_buffers(1, 64);

        write_job(&WriteJob::new(b"{}".to_vec(), &path), &buffers).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn write_job_reports_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.txt");
        let buffers = BufferPool::write_buffers(1, 64);

        let err = write_job(&WriteJob::new(b"x".to_vec(), &path), &buffers).unwrap_err();
        assert!(matches!(err, PipelineError::Write { stage: "create", .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn spawn_rejects_zero_workers() {
        let (_queue, receiver) = crate::write_queue(1).unwrap();
        let buffers = Arc::new(BufferPool::write_buffers(1, 64));
        assert!(matches!(
            WriterPool::spawn(receiver, 0, buffers),
            Err(PipelineError::InvalidConfig { field: "workers", .. })
        ));
    }
}
