use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

// ═══════════════════════════════════════════════════════════════
//  Recyclable
// ═══════════════════════════════════════════════════════════════

/// Буфер, который можно вернуть в пул и выдать повторно.
///
/// `reset()` вызывает сам пул внутри `acquire()`.
pub trait Recyclable: Send {
    fn reset(&mut self);
}

// ═══════════════════════════════════════════════════════════════
//  BufferPool
// ═══════════════════════════════════════════════════════════════

/// Пул переиспользуемых буферов для writer'ов.
///
/// Lock-free (ArrayQueue): безопасен для конкурентных acquire/release
/// из нескольких потоков без внешней синхронизации. Если idle-слоты
/// пусты, создаётся новый буфер; если переполнены, возвращённый
/// буфер выбрасывается.
pub struct BufferPool<B: Recyclable> {
    idle: ArrayQueue<B>,
    make: Box<dyn Fn() -> B + Send + Sync>,
}

impl<B: Recyclable> BufferPool<B> {
    pub fn new(max_idle: usize, make: impl Fn() -> B + Send + Sync + 'static) -> Self {
        Self {
            idle: ArrayQueue::new(max_idle.max(1)),
            make: Box::new(make),
        }
    }

    /// Взять буфер. Буфер уже сброшен и принадлежит только вызывающему
    /// до drop'а guard'а.
    pub fn acquire(&self) -> Pooled<'_, B> {
        let mut buf = self.idle.pop().unwrap_or_else(|| (self.make)());
        buf.reset();
        Pooled {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Вернуть буфер явно. Эквивалентно drop'у guard'а.
    pub fn release(&self, guard: Pooled<'_, B>) {
        drop(guard);
    }

    /// Количество буферов, ожидающих повторной выдачи.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    fn put_back(&self, buf: B) {
        // Full pool: the extra buffer is simply freed.
        let _ = self.idle.push(buf);
    }
}

impl BufferPool<WriteBuffer> {
    pub fn write_buffers(max_idle: usize, buffer_size: usize) -> Self {
        Self::new(max_idle, move || WriteBuffer::with_capacity(buffer_size))
    }
}

/// RAII guard: буфер возвращается в пул при drop, в том числе
/// когда запись завершилась ошибкой и guard ушёл через `?`.
pub struct Pooled<'a, B: Recyclable> {
    pool: &'a BufferPool<B>,
    buf: Option<B>,
}

impl<B: Recyclable> Deref for Pooled<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.buf.as_ref().expect("buffer present until drop")
    }
}

impl<B: Recyclable> DerefMut for Pooled<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.buf.as_mut().expect("buffer present until drop")
    }
}

impl<B: Recyclable> Drop for Pooled<'_, B> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put_back(buf);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  WriteBuffer
// ═══════════════════════════════════════════════════════════════

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Буфер записи фиксированного размера: payload проходит через него
/// в файл порциями по `capacity` байт.
#[derive(Debug)]
pub struct WriteBuffer {
    id: u64,
    buf: Vec<u8>,
    capacity: usize,
}

impl WriteBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Identity of this allocation, stable across reuse.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Байты, принятые но ещё не сброшенные в `dst`.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Записать `data` через буфер. Полные порции сразу уходят в `dst`,
    /// хвост остаётся до `flush_into`.
    pub fn write_through<W: Write>(&mut self, dst: &mut W, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            let room = self.capacity - self.buf.len();
            let n = room.min(data.len());
            self.buf.extend_from_slice(&data[..n]);
            data = &data[n..];
            if self.buf.len() == self.capacity {
                dst.write_all(&self.buf)?;
                self.buf.clear();
            }
        }
        Ok(())
    }

    pub fn flush_into<W: Write>(&mut self, dst: &mut W) -> io::Result<()> {
        if !self.buf.is_empty() {
            dst.write_all(&self.buf)?;
            self.buf.clear();
        }
        dst.flush()
    }
}

impl Recyclable for WriteBuffer {
    fn reset(&mut self) {
        self.buf.clear();
    }
}
