/// Compute device contexts, ordered launch streams and fixed-size buffers.
///
/// Kernels run on the host thread pool. A `Stream` keeps launches in submission order and
/// holds back the first failure until the owner synchronizes, the same contract an
/// asynchronous accelerator queue gives its caller.
use log::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    PoolCreation(String),
    /// Buffer shapes handed to a kernel or copy do not agree
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    LaunchFailed {
        kernel: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::PoolCreation(msg) => write!(f, "failed to create worker pool: {}", msg),
            DeviceError::SizeMismatch {
                what,
                expected,
                actual,
            } => write!(f, "{}: expected {} elements, got {}", what, expected, actual),
            DeviceError::LaunchFailed { kernel, reason } => {
                write!(f, "kernel '{}' failed: {}", kernel, reason)
            }
        }
    }
}

impl std::error::Error for DeviceError {}

/// Pool of worker threads, each of which drives one device context.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// `workers == 0` selects one worker per available core
    pub fn new(workers: usize) -> Result<Self, DeviceError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("device-worker-{}", idx))
            .build()
            .map_err(|e| DeviceError::PoolCreation(e.to_string()))?;
        let workers = pool.current_num_threads();

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }
}

/// Execution context owned by exactly one worker.
#[derive(Debug)]
pub struct DeviceContext {
    ordinal: usize,
}

impl DeviceContext {
    pub fn new(ordinal: usize) -> Self {
        Self { ordinal }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn create_stream(&self) -> Stream {
        Stream {
            device: self.ordinal,
            launches: 0,
            error: None,
        }
    }

    /// Zero-initialised buffer of `rows` rows with `stride` elements each
    pub fn alloc<T: Copy + Default>(&self, rows: usize, stride: usize) -> DeviceBuffer<T> {
        DeviceBuffer {
            data: vec![T::default(); rows * stride],
            stride,
        }
    }
}

/// In-order launch queue.
#[derive(Debug)]
pub struct Stream {
    device: usize,
    launches: u64,
    error: Option<DeviceError>,
}

impl Stream {
    /// Run `kernel` after every earlier launch on this stream. Once a launch has failed, later
    /// launches are skipped until `synchronize` reports the failure.
    pub fn launch<F>(&mut self, name: &'static str, kernel: F)
    where
        F: FnOnce() -> Result<(), DeviceError>,
    {
        if self.error.is_some() {
            trace!("device {}: skipping '{}' after earlier failure", self.device, name);
            return;
        }
        self.launches += 1;
        trace!("device {}: launch #{} '{}'", self.device, self.launches, name);
        if let Err(e) = kernel() {
            self.error = Some(e);
        }
    }

    /// Wait for all launches; surfaces the first failure since the last synchronization
    pub fn synchronize(&mut self) -> Result<(), DeviceError> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn launches(&self) -> u64 {
        self.launches
    }
}

/// Contiguous device-resident buffer laid out as rows of `stride` elements.
#[derive(Debug, Clone)]
pub struct DeviceBuffer<T> {
    data: Vec<T>,
    stride: usize,
}

impl<T: Copy + Default> DeviceBuffer<T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn rows(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.stride..(row + 1) * self.stride]
    }

    pub fn upload(&mut self, src: &[T]) -> Result<(), DeviceError> {
        if src.len() != self.data.len() {
            return Err(DeviceError::SizeMismatch {
                what: "upload",
                expected: self.data.len(),
                actual: src.len(),
            });
        }
        self.data.copy_from_slice(src);
        Ok(())
    }

    pub fn copy_to_host(&self, dst: &mut [T]) -> Result<(), DeviceError> {
        if dst.len() != self.data.len() {
            return Err(DeviceError::SizeMismatch {
                what: "copy to host",
                expected: self.data.len(),
                actual: dst.len(),
            });
        }
        dst.copy_from_slice(&self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defers_errors_to_synchronize() {
        let ctx = DeviceContext::new(0);
        let mut stream = ctx.create_stream();
        let mut ran = Vec::new();

        stream.launch("first", || {
            ran.push(1);
            Ok(())
        });
        stream.launch("broken", || {
            Err(DeviceError::LaunchFailed {
                kernel: "broken",
                reason: "test".into(),
            })
        });
        stream.launch("after", || {
            ran.push(3);
            Ok(())
        });

        assert_eq!(ran, vec![1]);
        assert_eq!(stream.launches(), 2);
        assert!(stream.synchronize().is_err());
        // error is consumed by the synchronization point
        assert!(stream.synchronize().is_ok());
    }

    #[test]
    fn test_buffer_rows_and_copies() {
        let ctx = DeviceContext::new(3);
        let mut buf = ctx.alloc::<f32>(4, 3);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.rows(), 4);

        let src: Vec<f32> = (0..12).map(|v| v as f32).collect();
        buf.upload(&src).unwrap();
        assert_eq!(buf.row(2), &[6.0, 7.0, 8.0]);

        let mut host = vec![0.0; 12];
        buf.copy_to_host(&mut host).unwrap();
        assert_eq!(host, src);

        let mut short = vec![0.0; 5];
        assert!(matches!(
            buf.copy_to_host(&mut short),
            Err(DeviceError::SizeMismatch { expected: 12, actual: 5, .. })
        ));

        buf.clear();
        assert!(buf.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_worker_pool_names_threads() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.workers(), 2);
        let name = pool.install(|| std::thread::current().name().map(str::to_string));
        assert!(name.unwrap().starts_with("device-worker-"));
    }
}
