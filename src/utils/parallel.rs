use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, ZeroError};

/// Thread configuration for ensemble building and scoring.
///
/// - `n_threads <= 1`: everything runs on the calling thread, no Rayon
/// - `n_threads >= 2`: work runs inside a dedicated Rayon pool of that size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelSettings {
    pub n_threads: usize,
}

impl ParallelSettings {
    #[inline]
    pub fn is_parallel(self) -> bool {
        self.n_threads > 1
    }

    #[inline]
    pub fn sequential() -> Self {
        Self { n_threads: 1 }
    }

    /// Values <= 1 are clamped to 1 (sequential).
    #[inline]
    pub fn with_n_threads(n: usize) -> Self {
        Self {
            n_threads: n.max(1),
        }
    }

    /// One thread per logical CPU.
    #[inline]
    pub fn auto() -> Self {
        Self::with_n_threads(num_cpus::get())
    }

    /// Dedicated pool of `n_threads` workers; `None` when sequential.
    pub fn build_pool(self) -> Result<Option<ThreadPool>> {
        if !self.is_parallel() {
            return Ok(None);
        }
        ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .build()
            .map(Some)
            .map_err(|e| ZeroError::ThreadPool(e.to_string()))
    }
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self::sequential()
    }
}
