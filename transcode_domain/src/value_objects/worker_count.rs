// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Worker count value object: bounds and derives parallel fan-out sizing.
//!
//! `WorkerCount::default_for_system` backs `WorkerConfig`'s default
//! `worker_count`; the file-size/processing-type optimizers below are
//! empirically-tuned helpers a caller can reach for instead when it knows the
//! size and CPU-intensity of the work ahead of time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A worker count clamped to `[MIN_WORKERS, MAX_WORKERS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerCount {
    count: usize,
}

impl WorkerCount {
    /// Minimum number of workers (always at least 1)
    pub const MIN_WORKERS: usize = 1;

    /// Maximum number of workers (prevent resource exhaustion)
    pub const MAX_WORKERS: usize = 32;

    /// Default worker count for fallback scenarios
    pub const DEFAULT_WORKERS: usize = 4;

    /// Clamps `count` to `[MIN_WORKERS, MAX_WORKERS]`.
    pub fn new(count: usize) -> Self {
        Self {
            count: count.clamp(Self::MIN_WORKERS, Self::MAX_WORKERS),
        }
    }

    /// Returns the number of workers
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of workers (alias for test framework compatibility)
    pub fn value(&self) -> usize {
        self.count
    }

    /// Worker count tuned by file size: light for tiny/huge files, aggressive
    /// for the 1-50MB band where parallel overhead pays off most.
    pub fn optimal_for_file_size(file_size: u64) -> Self {
        let optimal_count = match file_size {
            // Tiny files: Minimize overhead, single-threaded or minimal parallelism
            0..=1_048_576 => {
                if file_size < 64_000 { 1 } else { 2 }
            }

            // Small files: Aggressive parallelism based on benchmark results
            // 5MB: 9 workers optimal (vs 3 adaptive = +102% performance)
            // 10MB: 14 workers optimal (vs 4 adaptive = +97% performance)
            1_048_577..=52_428_800 => {
                // 1MB to 50MB
                let size_mb = (file_size as f64) / 1_048_576.0;
                if size_mb <= 5.0 {
                    9 // Optimal for 5MB files
                } else if size_mb <= 10.0 {
                    (9.0 + (size_mb - 5.0) * 1.0).round() as usize // 9-14 workers
                } else {
                    (14.0 - (size_mb - 10.0) * 0.2).round() as usize // 14 down to ~6 workers
                }
            }

            // Medium files: Balanced approach with benchmark adjustments
            // 50MB: 5 workers optimal (vs 6 adaptive = +70% performance)
            // 100MB: 8 workers optimal (chunk size was the issue, not workers)
            52_428_801..=524_288_000 => {
                // 50MB to 500MB
                let size_mb = (file_size as f64) / 1_048_576.0;
                if size_mb <= 100.0 {
                    (5.0 + (size_mb - 50.0) * 0.06).round() as usize // 5-8 workers
                } else {
                    (8.0 + (size_mb - 100.0) * 0.01).round() as usize // 8-12 workers
                }
            }

            // Large files: Moderate parallelism to avoid coordination overhead
            524_288_001..=2_147_483_648 => {
                // 500MB to 2GB
                let size_gb = (file_size as f64) / 1_073_741_824.0;
                (8.0 + size_gb * 2.0).round() as usize // 8-12 workers
            }

            // Huge files: Conservative approach based on 2GB benchmark results
            // 2GB: 3 workers optimal (vs 14 adaptive = +76% performance)
            _ => {
                let size_gb = (file_size as f64) / 1_073_741_824.0;
                if size_gb <= 4.0 {
                    3 // Optimal for 2GB files
                } else {
                    (3.0 + (size_gb - 2.0) * 0.5).round() as usize // 3-6 workers max
                }
            }
        };

        Self::new(optimal_count)
    }

    /// `optimal_for_file_size`, capped at 2x `available_cores` to bound
    /// oversubscription.
    pub fn optimal_for_file_and_system(file_size: u64, available_cores: usize) -> Self {
        let file_optimal = Self::optimal_for_file_size(file_size);
        let system_limit = (available_cores * 2).max(Self::MIN_WORKERS); // Allow 2x oversubscription

        Self::new(file_optimal.count().min(system_limit))
    }

    /// `optimal_for_file_and_system`, pushed up to `available_cores` for
    /// CPU-intensive work or pulled back to 3/4 for I/O-bound work.
    pub fn optimal_for_processing_type(
        file_size: u64,
        available_cores: usize,
        is_cpu_intensive: bool
    ) -> Self {
        let base_optimal = Self::optimal_for_file_and_system(file_size, available_cores);

        if is_cpu_intensive {
            // CPU-intensive operations benefit from more workers up to core count
            let cpu_optimal = available_cores.min(Self::MAX_WORKERS);
            Self::new(base_optimal.count().max(cpu_optimal))
        } else {
            // I/O-intensive operations need fewer workers to avoid contention
            Self::new(((base_optimal.count() * 3) / 4).max(Self::MIN_WORKERS))
        }
    }

    /// Fallback worker count when file size isn't known yet: available CPU
    /// parallelism, clamped to `MAX_WORKERS`.
    pub fn default_for_system() -> Self {
        let available_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(Self::DEFAULT_WORKERS);

        Self::new(available_cores.min(Self::MAX_WORKERS))
    }

    /// True if `self` is within 50% of `optimal_for_file_size(file_size)`.
    pub fn is_suitable_for_file_size(&self, file_size: u64) -> bool {
        let optimal = Self::optimal_for_file_size(file_size);
        let difference = self.count.abs_diff(optimal.count);
        difference <= (optimal.count / 2).max(1)
    }

    /// Human-readable label for `optimal_for_file_size`'s strategy band.
    pub fn strategy_description(file_size: u64) -> &'static str {
        match file_size {
            0..=1_048_576 => "Minimal parallelism (tiny files)",
            1_048_577..=10_485_760 => "Light parallelism (small files)",
            10_485_761..=104_857_600 => "Balanced parallelism (medium files)",
            104_857_601..=1_073_741_824 => "High parallelism (large files)",
            _ => "Maximum throughput (huge files)",
        }
    }

    /// Rejects a user-supplied worker count that's zero, over
    /// `MAX_WORKERS`, oversubscribes more than 4x `available_cores`, or is
    /// wasteful for a sub-1MB `file_size`.
    pub fn validate_user_input(
        user_count: usize,
        available_cores: usize,
        file_size: u64
    ) -> Result<usize, String> {
        // Sanity check: minimum 1 worker
        if user_count == 0 {
            return Err("Worker count must be at least 1".to_string());
        }

        // Sanity check: don't exceed reasonable limits
        if user_count > Self::MAX_WORKERS {
            return Err(
                format!("Worker count {} exceeds maximum {}", user_count, Self::MAX_WORKERS)
            );
        }

        // Warning for excessive oversubscription (more than 4x cores)
        let max_reasonable = available_cores * 4;
        if user_count > max_reasonable {
            return Err(
                format!(
                    "Worker count {} may cause excessive oversubscription ({}x cores). Consider {} or less",
                    user_count,
                    user_count / available_cores.max(1),
                    max_reasonable
                )
            );
        }

        // Warning for tiny files with many workers (inefficient)
        if file_size < 1_048_576 && user_count > 2 {
            return Err(
                format!(
                    "Worker count {} is excessive for tiny file ({} bytes). Consider 1-2 workers",
                    user_count,
                    file_size
                )
            );
        }

        // All checks passed
        Ok(user_count)
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::default_for_system()
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} workers", self.count)
    }
}

impl From<usize> for WorkerCount {
    fn from(count: usize) -> Self {
        Self::new(count)
    }
}

impl From<WorkerCount> for usize {
    fn from(worker_count: WorkerCount) -> Self {
        worker_count.count
    }
}
