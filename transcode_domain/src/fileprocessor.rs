// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Polymorphic file-processor dispatch (`Atfp`).
//!
//! A `FileProcessor` is the unit of work bound to one storage-map slot: the
//! MP4 source pre-loader and each HLS destination pipeline both implement
//! this trait and are looked up by label through [`FileProcessorRegistry`]
//! rather than through a type hierarchy, using trait-object dispatch keyed
//! by a stable label instead of a concrete type.

use crate::TranscodeError;
use std::any::Any;

/// Async-operation completion flags tracked per processor instance
/// (`op_async_done` in the source design): a processor that has issued an
/// async read or write checks these before re-entering `processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsyncOpFlags {
    pub read_done: bool,
    pub write_done: bool,
}

impl AsyncOpFlags {
    pub fn reset(&mut self) {
        self.read_done = false;
        self.write_done = false;
    }

    pub fn all_done(&self) -> bool {
        self.read_done && self.write_done
    }
}

/// Polymorphic file processor contract. Implementations are not `Send` by
/// requirement of async-trait use at the infrastructure boundary only —
/// the trait itself stays synchronous per-call, matching the worker's
/// cooperative single-threaded-per-job model (see concurrency notes).
pub trait FileProcessor {
    /// One-time setup before the first `processing` call.
    fn init(&mut self) -> Result<(), TranscodeError>;

    /// Releases any resources held by this processor. Idempotent.
    fn deinit(&mut self);

    /// Advances processing by one step. Returns `Ok(true)` if progress was
    /// made, `Ok(false)` if the processor is waiting on an async operation
    /// to complete (see [`AsyncOpFlags`]).
    fn processing(&mut self) -> Result<bool, TranscodeError>;

    /// Whether this processor has fully completed its work.
    fn has_done_processing(&self) -> bool;

    /// Whether this processor's registered label matches a requested kind
    /// (e.g. "mp4" vs "hls"), used by the registry to route instantiation.
    fn label_match(&self, label: &str) -> bool;

    /// The async-op completion flags for this processor instance.
    fn async_flags(&self) -> AsyncOpFlags;
    fn async_flags_mut(&mut self) -> &mut AsyncOpFlags;

    /// Escape hatch back to the concrete type behind a registry-instantiated
    /// trait object, for the operations (reading source chunks, publishing a
    /// locator) that are specific to one processor and not part of this
    /// shared contract.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type Constructor = fn() -> Box<dyn FileProcessor + Send>;

/// Static-slice `(label, constructor)` dispatch table, avoiding runtime
/// reflection: a process registers its processors once at startup and looks
/// them up by label at request time.
pub struct FileProcessorRegistry {
    entries: &'static [(&'static str, Constructor)],
}

impl FileProcessorRegistry {
    pub const fn new(entries: &'static [(&'static str, Constructor)]) -> Self {
        Self { entries }
    }

    pub fn instantiate(&self, label: &str) -> Option<Box<dyn FileProcessor + Send>> {
        self.entries
            .iter()
            .find(|(entry_label, _)| *entry_label == label)
            .map(|(_, ctor)| ctor())
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(label, _)| *label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl FileProcessor for Noop {
        fn init(&mut self) -> Result<(), TranscodeError> {
            Ok(())
        }
        fn deinit(&mut self) {}
        fn processing(&mut self) -> Result<bool, TranscodeError> {
            Ok(true)
        }
        fn has_done_processing(&self) -> bool {
            true
        }
        fn label_match(&self, label: &str) -> bool {
            label == "noop"
        }
        fn async_flags(&self) -> AsyncOpFlags {
            AsyncOpFlags::default()
        }
        fn async_flags_mut(&mut self) -> &mut AsyncOpFlags {
            unreachable!("not needed in this test")
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn ctor_noop() -> Box<dyn FileProcessor + Send> {
        Box::new(Noop)
    }

    #[test]
    fn instantiate_finds_registered_label() {
        static ENTRIES: &[(&str, Constructor)] = &[("noop", ctor_noop as Constructor)];
        let registry = FileProcessorRegistry::new(ENTRIES);
        assert!(registry.instantiate("noop").is_some());
        assert!(registry.instantiate("missing").is_none());
    }

    #[test]
    fn instantiated_processor_downcasts_back_to_its_concrete_type() {
        static ENTRIES: &[(&str, Constructor)] = &[("noop", ctor_noop as Constructor)];
        let registry = FileProcessorRegistry::new(ENTRIES);
        let mut boxed = registry.instantiate("noop").unwrap();
        assert!(boxed.as_any_mut().downcast_mut::<Noop>().is_some());
    }

    #[test]
    fn async_op_flags_reset_clears_both() {
        let mut flags = AsyncOpFlags {
            read_done: true,
            write_done: true,
        };
        assert!(flags.all_done());
        flags.reset();
        assert!(!flags.all_done());
    }
}
