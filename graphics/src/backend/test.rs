//! Headless bookkeeping backend.
//!
//! Nothing is drawn. Submissions walk their command lists, remember the name
//! of every operation and simulate buffer copies on the shadow memory of
//! test buffers, so tests can check ordering and data flow without a GPU.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::GpuBuffer;
use crate::command::{CommandList, Operation, PresentInfo, SubmitBatch};
use crate::error::GraphicsResult;
use crate::resources::Fence;

/// State of the Test backend.
pub(crate) struct TestBackend {
    executed: Mutex<Vec<&'static str>>,
    presents: AtomicU64,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        log::info!("Test backend initialized");
        Self {
            executed: Mutex::new(Vec::new()),
            presents: AtomicU64::new(0),
        }
    }

    /// Names of every executed operation, in execution order.
    pub(crate) fn executed(&self) -> Vec<&'static str> {
        self.executed.lock().clone()
    }

    pub(crate) fn present_count(&self) -> u64 {
        self.presents.load(Ordering::Relaxed)
    }

    /// Executes the batches; returns the number of operations executed.
    pub(crate) fn submit(&self, batches: &[SubmitBatch<'_>], fence: Option<&Fence>) -> GraphicsResult<u64> {
        let mut executed = self.executed.lock();
        let mut count = 0;
        for batch in batches {
            batch.wait_emulated();
            for list in &batch.lists {
                count += Self::replay(list, &mut executed);
            }
            batch.signal_emulated();
        }
        if let Some(fence) = fence {
            fence.signal_emulated();
        }
        Ok(count)
    }

    fn replay(list: &CommandList, executed: &mut Vec<&'static str>) -> u64 {
        let mut count = 0;
        for operation in list {
            log::trace!("Test: {}", operation.name());
            executed.push(operation.name());
            count += 1;
            match operation {
                Operation::CopyBuffer { src, dst, regions } => {
                    for region in regions {
                        copy_shadow(&src.gpu, &dst.gpu, region.src_offset, region.dst_offset, region.size);
                    }
                }
                Operation::ExecuteCommands { lists } => {
                    for list in lists {
                        count += Self::replay(list, executed);
                    }
                }
                _ => {}
            }
        }
        count
    }

    pub(crate) fn present(&self, info: &PresentInfo<'_>) -> GraphicsResult<()> {
        for semaphore in &info.wait_semaphores {
            semaphore.consume_emulated();
        }
        self.presents
            .fetch_add(info.swap_chains.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

fn copy_shadow(src: &GpuBuffer, dst: &GpuBuffer, src_offset: u64, dst_offset: u64, size: u64) {
    let (GpuBuffer::Test { memory: src }, GpuBuffer::Test { memory: dst }) = (src, dst) else {
        return;
    };
    let (src_offset, dst_offset, size) = (src_offset as usize, dst_offset as usize, size as usize);
    // Same buffer: copy through a temporary to keep a single lock.
    let bytes = match src.lock().get(src_offset..src_offset + size) {
        Some(bytes) => bytes.to_vec(),
        None => panic!("copy source range {src_offset}+{size} out of bounds"),
    };
    let mut dst = dst.lock();
    match dst.get_mut(dst_offset..dst_offset + size) {
        Some(target) => target.copy_from_slice(&bytes),
        None => panic!("copy destination range {dst_offset}+{size} out of bounds"),
    }
}

impl std::fmt::Debug for TestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestBackend")
            .field("executed", &self.executed.lock().len())
            .field("presents", &self.present_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_shadow_between_buffers() {
        let src = GpuBuffer::Test {
            memory: Mutex::new(vec![1, 2, 3, 4]),
        };
        let dst = GpuBuffer::Test {
            memory: Mutex::new(vec![0; 4]),
        };
        copy_shadow(&src, &dst, 1, 0, 3);
        let GpuBuffer::Test { memory } = &dst else {
            unreachable!()
        };
        assert_eq!(*memory.lock(), vec![2, 3, 4, 0]);
    }

    #[test]
    fn test_copy_shadow_within_one_buffer() {
        let buffer = GpuBuffer::Test {
            memory: Mutex::new(vec![5, 6, 0, 0]),
        };
        copy_shadow(&buffer, &buffer, 0, 2, 2);
        let GpuBuffer::Test { memory } = &buffer else {
            unreachable!()
        };
        assert_eq!(*memory.lock(), vec![5, 6, 5, 6]);
    }
}
