//! Query pool resource.

use crate::backend::{gl, GpuQueryPool};
use crate::device::DeviceId;
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{QueryPoolDescriptor, QueryResultFlags, QueryType};

/// A pool of occlusion, pipeline statistics or timestamp queries.
pub struct QueryPool {
    device: DeviceId,
    descriptor: QueryPoolDescriptor,
    pub(crate) gpu: GpuQueryPool,
}

impl QueryPool {
    pub(crate) fn new(device: DeviceId, descriptor: QueryPoolDescriptor, gpu: GpuQueryPool) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// The device that created this pool.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Kind of queries in the pool.
    pub fn query_type(&self) -> QueryType {
        self.descriptor.query_type
    }

    /// Number of queries in the pool.
    pub fn query_count(&self) -> u32 {
        self.descriptor.query_count
    }

    /// Get the pool label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Reads back the results of `count` queries starting at `first`.
    ///
    /// With [`QueryResultFlags::WITH_AVAILABILITY`] every result is followed
    /// by its availability (0 or 1). Without [`QueryResultFlags::WAIT`] an
    /// unfinished query yields [`GraphicsError::NotReady`] unless
    /// [`QueryResultFlags::PARTIAL`] is set.
    pub fn results(
        &self,
        first: u32,
        count: u32,
        flags: QueryResultFlags,
    ) -> GraphicsResult<Vec<u64>> {
        match first.checked_add(count) {
            Some(end) if end <= self.descriptor.query_count => {}
            _ => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "queries {first}+{count} exceed pool size {}",
                    self.descriptor.query_count
                )))
            }
        }
        let per_query = if flags.contains(QueryResultFlags::WITH_AVAILABILITY) {
            2
        } else {
            1
        };
        match &self.gpu {
            GpuQueryPool::Test => {
                let mut results = vec![0; (count * per_query) as usize];
                if per_query == 2 {
                    results.iter_mut().skip(1).step_by(2).for_each(|a| *a = 1);
                }
                Ok(results)
            }
            GpuQueryPool::Gl { context, names, .. } => {
                gl::query_results(context, &names[first as usize..(first + count) as usize], flags)
            }
            #[cfg(feature = "vulkan-backend")]
            GpuQueryPool::Vulkan { device, pool } => {
                crate::backend::vulkan::query_results(device, *pool, first, count, flags)
            }
        }
    }
}

impl std::fmt::Debug for QueryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPool")
            .field("query_type", &self.descriptor.query_type)
            .field("query_count", &self.descriptor.query_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(QueryPool: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> QueryPool {
        QueryPool::new(
            DeviceId::for_tests(),
            QueryPoolDescriptor::new(QueryType::Occlusion, 4),
            GpuQueryPool::Test,
        )
    }

    #[test]
    fn test_results_with_availability() {
        let results = pool()
            .results(1, 2, QueryResultFlags::WITH_AVAILABILITY)
            .unwrap();
        assert_eq!(results, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_results_out_of_range() {
        assert!(matches!(
            pool().results(3, 2, QueryResultFlags::empty()),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }
}
