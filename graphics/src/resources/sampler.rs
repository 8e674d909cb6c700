//! GPU sampler resource.

use crate::backend::GpuSampler;
use crate::device::DeviceId;
use crate::types::SamplerDescriptor;

/// A GPU texture sampler.
///
/// Samplers are created by [`GraphicsDevice::create_sampler`] and are reference-counted.
///
/// # Example
///
/// ```ignore
/// let sampler = device.create_sampler(&SamplerDescriptor::linear())?;
/// ```
///
/// [`GraphicsDevice::create_sampler`]: crate::GraphicsDevice::create_sampler
pub struct Sampler {
    device: DeviceId,
    descriptor: SamplerDescriptor,
    pub(crate) gpu: GpuSampler,
}

impl Sampler {
    /// Create a new sampler (called by GraphicsDevice).
    pub(crate) fn new(device: DeviceId, descriptor: SamplerDescriptor, gpu: GpuSampler) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// The device that created this sampler.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("mag_filter", &self.descriptor.mag_filter)
            .field("min_filter", &self.descriptor.min_filter)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Sampler is Send + Sync
static_assertions::assert_impl_all!(Sampler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_debug() {
        let sampler = Sampler::new(
            DeviceId::for_tests(),
            SamplerDescriptor::linear(),
            GpuSampler::Test,
        );
        let debug = format!("{:?}", sampler);
        assert!(debug.contains("Sampler"));
        assert!(debug.contains("Linear"));
    }

    #[test]
    fn test_sampler_label() {
        let desc = SamplerDescriptor::linear().with_label("test_sampler");
        let sampler = Sampler::new(DeviceId::for_tests(), desc, GpuSampler::Test);
        assert_eq!(sampler.label(), Some("test_sampler"));
    }
}
