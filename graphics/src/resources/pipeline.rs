//! Descriptor layouts, descriptor sets and pipelines.
//!
//! Pipelines are described with a [`PipelineBuilder`] obtained from the
//! device and created by [`PipelineBuilder::finish`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{GpuLayoutObject, GpuPipeline};
use crate::device::{DeviceId, GraphicsDevice};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Buffer, ImageView, RenderPass, Sampler};
use crate::types::{
    ColourBlendState, DepthStencilState, DescriptorSetLayoutBinding, DescriptorType,
    DynamicStateFlags, ImageLayout, InputAssemblyState, MultisampleState, PipelineBindPoint,
    PushConstantRange, RasterisationState, Rect2d, ShaderStage, ShaderStageFlags,
    TessellationState, VertexInputState, Viewport,
};

// ============================================================================
// Descriptor set layout
// ============================================================================

/// The bindings of one descriptor set.
pub struct DescriptorSetLayout {
    device: DeviceId,
    bindings: Vec<DescriptorSetLayoutBinding>,
    /// Flat offset of each binding number: counts summed in binding order.
    offsets: BTreeMap<u32, u32>,
    pub(crate) gpu: GpuLayoutObject,
}

impl DescriptorSetLayout {
    pub(crate) fn new(
        device: DeviceId,
        bindings: Vec<DescriptorSetLayoutBinding>,
        gpu: GpuLayoutObject,
    ) -> Self {
        let mut counts: Vec<_> = bindings.iter().map(|b| (b.binding, b.count.max(1))).collect();
        counts.sort_unstable_by_key(|(binding, _)| *binding);
        let offsets = counts
            .into_iter()
            .scan(0u32, |next, (binding, count)| {
                let offset = *next;
                *next += count;
                Some((binding, offset))
            })
            .collect();
        Self {
            device,
            bindings,
            offsets,
            gpu,
        }
    }

    /// The device that created this layout.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// All bindings of the layout.
    pub fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// The layout binding with the given number.
    pub fn binding(&self, binding: u32) -> Option<&DescriptorSetLayoutBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Flat offset of `binding` within the set.
    ///
    /// Array bindings occupy one slot per element, so the slots of every
    /// binding are disjoint.
    pub fn binding_offset(&self, binding: u32) -> Option<u32> {
        self.offsets.get(&binding).copied()
    }

    /// Number of flat slots the set occupies, 0 for an empty layout.
    pub fn binding_span(&self) -> u32 {
        self.bindings.iter().map(|b| b.count.max(1)).sum()
    }
}

impl std::fmt::Debug for DescriptorSetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSetLayout")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DescriptorSetLayout: Send, Sync);

// ============================================================================
// Pipeline layout
// ============================================================================

/// Descriptor set layouts and push constant ranges used by a pipeline.
///
/// The GL backends have a single flat binding namespace per resource kind;
/// element `e` of binding `b` in set `s` lands on
/// `binding_base(s) + set_layout.binding_offset(b) + e`.
pub struct PipelineLayout {
    device: DeviceId,
    set_layouts: Vec<Arc<DescriptorSetLayout>>,
    push_constant_ranges: Vec<PushConstantRange>,
    binding_bases: Vec<u32>,
    pub(crate) gpu: GpuLayoutObject,
}

impl PipelineLayout {
    pub(crate) fn new(
        device: DeviceId,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_ranges: Vec<PushConstantRange>,
        gpu: GpuLayoutObject,
    ) -> Self {
        let binding_bases = set_layouts
            .iter()
            .scan(0u32, |next, layout| {
                let base = *next;
                *next += layout.binding_span();
                Some(base)
            })
            .collect();
        Self {
            device,
            set_layouts,
            push_constant_ranges,
            binding_bases,
            gpu,
        }
    }

    /// The device that created this layout.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Descriptor set layouts, indexed by set number.
    pub fn set_layouts(&self) -> &[Arc<DescriptorSetLayout>] {
        &self.set_layouts
    }

    /// Push constant ranges.
    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }

    /// First flat binding point of set `set`.
    ///
    /// # Panics
    ///
    /// Panics if the layout has no such set.
    pub fn binding_base(&self, set: u32) -> u32 {
        *self
            .binding_bases
            .get(set as usize)
            .unwrap_or_else(|| panic!("pipeline layout has no descriptor set {set}"))
    }
}

impl std::fmt::Debug for PipelineLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLayout")
            .field("sets", &self.set_layouts.len())
            .field("push_constant_ranges", &self.push_constant_ranges)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(PipelineLayout: Send, Sync);

// ============================================================================
// Descriptor sets
// ============================================================================

/// A resource bound to one descriptor.
#[derive(Debug, Clone)]
pub enum DescriptorResource {
    /// Range of a uniform or storage buffer.
    Buffer {
        buffer: Arc<Buffer>,
        offset: u64,
        range: u64,
    },
    /// Sampled, storage or input attachment image.
    Image {
        view: Arc<ImageView>,
        layout: ImageLayout,
    },
    /// Standalone sampler.
    Sampler(Arc<Sampler>),
    /// Image sampled through a sampler.
    CombinedImageSampler {
        view: Arc<ImageView>,
        sampler: Arc<Sampler>,
        layout: ImageLayout,
    },
}

impl DescriptorResource {
    /// Whether the resource can fill a descriptor of type `ty`.
    pub fn fits(&self, ty: DescriptorType) -> bool {
        match self {
            Self::Buffer { .. } => ty.is_buffer(),
            Self::Image { .. } => matches!(
                ty,
                DescriptorType::SampledImage
                    | DescriptorType::StorageImage
                    | DescriptorType::InputAttachment
            ),
            Self::Sampler(_) => ty == DescriptorType::Sampler,
            Self::CombinedImageSampler { .. } => ty == DescriptorType::CombinedImageSampler,
        }
    }

    fn device_id(&self) -> DeviceId {
        match self {
            Self::Buffer { buffer, .. } => buffer.device_id(),
            Self::Image { view, .. } | Self::CombinedImageSampler { view, .. } => view.device_id(),
            Self::Sampler(sampler) => sampler.device_id(),
        }
    }
}

/// An update of one descriptor.
#[derive(Debug, Clone)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub resource: DescriptorResource,
}

impl DescriptorWrite {
    /// Bind a buffer range.
    pub fn buffer(binding: u32, buffer: &Arc<Buffer>, offset: u64, range: u64) -> Self {
        Self {
            binding,
            array_element: 0,
            resource: DescriptorResource::Buffer {
                buffer: buffer.clone(),
                offset,
                range,
            },
        }
    }

    /// Bind a view sampled through `sampler`.
    pub fn combined_image_sampler(
        binding: u32,
        view: &Arc<ImageView>,
        sampler: &Arc<Sampler>,
    ) -> Self {
        Self {
            binding,
            array_element: 0,
            resource: DescriptorResource::CombinedImageSampler {
                view: view.clone(),
                sampler: sampler.clone(),
                layout: ImageLayout::ShaderReadOnlyOptimal,
            },
        }
    }

    /// Bind an image view.
    pub fn image(binding: u32, view: &Arc<ImageView>, layout: ImageLayout) -> Self {
        Self {
            binding,
            array_element: 0,
            resource: DescriptorResource::Image {
                view: view.clone(),
                layout,
            },
        }
    }

    /// Bind a standalone sampler.
    pub fn sampler(binding: u32, sampler: &Arc<Sampler>) -> Self {
        Self {
            binding,
            array_element: 0,
            resource: DescriptorResource::Sampler(sampler.clone()),
        }
    }

    /// Target a later element of an arrayed binding.
    pub fn at_element(mut self, array_element: u32) -> Self {
        self.array_element = array_element;
        self
    }
}

/// A set of descriptors allocated from a [`DescriptorSetLayout`].
///
/// The set keeps every written resource alive until it is overwritten or the
/// set is dropped.
pub struct DescriptorSet {
    device: DeviceId,
    layout: Arc<DescriptorSetLayout>,
    bound: Mutex<BTreeMap<(u32, u32), DescriptorResource>>,
    pub(crate) gpu: GpuLayoutObject,
}

impl DescriptorSet {
    pub(crate) fn new(device: DeviceId, layout: Arc<DescriptorSetLayout>, gpu: GpuLayoutObject) -> Self {
        Self {
            device,
            layout,
            bound: Mutex::new(BTreeMap::new()),
            gpu,
        }
    }

    /// The device that created this set.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// The layout the set was allocated with.
    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    /// Writes descriptors.
    ///
    /// # Errors
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] when a write targets a
    /// binding the layout lacks, an element past the binding's count, or a
    /// resource of the wrong kind. Nothing is written in that case.
    ///
    /// # Panics
    ///
    /// Panics if a resource belongs to another device.
    pub fn update(&self, writes: &[DescriptorWrite]) -> GraphicsResult<()> {
        for write in writes {
            let binding = self.layout.binding(write.binding).ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "descriptor set layout has no binding {}",
                    write.binding
                ))
            })?;
            if write.array_element >= binding.count {
                return Err(GraphicsError::InvalidParameter(format!(
                    "binding {} has {} elements, element {} written",
                    write.binding, binding.count, write.array_element
                )));
            }
            if !write.resource.fits(binding.descriptor_type) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "binding {} of type {:?} cannot hold {:?}",
                    write.binding, binding.descriptor_type, write.resource
                )));
            }
            assert_eq!(
                write.resource.device_id(),
                self.device,
                "descriptor resource belongs to another device"
            );
        }

        #[cfg(feature = "vulkan-backend")]
        if let GpuLayoutObject::VulkanDescriptorSet { device, set, .. } = &self.gpu {
            crate::backend::vulkan::update_descriptor_set(device, *set, &self.layout, writes);
        }

        let mut bound = self.bound.lock();
        for write in writes {
            bound.insert((write.binding, write.array_element), write.resource.clone());
        }
        log::trace!("DescriptorSet: {} descriptors written", writes.len());
        Ok(())
    }

    /// Snapshot of the written descriptors, keyed by (binding, element).
    pub fn bound_resources(&self) -> Vec<((u32, u32), DescriptorResource)> {
        self.bound
            .lock()
            .iter()
            .map(|(key, resource)| (*key, resource.clone()))
            .collect()
    }
}

impl std::fmt::Debug for DescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSet")
            .field("bindings", &self.layout.bindings().len())
            .field("written", &self.bound.lock().len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DescriptorSet: Send, Sync);

// ============================================================================
// Pipelines
// ============================================================================

/// Fixed-function state of a graphics pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicsState {
    pub vertex_input: VertexInputState,
    pub input_assembly: InputAssemblyState,
    pub tessellation: Option<TessellationState>,
    /// Static viewport; ignored when the viewport is dynamic.
    pub viewport: Option<Viewport>,
    /// Static scissor; ignored when the scissor is dynamic.
    pub scissor: Option<Rect2d>,
    pub rasterisation: RasterisationState,
    pub multisample: MultisampleState,
    /// `None` disables depth and stencil testing.
    pub depth_stencil: Option<DepthStencilState>,
    pub colour_blend: ColourBlendState,
    pub dynamic_state: DynamicStateFlags,
}

/// Everything a pipeline is built from.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    pub label: Option<String>,
    pub bind_point: PipelineBindPoint,
    pub stages: Vec<ShaderStage>,
    /// Fixed-function state; unused by compute pipelines.
    pub state: GraphicsState,
    /// Render pass the pipeline is used in; `None` for compute.
    pub render_pass: Option<Arc<RenderPass>>,
    pub subpass: u32,
}

impl PipelineDescriptor {
    fn validate(&self) -> GraphicsResult<()> {
        let has = |stage| self.stages.iter().any(|s| s.stage == stage);
        match self.bind_point {
            PipelineBindPoint::Graphics => {
                if !has(ShaderStageFlags::VERTEX) {
                    return Err(GraphicsError::InvalidParameter(
                        "graphics pipeline needs a vertex stage".to_string(),
                    ));
                }
                if has(ShaderStageFlags::COMPUTE) {
                    return Err(GraphicsError::InvalidParameter(
                        "graphics pipeline cannot have a compute stage".to_string(),
                    ));
                }
                if let Some(pass) = &self.render_pass {
                    if self.subpass >= pass.subpass_count() {
                        return Err(GraphicsError::InvalidParameter(format!(
                            "render pass has no subpass {}",
                            self.subpass
                        )));
                    }
                }
            }
            PipelineBindPoint::Compute => {
                if self.stages.len() != 1 || !has(ShaderStageFlags::COMPUTE) {
                    return Err(GraphicsError::InvalidParameter(
                        "compute pipeline needs exactly one compute stage".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A graphics or compute pipeline.
pub struct Pipeline {
    device: DeviceId,
    layout: Arc<PipelineLayout>,
    descriptor: PipelineDescriptor,
    pub(crate) gpu: GpuPipeline,
}

impl Pipeline {
    pub(crate) fn new(
        device: DeviceId,
        layout: Arc<PipelineLayout>,
        descriptor: PipelineDescriptor,
        gpu: GpuPipeline,
    ) -> Self {
        Self {
            device,
            layout,
            descriptor,
            gpu,
        }
    }

    /// The device that created this pipeline.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// The pipeline layout.
    pub fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }

    /// The description the pipeline was built from.
    pub fn descriptor(&self) -> &PipelineDescriptor {
        &self.descriptor
    }

    /// Graphics or compute.
    pub fn bind_point(&self) -> PipelineBindPoint {
        self.descriptor.bind_point
    }

    /// Fixed-function state.
    pub fn state(&self) -> &GraphicsState {
        &self.descriptor.state
    }

    /// Whether `flag` is provided by commands rather than by the pipeline.
    pub fn is_dynamic(&self, flag: DynamicStateFlags) -> bool {
        self.descriptor.state.dynamic_state.contains(flag)
    }

    /// Get the pipeline label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("bind_point", &self.descriptor.bind_point)
            .field("stages", &self.descriptor.stages.len())
            .field("label", &self.descriptor.label)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

/// Describes a pipeline, then builds it with [`finish`](Self::finish).
///
/// # Example
///
/// ```ignore
/// let pipeline = device
///     .create_graphics_pipeline(&layout, &render_pass, 0)
///     .with_stage(ShaderStage::new(ShaderStageFlags::VERTEX, vs))
///     .with_stage(ShaderStage::new(ShaderStageFlags::FRAGMENT, fs))
///     .with_dynamic_state(DynamicStateFlags::VIEWPORT | DynamicStateFlags::SCISSOR)
///     .finish()?;
/// ```
pub struct PipelineBuilder {
    device: Arc<GraphicsDevice>,
    layout: Arc<PipelineLayout>,
    descriptor: PipelineDescriptor,
}

impl PipelineBuilder {
    pub(crate) fn graphics(
        device: Arc<GraphicsDevice>,
        layout: Arc<PipelineLayout>,
        render_pass: Arc<RenderPass>,
        subpass: u32,
    ) -> Self {
        Self {
            device,
            layout,
            descriptor: PipelineDescriptor {
                label: None,
                bind_point: PipelineBindPoint::Graphics,
                stages: Vec::new(),
                state: GraphicsState::default(),
                render_pass: Some(render_pass),
                subpass,
            },
        }
    }

    pub(crate) fn compute(
        device: Arc<GraphicsDevice>,
        layout: Arc<PipelineLayout>,
        stage: ShaderStage,
    ) -> Self {
        Self {
            device,
            layout,
            descriptor: PipelineDescriptor {
                label: None,
                bind_point: PipelineBindPoint::Compute,
                stages: vec![stage],
                state: GraphicsState::default(),
                render_pass: None,
                subpass: 0,
            },
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.descriptor.label = Some(label.into());
        self
    }

    /// Add a shader stage.
    pub fn with_stage(mut self, stage: ShaderStage) -> Self {
        self.descriptor.stages.push(stage);
        self
    }

    pub fn with_vertex_input(mut self, state: VertexInputState) -> Self {
        self.descriptor.state.vertex_input = state;
        self
    }

    pub fn with_input_assembly(mut self, state: InputAssemblyState) -> Self {
        self.descriptor.state.input_assembly = state;
        self
    }

    pub fn with_tessellation(mut self, state: TessellationState) -> Self {
        self.descriptor.state.tessellation = Some(state);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.descriptor.state.viewport = Some(viewport);
        self
    }

    pub fn with_scissor(mut self, scissor: Rect2d) -> Self {
        self.descriptor.state.scissor = Some(scissor);
        self
    }

    pub fn with_rasterisation(mut self, state: RasterisationState) -> Self {
        self.descriptor.state.rasterisation = state;
        self
    }

    pub fn with_multisample(mut self, state: MultisampleState) -> Self {
        self.descriptor.state.multisample = state;
        self
    }

    pub fn with_depth_stencil(mut self, state: DepthStencilState) -> Self {
        self.descriptor.state.depth_stencil = Some(state);
        self
    }

    pub fn with_colour_blend(mut self, state: ColourBlendState) -> Self {
        self.descriptor.state.colour_blend = state;
        self
    }

    /// Mark state as provided by commands.
    pub fn with_dynamic_state(mut self, flags: DynamicStateFlags) -> Self {
        self.descriptor.state.dynamic_state |= flags;
        self
    }

    /// The pipeline description so far.
    pub fn descriptor(&self) -> &PipelineDescriptor {
        &self.descriptor
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] for an incomplete
    /// description, [`GraphicsError::FeatureNotSupported`] when the backend
    /// cannot run it, and [`GraphicsError::ResourceCreationFailed`] when the
    /// native compile or link step fails.
    pub fn finish(self) -> GraphicsResult<Arc<Pipeline>> {
        self.descriptor.validate()?;
        self.device.build_pipeline(self.layout, self.descriptor)
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DescriptorType;

    fn set_layout(bindings: &[(u32, DescriptorType)]) -> Arc<DescriptorSetLayout> {
        Arc::new(DescriptorSetLayout::new(
            DeviceId::for_tests(),
            bindings
                .iter()
                .map(|(b, ty)| DescriptorSetLayoutBinding::new(*b, *ty, ShaderStageFlags::ALL_GRAPHICS))
                .collect(),
            GpuLayoutObject::Emulated,
        ))
    }

    #[test]
    fn test_binding_bases_accumulate_spans() {
        let first = set_layout(&[
            (0, DescriptorType::UniformBuffer),
            (2, DescriptorType::CombinedImageSampler),
        ]);
        let second = set_layout(&[(1, DescriptorType::StorageBuffer)]);
        let layout = PipelineLayout::new(
            first.device_id(),
            vec![first, set_layout(&[]), second],
            Vec::new(),
            GpuLayoutObject::Emulated,
        );
        assert_eq!(layout.binding_base(0), 0);
        assert_eq!(layout.binding_base(1), 2);
        assert_eq!(layout.binding_base(2), 2);
    }

    #[test]
    fn test_array_bindings_take_one_slot_per_element() {
        let array = DescriptorSetLayoutBinding::new(
            0,
            DescriptorType::UniformBuffer,
            ShaderStageFlags::VERTEX,
        )
        .with_count(2);
        let layout = DescriptorSetLayout::new(
            DeviceId::for_tests(),
            vec![
                DescriptorSetLayoutBinding::new(
                    3,
                    DescriptorType::UniformBuffer,
                    ShaderStageFlags::VERTEX,
                ),
                array,
                DescriptorSetLayoutBinding::new(
                    1,
                    DescriptorType::UniformBuffer,
                    ShaderStageFlags::VERTEX,
                ),
            ],
            GpuLayoutObject::Emulated,
        );
        assert_eq!(layout.binding_offset(0), Some(0));
        assert_eq!(layout.binding_offset(1), Some(2));
        assert_eq!(layout.binding_offset(3), Some(3));
        assert_eq!(layout.binding_offset(2), None);
        assert_eq!(layout.binding_span(), 4);
    }

    #[test]
    fn test_resource_fits_descriptor_type() {
        let sampler = Arc::new(Sampler::new(
            DeviceId::for_tests(),
            Default::default(),
            crate::backend::GpuSampler::Test,
        ));
        let resource = DescriptorResource::Sampler(sampler);
        assert!(resource.fits(DescriptorType::Sampler));
        assert!(!resource.fits(DescriptorType::UniformBuffer));
    }

    #[test]
    fn test_update_rejects_unknown_binding() {
        let layout = set_layout(&[(0, DescriptorType::Sampler)]);
        let set = DescriptorSet::new(layout.device_id(), layout, GpuLayoutObject::Emulated);
        let sampler = Arc::new(Sampler::new(
            set.device_id(),
            Default::default(),
            crate::backend::GpuSampler::Test,
        ));
        assert!(set.update(&[DescriptorWrite::sampler(3, &sampler)]).is_err());
        set.update(&[DescriptorWrite::sampler(0, &sampler)]).unwrap();
        assert_eq!(set.bound_resources().len(), 1);
    }
}
