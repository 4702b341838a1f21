/// Pipeline-related GPU objects and their creation descriptors
///
/// Every descriptor here is a cache key: `Hash` and `Eq` cover every field
/// that changes the compiled object. Fields holding other GPU objects compare
/// by identity (`Arc::ptr_eq`), which is structural equality as long as those
/// objects come from a cache themselves.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use bitflags::bitflags;
use crate::graphics_device::{RenderPass, SampleCount, TextureFormat};

bitflags! {
    /// Shader stages a resource is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const GEOMETRY = 1 << 3;
        const TESSELLATION_CONTROL = 1 << 4;
        const TESSELLATION_EVALUATION = 1 << 5;
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::FRAGMENT.bits()
            | Self::GEOMETRY.bits()
            | Self::TESSELLATION_CONTROL.bits()
            | Self::TESSELLATION_EVALUATION.bits();
    }
}

bitflags! {
    /// Descriptor set layout creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DescriptorSetLayoutFlags: u32 {
        const PUSH_DESCRIPTOR = 1 << 0;
        const UPDATE_AFTER_BIND_POOL = 1 << 1;
    }
}

/// Address of the object behind an `Arc<dyn Trait>`, for identity hashing
pub(crate) fn arc_address<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

// ============================================================================
// Descriptor set layouts
// ============================================================================

/// Kind of resource bound at a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    /// Array size (1 for a single resource)
    pub count: u32,
    pub stages: ShaderStageFlags,
}

/// Descriptor for creating a descriptor set layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DescriptorSetLayoutDesc {
    pub flags: DescriptorSetLayoutFlags,
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

/// Descriptor set layout
pub trait DescriptorSetLayout: Send + Sync {
    /// Bindings the layout was created with (sorted by binding index)
    fn bindings(&self) -> &[DescriptorSetLayoutBinding];

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Pipeline layouts
// ============================================================================

/// Push constant range of a pipeline layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// Descriptor for creating a pipeline layout
#[derive(Clone, Default)]
pub struct PipelineLayoutDesc {
    /// Set layouts, in set index order
    pub set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    pub push_constants: Vec<PushConstantRange>,
}

impl PartialEq for PipelineLayoutDesc {
    fn eq(&self, other: &Self) -> bool {
        self.push_constants == other.push_constants
            && self.set_layouts.len() == other.set_layouts.len()
            && self.set_layouts.iter().zip(&other.set_layouts).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Eq for PipelineLayoutDesc {}

impl Hash for PipelineLayoutDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for layout in &self.set_layouts {
            arc_address(layout).hash(state);
        }
        self.push_constants.hash(state);
    }
}

impl std::fmt::Debug for PipelineLayoutDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLayoutDesc")
            .field("set_layouts", &self.set_layouts.len())
            .field("push_constants", &self.push_constants)
            .finish()
    }
}

/// Pipeline layout
pub trait PipelineLayout: Send + Sync {
    /// Push constant ranges (sorted by offset)
    fn push_constants(&self) -> &[PushConstantRange];

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Samplers
// ============================================================================

/// Texel filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Mipmap filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    Nearest,
    Linear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Border color for `AddressMode::ClampToBorder`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

/// Depth/compare operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Descriptor for creating a sampler
///
/// Float fields compare and hash by bit pattern.
#[derive(Debug, Clone, Copy)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mip_lod_bias: f32,
    /// Maximum anisotropy, `None` disables anisotropic filtering
    pub max_anisotropy: Option<f32>,
    /// Depth comparison for shadow samplers
    pub compare: Option<CompareOp>,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: BorderColor,
    pub unnormalized_coordinates: bool,
}

impl SamplerDesc {
    /// Sentinel for "no mip clamp"
    pub const LOD_CLAMP_NONE: f32 = 1000.0;

    fn with_filter(filter: Filter, mipmap_mode: MipmapMode, address: AddressMode) -> Self {
        Self {
            mag_filter: filter,
            min_filter: filter,
            mipmap_mode,
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mip_lod_bias: 0.0,
            max_anisotropy: None,
            compare: None,
            min_lod: 0.0,
            max_lod: Self::LOD_CLAMP_NONE,
            border_color: BorderColor::OpaqueBlack,
            unnormalized_coordinates: false,
        }
    }

    /// Linear filtering, clamped to edge (render stage attachments)
    pub fn linear_clamp() -> Self {
        Self::with_filter(Filter::Linear, MipmapMode::Linear, AddressMode::ClampToEdge)
    }

    /// Linear filtering, repeating
    pub fn linear_repeat() -> Self {
        Self::with_filter(Filter::Linear, MipmapMode::Linear, AddressMode::Repeat)
    }

    /// Nearest filtering, clamped to edge
    pub fn nearest_clamp() -> Self {
        Self::with_filter(Filter::Nearest, MipmapMode::Nearest, AddressMode::ClampToEdge)
    }

    /// Nearest filtering, repeating
    pub fn nearest_repeat() -> Self {
        Self::with_filter(Filter::Nearest, MipmapMode::Nearest, AddressMode::Repeat)
    }

    /// Depth comparison sampler for shadow maps
    pub fn shadow() -> Self {
        Self {
            compare: Some(CompareOp::LessOrEqual),
            border_color: BorderColor::OpaqueWhite,
            ..Self::with_filter(Filter::Linear, MipmapMode::Nearest, AddressMode::ClampToBorder)
        }
    }

    /// Same sampler with anisotropic filtering
    pub fn anisotropic(mut self, max_anisotropy: f32) -> Self {
        self.max_anisotropy = Some(max_anisotropy);
        self
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self::linear_repeat()
    }
}

impl PartialEq for SamplerDesc {
    fn eq(&self, other: &Self) -> bool {
        self.mag_filter == other.mag_filter
            && self.min_filter == other.min_filter
            && self.mipmap_mode == other.mipmap_mode
            && self.address_mode_u == other.address_mode_u
            && self.address_mode_v == other.address_mode_v
            && self.address_mode_w == other.address_mode_w
            && self.mip_lod_bias.to_bits() == other.mip_lod_bias.to_bits()
            && self.max_anisotropy.map(f32::to_bits) == other.max_anisotropy.map(f32::to_bits)
            && self.compare == other.compare
            && self.min_lod.to_bits() == other.min_lod.to_bits()
            && self.max_lod.to_bits() == other.max_lod.to_bits()
            && self.border_color == other.border_color
            && self.unnormalized_coordinates == other.unnormalized_coordinates
    }
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mag_filter.hash(state);
        self.min_filter.hash(state);
        self.mipmap_mode.hash(state);
        self.address_mode_u.hash(state);
        self.address_mode_v.hash(state);
        self.address_mode_w.hash(state);
        self.mip_lod_bias.to_bits().hash(state);
        self.max_anisotropy.map(f32::to_bits).hash(state);
        self.compare.hash(state);
        self.min_lod.to_bits().hash(state);
        self.max_lod.to_bits().hash(state);
        self.border_color.hash(state);
        self.unnormalized_coordinates.hash(state);
    }
}

/// Sampler
pub trait Sampler: Send + Sync {
    /// Parameters the sampler was created with
    fn desc(&self) -> &SamplerDesc;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Graphics pipelines
// ============================================================================

/// SPIR-V shader module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderCode {
    pub spirv: Arc<[u32]>,
    pub entry_point: String,
}

impl ShaderCode {
    pub fn new(spirv: impl Into<Arc<[u32]>>) -> Self {
        Self { spirv: spirv.into(), entry_point: "main".to_string() }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: TextureFormat,
    pub offset: u32,
}

/// Vertex input layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Color blending applied to every color attachment of the subpass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    AlphaBlend,
    Additive,
}

/// Descriptor for creating a graphics pipeline
#[derive(Clone)]
pub struct GraphicsPipelineDesc {
    pub vertex_shader: ShaderCode,
    pub fragment_shader: Option<ShaderCode>,
    pub layout: Arc<dyn PipelineLayout>,
    /// Render pass (compatible) the pipeline is used in
    pub render_pass: Arc<dyn RenderPass>,
    pub subpass: u32,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub blend: BlendMode,
    /// Number of color attachments written by the subpass
    pub color_attachment_count: u32,
    pub samples: SampleCount,
}

impl PartialEq for GraphicsPipelineDesc {
    fn eq(&self, other: &Self) -> bool {
        self.vertex_shader == other.vertex_shader
            && self.fragment_shader == other.fragment_shader
            && Arc::ptr_eq(&self.layout, &other.layout)
            && Arc::ptr_eq(&self.render_pass, &other.render_pass)
            && self.subpass == other.subpass
            && self.vertex_layout == other.vertex_layout
            && self.topology == other.topology
            && self.polygon_mode == other.polygon_mode
            && self.cull_mode == other.cull_mode
            && self.front_face == other.front_face
            && self.depth_test == other.depth_test
            && self.depth_write == other.depth_write
            && self.depth_compare == other.depth_compare
            && self.blend == other.blend
            && self.color_attachment_count == other.color_attachment_count
            && self.samples == other.samples
    }
}

impl Eq for GraphicsPipelineDesc {}

impl Hash for GraphicsPipelineDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vertex_shader.hash(state);
        self.fragment_shader.hash(state);
        arc_address(&self.layout).hash(state);
        arc_address(&self.render_pass).hash(state);
        self.subpass.hash(state);
        self.vertex_layout.hash(state);
        self.topology.hash(state);
        self.polygon_mode.hash(state);
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.depth_test.hash(state);
        self.depth_write.hash(state);
        self.depth_compare.hash(state);
        self.blend.hash(state);
        self.color_attachment_count.hash(state);
        self.samples.hash(state);
    }
}

impl std::fmt::Debug for GraphicsPipelineDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsPipelineDesc")
            .field("subpass", &self.subpass)
            .field("topology", &self.topology)
            .field("blend", &self.blend)
            .field("samples", &self.samples)
            .finish_non_exhaustive()
    }
}

/// Compiled graphics pipeline
pub trait Pipeline: Send + Sync {
    /// Layout the pipeline was compiled against
    fn layout(&self) -> &Arc<dyn PipelineLayout>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
