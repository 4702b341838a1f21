/// Conversions between engine descriptions and Vulkan enums
///
/// Pure functions, no device needed.

use ash::vk;
use fusion_engine::fusion::device::{
    AccessFlags, AddressMode, BlendMode, BorderColor, CompareOp, CullMode, DescriptorSetLayoutFlags,
    DescriptorType, Filter, FrontFace, ImageLayout, LoadOp, MipmapMode, PipelineStageFlags,
    PolygonMode, PresentMode, PrimitiveTopology, SampleCount, ShaderStageFlags, StoreOp, SubpassRef,
    TextureFormat, VertexInputRate,
};

// ============================================================================
// Formats
// ============================================================================

/// Convert TextureFormat to Vulkan format
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Undefined => vk::Format::UNDEFINED,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R8_UNORM => vk::Format::R8_UNORM,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
        TextureFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        TextureFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        TextureFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
    }
}

/// Convert a Vulkan format back to TextureFormat (`None` if the engine has no equivalent)
pub(crate) fn vk_to_format(format: vk::Format) -> Option<TextureFormat> {
    let format = match format {
        vk::Format::R8G8B8A8_SRGB => TextureFormat::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => TextureFormat::R8G8B8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => TextureFormat::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => TextureFormat::B8G8R8A8_UNORM,
        vk::Format::R16G16B16A16_SFLOAT => TextureFormat::R16G16B16A16_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => TextureFormat::R32G32B32A32_SFLOAT,
        vk::Format::R8_UNORM => TextureFormat::R8_UNORM,
        vk::Format::D16_UNORM => TextureFormat::D16_UNORM,
        vk::Format::D32_SFLOAT => TextureFormat::D32_FLOAT,
        vk::Format::D24_UNORM_S8_UINT => TextureFormat::D24_UNORM_S8_UINT,
        vk::Format::D32_SFLOAT_S8_UINT => TextureFormat::D32_FLOAT_S8_UINT,
        vk::Format::R32_SFLOAT => TextureFormat::R32_SFLOAT,
        vk::Format::R32G32_SFLOAT => TextureFormat::R32G32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT => TextureFormat::R32G32B32_SFLOAT,
        _ => return None,
    };
    Some(format)
}

/// Image aspect of a format
pub(crate) fn aspect_mask(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub(crate) fn sample_count_to_vk(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::S16 => vk::SampleCountFlags::TYPE_16,
    }
}

/// Highest sample count contained in `supported` and not above `max`
pub(crate) fn max_sample_count(supported: vk::SampleCountFlags, max: SampleCount) -> SampleCount {
    [SampleCount::S16, SampleCount::S8, SampleCount::S4, SampleCount::S2]
        .into_iter()
        .filter(|&samples| samples <= max)
        .find(|&samples| supported.contains(sample_count_to_vk(samples)))
        .unwrap_or(SampleCount::S1)
}

// ============================================================================
// Render passes
// ============================================================================

pub(crate) fn load_op_to_vk(op: LoadOp) -> vk::AttachmentLoadOp {
    match op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_to_vk(op: StoreOp) -> vk::AttachmentStoreOp {
    match op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        ImageLayout::General => vk::ImageLayout::GENERAL,
    }
}

pub(crate) fn subpass_to_vk(subpass: SubpassRef) -> u32 {
    match subpass {
        SubpassRef::External => vk::SUBPASS_EXTERNAL,
        SubpassRef::Index(index) => index,
    }
}

pub(crate) fn pipeline_stages_to_vk(stages: PipelineStageFlags) -> vk::PipelineStageFlags {
    const MAPPING: [(PipelineStageFlags, vk::PipelineStageFlags); 8] = [
        (PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
        (PipelineStageFlags::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
        (PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        (PipelineStageFlags::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS),
        (PipelineStageFlags::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::LATE_FRAGMENT_TESTS),
        (PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        (PipelineStageFlags::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    ];
    MAPPING
        .iter()
        .filter(|(engine, _)| stages.contains(*engine))
        .fold(vk::PipelineStageFlags::empty(), |acc, (_, vk_stage)| acc | *vk_stage)
}

pub(crate) fn access_to_vk(access: AccessFlags) -> vk::AccessFlags {
    const MAPPING: [(AccessFlags, vk::AccessFlags); 8] = [
        (AccessFlags::SHADER_READ, vk::AccessFlags::SHADER_READ),
        (AccessFlags::COLOR_ATTACHMENT_READ, vk::AccessFlags::COLOR_ATTACHMENT_READ),
        (AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        (AccessFlags::TRANSFER_READ, vk::AccessFlags::TRANSFER_READ),
        (AccessFlags::MEMORY_READ, vk::AccessFlags::MEMORY_READ),
        (AccessFlags::MEMORY_WRITE, vk::AccessFlags::MEMORY_WRITE),
    ];
    MAPPING
        .iter()
        .filter(|(engine, _)| access.contains(*engine))
        .fold(vk::AccessFlags::empty(), |acc, (_, vk_access)| acc | *vk_access)
}

// ============================================================================
// Descriptors
// ============================================================================

pub(crate) fn shader_stages_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    const MAPPING: [(ShaderStageFlags, vk::ShaderStageFlags); 6] = [
        (ShaderStageFlags::VERTEX, vk::ShaderStageFlags::VERTEX),
        (ShaderStageFlags::FRAGMENT, vk::ShaderStageFlags::FRAGMENT),
        (ShaderStageFlags::COMPUTE, vk::ShaderStageFlags::COMPUTE),
        (ShaderStageFlags::GEOMETRY, vk::ShaderStageFlags::GEOMETRY),
        (ShaderStageFlags::TESSELLATION_CONTROL, vk::ShaderStageFlags::TESSELLATION_CONTROL),
        (ShaderStageFlags::TESSELLATION_EVALUATION, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
    ];
    MAPPING
        .iter()
        .filter(|(engine, _)| stages.contains(*engine))
        .fold(vk::ShaderStageFlags::empty(), |acc, (_, vk_stage)| acc | *vk_stage)
}

pub(crate) fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorType::UniformBufferDynamic => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        DescriptorType::StorageBufferDynamic => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        DescriptorType::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
    }
}

pub(crate) fn set_layout_flags_to_vk(flags: DescriptorSetLayoutFlags) -> vk::DescriptorSetLayoutCreateFlags {
    let mut vk_flags = vk::DescriptorSetLayoutCreateFlags::empty();
    if flags.contains(DescriptorSetLayoutFlags::PUSH_DESCRIPTOR) {
        vk_flags |= vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR;
    }
    if flags.contains(DescriptorSetLayoutFlags::UPDATE_AFTER_BIND_POOL) {
        vk_flags |= vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL;
    }
    vk_flags
}

// ============================================================================
// Samplers
// ============================================================================

pub(crate) fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode_to_vk(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub(crate) fn border_color_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

// ============================================================================
// Pipeline state
// ============================================================================

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn input_rate_to_vk(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

/// Color blend state of one attachment
pub(crate) fn blend_to_vk(blend: BlendMode) -> vk::PipelineColorBlendAttachmentState {
    let attachment = vk::PipelineColorBlendAttachmentState::default().color_write_mask(
        vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B | vk::ColorComponentFlags::A,
    );
    match blend {
        BlendMode::Opaque => attachment.blend_enable(false),
        BlendMode::AlphaBlend => attachment
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD),
        BlendMode::Additive => attachment
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE)
            .alpha_blend_op(vk::BlendOp::ADD),
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Pick the present mode, FIFO when the requested one is not supported
pub(crate) fn choose_present_mode(requested: PresentMode, supported: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    let wanted = match requested {
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    };
    if supported.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Pick the surface format: sRGB BGRA/RGBA when offered, the first one otherwise
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            (f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// Swapchain extent: the surface's when fixed, `desired` clamped otherwise
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, desired: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: desired
            .width
            .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: desired
            .height
            .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image above the minimum, capped by the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
