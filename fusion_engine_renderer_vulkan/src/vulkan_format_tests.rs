//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use ash::vk;
use super::*;

fn capabilities(current: vk::Extent2D, min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_images,
        max_image_count: max_images,
        current_extent: current,
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        ..Default::default()
    }
}

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_format_to_vk_color_formats() {
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::R16G16B16A16_SFLOAT), vk::Format::R16G16B16A16_SFLOAT);
}

#[test]
fn test_format_to_vk_depth_formats() {
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT_S8_UINT), vk::Format::D32_SFLOAT_S8_UINT);
}

#[test]
fn test_vk_to_format_inverts_format_to_vk() {
    let formats = [
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::R32G32B32A32_SFLOAT,
        TextureFormat::D16_UNORM,
        TextureFormat::D32_FLOAT_S8_UINT,
    ];
    for format in formats {
        assert_eq!(vk_to_format(format_to_vk(format)), Some(format));
    }
    assert_eq!(vk_to_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

#[test]
fn test_aspect_mask() {
    assert_eq!(aspect_mask(TextureFormat::B8G8R8A8_SRGB), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

// ============================================================================
// MULTISAMPLING
// ============================================================================

#[test]
fn test_max_sample_count_capped_by_config() {
    let supported = vk::SampleCountFlags::TYPE_1
        | vk::SampleCountFlags::TYPE_2
        | vk::SampleCountFlags::TYPE_4
        | vk::SampleCountFlags::TYPE_8;

    assert_eq!(max_sample_count(supported, SampleCount::S16), SampleCount::S8);
    assert_eq!(max_sample_count(supported, SampleCount::S4), SampleCount::S4);
    assert_eq!(max_sample_count(supported, SampleCount::S1), SampleCount::S1);
}

#[test]
fn test_max_sample_count_without_msaa_support() {
    assert_eq!(max_sample_count(vk::SampleCountFlags::TYPE_1, SampleCount::S8), SampleCount::S1);
}

// ============================================================================
// RENDER PASS STATE
// ============================================================================

#[test]
fn test_subpass_ref_to_vk() {
    assert_eq!(subpass_to_vk(SubpassRef::External), vk::SUBPASS_EXTERNAL);
    assert_eq!(subpass_to_vk(SubpassRef::Index(2)), 2);
}

#[test]
fn test_pipeline_stages_combine() {
    let stages = pipeline_stages_to_vk(
        PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
    );
    assert_eq!(
        stages,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
    );
    assert_eq!(pipeline_stages_to_vk(PipelineStageFlags::empty()), vk::PipelineStageFlags::empty());
}

#[test]
fn test_access_flags_combine() {
    let access = access_to_vk(AccessFlags::SHADER_READ | AccessFlags::COLOR_ATTACHMENT_WRITE);
    assert_eq!(access, vk::AccessFlags::SHADER_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
}

#[test]
fn test_layouts_and_ops() {
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(image_layout_to_vk(ImageLayout::ShaderReadOnly), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(load_op_to_vk(LoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(store_op_to_vk(StoreOp::DontCare), vk::AttachmentStoreOp::DONT_CARE);
}

// ============================================================================
// DESCRIPTORS AND PIPELINE STATE
// ============================================================================

#[test]
fn test_shader_stages_all_graphics() {
    let stages = shader_stages_to_vk(ShaderStageFlags::ALL_GRAPHICS);
    assert!(stages.contains(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT));
    assert!(!stages.contains(vk::ShaderStageFlags::COMPUTE));
}

#[test]
fn test_descriptor_types() {
    assert_eq!(descriptor_type_to_vk(DescriptorType::CombinedImageSampler), vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(descriptor_type_to_vk(DescriptorType::UniformBufferDynamic), vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
    assert_eq!(
        set_layout_flags_to_vk(DescriptorSetLayoutFlags::PUSH_DESCRIPTOR),
        vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR
    );
}

#[test]
fn test_blend_modes() {
    let opaque = blend_to_vk(BlendMode::Opaque);
    assert_eq!(opaque.blend_enable, vk::FALSE);

    let additive = blend_to_vk(BlendMode::Additive);
    assert_eq!(additive.blend_enable, vk::TRUE);
    assert_eq!(additive.dst_color_blend_factor, vk::BlendFactor::ONE);

    let alpha = blend_to_vk(BlendMode::AlphaBlend);
    assert_eq!(alpha.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
}

// ============================================================================
// PRESENTATION
// ============================================================================

#[test]
fn test_present_mode_falls_back_to_fifo() {
    let supported = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(choose_present_mode(PresentMode::Immediate, &supported), vk::PresentModeKHR::IMMEDIATE);
    assert_eq!(choose_present_mode(PresentMode::Mailbox, &supported), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_surface_format_prefers_srgb() {
    let formats = [
        vk::SurfaceFormatKHR { format: vk::Format::B8G8R8A8_UNORM, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR },
        vk::SurfaceFormatKHR { format: vk::Format::B8G8R8A8_SRGB, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR },
    ];
    assert_eq!(choose_surface_format(&formats).map(|f| f.format), Some(vk::Format::B8G8R8A8_SRGB));
    assert_eq!(choose_surface_format(&formats[..1]).map(|f| f.format), Some(vk::Format::B8G8R8A8_UNORM));
    assert_eq!(choose_surface_format(&[]), None);
}

#[test]
fn test_extent_uses_surface_extent_when_fixed() {
    let caps = capabilities(vk::Extent2D { width: 800, height: 600 }, 2, 3);
    let extent = choose_extent(&caps, vk::Extent2D { width: 1024, height: 768 });
    assert_eq!((extent.width, extent.height), (800, 600));
}

#[test]
fn test_extent_clamps_desired_size() {
    let caps = capabilities(vk::Extent2D { width: u32::MAX, height: u32::MAX }, 2, 3);
    let extent = choose_extent(&caps, vk::Extent2D { width: 9000, height: 0 });
    assert_eq!((extent.width, extent.height), (4096, 1));
}

#[test]
fn test_image_count() {
    assert_eq!(choose_image_count(&capabilities(vk::Extent2D::default(), 2, 3)), 3);
    assert_eq!(choose_image_count(&capabilities(vk::Extent2D::default(), 3, 3)), 3);
    assert_eq!(choose_image_count(&capabilities(vk::Extent2D::default(), 2, 0)), 3);
}
