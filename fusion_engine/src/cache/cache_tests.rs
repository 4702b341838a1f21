//! Unit tests for the object caches
//!
//! Every test runs against the mock device and checks creation counters to
//! prove deduplication.

use std::sync::Arc;
use std::thread;
use super::*;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::*;

fn mock() -> (Arc<MockGraphicsDevice>, Arc<dyn GraphicsDevice>) {
    let mock = Arc::new(MockGraphicsDevice::new(800, 600));
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    (mock, device)
}

fn binding(binding: u32, descriptor_type: DescriptorType) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding { binding, descriptor_type, count: 1, stages: ShaderStageFlags::FRAGMENT }
}

// ============================================================================
// OBJECT CACHE
// ============================================================================

#[test]
fn test_object_cache_creates_once_per_key() {
    let cache: ObjectCache<u32, u32> = ObjectCache::new("Test");
    let mut calls = 0;

    let a = cache.get_or_create(7, |key| { calls += 1; Ok(*key * 10) }).unwrap();
    let b = cache.get_or_create(7, |key| { calls += 1; Ok(*key * 10) }).unwrap();
    let c = cache.get_or_create(8, |key| { calls += 1; Ok(*key * 10) }).unwrap();

    assert_eq!((a, b, c), (70, 70, 80));
    assert_eq!(calls, 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_object_cache_failure_is_not_cached() {
    let cache: ObjectCache<u32, u32> = ObjectCache::new("Test");

    let result = cache.get_or_create(1, |_| Err(Error::OutOfMemory));
    assert_eq!(result, Err(Error::OutOfMemory));
    assert!(cache.is_empty());

    assert_eq!(cache.get_or_create(1, |_| Ok(5)), Ok(5));
    assert_eq!(cache.len(), 1);
}

/// Every key hashes to the same bucket: equality must still tell them apart
#[derive(Debug, Clone, PartialEq, Eq)]
struct Colliding(u32);

impl std::hash::Hash for Colliding {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        0u32.hash(state);
    }
}

#[test]
fn test_object_cache_hash_collision_keeps_entries_apart() {
    let cache: ObjectCache<Colliding, u32> = ObjectCache::new("Test");

    assert_eq!(cache.get_or_create(Colliding(1), |k| Ok(k.0)), Ok(1));
    assert_eq!(cache.get_or_create(Colliding(2), |k| Ok(k.0)), Ok(2));
    assert_eq!(cache.get_or_create(Colliding(1), |_| Ok(99)), Ok(1));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_object_cache_concurrent_requests_share_one_object() {
    let cache: Arc<ObjectCache<u32, Arc<u32>>> = Arc::new(ObjectCache::new("Test"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_create(42, |key| Ok(Arc::new(*key))).unwrap())
        })
        .collect();
    let values: Vec<Arc<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    assert!(values.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

// ============================================================================
// SAMPLER CACHE
// ============================================================================

#[test]
fn test_sampler_cache_miss_then_hit() {
    let (mock, device) = mock();
    let cache = SamplerCache::new(device);
    let desc = SamplerDesc::linear_clamp();

    let first = cache.create(&desc).unwrap();
    assert_eq!(mock.stats().samplers, 1);

    let second = cache.create(&SamplerDesc::linear_clamp()).unwrap();
    assert_eq!(mock.stats().samplers, 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.desc().address_mode_u, AddressMode::ClampToEdge);
}

#[test]
fn test_sampler_cache_distinct_descs() {
    let (mock, device) = mock();
    let cache = SamplerCache::new(device);

    let linear = cache.create(&SamplerDesc::linear_clamp()).unwrap();
    let nearest = cache.create(&SamplerDesc::nearest_clamp()).unwrap();
    let aniso = cache.create(&SamplerDesc::linear_clamp().anisotropic(16.0)).unwrap();

    assert!(!Arc::ptr_eq(&linear, &nearest));
    assert!(!Arc::ptr_eq(&linear, &aniso));
    assert_eq!(mock.stats().samplers, 3);
    assert_eq!(cache.len(), 3);
}

// ============================================================================
// LAYOUT CACHES
// ============================================================================

#[test]
fn test_descriptor_layout_cache_ignores_binding_order() {
    let (mock, device) = mock();
    let cache = DescriptorLayoutCache::new(device);

    let a = cache
        .create(&DescriptorSetLayoutDesc {
            flags: DescriptorSetLayoutFlags::empty(),
            bindings: vec![
                binding(0, DescriptorType::UniformBuffer),
                binding(1, DescriptorType::CombinedImageSampler),
            ],
        })
        .unwrap();
    let b = cache
        .create(&DescriptorSetLayoutDesc {
            flags: DescriptorSetLayoutFlags::empty(),
            bindings: vec![
                binding(1, DescriptorType::CombinedImageSampler),
                binding(0, DescriptorType::UniformBuffer),
            ],
        })
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(mock.stats().descriptor_set_layouts, 1);
    assert_eq!(a.bindings()[0].binding, 0);
}

#[test]
fn test_descriptor_layout_cache_distinguishes_types() {
    let (mock, device) = mock();
    let cache = DescriptorLayoutCache::new(device);

    let uniform = cache
        .create(&DescriptorSetLayoutDesc { flags: DescriptorSetLayoutFlags::empty(), bindings: vec![binding(0, DescriptorType::UniformBuffer)] })
        .unwrap();
    let storage = cache
        .create(&DescriptorSetLayoutDesc { flags: DescriptorSetLayoutFlags::empty(), bindings: vec![binding(0, DescriptorType::StorageBuffer)] })
        .unwrap();

    assert!(!Arc::ptr_eq(&uniform, &storage));
    assert_eq!(mock.stats().descriptor_set_layouts, 2);
}

#[test]
fn test_pipeline_layout_cache_dedup() {
    let (mock, device) = mock();
    let set_layouts = DescriptorLayoutCache::new(Arc::clone(&device));
    let layouts = PipelineLayoutCache::new(device);

    let set = set_layouts
        .create(&DescriptorSetLayoutDesc { flags: DescriptorSetLayoutFlags::empty(), bindings: vec![binding(0, DescriptorType::UniformBuffer)] })
        .unwrap();
    let vertex = PushConstantRange { stages: ShaderStageFlags::VERTEX, offset: 0, size: 64 };
    let fragment = PushConstantRange { stages: ShaderStageFlags::FRAGMENT, offset: 64, size: 16 };

    let a = layouts
        .create(&PipelineLayoutDesc { set_layouts: vec![Arc::clone(&set)], push_constants: vec![vertex, fragment] })
        .unwrap();
    let b = layouts
        .create(&PipelineLayoutDesc { set_layouts: vec![Arc::clone(&set)], push_constants: vec![fragment, vertex] })
        .unwrap();
    let c = layouts
        .create(&PipelineLayoutDesc { set_layouts: vec![], push_constants: vec![vertex] })
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(mock.stats().pipeline_layouts, 2);
    assert_eq!(a.push_constants()[0].offset, 0);
}

// ============================================================================
// PIPELINE CACHE
// ============================================================================

fn pipeline_desc(
    layout: &Arc<dyn PipelineLayout>,
    render_pass: &Arc<dyn RenderPass>,
    blend: BlendMode,
) -> GraphicsPipelineDesc {
    GraphicsPipelineDesc {
        vertex_shader: ShaderCode::new(vec![0x0723_0203u32, 1, 2]),
        fragment_shader: Some(ShaderCode::new(vec![0x0723_0203u32, 3, 4])),
        layout: Arc::clone(layout),
        render_pass: Arc::clone(render_pass),
        subpass: 0,
        vertex_layout: VertexLayout::default(),
        topology: PrimitiveTopology::TriangleList,
        polygon_mode: PolygonMode::Fill,
        cull_mode: CullMode::Back,
        front_face: FrontFace::CounterClockwise,
        depth_test: true,
        depth_write: true,
        depth_compare: CompareOp::Less,
        blend,
        color_attachment_count: 1,
        samples: SampleCount::S1,
    }
}

#[test]
fn test_pipeline_cache_dedup_and_distinct() {
    let (mock, device) = mock();
    let layouts = PipelineLayoutCache::new(Arc::clone(&device));
    let pipelines = PipelineCache::new(Arc::clone(&device));

    let layout = layouts.create(&PipelineLayoutDesc::default()).unwrap();
    let render_pass = device
        .create_render_pass(&RenderPassDesc { attachments: vec![], subpasses: vec![SubpassDesc::default()], dependencies: vec![] })
        .unwrap();

    let opaque = pipelines.create(&pipeline_desc(&layout, &render_pass, BlendMode::Opaque)).unwrap();
    let again = pipelines.create(&pipeline_desc(&layout, &render_pass, BlendMode::Opaque)).unwrap();
    let blended = pipelines.create(&pipeline_desc(&layout, &render_pass, BlendMode::AlphaBlend)).unwrap();

    assert!(Arc::ptr_eq(&opaque, &again));
    assert!(!Arc::ptr_eq(&opaque, &blended));
    assert_eq!(mock.stats().pipelines, 2);
    assert!(Arc::ptr_eq(opaque.layout(), &layout));
}

#[test]
fn test_pipeline_cache_render_pass_identity_is_part_of_key() {
    let (mock, device) = mock();
    let pipelines = PipelineCache::new(Arc::clone(&device));
    let layout = device.create_pipeline_layout(&PipelineLayoutDesc::default()).unwrap();
    let pass_desc = RenderPassDesc { attachments: vec![], subpasses: vec![SubpassDesc::default()], dependencies: vec![] };
    let pass_a = device.create_render_pass(&pass_desc).unwrap();
    let pass_b = device.create_render_pass(&pass_desc).unwrap();

    pipelines.create(&pipeline_desc(&layout, &pass_a, BlendMode::Opaque)).unwrap();
    pipelines.create(&pipeline_desc(&layout, &pass_b, BlendMode::Opaque)).unwrap();

    assert_eq!(mock.stats().pipelines, 2);
}
