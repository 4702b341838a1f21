/// Mock graphics device for unit tests (no GPU required)
///
/// Behaves like a minimal, immediate GPU:
/// - objects are plain structs, creation is counted per kind
/// - command lists record command names as strings
/// - a submitted fence stays pending until someone waits on it
/// - a semaphore signalled by acquire stays pending until a submission
///   waits on it; dropping it before that is counted
/// - the swapchain reports `OutOfDate` as soon as the simulated surface
///   size differs from its own, like a real driver after a window resize
/// - acquire/present outcomes can be scripted to inject failures

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use raw_window_handle::{DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle};
use crate::error::{Error, Result};
use crate::graphics_device::*;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Shared state
// ============================================================================

/// Creation counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MockStats {
    pub surfaces: usize,
    pub swapchains: usize,
    pub render_passes: usize,
    pub framebuffers: usize,
    pub textures: usize,
    pub samplers: usize,
    pub descriptor_set_layouts: usize,
    pub pipeline_layouts: usize,
    pub pipelines: usize,
    pub semaphores: usize,
    pub fences: usize,
    pub command_pools: usize,
    pub acquires: usize,
    pub submissions: usize,
    pub presents: usize,
    pub wait_idle_calls: usize,
}

struct MockState {
    stats: MockStats,
    surface_extent: Extent2D,
    image_count: u32,
    acquire_script: VecDeque<AcquireResult>,
    present_script: VecDeque<PresentResult>,
    fail_render_pass: bool,
    device_lost: bool,
    fences: Vec<Weak<MockFence>>,
    /// Commands of every submitted command list, one entry per submission
    submitted: Vec<Vec<String>>,
    /// Infos of every texture created, in creation order
    created_textures: Vec<TextureInfo>,
    /// Sizes of every framebuffer created, in creation order
    created_framebuffers: Vec<(u32, u32)>,
}

/// Mock graphics device
pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
    abandoned_signals: Arc<AtomicUsize>,
}

impl MockGraphicsDevice {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                stats: MockStats::default(),
                surface_extent: Extent2D::new(surface_width, surface_height),
                image_count: 3,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fail_render_pass: false,
                device_lost: false,
                fences: Vec::new(),
                submitted: Vec::new(),
                created_textures: Vec::new(),
                created_framebuffers: Vec::new(),
            })),
            abandoned_signals: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate a window resize
    pub fn set_surface_extent(&self, width: u32, height: u32) {
        self.state.lock().unwrap().surface_extent = Extent2D::new(width, height);
    }

    pub fn set_image_count(&self, count: u32) {
        self.state.lock().unwrap().image_count = count;
    }

    /// Force the next acquire results (then back to normal behaviour)
    pub fn script_acquire(&self, result: AcquireResult) {
        self.state.lock().unwrap().acquire_script.push_back(result);
    }

    /// Force the next present results (then back to normal behaviour)
    pub fn script_present(&self, result: PresentResult) {
        self.state.lock().unwrap().present_script.push_back(result);
    }

    /// Make render pass compilation fail
    pub fn fail_render_pass(&self, fail: bool) {
        self.state.lock().unwrap().fail_render_pass = fail;
    }

    /// Make every following submission report device loss
    pub fn lose_device(&self) {
        self.state.lock().unwrap().device_lost = true;
    }

    pub fn stats(&self) -> MockStats {
        self.state.lock().unwrap().stats.clone()
    }

    /// Fences submitted to the GPU and not waited on yet
    pub fn pending_fences(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .fences
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|fence| fence.pending.load(Ordering::SeqCst))
            .count()
    }

    /// Semaphores destroyed while an acquire signal on them was never waited
    pub fn abandoned_signals(&self) -> usize {
        self.abandoned_signals.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn created_textures(&self) -> Vec<TextureInfo> {
        self.state.lock().unwrap().created_textures.clone()
    }

    pub fn created_framebuffers(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().created_framebuffers.clone()
    }

    /// Window whose size follows `set_surface_extent`
    pub fn window(&self) -> Arc<MockWindow> {
        Arc::new(MockWindow { state: Arc::clone(&self.state) })
    }
}

/// Window without a native handle, sized like the simulated surface
pub struct MockWindow {
    state: Arc<Mutex<MockState>>,
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl SurfaceTarget for MockWindow {
    fn drawable_size(&self) -> Extent2D {
        self.state.lock().unwrap().surface_extent
    }
}

fn downcast<'a, T: 'static>(any: &'a dyn Any, what: &str) -> Result<&'a T> {
    any.downcast_ref::<T>()
        .ok_or_else(|| Error::InvalidResource(format!("{} does not belong to the mock device", what)))
}

// ============================================================================
// Mock objects
// ============================================================================

pub struct MockSurface {
    pub id: u64,
}

impl Surface for MockSurface {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSwapchain {
    pub id: u64,
    state: Arc<Mutex<MockState>>,
    extent: Extent2D,
    image_count: u32,
    next_image: u32,
    active_image: u32,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, _timeout_ns: u64) -> Result<AcquireResult> {
        let signal = downcast::<MockSemaphore>(signal.as_any(), "semaphore")?;
        let mut state = self.state.lock().unwrap();
        if state.device_lost {
            return Err(Error::DeviceLost("acquire".to_string()));
        }
        state.stats.acquires += 1;
        let result = match state.acquire_script.pop_front() {
            Some(result) => result,
            None if state.surface_extent != self.extent => AcquireResult::OutOfDate,
            None => {
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                AcquireResult::Acquired(index)
            }
        };
        if let AcquireResult::Acquired(index) | AcquireResult::Suboptimal(index) = result {
            self.active_image = index;
            signal.pending.store(true, Ordering::SeqCst);
        }
        Ok(result)
    }

    fn present(&mut self, image_index: u32, _wait: &dyn Semaphore) -> Result<PresentResult> {
        let mut state = self.state.lock().unwrap();
        if state.device_lost {
            return Err(Error::DeviceLost("present".to_string()));
        }
        state.stats.presents += 1;
        if let Some(last) = state.submitted.last_mut() {
            last.push(format!("present({})", image_index));
        }
        Ok(state.present_script.pop_front().unwrap_or(PresentResult::Presented))
    }

    fn active_image_index(&self) -> u32 {
        self.active_image
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSemaphore {
    pub id: u64,
    pending: AtomicBool,
    abandoned_signals: Arc<AtomicUsize>,
}

impl MockSemaphore {
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Drop for MockSemaphore {
    fn drop(&mut self) {
        if self.is_pending() {
            self.abandoned_signals.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockFence {
    pub id: u64,
    signaled: AtomicBool,
    pending: AtomicBool,
}

impl MockFence {
    fn submit(&self) {
        self.signaled.store(false, Ordering::SeqCst);
        self.pending.store(true, Ordering::SeqCst);
    }
}

impl Fence for MockFence {
    fn wait(&self, _timeout_ns: u64) -> Result<bool> {
        // The GPU finishes the work as soon as the CPU waits for it
        if self.pending.swap(false, Ordering::SeqCst) {
            self.signaled.store(true, Ordering::SeqCst);
        }
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockCommandPool {
    pub id: u64,
    queue: QueueType,
}

impl CommandPool for MockCommandPool {
    fn allocate(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList::new()))
    }

    fn queue_type(&self) -> QueueType {
        self.queue
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock command list that records command names
pub struct MockCommandList {
    pub commands: Vec<String>,
    recording: bool,
}

impl MockCommandList {
    pub fn new() -> Self {
        Self { commands: Vec::new(), recording: false }
    }
}

impl Default for MockCommandList {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }
        self.commands.clear();
        self.commands.push("begin".to_string());
        self.recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        self.commands.push("end".to_string());
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        let pass = downcast::<MockRenderPass>(render_pass.as_any(), "render pass")?;
        self.commands.push(format!(
            "begin_render_pass(pass={}, fb={}x{}, area={}x{}, clears={})",
            pass.id,
            framebuffer.width(),
            framebuffer.height(),
            render_area.width,
            render_area.height,
            clear_values.len()
        ));
        Ok(())
    }

    fn next_subpass(&mut self) -> Result<()> {
        self.commands.push("next_subpass".to_string());
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(format!("set_viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.commands.push(format!("set_scissor({}x{})", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.commands.push("bind_pipeline".to_string());
        Ok(())
    }

    fn push_constants(
        &mut self,
        _layout: &Arc<dyn PipelineLayout>,
        _stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.commands.push(format!("push_constants({}, {})", offset, data.len()));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32) -> Result<()> {
        self.commands.push(format!("draw({}, {})", vertex_count, instance_count));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct MockRenderPass {
    pub id: u64,
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn subpass_count(&self) -> u32 {
        self.desc.subpasses.len() as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockFramebuffer {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub attachment_count: usize,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockTexture {
    pub id: u64,
    pub name: String,
    info: TextureInfo,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSampler {
    pub id: u64,
    desc: SamplerDesc,
}

impl Sampler for MockSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockDescriptorSetLayout {
    pub id: u64,
    bindings: Vec<DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout for MockDescriptorSetLayout {
    fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipelineLayout {
    pub id: u64,
    push_constants: Vec<PushConstantRange>,
}

impl PipelineLayout for MockPipelineLayout {
    fn push_constants(&self) -> &[PushConstantRange] {
        &self.push_constants
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipeline {
    pub id: u64,
    layout: Arc<dyn PipelineLayout>,
}

impl Pipeline for MockPipeline {
    fn layout(&self) -> &Arc<dyn PipelineLayout> {
        &self.layout
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// GraphicsDevice implementation
// ============================================================================

impl GraphicsDevice for MockGraphicsDevice {
    fn create_surface(&self, _target: &dyn SurfaceTarget) -> Result<Box<dyn Surface>> {
        self.state.lock().unwrap().stats.surfaces += 1;
        Ok(Box::new(MockSurface { id: next_id() }))
    }

    fn create_swapchain(
        &self,
        surface: &dyn Surface,
        _extent: Extent2D,
        _old: Option<&dyn Swapchain>,
    ) -> Result<Box<dyn Swapchain>> {
        downcast::<MockSurface>(surface.as_any(), "surface")?;
        let mut state = self.state.lock().unwrap();
        state.stats.swapchains += 1;
        Ok(Box::new(MockSwapchain {
            id: next_id(),
            state: Arc::clone(&self.state),
            extent: state.surface_extent,
            image_count: state.image_count,
            next_image: 0,
            active_image: 0,
        }))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        self.state.lock().unwrap().stats.semaphores += 1;
        Ok(Arc::new(MockSemaphore {
            id: next_id(),
            pending: AtomicBool::new(false),
            abandoned_signals: Arc::clone(&self.abandoned_signals),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>> {
        let fence = Arc::new(MockFence {
            id: next_id(),
            signaled: AtomicBool::new(signaled),
            pending: AtomicBool::new(false),
        });
        let mut state = self.state.lock().unwrap();
        state.stats.fences += 1;
        state.fences.push(Arc::downgrade(&fence));
        Ok(fence)
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<Arc<dyn CommandPool>> {
        self.state.lock().unwrap().stats.command_pools += 1;
        Ok(Arc::new(MockCommandPool { id: next_id(), queue }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_render_pass {
            return Err(Error::BackendError("render pass compilation failed".to_string()));
        }
        state.stats.render_passes += 1;
        Ok(Arc::new(MockRenderPass { id: next_id(), desc: desc.clone() }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn Framebuffer>> {
        downcast::<MockRenderPass>(desc.render_pass.as_any(), "render pass")?;
        let mut state = self.state.lock().unwrap();
        state.stats.framebuffers += 1;
        state.created_framebuffers.push((desc.width, desc.height));
        Ok(Arc::new(MockFramebuffer {
            id: next_id(),
            width: desc.width,
            height: desc.height,
            attachment_count: desc.attachments.len(),
        }))
    }

    fn create_attachment_texture(&self, desc: &AttachmentTextureDesc) -> Result<Arc<dyn Texture>> {
        let info = TextureInfo {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            samples: desc.samples,
        };
        let mut state = self.state.lock().unwrap();
        state.stats.textures += 1;
        state.created_textures.push(info);
        Ok(Arc::new(MockTexture { id: next_id(), name: desc.name.clone(), info }))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        self.state.lock().unwrap().stats.samplers += 1;
        Ok(Arc::new(MockSampler { id: next_id(), desc: *desc }))
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>> {
        self.state.lock().unwrap().stats.descriptor_set_layouts += 1;
        Ok(Arc::new(MockDescriptorSetLayout { id: next_id(), bindings: desc.bindings.clone() }))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>> {
        self.state.lock().unwrap().stats.pipeline_layouts += 1;
        Ok(Arc::new(MockPipelineLayout { id: next_id(), push_constants: desc.push_constants.clone() }))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.state.lock().unwrap().stats.pipelines += 1;
        Ok(Arc::new(MockPipeline { id: next_id(), layout: Arc::clone(&desc.layout) }))
    }

    fn submit(&self, command_list: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()> {
        let list = downcast::<MockCommandList>(command_list.as_any(), "command list")?;
        if list.is_recording() {
            return Err(Error::BackendError("submitting a command list still recording".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        if state.device_lost {
            return Err(Error::DeviceLost("queue submit".to_string()));
        }
        if let Some(wait) = info.wait {
            downcast::<MockSemaphore>(wait.as_any(), "semaphore")?.pending.store(false, Ordering::SeqCst);
        }
        if let Some(fence) = info.fence {
            downcast::<MockFence>(fence.as_any(), "fence")?.submit();
        }
        state.stats.submissions += 1;
        state.submitted.push(list.commands.clone());
        Ok(())
    }

    fn submit_idle(&self, command_list: &dyn CommandList, queue: QueueType) -> Result<()> {
        self.submit(command_list, &SubmitInfo { queue, wait: None, signal: None, fence: None })
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.stats.wait_idle_calls += 1;
        for fence in state.fences.iter().filter_map(Weak::upgrade) {
            fence.wait(0)?;
        }
        Ok(())
    }

    fn depth_format(&self) -> Result<TextureFormat> {
        Ok(TextureFormat::D32_FLOAT)
    }

    fn msaa_samples(&self) -> SampleCount {
        SampleCount::S4
    }

    fn read_swapchain_image(&self, swapchain: &dyn Swapchain, _image_index: u32) -> Result<ImageReadback> {
        let extent = swapchain.extent();
        // Every pixel is pure blue in BGRA order
        let pixels = [255u8, 0, 0, 255].repeat((extent.width * extent.height) as usize);
        Ok(ImageReadback {
            width: extent.width,
            height: extent.height,
            format: swapchain.format(),
            pixels,
        })
    }
}

#[path = "mock_graphics_device_tests.rs"]
mod tests;
