/// DeviceContext - Vulkan objects shared by every backend resource
///
/// Every resource created by `VulkanGraphicsDevice` keeps an
/// `Arc<DeviceContext>`: the instance, device and allocator are destroyed
/// only once the last texture, swapchain or pipeline is gone.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::QueueType;
use fusion_engine::{engine_error, engine_warn};

pub(crate) const SOURCE: &str = "fusion::vulkan";

/// Validation layer loader and messenger
pub(crate) struct DebugMessenger {
    pub loader: ash::ext::debug_utils::Instance,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

pub struct DeviceContext {
    /// Keeps the Vulkan library loaded
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is released BEFORE the device
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics + present queue, externally synchronized through the mutex
    queue: Mutex<vk::Queue>,
    pub(crate) queue_family: u32,

    /// Driver-side pipeline cache fed to every pipeline compilation
    pub(crate) pipeline_cache: vk::PipelineCache,

    /// Pool for one-shot transfer work (screenshots)
    pub(crate) transient_pool: Mutex<vk::CommandPool>,

    pub(crate) debug: Option<DebugMessenger>,
}

impl DeviceContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        queue_family: u32,
        pipeline_cache: vk::PipelineCache,
        transient_pool: vk::CommandPool,
        debug: Option<DebugMessenger>,
    ) -> Self {
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        Self {
            entry,
            instance,
            surface_loader,
            physical_device,
            device,
            swapchain_loader,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue: Mutex::new(queue),
            queue_family,
            pipeline_cache,
            transient_pool: Mutex::new(transient_pool),
            debug,
        }
    }

    /// Lock the queue for submission or presentation
    pub(crate) fn queue(&self) -> Result<MutexGuard<'_, vk::Queue>> {
        self.queue
            .lock()
            .map_err(|_| Error::BackendError("Vulkan queue mutex poisoned".to_string()))
    }

    /// Queue family serving `queue_type`
    ///
    /// Compute and transfer work share the graphics family.
    pub(crate) fn queue_family(&self, _queue_type: QueueType) -> u32 {
        self.queue_family
    }

    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator mutex poisoned".to_string()))
    }

    /// Block until the device is idle (queue held, so no submit races it)
    pub(crate) fn wait_idle(&self) -> Result<()> {
        let _queue = self.queue()?;
        unsafe { self.device.device_wait_idle() }.map_err(|e| vk_error(e, "Failed to wait for device idle"))
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                engine_warn!(SOURCE, "device_wait_idle failed during teardown: {:?}", e);
            }

            if let Ok(pool) = self.transient_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }
            self.device.destroy_pipeline_cache(self.pipeline_cache, None);

            // Free VkDeviceMemory pages before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            // Stop callbacks before the instance goes away
            if let Some(debug) = self.debug.take() {
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Translate a failed Vulkan call into an engine error, logging it
///
/// Device loss and memory exhaustion keep their own variants so the frame
/// loop can tell them apart.
pub(crate) fn vk_error(result: vk::Result, what: &str) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, result);
    match result {
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost(format!("{}: {:?}", what, result)),
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
        _ => Error::BackendError(format!("{}: {:?}", what, result)),
    }
}

/// Same as `vk_error`, for failures during device bring-up
pub(crate) fn init_error(result: vk::Result, what: &str) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, result);
    Error::InitializationFailed(format!("{}: {:?}", what, result))
}
