/// CommandBuffer - a command list together with the pool it came from
///
/// Dereferences to `dyn CommandList` for recording. The pool is kept alive
/// while the buffer exists, which is what `CommandPools::purge` relies on.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use crate::error::Result;
use crate::graphics::GraphicsContext;
use crate::graphics_device::{CommandList, CommandPool, GraphicsDevice, QueueType, SubmitInfo};

pub struct CommandBuffer {
    // Dropped before the pool it was allocated from
    list: Box<dyn CommandList>,
    pool: Arc<dyn CommandPool>,
    device: Arc<dyn GraphicsDevice>,
}

impl CommandBuffer {
    /// Allocate from the calling thread's pool for `queue`
    pub fn new(ctx: &GraphicsContext, queue: QueueType) -> Result<Self> {
        let pool = ctx.command_pool(queue)?;
        let list = pool.allocate()?;
        Ok(Self { list, pool, device: Arc::clone(ctx.device()) })
    }

    pub fn queue_type(&self) -> QueueType {
        self.pool.queue_type()
    }

    /// Submit with explicit synchronization (frame submission)
    pub fn submit(&self, info: &SubmitInfo<'_>) -> Result<()> {
        self.device.submit(self.list.as_ref(), info)
    }

    /// Submit and block until the queue is idle (one-shot work)
    pub fn submit_idle(&self) -> Result<()> {
        self.device.submit_idle(self.list.as_ref(), self.queue_type())
    }
}

impl Deref for CommandBuffer {
    type Target = dyn CommandList;

    fn deref(&self) -> &Self::Target {
        self.list.as_ref()
    }
}

impl DerefMut for CommandBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.list.as_mut()
    }
}
