/// SubrenderHolder - subrenders grouped by pipeline stage
///
/// Registration order is draw order: subrenders bound to the same
/// `PipelineStage` record in the order they were added, whatever their
/// enabled state was in between.

use slotmap::{new_key_type, SlotMap};
use rustc_hash::FxHashMap;
use crate::engine_debug;
use crate::error::Result;
use crate::graphics::GraphicsContext;
use crate::graphics_device::CommandList;
use crate::subrender::{PipelineStage, RenderContext, Subrender};

new_key_type! {
    /// Handle of a registered subrender
    pub struct SubrenderId;
}

struct SubrenderEntry {
    subrender: Box<dyn Subrender>,
    pipeline_stage: PipelineStage,
    enabled: bool,
}

#[derive(Default)]
pub struct SubrenderHolder {
    subrenders: SlotMap<SubrenderId, SubrenderEntry>,
    stages: FxHashMap<PipelineStage, Vec<SubrenderId>>,
}

impl SubrenderHolder {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== REGISTRATION =====

    /// Register an enabled subrender after every subrender already bound to
    /// `pipeline_stage`
    pub fn add<T: Subrender>(&mut self, pipeline_stage: PipelineStage, subrender: T) -> SubrenderId {
        self.add_boxed(pipeline_stage, Box::new(subrender))
    }

    pub fn add_boxed(&mut self, pipeline_stage: PipelineStage, subrender: Box<dyn Subrender>) -> SubrenderId {
        let id = self.subrenders.insert(SubrenderEntry { subrender, pipeline_stage, enabled: true });
        self.stages.entry(pipeline_stage).or_default().push(id);
        engine_debug!(
            "fusion::Subrender",
            "Subrender added on stage {} subpass {}",
            pipeline_stage.stage,
            pipeline_stage.subpass
        );
        id
    }

    /// Unregister a subrender, returning it
    pub fn remove_id(&mut self, id: SubrenderId) -> Option<Box<dyn Subrender>> {
        let entry = self.subrenders.remove(id)?;
        if let Some(ids) = self.stages.get_mut(&entry.pipeline_stage) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.stages.remove(&entry.pipeline_stage);
            }
        }
        Some(entry.subrender)
    }

    /// Unregister every subrender of type `T`, returns how many were removed
    pub fn remove<T: Subrender>(&mut self) -> usize {
        let ids: Vec<SubrenderId> = self
            .subrenders
            .iter()
            .filter(|(_, entry)| entry.subrender.as_any().is::<T>())
            .map(|(id, _)| id)
            .collect();
        for &id in &ids {
            self.remove_id(id);
        }
        ids.len()
    }

    pub fn clear(&mut self) {
        self.subrenders.clear();
        self.stages.clear();
    }

    // ===== QUERIES =====

    pub fn len(&self) -> usize {
        self.subrenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subrenders.is_empty()
    }

    pub fn contains(&self, id: SubrenderId) -> bool {
        self.subrenders.contains_key(id)
    }

    /// Whether a subrender of type `T` is registered
    pub fn has<T: Subrender>(&self) -> bool {
        self.subrenders.values().any(|entry| entry.subrender.as_any().is::<T>())
    }

    /// First registered subrender of type `T`
    pub fn get<T: Subrender>(&self) -> Option<&T> {
        self.subrenders
            .values()
            .find_map(|entry| entry.subrender.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Subrender>(&mut self) -> Option<&mut T> {
        self.subrenders
            .values_mut()
            .find_map(|entry| entry.subrender.as_any_mut().downcast_mut::<T>())
    }

    pub fn get_by_id(&self, id: SubrenderId) -> Option<&dyn Subrender> {
        self.subrenders.get(id).map(|entry| entry.subrender.as_ref())
    }

    pub fn get_by_id_mut(&mut self, id: SubrenderId) -> Option<&mut dyn Subrender> {
        match self.subrenders.get_mut(id) {
            Some(entry) => Some(entry.subrender.as_mut()),
            None => None,
        }
    }

    pub fn pipeline_stage(&self, id: SubrenderId) -> Option<PipelineStage> {
        self.subrenders.get(id).map(|entry| entry.pipeline_stage)
    }

    /// Subrenders bound to a stage, in draw order (enabled or not)
    pub fn ids_for(&self, pipeline_stage: PipelineStage) -> &[SubrenderId] {
        self.stages.get(&pipeline_stage).map(Vec::as_slice).unwrap_or(&[])
    }

    // ===== ENABLED STATE =====

    pub fn is_enabled(&self, id: SubrenderId) -> bool {
        self.subrenders.get(id).is_some_and(|entry| entry.enabled)
    }

    /// Enable or disable a subrender
    ///
    /// `on_enabled`/`on_disabled` fire once per actual transition. Returns
    /// whether the state changed.
    pub fn set_enabled(&mut self, id: SubrenderId, enabled: bool) -> bool {
        let Some(entry) = self.subrenders.get_mut(id) else {
            return false;
        };
        if entry.enabled == enabled {
            return false;
        }
        entry.enabled = enabled;
        if enabled {
            entry.subrender.on_enabled();
        } else {
            entry.subrender.on_disabled();
        }
        true
    }

    // ===== FRAME =====

    /// Run `on_update` of every enabled subrender, in draw order
    pub fn update_all(&mut self, ctx: &GraphicsContext) -> Result<()> {
        let mut pipeline_stages: Vec<PipelineStage> = self.stages.keys().copied().collect();
        pipeline_stages.sort();
        for pipeline_stage in pipeline_stages {
            for id in &self.stages[&pipeline_stage] {
                if let Some(entry) = self.subrenders.get_mut(*id) {
                    if entry.enabled {
                        entry.subrender.on_update(ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Record every enabled subrender bound to `ctx.pipeline_stage`
    pub fn render_stage(&mut self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()> {
        let Some(ids) = self.stages.get(&ctx.pipeline_stage) else {
            return Ok(());
        };
        for id in ids {
            if let Some(entry) = self.subrenders.get_mut(*id) {
                if entry.enabled {
                    entry.subrender.on_render(cmd, ctx)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "subrender_holder_tests.rs"]
mod tests;
