/// Named descriptor bindings of a subrender
///
/// Declares which names a shader expects (binding index + type) and keeps
/// the resource currently pushed for each. Pushing an undeclared name is
/// reported once per name and otherwise ignored.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::engine_warn;
use crate::graphics_device::{DescriptorSetLayoutBinding, DescriptorType, Sampler, Texture};
use crate::log::LogOnce;

/// Resource bound to a descriptor
#[derive(Clone)]
pub enum Descriptor {
    Texture(Arc<dyn Texture>),
    Sampler(Arc<dyn Sampler>),
    CombinedImageSampler(Arc<dyn Texture>, Arc<dyn Sampler>),
}

impl Descriptor {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            Descriptor::Texture(_) => DescriptorType::SampledImage,
            Descriptor::Sampler(_) => DescriptorType::Sampler,
            Descriptor::CombinedImageSampler(..) => DescriptorType::CombinedImageSampler,
        }
    }

    fn same_resource(&self, other: &Descriptor) -> bool {
        match (self, other) {
            (Descriptor::Texture(a), Descriptor::Texture(b)) => Arc::ptr_eq(a, b),
            (Descriptor::Sampler(a), Descriptor::Sampler(b)) => Arc::ptr_eq(a, b),
            (Descriptor::CombinedImageSampler(ta, sa), Descriptor::CombinedImageSampler(tb, sb)) => {
                Arc::ptr_eq(ta, tb) && Arc::ptr_eq(sa, sb)
            }
            _ => false,
        }
    }
}

struct Slot {
    binding: DescriptorSetLayoutBinding,
    descriptor: Option<Descriptor>,
}

pub struct DescriptorsHandler {
    slots: FxHashMap<String, Slot>,
    changed: bool,
    reported: LogOnce,
}

impl DescriptorsHandler {
    /// Declare the expected names
    pub fn new<I, S>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, DescriptorSetLayoutBinding)>,
        S: Into<String>,
    {
        let slots = bindings
            .into_iter()
            .map(|(name, binding)| (name.into(), Slot { binding, descriptor: None }))
            .collect();
        Self { slots, changed: false, reported: LogOnce::new() }
    }

    /// Bind a resource to a declared name
    pub fn push(&mut self, name: &str, descriptor: Descriptor) {
        let Some(slot) = self.slots.get_mut(name) else {
            if self.reported.first_time(name) {
                engine_warn!("fusion::DescriptorsHandler", "Descriptor '{}' is not declared", name);
            }
            return;
        };

        if descriptor.descriptor_type() != slot.binding.descriptor_type
            && self.reported.first_time(name)
        {
            engine_warn!(
                "fusion::DescriptorsHandler",
                "Descriptor '{}' pushed as {:?}, declared as {:?}",
                name,
                descriptor.descriptor_type(),
                slot.binding.descriptor_type
            );
        }

        let unchanged = slot.descriptor.as_ref().is_some_and(|current| current.same_resource(&descriptor));
        if !unchanged {
            slot.descriptor = Some(descriptor);
            self.changed = true;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.slots.get(name).and_then(|slot| slot.descriptor.as_ref())
    }

    pub fn binding(&self, name: &str) -> Option<&DescriptorSetLayoutBinding> {
        self.slots.get(name).map(|slot| &slot.binding)
    }

    /// Whether every declared name has a resource
    pub fn is_complete(&self) -> bool {
        self.slots.values().all(|slot| slot.descriptor.is_some())
    }

    /// Bound resources sorted by binding index
    pub fn bound(&self) -> Vec<(u32, &Descriptor)> {
        let mut bound: Vec<(u32, &Descriptor)> = self
            .slots
            .values()
            .filter_map(|slot| slot.descriptor.as_ref().map(|d| (slot.binding.binding, d)))
            .collect();
        bound.sort_by_key(|(binding, _)| *binding);
        bound
    }

    /// Whether a binding changed since the last call
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

#[cfg(test)]
#[path = "descriptors_handler_tests.rs"]
mod tests;
