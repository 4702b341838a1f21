/// CPU-side staging of a uniform block, written member by member
///
/// The block layout is declared by the caller (offset and size per member
/// name, std140 rules are the caller's business). Values are plain `Pod`
/// data, copied byte for byte. Writing an undeclared member is a caller
/// mistake: it is reported once per name and otherwise ignored.

use bytemuck::Pod;
use rustc_hash::FxHashMap;
use crate::engine_warn;
use crate::log::LogOnce;

// ===== BLOCK LAYOUT =====

/// Position of one member inside a uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformMember {
    pub offset: u32,
    pub size: u32,
}

/// Layout of a uniform block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformBlock {
    size: u32,
    members: FxHashMap<String, UniformMember>,
}

impl UniformBlock {
    pub fn new(size: u32) -> Self {
        Self { size, members: FxHashMap::default() }
    }

    /// Declare a member (grows the block if needed)
    pub fn with_member(mut self, name: impl Into<String>, offset: u32, size: u32) -> Self {
        self.size = self.size.max(offset + size);
        self.members.insert(name.into(), UniformMember { offset, size });
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.get(name)
    }
}

// ===== HANDLER =====

pub struct UniformHandler {
    block: UniformBlock,
    data: Vec<u8>,
    dirty: bool,
    reported: LogOnce,
}

impl UniformHandler {
    pub fn new(block: UniformBlock) -> Self {
        let data = vec![0; block.size() as usize];
        Self { block, data, dirty: true, reported: LogOnce::new() }
    }

    /// Write a member value
    ///
    /// Values larger than the member are truncated to the member size.
    pub fn push<T: Pod>(&mut self, name: &str, value: &T) {
        let Some(member) = self.block.member(name).copied() else {
            if self.reported.first_time(name) {
                engine_warn!("fusion::UniformHandler", "Uniform '{}' is not declared in the block", name);
            }
            return;
        };

        let bytes = bytemuck::bytes_of(value);
        if bytes.len() > member.size as usize && self.reported.first_time(name) {
            engine_warn!(
                "fusion::UniformHandler",
                "Uniform '{}' is {} bytes, member holds {}",
                name,
                bytes.len(),
                member.size
            );
        }

        let len = bytes.len().min(member.size as usize);
        let start = member.offset as usize;
        let target = &mut self.data[start..start + len];
        if *target != bytes[..len] {
            target.copy_from_slice(&bytes[..len]);
            self.dirty = true;
        }
    }

    /// Bytes of a member as last written
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        let member = self.block.member(name)?;
        let start = member.offset as usize;
        Some(&self.data[start..start + member.size as usize])
    }

    pub fn block(&self) -> &UniformBlock {
        &self.block
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether a value changed since the last `take_changes`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Block bytes when they changed since the last call, for upload
    pub fn take_changes(&mut self) -> Option<&[u8]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(&self.data)
    }
}

#[cfg(test)]
#[path = "uniform_handler_tests.rs"]
mod tests;
