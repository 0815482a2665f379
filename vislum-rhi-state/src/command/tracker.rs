use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
};

use ash::vk;

use crate::{
    command::{
        AccessFlags, BufferMemoryBarrier, ImageLayout, ImageMemoryBarrier, ImageSubresourceRange,
        PipelineStageFlags,
        tables::{TrackedState, texture_layout},
    },
    queue::QueueType,
    resource::{
        BufferBarrier, BufferId, BufferStateFlags, GlobalState, ImageId, RegistryInner,
        ResourceBarrierFlags, SubresourceIndex, TextureBarrier, TextureStateFlags,
        TextureSubresources,
    },
};

/// The barriers recorded by one `vkCmdPipelineBarrier` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierBatch {
    pub buffer_barriers: Vec<BufferMemoryBarrier>,
    pub image_barriers: Vec<ImageMemoryBarrier>,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
}

impl BarrierBatch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer_barriers.is_empty() && self.image_barriers.is_empty()
    }
}

/// The release half of the ownership transfers out of one queue family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueTransferBarriers {
    pub buffer_barriers: Vec<BufferMemoryBarrier>,
    pub image_barriers: Vec<ImageMemoryBarrier>,
}

/// How one declared state change reaches the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Executed entirely on the recording queue.
    SameQueue {
        before: S,
        after: S,
        flags: ResourceBarrierFlags,
        /// `before` was derived from tracked state rather than declared.
        automatic: bool,
    },
    /// The resource is owned by `source_family`. The matching release is
    /// submitted on that family and this entry is the acquire.
    CrossQueueTransfer { before: S, after: S, source_family: u32 },
    /// Makes the writes of this command buffer available to later accessors.
    Finish { state: S },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SubresourceKey {
    image: ImageId,
    slot: u32,
}

#[derive(Debug, Clone, Copy)]
struct TextureTarget {
    image: vk::Image,
    range: ImageSubresourceRange,
}

struct BarrierFields {
    src_access: AccessFlags,
    dst_access: AccessFlags,
    old_layout: ImageLayout,
    new_layout: ImageLayout,
    src_family: u32,
    dst_family: u32,
}

/// A state type together with the barrier it is lowered into.
trait LaneState: TrackedState {
    type Target: Copy;
    type Barrier;

    fn layout(self) -> ImageLayout;

    fn barrier(target: Self::Target, fields: BarrierFields) -> Self::Barrier;
}

impl LaneState for BufferStateFlags {
    type Target = vk::Buffer;
    type Barrier = BufferMemoryBarrier;

    fn layout(self) -> ImageLayout {
        ImageLayout::Undefined
    }

    fn barrier(buffer: vk::Buffer, fields: BarrierFields) -> BufferMemoryBarrier {
        BufferMemoryBarrier {
            buffer,
            src_access_mask: fields.src_access,
            dst_access_mask: fields.dst_access,
            src_queue_family_index: fields.src_family,
            dst_queue_family_index: fields.dst_family,
        }
    }
}

impl LaneState for TextureStateFlags {
    type Target = TextureTarget;
    type Barrier = ImageMemoryBarrier;

    fn layout(self) -> ImageLayout {
        texture_layout(self)
    }

    fn barrier(target: TextureTarget, fields: BarrierFields) -> ImageMemoryBarrier {
        ImageMemoryBarrier {
            image: target.image,
            subresource_range: target.range,
            src_access_mask: fields.src_access,
            dst_access_mask: fields.dst_access,
            old_layout: fields.old_layout,
            new_layout: fields.new_layout,
            src_queue_family_index: fields.src_family,
            dst_queue_family_index: fields.dst_family,
        }
    }
}

impl<S: LaneState> Transition<S> {
    /// Lowers the transition into a barrier and its source/destination stages.
    ///
    /// Returns `None` when the transition does not need a barrier.
    fn lower(
        self,
        target: S::Target,
        queue_family: u32,
        queue_type: QueueType,
    ) -> Option<(S::Barrier, PipelineStageFlags, PipelineStageFlags)> {
        match self {
            Transition::SameQueue {
                before,
                after,
                flags,
                automatic,
            } => {
                let discards = flags.discards();
                if before == after && !discards {
                    return None;
                }

                let (src_access, old_layout) = if discards {
                    (AccessFlags::empty(), ImageLayout::Undefined)
                } else {
                    (before.access(), before.layout())
                };

                let src_stages = if automatic && flags.contains(ResourceBarrierFlags::ALIASING) {
                    PipelineStageFlags::ALL_COMMANDS
                } else {
                    before.stages(queue_type)
                };

                let fields = BarrierFields {
                    src_access,
                    dst_access: after.access(),
                    old_layout,
                    new_layout: after.layout(),
                    src_family: vk::QUEUE_FAMILY_IGNORED,
                    dst_family: vk::QUEUE_FAMILY_IGNORED,
                };
                Some((S::barrier(target, fields), src_stages, after.stages(queue_type)))
            }
            Transition::CrossQueueTransfer {
                before,
                after,
                source_family,
            } => {
                // Visibility on the source side is handled by the release and the semaphore.
                let fields = BarrierFields {
                    src_access: AccessFlags::empty(),
                    dst_access: after.access(),
                    old_layout: before.layout(),
                    new_layout: after.layout(),
                    src_family: source_family,
                    dst_family: queue_family,
                };
                Some((
                    S::barrier(target, fields),
                    PipelineStageFlags::empty(),
                    after.stages(queue_type),
                ))
            }
            Transition::Finish { state } => {
                let access = state.access();
                if access.is_empty() {
                    return None;
                }

                let fields = BarrierFields {
                    src_access: access,
                    dst_access: AccessFlags::empty(),
                    old_layout: state.layout(),
                    new_layout: state.layout(),
                    src_family: vk::QUEUE_FAMILY_IGNORED,
                    dst_family: vk::QUEUE_FAMILY_IGNORED,
                };
                Some((
                    S::barrier(target, fields),
                    state.stages(queue_type),
                    PipelineStageFlags::BOTTOM_OF_PIPE,
                ))
            }
        }
    }

    /// The release half of a queue family ownership transfer.
    fn release(
        before: S,
        after: S,
        target: S::Target,
        source_family: u32,
        queue_family: u32,
    ) -> S::Barrier {
        let fields = BarrierFields {
            src_access: before.access(),
            dst_access: AccessFlags::empty(),
            old_layout: before.layout(),
            new_layout: after.layout(),
            src_family: source_family,
            dst_family: queue_family,
        };
        S::barrier(target, fields)
    }
}

#[derive(Debug, Clone, Copy)]
struct Unresolved<S> {
    after: S,
    flags: ResourceBarrierFlags,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// The key has an entry at this index of the batch.
    Emitted(usize),
    /// The key was first touched in this batch and waits for `resolve`.
    Deferred,
}

/// The tracking tables for one kind of resource.
struct Lane<K, S: LaneState> {
    current: HashMap<K, S>,
    unresolved: HashMap<K, Unresolved<S>>,
    targets: HashMap<K, S::Target>,
    batch: Vec<(K, Transition<S>)>,
    slots: HashMap<K, Slot>,
}

impl<K, S: LaneState> Default for Lane<K, S> {
    fn default() -> Self {
        Self {
            current: HashMap::new(),
            unresolved: HashMap::new(),
            targets: HashMap::new(),
            batch: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<K, S> Lane<K, S>
where
    K: Copy + Eq + Hash + Ord + Debug,
    S: LaneState,
{
    fn clear_batch(&mut self) {
        self.batch.clear();
        self.slots.clear();
    }

    fn clear(&mut self) {
        self.clear_batch();
        self.current.clear();
        self.unresolved.clear();
        self.targets.clear();
    }

    fn pack(
        &mut self,
        key: K,
        target: S::Target,
        before: S,
        after: S,
        flags: ResourceBarrierFlags,
    ) {
        let after = after.concrete();
        self.targets.insert(key, target);

        // Two declarations for the same key in one batch: the last one wins.
        match self.slots.get(&key).copied() {
            Some(Slot::Emitted(index)) => {
                log::debug!("{:?} declared twice in one barrier batch, keeping {:?}", key, after);
                if let (_, Transition::SameQueue { after: pending, flags: pending_flags, .. }) =
                    &mut self.batch[index]
                {
                    *pending = after;
                    *pending_flags |= flags;
                }
                self.current.insert(key, after);
                return;
            }
            Some(Slot::Deferred) => {
                log::debug!("{:?} declared twice in one barrier batch, keeping {:?}", key, after);
                if let Some(entry) = self.unresolved.get_mut(&key) {
                    entry.after = after;
                    entry.flags |= flags;
                }
                self.current.insert(key, after);
                return;
            }
            None => {}
        }

        let automatic = before.is_automatic();
        let before = if automatic {
            self.current.get(&key).copied()
        } else {
            Some(before)
        };

        self.current.insert(key, after);
        match before {
            Some(before) => {
                let index = self.batch.len();
                self.batch.push((
                    key,
                    Transition::SameQueue {
                        before,
                        after,
                        flags,
                        automatic,
                    },
                ));
                self.slots.insert(key, Slot::Emitted(index));
            }
            None => {
                self.unresolved.insert(key, Unresolved { after, flags });
                self.slots.insert(key, Slot::Deferred);
            }
        }
    }

    /// Resolves every deferred key against its global state.
    fn resolve(
        &mut self,
        queue_family: u32,
        mut global_state: impl FnMut(K) -> Option<GlobalState<S>>,
        mut release: impl FnMut(u32, S::Barrier),
    ) {
        let mut unresolved: Vec<_> = self.unresolved.drain().collect();
        unresolved.sort_by_key(|(key, _)| *key);

        for (key, entry) in unresolved {
            let target = self.targets.get(&key).copied();
            let (Some(global), Some(target)) = (global_state(key), target) else {
                log::warn!("{:?} was destroyed before its command buffer was submitted", key);
                self.current.remove(&key);
                continue;
            };

            let transition = match global.owner {
                Some(owner) if owner != queue_family && !entry.flags.discards() => {
                    release(
                        owner,
                        Transition::release(global.state, entry.after, target, owner, queue_family),
                    );
                    Transition::CrossQueueTransfer {
                        before: global.state,
                        after: entry.after,
                        source_family: owner,
                    }
                }
                _ => Transition::SameQueue {
                    before: global.state,
                    after: entry.after,
                    flags: entry.flags,
                    automatic: true,
                },
            };

            self.batch.push((key, transition));
        }
    }

    fn finish(&mut self) {
        let mut keys: Vec<_> = self.current.keys().copied().collect();
        keys.sort();

        for key in keys {
            let state = self.current[&key];
            self.batch.push((key, Transition::Finish { state }));
        }
    }

    fn lower_batch(
        &self,
        queue_family: u32,
        queue_type: QueueType,
        barriers: &mut Vec<S::Barrier>,
        src_stages: &mut PipelineStageFlags,
        dst_stages: &mut PipelineStageFlags,
    ) {
        for (key, transition) in &self.batch {
            let Some(target) = self.targets.get(key).copied() else {
                continue;
            };

            if let Some((barrier, src, dst)) = transition.lower(target, queue_family, queue_type) {
                barriers.push(barrier);
                *src_stages |= src;
                *dst_stages |= dst;
            }
        }
    }

    /// Iterates the final state of every key touched by this recording.
    fn touched(&self) -> impl Iterator<Item = (K, S)> + '_ {
        self.current.iter().map(|(key, state)| (*key, *state))
    }
}

/// Tracks the resource state transitions of one command buffer recording.
///
/// Declarations whose before-state is known while recording become barriers
/// immediately. The first declaration for a resource with an automatic
/// before-state is deferred until submission, where it is resolved against
/// the state published by the previous submission. Resolution may also
/// discover that the resource is owned by another queue family, in which case
/// the transition becomes an ownership transfer.
///
/// The tracker never writes global state except in [`apply`], which must
/// only be called after the command buffer was handed to its queue.
///
/// [`apply`]: ResourceStateTracker::apply
pub struct ResourceStateTracker {
    queue_family: u32,
    queue_type: QueueType,
    buffers: Lane<BufferId, BufferStateFlags>,
    textures: Lane<SubresourceKey, TextureStateFlags>,
    queue_transfers: BTreeMap<u32, QueueTransferBarriers>,
    observed_buffers: HashMap<BufferId, u64>,
    observed_textures: HashMap<ImageId, u64>,
}

impl ResourceStateTracker {
    pub fn new(queue_family: u32, queue_type: QueueType) -> Self {
        Self {
            queue_family,
            queue_type,
            buffers: Lane::default(),
            textures: Lane::default(),
            queue_transfers: BTreeMap::new(),
            observed_buffers: HashMap::new(),
            observed_textures: HashMap::new(),
        }
    }

    #[inline]
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Starts a new batch, discarding the barriers and queue transfers of the previous one.
    pub fn begin_new_barriers_batch(&mut self) {
        self.buffers.clear_batch();
        self.textures.clear_batch();
        self.queue_transfers.clear();
    }

    pub fn pack_buffer(&mut self, registry: &RegistryInner, barrier: &BufferBarrier) {
        let Some(handle) = registry.buffer_handle(barrier.buffer) else {
            log::warn!("ignoring barrier for destroyed buffer {:?}", barrier.buffer);
            return;
        };

        self.buffers.pack(
            barrier.buffer,
            handle,
            barrier.before,
            barrier.after,
            barrier.flags,
        );
    }

    /// Packs a texture barrier. Whole-texture barriers are split into one
    /// entry per subresource.
    pub fn pack_image(&mut self, registry: &RegistryInner, barrier: &TextureBarrier) {
        let Some(info) = registry.texture_info(barrier.texture) else {
            log::warn!("ignoring barrier for destroyed texture {:?}", barrier.texture);
            return;
        };

        let slots = match barrier.subresources {
            TextureSubresources::All => 0..info.subresource_count(),
            TextureSubresources::Single(index) => match info.subresource_slot(index) {
                Some(slot) => slot..slot + 1,
                None => {
                    log::warn!(
                        "ignoring barrier for {:?}: subresource {:?} is out of range",
                        barrier.texture,
                        index
                    );
                    return;
                }
            },
        };

        for slot in slots {
            let subresource = info.subresource_at(slot);
            let target = TextureTarget {
                image: info.handle,
                range: ImageSubresourceRange::single(
                    info.aspect,
                    subresource.mip_level,
                    subresource.array_slice,
                ),
            };

            self.textures.pack(
                SubresourceKey {
                    image: barrier.texture,
                    slot,
                },
                target,
                barrier.before,
                barrier.after,
                barrier.flags,
            );
        }
    }

    /// Lowers the current batch into hardware barriers.
    ///
    /// Empty stage masks default to `TOP_OF_PIPE` for the source and
    /// `BOTTOM_OF_PIPE` for the destination.
    pub fn barriers(&self) -> BarrierBatch {
        let mut batch = BarrierBatch::default();
        self.buffers.lower_batch(
            self.queue_family,
            self.queue_type,
            &mut batch.buffer_barriers,
            &mut batch.src_stage_mask,
            &mut batch.dst_stage_mask,
        );
        self.textures.lower_batch(
            self.queue_family,
            self.queue_type,
            &mut batch.image_barriers,
            &mut batch.src_stage_mask,
            &mut batch.dst_stage_mask,
        );

        if !batch.is_empty() {
            let (src, dst) = (batch.src_stage_mask, batch.dst_stage_mask);
            batch.src_stage_mask = src.or_if_empty(PipelineStageFlags::TOP_OF_PIPE);
            batch.dst_stage_mask = dst.or_if_empty(PipelineStageFlags::BOTTOM_OF_PIPE);
        }

        batch
    }

    /// Returns `true` if some first accesses still wait for [`resolve`](Self::resolve).
    pub fn has_unresolved(&self) -> bool {
        !self.buffers.unresolved.is_empty() || !self.textures.unresolved.is_empty()
    }

    /// Resolves every deferred first access against the global state.
    ///
    /// Starts a new batch holding the resolved barriers. Ownership transfers
    /// are split into an acquire in that batch and a release collected for
    /// [`take_queue_transfers`](Self::take_queue_transfers).
    pub fn resolve(&mut self, registry: &RegistryInner) {
        self.begin_new_barriers_batch();

        let queue_family = self.queue_family;
        let queue_transfers = &mut self.queue_transfers;
        let observed_buffers = &mut self.observed_buffers;
        self.buffers.resolve(
            queue_family,
            |id| {
                observed_buffers.insert(id, registry.buffer_generation(id)?);
                registry.buffer_state(id)
            },
            |family, barrier| {
                queue_transfers
                    .entry(family)
                    .or_default()
                    .buffer_barriers
                    .push(barrier)
            },
        );

        let observed_textures = &mut self.observed_textures;
        self.textures.resolve(
            queue_family,
            |key| {
                observed_textures.insert(key.image, registry.texture_generation(key.image)?);
                registry.texture_state(key.image, key.slot)
            },
            |family, barrier| {
                queue_transfers
                    .entry(family)
                    .or_default()
                    .image_barriers
                    .push(barrier)
            },
        );

        log::debug!(
            "resolved batch with {} buffer and {} texture entries, {} queue transfers",
            self.buffers.batch.len(),
            self.textures.batch.len(),
            self.queue_transfers.len()
        );
    }

    /// Takes the release barriers of the last resolve, keyed by the family
    /// that owns the resources.
    pub fn take_queue_transfers(&mut self) -> BTreeMap<u32, QueueTransferBarriers> {
        std::mem::take(&mut self.queue_transfers)
    }

    /// Starts a new batch making the final state of every touched resource
    /// available to whatever runs after this command buffer.
    pub fn generate_finish_barriers(&mut self) {
        self.begin_new_barriers_batch();
        self.buffers.finish();
        self.textures.finish();
    }

    /// Publishes the final state of every touched resource.
    ///
    /// Must be called once the command buffer was submitted, before any
    /// later submission touching the same resources is resolved. Debug
    /// builds return how many resources were published by another
    /// submission since this one resolved them. Release builds return 0.
    pub fn apply(&self, registry: &mut RegistryInner) -> usize {
        let owner = Some(self.queue_family);
        let mut races = 0;

        let mut buffers: Vec<BufferId> = Vec::new();
        for (id, state) in self.buffers.touched() {
            if registry.publish_buffer(id, GlobalState::new(state, owner)) {
                buffers.push(id);
            }
        }

        let mut textures: Vec<ImageId> = Vec::new();
        for (key, state) in self.textures.touched() {
            if registry.publish_texture(key.image, key.slot, GlobalState::new(state, owner)) {
                textures.push(key.image);
            }
        }
        textures.sort();
        textures.dedup();

        for id in buffers {
            if cfg!(debug_assertions) {
                let observed = self.observed_buffers.get(&id);
                let current = registry.buffer_generation(id);
                races += usize::from(check_generation(id, observed, current));
            }
            registry.bump_buffer_generation(id);
        }

        for id in textures {
            if cfg!(debug_assertions) {
                let observed = self.observed_textures.get(&id);
                let current = registry.texture_generation(id);
                races += usize::from(check_generation(id, observed, current));
            }
            registry.bump_texture_generation(id);
        }

        races
    }

    /// Returns the layout a texture subresource is in at the current point of
    /// the recording, or `None` if the texture does not exist.
    pub fn get_image_layout(
        &self,
        registry: &RegistryInner,
        texture: ImageId,
        subresource: SubresourceIndex,
    ) -> Option<ImageLayout> {
        let info = registry.texture_info(texture)?;
        let slot = info.subresource_slot(subresource)?;
        let key = SubresourceKey {
            image: texture,
            slot,
        };

        match self.textures.current.get(&key) {
            Some(state) => Some(texture_layout(*state)),
            None => registry
                .texture_state(texture, slot)
                .map(|global| texture_layout(global.state)),
        }
    }

    /// Forgets everything recorded so far. Global state is left untouched.
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.queue_transfers.clear();
        self.observed_buffers.clear();
        self.observed_textures.clear();
    }
}

/// Returns `true` if another submission published `key` since it was resolved.
fn check_generation<K: Debug>(key: K, observed: Option<&u64>, current: Option<u64>) -> bool {
    match (observed, current) {
        (Some(observed), Some(current)) if *observed != current => {
            log::warn!(
                "{:?} was published by another submission between resolve and apply \
                 (generation {} -> {}); submissions sharing it are not ordered",
                key,
                observed,
                current
            );
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;
    use crate::resource::{BufferDesc, ResourceRegistry, TextureDesc};

    const GRAPHICS: u32 = 0;
    const COMPUTE: u32 = 1;
    const COPY: u32 = 2;

    fn texture(
        registry: &ResourceRegistry,
        state: TextureStateFlags,
        owner: Option<u32>,
    ) -> ImageId {
        registry.register_texture(TextureDesc {
            initial_state: GlobalState::new(state, owner),
            ..TextureDesc::new(vk::Image::from_raw(0x10), vk::Format::R8G8B8A8_UNORM, 1, 1)
        })
    }

    fn buffer(
        registry: &ResourceRegistry,
        state: BufferStateFlags,
        owner: Option<u32>,
    ) -> BufferId {
        registry.register_buffer(BufferDesc {
            initial_state: GlobalState::new(state, owner),
            ..BufferDesc::new(vk::Buffer::from_raw(0x20))
        })
    }

    fn pack_image(
        tracker: &mut ResourceStateTracker,
        registry: &ResourceRegistry,
        barrier: TextureBarrier,
    ) {
        tracker.begin_new_barriers_batch();
        tracker.pack_image(&registry.lock(), &barrier);
    }

    fn resolve(tracker: &mut ResourceStateTracker, registry: &ResourceRegistry) -> BarrierBatch {
        tracker.resolve(&registry.lock());
        tracker.barriers()
    }

    #[test]
    fn test_first_access_is_deferred() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_DEST),
        );
        assert!(tracker.barriers().is_empty());
        assert!(tracker.has_unresolved());

        let batch = resolve(&mut tracker, &registry);
        assert!(!tracker.has_unresolved());
        assert_eq!(batch.image_barriers.len(), 1);

        let barrier = batch.image_barriers[0];
        assert_eq!(barrier.old_layout, ImageLayout::Undefined);
        assert_eq!(barrier.new_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(barrier.src_access_mask, AccessFlags::empty());
        assert_eq!(barrier.dst_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_chaining_within_recording() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_DEST),
        );
        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_PS),
        );

        let batch = tracker.barriers();
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(batch.image_barriers[0].new_layout, ImageLayout::ShaderReadOnlyOptimal);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TRANSFER);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::FRAGMENT_SHADER);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COLOR_ATTACHMENT_WRITE),
        );
        let batch = tracker.barriers();
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::ShaderReadOnlyOptimal);
        assert_eq!(batch.image_barriers[0].new_layout, ImageLayout::ColorAttachmentOptimal);

        // The first access is still resolved against the global state.
        let batch = resolve(&mut tracker, &registry);
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].new_layout, ImageLayout::TransferDstOptimal);
    }

    #[test]
    fn test_explicit_before_state_is_emitted_immediately() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::new(id, BufferStateFlags::COPY_DEST, BufferStateFlags::VERTEX_BUFFER),
        );

        let batch = tracker.barriers();
        assert!(!tracker.has_unresolved());
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.buffer_barriers[0].dst_access_mask, AccessFlags::VERTEX_ATTRIBUTE_READ);
        assert_eq!(batch.buffer_barriers[0].src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TRANSFER);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::VERTEX_INPUT);
    }

    #[test]
    fn test_no_op_when_state_already_matches() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::SHADER_READ_CS, Some(GRAPHICS));
        let id = buffer(&registry, BufferStateFlags::UNIFORM_BUFFER_CS, Some(GRAPHICS));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_image(
            &registry.lock(),
            &TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_CS),
        );
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::UNIFORM_BUFFER_CS),
        );

        let batch = resolve(&mut tracker, &registry);
        assert!(batch.is_empty());
        assert!(tracker.take_queue_transfers().is_empty());
    }

    #[test]
    fn test_queue_transfer_pairing() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::COPY_SOURCE, Some(COPY));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_CS),
        );
        let batch = resolve(&mut tracker, &registry);

        assert_eq!(batch.image_barriers.len(), 1);
        let acquire = batch.image_barriers[0];
        assert_eq!(acquire.src_queue_family_index, COPY);
        assert_eq!(acquire.dst_queue_family_index, GRAPHICS);
        assert_eq!(acquire.src_access_mask, AccessFlags::empty());
        assert_eq!(acquire.dst_access_mask, AccessFlags::SHADER_READ);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::COMPUTE_SHADER);

        let transfers = tracker.take_queue_transfers();
        assert_eq!(transfers.len(), 1);
        let release = transfers[&COPY].image_barriers[0];
        assert_eq!(transfers[&COPY].image_barriers.len(), 1);
        assert!(transfers[&COPY].buffer_barriers.is_empty());
        assert_eq!(release.src_queue_family_index, COPY);
        assert_eq!(release.dst_queue_family_index, GRAPHICS);
        assert_eq!(release.src_access_mask, AccessFlags::TRANSFER_READ);
        assert_eq!(release.dst_access_mask, AccessFlags::empty());
        assert_eq!(release.old_layout, acquire.old_layout);
        assert_eq!(release.new_layout, acquire.new_layout);
    }

    #[test]
    fn test_discarded_content_skips_queue_transfer() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::COPY_SOURCE, Some(COPY));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COLOR_ATTACHMENT_WRITE)
                .with_flags(ResourceBarrierFlags::DISCARD_CONTENT),
        );
        let batch = resolve(&mut tracker, &registry);

        assert!(tracker.take_queue_transfers().is_empty());
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::Undefined);
        assert_eq!(batch.image_barriers[0].src_access_mask, AccessFlags::empty());
        assert_eq!(batch.image_barriers[0].src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }

    #[test]
    fn test_aliasing_waits_on_all_commands() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::SHADER_WRITE_CS, Some(GRAPHICS));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::COPY_DEST)
                .with_flags(ResourceBarrierFlags::ALIASING),
        );
        let batch = resolve(&mut tracker, &registry);

        assert_eq!(batch.src_stage_mask, PipelineStageFlags::ALL_COMMANDS);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::empty());
    }

    #[test]
    fn test_copy_then_graphics_scenario() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::COPY_DEST, Some(COPY));

        // Recorded for the copy queue.
        let mut copy = ResourceStateTracker::new(COPY, QueueType::Copy);
        pack_image(
            &mut copy,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_SOURCE),
        );
        let batch = resolve(&mut copy, &registry);

        assert!(copy.take_queue_transfers().is_empty());
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(batch.image_barriers[0].new_layout, ImageLayout::TransferSrcOptimal);
        assert_eq!(batch.image_barriers[0].src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.image_barriers[0].dst_access_mask, AccessFlags::TRANSFER_READ);

        copy.apply(&mut registry.lock());
        assert_eq!(
            registry.texture_state(image, SubresourceIndex::default()),
            Some(GlobalState::new(TextureStateFlags::COPY_SOURCE, Some(COPY)))
        );

        // Recorded for the graphics queue after the copy submission returned.
        let mut graphics = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);
        pack_image(
            &mut graphics,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_CS),
        );
        let batch = resolve(&mut graphics, &registry);

        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].src_queue_family_index, COPY);
        assert_eq!(batch.image_barriers[0].dst_queue_family_index, GRAPHICS);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::TransferSrcOptimal);

        let transfers = graphics.take_queue_transfers();
        assert_eq!(transfers.keys().copied().collect::<Vec<_>>(), vec![COPY]);
        assert_eq!(transfers[&COPY].image_barriers.len(), 1);

        graphics.apply(&mut registry.lock());
        assert_eq!(
            registry.texture_state(image, SubresourceIndex::default()),
            Some(GlobalState::new(TextureStateFlags::SHADER_READ_CS, Some(GRAPHICS)))
        );
    }

    #[test]
    fn test_last_declaration_in_batch_wins() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        {
            let inner = registry.lock();
            tracker.pack_image(
                &inner,
                &TextureBarrier::new(
                    image,
                    TextureStateFlags::COPY_DEST,
                    TextureStateFlags::SHADER_READ_PS,
                ),
            );
            tracker.pack_image(
                &inner,
                &TextureBarrier::new(
                    image,
                    TextureStateFlags::COPY_DEST,
                    TextureStateFlags::COPY_SOURCE,
                ),
            );
        }

        let batch = tracker.barriers();
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(batch.image_barriers[0].new_layout, ImageLayout::TransferSrcOptimal);
    }

    #[test]
    fn test_last_deferred_declaration_in_batch_wins() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::COPY_DEST, None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        {
            let inner = registry.lock();
            tracker.pack_buffer(
                &inner,
                &BufferBarrier::automatic(id, BufferStateFlags::VERTEX_BUFFER),
            );
            tracker.pack_buffer(
                &inner,
                &BufferBarrier::automatic(id, BufferStateFlags::INDEX_BUFFER),
            );
        }
        assert!(tracker.barriers().is_empty());

        let batch = resolve(&mut tracker, &registry);
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.buffer_barriers[0].dst_access_mask, AccessFlags::INDEX_READ);
    }

    #[test]
    fn test_whole_texture_is_tracked_per_subresource() {
        let registry = ResourceRegistry::new();
        let image = registry.register_texture(TextureDesc::new(
            vk::Image::from_raw(0x30),
            vk::Format::D32_SFLOAT,
            2,
            2,
        ));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::new(
                image,
                TextureStateFlags::empty(),
                TextureStateFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ),
        );
        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_PS)
                .subresource(SubresourceIndex::new(1, 1)),
        );

        let batch = tracker.barriers();
        assert_eq!(batch.image_barriers.len(), 1);
        let range = batch.image_barriers[0].subresource_range;
        assert_eq!(range.base_mip_level, 1);
        assert_eq!(range.base_array_layer, 1);
        assert_eq!(range.level_count, 1);
        assert_eq!(range.aspect_mask, crate::command::ImageAspectFlags::DEPTH);

        let inner = registry.lock();
        assert_eq!(
            tracker.get_image_layout(&inner, image, SubresourceIndex::new(1, 1)),
            Some(ImageLayout::ShaderReadOnlyOptimal)
        );
        assert_eq!(
            tracker.get_image_layout(&inner, image, SubresourceIndex::new(0, 1)),
            Some(ImageLayout::DepthStencilAttachmentOptimal)
        );
        assert_eq!(tracker.get_image_layout(&inner, image, SubresourceIndex::new(2, 0)), None);
    }

    #[test]
    fn test_get_image_layout_falls_back_to_global_state() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::PRESENT, Some(GRAPHICS));
        let tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        assert_eq!(
            tracker.get_image_layout(&registry.lock(), image, SubresourceIndex::default()),
            Some(ImageLayout::PresentSrcKhr)
        );
    }

    #[test]
    fn test_finish_barriers() {
        let registry = ResourceRegistry::new();
        let written = texture(&registry, TextureStateFlags::empty(), None);
        let presented = texture(&registry, TextureStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        {
            let inner = registry.lock();
            tracker.pack_image(
                &inner,
                &TextureBarrier::automatic(written, TextureStateFlags::COPY_DEST),
            );
            tracker.pack_image(
                &inner,
                &TextureBarrier::automatic(presented, TextureStateFlags::PRESENT),
            );
        }

        tracker.generate_finish_barriers();
        let batch = tracker.barriers();
        assert_eq!(batch.image_barriers.len(), 1);

        let barrier = batch.image_barriers[0];
        assert_eq!(barrier.src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(barrier.dst_access_mask, AccessFlags::empty());
        assert_eq!(barrier.old_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(barrier.new_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TRANSFER);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::BOTTOM_OF_PIPE);

        // Finishing does not consume the deferred accesses.
        assert!(tracker.has_unresolved());
    }

    #[test]
    fn test_reset_is_pure() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::COPY_DEST, Some(COPY));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_PS),
        );
        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_SOURCE),
        );
        tracker.reset();

        assert!(!tracker.has_unresolved());
        assert!(tracker.barriers().is_empty());
        assert!(resolve(&mut tracker, &registry).is_empty());
        assert!(tracker.take_queue_transfers().is_empty());
        assert_eq!(
            registry.texture_state(image, SubresourceIndex::default()),
            Some(GlobalState::new(TextureStateFlags::COPY_DEST, Some(COPY)))
        );

        // A fresh recording resolves against the untouched global state.
        pack_image(
            &mut tracker,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_SOURCE),
        );
        let batch = resolve(&mut tracker, &registry);
        assert_eq!(batch.image_barriers[0].old_layout, ImageLayout::TransferDstOptimal);
        assert_eq!(tracker.take_queue_transfers().len(), 1);
    }

    #[test]
    fn test_apply_bumps_generation() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::empty(), None);
        let image = registry.register_texture(TextureDesc::new(
            vk::Image::from_raw(0x40),
            vk::Format::R8G8B8A8_UNORM,
            3,
            1,
        ));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        {
            let inner = registry.lock();
            tracker.pack_buffer(&inner, &BufferBarrier::automatic(id, BufferStateFlags::COPY_DEST));
            tracker.pack_image(
                &inner,
                &TextureBarrier::automatic(image, TextureStateFlags::COPY_DEST),
            );
        }
        tracker.resolve(&registry.lock());
        tracker.apply(&mut registry.lock());

        let inner = registry.lock();
        assert_eq!(inner.buffer_generation(id), Some(1));
        assert_eq!(inner.texture_generation(image), Some(1));
        assert_eq!(
            inner.buffer_state(id),
            Some(GlobalState::new(BufferStateFlags::COPY_DEST, Some(GRAPHICS)))
        );
    }

    #[test]
    fn test_destroyed_resources_are_skipped() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::COPY_DEST),
        );
        registry.unregister_buffer(id);

        assert!(resolve(&mut tracker, &registry).is_empty());
        tracker.apply(&mut registry.lock());
        assert_eq!(registry.buffer_state(id), None);
    }

    #[test]
    fn test_aliasing_with_declared_before_state_keeps_its_stages() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::empty(), None);
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::new(id, BufferStateFlags::SHADER_WRITE_CS, BufferStateFlags::COPY_DEST)
                .with_flags(ResourceBarrierFlags::ALIASING),
        );

        let batch = tracker.barriers();
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::COMPUTE_SHADER);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::TRANSFER);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::empty());
    }

    #[test]
    fn test_buffer_queue_transfer_pairing() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::COPY_DEST, Some(COPY));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::VERTEX_BUFFER),
        );
        let batch = resolve(&mut tracker, &registry);

        assert_eq!(batch.buffer_barriers.len(), 1);
        let acquire = batch.buffer_barriers[0];
        assert_eq!(acquire.src_queue_family_index, COPY);
        assert_eq!(acquire.dst_queue_family_index, GRAPHICS);
        assert_eq!(acquire.src_access_mask, AccessFlags::empty());
        assert_eq!(acquire.dst_access_mask, AccessFlags::VERTEX_ATTRIBUTE_READ);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::VERTEX_INPUT);

        let transfers = tracker.take_queue_transfers();
        assert_eq!(transfers.keys().copied().collect::<Vec<_>>(), vec![COPY]);
        assert!(transfers[&COPY].image_barriers.is_empty());
        let release = transfers[&COPY].buffer_barriers[0];
        assert_eq!(release.buffer, acquire.buffer);
        assert_eq!(release.src_queue_family_index, COPY);
        assert_eq!(release.dst_queue_family_index, GRAPHICS);
        assert_eq!(release.src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(release.dst_access_mask, AccessFlags::empty());

        tracker.apply(&mut registry.lock());
        assert_eq!(
            registry.buffer_state(id),
            Some(GlobalState::new(BufferStateFlags::VERTEX_BUFFER, Some(GRAPHICS)))
        );
    }

    #[test]
    fn test_transfers_are_grouped_by_source_family() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::COPY_DEST, Some(COPY));
        let id = buffer(&registry, BufferStateFlags::SHADER_WRITE_CS, Some(COMPUTE));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        {
            let inner = registry.lock();
            tracker.pack_image(
                &inner,
                &TextureBarrier::automatic(image, TextureStateFlags::SHADER_READ_PS),
            );
            tracker.pack_buffer(
                &inner,
                &BufferBarrier::automatic(id, BufferStateFlags::INDIRECT_ARGUMENT),
            );
        }
        let batch = resolve(&mut tracker, &registry);
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers[0].src_queue_family_index, COMPUTE);
        assert_eq!(batch.image_barriers[0].src_queue_family_index, COPY);

        let transfers = tracker.take_queue_transfers();
        assert_eq!(transfers.keys().copied().collect::<Vec<_>>(), vec![COMPUTE, COPY]);
        assert_eq!(transfers[&COMPUTE].buffer_barriers.len(), 1);
        assert!(transfers[&COMPUTE].image_barriers.is_empty());
        assert_eq!(transfers[&COPY].image_barriers.len(), 1);
        assert!(transfers[&COPY].buffer_barriers.is_empty());
        assert_eq!(
            transfers[&COMPUTE].buffer_barriers[0].src_access_mask,
            AccessFlags::SHADER_WRITE
        );
    }

    #[test]
    fn test_chaining_across_batches_after_deferred_first_touch() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::COPY_DEST, Some(GRAPHICS));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::VERTEX_BUFFER),
        );
        assert!(tracker.barriers().is_empty());

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::SHADER_READ_CS),
        );
        let batch = tracker.barriers();
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::VERTEX_ATTRIBUTE_READ);
        assert_eq!(batch.buffer_barriers[0].dst_access_mask, AccessFlags::SHADER_READ);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::VERTEX_INPUT);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::COMPUTE_SHADER);

        // Resolve bridges the global state to the first touch, not the last.
        let batch = resolve(&mut tracker, &registry);
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers[0].src_access_mask, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.buffer_barriers[0].dst_access_mask, AccessFlags::VERTEX_ATTRIBUTE_READ);
        assert_eq!(batch.src_stage_mask, PipelineStageFlags::TRANSFER);
        assert_eq!(batch.dst_stage_mask, PipelineStageFlags::VERTEX_INPUT);

        tracker.apply(&mut registry.lock());
        assert_eq!(
            registry.buffer_state(id),
            Some(GlobalState::new(BufferStateFlags::SHADER_READ_CS, Some(GRAPHICS)))
        );
    }

    #[test]
    fn test_resolve_consumes_deferred_accesses() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::COPY_DEST, Some(COPY));
        let mut tracker = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        tracker.begin_new_barriers_batch();
        tracker.pack_buffer(
            &registry.lock(),
            &BufferBarrier::automatic(id, BufferStateFlags::VERTEX_BUFFER),
        );
        assert_eq!(resolve(&mut tracker, &registry).buffer_barriers.len(), 1);
        assert_eq!(tracker.take_queue_transfers().len(), 1);

        // A second resolve has nothing left, which is why a failed submit
        // must not be retried without a reset.
        tracker.generate_finish_barriers();
        assert!(resolve(&mut tracker, &registry).is_empty());
        assert!(tracker.take_queue_transfers().is_empty());
    }

    #[test]
    fn test_unordered_submissions_are_detected() {
        let registry = ResourceRegistry::new();
        let id = buffer(&registry, BufferStateFlags::empty(), None);
        let mut first = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);
        let mut second = ResourceStateTracker::new(COPY, QueueType::Copy);

        for tracker in [&mut first, &mut second] {
            tracker.begin_new_barriers_batch();
            tracker.pack_buffer(
                &registry.lock(),
                &BufferBarrier::automatic(id, BufferStateFlags::COPY_DEST),
            );
        }

        // `first` resolves, then `second` is submitted entirely before `first` applies.
        first.resolve(&registry.lock());
        second.resolve(&registry.lock());
        assert_eq!(second.apply(&mut registry.lock()), 0);

        let expected = if cfg!(debug_assertions) { 1 } else { 0 };
        assert_eq!(first.apply(&mut registry.lock()), expected);
        assert_eq!(registry.lock().buffer_generation(id), Some(2));
    }

    #[test]
    fn test_ordered_submissions_are_not_races() {
        let registry = ResourceRegistry::new();
        let image = texture(&registry, TextureStateFlags::empty(), None);
        let mut first = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);
        let mut second = ResourceStateTracker::new(GRAPHICS, QueueType::Graphics);

        pack_image(
            &mut first,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_DEST),
        );
        first.resolve(&registry.lock());
        assert_eq!(first.apply(&mut registry.lock()), 0);

        pack_image(
            &mut second,
            &registry,
            TextureBarrier::automatic(image, TextureStateFlags::COPY_SOURCE),
        );
        second.resolve(&registry.lock());
        assert_eq!(second.apply(&mut registry.lock()), 0);
        assert_eq!(registry.lock().texture_generation(image), Some(2));
    }

    #[test]
    fn test_check_generation() {
        assert!(!check_generation("buffer", Some(&3), Some(3)));
        assert!(check_generation("buffer", Some(&3), Some(4)));
        assert!(!check_generation("buffer", None, Some(4)));
        assert!(!check_generation("buffer", Some(&3), None));
    }
}
