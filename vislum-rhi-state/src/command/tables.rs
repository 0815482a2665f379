//! Static tables translating resource states into access masks, pipeline
//! stages and image layouts.
//!
//! Each row describes one state flag. A combined state is translated by
//! OR-ing the rows of every flag it contains. Stage masks depend on the queue
//! executing the barrier: queues without graphics (or compute) capabilities
//! cannot name those stages and fall back to `ALL_COMMANDS`.

use crate::{
    command::{AccessFlags, ImageLayout, PipelineStageFlags},
    queue::QueueType,
    resource::{BufferStateFlags, TextureStateFlags},
};

struct Row<S> {
    state: S,
    access: AccessFlags,
    /// Indexed by [`QueueType::index`].
    stages: [PipelineStageFlags; 3],
}

const ALL: PipelineStageFlags = PipelineStageFlags::ALL_COMMANDS;

/// The stage on each queue type for a graphics-only flag.
const fn graphics(stage: PipelineStageFlags) -> [PipelineStageFlags; 3] {
    [stage, ALL, ALL]
}

const COMPUTE: [PipelineStageFlags; 3] = [
    PipelineStageFlags::COMPUTE_SHADER,
    PipelineStageFlags::COMPUTE_SHADER,
    ALL,
];

const TRANSFER: [PipelineStageFlags; 3] = [PipelineStageFlags::TRANSFER; 3];

const DEPTH_TESTS: PipelineStageFlags =
    PipelineStageFlags::EARLY_FRAGMENT_TESTS.union(PipelineStageFlags::LATE_FRAGMENT_TESTS);

const BUFFER_ROWS: [Row<BufferStateFlags>; 13] = [
    Row {
        state: BufferStateFlags::INDIRECT_ARGUMENT,
        access: AccessFlags::INDIRECT_COMMAND_READ,
        stages: [PipelineStageFlags::DRAW_INDIRECT; 3],
    },
    Row {
        state: BufferStateFlags::VERTEX_BUFFER,
        access: AccessFlags::VERTEX_ATTRIBUTE_READ,
        stages: graphics(PipelineStageFlags::VERTEX_INPUT),
    },
    Row {
        state: BufferStateFlags::INDEX_BUFFER,
        access: AccessFlags::INDEX_READ,
        stages: graphics(PipelineStageFlags::VERTEX_INPUT),
    },
    Row {
        state: BufferStateFlags::UNIFORM_BUFFER_VS,
        access: AccessFlags::UNIFORM_READ,
        stages: graphics(PipelineStageFlags::VERTEX_SHADER),
    },
    Row {
        state: BufferStateFlags::SHADER_READ_VS,
        access: AccessFlags::SHADER_READ,
        stages: graphics(PipelineStageFlags::VERTEX_SHADER),
    },
    Row {
        state: BufferStateFlags::UNIFORM_BUFFER_PS,
        access: AccessFlags::UNIFORM_READ,
        stages: graphics(PipelineStageFlags::FRAGMENT_SHADER),
    },
    Row {
        state: BufferStateFlags::SHADER_READ_PS,
        access: AccessFlags::SHADER_READ,
        stages: graphics(PipelineStageFlags::FRAGMENT_SHADER),
    },
    Row {
        state: BufferStateFlags::SHADER_WRITE_PS,
        access: AccessFlags::SHADER_WRITE,
        stages: graphics(PipelineStageFlags::FRAGMENT_SHADER),
    },
    Row {
        state: BufferStateFlags::UNIFORM_BUFFER_CS,
        access: AccessFlags::UNIFORM_READ,
        stages: COMPUTE,
    },
    Row {
        state: BufferStateFlags::SHADER_READ_CS,
        access: AccessFlags::SHADER_READ,
        stages: COMPUTE,
    },
    Row {
        state: BufferStateFlags::SHADER_WRITE_CS,
        access: AccessFlags::SHADER_WRITE,
        stages: COMPUTE,
    },
    Row {
        state: BufferStateFlags::COPY_DEST,
        access: AccessFlags::TRANSFER_WRITE,
        stages: TRANSFER,
    },
    Row {
        state: BufferStateFlags::COPY_SOURCE,
        access: AccessFlags::TRANSFER_READ,
        stages: TRANSFER,
    },
];

const TEXTURE_ROWS: [Row<TextureStateFlags>; 13] = [
    Row {
        state: TextureStateFlags::SHADER_READ_VS,
        access: AccessFlags::SHADER_READ,
        stages: graphics(PipelineStageFlags::VERTEX_SHADER),
    },
    Row {
        state: TextureStateFlags::SHADER_READ_PS,
        access: AccessFlags::SHADER_READ,
        stages: graphics(PipelineStageFlags::FRAGMENT_SHADER),
    },
    Row {
        state: TextureStateFlags::SHADER_WRITE_PS,
        access: AccessFlags::SHADER_WRITE,
        stages: graphics(PipelineStageFlags::FRAGMENT_SHADER),
    },
    Row {
        state: TextureStateFlags::COLOR_ATTACHMENT_READ,
        access: AccessFlags::COLOR_ATTACHMENT_READ,
        stages: graphics(PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
    },
    Row {
        state: TextureStateFlags::COLOR_ATTACHMENT_WRITE,
        access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        stages: graphics(PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
    },
    Row {
        state: TextureStateFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        stages: graphics(DEPTH_TESTS),
    },
    Row {
        state: TextureStateFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        stages: graphics(DEPTH_TESTS),
    },
    Row {
        state: TextureStateFlags::RESOLVE_ATTACHMENT,
        access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        stages: graphics(PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
    },
    Row {
        state: TextureStateFlags::SHADER_READ_CS,
        access: AccessFlags::SHADER_READ,
        stages: COMPUTE,
    },
    Row {
        state: TextureStateFlags::SHADER_WRITE_CS,
        access: AccessFlags::SHADER_WRITE,
        stages: COMPUTE,
    },
    Row {
        state: TextureStateFlags::COPY_DEST,
        access: AccessFlags::TRANSFER_WRITE,
        stages: TRANSFER,
    },
    Row {
        state: TextureStateFlags::COPY_SOURCE,
        access: AccessFlags::TRANSFER_READ,
        stages: TRANSFER,
    },
    // Presentation is ordered by the presentation engine's semaphores.
    Row {
        state: TextureStateFlags::PRESENT,
        access: AccessFlags::empty(),
        stages: [PipelineStageFlags::empty(); 3],
    },
];

/// Layout choices in priority order. The first row whose flags intersect
/// the state wins.
const LAYOUT_PRIORITY: [(TextureStateFlags, ImageLayout); 5] = [
    (
        TextureStateFlags::COLOR_ATTACHMENT_READ
            .union(TextureStateFlags::COLOR_ATTACHMENT_WRITE)
            .union(TextureStateFlags::RESOLVE_ATTACHMENT),
        ImageLayout::ColorAttachmentOptimal,
    ),
    (
        TextureStateFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ImageLayout::DepthStencilAttachmentOptimal,
    ),
    (
        TextureStateFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        ImageLayout::DepthStencilReadOnlyOptimal,
    ),
    (TextureStateFlags::COPY_DEST, ImageLayout::TransferDstOptimal),
    (TextureStateFlags::COPY_SOURCE, ImageLayout::TransferSrcOptimal),
];

const SHADER_READS: TextureStateFlags = TextureStateFlags::SHADER_READ_VS
    .union(TextureStateFlags::SHADER_READ_PS)
    .union(TextureStateFlags::SHADER_READ_CS);

const SHADER_WRITES: TextureStateFlags =
    TextureStateFlags::SHADER_WRITE_PS.union(TextureStateFlags::SHADER_WRITE_CS);

/// A resource state that can be translated by the tables.
pub trait TrackedState: Copy + Eq + std::fmt::Debug {
    /// The state with the automatic sentinel removed.
    fn concrete(self) -> Self;

    fn is_automatic(self) -> bool;

    fn access(self) -> AccessFlags;

    fn stages(self, queue_type: QueueType) -> PipelineStageFlags;
}

impl TrackedState for BufferStateFlags {
    #[inline]
    fn concrete(self) -> Self {
        self.difference(Self::AUTOMATIC)
    }

    #[inline]
    fn is_automatic(self) -> bool {
        self.contains(Self::AUTOMATIC)
    }

    fn access(self) -> AccessFlags {
        lookup(&BUFFER_ROWS, self, |row| row.access)
    }

    fn stages(self, queue_type: QueueType) -> PipelineStageFlags {
        lookup(&BUFFER_ROWS, self, |row| row.stages[queue_type.index()])
    }
}

impl TrackedState for TextureStateFlags {
    #[inline]
    fn concrete(self) -> Self {
        self.difference(Self::AUTOMATIC)
    }

    #[inline]
    fn is_automatic(self) -> bool {
        self.contains(Self::AUTOMATIC)
    }

    fn access(self) -> AccessFlags {
        lookup(&TEXTURE_ROWS, self, |row| row.access)
    }

    fn stages(self, queue_type: QueueType) -> PipelineStageFlags {
        lookup(&TEXTURE_ROWS, self, |row| row.stages[queue_type.index()])
    }
}

fn lookup<S, T>(rows: &[Row<S>], state: S, field: impl Fn(&Row<S>) -> T) -> T
where
    S: bitflags::Flags + Copy,
    T: Default + std::ops::BitOr<Output = T>,
{
    rows.iter()
        .filter(|row| state.contains(row.state))
        .fold(T::default(), |acc, row| acc | field(row))
}

/// Returns the image layout a texture must be in for the given state.
pub fn texture_layout(state: TextureStateFlags) -> ImageLayout {
    let state = state.concrete();
    if state.is_empty() {
        return ImageLayout::Undefined;
    }

    if let Some((_, layout)) = LAYOUT_PRIORITY
        .iter()
        .find(|(flags, _)| state.intersects(*flags))
    {
        return *layout;
    }

    if state.intersects(SHADER_READS) && !state.intersects(SHADER_WRITES) {
        return ImageLayout::ShaderReadOnlyOptimal;
    }

    if state.contains(TextureStateFlags::PRESENT) {
        return ImageLayout::PresentSrcKhr;
    }

    ImageLayout::General
}
