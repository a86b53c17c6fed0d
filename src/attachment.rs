use ash::vk;

use crate::{image::aspect_mask, AttachmentName};

/// The state an attachment is in at a given point of the pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentLayout {
    /// Never touched before: contents are undefined.
    #[default]
    Unknown,
    ShaderRead,
    ColorAttachment,
    DepthAttachment,
}

impl AttachmentLayout {
    pub fn image_layout(self) -> vk::ImageLayout {
        match self {
            AttachmentLayout::Unknown => vk::ImageLayout::UNDEFINED,
            AttachmentLayout::ShaderRead => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            AttachmentLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            AttachmentLayout::DepthAttachment => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        }
    }

    /// Like [`AttachmentLayout::image_layout`], but formats with a stencil aspect get the
    /// combined depth/stencil layout.
    pub fn image_layout_for(self, format: vk::Format) -> vk::ImageLayout {
        match self {
            AttachmentLayout::DepthAttachment
                if aspect_mask(format).contains(vk::ImageAspectFlags::STENCIL) =>
            {
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            }
            _ => self.image_layout(),
        }
    }
}

/// What happens to the contents of an attachment when a pass starts writing to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentInitialState {
    Clear,
    #[default]
    Discard,
    Load,
}

impl AttachmentInitialState {
    pub fn load_op(self) -> vk::AttachmentLoadOp {
        match self {
            AttachmentInitialState::Clear => vk::AttachmentLoadOp::CLEAR,
            AttachmentInitialState::Discard => vk::AttachmentLoadOp::DONT_CARE,
            AttachmentInitialState::Load => vk::AttachmentLoadOp::LOAD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl From<ClearColor> for vk::ClearValue {
    fn from(clear: ClearColor) -> Self {
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [clear.r, clear.g, clear.b, clear.a],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearDepthStencil {
    pub depth: f32,
    pub stencil: u32,
}

impl From<ClearDepthStencil> for vk::ClearValue {
    fn from(clear: ClearDepthStencil) -> Self {
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: clear.depth,
                stencil: clear.stencil,
            },
        }
    }
}

/// An attachment a pass samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOnlyColorAttachment {
    pub name: AttachmentName,
    /// Filled in by the layout resolver.
    pub initial_layout: AttachmentLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WriteOnlyColorAttachment {
    pub name: AttachmentName,
    pub clear_value: ClearColor,
    /// Filled in by the layout resolver.
    pub initial_layout: AttachmentLayout,
    pub initial_state: AttachmentInitialState,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WriteOnlyDepthAttachment {
    pub name: AttachmentName,
    pub clear_value: ClearDepthStencil,
    /// Filled in by the layout resolver.
    pub initial_layout: AttachmentLayout,
    pub initial_state: AttachmentInitialState,
}

impl WriteOnlyDepthAttachment {
    /// A depth attachment with the empty name means the pass has no depth attachment.
    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}
