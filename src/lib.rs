//! A small render graph on top of [`ash`].
//!
//! Declare passes with named attachments, hand the graph the images those names refer to, and
//! [`RenderGraphBuilder::build`] works out every image layout transition between the passes and
//! creates the render passes, framebuffers and pipelines for them. The resulting
//! [`RenderGraph`] records all passes, in order, every time [`RenderGraph::execute`] is called.
//!
//! Device creation, swapchains and resource uploads are left to the application: the graph
//! talks to the device through [`GraphicsContext`] and to command buffers through
//! [`CommandRecorder`].

pub use ash;
pub use attachment::{
    AttachmentInitialState, AttachmentLayout, ClearColor, ClearDepthStencil,
    ReadOnlyColorAttachment, WriteOnlyColorAttachment, WriteOnlyDepthAttachment,
};
pub use command_buffer::{CommandBuffer, CommandRecorder};
pub use compiler::{compile_pass, RenderPassNative};
pub use context::{Context, GraphicsContext};
pub use error::{GraphError, Result};
pub use graph::{
    CreateCallback, GraphState, InputTransition, OutputCopy, PassContext, RenderGraph,
    RenderGraphNode,
};
pub use graph_builder::{BuildOptions, RenderGraphBuilder};
pub use image::{Image, ImageEntry, ImageTable};
pub use name::AttachmentName;
pub use pass_builder::{RenderCallback, RenderPassBuilder};
pub use pipeline::{GraphicPipeline, GraphicShader, VertexAttribute, VertexBinding};
pub use resolver::resolve_layouts;

use ash::vk;

mod attachment;
mod command_buffer;
mod compiler;
mod context;
mod error;
mod graph;
mod graph_builder;
mod image;
mod name;
mod pass_builder;
mod pipeline;
mod resolver;

const FULL_IMAGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: vk::REMAINING_MIP_LEVELS,
    base_array_layer: 0,
    layer_count: vk::REMAINING_ARRAY_LAYERS,
};
