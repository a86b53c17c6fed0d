use std::sync::Arc;

use ash::vk;

use crate::{
    attachment::AttachmentLayout,
    command_buffer::CommandRecorder,
    compiler::RenderPassNative,
    context::GraphicsContext,
    error::Result,
    image::ImageTable,
    pass_builder::RenderCallback,
    AttachmentName, GraphError, Image,
};

/// Runs once, before the first frame is recorded. Typically used to upload resources that
/// never change.
pub type CreateCallback = Box<dyn FnOnce(&mut dyn CommandRecorder)>;

/// What a render callback gets to see of its own pass.
pub struct PassContext<'a> {
    pub name: AttachmentName,
    pub native: &'a RenderPassNative,
    images: &'a ImageTable,
}

impl PassContext<'_> {
    /// Looks up any image of the graph, e.g. an input this pass samples from.
    pub fn image(&self, name: AttachmentName) -> Result<&Image> {
        self.images.get(name)
    }
}

/// A read-only input that has to be moved into `SHADER_READ_ONLY_OPTIMAL` before its pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTransition {
    pub name: AttachmentName,
    pub image: Image,
    pub from: vk::ImageLayout,
}

pub struct RenderGraphNode {
    pub name: AttachmentName,
    pub pass: RenderPassNative,
    pub(crate) on_render: Option<RenderCallback>,
    pub color_attachments: Vec<AttachmentName>,
    pub input_transitions: Vec<InputTransition>,
}

impl std::fmt::Debug for RenderGraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraphNode")
            .field("name", &self.name)
            .field("pass", &self.pass)
            .field("color_attachments", &self.color_attachments)
            .field("input_transitions", &self.input_transitions)
            .finish()
    }
}

/// Copies the graph's output into the presentation image. The source layout is the one the
/// output is left in by the last pass that touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCopy {
    pub source_layout: vk::ImageLayout,
}

impl OutputCopy {
    pub fn present(&self, recorder: &mut dyn CommandRecorder, output: &Image, present: &Image) {
        recorder.copy_image(
            output,
            self.source_layout,
            present,
            vk::ImageLayout::UNDEFINED,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Uninitialized,
    Ready,
}

/// A compiled, ready to execute sequence of passes.
///
/// Dropping the graph destroys every pass's device objects and every image it owns.
pub struct RenderGraph<C: GraphicsContext> {
    context: Arc<C>,
    nodes: Vec<RenderGraphNode>,
    images: ImageTable,
    output_name: AttachmentName,
    output_layout: AttachmentLayout,
    on_present: OutputCopy,
    on_create: Option<CreateCallback>,
    state: GraphState,
}

impl<C: GraphicsContext> RenderGraph<C> {
    pub(crate) fn new(
        context: Arc<C>,
        nodes: Vec<RenderGraphNode>,
        images: ImageTable,
        output_name: AttachmentName,
        output_layout: AttachmentLayout,
        on_present: OutputCopy,
        on_create: Option<CreateCallback>,
    ) -> Self {
        Self {
            context,
            nodes,
            images,
            output_name,
            output_layout,
            on_present,
            on_create,
            state: GraphState::Uninitialized,
        }
    }

    /// Records every pass, in the order they were added.
    ///
    /// The create callback runs before the first pass of the first call.
    pub fn execute(&mut self, recorder: &mut dyn CommandRecorder) {
        if self.state == GraphState::Uninitialized {
            if let Some(on_create) = self.on_create.take() {
                log::debug!("Running the render graph's create callback");
                on_create(&mut *recorder);
            }
            self.state = GraphState::Ready;
        }

        for node in &mut self.nodes {
            execute_node(node, &self.images, &mut *recorder);
        }
    }

    /// Copies the output image into `present_image`.
    pub fn present(
        &self,
        recorder: &mut dyn CommandRecorder,
        present_image: &Image,
    ) -> Result<()> {
        let output = self.images.get(self.output_name)?;
        self.on_present.present(recorder, output, present_image);
        Ok(())
    }

    pub fn node(&self, name: AttachmentName) -> Result<&RenderGraphNode> {
        self.nodes
            .iter()
            .find(|node| node.name == name)
            .ok_or(GraphError::PassNotFound(name))
    }

    pub fn image(&self, name: AttachmentName) -> Result<&Image> {
        self.images.get(name)
    }

    pub fn nodes(&self) -> &[RenderGraphNode] {
        &self.nodes
    }

    pub fn images(&self) -> &ImageTable {
        &self.images
    }

    pub fn output_name(&self) -> AttachmentName {
        self.output_name
    }

    /// The layout the output image is in once every pass has executed.
    pub fn output_layout(&self) -> AttachmentLayout {
        self.output_layout
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }
}

fn execute_node(
    node: &mut RenderGraphNode,
    images: &ImageTable,
    recorder: &mut dyn CommandRecorder,
) {
    for input in &node.input_transitions {
        recorder.transition_image(
            &input.image,
            input.from,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
    }

    recorder.begin_render_pass(&node.pass);
    if node.pass.has_pipeline() {
        recorder.bind_pipeline(node.pass.pipeline);
    }
    recorder.set_render_area(node.pass.render_area);

    if let Some(on_render) = node.on_render.as_mut() {
        let context = PassContext {
            name: node.name,
            native: &node.pass,
            images,
        };
        on_render(&mut *recorder, &context);
    }

    recorder.end_render_pass();
}

impl<C: GraphicsContext> Drop for RenderGraph<C> {
    fn drop(&mut self) {
        let context = &*self.context;

        for node in &mut self.nodes {
            log::trace!("Destroying pass {}", node.name);
            unsafe { node.pass.destroy(context) };
        }

        for image in self.images.drain_owned() {
            unsafe { context.destroy_image(&image) };
        }
    }
}

impl<C: GraphicsContext> std::fmt::Debug for RenderGraph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("nodes", &self.nodes)
            .field("images", &self.images.len())
            .field("output_name", &self.output_name)
            .field("output_layout", &self.output_layout)
            .field("state", &self.state)
            .finish()
    }
}
