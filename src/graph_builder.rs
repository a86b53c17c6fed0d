use std::sync::Arc;

use crate::{
    attachment::AttachmentLayout,
    command_buffer::CommandRecorder,
    compiler::compile_pass,
    context::GraphicsContext,
    error::Result,
    graph::{CreateCallback, InputTransition, OutputCopy, RenderGraph, RenderGraphNode},
    image::{ImageEntry, ImageTable},
    resolver::resolve_layouts,
    AttachmentName, GraphError, Image, RenderPassBuilder,
};

/// Knobs for how strictly [`RenderGraphBuilder::build`] checks the declared passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fail the build when the attachments of a pass differ in size. When off, the pass
    /// renders at the size of its first attachment and a warning is logged.
    pub validate_extents: bool,
    /// Fail the build when a pass reads an attachment no earlier pass has written. When off,
    /// the read starts from undefined contents and a warning is logged.
    pub reject_unwritten_reads: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            validate_extents: true,
            reject_unwritten_reads: false,
        }
    }
}

/// Collects passes and images, and compiles them into a [`RenderGraph`].
#[derive(Default)]
pub struct RenderGraphBuilder {
    passes: Vec<RenderPassBuilder>,
    images: ImageTable,
    output_name: AttachmentName,
    on_create: Option<CreateCallback>,
    options: BuildOptions,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Passes execute in the order they are added.
    pub fn add_render_pass(mut self, pass: RenderPassBuilder) -> Self {
        self.passes.push(pass);
        self
    }

    /// Makes an image owned by someone else available under `name`. The owner must keep the
    /// image alive for as long as the graph exists.
    pub fn add_image_reference(
        mut self,
        name: impl Into<AttachmentName>,
        image: Arc<Image>,
    ) -> Self {
        self.insert_image(name.into(), ImageEntry::Reference(image));
        self
    }

    /// Hands `image` over to the graph, which destroys it when dropped.
    pub fn add_image(mut self, name: impl Into<AttachmentName>, image: Image) -> Self {
        self.insert_image(name.into(), ImageEntry::Owned(image));
        self
    }

    /// The image that [`RenderGraph::present`] copies from.
    pub fn set_output_name(mut self, name: impl Into<AttachmentName>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn set_on_create<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut dyn CommandRecorder) + 'static,
    {
        self.on_create = Some(Box::new(callback));
        self
    }

    /// Resolves layouts and creates the device objects for every pass.
    ///
    /// Every name a pass refers to, and the output name, are checked before any device object
    /// is created. On failure nothing is leaked: passes created so far and images handed over
    /// with [`RenderGraphBuilder::add_image`] are destroyed again.
    pub fn build<C: GraphicsContext>(mut self, context: Arc<C>) -> Result<RenderGraph<C>> {
        let (nodes, output_layout, on_present) = match self.compile(&*context) {
            Ok(compiled) => compiled,
            Err(error) => {
                for image in self.images.drain_owned() {
                    unsafe { context.destroy_image(&image) };
                }
                return Err(error);
            }
        };

        log::info!(
            "Built render graph with {} pass(es), presenting {} from {output_layout:?}",
            nodes.len(),
            self.output_name
        );

        Ok(RenderGraph::new(
            context,
            nodes,
            self.images,
            self.output_name,
            output_layout,
            on_present,
            self.on_create,
        ))
    }

    fn compile<C: GraphicsContext + ?Sized>(
        &mut self,
        context: &C,
    ) -> Result<(Vec<RenderGraphNode>, AttachmentLayout, OutputCopy)> {
        self.validate()?;

        let output_layout = resolve_layouts(&mut self.passes, self.output_name);
        if output_layout == AttachmentLayout::Unknown {
            log::warn!(
                "Output {} is never written, presenting it copies undefined contents",
                self.output_name
            );
        }
        let on_present = OutputCopy {
            source_layout: output_layout
                .image_layout_for(self.images.get(self.output_name)?.format),
        };

        let mut nodes: Vec<RenderGraphNode> = Vec::with_capacity(self.passes.len());
        for mut pass in self.passes.drain(..) {
            let compiled = input_transitions(&pass, &self.images).and_then(|transitions| {
                let native = compile_pass(context, &pass, &self.images, &self.options)?;
                Ok((native, transitions))
            });

            let (native, input_transitions) = match compiled {
                Ok(compiled) => compiled,
                Err(error) => {
                    log::error!("Failed to compile pass {}: {error}", pass.name);
                    for node in &mut nodes {
                        unsafe { node.pass.destroy(context) };
                    }
                    return Err(error);
                }
            };

            let color_attachments = pass
                .output_color_attachments
                .iter()
                .map(|attachment| attachment.name)
                .collect();

            nodes.push(RenderGraphNode {
                name: pass.name,
                pass: native,
                on_render: pass.on_render.take(),
                color_attachments,
                input_transitions,
            });
        }

        Ok((nodes, output_layout, on_present))
    }

    fn insert_image(&mut self, name: AttachmentName, entry: ImageEntry) {
        if self.images.insert(name, entry).is_some() {
            log::warn!("Image {name} was added twice, keeping the last one");
        }
    }

    fn validate(&self) -> Result<()> {
        self.images.get(self.output_name)?;

        let mut written = std::collections::HashSet::new();
        for pass in &self.passes {
            for name in pass.referenced_names() {
                self.images.get(name)?;
            }

            for input in &pass.input_color_attachments {
                if written.contains(&input.name) {
                    continue;
                }
                if self.options.reject_unwritten_reads {
                    return Err(GraphError::UnwrittenRead {
                        pass: pass.name,
                        attachment: input.name,
                    });
                }
                log::warn!(
                    "Pass {} reads {} before any pass has written it",
                    pass.name,
                    input.name
                );
            }

            written.extend(pass.output_color_attachments.iter().map(|a| a.name));
            if pass.depth_attachment.is_set() {
                written.insert(pass.depth_attachment.name);
            }
        }

        Ok(())
    }
}

/// Inputs that aren't already in `SHADER_READ_ONLY_OPTIMAL` when their pass starts.
fn input_transitions(
    pass: &RenderPassBuilder,
    images: &ImageTable,
) -> Result<Vec<InputTransition>> {
    pass.input_color_attachments
        .iter()
        .filter(|input| input.initial_layout != AttachmentLayout::ShaderRead)
        .map(|input| {
            let image = *images.get(input.name)?;
            Ok(InputTransition {
                name: input.name,
                image,
                from: input.initial_layout.image_layout_for(image.format),
            })
        })
        .collect()
}
