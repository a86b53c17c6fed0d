use ash::vk;

use crate::{
    attachment::AttachmentLayout,
    context::GraphicsContext,
    error::Result,
    image::ImageTable,
    pipeline::create_pipeline,
    AttachmentName, BuildOptions, GraphError, RenderPassBuilder,
};

/// The device objects backing one compiled pass.
#[derive(Clone, Default)]
pub struct RenderPassNative {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    /// Null when the pass was built without a pipeline.
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub render_area: vk::Rect2D,
    /// One per attachment, color attachments first, then depth.
    pub clear_values: Vec<vk::ClearValue>,
}

impl RenderPassNative {
    pub fn has_pipeline(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }

    /// Destroys every non-null handle and nulls it out, so destroying twice is a no-op.
    ///
    /// # Safety
    /// The handles must have been created by `context` and must not be in use.
    pub(crate) unsafe fn destroy<C: GraphicsContext + ?Sized>(&mut self, context: &C) {
        if self.pipeline != vk::Pipeline::null() {
            context.destroy_pipeline(std::mem::take(&mut self.pipeline));
        }
        if self.pipeline_layout != vk::PipelineLayout::null() {
            context.destroy_pipeline_layout(std::mem::take(&mut self.pipeline_layout));
        }
        if self.framebuffer != vk::Framebuffer::null() {
            context.destroy_framebuffer(std::mem::take(&mut self.framebuffer));
        }
        if self.render_pass != vk::RenderPass::null() {
            context.destroy_render_pass(std::mem::take(&mut self.render_pass));
        }
    }
}

impl std::fmt::Debug for RenderPassNative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassNative")
            .field("render_pass", &self.render_pass)
            .field("framebuffer", &self.framebuffer)
            .field("pipeline", &self.pipeline)
            .field("pipeline_layout", &self.pipeline_layout)
            .field("render_area", &self.render_area)
            .field("clear_values", &self.clear_values.len())
            .finish()
    }
}

/// Everything about a pass's attachments the render pass and framebuffer are built from.
#[derive(Default)]
pub(crate) struct AttachmentSet {
    pub descriptions: Vec<vk::AttachmentDescription>,
    pub color_references: Vec<vk::AttachmentReference>,
    pub depth_reference: Option<vk::AttachmentReference>,
    pub views: Vec<vk::ImageView>,
    pub clear_values: Vec<vk::ClearValue>,
    pub render_area: vk::Rect2D,
}

impl AttachmentSet {
    /// Looks up every output of `pass` and describes it. The render area is the extent of the
    /// first attachment, or 1×1 without attachments; with `validate_extents` set every other
    /// attachment has to match it.
    pub fn collect(
        pass: &RenderPassBuilder,
        images: &ImageTable,
        options: &BuildOptions,
    ) -> Result<Self> {
        let mut set = AttachmentSet::default();
        let mut extent: Option<vk::Extent2D> = None;

        let mut check_extent = |name: AttachmentName, found: vk::Extent2D| -> Result<()> {
            match extent {
                None => extent = Some(found),
                Some(expected) if expected != found => {
                    if options.validate_extents {
                        return Err(GraphError::MismatchedExtent {
                            pass: pass.name,
                            attachment: name,
                            expected,
                            found,
                        });
                    }
                    log::warn!(
                        "Pass {}: attachment {name} is {found:?} but the pass renders at {expected:?}",
                        pass.name
                    );
                }
                Some(_) => {}
            }
            Ok(())
        };

        for output in &pass.output_color_attachments {
            let image = images.get(output.name)?;
            check_extent(output.name, image.extent)?;

            set.color_references.push(vk::AttachmentReference {
                attachment: set.descriptions.len() as u32,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            });
            set.descriptions.push(
                vk::AttachmentDescription::default()
                    .format(image.format)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(output.initial_state.load_op())
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(output.initial_layout.image_layout_for(image.format))
                    .final_layout(AttachmentLayout::ColorAttachment.image_layout()),
            );
            set.views.push(image.view);
            set.clear_values.push(output.clear_value.into());
        }

        let depth = &pass.depth_attachment;
        if depth.is_set() {
            let image = images.get(depth.name)?;
            check_extent(depth.name, image.extent)?;

            let depth_layout = AttachmentLayout::DepthAttachment.image_layout_for(image.format);
            set.depth_reference = Some(vk::AttachmentReference {
                attachment: set.descriptions.len() as u32,
                layout: depth_layout,
            });
            set.descriptions.push(
                vk::AttachmentDescription::default()
                    .format(image.format)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(depth.initial_state.load_op())
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(depth.initial_layout.image_layout_for(image.format))
                    .final_layout(depth_layout),
            );
            set.views.push(image.view);
            set.clear_values.push(depth.clear_value.into());
        }

        // Neither a framebuffer nor a viewport can be zero sized, even without attachments
        let extent = extent.unwrap_or_default();
        set.render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: extent.width.max(1),
                height: extent.height.max(1),
            },
        };

        Ok(set)
    }
}

/// Synchronisation against whatever ran before and after this pass, in this frame or the
/// previous one.
pub(crate) fn subpass_dependencies(has_depth: bool) -> [vk::SubpassDependency; 2] {
    let mut stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    let mut writes = vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    if has_depth {
        stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        writes |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }

    [
        // Attachments written here may have been sampled by an earlier pass
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages | vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::MEMORY_READ)
            .dst_access_mask(writes)
            .dependency_flags(vk::DependencyFlags::BY_REGION),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(stages)
            .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .src_access_mask(writes)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ)
            .dependency_flags(vk::DependencyFlags::BY_REGION),
    ]
}

/// Creates the render pass, framebuffer and (if the pass has one) the pipeline for a pass whose
/// layouts have already been resolved.
///
/// Nothing is leaked on failure: objects created for this pass are destroyed before the error
/// is returned.
pub fn compile_pass<C: GraphicsContext + ?Sized>(
    context: &C,
    pass: &RenderPassBuilder,
    images: &ImageTable,
    options: &BuildOptions,
) -> Result<RenderPassNative> {
    let attachments = AttachmentSet::collect(pass, images, options)?;
    let has_depth = attachments.depth_reference.is_some();

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&attachments.color_references);
    if let Some(depth_reference) = attachments.depth_reference.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_reference);
    }

    let dependencies = subpass_dependencies(has_depth);

    let render_pass = context
        .create_render_pass(
            &vk::RenderPassCreateInfo::default()
                .attachments(&attachments.descriptions)
                .subpasses(std::slice::from_ref(&subpass))
                .dependencies(&dependencies),
        )
        .map_err(GraphError::creation("render pass"))?;

    let mut native = RenderPassNative {
        render_pass,
        render_area: attachments.render_area,
        clear_values: attachments.clear_values.clone(),
        ..Default::default()
    };

    let extent = attachments.render_area.extent;
    let framebuffer = context.create_framebuffer(
        &vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments.views)
            .width(extent.width)
            .height(extent.height)
            .layers(1),
    );
    native.framebuffer = match framebuffer {
        Ok(framebuffer) => framebuffer,
        Err(error) => {
            unsafe { native.destroy(context) };
            return Err(GraphError::creation("framebuffer")(error));
        }
    };

    if let Some(pipeline) = pass.pipeline.as_ref() {
        match create_pipeline(
            context,
            pipeline,
            render_pass,
            attachments.color_references.len(),
            has_depth,
        ) {
            Ok((handle, layout)) => {
                native.pipeline = handle;
                native.pipeline_layout = layout;
            }
            Err(error) => {
                unsafe { native.destroy(context) };
                return Err(error);
            }
        }
    }

    log::debug!(
        "Compiled pass {}: {} color attachment(s), depth: {has_depth}, pipeline: {}, area {:?}",
        pass.name,
        attachments.color_references.len(),
        native.has_pipeline(),
        native.render_area.extent
    );

    Ok(native)
}
