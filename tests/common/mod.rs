#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use lazy_render_graph::{
    ash::{
        prelude::VkResult,
        vk::{self, Handle},
    },
    CommandRecorder, GraphicsContext, Image, RenderPassNative,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

unsafe fn slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if len == 0 || ptr.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

#[derive(Debug, Clone)]
pub struct RenderPassRecord {
    pub handle: vk::RenderPass,
    pub attachments: Vec<vk::AttachmentDescription>,
    pub color_references: Vec<vk::AttachmentReference>,
    pub depth_reference: Option<vk::AttachmentReference>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

#[derive(Debug, Clone)]
pub struct FramebufferRecord {
    pub handle: vk::Framebuffer,
    pub render_pass: vk::RenderPass,
    pub views: Vec<vk::ImageView>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineRecord {
    pub handle: vk::Pipeline,
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub blend_attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub depth_test: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destroyed {
    RenderPass(vk::RenderPass),
    Framebuffer(vk::Framebuffer),
    PipelineLayout(vk::PipelineLayout),
    Pipeline(vk::Pipeline),
    Image(vk::Image),
}

/// Hands out unique fake handles and records everything it's asked to create or destroy.
#[derive(Default)]
pub struct MockContext {
    next_handle: Cell<u64>,
    pub render_passes: RefCell<Vec<RenderPassRecord>>,
    pub framebuffers: RefCell<Vec<FramebufferRecord>>,
    pub pipeline_layouts: RefCell<Vec<(vk::PipelineLayout, u32)>>,
    pub pipelines: RefCell<Vec<PipelineRecord>>,
    pub destroyed: RefCell<Vec<Destroyed>>,
    /// Makes creating this kind of object fail once the given number of them were created.
    pub fail: Cell<Option<(&'static str, usize)>>,
}

impl MockContext {
    pub fn failing(object: &'static str, after: usize) -> Self {
        let context = Self::default();
        context.fail.set(Some((object, after)));
        context
    }

    fn handle(&self) -> u64 {
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        0x1000 + next
    }

    fn check(&self, object: &'static str, created: usize) -> VkResult<()> {
        match self.fail.get() {
            Some((failing, after)) if failing == object && created >= after => {
                Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)
            }
            _ => Ok(()),
        }
    }

    pub fn created_count(&self) -> usize {
        self.render_passes.borrow().len()
            + self.framebuffers.borrow().len()
            + self.pipeline_layouts.borrow().len()
            + self.pipelines.borrow().len()
    }

    pub fn destroyed_count(&self, filter: impl Fn(&Destroyed) -> bool) -> usize {
        self.destroyed.borrow().iter().filter(|d| filter(d)).count()
    }
}

impl GraphicsContext for MockContext {
    fn create_render_pass(
        &self,
        create_info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.check("render pass", self.render_passes.borrow().len())?;
        let handle = vk::RenderPass::from_raw(self.handle());

        let record = unsafe {
            let subpasses = slice(create_info.p_subpasses, create_info.subpass_count);
            assert_eq!(subpasses.len(), 1, "the graph always builds one subpass");
            let subpass = &subpasses[0];
            RenderPassRecord {
                handle,
                attachments: slice(create_info.p_attachments, create_info.attachment_count)
                    .to_vec(),
                color_references: slice(
                    subpass.p_color_attachments,
                    subpass.color_attachment_count,
                )
                .to_vec(),
                depth_reference: subpass.p_depth_stencil_attachment.as_ref().copied(),
                dependencies: slice(create_info.p_dependencies, create_info.dependency_count)
                    .to_vec(),
            }
        };

        self.render_passes.borrow_mut().push(record);
        Ok(handle)
    }

    fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        self.check("framebuffer", self.framebuffers.borrow().len())?;
        let handle = vk::Framebuffer::from_raw(self.handle());

        let views = unsafe { slice(create_info.p_attachments, create_info.attachment_count) };
        self.framebuffers.borrow_mut().push(FramebufferRecord {
            handle,
            render_pass: create_info.render_pass,
            views: views.to_vec(),
            width: create_info.width,
            height: create_info.height,
        });
        Ok(handle)
    }

    fn create_pipeline_layout(
        &self,
        create_info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        self.check("pipeline layout", self.pipeline_layouts.borrow().len())?;
        let handle = vk::PipelineLayout::from_raw(self.handle());
        self.pipeline_layouts
            .borrow_mut()
            .push((handle, create_info.set_layout_count));
        Ok(handle)
    }

    fn create_graphics_pipeline(
        &self,
        create_info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        self.check("graphics pipeline", self.pipelines.borrow().len())?;
        let handle = vk::Pipeline::from_raw(self.handle());

        let record = unsafe {
            let vertex_input = &*create_info.p_vertex_input_state;
            let input_assembly = &*create_info.p_input_assembly_state;
            let rasterization = &*create_info.p_rasterization_state;
            let color_blend = &*create_info.p_color_blend_state;
            let dynamic = &*create_info.p_dynamic_state;
            let depth_stencil = &*create_info.p_depth_stencil_state;

            PipelineRecord {
                handle,
                render_pass: create_info.render_pass,
                layout: create_info.layout,
                vertex_bindings: slice(
                    vertex_input.p_vertex_binding_descriptions,
                    vertex_input.vertex_binding_description_count,
                )
                .to_vec(),
                vertex_attributes: slice(
                    vertex_input.p_vertex_attribute_descriptions,
                    vertex_input.vertex_attribute_description_count,
                )
                .to_vec(),
                topology: input_assembly.topology,
                cull_mode: rasterization.cull_mode,
                front_face: rasterization.front_face,
                blend_attachments: slice(color_blend.p_attachments, color_blend.attachment_count)
                    .to_vec(),
                dynamic_states: slice(dynamic.p_dynamic_states, dynamic.dynamic_state_count)
                    .to_vec(),
                depth_test: depth_stencil.depth_test_enable == vk::TRUE,
            }
        };

        self.pipelines.borrow_mut().push(record);
        Ok(handle)
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroyed
            .borrow_mut()
            .push(Destroyed::RenderPass(render_pass));
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroyed
            .borrow_mut()
            .push(Destroyed::Framebuffer(framebuffer));
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroyed
            .borrow_mut()
            .push(Destroyed::PipelineLayout(layout));
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroyed.borrow_mut().push(Destroyed::Pipeline(pipeline));
    }

    unsafe fn destroy_image(&self, image: &Image) {
        self.destroyed.borrow_mut().push(Destroyed::Image(image.handle));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Transition {
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },
    BeginRenderPass(vk::RenderPass),
    BindPipeline(vk::Pipeline),
    SetRenderArea(vk::Extent2D),
    Draw(u32),
    EndRenderPass,
    Copy {
        source: vk::Image,
        source_layout: vk::ImageLayout,
        destination: vk::Image,
        destination_layout: vk::ImageLayout,
    },
}

#[derive(Debug, Default)]
pub struct MockRecorder {
    pub commands: Vec<Command>,
}

impl CommandRecorder for MockRecorder {
    fn handle(&self) -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(0xc0ffee)
    }

    fn begin_render_pass(&mut self, pass: &RenderPassNative) {
        self.commands
            .push(Command::BeginRenderPass(pass.render_pass));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Command::EndRenderPass);
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.commands.push(Command::BindPipeline(pipeline));
    }

    fn set_render_area(&mut self, area: vk::Rect2D) {
        self.commands.push(Command::SetRenderArea(area.extent));
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.commands.push(Command::Draw(vertex_count));
    }

    fn transition_image(&mut self, image: &Image, from: vk::ImageLayout, to: vk::ImageLayout) {
        self.commands.push(Command::Transition {
            image: image.handle,
            from,
            to,
        });
    }

    fn copy_image(
        &mut self,
        source: &Image,
        source_layout: vk::ImageLayout,
        destination: &Image,
        destination_layout: vk::ImageLayout,
    ) {
        self.commands.push(Command::Copy {
            source: source.handle,
            source_layout,
            destination: destination.handle,
            destination_layout,
        });
    }
}

/// A fake image whose handle and view are derived from `id`.
pub fn image(id: u64, width: u32, height: u32, format: vk::Format) -> Image {
    Image::from_raw(
        vk::Image::from_raw(id),
        vk::ImageView::from_raw(id + 0x100),
        vk::Extent2D { width, height },
        format,
    )
}

pub fn color_image(id: u64) -> Image {
    image(id, 128, 128, vk::Format::R8G8B8A8_UNORM)
}

pub fn depth_image(id: u64) -> Image {
    image(id, 128, 128, vk::Format::D32_SFLOAT)
}
