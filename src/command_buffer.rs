use ash::vk;

use crate::{compiler::RenderPassNative, Image};

/// The command buffer operations the render graph records.
///
/// Render callbacks receive the same recorder, and can reach the raw handle through
/// [`CommandRecorder::handle`] to record their own draw calls.
pub trait CommandRecorder {
    fn handle(&self) -> vk::CommandBuffer;

    fn begin_render_pass(&mut self, pass: &RenderPassNative);
    fn end_render_pass(&mut self);
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);
    /// Sets the dynamic viewport and scissor to cover `area`.
    fn set_render_area(&mut self, area: vk::Rect2D);
    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn transition_image(&mut self, image: &Image, from: vk::ImageLayout, to: vk::ImageLayout);
    /// Copies the whole of `source` into `destination`. `destination` is left in
    /// `TRANSFER_DST_OPTIMAL`.
    fn copy_image(
        &mut self,
        source: &Image,
        source_layout: vk::ImageLayout,
        destination: &Image,
        destination_layout: vk::ImageLayout,
    );
}

/// A [`CommandRecorder`] over a command buffer in the RECORDING state.
pub struct CommandBuffer<'a> {
    device: &'a ash::Device,
    handle: vk::CommandBuffer,
}

impl<'a> CommandBuffer<'a> {
    pub fn new(device: &'a ash::Device, handle: vk::CommandBuffer) -> Self {
        Self { device, handle }
    }

    pub fn device(&self) -> &ash::Device {
        self.device
    }
}

/// Stage and access masks used when an image enters or leaves `layout`.
fn layout_access(layout: vk::ImageLayout) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    match layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
        | vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
            vk::AccessFlags2::SHADER_SAMPLED_READ,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_READ,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
        ),
        _ => (vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE),
    }
}

fn image_barrier(
    image: &Image,
    from: vk::ImageLayout,
    to: vk::ImageLayout,
) -> vk::ImageMemoryBarrier2<'static> {
    let (src_stage_mask, src_access_mask) = layout_access(from);
    let (dst_stage_mask, dst_access_mask) = layout_access(to);

    vk::ImageMemoryBarrier2::default()
        .subresource_range(image.subresource_range())
        .image(image.handle)
        .src_stage_mask(src_stage_mask)
        .src_access_mask(src_access_mask)
        .dst_stage_mask(dst_stage_mask)
        .dst_access_mask(dst_access_mask)
        .old_layout(from)
        .new_layout(to)
}

impl CommandRecorder for CommandBuffer<'_> {
    fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    fn begin_render_pass(&mut self, pass: &RenderPassNative) {
        unsafe {
            self.device.cmd_begin_render_pass(
                self.handle,
                &vk::RenderPassBeginInfo::default()
                    .render_pass(pass.render_pass)
                    .framebuffer(pass.framebuffer)
                    .render_area(pass.render_area)
                    .clear_values(&pass.clear_values),
                vk::SubpassContents::INLINE,
            );
        }
    }

    fn end_render_pass(&mut self) {
        unsafe { self.device.cmd_end_render_pass(self.handle) };
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(self.handle, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn set_render_area(&mut self, area: vk::Rect2D) {
        unsafe {
            self.device.cmd_set_scissor(self.handle, 0, &[area]);
            self.device.cmd_set_viewport(
                self.handle,
                0,
                &[vk::Viewport::default()
                    .x(area.offset.x as _)
                    .y(area.offset.y as _)
                    .width(area.extent.width as _)
                    .height(area.extent.height as _)
                    .max_depth(1.)],
            );
        }
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw(
                self.handle,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    fn transition_image(&mut self, image: &Image, from: vk::ImageLayout, to: vk::ImageLayout) {
        unsafe {
            self.device.cmd_pipeline_barrier2(
                self.handle,
                &vk::DependencyInfo::default().image_memory_barriers(&[image_barrier(
                    image, from, to,
                )]),
            );
        }
    }

    fn copy_image(
        &mut self,
        source: &Image,
        source_layout: vk::ImageLayout,
        destination: &Image,
        destination_layout: vk::ImageLayout,
    ) {
        let subresource = |image: &Image| {
            vk::ImageSubresourceLayers::default()
                .aspect_mask(image.subresource_range().aspect_mask)
                .mip_level(0)
                .base_array_layer(0)
                .layer_count(1)
        };

        // Copy the region both images have in common
        let extent = vk::Extent3D {
            width: source.width().min(destination.width()),
            height: source.height().min(destination.height()),
            depth: 1,
        };

        unsafe {
            self.device.cmd_pipeline_barrier2(
                self.handle,
                &vk::DependencyInfo::default().image_memory_barriers(&[
                    image_barrier(source, source_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
                    image_barrier(
                        destination,
                        destination_layout,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    ),
                ]),
            );

            self.device.cmd_copy_image(
                self.handle,
                source.handle,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                destination.handle,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[vk::ImageCopy::default()
                    .src_subresource(subresource(source))
                    .dst_subresource(subresource(destination))
                    .extent(extent)],
            );
        }
    }
}
