use std::path::Path;

use ash::{
    prelude::VkResult,
    vk::{self, MemoryRequirements},
};

use crate::{
    error::Result,
    image::{aspect_mask, Image},
    GraphError, FULL_IMAGE,
};

/// The device operations the render graph needs.
///
/// Creation failures are reported as-is; the graph treats all of them as fatal.
pub trait GraphicsContext {
    fn create_render_pass(&self, create_info: &vk::RenderPassCreateInfo<'_>)
        -> VkResult<vk::RenderPass>;
    fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer>;
    fn create_pipeline_layout(
        &self,
        create_info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout>;
    fn create_graphics_pipeline(
        &self,
        create_info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline>;

    /// # Safety
    /// `render_pass` must have been created by this context and must not be in use.
    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    /// # Safety
    /// `framebuffer` must have been created by this context and must not be in use.
    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
    /// # Safety
    /// `layout` must have been created by this context and must not be in use.
    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    /// # Safety
    /// `pipeline` must have been created by this context and must not be in use.
    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline);
    /// # Safety
    /// `image` and its view and memory must belong to this context's device and must not be in
    /// use.
    unsafe fn destroy_image(&self, image: &Image);
}

/// A [`GraphicsContext`] backed by an [`ash::Device`]. Instance and device creation are up to
/// the application.
pub struct Context {
    pub device: ash::Device,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Context {
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Self {
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        Self {
            device,
            memory_properties,
        }
    }

    pub fn find_memory_type_index(
        &self,
        requirements: &MemoryRequirements,
        required_properties: vk::MemoryPropertyFlags,
    ) -> Option<u32> {
        let mem_props = self.memory_properties;
        for i in 0..mem_props.memory_type_count {
            if (requirements.memory_type_bits & (1 << i)) != 0
                && mem_props.memory_types[i as usize]
                    .property_flags
                    .contains(required_properties)
            {
                return Some(i);
            }
        }
        None
    }

    /// Creates a device-local 2D image suitable as a render graph attachment, with a view
    /// covering the whole image. Depth formats get a depth view.
    ///
    /// Add the result with [`crate::RenderGraphBuilder::add_image`] to have the graph destroy
    /// it.
    pub fn create_attachment_image(
        &self,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<Image> {
        let device = &self.device;

        let handle = unsafe {
            device.create_image(
                &vk::ImageCreateInfo::default()
                    .array_layers(1)
                    .mip_levels(1)
                    .image_type(vk::ImageType::TYPE_2D)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .tiling(vk::ImageTiling::OPTIMAL)
                    .usage(usage)
                    .sharing_mode(vk::SharingMode::EXCLUSIVE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .extent(extent.into())
                    .format(format),
                None,
            )
        }
        .map_err(GraphError::creation("image"))?;

        let memory_requirements = unsafe { device.get_image_memory_requirements(handle) };

        let Some(memory_type_index) = self
            .find_memory_type_index(&memory_requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL)
        else {
            unsafe { device.destroy_image(handle, None) };
            return Err(GraphError::DeviceObjectCreation {
                object: "image memory",
                source: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            });
        };

        let memory = match unsafe {
            device.allocate_memory(
                &vk::MemoryAllocateInfo::default()
                    .allocation_size(memory_requirements.size)
                    .memory_type_index(memory_type_index),
                None,
            )
        } {
            Ok(memory) => memory,
            Err(error) => {
                unsafe { device.destroy_image(handle, None) };
                return Err(GraphError::creation("image memory")(error));
            }
        };

        let mut image = Image {
            handle,
            view: vk::ImageView::null(),
            extent,
            format,
            memory,
        };

        if let Err(error) = unsafe {
            device.bind_image_memory2(&[vk::BindImageMemoryInfo::default()
                .image(handle)
                .memory(memory)])
        } {
            unsafe { self.destroy_image(&image) };
            return Err(GraphError::creation("image memory binding")(error));
        }

        let mut subresource_range = FULL_IMAGE;
        subresource_range.aspect_mask = aspect_mask(format);

        image.view = match unsafe {
            device.create_image_view(
                &vk::ImageViewCreateInfo::default()
                    .image(handle)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(subresource_range),
                None,
            )
        } {
            Ok(view) => view,
            Err(error) => {
                unsafe { self.destroy_image(&image) };
                return Err(GraphError::creation("image view")(error));
            }
        };

        log::debug!("Created {format:?} attachment image of {extent:?}");

        Ok(image)
    }

    /// Loads a SPIR-V module from disk.
    pub fn load_shader_module(&self, path: impl AsRef<Path>) -> Result<vk::ShaderModule> {
        let mut file = std::fs::File::open(path)?;
        let words = ash::util::read_spv(&mut file)?;

        unsafe {
            self.device
                .create_shader_module(&vk::ShaderModuleCreateInfo::default().code(&words), None)
        }
        .map_err(GraphError::creation("shader module"))
    }
}

impl GraphicsContext for Context {
    fn create_render_pass(
        &self,
        create_info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        unsafe { self.device.create_render_pass(create_info, None) }
    }

    fn create_framebuffer(
        &self,
        create_info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        unsafe { self.device.create_framebuffer(create_info, None) }
    }

    fn create_pipeline_layout(
        &self,
        create_info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(create_info, None) }
    }

    fn create_graphics_pipeline(
        &self,
        create_info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(create_info),
                None,
            )
        }
        .map_err(|(_, error)| error)?;

        pipelines
            .first()
            .copied()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.device.destroy_render_pass(render_pass, None);
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.device.destroy_framebuffer(framebuffer, None);
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.device.destroy_pipeline_layout(layout, None);
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.device.destroy_pipeline(pipeline, None);
    }

    unsafe fn destroy_image(&self, image: &Image) {
        let device = &self.device;

        if image.view != vk::ImageView::null() {
            device.destroy_image_view(image.view, None);
        }
        device.destroy_image(image.handle, None);
        if image.memory != vk::DeviceMemory::null() {
            device.free_memory(image.memory, None);
        }
    }
}
