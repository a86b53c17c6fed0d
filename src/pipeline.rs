use ash::vk;

use crate::{context::GraphicsContext, error::Result, GraphError};

/// One vertex attribute as laid out in a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: vk::Format,
    pub byte_size: u32,
}

impl VertexAttribute {
    pub fn new(format: vk::Format, byte_size: u32) -> Self {
        Self { format, byte_size }
    }

    /// Works out the byte size for the usual vertex formats. Returns `None` for anything
    /// else, use [`VertexAttribute::new`] for those.
    pub fn from_format(format: vk::Format) -> Option<Self> {
        let byte_size = match format {
            vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_SNORM
            | vk::Format::R8G8B8A8_UINT
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::R16G16_SFLOAT
            | vk::Format::R32_SFLOAT
            | vk::Format::R32_UINT
            | vk::Format::R32_SINT => 4,
            vk::Format::R16G16B16A16_SFLOAT
            | vk::Format::R32G32_SFLOAT
            | vk::Format::R32G32_UINT
            | vk::Format::R32G32_SINT => 8,
            vk::Format::R32G32B32_SFLOAT
            | vk::Format::R32G32B32_UINT
            | vk::Format::R32G32B32_SINT => 12,
            vk::Format::R32G32B32A32_SFLOAT
            | vk::Format::R32G32B32A32_UINT
            | vk::Format::R32G32B32A32_SINT => 16,
            _ => return None,
        };
        Some(Self { format, byte_size })
    }
}

/// A vertex buffer binding: its attributes in memory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBinding {
    pub attributes: Vec<VertexAttribute>,
    pub input_rate: vk::VertexInputRate,
}

impl VertexBinding {
    pub fn per_vertex(attributes: Vec<VertexAttribute>) -> Self {
        Self {
            attributes,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn per_instance(attributes: Vec<VertexAttribute>) -> Self {
        Self {
            attributes,
            input_rate: vk::VertexInputRate::INSTANCE,
        }
    }

    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.byte_size).sum()
    }
}

/// Shader modules and the interface the pipeline is built against. The modules are owned by
/// whoever loaded them.
#[derive(Debug, Clone, Default)]
pub struct GraphicShader {
    pub vertex: vk::ShaderModule,
    pub fragment: vk::ShaderModule,
    pub vertex_bindings: Vec<VertexBinding>,
    pub descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphicPipeline {
    pub shader: GraphicShader,
}

impl GraphicPipeline {
    pub fn new(shader: GraphicShader) -> Self {
        Self { shader }
    }
}

#[derive(Debug, Default)]
pub(crate) struct VertexInput {
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

/// Attribute locations are numbered across all bindings; offsets restart at every binding.
pub(crate) fn vertex_input(bindings: &[VertexBinding]) -> VertexInput {
    let mut input = VertexInput::default();
    let mut location = 0;

    for (binding_index, binding) in bindings.iter().enumerate() {
        let binding_index = binding_index as u32;
        let mut offset = 0;

        for attribute in &binding.attributes {
            input.attributes.push(
                vk::VertexInputAttributeDescription::default()
                    .location(location)
                    .binding(binding_index)
                    .format(attribute.format)
                    .offset(offset),
            );
            location += 1;
            offset += attribute.byte_size;
        }

        input.bindings.push(
            vk::VertexInputBindingDescription::default()
                .binding(binding_index)
                .stride(offset)
                .input_rate(binding.input_rate),
        );
    }

    input
}

fn blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

/// Creates the pipeline layout and the graphics pipeline for subpass 0 of `render_pass`.
///
/// If creating the pipeline fails the layout is destroyed before the error is returned.
pub(crate) fn create_pipeline<C: GraphicsContext + ?Sized>(
    context: &C,
    pipeline: &GraphicPipeline,
    render_pass: vk::RenderPass,
    color_attachment_count: usize,
    has_depth: bool,
) -> Result<(vk::Pipeline, vk::PipelineLayout)> {
    let shader = &pipeline.shader;

    let layout = context
        .create_pipeline_layout(
            &vk::PipelineLayoutCreateInfo::default().set_layouts(&shader.descriptor_set_layouts),
        )
        .map_err(GraphError::creation("pipeline layout"))?;

    let vertex_input = vertex_input(&shader.vertex_bindings);
    let blend_attachments = vec![blend_attachment(); color_attachment_count];

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .name(c"main")
            .module(shader.vertex)
            .stage(vk::ShaderStageFlags::VERTEX),
        vk::PipelineShaderStageCreateInfo::default()
            .name(c"main")
            .module(shader.fragment)
            .stage(vk::ShaderStageFlags::FRAGMENT),
    ];

    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_input.bindings)
        .vertex_attribute_descriptions(&vertex_input.attributes);
    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);
    // Viewport and scissor are set when the pass executes
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0);
    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .min_sample_shading(1.0);
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .logic_op(vk::LogicOp::COPY)
        .attachments(&blend_attachments)
        .blend_constants([0.0; 4]);
    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(has_depth)
        .depth_write_enable(has_depth)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
        .stencil_test_enable(false)
        .depth_bounds_test_enable(false)
        .max_depth_bounds(1.);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    match context.create_graphics_pipeline(&create_info) {
        Ok(handle) => Ok((handle, layout)),
        Err(error) => {
            unsafe { context.destroy_pipeline_layout(layout) };
            Err(GraphError::creation("graphics pipeline")(error))
        }
    }
}
