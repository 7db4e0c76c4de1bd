//! Shader modules and a small graphics pipeline builder

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use ash::vk;

use super::vertex::Vertex;
use crate::error::{RuntimeError, RuntimeResult};
use crate::gpu::Core;

const ENTRY_POINT: &CStr = c"main";

/// Shader module wrapper with RAII cleanup, dropped before the [`Core`]
pub struct ShaderModule {
    device: ash::Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V bytecode
    pub fn from_spirv(core: &Core, bytes: &[u8]) -> RuntimeResult<Self> {
        let code = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| RuntimeError::invalid(format!("Invalid SPIR-V: {e}")))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe {
            core.device()
                .create_shader_module(&create_info, None)
                .map_err(RuntimeError::vk("shader module creation"))?
        };

        Ok(Self {
            device: core.device().clone(),
            module,
        })
    }

    /// Load a compiled shader from disk
    pub fn from_file(core: &Core, path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| RuntimeError::invalid(format!("Failed to read shader {}: {e}", path.display())))?;
        Self::from_spirv(core, &bytes)
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    fn stage(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Builder for a [`Pipeline`] drawing [`Vertex`] data with one uniform buffer
///
/// Viewport and scissor are dynamic so the pipeline survives resizes.
pub struct PipelineBuilder<'a> {
    vertex: &'a ShaderModule,
    fragment: &'a ShaderModule,
    topology: vk::PrimitiveTopology,
    cull_mode: vk::CullModeFlags,
    front_face: vk::FrontFace,
    uniform_stages: vk::ShaderStageFlags,
}

impl<'a> PipelineBuilder<'a> {
    /// Start with triangle lists, back-face culling and a vertex-stage uniform
    pub fn new(vertex: &'a ShaderModule, fragment: &'a ShaderModule) -> Self {
        Self {
            vertex,
            fragment,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            uniform_stages: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Primitive topology, e.g. `POINT_LIST`
    #[must_use]
    pub fn topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Face culling
    #[must_use]
    pub fn cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Winding treated as front-facing
    #[must_use]
    pub fn front_face(mut self, front_face: vk::FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    /// Create the pipeline for subpass 0 of `render_pass`
    pub fn build(self, core: &Core, render_pass: vk::RenderPass) -> RuntimeResult<Pipeline> {
        let device = core.device();

        let bindings = [vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
            .descriptor_count(1)
            .stage_flags(self.uniform_stages)
            .build()];
        let set_layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let set_layout = unsafe {
            device
                .create_descriptor_set_layout(&set_layout_info, None)
                .map_err(RuntimeError::vk("descriptor set layout creation"))?
        };

        // From here on the partially built pipeline cleans up after itself
        let mut pipeline = Pipeline {
            device: device.clone(),
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            set_layout,
            descriptor_pool: vk::DescriptorPool::null(),
        };

        let set_layouts = [set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        pipeline.layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(RuntimeError::vk("pipeline layout creation"))?
        };

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            descriptor_count: 1,
        }];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        pipeline.descriptor_pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(RuntimeError::vk("descriptor pool creation"))?
        };

        let stages = [
            self.vertex.stage(vk::ShaderStageFlags::VERTEX),
            self.fragment.stage(vk::ShaderStageFlags::FRAGMENT),
        ];

        let bindings = [Vertex::binding_description()];
        let attributes = Vertex::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(pipeline.layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, result)| RuntimeError::from_vk("graphics pipeline creation", result))?
        };
        pipeline.pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::invalid("no pipeline returned"))?;

        log::debug!("Graphics pipeline created ({:?})", self.topology);
        Ok(pipeline)
    }
}

/// Graphics pipeline, its layout, and the pool for its one descriptor set
///
/// Destroys through a cloned device handle, so it must not outlive the [`Core`].
pub struct Pipeline {
    device: ash::Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
}

impl Pipeline {
    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Allocate the descriptor set pointing at `range` bytes of `buffer`
    ///
    /// The offset into the buffer is supplied per draw as a dynamic offset.
    pub fn uniform_set(&self, buffer: vk::Buffer, range: u64) -> RuntimeResult<vk::DescriptorSet> {
        let set_layouts = [self.set_layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&set_layouts);

        let set = unsafe {
            self.device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(RuntimeError::vk("descriptor set allocation"))?
        }
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::invalid("no descriptor set returned"))?;

        let buffer_info = [vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range,
        }];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
            .buffer_info(&buffer_info);

        unsafe {
            self.device.update_descriptor_sets(&[write.build()], &[]);
        }
        Ok(set)
    }

    /// Bind the pipeline, its descriptor set, and a full-extent viewport and scissor
    pub fn bind(&self, command_buffer: vk::CommandBuffer, set: vk::DescriptorSet, dynamic_offset: u32, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        unsafe {
            self.device
                .cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            self.device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            self.device.cmd_set_scissor(command_buffer, 0, &[scissor]);
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &[set],
                &[dynamic_offset],
            );
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.device.destroy_pipeline_layout(self.layout, None);
            self.device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
