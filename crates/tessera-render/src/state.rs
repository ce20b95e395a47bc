//! Diff-before-apply cache of GPU state for one frame.
//!
//! Every setter compares against the cached value and only records a command
//! when something actually changed, so the number of transitions tracks the
//! number of real changes rather than the number of sprites.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tessera_test_utils::{
    CommandRecorder, GpuBindGroup, GpuBindGroupLayout, GpuBuffer, GpuTexture, RenderContext,
};

use crate::{
    buffer::DynamicBuffer,
    error::RenderResult,
    resource::ResourceId,
    sprite::{BlendMode, DepthMode, INDEX_FORMAT, Shader, Texture, Vertex},
};

/// Bind group slot of the camera uniform in sprite pipelines.
pub const CAMERA_GROUP: u32 = 0;
/// Bind group slot of the sprite texture in sprite pipelines.
pub const TEXTURE_GROUP: u32 = 1;
/// Bind group slot of the source target in full-screen effect pipelines.
pub const SOURCE_GROUP: u32 = 0;

const MAX_BIND_GROUPS: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view: Mat4,
    projection: Mat4,
}

pub struct FrameRenderState {
    camera_layout: GpuBindGroupLayout,
    camera_buffer: GpuBuffer,
    camera_binding: GpuBindGroup,
    camera_id: ResourceId,
    view: Mat4,
    projection: Mat4,
    camera_uploaded: bool,

    target: Option<ResourceId>,
    vertex_buffer: Option<ResourceId>,
    index_buffer: Option<ResourceId>,
    bind_groups: [Option<ResourceId>; MAX_BIND_GROUPS],
    shader: Option<ResourceId>,
    blend: Option<BlendMode>,
    depth: Option<DepthMode>,

    state_changes: u32,
    passes: u32,
}

impl FrameRenderState {
    pub fn new(ctx: &dyn RenderContext) -> Self {
        let camera_layout = ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Binding Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let camera_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_binding =
            ctx.create_uniform_binding(Some("Camera Binding"), &camera_layout, &camera_buffer);

        Self {
            camera_layout,
            camera_buffer,
            camera_binding,
            camera_id: ResourceId::next(),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_uploaded: false,
            target: None,
            vertex_buffer: None,
            index_buffer: None,
            bind_groups: [None; MAX_BIND_GROUPS],
            shader: None,
            blend: None,
            depth: None,
            state_changes: 0,
            passes: 0,
        }
    }

    /// Layout sprite pipelines must use for [`CAMERA_GROUP`].
    pub fn camera_layout(&self) -> &GpuBindGroupLayout {
        &self.camera_layout
    }

    /// Forget everything bound and zero the counters. The camera uniform keeps
    /// its contents.
    pub fn reset(&mut self) {
        self.target = None;
        self.invalidate_pass_bindings();
        self.state_changes = 0;
        self.passes = 0;
    }

    fn invalidate_pass_bindings(&mut self) {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.bind_groups = [None; MAX_BIND_GROUPS];
        self.shader = None;
        self.blend = None;
        self.depth = None;
    }

    /// Transitions applied since the last [`reset`](Self::reset).
    pub fn state_changes(&self) -> u32 {
        self.state_changes
    }

    /// Render passes begun since the last [`reset`](Self::reset).
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn render_target(&self) -> Option<ResourceId> {
        self.target
    }

    pub fn texture(&self) -> Option<ResourceId> {
        self.bind_groups[TEXTURE_GROUP as usize]
    }

    pub fn shader(&self) -> Option<ResourceId> {
        self.shader
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Begin a pass on `texture` unless it is already the bound target.
    ///
    /// A new pass drops every pass-scoped binding.
    pub fn set_render_target(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        id: ResourceId,
        texture: &GpuTexture,
        depth: Option<&GpuTexture>,
        clear: Option<wgpu::Color>,
    ) -> bool {
        if self.target == Some(id) {
            return false;
        }

        recorder.begin_pass(Some("Sprite Pass"), texture, depth, clear);
        self.target = Some(id);
        self.invalidate_pass_bindings();
        self.passes += 1;
        self.state_changes += 1;
        true
    }

    pub fn end_pass(&mut self, recorder: &mut dyn CommandRecorder) {
        if self.target.take().is_some() {
            recorder.end_pass();
            self.invalidate_pass_bindings();
        }
    }

    pub fn set_view(&mut self, ctx: &dyn RenderContext, view: Mat4) -> bool {
        if self.camera_uploaded && self.view == view {
            return false;
        }
        self.view = view;
        self.upload_camera(ctx);
        true
    }

    pub fn set_projection(&mut self, ctx: &dyn RenderContext, projection: Mat4) -> bool {
        if self.camera_uploaded && self.projection == projection {
            return false;
        }
        self.projection = projection;
        self.upload_camera(ctx);
        true
    }

    fn upload_camera(&mut self, ctx: &dyn RenderContext) {
        let uniform = CameraUniform {
            view: self.view,
            projection: self.projection,
        };
        ctx.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
        self.camera_uploaded = true;
        self.state_changes += 1;
    }

    pub fn bind_camera(&mut self, recorder: &mut dyn CommandRecorder) -> bool {
        let (id, binding) = (self.camera_id, self.camera_binding.clone());
        self.set_bind_group(recorder, CAMERA_GROUP, id, &binding)
    }

    pub fn set_bind_group(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        index: u32,
        id: ResourceId,
        group: &GpuBindGroup,
    ) -> bool {
        if let Some(slot) = self.bind_groups.get_mut(index as usize) {
            if *slot == Some(id) {
                return false;
            }
            *slot = Some(id);
        }

        recorder.set_bind_group(index, group);
        self.state_changes += 1;
        true
    }

    pub fn set_texture(&mut self, recorder: &mut dyn CommandRecorder, texture: &Texture) -> bool {
        self.set_bind_group(recorder, TEXTURE_GROUP, texture.id(), texture.binding())
    }

    pub fn set_vertex_buffer(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        buffer: &DynamicBuffer<Vertex>,
    ) -> bool {
        if self.vertex_buffer == Some(buffer.id()) {
            return false;
        }
        recorder.set_vertex_buffer(0, buffer.buffer());
        self.vertex_buffer = Some(buffer.id());
        self.state_changes += 1;
        true
    }

    pub fn set_index_buffer(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        buffer: &DynamicBuffer<u32>,
    ) -> bool {
        if self.index_buffer == Some(buffer.id()) {
            return false;
        }
        recorder.set_index_buffer(buffer.buffer(), INDEX_FORMAT);
        self.index_buffer = Some(buffer.id());
        self.state_changes += 1;
        true
    }

    /// Bind the shader's pipeline for `blend` and `depth` if any of the three changed.
    pub fn set_pipeline(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        shader: &Shader,
        blend: BlendMode,
        depth: DepthMode,
    ) -> RenderResult<bool> {
        if self.shader == Some(shader.id()) && self.blend == Some(blend) && self.depth == Some(depth)
        {
            return Ok(false);
        }

        recorder.set_pipeline(shader.pipeline(blend, depth)?);
        self.shader = Some(shader.id());
        self.blend = Some(blend);
        self.depth = Some(depth);
        self.state_changes += 1;
        Ok(true)
    }
}
