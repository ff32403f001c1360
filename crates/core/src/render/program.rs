//! The live, GL-backed render program.
//!
//! `RenderProgram` wraps a [`VertexProgram`] and owns the GL objects that
//! draw it: the linked program, a vertex array (where supported), the
//! vertex buffer, one static buffer per instanced attribute and one texture
//! per sampler uniform. Attribute and uniform locations are resolved once at
//! construction. Attributes the driver optimized away have no location and
//! are skipped when binding.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::ops::Range;

use super::context::GpuContext;
use super::error::RenderError;
use super::shader::compile_program;
use super::texture::{SamplerTexture, TextureConfig};
use crate::definition::ProgramDefinition;
use crate::draw::{plan_draw, DrawPlan, QUAD_VERTICES};
use crate::error::ProgramError;
use crate::info::ProgramInfo;
use crate::program::{VertexId, VertexProgram};
use crate::registry::CodecRegistry;
use crate::uniform::UniformBinder;
use crate::value::{UniformValue, UniformValues, Vertex};

/// Callback run around a draw call with the bound context.
pub type DrawHook = Box<dyn FnMut(&glow::Context)>;

struct BoundAttribute {
    /// Index into `ProgramInfo::attributes`.
    slot: usize,
    location: u32,
}

struct BoundInstanced {
    /// Index into `ProgramInfo::instanced`.
    index: usize,
    location: u32,
    buffer: glow::Buffer,
}

struct BoundUniform {
    binder: UniformBinder,
    location: Option<glow::UniformLocation>,
}

/// Read-only view of another program's uploaded vertex buffer.
///
/// Obtained from [`RenderProgram::share`] and valid only while the owner is
/// borrowed, so the owner cannot grow or dispose the buffer underneath it.
#[derive(Debug)]
pub struct SharedBuffer<'a> {
    buffer: glow::Buffer,
    byte_per_vertex: usize,
    count: usize,
    _owner: PhantomData<&'a ()>,
}

impl SharedBuffer<'_> {
    pub fn byte_per_vertex(&self) -> usize {
        self.byte_per_vertex
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

pub struct RenderProgram {
    vertices: VertexProgram,
    program: glow::Program,
    vao: Option<glow::VertexArray>,
    vertex_buffer: Option<glow::Buffer>,
    /// Bytes allocated for `vertex_buffer` on the GPU.
    gpu_capacity: usize,
    attributes: Vec<BoundAttribute>,
    instanced: Vec<BoundInstanced>,
    uniforms: Vec<BoundUniform>,
    textures: Vec<SamplerTexture>,
    warned: BTreeSet<String>,
    pre_draw: Option<DrawHook>,
    post_draw: Option<DrawHook>,
}

impl RenderProgram {
    /// Compiles `definition` with the built-in codec table and builds its GL
    /// objects.
    ///
    /// # Errors
    ///
    /// Configuration errors from layout planning, shader compile or link
    /// errors with the driver log, `MissingExtension` when instanced
    /// attributes are requested without instancing support, and `Gl` when
    /// an object cannot be allocated.
    pub fn new(ctx: &GpuContext, definition: &ProgramDefinition) -> Result<Self, RenderError> {
        Self::with_registry(ctx, definition, &CodecRegistry::new())
    }

    /// Like [`new`](Self::new), resolving attribute types through `registry`.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_registry(
        ctx: &GpuContext,
        definition: &ProgramDefinition,
        registry: &CodecRegistry,
    ) -> Result<Self, RenderError> {
        let info = ProgramInfo::compile_with(definition, registry)?;
        if info.is_instanced() {
            ctx.require_instancing()?;
        }

        let gl = ctx.gl();
        let program = compile_program(gl, &definition.vertex, &definition.fragment)?;
        let mut this = Self {
            vertices: VertexProgram::from_info(info),
            program,
            vao: None,
            vertex_buffer: None,
            gpu_capacity: 0,
            attributes: Vec::new(),
            instanced: Vec::new(),
            uniforms: Vec::new(),
            textures: Vec::new(),
            warned: BTreeSet::new(),
            pre_draw: None,
            post_draw: None,
        };
        if let Err(e) = this.allocate(ctx) {
            this.dispose(gl);
            return Err(e);
        }
        Ok(this)
    }

    #[allow(unsafe_code)]
    fn allocate(&mut self, ctx: &GpuContext) -> Result<(), RenderError> {
        use glow::HasContext;

        let gl = ctx.gl();
        let info = self.vertices.info();

        // SAFETY: every call takes the freshly linked program or a buffer
        // created just before it; all enums are valid GL constants.
        unsafe {
            if ctx.supports_vertex_arrays() {
                self.vao = Some(gl.create_vertex_array().map_err(RenderError::Gl)?);
            }

            for (slot, attribute) in info.attributes.iter().enumerate() {
                match gl.get_attrib_location(self.program, &attribute.name) {
                    Some(location) => self.attributes.push(BoundAttribute { slot, location }),
                    None => log::debug!("attribute '{}' is inactive", attribute.name),
                }
            }

            for (index, attribute) in info.instanced.iter().enumerate() {
                let Some(location) = gl.get_attrib_location(self.program, &attribute.name) else {
                    log::debug!("instanced attribute '{}' is inactive", attribute.name);
                    continue;
                };
                let buffer = gl.create_buffer().map_err(RenderError::Gl)?;
                self.instanced.push(BoundInstanced {
                    index,
                    location,
                    buffer,
                });
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &attribute.bytes, glow::STATIC_DRAW);
                gl.bind_buffer(glow::ARRAY_BUFFER, None);
            }

            for binder in &info.uniforms {
                let location = gl.get_uniform_location(self.program, binder.name());
                if let UniformBinder::Sampler { name, unit } = binder {
                    let texture = SamplerTexture::create(gl, name, *unit, TextureConfig::default())
                        .map_err(RenderError::Gl)?;
                    self.textures.push(texture);
                }
                self.uniforms.push(BoundUniform {
                    binder: binder.clone(),
                    location,
                });
            }

            if info.capacity > 0 {
                self.vertex_buffer = Some(gl.create_buffer().map_err(RenderError::Gl)?);
            }
        }
        Ok(())
    }

    pub fn info(&self) -> &ProgramInfo {
        self.vertices.info()
    }

    pub fn vertices(&self) -> &VertexProgram {
        &self.vertices
    }

    /// See [`VertexProgram::add`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::add`].
    pub fn add(&mut self, vertex: &Vertex) -> Result<VertexId, ProgramError> {
        self.vertices.add(vertex)
    }

    /// See [`VertexProgram::update`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::update`].
    pub fn update(&mut self, id: VertexId, vertex: &Vertex) -> Result<(), ProgramError> {
        self.vertices.update(id, vertex)
    }

    /// See [`VertexProgram::get`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::get`].
    pub fn get(&self, id: VertexId) -> Result<Vertex, ProgramError> {
        self.vertices.get(id)
    }

    /// See [`VertexProgram::remove`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::remove`].
    pub fn remove(&mut self, id: VertexId) -> Result<Option<VertexId>, ProgramError> {
        self.vertices.remove(id)
    }

    pub fn count(&self) -> usize {
        self.vertices.count()
    }

    /// See [`VertexProgram::set_count`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::set_count`].
    pub fn set_count(&mut self, count: usize) -> Result<(), ProgramError> {
        self.vertices.set_count(count)
    }

    pub fn get_buffer(&self) -> Vec<u8> {
        self.vertices.get_buffer()
    }

    /// See [`VertexProgram::append_buffer`].
    ///
    /// # Errors
    ///
    /// See [`VertexProgram::append_buffer`].
    pub fn append_buffer(&mut self, bytes: &[u8], byte_offset: usize) -> Result<(), ProgramError> {
        self.vertices.append_buffer(bytes, byte_offset)
    }

    pub fn on_pre_draw(&mut self, hook: impl FnMut(&glow::Context) + 'static) {
        self.pre_draw = Some(Box::new(hook));
    }

    pub fn on_post_draw(&mut self, hook: impl FnMut(&glow::Context) + 'static) {
        self.post_draw = Some(Box::new(hook));
    }

    /// Whether every sampler has received pixel data.
    pub fn textures_ready(&self) -> bool {
        self.textures.iter().all(SamplerTexture::is_ready)
    }

    /// Uploads RGBA8 pixels for the sampler uniform `name`.
    ///
    /// # Errors
    ///
    /// `UnknownTexture` when the program has no such sampler and
    /// `TextureSize` when `pixels` does not match the dimensions.
    pub fn set_texture_source(
        &mut self,
        gl: &glow::Context,
        name: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), RenderError> {
        let texture = self
            .textures
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| ProgramError::UnknownTexture(name.to_string()))?;
        texture.upload(gl, width, height, pixels)?;
        Ok(())
    }

    /// Draws the vertices in `range` (all of them when `None`).
    ///
    /// Does nothing when the program is empty, the range is empty or a
    /// sampler has no pixel data yet.
    ///
    /// # Errors
    ///
    /// `UniformMismatch` for a uniform value of the wrong type and `Gl` when
    /// the vertex buffer cannot be allocated.
    pub fn draw(
        &mut self,
        gl: &glow::Context,
        uniforms: &UniformValues,
        range: Option<Range<usize>>,
    ) -> Result<(), RenderError> {
        let plan = plan_draw(
            self.vertices.count(),
            range,
            self.textures_ready(),
            self.info().is_instanced(),
        );
        self.submit(gl, plan, uniforms, None)
    }

    /// Draws from another program's buffer instead of this one's.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` when the strides differ, otherwise as
    /// [`draw`](Self::draw).
    pub fn draw_shared(
        &mut self,
        gl: &glow::Context,
        source: &SharedBuffer<'_>,
        uniforms: &UniformValues,
        range: Option<Range<usize>>,
    ) -> Result<(), RenderError> {
        check_shared_stride(source.byte_per_vertex, self.info().byte_per_vertex)?;
        let plan = plan_draw(
            source.count,
            range,
            self.textures_ready(),
            self.info().is_instanced(),
        );
        self.submit(gl, plan, uniforms, Some(source.buffer))
    }

    /// Uploads pending changes and lends the GPU buffer to other programs.
    ///
    /// # Errors
    ///
    /// `Gl` when the vertex buffer cannot be allocated.
    pub fn share(&mut self, gl: &glow::Context) -> Result<SharedBuffer<'_>, RenderError> {
        let buffer = self.sync(gl)?;
        Ok(SharedBuffer {
            buffer,
            byte_per_vertex: self.info().byte_per_vertex,
            count: self.vertices.count(),
            _owner: PhantomData,
        })
    }

    #[allow(unsafe_code)]
    fn submit(
        &mut self,
        gl: &glow::Context,
        plan: DrawPlan,
        uniforms: &UniformValues,
        shared: Option<glow::Buffer>,
    ) -> Result<(), RenderError> {
        use glow::HasContext;

        let first = match plan {
            DrawPlan::Skip(reason) => {
                log::trace!("draw skipped: {reason:?}");
                return Ok(());
            }
            DrawPlan::Plain { .. } => 0,
            DrawPlan::Instanced { first, .. } => first,
        };

        if let Some(hook) = self.pre_draw.as_mut() {
            hook(gl);
        }

        // SAFETY: program and vertex array are live until dispose.
        unsafe {
            gl.use_program(Some(self.program));
            if let Some(vao) = self.vao {
                gl.bind_vertex_array(Some(vao));
            }
        }
        self.upload_uniforms(gl, uniforms)?;
        let buffer = match shared {
            Some(buffer) => buffer,
            None => self.sync(gl)?,
        };
        self.bind_attributes(gl, buffer, first);

        // SAFETY: every enabled attribute points into a buffer that covers
        // the drawn range.
        unsafe {
            match plan {
                DrawPlan::Plain { first, count } => {
                    gl.draw_arrays(self.info().primitive.gl_enum(), first, count);
                }
                DrawPlan::Instanced { instances, .. } => {
                    gl.draw_arrays_instanced(glow::TRIANGLES, 0, QUAD_VERTICES, instances);
                }
                DrawPlan::Skip(_) => {}
            }
        }
        self.unbind_attributes(gl);

        if let Some(hook) = self.post_draw.as_mut() {
            hook(gl);
        }
        Ok(())
    }

    #[allow(unsafe_code)]
    fn upload_uniforms(
        &mut self,
        gl: &glow::Context,
        values: &UniformValues,
    ) -> Result<(), RenderError> {
        use glow::HasContext;

        for uniform in &self.uniforms {
            let location = uniform.location.as_ref();
            match &uniform.binder {
                UniformBinder::Sampler { unit, .. } => {
                    if let Some(texture) = self.textures.iter().find(|t| t.unit == *unit) {
                        texture.bind(gl);
                    }
                    // SAFETY: the program is bound; unit is a small index.
                    unsafe { gl.uniform_1_i32(location, *unit as i32) };
                }
                UniformBinder::Typed { name, .. } => match values.get(name) {
                    Some(value) => {
                        uniform.binder.check(value)?;
                        upload_value(gl, location, value);
                    }
                    None => {
                        if self.warned.insert(name.clone()) {
                            log::warn!("no value for uniform '{name}'; keeping its previous value");
                        }
                    }
                },
            }
        }
        Ok(())
    }

    /// Uploads the CPU buffer if it changed and returns the GPU buffer.
    #[allow(unsafe_code)]
    fn sync(&mut self, gl: &glow::Context) -> Result<glow::Buffer, RenderError> {
        use glow::HasContext;

        let buffer = match self.vertex_buffer {
            Some(buffer) => buffer,
            None => {
                // SAFETY: plain object allocation.
                let buffer = unsafe { gl.create_buffer() }.map_err(RenderError::Gl)?;
                self.vertex_buffer = Some(buffer);
                self.gpu_capacity = 0;
                buffer
            }
        };

        if self.vertices.buffer_mut().take_dirty() {
            let cpu = self.vertices.buffer();
            // SAFETY: the buffer is live; uploads stay within the allocation
            // made by the preceding buffer_data call.
            unsafe {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                if cpu.capacity_bytes() > self.gpu_capacity {
                    gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, cpu.bytes(), glow::DYNAMIC_DRAW);
                    self.gpu_capacity = cpu.capacity_bytes();
                } else {
                    gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, cpu.used());
                }
            }
        }
        Ok(buffer)
    }

    #[allow(unsafe_code)]
    fn bind_attributes(&self, gl: &glow::Context, buffer: glow::Buffer, first: usize) {
        use glow::HasContext;

        let info = self.vertices.info();
        let stride = info.byte_per_vertex;
        let instanced = info.is_instanced();

        // SAFETY: locations were resolved from this program and pointers
        // describe the planned layout of a live buffer.
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            for bound in &self.attributes {
                let slot = &info.attributes[bound.slot];
                let pointer = slot.codec.bind(stride, first.saturating_mul(stride).saturating_add(slot.offset));
                gl.enable_vertex_attrib_array(bound.location);
                gl.vertex_attrib_pointer_f32(
                    bound.location,
                    pointer.size,
                    pointer.data_type.gl_enum(),
                    pointer.normalized,
                    pointer.stride,
                    pointer.offset,
                );
                if instanced {
                    gl.vertex_attrib_divisor(bound.location, slot.codec.divisor(true));
                }
            }

            for bound in &self.instanced {
                let attribute = &info.instanced[bound.index];
                let pointer = attribute.codec.bind(attribute.codec.byte_width(), 0);
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(bound.buffer));
                gl.enable_vertex_attrib_array(bound.location);
                gl.vertex_attrib_pointer_f32(
                    bound.location,
                    pointer.size,
                    pointer.data_type.gl_enum(),
                    pointer.normalized,
                    pointer.stride,
                    pointer.offset,
                );
                gl.vertex_attrib_divisor(bound.location, attribute.codec.divisor(false));
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    /// Resets divisors to 0 and, without a vertex array, disables the
    /// arrays this program enabled.
    #[allow(unsafe_code)]
    fn unbind_attributes(&self, gl: &glow::Context) {
        use glow::HasContext;

        let info = self.vertices.info();
        // SAFETY: same locations as in bind_attributes.
        unsafe {
            if info.is_instanced() {
                for bound in &self.attributes {
                    let slot = &info.attributes[bound.slot];
                    gl.vertex_attrib_divisor(bound.location, slot.codec.divisor(false));
                }
            }
            match AttributeScope::of(self.vao.is_some()) {
                AttributeScope::VertexArray => gl.bind_vertex_array(None),
                AttributeScope::Global => {
                    let locations = self.attributes.iter().map(|a| a.location);
                    for location in locations.chain(self.instanced.iter().map(|a| a.location)) {
                        gl.disable_vertex_attrib_array(location);
                    }
                }
            }
        }
    }

    /// Releases every GL object the program owns.
    #[allow(unsafe_code)]
    pub fn dispose(self, gl: &glow::Context) {
        use glow::HasContext;

        // SAFETY: consumes the program; no handle outlives this call.
        unsafe {
            gl.delete_program(self.program);
            if let Some(vao) = self.vao {
                gl.delete_vertex_array(vao);
            }
            if let Some(buffer) = self.vertex_buffer {
                gl.delete_buffer(buffer);
            }
            for bound in &self.instanced {
                gl.delete_buffer(bound.buffer);
            }
        }
        for texture in self.textures {
            texture.delete(gl);
        }
    }
}

/// Where enabled attribute arrays live between draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeScope {
    /// Captured by the program's vertex array, which is unbound after the draw.
    VertexArray,
    /// Global context state; the program disables its arrays after the draw.
    /// Vertex array calls are never issued, since contexts without vertex
    /// arrays reject them.
    Global,
}

impl AttributeScope {
    fn of(has_vertex_array: bool) -> Self {
        if has_vertex_array {
            AttributeScope::VertexArray
        } else {
            AttributeScope::Global
        }
    }
}

/// A program can only draw from a buffer laid out with its own stride.
fn check_shared_stride(source: usize, program: usize) -> Result<(), ProgramError> {
    if source == program {
        Ok(())
    } else {
        Err(ProgramError::LayoutMismatch {
            expected: source,
            got: program,
        })
    }
}

#[allow(unsafe_code)]
fn upload_value(gl: &glow::Context, location: Option<&glow::UniformLocation>, value: &UniformValue) {
    use glow::HasContext;

    // SAFETY: the owning program is bound and `value` matches the
    // uniform's declared type.
    unsafe {
        match *value {
            UniformValue::Float(x) => gl.uniform_1_f32(location, x),
            UniformValue::Vec2([x, y]) => gl.uniform_2_f32(location, x, y),
            UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(location, x, y, z),
            UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(location, x, y, z, w),
            UniformValue::Int(x) => gl.uniform_1_i32(location, x),
            UniformValue::Mat2(ref m) => gl.uniform_matrix_2_f32_slice(location, false, m),
            UniformValue::Mat3(ref m) => gl.uniform_matrix_3_f32_slice(location, false, m),
            UniformValue::Mat4(ref m) => gl.uniform_matrix_4_f32_slice(location, false, m),
        }
    }
}
