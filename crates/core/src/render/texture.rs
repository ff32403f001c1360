//! Textures behind sampler uniforms.
//!
//! Each sampler uniform owns one RGBA8 texture. It starts unready; the first
//! successful [`SamplerTexture::upload`] makes it ready, and until then every
//! draw of the owning program is skipped.

use crate::error::ProgramError;

/// Sampling parameters applied when a sampler texture is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    /// GL filter used for both minification and magnification.
    pub filter: u32,
    /// GL wrap mode used on both axes.
    pub wrap: u32,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            filter: glow::LINEAR,
            wrap: glow::CLAMP_TO_EDGE,
        }
    }
}

impl TextureConfig {
    /// Nearest-neighbour sampling, for pixel-exact sprites.
    pub fn nearest() -> Self {
        Self {
            filter: glow::NEAREST,
            ..Self::default()
        }
    }
}

/// Bytes of RGBA8 data a `width` x `height` image needs.
pub fn rgba8_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// The texture of one sampler uniform.
#[derive(Debug)]
pub struct SamplerTexture {
    pub name: String,
    pub unit: u32,
    texture: glow::Texture,
    ready: bool,
    size: Option<(u32, u32)>,
}

impl SamplerTexture {
    /// Creates an empty, unready texture for sampler `name` on `unit`.
    ///
    /// # Errors
    ///
    /// Returns the driver message if the texture cannot be allocated.
    #[allow(unsafe_code)]
    pub fn create(
        gl: &glow::Context,
        name: &str,
        unit: u32,
        config: TextureConfig,
    ) -> Result<Self, String> {
        use glow::HasContext;

        // SAFETY: a fresh texture is bound, configured with valid enums and
        // unbound again.
        let texture = unsafe {
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, config.wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, config.wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, config.filter as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, config.filter as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        Ok(Self {
            name: name.to_string(),
            unit,
            texture,
            ready: false,
            size: None,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Dimensions of the last upload.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Uploads RGBA8 pixels and marks the texture ready.
    ///
    /// # Errors
    ///
    /// `ProgramError::TextureSize` when `pixels` is not `width * height * 4`
    /// bytes; the texture keeps its previous contents and readiness.
    #[allow(unsafe_code)]
    pub fn upload(
        &mut self,
        gl: &glow::Context,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), ProgramError> {
        use glow::HasContext;

        let expected = rgba8_len(width, height);
        if pixels.len() != expected {
            return Err(ProgramError::TextureSize {
                name: self.name.clone(),
                expected,
                got: pixels.len(),
            });
        }

        // SAFETY: the texture is live and `pixels` holds exactly
        // width * height RGBA8 texels.
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        self.ready = true;
        self.size = Some((width, height));
        Ok(())
    }

    /// Binds the texture to its unit.
    #[allow(unsafe_code)]
    pub fn bind(&self, gl: &glow::Context) {
        use glow::HasContext;

        // SAFETY: the texture is live; unit offsets stay within the handful
        // of samplers a shader declares.
        unsafe {
            gl.active_texture(glow::TEXTURE0 + self.unit);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
        }
    }

    #[allow(unsafe_code)]
    pub fn delete(self, gl: &glow::Context) {
        use glow::HasContext;

        // SAFETY: consumes the only handle to the texture.
        unsafe { gl.delete_texture(self.texture) };
    }
}
