//! Compiling and linking the GPU program of a render program.
//!
//! Failures carry the driver's info log verbatim, followed by a
//! line-numbered copy of the offending source so the log's line references
//! can be read against it. The numbering itself is plain string work and is
//! tested without a GPU.

use std::fmt;

use thiserror::Error;

/// The two programmable stages a render program compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    CompileError { stage: ShaderStage, log: String },

    #[error("program failed to link:\n{0}")]
    LinkError(String),
}

/// Joins a driver `log` with a line-numbered copy of `source`.
///
/// The log comes first so the driver's message is never buried under a
/// long shader. Numbers are right-aligned to the widest line number.
pub fn annotate_source(log: &str, source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();
    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}| {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    match (log.trim_end().is_empty(), numbered.is_empty()) {
        (true, true) => String::new(),
        (false, true) => log.trim_end().to_string(),
        (true, false) => numbered,
        (false, false) => format!("{}\n\n{numbered}", log.trim_end()),
    }
}

/// Compiles one stage.
///
/// # Errors
///
/// `ShaderError::CompileError` with the annotated driver log.
#[allow(unsafe_code)]
pub fn compile_shader(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    use glow::HasContext;

    // SAFETY: the stage enum is a valid shader type; the handle is deleted
    // on the failure path.
    unsafe {
        let shader = gl
            .create_shader(stage.gl_enum())
            .map_err(|log| ShaderError::CompileError { stage, log })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            return Ok(shader);
        }
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        Err(ShaderError::CompileError {
            stage,
            log: annotate_source(&log, source),
        })
    }
}

/// Compiles both stages and links them. Shader objects are released before
/// returning in every case.
///
/// # Errors
///
/// The first compile error, or `ShaderError::LinkError` with the link log
/// and both annotated sources.
#[allow(unsafe_code)]
pub fn compile_program(
    gl: &glow::Context,
    vertex: &str,
    fragment: &str,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    let vs = compile_shader(gl, ShaderStage::Vertex, vertex)?;
    let fs = match compile_shader(gl, ShaderStage::Fragment, fragment) {
        Ok(fs) => fs,
        Err(e) => {
            // SAFETY: `vs` came from a successful compile above.
            unsafe { gl.delete_shader(vs) };
            return Err(e);
        }
    };

    // SAFETY: both shader handles are live; the program is deleted if
    // linking fails and the shaders are deleted on every path.
    unsafe {
        let result = match gl.create_program() {
            Ok(program) => {
                gl.attach_shader(program, vs);
                gl.attach_shader(program, fs);
                gl.link_program(program);
                gl.detach_shader(program, vs);
                gl.detach_shader(program, fs);
                if gl.get_program_link_status(program) {
                    Ok(program)
                } else {
                    let log = gl.get_program_info_log(program);
                    gl.delete_program(program);
                    Err(ShaderError::LinkError(link_report(&log, vertex, fragment)))
                }
            }
            Err(log) => Err(ShaderError::LinkError(log)),
        };
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        result
    }
}

fn link_report(log: &str, vertex: &str, fragment: &str) -> String {
    format!(
        "{}\n\n-- vertex --\n{}\n\n-- fragment --\n{}",
        log.trim_end(),
        annotate_source("", vertex),
        annotate_source("", fragment)
    )
}
