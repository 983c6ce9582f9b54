//! Shader program compilation with structured failure reporting.
//!
//! The vertex stage compiles first and a failure there short-circuits the
//! fragment stage entirely. Shader objects never outlive this function: on
//! any failure everything created so far is deleted, and on success the two
//! stage objects are detached and deleted once the program owns their code.

use glow::HasContext;
use tracing::debug;

use crate::diagnostics::{self, Diagnostic, Severity, ShaderStage};

/// Compiles and links a program from the two user sources.
///
/// Returns the linked program, or the parsed diagnostics of the first stage
/// that failed (a link failure yields a single generic line-0 diagnostic).
pub fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, Vec<Diagnostic>> {
    unsafe {
        let vertex = compile_stage(gl, glow::VERTEX_SHADER, ShaderStage::Vertex, vertex_src)?;
        let fragment = match compile_stage(
            gl,
            glow::FRAGMENT_SHADER,
            ShaderStage::Fragment,
            fragment_src,
        ) {
            Ok(shader) => shader,
            Err(diagnostics) => {
                gl.delete_shader(vertex);
                return Err(diagnostics);
            }
        };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(error) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(vec![Diagnostic::generic(
                    format!("failed to create program object: {error}"),
                    Severity::Error,
                    ShaderStage::Fragment,
                )]);
            }
        };

        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            gl.delete_program(program);
            return Err(vec![diagnostics::link_diagnostic(&log)]);
        }

        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        debug!(
            vertex_bytes = vertex_src.len(),
            fragment_bytes = fragment_src.len(),
            "shader program linked"
        );
        Ok(program)
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    gl_type: u32,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader, Vec<Diagnostic>> {
    let shader = gl.create_shader(gl_type).map_err(|error| {
        vec![Diagnostic::generic(
            format!("failed to create {stage} shader object: {error}"),
            Severity::Error,
            stage,
        )]
    })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        let mut parsed = diagnostics::parse_compile_log(&log, stage);
        if parsed.is_empty() {
            // Some drivers fail without saying anything useful.
            parsed.push(Diagnostic::generic(
                format!("{stage} shader compilation failed"),
                Severity::Error,
                stage,
            ));
        }
        return Err(parsed);
    }
    Ok(shader)
}
