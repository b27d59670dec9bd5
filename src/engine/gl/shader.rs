use glow::HasContext as _;

const VERTEX_BODY: &str = r#"
in vec2 position;
in vec2 input_texture_coordinate;
out vec2 texture_coordinate;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
    texture_coordinate = input_texture_coordinate;
}
"#;

const FRAGMENT_BODY: &str = r#"
in vec2 texture_coordinate;
uniform sampler2D input_image_texture;
out vec4 frag_color;

void main() {
    frag_color = texture(input_image_texture, texture_coordinate);
}
"#;

pub(super) const POSITION_ATTRIBUTE: &str = "position";
pub(super) const TEXTURE_COORDINATE_ATTRIBUTE: &str = "input_texture_coordinate";
pub(super) const TEXTURE_UNIFORM: &str = "input_image_texture";

/// ### English
/// Parses `(major, minor)` from a `GL_VERSION` string.
///
/// Expected forms: `"4.6.0 ..."` or `"OpenGL ES 3.2 ..."`. Unparseable parts are `0`.
///
/// ### 中文
/// 从 `GL_VERSION` 字符串中解析 `(major, minor)`。
///
/// 期望的形式：`"4.6.0 ..."` 或 `"OpenGL ES 3.2 ..."`。无法解析的部分为 `0`。
pub(super) fn parse_gl_version(version: &str) -> (u32, u32) {
    let Some(token) = version
        .split_whitespace()
        .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
    else {
        return (0, 0);
    };

    let mut parts = token.split('.');
    let mut next = || {
        parts
            .next()
            .and_then(|part| part.parse::<u32>().ok())
            .unwrap_or(0)
    };
    let major = next();
    let minor = next();
    (major, minor)
}

/// ### English
/// GLSL preamble for the context described by `version`.
///
/// ### 中文
/// 与 `version` 描述的上下文相匹配的 GLSL 前导。
pub(super) fn glsl_header(version: &str) -> &'static str {
    if version.starts_with("OpenGL ES") {
        return "#version 300 es\nprecision mediump float;\n";
    }
    match parse_gl_version(version) {
        (major, _) if major > 3 => "#version 330 core\n",
        (3, minor) if minor >= 3 => "#version 330 core\n",
        _ => "#version 130\n",
    }
}

/// ### English
/// Compiles and links the passthrough textured-quad program.
///
/// ### 中文
/// 编译并链接直通纹理四边形程序。
pub(super) unsafe fn link_passthrough_program(
    gl: &glow::Context,
    header: &str,
) -> Result<glow::NativeProgram, String> {
    unsafe {
        let vertex = compile(gl, glow::VERTEX_SHADER, header, VERTEX_BODY)?;
        let fragment = match compile(gl, glow::FRAGMENT_SHADER, header, FRAGMENT_BODY) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(format!("Failed to create shader program: {err}"));
            }
        };
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);

        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(format!("Failed to link passthrough program: {log}"));
        }
        Ok(program)
    }
}

unsafe fn compile(
    gl: &glow::Context,
    kind: u32,
    header: &str,
    body: &str,
) -> Result<glow::NativeShader, String> {
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|err| format!("Failed to create shader: {err}"))?;
        gl.shader_source(shader, &format!("{header}{body}"));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(format!("Failed to compile shader: {log}"));
        }
        Ok(shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_desktop_and_es_versions() {
        assert_eq!(parse_gl_version("4.6.0 NVIDIA 535.54"), (4, 6));
        assert_eq!(parse_gl_version("OpenGL ES 3.2 Mesa 23.1"), (3, 2));
        assert_eq!(parse_gl_version("3.3"), (3, 3));
        assert_eq!(parse_gl_version("garbage"), (0, 0));
    }

    #[test]
    fn header_follows_context_flavor() {
        assert!(glsl_header("OpenGL ES 3.0 ANGLE").starts_with("#version 300 es"));
        assert_eq!(glsl_header("4.1 Metal - 83"), "#version 330 core\n");
        assert_eq!(glsl_header("3.3.0 Mesa"), "#version 330 core\n");
        assert_eq!(glsl_header("3.1 Mesa"), "#version 130\n");
    }
}
