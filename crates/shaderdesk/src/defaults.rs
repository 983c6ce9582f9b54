//! Builtin shader sources used when no files are supplied.

pub const DEFAULT_VERTEX_SHADER: &str = r"#version 330 core
const vec2 verts[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    gl_Position = vec4(verts[gl_VertexID], 0.0, 1.0);
}
";

/// Demo shader exercising every default builtin: time, resolution, mouse and
/// the previous-frame trail.
pub const DEFAULT_FRAGMENT_SHADER: &str = r"#version 330 core
uniform float u_time;
uniform vec2 u_resolution;
uniform vec2 u_mouse;
uniform sampler2D u_lastFrame;
out vec4 fragColor;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution;
    vec3 trail = texture(u_lastFrame, uv).rgb * 0.92;
    vec3 wave = 0.5 + 0.5 * cos(u_time + uv.xyx + vec3(0.0, 2.0, 4.0));
    float d = distance(uv, u_mouse);
    vec3 color = max(wave * smoothstep(0.25, 0.0, d), trail);
    fragColor = vec4(color, 1.0);
}
";
