//! WGSL sources for the colour-remapping program.
//!
//! The fragment stage is assembled from three pieces: the preamble (uniform
//! block and texture bindings), a replaceable colour function, and the fixed
//! body that implements the colour modes.

/// Uniform block and bindings shared by the colour function and the body.
pub const FRAGMENT_PREAMBLE: &str = r"
struct ViewUniforms {
    gain: f32,
    gamma: f32,
    startchannel: i32,
    colormode: i32,
    imgchannels: i32,
    pixelview: i32,
    linearinterp: i32,
    width: i32,
    height: i32,
}

@group(0) @binding(0) var<uniform> u: ViewUniforms;
@group(0) @binding(1) var imgtex: texture_2d<f32>;
@group(0) @binding(2) var imgsampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
}
";

/// Exposure and gamma applied after the colour mode.
pub const DEFAULT_COLOR_FUNCTION: &str = r"
fn color_func(c_in: vec4<f32>) -> vec4<f32> {
    let rgb = max(c_in.xyz * u.gain, vec3<f32>(0.0));
    let invgamma = 1.0 / u.gamma;
    return vec4<f32>(pow(rgb, vec3<f32>(invgamma)), c_in.w);
}
";

pub const FRAGMENT_BODY: &str = r"
fn channel(c: vec4<f32>, index: i32) -> f32 {
    var c2 = c;
    return c2[clamp(index, 0, 3)];
}

fn rgba_mode(c: vec4<f32>) -> vec4<f32> {
    if (u.imgchannels <= 2) {
        if (u.startchannel == 1) {
            return vec4<f32>(c.aaa, 1.0);
        }
        return c.rrra;
    }
    return c;
}

fn rgb_mode(c: vec4<f32>) -> vec4<f32> {
    if (u.imgchannels <= 2) {
        if (u.startchannel == 1) {
            return vec4<f32>(c.aaa, 1.0);
        }
        return vec4<f32>(c.rrr, 1.0);
    }
    let s = u.startchannel;
    return vec4<f32>(channel(c, s), channel(c, s + 1), channel(c, s + 2), 1.0);
}

fn singlechannel_mode(c: vec4<f32>) -> vec4<f32> {
    if (u.startchannel > u.imgchannels) {
        return vec4<f32>(0.0, 0.0, 0.0, 1.0);
    }
    let v = channel(c, u.startchannel);
    return vec4<f32>(v, v, v, 1.0);
}

fn luminance_mode(c: vec4<f32>) -> vec4<f32> {
    if (u.imgchannels <= 2) {
        return vec4<f32>(c.rrr, c.a);
    }
    let lum = dot(c.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    return vec4<f32>(lum, lum, lum, c.a);
}

fn heat_red(x: f32) -> f32 {
    return clamp((x - 0.35) / (0.66 - 0.35), 0.0, 1.0)
        - clamp(0.5 * (x - 0.89) / (1.0 - 0.89), 0.0, 1.0);
}

fn heat_green(x: f32) -> f32 {
    return clamp((x - 0.125) / (0.375 - 0.125), 0.0, 1.0)
        - clamp((x - 0.64) / (0.91 - 0.64), 0.0, 1.0);
}

fn heatmap_mode(c: vec4<f32>) -> vec4<f32> {
    let v = channel(c, u.startchannel);
    return vec4<f32>(heat_red(v), heat_green(v), heat_red(1.0 - v), 1.0);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var st = in.texcoord;
    var black = 0.0;
    if (u.pixelview != 0 || u.linearinterp == 0) {
        let wh = vec2<f32>(f32(u.width), f32(u.height));
        let st_res = st * wh;
        let st_pix = floor(st_res);
        let st_rem = st_res - st_pix;
        st = (st_pix + vec2<f32>(0.5, 0.5)) / wh;
        if (u.pixelview != 0) {
            if (st.x < 0.0 || st.x >= 1.0 || st.y < 0.0 || st.y >= 1.0
                || st_rem.x < 0.05 || st_rem.x >= 0.95
                || st_rem.y < 0.05 || st_rem.y >= 0.95) {
                black = 1.0;
            }
        }
    }
    var c = textureSampleLevel(imgtex, imgsampler, st, 0.0);
    c = mix(c, vec4<f32>(0.05, 0.05, 0.05, 1.0), vec4<f32>(black));
    if (u.startchannel < 0) {
        c = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    } else if (u.colormode == 0) {
        c = rgba_mode(c);
    } else if (u.colormode == 1) {
        c = rgb_mode(c);
    } else if (u.colormode == 2) {
        c = singlechannel_mode(c);
    } else if (u.colormode == 3) {
        c = luminance_mode(c);
    } else if (u.colormode == 4) {
        c = heatmap_mode(c);
    }
    if (u.pixelview != 0) {
        c.a = 1.0;
    }
    return color_func(c);
}
";

/// Static vertex stage. Positions arrive already in clip space.
pub const VERTEX_SOURCE: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) texcoord: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.texcoord = texcoord;
    return out;
}
";

/// Fragment source for a given colour function.
pub fn fragment_source(color_function: &str) -> String {
    let capacity = FRAGMENT_PREAMBLE.len() + color_function.len() + FRAGMENT_BODY.len();
    let mut source = String::with_capacity(capacity);
    source.push_str(FRAGMENT_PREAMBLE);
    source.push_str(color_function);
    source.push_str(FRAGMENT_BODY);
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::validate::validate_wgsl;

    #[test]
    fn test_default_fragment_validates() {
        validate_wgsl(&fragment_source(DEFAULT_COLOR_FUNCTION)).unwrap();
    }

    #[test]
    fn test_vertex_validates() {
        validate_wgsl(VERTEX_SOURCE).unwrap();
    }
}
