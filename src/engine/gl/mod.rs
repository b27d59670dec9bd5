//! ### English
//! OpenGL backend for [`GpuDevice`] built on `glow`.
//!
//! The color buffer is a renderbuffer whose storage the compositor allocates from its backing
//! store; frames are drawn as a textured quad through a passthrough shader.
//!
//! ### 中文
//! 基于 `glow` 的 [`GpuDevice`] OpenGL 后端。
//!
//! 颜色缓冲是一个 renderbuffer，其存储由合成器从 backing store 分配；帧通过直通着色器绘制为纹理四边形。

mod shader;

use std::num::NonZeroU32;
use std::sync::Arc;

use dpi::PhysicalSize;
use glow::HasContext as _;

use crate::engine::surface::{
    BackgroundColor, ColorBufferId, FrameTexture, FramebufferId, GpuDevice,
};

/// ### English
/// [`GpuDevice`] over a `glow` context that is current on the GPU thread.
///
/// ### 中文
/// 基于在 GPU 线程上处于 current 状态的 `glow` 上下文的 [`GpuDevice`]。
pub struct GlowDevice {
    gl: Arc<glow::Context>,
    program: glow::NativeProgram,
    vertex_array: glow::NativeVertexArray,
    position_buffer: glow::NativeBuffer,
    texture_coordinate_buffer: glow::NativeBuffer,
    position_location: u32,
    texture_coordinate_location: u32,
    texture_location: Option<glow::NativeUniformLocation>,
}

impl GlowDevice {
    /// ### English
    /// Builds the passthrough program and vertex state.
    ///
    /// Must be called on the GPU thread with `gl` current (from a device factory).
    ///
    /// ### 中文
    /// 构建直通程序与顶点状态。
    ///
    /// 必须在 GPU 线程上、`gl` 处于 current 状态时调用（在设备工厂中）。
    pub fn new(gl: Arc<glow::Context>) -> Result<Self, String> {
        unsafe {
            let version = gl.get_parameter_string(glow::VERSION);
            let header = shader::glsl_header(&version);
            tracing::debug!(gl_version = %version, "building passthrough program");

            let program = shader::link_passthrough_program(&gl, header)?;

            let Some(position_location) =
                gl.get_attrib_location(program, shader::POSITION_ATTRIBUTE)
            else {
                gl.delete_program(program);
                return Err("Passthrough program has no position attribute".to_string());
            };
            let Some(texture_coordinate_location) =
                gl.get_attrib_location(program, shader::TEXTURE_COORDINATE_ATTRIBUTE)
            else {
                gl.delete_program(program);
                return Err("Passthrough program has no texture coordinate attribute".to_string());
            };
            let texture_location = gl.get_uniform_location(program, shader::TEXTURE_UNIFORM);

            let vertex_array = gl.create_vertex_array().inspect_err(|_| {
                gl.delete_program(program);
            })?;
            let position_buffer = gl.create_buffer().inspect_err(|_| {
                gl.delete_vertex_array(vertex_array);
                gl.delete_program(program);
            })?;
            let texture_coordinate_buffer = gl.create_buffer().inspect_err(|_| {
                gl.delete_buffer(position_buffer);
                gl.delete_vertex_array(vertex_array);
                gl.delete_program(program);
            })?;

            Ok(Self {
                gl,
                program,
                vertex_array,
                position_buffer,
                texture_coordinate_buffer,
                position_location,
                texture_coordinate_location,
                texture_location,
            })
        }
    }

    unsafe fn upload_attribute(&self, buffer: glow::NativeBuffer, location: u32, data: &[f32; 8]) {
        let mut bytes = [0u8; 32];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(data) {
            chunk.copy_from_slice(&value.to_ne_bytes());
        }
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STREAM_DRAW);
            self.gl
                .vertex_attrib_pointer_f32(location, 2, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(location);
        }
    }
}

impl GpuDevice for GlowDevice {
    fn create_framebuffer(&mut self) -> Result<FramebufferId, String> {
        let framebuffer = unsafe { self.gl.create_framebuffer()? };
        Ok(FramebufferId(framebuffer.0.get()))
    }

    fn create_color_buffer(&mut self) -> Result<ColorBufferId, String> {
        let renderbuffer = unsafe { self.gl.create_renderbuffer()? };
        Ok(ColorBufferId(renderbuffer.0.get()))
    }

    fn bind_color_buffer(&mut self, color_buffer: ColorBufferId) {
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, native_renderbuffer(color_buffer));
        }
    }

    fn attach_color_buffer(&mut self, framebuffer: FramebufferId, color_buffer: ColorBufferId) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                native_renderbuffer(color_buffer),
            );
        }
    }

    fn check_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), u32> {
        let status = unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
            self.gl.check_framebuffer_status(glow::FRAMEBUFFER)
        };
        if status == glow::FRAMEBUFFER_COMPLETE {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(framebuffer) = native_framebuffer(framebuffer) {
            unsafe { self.gl.delete_framebuffer(framebuffer) };
        }
    }

    fn delete_color_buffer(&mut self, color_buffer: ColorBufferId) {
        if let Some(renderbuffer) = native_renderbuffer(color_buffer) {
            unsafe { self.gl.delete_renderbuffer(renderbuffer) };
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
        }
    }

    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        unsafe {
            self.gl
                .viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    fn clear(&mut self, color: BackgroundColor) {
        let [red, green, blue, alpha] = color.to_f32_array();
        unsafe {
            self.gl.clear_color(red, green, blue, alpha);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_frame(
        &mut self,
        texture: FrameTexture,
        vertices: &[f32; 8],
        texture_coordinates: &[f32; 8],
    ) {
        unsafe {
            self.gl.use_program(Some(self.program));
            self.gl.bind_vertex_array(Some(self.vertex_array));
            self.upload_attribute(self.position_buffer, self.position_location, vertices);
            self.upload_attribute(
                self.texture_coordinate_buffer,
                self.texture_coordinate_location,
                texture_coordinates,
            );

            self.gl.active_texture(glow::TEXTURE0);
            self.gl
                .bind_texture(glow::TEXTURE_2D, NonZeroU32::new(texture.0).map(glow::NativeTexture));
            self.gl.uniform_1_i32(self.texture_location.as_ref(), 0);

            self.gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

            self.gl.bind_texture(glow::TEXTURE_2D, None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_vertex_array(None);
            self.gl.use_program(None);
        }
    }

    fn flush(&mut self) {
        unsafe { self.gl.flush() };
    }
}

impl Drop for GlowDevice {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.position_buffer);
            self.gl.delete_buffer(self.texture_coordinate_buffer);
            self.gl.delete_vertex_array(self.vertex_array);
            self.gl.delete_program(self.program);
        }
    }
}

fn native_framebuffer(id: FramebufferId) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(id.0).map(glow::NativeFramebuffer)
}

fn native_renderbuffer(id: ColorBufferId) -> Option<glow::NativeRenderbuffer> {
    NonZeroU32::new(id.0).map(glow::NativeRenderbuffer)
}
