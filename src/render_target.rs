//! Offscreen render targets.
//!
//! The compositor draws into a `live` target (multisampled when configured).
//! GL cannot read pixels from a multisampled framebuffer, so a single-sample
//! `resolve` target of the same size exists exactly when `samples > 0` and
//! every capture goes through it.

use eframe::glow::{self, HasContext};
use log::{debug, trace};

use crate::error::RendererError;

/// Framebuffer with colour (RGBA8) and depth/stencil renderbuffers.
#[derive(Debug)]
pub struct RenderTarget {
    framebuffer: glow::Framebuffer,
    color: glow::Renderbuffer,
    depth_stencil: glow::Renderbuffer,
    samples: i32,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn create(
        gl: &glow::Context,
        width: u32,
        height: u32,
        samples: i32,
    ) -> Result<Self, RendererError> {
        let fail = |reason: String| RendererError::RenderTarget {
            width,
            height,
            reason,
        };

        if width == 0 || height == 0 {
            return Err(fail("zero size".to_string()));
        }
        let samples = samples.max(0);

        unsafe {
            let framebuffer = gl
                .create_framebuffer()
                .map_err(|e| fail(format!("Failed to create FBO: {}", e)))?;
            let color = match gl.create_renderbuffer() {
                Ok(rb) => rb,
                Err(e) => {
                    gl.delete_framebuffer(framebuffer);
                    return Err(fail(format!("Failed to create colour renderbuffer: {}", e)));
                }
            };
            let depth_stencil = match gl.create_renderbuffer() {
                Ok(rb) => rb,
                Err(e) => {
                    gl.delete_renderbuffer(color);
                    gl.delete_framebuffer(framebuffer);
                    return Err(fail(format!("Failed to create depth renderbuffer: {}", e)));
                }
            };

            let target = Self {
                framebuffer,
                color,
                depth_stencil,
                samples,
                width,
                height,
            };

            let (w, h) = (width as i32, height as i32);

            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
            gl.renderbuffer_storage_multisample(glow::RENDERBUFFER, samples, glow::RGBA8, w, h);
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth_stencil));
            gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                samples,
                glow::DEPTH24_STENCIL8,
                w,
                h,
            );
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                Some(color),
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth_stencil),
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                target.destroy(gl);
                return Err(fail(format!("framebuffer incomplete: 0x{:X}", status)));
            }

            trace!("Render target created: {}x{} ({} samples)", width, height, samples);
            Ok(target)
        }
    }

    pub fn framebuffer(&self) -> glow::Framebuffer {
        self.framebuffer
    }

    pub fn samples(&self) -> i32 {
        self.samples
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.viewport(0, 0, self.width as i32, self.height as i32);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_renderbuffer(self.color);
            gl.delete_renderbuffer(self.depth_stencil);
        }
    }
}

/// A resolve target is needed exactly when the live target is multisampled.
pub fn resolve_required(samples: i32) -> bool {
    samples > 0
}

/// Where a capture reads its pixels from.
#[derive(Debug, Clone, Copy)]
pub enum CaptureSource<'a> {
    /// Single-sample live target, read directly
    Direct(&'a RenderTarget),
    /// Multisampled live target resolved into a single-sample copy first
    Resolved {
        from: &'a RenderTarget,
        into: &'a RenderTarget,
    },
}

impl<'a> CaptureSource<'a> {
    /// Target that holds readable pixels after [`CaptureSource::resolve`]
    pub fn readable(&self) -> &'a RenderTarget {
        match *self {
            CaptureSource::Direct(target) => target,
            CaptureSource::Resolved { into, .. } => into,
        }
    }

    /// Blit colour into the resolve target if needed.
    /// Leaves the readable framebuffer bound for reading.
    pub fn resolve(&self, gl: &glow::Context) -> glow::Framebuffer {
        unsafe {
            if let CaptureSource::Resolved { from, into } = *self {
                let (w, h) = (from.width as i32, from.height as i32);
                gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(from.framebuffer));
                gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(into.framebuffer));
                gl.blit_framebuffer(
                    0,
                    0,
                    w,
                    h,
                    0,
                    0,
                    w,
                    h,
                    glow::COLOR_BUFFER_BIT,
                    glow::NEAREST,
                );
                gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            }
            let readable = self.readable().framebuffer;
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(readable));
            readable
        }
    }
}

/// Live target plus its optional resolve companion, always the same size.
#[derive(Debug)]
pub struct RenderTargets {
    live: RenderTarget,
    resolve: Option<RenderTarget>,
}

impl RenderTargets {
    pub fn create(
        gl: &glow::Context,
        width: u32,
        height: u32,
        samples: i32,
    ) -> Result<Self, RendererError> {
        let live = RenderTarget::create(gl, width, height, samples)?;
        let resolve = if resolve_required(samples) {
            match RenderTarget::create(gl, width, height, 0) {
                Ok(target) => Some(target),
                Err(e) => {
                    live.destroy(gl);
                    return Err(e);
                }
            }
        } else {
            None
        };

        debug!(
            "Render targets {}x{}: {} samples, resolve {}",
            width,
            height,
            samples,
            if resolve.is_some() { "on" } else { "off" }
        );
        Ok(Self { live, resolve })
    }

    pub fn live(&self) -> &RenderTarget {
        &self.live
    }

    pub fn resolve_target(&self) -> Option<&RenderTarget> {
        self.resolve.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.live.width
    }

    pub fn height(&self) -> u32 {
        self.live.height
    }

    pub fn capture_source(&self) -> CaptureSource<'_> {
        match &self.resolve {
            Some(into) => CaptureSource::Resolved {
                from: &self.live,
                into,
            },
            None => CaptureSource::Direct(&self.live),
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        self.live.destroy(gl);
        if let Some(resolve) = &self.resolve {
            resolve.destroy(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    /// GL-free target for selection tests; never destroyed.
    fn fake_target(id: u32, samples: i32) -> RenderTarget {
        let id = NonZeroU32::new(id).unwrap();
        RenderTarget {
            framebuffer: glow::NativeFramebuffer(id),
            color: glow::NativeRenderbuffer(id),
            depth_stencil: glow::NativeRenderbuffer(id),
            samples,
            width: 64,
            height: 32,
        }
    }

    #[test]
    fn test_resolve_required_only_for_msaa() {
        assert!(!resolve_required(0));
        assert!(resolve_required(1));
        assert!(resolve_required(4));
    }

    #[test]
    fn test_direct_capture_without_msaa() {
        let targets = RenderTargets {
            live: fake_target(1, 0),
            resolve: None,
        };
        let source = targets.capture_source();
        assert!(matches!(source, CaptureSource::Direct(_)));
        assert_eq!(source.readable().framebuffer(), targets.live().framebuffer());
        assert!(targets.resolve_target().is_none());
    }

    #[test]
    fn test_msaa_capture_reads_resolve_target() {
        let targets = RenderTargets {
            live: fake_target(1, 4),
            resolve: Some(fake_target(2, 0)),
        };
        let source = targets.capture_source();
        match source {
            CaptureSource::Resolved { from, into } => {
                assert!(from.is_multisampled());
                assert!(!into.is_multisampled());
                assert_eq!(source.readable().framebuffer(), into.framebuffer());
            }
            CaptureSource::Direct(_) => panic!("multisampled target read directly"),
        }
        assert_eq!((targets.width(), targets.height()), (64, 32));
    }
}
