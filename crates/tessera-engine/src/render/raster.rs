use crate::device::RasterDesc;

/// Rasterizer settings of a mesh model.
///
/// The device descriptor is derived from these fields by [`descriptor`](Self::descriptor);
/// any change that alters the descriptor rebuilds the model's raster state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterConfig {
    pub fill_mode: wgpu::PolygonMode,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_bias: i32,
    pub depth_clip_enabled: bool,
    pub front_counter_clockwise: bool,
    pub multisample_enabled: bool,
    pub scissor_enabled: bool,
    /// Shadow casters are rendered into the shadow map without scissoring.
    pub casts_shadow: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            fill_mode: wgpu::PolygonMode::Fill,
            cull_mode: None,
            depth_bias: 0,
            depth_clip_enabled: true,
            front_counter_clockwise: true,
            multisample_enabled: true,
            scissor_enabled: true,
            casts_shadow: false,
        }
    }
}

impl RasterConfig {
    pub const DEPTH_BIAS_CLAMP: f32 = -1000.0;
    pub const SLOPE_SCALED_DEPTH_BIAS: f32 = 0.0;

    pub fn descriptor(&self) -> RasterDesc {
        RasterDesc {
            fill_mode: self.fill_mode,
            cull_mode: self.cull_mode,
            front_face: if self.front_counter_clockwise {
                wgpu::FrontFace::Ccw
            } else {
                wgpu::FrontFace::Cw
            },
            depth_bias: self.depth_bias,
            depth_bias_clamp: Self::DEPTH_BIAS_CLAMP,
            slope_scaled_depth_bias: Self::SLOPE_SCALED_DEPTH_BIAS,
            depth_clip_enabled: self.depth_clip_enabled,
            multisample_enabled: self.multisample_enabled,
            scissor_enabled: self.scissor_enabled && !self.casts_shadow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptor() {
        let d = RasterConfig::default().descriptor();
        assert_eq!(d.fill_mode, wgpu::PolygonMode::Fill);
        assert_eq!(d.cull_mode, None);
        assert_eq!(d.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(d.depth_bias_clamp, -1000.0);
        assert!(d.depth_clip_enabled);
        assert!(d.scissor_enabled);
    }

    #[test]
    fn shadow_casters_never_scissor() {
        let cfg = RasterConfig {
            casts_shadow: true,
            ..RasterConfig::default()
        };
        assert!(!cfg.descriptor().scissor_enabled);
    }

    #[test]
    fn winding_maps_to_front_face() {
        let cfg = RasterConfig {
            front_counter_clockwise: false,
            cull_mode: Some(wgpu::Face::Back),
            ..RasterConfig::default()
        };
        let d = cfg.descriptor();
        assert_eq!(d.front_face, wgpu::FrontFace::Cw);
        assert_eq!(d.cull_mode, Some(wgpu::Face::Back));
    }
}
