use glam::Mat4;

use crate::device::{CommandContext, DeviceProvider, Material, MaterialBinding};
use crate::error::ModelError;
use crate::mesh::{classify, GeometryChange, MeshDescription, UpdateStrategy};

use super::instances::{InstanceSet, InstanceSync};
use super::projector::{SyncConfig, VertexArrayBuffer};
use super::raster::RasterConfig;
use super::submit::{submit_draw, DrawInput, DrawOutcome, SkipReason};
use super::sync::{BufferSynchronizer, SyncOutcome};

/// Per-frame inputs supplied by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Parent (scene) transform; the model matrix is applied first.
    pub world: Mat4,
    /// Whether a shadow map is bound for this frame.
    pub shadow_map_enabled: bool,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            shadow_map_enabled: false,
        }
    }
}

/// A renderable mesh: geometry, GPU buffers, raster state, material and instances.
///
/// Lifecycle:
/// - `attach` creates every GPU resource (fails without geometry)
/// - geometry notifications keep the buffers in sync while attached
/// - `render` records one draw per frame
/// - `detach` (or drop) releases every GPU resource
///
/// All calls happen on the render thread.
pub struct MeshModel<D: DeviceProvider, M> {
    geometry: Option<MeshDescription>,
    buffers: BufferSynchronizer<D>,

    instance_list: Vec<Mat4>,
    instances: InstanceSet<D>,

    raster_config: RasterConfig,
    raster_state: Option<D::RasterState>,

    material: Option<M>,
    model_matrix: Mat4,
    visible: bool,
    attached: bool,
    redraw_requested: bool,
}

impl<D: DeviceProvider, M> Default for MeshModel<D, M> {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl<D: DeviceProvider, M> MeshModel<D, M> {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            geometry: None,
            buffers: BufferSynchronizer::new(config),
            instance_list: Vec::new(),
            instances: InstanceSet::new(),
            raster_config: RasterConfig::default(),
            raster_state: None,
            material: None,
            model_matrix: Mat4::IDENTITY,
            visible: true,
            attached: false,
            redraw_requested: false,
        }
    }

    pub fn with_geometry(mut self, mesh: MeshDescription) -> Self {
        self.geometry = Some(mesh);
        self
    }

    pub fn with_material(mut self, material: M) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_raster_config(mut self, config: RasterConfig) -> Self {
        self.raster_config = config;
        self
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    #[inline]
    pub fn geometry(&self) -> Option<&MeshDescription> {
        self.geometry.as_ref()
    }

    /// Direct access for edits; follow up with [`notify`](Self::notify).
    #[inline]
    pub fn geometry_mut(&mut self) -> Option<&mut MeshDescription> {
        self.geometry.as_mut()
    }

    #[inline]
    pub fn buffers(&self) -> &BufferSynchronizer<D> {
        &self.buffers
    }

    #[inline]
    pub fn packed(&self) -> Option<&VertexArrayBuffer> {
        self.buffers.packed()
    }

    #[inline]
    pub fn instance_set(&self) -> &InstanceSet<D> {
        &self.instances
    }

    #[inline]
    pub fn instances(&self) -> &[Mat4] {
        &self.instance_list
    }

    #[inline]
    pub fn has_instances(&self) -> bool {
        !self.instance_list.is_empty()
    }

    #[inline]
    pub fn raster_config(&self) -> RasterConfig {
        self.raster_config
    }

    #[inline]
    pub fn raster_state(&self) -> Option<&D::RasterState> {
        self.raster_state.as_ref()
    }

    #[inline]
    pub fn material(&self) -> Option<&M> {
        self.material.as_ref()
    }

    #[inline]
    pub fn material_mut(&mut self) -> Option<&mut M> {
        self.material.as_mut()
    }

    pub fn set_material(&mut self, material: Option<M>) {
        self.material = material;
        self.redraw_requested = true;
    }

    #[inline]
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn set_model_matrix(&mut self, matrix: Mat4) {
        self.model_matrix = matrix;
        self.redraw_requested = true;
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.redraw_requested = true;
    }

    /// Returns and clears the redraw request raised by the last mutations.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Creates raster state, vertex and index buffers.
    ///
    /// Fails without touching any resource when no geometry is bound. A raster
    /// state failure is logged and leaves the model attached but not drawable.
    pub fn attach(&mut self, device: &D) -> Result<(), ModelError> {
        if self.geometry.is_none() {
            return Err(ModelError::MissingGeometry);
        }
        if self.attached {
            self.detach();
        }

        self.attached = true;
        self.rebuild_raster_state(device);
        self.report_geometry_problems();
        self.buffers.rebuild_all(device, self.geometry.as_ref());
        self.instances.mark_dirty();
        self.redraw_requested = true;

        log::debug!(
            "mesh model attached: {} vertices, {} indices",
            self.buffers.vertex_count(),
            self.buffers.index_count()
        );
        Ok(())
    }

    /// Releases vertex, index and instance buffers and the raster state.
    pub fn detach(&mut self) {
        self.buffers.release();
        self.instances.release();
        self.raster_state = None;
        self.attached = false;
        log::debug!("mesh model detached");
    }

    // ── geometry ──────────────────────────────────────────────────────────

    /// Replaces the mesh. While attached, vertex and index buffers are rebuilt.
    pub fn set_geometry(&mut self, device: &D, mesh: Option<MeshDescription>) -> SyncOutcome {
        self.geometry = mesh;
        self.redraw_requested = true;
        if !self.attached {
            return SyncOutcome::Detached;
        }
        self.report_geometry_problems();
        self.buffers.rebuild_all(device, self.geometry.as_ref())
    }

    // Mismatched channels are packed with defaults; say so once per rebuild.
    fn report_geometry_problems(&self) {
        if let Some(Err(err)) = self.geometry.as_ref().map(MeshDescription::validate) {
            log::warn!("mesh geometry: {err}");
        }
    }

    /// Reacts to a change of one mesh channel.
    ///
    /// Before `attach` the change is only recorded in the mesh; attach builds
    /// everything from scratch anyway.
    pub fn notify(&mut self, device: &D, change: GeometryChange) -> SyncOutcome {
        self.redraw_requested = true;
        if !self.attached {
            return SyncOutcome::Detached;
        }
        let strategy: UpdateStrategy = classify(change);
        self.buffers.apply(device, self.geometry.as_ref(), strategy)
    }

    /// [`notify`](Self::notify) with a channel name from a property system.
    pub fn notify_channel(&mut self, device: &D, channel: &str) -> SyncOutcome {
        self.notify(device, GeometryChange::from_channel_name(channel))
    }

    /// Edits the mesh in place and dispatches `change`.
    ///
    /// Does nothing when no mesh is bound.
    pub fn edit_geometry(
        &mut self,
        device: &D,
        change: GeometryChange,
        edit: impl FnOnce(&mut MeshDescription),
    ) -> SyncOutcome {
        let Some(mesh) = self.geometry.as_mut() else {
            return SyncOutcome::Released;
        };
        edit(mesh);
        self.notify(device, change)
    }

    /// Changes vertex-sync settings; while attached the vertex data is rebuilt.
    pub fn set_sync_config(&mut self, device: &D, config: SyncConfig) {
        if self.buffers.config() == config {
            return;
        }
        self.buffers.set_config(config);
        if self.attached {
            self.notify(device, GeometryChange::FullSwap);
        }
    }

    // ── instances ─────────────────────────────────────────────────────────

    /// Replaces the instance list. An empty list disables instancing.
    pub fn set_instances(&mut self, transforms: Vec<Mat4>) {
        self.instance_list = transforms;
        self.instances.mark_dirty();
        self.redraw_requested = true;
    }

    /// Edits the instance list in place and marks it dirty.
    pub fn edit_instances(&mut self, edit: impl FnOnce(&mut Vec<Mat4>)) {
        edit(&mut self.instance_list);
        self.instances.mark_dirty();
        self.redraw_requested = true;
    }

    pub fn clear_instances(&mut self) {
        self.set_instances(Vec::new());
    }

    // ── raster state ──────────────────────────────────────────────────────

    /// Updates rasterizer settings, rebuilding the raster state when the
    /// derived descriptor changes.
    pub fn set_raster_config(&mut self, device: &D, config: RasterConfig) {
        let changed = config.descriptor() != self.raster_config.descriptor();
        self.raster_config = config;
        if changed {
            self.rebuild_raster_state(device);
        }
    }

    fn rebuild_raster_state(&mut self, device: &D) {
        self.raster_state = None;
        self.redraw_requested = true;
        if !self.attached {
            return;
        }
        match device.create_raster_state(&self.raster_config.descriptor()) {
            Ok(state) => self.raster_state = Some(state),
            Err(err) => log::warn!("raster state unavailable, model will not draw: {err}"),
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draw gate: attached, visible, and a material with bound shader resources.
    pub fn can_render(&self) -> bool
    where
        M: Material,
    {
        self.skip_reason().is_none()
    }

    fn skip_reason(&self) -> Option<SkipReason>
    where
        M: Material,
    {
        if !self.attached {
            Some(SkipReason::NotAttached)
        } else if !self.visible {
            Some(SkipReason::Hidden)
        } else if !self.material.as_ref().is_some_and(Material::is_attached) {
            Some(SkipReason::NoMaterial)
        } else {
            None
        }
    }

    /// Records this frame's draw.
    ///
    /// Order: material parameters, instance upload (when dirty), then the draw
    /// itself. Skips silently when the gate or a resource check fails.
    pub fn render<C>(&mut self, device: &D, ctx: &mut C, frame: &FrameContext) -> DrawOutcome
    where
        C: CommandContext<D>,
        M: MaterialBinding<C>,
    {
        if let Some(reason) = self.skip_reason() {
            log::trace!("mesh model draw skipped: {reason:?}");
            return DrawOutcome::Skipped(reason);
        }
        let Some(material) = self.material.as_mut() else {
            return DrawOutcome::Skipped(SkipReason::NoMaterial);
        };

        material.set_world(frame.world * self.model_matrix);
        material.set_has_shadow_map(frame.shadow_map_enabled);

        let drawable = self.raster_state.is_some()
            && self.buffers.vertex_buffer().is_some()
            && self.buffers.index_buffer().is_some();

        let instances = if drawable && !self.instance_list.is_empty() {
            if let InstanceSync::Created { capacity } =
                self.instances.sync(device, ctx, &self.instance_list)
            {
                log::trace!("instance buffer grown to {capacity}");
            }
            self.instances
                .buffer()
                .map(|buffer| (buffer, self.instance_list.len() as u32))
        } else {
            None
        };

        submit_draw(
            ctx,
            material,
            DrawInput {
                vertex_buffer: self.buffers.vertex_buffer(),
                index_buffer: self.buffers.index_buffer(),
                index_count: self.buffers.index_count(),
                raster_state: self.raster_state.as_ref(),
                instances,
            },
        )
    }
}

impl<D: DeviceProvider, M> Drop for MeshModel<D, M> {
    fn drop(&mut self) {
        if self.attached {
            self.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::device::dummy::{DummyContext, DummyDevice, RecordingMaterial};

    type Model = MeshModel<DummyDevice, RecordingMaterial>;

    fn triangle() -> MeshDescription {
        MeshDescription::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    fn model() -> Model {
        Model::default()
            .with_geometry(triangle())
            .with_material(RecordingMaterial::default())
    }

    #[test]
    fn attach_without_geometry_fails_cleanly() {
        let device = DummyDevice::new();
        let mut m = Model::default();
        assert_eq!(m.attach(&device), Err(ModelError::MissingGeometry));
        assert!(!m.is_attached());
        assert_eq!(device.stats().buffers_created, 0);
        assert_eq!(device.stats().raster_states_created, 0);
    }

    #[test]
    fn raster_failure_is_swallowed_and_skips_drawing() {
        let device = DummyDevice::new();
        device.set_fail_raster_states(true);
        let mut m = model();
        assert_eq!(m.attach(&device), Ok(()));
        assert!(m.raster_state().is_none());

        let mut ctx = DummyContext::new();
        let out = m.render(&device, &mut ctx, &FrameContext::default());
        assert_eq!(out, DrawOutcome::Skipped(SkipReason::NoRasterState));
        assert!(ctx.draws().is_empty());

        device.set_fail_raster_states(false);
        m.set_raster_config(
            &device,
            RasterConfig {
                depth_bias: 4,
                ..RasterConfig::default()
            },
        );
        assert!(m.raster_state().is_some());
        let out = m.render(&device, &mut ctx, &FrameContext::default());
        assert_eq!(out, DrawOutcome::Indexed { index_count: 3 });
    }

    #[test]
    fn unchanged_descriptor_does_not_rebuild_raster_state() {
        let device = DummyDevice::new();
        let mut m = model();
        m.attach(&device).expect("attach");
        assert_eq!(device.stats().raster_states_created, 1);

        m.set_raster_config(
            &device,
            RasterConfig {
                casts_shadow: true,
                ..RasterConfig::default()
            },
        );
        assert_eq!(device.stats().raster_states_created, 2);

        // Scissor is already off for shadow casters; toggling it changes nothing.
        m.set_raster_config(
            &device,
            RasterConfig {
                casts_shadow: true,
                scissor_enabled: false,
                ..RasterConfig::default()
            },
        );
        assert_eq!(device.stats().raster_states_created, 2);
    }

    #[test]
    fn raster_config_before_attach_is_only_stored() {
        let device = DummyDevice::new();
        let mut m = model();
        let cfg = RasterConfig {
            cull_mode: Some(wgpu::Face::Back),
            ..RasterConfig::default()
        };
        m.set_raster_config(&device, cfg);
        assert_eq!(device.stats().raster_states_created, 0);
        assert_eq!(m.raster_config(), cfg);

        m.attach(&device).expect("attach");
        let state = m.raster_state().expect("raster state");
        assert_eq!(state.desc.cull_mode, Some(wgpu::Face::Back));
    }

    #[test]
    fn detach_releases_everything_and_reattach_starts_clean() {
        let device = DummyDevice::new();
        let mut m = model();
        m.set_instances(vec![Mat4::IDENTITY; 2]);
        m.attach(&device).expect("attach");
        let mut ctx = DummyContext::new();
        m.render(&device, &mut ctx, &FrameContext::default());
        assert_eq!(device.stats().live_buffers(), 3);

        m.detach();
        assert_eq!(device.stats().live_buffers(), 0);
        assert!(m.buffers().vertex_buffer().is_none());
        assert!(m.buffers().index_buffer().is_none());
        assert!(m.instance_set().buffer().is_none());
        assert!(m.raster_state().is_none());
        assert!(m.packed().is_none());

        m.attach(&device).expect("reattach");
        let out = m.render(&device, &mut ctx, &FrameContext::default());
        assert_eq!(
            out,
            DrawOutcome::Instanced {
                index_count: 3,
                instance_count: 2
            }
        );
        assert_eq!(device.stats().live_buffers(), 3);
    }

    #[test]
    fn dropping_an_attached_model_releases_buffers() {
        let device = DummyDevice::new();
        {
            let mut m = model();
            m.attach(&device).expect("attach");
            assert_eq!(device.stats().live_buffers(), 2);
        }
        assert_eq!(device.stats().live_buffers(), 0);
    }

    #[test]
    fn changes_before_attach_are_deferred() {
        let device = DummyDevice::new();
        let mut m = model();
        assert_eq!(
            m.notify(&device, GeometryChange::Colors),
            SyncOutcome::Detached
        );
        assert_eq!(device.stats().buffers_created, 0);
        assert!(m.take_redraw_request());
        assert!(!m.take_redraw_request());
    }
}
