//! Rendering-engine capability consumed by panoramas and hotspots.
//!
//! Periscope never draws anything itself. Nodes ask a [`RenderBackend`] for
//! GPU-side resources when they are created and hand them back when they are
//! disposed; the handles below are opaque to everything except the backend.
//!
//! [`HeadlessBackend`] allocates handles without a GPU and keeps a journal
//! of every call, which is what the demo binary and the tests run against.

use std::cell::RefCell;
use std::rc::Rc;

use crate::hotspot::HotspotImage;

/// Type-safe handle to panorama geometry owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u64);

/// Type-safe handle to a panorama material owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u64);

/// Type-safe handle to a texture owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Type-safe handle to a hotspot sprite owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u64);

/// Resource operations a panorama viewer needs from its rendering engine.
pub trait RenderBackend {
    /// Inward-facing skybox of the given edge length.
    fn create_skybox_geometry(&mut self, edge_length: f32) -> GeometryId;
    /// Transparent equirectangular material, initially at opacity 0.
    fn create_panorama_material(&mut self) -> MaterialId;
    /// Billboard sprite for a hotspot.
    fn create_sprite(&mut self, image: &HotspotImage, scale: f32) -> SpriteId;
    /// Texture whose pixels are fed by a video frame source.
    fn create_video_texture(&mut self, identifier: &str) -> TextureId;
    /// Re-upload the texture's pixels before the next draw.
    fn mark_texture_dirty(&mut self, texture: TextureId);
    fn release_geometry(&mut self, geometry: GeometryId);
    fn release_material(&mut self, material: MaterialId);
    fn release_texture(&mut self, texture: TextureId);
    fn release_sprite(&mut self, sprite: SpriteId);
}

/// A single call recorded by [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderOp {
    CreateGeometry(GeometryId),
    CreateMaterial(MaterialId),
    CreateSprite(SpriteId),
    CreateTexture(TextureId),
    MarkDirty(TextureId),
    ReleaseGeometry(GeometryId),
    ReleaseMaterial(MaterialId),
    ReleaseTexture(TextureId),
    ReleaseSprite(SpriteId),
}

/// Backend that hands out handles and journals every call.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    journal: Rc<RefCell<Vec<RenderOp>>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the journal, still readable after the backend has been
    /// moved into a [`Tour`](crate::Tour).
    pub fn journal(&self) -> Rc<RefCell<Vec<RenderOp>>> {
        Rc::clone(&self.journal)
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&self, op: RenderOp) {
        self.journal.borrow_mut().push(op);
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_skybox_geometry(&mut self, _edge_length: f32) -> GeometryId {
        let id = GeometryId(self.allocate());
        self.record(RenderOp::CreateGeometry(id));
        id
    }

    fn create_panorama_material(&mut self) -> MaterialId {
        let id = MaterialId(self.allocate());
        self.record(RenderOp::CreateMaterial(id));
        id
    }

    fn create_sprite(&mut self, _image: &HotspotImage, _scale: f32) -> SpriteId {
        let id = SpriteId(self.allocate());
        self.record(RenderOp::CreateSprite(id));
        id
    }

    fn create_video_texture(&mut self, _identifier: &str) -> TextureId {
        let id = TextureId(self.allocate());
        self.record(RenderOp::CreateTexture(id));
        id
    }

    fn mark_texture_dirty(&mut self, texture: TextureId) {
        self.record(RenderOp::MarkDirty(texture));
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.record(RenderOp::ReleaseGeometry(geometry));
    }

    fn release_material(&mut self, material: MaterialId) {
        self.record(RenderOp::ReleaseMaterial(material));
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.record(RenderOp::ReleaseTexture(texture));
    }

    fn release_sprite(&mut self, sprite: SpriteId) {
        self.record(RenderOp::ReleaseSprite(sprite));
    }
}
