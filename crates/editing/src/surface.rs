use std::time::Duration;

use foundation::geo::{GeoPoint, Polygon};

/// Native vertex-editing affordance of a rendered polygon.
pub trait VertexEditor {
    fn start_editing(&mut self);
    fn stop_editing(&mut self);
}

/// The map the admin draws on.
///
/// Rendering and tiling live behind this seam; the editing core only asks it
/// to move, to show or hide the current polygon, and for its vertex editor.
pub trait MapSurface {
    fn set_center(&mut self, center: GeoPoint, zoom: u8, transition: Duration);

    /// Renders `polygon` as the editable overlay. Only called with usable rings.
    fn show_polygon(&mut self, polygon: &Polygon);

    fn hide_polygon(&mut self);

    /// Vertex editor for the rendered polygon, if the surface has one.
    fn vertex_editor(&mut self) -> Option<&mut dyn VertexEditor>;
}

/// Surface call as recorded by [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Center {
        center: GeoPoint,
        zoom: u8,
        transition: Duration,
    },
    Show(Polygon),
    Hide,
}

#[derive(Debug, Default)]
struct HeadlessEditor {
    active: bool,
}

impl VertexEditor for HeadlessEditor {
    fn start_editing(&mut self) {
        self.active = true;
    }

    fn stop_editing(&mut self) {
        self.active = false;
    }
}

/// Map surface without a screen.
///
/// Tracks what a real map would show and records every call, which is enough
/// to drive the editing workflow from a terminal or a test.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    center: Option<GeoPoint>,
    polygon: Option<Polygon>,
    editor: Option<HeadlessEditor>,
    ops: Vec<SurfaceOp>,
}

impl HeadlessSurface {
    /// Surface without a vertex editor; editing falls back to click capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface whose rendered polygons expose a vertex editor.
    pub fn with_vertex_editor() -> Self {
        Self {
            editor: Some(HeadlessEditor::default()),
            ..Self::default()
        }
    }

    pub fn center(&self) -> Option<GeoPoint> {
        self.center
    }

    pub fn polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref()
    }

    pub fn is_vertex_editing(&self) -> bool {
        self.editor.as_ref().is_some_and(|e| e.active)
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }
}

impl MapSurface for HeadlessSurface {
    fn set_center(&mut self, center: GeoPoint, zoom: u8, transition: Duration) {
        self.center = Some(center);
        self.ops.push(SurfaceOp::Center {
            center,
            zoom,
            transition,
        });
    }

    fn show_polygon(&mut self, polygon: &Polygon) {
        self.polygon = Some(polygon.clone());
        self.ops.push(SurfaceOp::Show(polygon.clone()));
    }

    fn hide_polygon(&mut self) {
        self.polygon = None;
        if let Some(editor) = self.editor.as_mut() {
            editor.active = false;
        }
        self.ops.push(SurfaceOp::Hide);
    }

    fn vertex_editor(&mut self) -> Option<&mut dyn VertexEditor> {
        self.polygon.as_ref()?;
        self.editor.as_mut().map(|e| e as &mut dyn VertexEditor)
    }
}
