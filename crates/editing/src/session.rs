use foundation::geo::{GeoPoint, Polygon};
use foundation::ids::Generation;
use geocoding::ResolutionResult;
use runtime::event_bus::EventBus;
use runtime::generation::GenerationCounter;
use serde::Serialize;
use tracing::{debug, trace};

use crate::surface::MapSurface;
use crate::viewport::MapViewportController;

/// Who is allowed to write geometry right now.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub enum EditMode {
    /// Only auto-resolution and loads change geometry.
    #[default]
    Idle,
    /// Clicks on the map append vertices (no native editor available).
    Drawing,
    /// The surface's vertex editor reports whole-ring edits.
    Editing,
}

/// Immutable copy of a ring kept as a restore point.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySnapshot {
    polygon: Polygon,
}

impl GeometrySnapshot {
    pub fn capture(polygon: &Polygon) -> Self {
        Self {
            polygon: polygon.clone(),
        }
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }
}

/// Origin of a geometry write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometrySource {
    Resolved,
    Freehand,
    VertexEdit,
    Restore,
    Load,
}

/// Traceability record of what the session did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    GeometryChanged {
        source: GeometrySource,
        points: usize,
    },
    ModeChanged {
        from: EditMode,
        to: EditMode,
    },
    ResolvedApplied {
        generation: Generation,
    },
    StaleDiscarded {
        generation: Generation,
        current: Generation,
    },
}

/// What [`GeometryEditSession::apply_resolved`] did with a result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        recentered: bool,
        geometry_replaced: bool,
    },
    /// A newer attempt started after this one; the result was dropped.
    Stale,
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    NotDrawing { mode: EditMode },
    NotEditing { mode: EditMode },
    NonFiniteCoordinate,
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::NotDrawing { mode } => {
                write!(f, "points can only be added while drawing (mode: {mode:?})")
            }
            EditError::NotEditing { mode } => {
                write!(f, "vertex edits are only accepted while editing (mode: {mode:?})")
            }
            EditError::NonFiniteCoordinate => write!(f, "coordinates must be finite"),
        }
    }
}

impl std::error::Error for EditError {}

/// Geometry handed to the form on submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedGeometry {
    pub center: Option<GeoPoint>,
    /// Present only when the ring is usable.
    pub polygon_coords: Option<Polygon>,
}

/// Authoritative geometry state of one form.
///
/// Three writers feed it: generation-guarded auto-resolution, click-to-add
/// drawing and vertex edits from the surface. Every write replaces the ring
/// wholesale, so snapshots taken earlier stay intact.
///
/// Snapshot rules:
/// - `last_usable` follows every usable ring that lands while idle (resolved,
///   loaded, restored or committed by `stop_edit`).
/// - `restore_point` is taken by `start_edit` and is what `cancel_edit` rolls
///   back to. Any usable ring committed while idle supersedes it.
pub struct GeometryEditSession<S> {
    surface: S,
    viewport: MapViewportController,
    geometry: Polygon,
    center: Option<GeoPoint>,
    mode: EditMode,
    last_resolved_address: String,
    generations: GenerationCounter,
    restore_point: Option<GeometrySnapshot>,
    last_usable: Option<GeometrySnapshot>,
    events: EventBus<SessionEvent>,
}

impl<S: MapSurface> GeometryEditSession<S> {
    pub fn new(surface: S, viewport: MapViewportController) -> Self {
        Self {
            surface,
            viewport,
            geometry: Polygon::empty(),
            center: None,
            mode: EditMode::Idle,
            last_resolved_address: String::new(),
            generations: GenerationCounter::new(),
            restore_point: None,
            last_usable: None,
            events: EventBus::new(),
        }
    }

    pub fn geometry(&self) -> &Polygon {
        &self.geometry
    }

    pub fn center(&self) -> Option<GeoPoint> {
        self.center
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn last_resolved_address(&self) -> &str {
        &self.last_resolved_address
    }

    pub fn generation(&self) -> Generation {
        self.generations.current()
    }

    /// Handle for whoever starts resolution attempts.
    pub fn generations(&self) -> GenerationCounter {
        self.generations.clone()
    }

    pub fn restore_point(&self) -> Option<&GeometrySnapshot> {
        self.restore_point.as_ref()
    }

    pub fn last_usable(&self) -> Option<&GeometrySnapshot> {
        self.last_usable.as_ref()
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<SessionEvent> {
        &mut self.events
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn viewport(&self) -> &MapViewportController {
        &self.viewport
    }

    /// Where the map should open for this form.
    pub fn initial_center(&self) -> GeoPoint {
        self.viewport.initial_center(self.center, &self.geometry)
    }

    /// Seeds the session from an existing catalog entry.
    pub fn load(&mut self, center: Option<GeoPoint>, polygon: Polygon) {
        self.leave_edit_mode();
        self.restore_point = None;
        self.center = center;
        self.replace_geometry(polygon, GeometrySource::Load);
        self.viewport.center_on(&mut self.surface, center);
    }

    /// Clears the form. The generation counter keeps counting.
    pub fn reset(&mut self) {
        self.leave_edit_mode();
        self.restore_point = None;
        self.last_usable = None;
        self.center = None;
        self.last_resolved_address.clear();
        self.replace_geometry(Polygon::empty(), GeometrySource::Load);
    }

    pub(crate) fn record_resolved_address(&mut self, address: &str) {
        self.last_resolved_address = address.to_string();
    }

    /// Applies the result of the resolution attempt tagged `request`.
    ///
    /// Results from superseded attempts are dropped silently. A usable polygon
    /// replaces the geometry only while idle; manual drawing is never
    /// overwritten by a lookup.
    pub fn apply_resolved(
        &mut self,
        result: &ResolutionResult,
        request: Generation,
    ) -> ApplyOutcome {
        let current = self.generations.current();
        if request != current {
            trace!("dropping stale resolution {request} (current {current})");
            self.events.emit(SessionEvent::StaleDiscarded {
                generation: request,
                current,
            });
            return ApplyOutcome::Stale;
        }

        let recentered = self.viewport.center_on(&mut self.surface, result.center);
        if recentered {
            self.center = result.center;
        }

        let mut geometry_replaced = false;
        if let Some(polygon) = result.usable_polygon() {
            if self.mode == EditMode::Idle {
                geometry_replaced =
                    self.replace_geometry(polygon.clone(), GeometrySource::Resolved);
            } else {
                debug!(
                    "keeping manual geometry, resolved outline ignored in {:?}",
                    self.mode
                );
            }
        }

        self.events
            .emit(SessionEvent::ResolvedApplied { generation: request });
        ApplyOutcome::Applied {
            recentered,
            geometry_replaced,
        }
    }

    /// Appends a vertex while drawing.
    pub fn add_point(&mut self, point: GeoPoint) -> Result<(), EditError> {
        if self.mode != EditMode::Drawing {
            return Err(EditError::NotDrawing { mode: self.mode });
        }
        if !point.is_finite() {
            return Err(EditError::NonFiniteCoordinate);
        }
        let next = self.geometry.with_point(point);
        self.replace_geometry(next, GeometrySource::Freehand);
        Ok(())
    }

    /// Takes a whole-ring edit from the vertex editor.
    ///
    /// Returns `Ok(false)` when the ring equals the current geometry, so no-op
    /// change events from the surface don't re-render anything.
    pub fn apply_edited_geometry(&mut self, points: Vec<GeoPoint>) -> Result<bool, EditError> {
        if self.mode != EditMode::Editing {
            return Err(EditError::NotEditing { mode: self.mode });
        }
        let next = Polygon::new(points);
        if !next.is_finite() {
            return Err(EditError::NonFiniteCoordinate);
        }
        Ok(self.replace_geometry(next, GeometrySource::VertexEdit))
    }

    /// Enters edit mode and takes the restore point.
    ///
    /// The surface's vertex editor is used when it has one; otherwise the
    /// session falls back to click-to-add drawing. The choice holds until the
    /// session returns to idle. Calling this while already editing is a no-op.
    pub fn start_edit(&mut self) -> EditMode {
        if self.mode != EditMode::Idle {
            return self.mode;
        }

        self.restore_point = if self.geometry.is_usable() {
            Some(GeometrySnapshot::capture(&self.geometry))
        } else {
            self.last_usable.clone()
        };

        let next = match self.surface.vertex_editor() {
            Some(editor) => {
                editor.start_editing();
                EditMode::Editing
            }
            None => EditMode::Drawing,
        };
        self.set_mode(next);
        next
    }

    /// Leaves edit mode keeping the current geometry.
    pub fn stop_edit(&mut self) {
        self.leave_edit_mode();
        self.restore_point = None;
        if self.geometry.is_usable() {
            self.last_usable = Some(GeometrySnapshot::capture(&self.geometry));
        }
    }

    /// Leaves edit mode and rolls back to the restore point.
    ///
    /// Falls back to the last usable ring, and to an empty ring when there is
    /// nothing to restore.
    pub fn cancel_edit(&mut self) {
        self.leave_edit_mode();
        let restored = self
            .restore_point
            .as_ref()
            .or(self.last_usable.as_ref())
            .map(|s| s.polygon().clone())
            .unwrap_or_default();
        self.replace_geometry(restored, GeometrySource::Restore);
    }

    /// Geometry for submission.
    pub fn committed(&self) -> CommittedGeometry {
        CommittedGeometry {
            center: self.center.or_else(|| self.geometry.first()),
            polygon_coords: self
                .geometry
                .is_usable()
                .then(|| self.geometry.clone()),
        }
    }

    fn leave_edit_mode(&mut self) {
        if self.mode == EditMode::Editing {
            if let Some(editor) = self.surface.vertex_editor() {
                editor.stop_editing();
            }
        }
        self.set_mode(EditMode::Idle);
    }

    fn set_mode(&mut self, to: EditMode) {
        if self.mode == to {
            return;
        }
        self.events.emit(SessionEvent::ModeChanged {
            from: self.mode,
            to,
        });
        self.mode = to;
    }

    /// Swaps in `next` and re-renders. Returns `false` if nothing changed.
    fn replace_geometry(&mut self, next: Polygon, source: GeometrySource) -> bool {
        if next == self.geometry {
            return false;
        }
        self.geometry = next;

        if self.center.is_none() {
            self.center = self.geometry.first();
        }
        if self.geometry.is_usable() {
            self.surface.show_polygon(&self.geometry);
            if self.mode == EditMode::Idle {
                self.last_usable = Some(GeometrySnapshot::capture(&self.geometry));
                self.restore_point = None;
            }
        } else {
            self.surface.hide_polygon();
        }

        self.events.emit(SessionEvent::GeometryChanged {
            source,
            points: self.geometry.len(),
        });
        true
    }
}
