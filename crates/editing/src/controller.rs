use std::sync::Arc;

use geocoding::AddressResolver;
use runtime::metrics::Metrics;
use tracing::{debug, info};

use crate::scheduler::{ResolutionEvent, ResolutionScheduler, SchedulerConfig};
use crate::session::{ApplyOutcome, CommittedGeometry, GeometryEditSession, SessionEvent};
use crate::surface::MapSurface;
use crate::viewport::{MapViewportController, ViewportConfig};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawMapConfig {
    pub scheduler: SchedulerConfig,
    pub viewport: ViewportConfig,
}

/// The map half of the admin form.
///
/// Feeds address changes into the scheduler and applies resolution events to
/// the edit session on the caller's task, so the session itself is never
/// shared across tasks.
pub struct DrawMap<S> {
    session: GeometryEditSession<S>,
    scheduler: ResolutionScheduler,
    address: String,
    min_address_chars: usize,
    metrics: Metrics,
}

impl<S: MapSurface> DrawMap<S> {
    pub fn new(surface: S, resolver: Arc<dyn AddressResolver>, config: DrawMapConfig) -> Self {
        let viewport = MapViewportController::new(config.viewport);
        let session = GeometryEditSession::new(surface, viewport);
        let min_address_chars = config.scheduler.min_address_chars;
        let scheduler =
            ResolutionScheduler::new(config.scheduler, resolver, session.generations());
        Self {
            session,
            scheduler,
            address: String::new(),
            min_address_chars,
            metrics: Metrics::new(),
        }
    }

    pub fn session(&self) -> &GeometryEditSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GeometryEditSession<S> {
        &mut self.session
    }

    pub fn scheduler(&self) -> &ResolutionScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The address field changed.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
        self.scheduler.schedule(&self.address);
    }

    pub fn set_resolve_enabled(&mut self, enabled: bool) {
        self.scheduler.set_enabled(enabled);
    }

    /// `true` while a lookup is debounced or running.
    pub fn is_loading(&self) -> bool {
        !self.scheduler.is_idle()
    }

    /// Whether the form may be submitted.
    pub fn is_ready(&self) -> bool {
        self.address.trim().chars().count() >= self.min_address_chars
            && self.session.geometry().is_usable()
            && !self.is_loading()
    }

    pub fn committed(&self) -> CommittedGeometry {
        self.session.committed()
    }

    /// Takes the session's recorded events.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.session
            .events_mut()
            .drain()
            .into_iter()
            .map(|e| e.payload)
            .collect()
    }

    pub fn handle_event(&mut self, event: &ResolutionEvent) {
        match event {
            ResolutionEvent::Started { .. } => self.metrics.incr("resolve.started"),
            ResolutionEvent::Resolved {
                generation,
                address,
                result,
            } => match self.session.apply_resolved(result, *generation) {
                ApplyOutcome::Applied {
                    geometry_replaced, ..
                } => {
                    self.session.record_resolved_address(address);
                    self.metrics.incr("resolve.applied");
                    info!(
                        outline = geometry_replaced,
                        "applied resolution for {address:?} ({generation})"
                    );
                }
                ApplyOutcome::Stale => {
                    self.metrics.incr("resolve.stale");
                    debug!("stale resolution for {address:?} ({generation})");
                }
            },
            ResolutionEvent::Finished { .. } => self.metrics.incr("resolve.finished"),
        }
        self.metrics
            .set_gauge("resolve.in_flight", self.scheduler.in_flight() as i64);
    }

    /// Applies every event already delivered. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.scheduler.try_next() {
            self.handle_event(&event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next resolution event and applies it.
    pub async fn next_event(&mut self) -> Option<ResolutionEvent> {
        let event = self.scheduler.next().await?;
        self.handle_event(&event);
        Some(event)
    }

    /// Waits until no lookup is debounced or running, applying every event.
    pub async fn settle(&mut self) {
        self.pump();
        while self.is_loading() {
            if self.next_event().await.is_none() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use foundation::geo::{GeoPoint, Polygon};
    use foundation::ids::Generation;
    use geocoding::{
        AddressResolver, BoxFuture, GeocodeMatch, GeometryResolver, MemoryGeocoder,
        MemoryOutlines, ResolutionResult, ResolverConfig,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::{DrawMap, DrawMapConfig};
    use crate::scheduler::SchedulerConfig;
    use crate::session::{EditMode, GeometrySource, SessionEvent};
    use crate::surface::HeadlessSurface;

    fn ring(lat: f64) -> Polygon {
        Polygon::new(vec![
            GeoPoint::new(lat, 84.0),
            GeoPoint::new(lat, 84.001),
            GeoPoint::new(lat + 0.001, 84.001),
            GeoPoint::new(lat + 0.001, 84.0),
        ])
    }

    fn found(lat: f64) -> ResolutionResult {
        ResolutionResult {
            center: Some(GeoPoint::new(lat, 84.0)),
            polygon: Some(ring(lat)),
        }
    }

    /// Resolver whose answers are released by the test.
    #[derive(Default)]
    struct Gated {
        gates: Mutex<HashMap<String, oneshot::Receiver<ResolutionResult>>>,
    }

    impl Gated {
        fn gate(&self, address: &str) -> oneshot::Sender<ResolutionResult> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().insert(address.to_string(), rx);
            tx
        }
    }

    impl AddressResolver for Gated {
        fn resolve(&self, address: &str) -> BoxFuture<'_, ResolutionResult> {
            let gate = self.gates.lock().remove(address);
            Box::pin(async move {
                match gate {
                    Some(rx) => rx.await.unwrap_or_default(),
                    None => ResolutionResult::empty(),
                }
            })
        }
    }

    /// Resolver answering every address with the same result.
    struct Fixed {
        result: ResolutionResult,
        seen: Mutex<Vec<String>>,
    }

    impl Fixed {
        fn new(result: ResolutionResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl AddressResolver for Fixed {
        fn resolve(&self, address: &str) -> BoxFuture<'_, ResolutionResult> {
            self.seen.lock().push(address.to_string());
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    async fn tick() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_newest_address_lands() {
        let resolver = Arc::new(Gated::default());
        let first = resolver.gate("ул. Ленина, 1");
        let second = resolver.gate("ул. Ленина, 2");
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, DrawMapConfig::default());

        map.set_address("ул. Ленина, 1");
        tokio::time::sleep(Duration::from_millis(700)).await;
        map.set_address("ул. Ленина, 2");
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(map.session().generation(), Generation(2));

        let _ = second.send(found(56.2));
        tick().await;
        let _ = first.send(found(56.1));
        tick().await;
        map.settle().await;

        assert_eq!(map.session().geometry(), &ring(56.2));
        assert_eq!(map.session().surface().polygon(), Some(&ring(56.2)));
        assert_eq!(map.session().last_resolved_address(), "ул. Ленина, 2");
        assert_eq!(map.metrics().counter("resolve.applied"), 1);
        assert_eq!(map.metrics().counter("resolve.stale"), 1);
        assert!(!map.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn loading_spans_debounce_and_lookup() {
        let resolver = Arc::new(Gated::default());
        let gate = resolver.gate("Kirova 5");
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, DrawMapConfig::default());
        assert!(!map.is_loading());

        map.set_address("Kirova 5");
        assert!(map.is_loading());
        tokio::time::sleep(Duration::from_millis(700)).await;
        map.pump();
        assert!(map.is_loading());
        assert_eq!(map.metrics().gauge("resolve.in_flight"), Some(1));

        let _ = gate.send(ResolutionResult::empty());
        map.settle().await;
        assert!(!map.is_loading());
        assert_eq!(
            map.metrics().counter("resolve.started"),
            map.metrics().counter("resolve.finished")
        );
        assert_eq!(map.metrics().gauge("resolve.in_flight"), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn short_or_unchanged_address_does_not_resolve() {
        let resolver = Fixed::new(found(56.1));
        let mut map = DrawMap::new(
            HeadlessSurface::new(),
            resolver.clone(),
            DrawMapConfig::default(),
        );

        map.set_address("Len");
        map.settle().await;
        assert!(resolver.seen.lock().is_empty());

        map.set_address("Lenina 1");
        map.settle().await;
        map.set_address("Lenina 1");
        map.settle().await;
        assert_eq!(*resolver.seen.lock(), vec!["Lenina 1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_never_overwrites_drawing() {
        let resolver = Fixed::new(found(56.1));
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, DrawMapConfig::default());

        assert_eq!(map.session_mut().start_edit(), EditMode::Drawing);
        map.session_mut()
            .add_point(GeoPoint::new(56.3, 84.3))
            .expect("drawing");
        map.set_address("Lenina 1");
        map.settle().await;

        assert_eq!(map.session().geometry().len(), 1);
        assert_eq!(map.session().center(), Some(GeoPoint::new(56.1, 84.0)));
        assert_eq!(map.metrics().counter("resolve.applied"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_needs_address_ring_and_quiet() {
        let resolver = Fixed::new(found(56.1));
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, DrawMapConfig::default());
        assert!(!map.is_ready());

        map.set_address("Lenina 1");
        assert!(!map.is_ready());
        map.settle().await;
        assert!(map.is_ready());

        map.set_address("Len");
        assert!(!map.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_resolution_ignores_typing() {
        let resolver = Fixed::new(found(56.1));
        let mut map = DrawMap::new(
            HeadlessSurface::new(),
            resolver.clone(),
            DrawMapConfig::default(),
        );
        map.set_resolve_enabled(false);
        map.set_address("Lenina 1");
        map.settle().await;

        assert!(resolver.seen.lock().is_empty());
        assert!(map.session().geometry().is_empty());
        assert_eq!(map.address(), "Lenina 1");
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_through_outline_fallback() {
        let geocoder = Arc::new(MemoryGeocoder::new());
        geocoder.insert(
            "Lenina 1, Tomsk",
            GeocodeMatch::new(GeoPoint::new(56.47, 84.95)),
        );
        let outlines = Arc::new(MemoryOutlines::new(vec![ring(56.4), ring(56.47)]));
        let resolver = Arc::new(GeometryResolver::new(
            geocoder,
            outlines,
            &ResolverConfig::default(),
        ));
        let mut map = DrawMap::new(
            HeadlessSurface::with_vertex_editor(),
            resolver,
            DrawMapConfig::default(),
        );

        map.set_address("Lenina 1");
        map.settle().await;
        assert_eq!(map.session().geometry(), &ring(56.4));

        assert_eq!(map.session_mut().start_edit(), EditMode::Editing);
        map.session_mut()
            .apply_edited_geometry(ring(56.5).points().to_vec())
            .expect("editing");
        map.session_mut().cancel_edit();

        let committed = map.committed();
        assert_eq!(committed.center, Some(GeoPoint::new(56.47, 84.95)));
        assert_eq!(committed.polygon_coords, Some(ring(56.4)));
        assert!(map.is_ready());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn settle_returns_on_multi_thread_runtime() {
        let resolver = Fixed::new(found(56.1));
        let config = DrawMapConfig {
            scheduler: SchedulerConfig {
                debounce: Duration::ZERO,
                ..SchedulerConfig::default()
            },
            ..DrawMapConfig::default()
        };
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, config);

        let rounds = 300;
        for i in 0..rounds {
            map.set_address(format!("Kirova {i}"));
            tokio::time::timeout(Duration::from_secs(5), map.settle())
                .await
                .expect("settle returns");
            assert!(!map.is_loading());
        }
        assert_eq!(map.metrics().counter("resolve.started"), rounds);
        assert_eq!(map.metrics().counter("resolve.finished"), rounds);
    }

    #[tokio::test(start_paused = true)]
    async fn session_events_are_drained() {
        let resolver = Fixed::new(found(56.1));
        let mut map = DrawMap::new(HeadlessSurface::new(), resolver, DrawMapConfig::default());
        map.set_address("Lenina 1");
        map.settle().await;

        let events = map.take_events();
        assert!(events.contains(&SessionEvent::GeometryChanged {
            source: GeometrySource::Resolved,
            points: 4,
        }));
        assert!(events.contains(&SessionEvent::ResolvedApplied {
            generation: Generation(1),
        }));
        assert!(map.take_events().is_empty());
        assert!(map.session().events().events().is_empty());
    }
}
