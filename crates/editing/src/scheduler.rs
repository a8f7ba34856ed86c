use std::sync::Arc;
use std::time::Duration;

use foundation::ids::Generation;
use geocoding::{AddressResolver, ResolutionResult};
use parking_lot::Mutex;
use runtime::debounce::Debouncer;
use runtime::generation::GenerationCounter;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Quiet period after the last keystroke before resolving.
    pub debounce: Duration,
    /// Addresses shorter than this (trimmed, in characters) are not resolved.
    pub min_address_chars: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(600),
            min_address_chars: 5,
        }
    }
}

/// Lifecycle of one resolution attempt.
///
/// Every `Started` is followed by exactly one `Finished` with the same
/// generation, whatever the lookup outcome. `Resolved` sits in between.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    Started {
        generation: Generation,
        address: String,
        /// Which armed timer fired.
        ticket: u64,
    },
    Resolved {
        generation: Generation,
        address: String,
        result: ResolutionResult,
    },
    Finished {
        generation: Generation,
    },
}

impl ResolutionEvent {
    pub fn generation(&self) -> Generation {
        match self {
            ResolutionEvent::Started { generation, .. }
            | ResolutionEvent::Resolved { generation, .. }
            | ResolutionEvent::Finished { generation } => *generation,
        }
    }
}

/// Turns address keystrokes into debounced resolution attempts.
///
/// Each attempt advances the session's generation when its timer fires, so a
/// result can later be matched against the newest attempt. Attempts are never
/// aborted once started; superseded ones simply report a stale generation.
///
/// Pending and in-flight state is derived from the events handed out by
/// [`try_next`](Self::try_next) and [`next`](Self::next), never from the timer
/// or resolver tasks.
pub struct ResolutionScheduler {
    config: SchedulerConfig,
    resolver: Arc<dyn AddressResolver>,
    generations: GenerationCounter,
    tx: mpsc::UnboundedSender<ResolutionEvent>,
    rx: mpsc::UnboundedReceiver<ResolutionEvent>,
    debounce: Debouncer,
    last_triggered: Arc<Mutex<String>>,
    next_ticket: u64,
    armed: Option<u64>,
    in_flight: usize,
    enabled: bool,
}

impl ResolutionScheduler {
    pub fn new(
        config: SchedulerConfig,
        resolver: Arc<dyn AddressResolver>,
        generations: GenerationCounter,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let debounce = Debouncer::new(config.debounce);
        Self {
            config,
            resolver,
            generations,
            tx,
            rx,
            debounce,
            last_triggered: Arc::new(Mutex::new(String::new())),
            next_ticket: 0,
            armed: None,
            in_flight: 0,
            enabled: true,
        }
    }

    /// Disabling stops new schedules but leaves an armed timer alone.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Address of the most recent attempt whose timer fired.
    pub fn last_triggered(&self) -> String {
        self.last_triggered.lock().clone()
    }

    /// `true` from arming a timer until its `Started` has been delivered.
    pub fn is_pending(&self) -> bool {
        self.armed.is_some()
    }

    /// Delivered `Started` events without their `Finished` yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        !self.is_pending() && self.in_flight == 0
    }

    /// Next lifecycle event if one has already arrived.
    pub fn try_next(&mut self) -> Option<ResolutionEvent> {
        let event = self.rx.try_recv().ok()?;
        self.observe(&event);
        Some(event)
    }

    /// Waits for the next lifecycle event. Cancel safe.
    pub async fn next(&mut self) -> Option<ResolutionEvent> {
        let event = self.rx.recv().await?;
        self.observe(&event);
        Some(event)
    }

    fn observe(&mut self, event: &ResolutionEvent) {
        match event {
            ResolutionEvent::Started { ticket, .. } => {
                if self.armed == Some(*ticket) {
                    self.armed = None;
                }
                self.in_flight += 1;
            }
            ResolutionEvent::Resolved { .. } => {}
            ResolutionEvent::Finished { .. } => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
        }
    }

    /// Call on every address change. Returns `true` if a timer was armed.
    ///
    /// Text equal to the last triggered address, or too short to resolve,
    /// cancels any armed timer: the newest text needs no lookup.
    pub fn schedule(&mut self, address: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let too_short = address.trim().chars().count() < self.config.min_address_chars;
        if too_short || *self.last_triggered.lock() == address {
            // A timer that fired just before the cancel still reports
            // `Started`, which then counts as in flight.
            self.armed = None;
            if self.debounce.cancel() {
                debug!("pending resolution superseded by {address:?}");
            }
            return false;
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.armed = Some(ticket);

        let address = address.to_string();
        let resolver = Arc::clone(&self.resolver);
        let generations = self.generations.clone();
        let events = self.tx.clone();
        let last_triggered = Arc::clone(&self.last_triggered);

        self.debounce.schedule(move || {
            *last_triggered.lock() = address.clone();
            let generation = generations.advance();
            info!("resolving {address:?} ({generation})");
            let _ = events.send(ResolutionEvent::Started {
                generation,
                address: address.clone(),
                ticket,
            });

            let finish = FinishGuard {
                generation,
                events: events.clone(),
            };
            async move {
                let result = resolver.resolve(&address).await;
                let _ = events.send(ResolutionEvent::Resolved {
                    generation,
                    address,
                    result,
                });
                drop(finish);
            }
        });
        true
    }
}

/// Emits `Finished` when the attempt ends, including by unwinding.
struct FinishGuard {
    generation: Generation,
    events: mpsc::UnboundedSender<ResolutionEvent>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let _ = self.events.send(ResolutionEvent::Finished {
            generation: self.generation,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use foundation::geo::GeoPoint;
    use foundation::ids::Generation;
    use geocoding::{AddressResolver, BoxFuture, ResolutionResult};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use runtime::generation::GenerationCounter;

    use super::{ResolutionEvent, ResolutionScheduler, SchedulerConfig};

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl AddressResolver for Recording {
        fn resolve(&self, address: &str) -> BoxFuture<'_, ResolutionResult> {
            self.seen.lock().push(address.to_string());
            Box::pin(async {
                ResolutionResult {
                    center: Some(GeoPoint::new(56.48, 84.97)),
                    polygon: None,
                }
            })
        }
    }

    fn scheduler() -> (ResolutionScheduler, Arc<Recording>) {
        let resolver = Arc::new(Recording::default());
        let s = ResolutionScheduler::new(
            SchedulerConfig::default(),
            resolver.clone(),
            GenerationCounter::new(),
        );
        (s, resolver)
    }

    fn drain(s: &mut ResolutionScheduler) -> Vec<ResolutionEvent> {
        let mut out = Vec::new();
        while let Some(ev) = s.try_next() {
            out.push(ev);
        }
        out
    }

    async fn past_debounce() {
        tokio::time::sleep(Duration::from_millis(700)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn short_addresses_never_resolve() {
        let (mut s, resolver) = scheduler();
        for text in ["", "    ", "Len", "  Lena  ", "абвг"] {
            assert!(!s.schedule(text));
        }
        past_debounce().await;
        assert!(resolver.seen.lock().is_empty());
        assert!(drain(&mut s).is_empty());
        assert!(s.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_within_window_collapse_to_last() {
        let (mut s, resolver) = scheduler();
        s.schedule("Lenina 1");
        tokio::time::sleep(Duration::from_millis(300)).await;
        s.schedule("Lenina 12");
        tokio::time::sleep(Duration::from_millis(300)).await;
        s.schedule("Lenina 123");
        past_debounce().await;

        assert_eq!(*resolver.seen.lock(), vec!["Lenina 123".to_string()]);
        assert_eq!(s.last_triggered(), "Lenina 123");
        assert_eq!(drain(&mut s).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_is_symmetric_and_ordered() {
        let (mut s, _) = scheduler();
        assert!(s.schedule("Kirova 5"));
        assert!(s.is_pending());
        past_debounce().await;
        // Nothing delivered yet, so the timer still counts as pending.
        assert!(s.is_pending());

        let events = drain(&mut s);
        assert_eq!(
            events,
            vec![
                ResolutionEvent::Started {
                    generation: Generation(1),
                    address: "Kirova 5".to_string(),
                    ticket: 1,
                },
                ResolutionEvent::Resolved {
                    generation: Generation(1),
                    address: "Kirova 5".to_string(),
                    result: ResolutionResult {
                        center: Some(GeoPoint::new(56.48, 84.97)),
                        polygon: None,
                    },
                },
                ResolutionEvent::Finished {
                    generation: Generation(1)
                },
            ]
        );
        assert!(s.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_follows_delivered_events() {
        let (mut s, _) = scheduler();
        s.schedule("Kirova 5");
        past_debounce().await;

        assert!(matches!(s.try_next(), Some(ResolutionEvent::Started { .. })));
        assert!(!s.is_pending());
        assert_eq!(s.in_flight(), 1);
        assert!(matches!(s.try_next(), Some(ResolutionEvent::Resolved { .. })));
        assert_eq!(s.in_flight(), 1);
        assert!(matches!(s.try_next(), Some(ResolutionEvent::Finished { .. })));
        assert_eq!(s.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn started_from_superseded_timer_keeps_newer_one_pending() {
        let (mut s, _) = scheduler();
        s.schedule("Kirova 5");
        past_debounce().await;
        // First timer fired, its events are still queued.
        s.schedule("Kirova 7");

        drain(&mut s);
        assert!(s.is_pending());
        assert_eq!(s.in_flight(), 0);

        past_debounce().await;
        assert_eq!(drain(&mut s).len(), 3);
        assert!(s.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_address_is_not_resolved_again() {
        let (mut s, resolver) = scheduler();
        s.schedule("Kirova 5");
        past_debounce().await;
        assert!(!s.schedule("Kirova 5"));
        past_debounce().await;
        assert!(s.schedule("Kirova 5 "));
        past_debounce().await;

        assert_eq!(
            *resolver.seen.lock(),
            vec!["Kirova 5".to_string(), "Kirova 5 ".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_to_short_text_cancels_armed_timer() {
        let (mut s, resolver) = scheduler();
        s.schedule("Kirova 5");
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.schedule("Kir");
        assert!(!s.is_pending());
        past_debounce().await;
        assert!(resolver.seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_keeps_armed_timer() {
        let (mut s, resolver) = scheduler();
        s.schedule("Kirova 5");
        s.set_enabled(false);
        assert!(!s.schedule("Kirova 7"));
        assert!(s.is_pending());
        past_debounce().await;
        assert_eq!(*resolver.seen.lock(), vec!["Kirova 5".to_string()]);

        s.set_enabled(true);
        assert!(s.schedule("Kirova 7"));
    }
}
