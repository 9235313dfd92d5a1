//! A player's session: the single owner of the RNG cursor, the engine,
//! the ledger and every timer.
//!
//! Nothing here blocks or sleeps. Requests return immediately and
//! scheduled work (spin resolution, autoplay ticks, debounced saves) runs
//! when the owner calls `poll` at or after its deadline. Observers see
//! every outcome synchronously, in order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rnglab_core::clock::Clock;
use rnglab_core::error::StorageError;
use rnglab_core::rng::RandomSource;
use rnglab_core::storage::Storage;
use rnglab_core::timer::{Due, TimerQueue, TimerToken};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::autoplay::{AutoplayScheduler, AutoplayToken, TickOutcome, after};
use super::export::ExportSnapshot;
use super::persistence::HistoryStore;
use super::settings::SessionSettings;
use crate::domain::config::SpinConfiguration;
use crate::domain::events::{SessionEvent, SessionObserver};
use crate::domain::ledger::HistoryLedger;
use crate::domain::seed::{SeedState, SeededRandomSource};
use crate::domain::spin::{SpinEngine, SpinPhase, SpinResult, SpinTicket};
use crate::domain::stats::{self, Stats};

/// Work a session schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionTimer {
    /// Reveal the trial with this ticket.
    Resolve(SpinTicket),
    /// Autoplay tick for this generation.
    AutoplayTick(AutoplayToken),
    /// Write the ledger.
    Persist,
}

/// The outcome engine as seen by a UI or driver.
pub struct GameSession {
    id: Uuid,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    store: HistoryStore,
    config: SpinConfiguration,
    seed: SeedState,
    rng: Box<dyn RandomSource>,
    engine: SpinEngine,
    ledger: HistoryLedger,
    autoplay: AutoplayScheduler,
    timers: TimerQueue<SessionTimer>,
    persist_timer: Option<TimerToken>,
    dirty: bool,
    closed: bool,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("phase", &self.engine.phase())
            .field("history", &self.ledger.len())
            .field("autoplay", &self.autoplay.interval())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Opens a session, restoring any history persisted in `storage`.
    /// Starts unseeded with the default configuration.
    #[must_use]
    pub fn new(settings: SessionSettings, clock: Arc<dyn Clock>, storage: Arc<dyn Storage>) -> Self {
        let store = HistoryStore::new(storage, &settings);
        let ledger = store.load(settings.history_capacity);
        let seed = SeedState::unseeded();
        let id = Uuid::new_v4();
        info!(session_id = %id, restored = ledger.len(), "session opened");

        Self {
            id,
            engine: SpinEngine::new(settings.latency_window()),
            rng: Box::new(SeededRandomSource::from_seed(&seed)),
            settings,
            clock,
            store,
            config: SpinConfiguration::default(),
            seed,
            ledger,
            autoplay: AutoplayScheduler::new(),
            timers: TimerQueue::new(),
            persist_timer: None,
            dirty: false,
            closed: false,
            observers: Vec::new(),
        }
    }

    /// Replaces the RNG cursor. The next `set_seed` with a different seed
    /// replaces it again.
    #[must_use]
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Session identifier, used in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Settings the session was opened with.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Configuration the next trial will be played with.
    #[must_use]
    pub fn configuration(&self) -> SpinConfiguration {
        self.config
    }

    /// Seed currently in effect.
    #[must_use]
    pub fn seed(&self) -> &SeedState {
        &self.seed
    }

    /// Engine phase.
    #[must_use]
    pub fn phase(&self) -> SpinPhase {
        self.engine.phase()
    }

    /// Whether a trial is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.engine.is_pending()
    }

    /// Most recent result, if any.
    #[must_use]
    pub fn last_result(&self) -> Option<&SpinResult> {
        self.ledger.latest()
    }

    /// The ledger, newest first.
    #[must_use]
    pub fn history(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Statistics over the whole ledger, computed now.
    #[must_use]
    pub fn stats(&self) -> Stats {
        stats::compute(self.ledger.iter())
    }

    /// Whether autoplay is running.
    #[must_use]
    pub fn autoplay_active(&self) -> bool {
        self.autoplay.is_active()
    }

    /// Interval of the running autoplay.
    #[must_use]
    pub fn autoplay_interval(&self) -> Option<Duration> {
        self.autoplay.interval()
    }

    /// Whether `teardown` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the ledger has changes not yet written to storage.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Earliest time `poll` has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// The clock driving this session.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Registers an observer for every future event.
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // --- configuration ---

    /// Applies a new configuration. A running autoplay restarts against it.
    pub fn configure(&mut self, config: SpinConfiguration) -> SpinConfiguration {
        if config != self.config {
            self.config = config;
            debug!(session_id = %self.id, ?config, "configuration changed");
            self.restart_autoplay();
        }
        self.config
    }

    /// Sets the outcome count, clamped to `2..=12`.
    pub fn set_num_outcomes(&mut self, num_outcomes: i64) -> SpinConfiguration {
        self.configure(self.config.with_num_outcomes(num_outcomes))
    }

    /// Sets the wager, floored at 1.
    pub fn set_bet_amount(&mut self, bet_amount: i64) -> SpinConfiguration {
        self.configure(self.config.with_bet_amount(bet_amount))
    }

    /// Sets the payout multiplier, clamped to `1..=20`.
    pub fn set_payout_multiplier(&mut self, payout_multiplier: i64) -> SpinConfiguration {
        self.configure(self.config.with_payout_multiplier(payout_multiplier))
    }

    /// Changes the seed. A different seed restarts the random sequence and
    /// any running autoplay; the same seed changes nothing.
    pub fn set_seed(&mut self, raw: impl Into<String>) {
        let seed = SeedState::new(raw);
        if seed == self.seed {
            return;
        }
        self.rng = Box::new(SeededRandomSource::from_seed(&seed));
        info!(session_id = %self.id, seeded = seed.is_seeded(), "seed changed");
        self.seed = seed;
        self.restart_autoplay();
    }

    // --- trials ---

    /// Requests a trial. Returns `None` (and emits `SpinRejected`) while
    /// another trial is pending, and `None` silently once torn down.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn request_spin(&mut self) -> Option<SpinTicket> {
        if self.closed {
            debug!(session_id = %self.id, "spin requested after teardown");
            return None;
        }
        let now = self.clock.now();
        self.request_spin_at(now, false)
    }

    fn request_spin_at(&mut self, at: DateTime<Utc>, autoplay: bool) -> Option<SpinTicket> {
        let Some(request) = self
            .engine
            .request_spin(self.config, &self.seed, self.rng.as_mut(), at)
        else {
            if !autoplay {
                self.emit(&SessionEvent::SpinRejected);
            }
            return None;
        };

        self.timers
            .schedule(request.resolves_at, SessionTimer::Resolve(request.ticket));
        self.emit(&SessionEvent::SpinRequested {
            ticket: request.ticket,
            resolves_at: request.resolves_at,
            autoplay,
        });
        Some(request.ticket)
    }

    // --- autoplay ---

    /// Starts (or restarts) autoplay at `interval`. A zero interval means
    /// "off" and stops autoplay instead. Does nothing once torn down.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start_autoplay(&mut self, interval: Duration) -> Option<AutoplayToken> {
        if self.closed {
            debug!(session_id = %self.id, "autoplay requested after teardown");
            return None;
        }
        if interval.is_zero() {
            self.stop_autoplay();
            return None;
        }
        let now = self.clock.now();
        let token = self.autoplay.start(&mut self.timers, interval, now);
        self.emit_autoplay_started();
        Some(token)
    }

    /// Stops autoplay. No autoplay trial is requested after this returns.
    pub fn stop_autoplay(&mut self) -> bool {
        let stopped = self.autoplay.stop(&mut self.timers);
        if stopped {
            info!(session_id = %self.id, "autoplay stopped");
            self.emit(&SessionEvent::AutoplayStopped);
        }
        stopped
    }

    /// Stops autoplay if running, else starts it at the default interval.
    pub fn toggle_autoplay(&mut self) -> bool {
        if self.autoplay.is_active() {
            self.stop_autoplay();
            false
        } else {
            self.start_autoplay(self.settings.autoplay_interval()).is_some()
        }
    }

    fn restart_autoplay(&mut self) {
        let now = self.clock.now();
        if self.autoplay.restart(&mut self.timers, now).is_some() {
            self.emit_autoplay_started();
        }
    }

    fn emit_autoplay_started(&mut self) {
        let interval_ms = self
            .autoplay
            .interval()
            .map_or(0, |interval| u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        info!(session_id = %self.id, interval_ms, "autoplay started");
        self.emit(&SessionEvent::AutoplayStarted { interval_ms });
    }

    // --- timers ---

    /// Runs every callback due by now, in deadline order. Returns how many
    /// ran.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(due) = self.timers.pop_due(now) {
            self.handle(due);
            fired += 1;
        }
        fired
    }

    fn handle(&mut self, due: Due<SessionTimer>) {
        match due.payload {
            SessionTimer::Resolve(ticket) => self.resolve(ticket, due.deadline),
            SessionTimer::AutoplayTick(token) => {
                let busy = self.engine.is_pending();
                match self
                    .autoplay
                    .on_tick(&mut self.timers, token, due.deadline, busy)
                {
                    TickOutcome::Fire => {
                        self.request_spin_at(due.deadline, true);
                    }
                    TickOutcome::Dropped => self.emit(&SessionEvent::AutoplayTickDropped),
                    TickOutcome::Stale => {}
                }
            }
            SessionTimer::Persist => {
                self.persist_timer = None;
                if let Err(e) = self.flush() {
                    debug!(session_id = %self.id, error = %e, "debounced save deferred");
                }
            }
        }
    }

    fn resolve(&mut self, ticket: SpinTicket, at: DateTime<Utc>) {
        let Some(result) = self.engine.resolve(ticket, at) else {
            return;
        };
        info!(
            session_id = %self.id,
            %ticket,
            roll = result.roll,
            win = result.win,
            payout = result.payout,
            "spin resolved"
        );
        self.ledger.record(result.clone());
        self.mark_dirty(at);
        self.emit(&SessionEvent::SpinResolved(result));
    }

    // --- persistence ---

    fn mark_dirty(&mut self, at: DateTime<Utc>) {
        self.dirty = true;
        if self.persist_timer.is_none() {
            let deadline = after(at, self.settings.persist_debounce());
            self.persist_timer = Some(self.timers.schedule(deadline, SessionTimer::Persist));
        }
    }

    /// Writes the ledger now if it has unsaved changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails; the ledger stays dirty.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if let Some(timer) = self.persist_timer.take() {
            self.timers.cancel(timer);
        }
        if !self.dirty {
            return Ok(());
        }
        match self.store.save(&self.ledger) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "history save failed");
                Err(e)
            }
        }
    }

    /// Empties the ledger and drops the persisted blob. A trial already in
    /// flight still resolves into the emptied ledger.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn clear_history(&mut self) -> usize {
        let dropped = self.ledger.clear();
        if let Some(timer) = self.persist_timer.take() {
            self.timers.cancel(timer);
        }
        self.dirty = false;
        if let Err(e) = self.store.remove() {
            warn!(session_id = %self.id, error = %e, "history removal failed");
        }
        info!(session_id = %self.id, dropped, "history cleared");
        self.emit(&SessionEvent::HistoryCleared { dropped });
        dropped
    }

    // --- export ---

    /// Snapshot of the ledger and current outcome count.
    #[must_use]
    pub fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot::capture(&self.ledger, &self.config)
    }

    /// Captures a snapshot and writes it under the export key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn export(&mut self) -> Result<ExportSnapshot, StorageError> {
        let snapshot = self.export_snapshot();
        self.store.save_export(&snapshot)?;
        info!(session_id = %self.id, entries = snapshot.history.len(), "history exported");
        Ok(snapshot)
    }

    // --- teardown ---

    /// Destroys the session's scheduled work: stops autoplay, discards any
    /// in-flight trial without recording it, cancels every timer and
    /// flushes the ledger. Later spin and autoplay requests are ignored, so
    /// `poll` never fires again.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn teardown(&mut self) {
        self.closed = true;
        self.stop_autoplay();
        if let Some(ticket) = self.engine.abandon() {
            debug!(session_id = %self.id, %ticket, "abandoned in-flight spin");
        }
        self.timers.clear();
        self.persist_timer = None;
        if let Err(e) = self.flush() {
            debug!(session_id = %self.id, error = %e, "final save failed");
        }
        info!(session_id = %self.id, "session closed");
    }

    fn emit(&mut self, event: &SessionEvent) {
        debug!(session_id = %self.id, event_type = event.event_type(), "session event");
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rnglab_core::storage::MemoryStorage;
    use rnglab_test_support::{
        FailingStorage, ManualClock, MockRng, RecordingStorage, SequenceRng, StorageOp,
    };

    use super::*;

    const WIN6: f64 = 0.95;
    const LOSE: f64 = 0.0;

    struct Harness {
        clock: Arc<ManualClock>,
        storage: Arc<RecordingStorage>,
        events: Arc<Mutex<Vec<SessionEvent>>>,
        session: GameSession,
    }

    impl Harness {
        fn new(settings: SessionSettings, storage: RecordingStorage) -> Self {
            let clock = Arc::new(ManualClock::at_epoch());
            let storage = Arc::new(storage);
            let events = Arc::new(Mutex::new(Vec::new()));
            let mut session = GameSession::new(settings, clock.clone(), storage.clone());
            let sink = events.clone();
            session.subscribe(move |event: &SessionEvent| sink.lock().unwrap().push(event.clone()));
            Self {
                clock,
                storage,
                events,
                session,
            }
        }

        fn with_rng(rng: impl RandomSource + 'static) -> Self {
            let mut harness = Self::new(SessionSettings::default(), RecordingStorage::new());
            harness.session.rng = Box::new(rng);
            harness
        }

        fn advance(&mut self, millis: i64) -> usize {
            self.clock.advance_ms(millis);
            self.session.poll()
        }

        fn event_types(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(SessionEvent::event_type)
                .collect()
        }

        fn rolls(&self) -> Vec<u32> {
            self.session.history().iter().map(|r| r.roll).collect()
        }
    }

    // --- trial lifecycle tests ---

    #[test]
    fn test_spin_resolves_after_latency_and_records_result() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, WIN6)]));

        let ticket = h.session.request_spin();

        assert!(ticket.is_some());
        assert_eq!(h.session.phase(), SpinPhase::Pending);
        assert_eq!(h.advance(899), 0);
        assert!(h.session.history().is_empty());

        assert_eq!(h.advance(1), 1);
        let result = h.session.last_result().unwrap().clone();
        assert_eq!(result.roll, 6);
        assert!(result.win);
        assert_eq!(result.payout, 50);
        assert_eq!(result.timestamp, h.clock.now());
        assert_eq!(h.session.phase(), SpinPhase::Resolved);
        assert_eq!(h.event_types(), vec!["spin.requested", "spin.resolved"]);
    }

    #[test]
    fn test_second_request_while_pending_records_one_entry() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, LOSE)]));

        let first = h.session.request_spin();
        let second = h.session.request_spin();
        h.advance(2_000);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(h.session.history().len(), 1);
        assert_eq!(
            h.event_types(),
            vec!["spin.requested", "spin.rejected", "spin.resolved"]
        );
    }

    #[test]
    fn test_configuration_change_does_not_touch_in_flight_trial() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, WIN6)]));
        h.session.request_spin();

        h.session.set_num_outcomes(12);
        h.session.set_bet_amount(99);
        h.advance(900);

        let result = h.session.last_result().unwrap();
        assert_eq!(result.roll, 6);
        assert!(result.win);
        assert_eq!(result.bet, 10);
        assert_eq!(result.config_snapshot.num_outcomes, 6);
        assert_eq!(h.session.configuration().num_outcomes(), 12);
    }

    #[test]
    fn test_configuration_is_clamped() {
        let mut h = Harness::with_rng(MockRng);

        assert_eq!(h.session.set_num_outcomes(50).num_outcomes(), 12);
        assert_eq!(h.session.set_bet_amount(-5).bet_amount(), 1);
        assert_eq!(h.session.set_payout_multiplier(0).payout_multiplier(), 1);
    }

    #[test]
    fn test_seeded_sessions_produce_identical_rolls() {
        let play = || {
            let mut h = Harness::new(SessionSettings::default(), RecordingStorage::new());
            h.session.set_seed("abc");
            for _ in 0..5 {
                h.session.request_spin().unwrap();
                h.advance(1_800);
            }
            let mut rolls = h.rolls();
            rolls.reverse();
            rolls
        };

        let first = play();
        let second = play();

        assert_eq!(first, second);
        assert_eq!(first, vec![1, 5, 6, 5, 1]);
    }

    #[test]
    fn test_set_seed_restarts_sequence_only_when_changed() {
        let mut h = Harness::new(SessionSettings::default(), RecordingStorage::new());
        h.session.set_seed("abc");
        h.session.request_spin();
        h.advance(1_800);

        h.session.set_seed("abc");
        h.session.request_spin();
        h.advance(1_800);

        h.session.set_seed("lucky");
        h.session.set_seed("abc");
        h.session.request_spin();
        h.advance(1_800);

        assert_eq!(h.rolls(), vec![1, 5, 1]);
        assert_eq!(h.session.seed().raw(), "abc");
    }

    #[test]
    fn test_stats_follow_the_ledger() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, WIN6), (LOSE, LOSE)]));
        assert_eq!(h.session.stats().roi, None);

        for _ in 0..2 {
            h.session.request_spin();
            h.advance(900);
        }

        let stats = h.session.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.spent, 20);
        assert_eq!(stats.earned, 50);
        assert!((stats.roi.unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ledger_keeps_200_most_recent_trials() {
        let mut h = Harness::with_rng(MockRng);

        for _ in 0..250 {
            h.session.request_spin().unwrap();
            h.advance(900);
        }

        assert_eq!(h.session.history().len(), 200);
        let newest = h.session.last_result().unwrap().timestamp;
        assert_eq!(newest, h.clock.now());
    }

    // --- autoplay tests ---

    #[test]
    fn test_autoplay_requests_trials_on_interval() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, LOSE), (LOSE, WIN6)]));

        h.session.start_autoplay(Duration::from_millis(1_200));
        h.advance(1_200);
        assert!(h.session.is_pending());
        h.advance(900);
        h.advance(300);

        assert_eq!(h.rolls(), vec![1]);
        assert!(h.session.is_pending());
        h.advance(900);
        assert_eq!(h.rolls(), vec![6, 1]);
    }

    #[test]
    fn test_autoplay_tick_while_pending_is_dropped() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, LOSE), (LOSE, LOSE)]));
        h.session.start_autoplay(Duration::from_millis(500));

        h.advance(500); // tick fires, trial resolves at 1400
        h.advance(500); // tick lands while pending
        h.advance(400); // resolves
        h.advance(100); // tick fires again

        assert_eq!(h.session.history().len(), 1);
        assert!(h.session.is_pending());
        assert_eq!(
            h.event_types(),
            vec![
                "autoplay.started",
                "spin.requested",
                "autoplay.tick_dropped",
                "spin.resolved",
                "spin.requested",
            ]
        );
    }

    #[test]
    fn test_configuration_change_restarts_autoplay_timer() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, LOSE)]));
        let old = h.session.start_autoplay(Duration::from_millis(1_000)).unwrap();
        h.advance(600);

        h.session.set_bet_amount(20);

        assert_eq!(
            h.session.next_deadline(),
            Some(h.clock.now() + chrono::Duration::milliseconds(1_000))
        );
        assert_eq!(h.advance(400), 0);
        assert!(!h.session.is_pending());

        h.advance(600);
        assert!(h.session.is_pending());
        h.advance(900);
        assert_eq!(h.session.last_result().unwrap().bet, 20);
        assert_ne!(h.session.autoplay.token(), Some(old));
    }

    #[test]
    fn test_seed_change_restarts_autoplay_timer() {
        let mut h = Harness::with_rng(MockRng);
        h.session.start_autoplay(Duration::from_millis(1_000));
        h.advance(999);

        h.session.set_seed("abc");

        assert_eq!(h.advance(1), 0);
        assert!(!h.session.is_pending());
        assert_eq!(h.event_types(), vec!["autoplay.started", "autoplay.started"]);
    }

    #[test]
    fn test_no_trial_after_stop_autoplay() {
        // An empty sequence panics on any draw.
        let mut h = Harness::with_rng(SequenceRng::new(Vec::new()));
        h.session.start_autoplay(Duration::from_millis(1_200));

        assert!(h.session.stop_autoplay());
        h.advance(10_000);

        assert!(!h.session.autoplay_active());
        assert!(h.session.history().is_empty());
        assert!(!h.session.is_pending());
        assert_eq!(h.session.next_deadline(), None);
        assert_eq!(h.event_types(), vec!["autoplay.started", "autoplay.stopped"]);
    }

    #[test]
    fn test_stop_autoplay_lets_in_flight_trial_resolve() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, WIN6)]));
        h.session.start_autoplay(Duration::from_millis(100));
        h.advance(100);

        h.session.stop_autoplay();
        h.advance(900);

        assert_eq!(h.rolls(), vec![6]);
    }

    #[test]
    fn test_zero_interval_stops_autoplay() {
        let mut h = Harness::with_rng(MockRng);
        h.session.start_autoplay(Duration::from_millis(2_000));

        assert_eq!(h.session.start_autoplay(Duration::ZERO), None);
        assert!(!h.session.autoplay_active());
    }

    #[test]
    fn test_toggle_autoplay_uses_default_interval() {
        let mut h = Harness::with_rng(MockRng);

        assert!(h.session.toggle_autoplay());
        assert_eq!(h.session.autoplay_interval(), Some(Duration::from_millis(1_200)));
        assert!(!h.session.toggle_autoplay());
        assert_eq!(h.session.autoplay_interval(), None);
    }

    // --- persistence tests ---

    #[test]
    fn test_resolutions_within_debounce_window_save_once() {
        let settings = SessionSettings {
            persist_debounce_ms: 5_000,
            ..SessionSettings::default()
        };
        let mut h = Harness::new(settings, RecordingStorage::new());
        h.session.rng = Box::new(MockRng);

        for _ in 0..2 {
            h.session.request_spin();
            h.advance(900);
        }
        assert!(h.session.is_dirty());
        assert_eq!(h.storage.save_count("rng_history_v1"), 0);

        h.advance(5_000);

        assert!(!h.session.is_dirty());
        assert_eq!(h.storage.save_count("rng_history_v1"), 1);
        let saved = h.storage.blob("rng_history_v1").unwrap();
        assert_eq!(HistoryLedger::restore(Some(saved.as_str()), 200).len(), 2);
    }

    #[test]
    fn test_new_session_restores_persisted_history() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::at_epoch());
        {
            let mut first = GameSession::new(SessionSettings::default(), clock.clone(), storage.clone())
                .with_random_source(Box::new(SequenceRng::trials(&[(LOSE, WIN6)])));
            first.request_spin();
            clock.advance_ms(900);
            first.poll();
            first.flush().unwrap();
        }

        let second = GameSession::new(SessionSettings::default(), clock, storage);

        assert_eq!(second.history().len(), 1);
        assert_eq!(second.last_result().unwrap().roll, 6);
    }

    #[test]
    fn test_corrupt_persisted_history_starts_empty() {
        let h = Harness::new(
            SessionSettings::default(),
            RecordingStorage::with_blob("rng_history_v1", "{\"oops\""),
        );

        assert!(h.session.history().is_empty());
        assert_eq!(h.session.stats().total, 0);
    }

    #[test]
    fn test_clear_history_removes_blob_and_cancels_pending_save() {
        let mut h = Harness::with_rng(MockRng);
        h.session.request_spin();
        h.advance(900);
        assert!(h.session.is_dirty());

        assert_eq!(h.session.clear_history(), 1);
        h.advance(10_000);

        assert!(h.session.history().is_empty());
        assert_eq!(h.storage.ops(), vec![StorageOp::Remove("rng_history_v1".into())]);
        assert_eq!(h.event_types().last(), Some(&"history.cleared"));
    }

    #[test]
    fn test_failing_storage_degrades_without_losing_results() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut session =
            GameSession::new(SessionSettings::default(), clock.clone(), Arc::new(FailingStorage))
                .with_random_source(Box::new(MockRng));

        session.request_spin();
        clock.advance_ms(2_000);
        session.poll();

        assert_eq!(session.history().len(), 1);
        assert!(session.is_dirty());
        assert!(session.flush().is_err());
        assert!(session.export().is_err());
        assert_eq!(session.clear_history(), 1);
    }

    // --- export tests ---

    #[test]
    fn test_export_writes_snapshot_blob() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, WIN6)]));
        h.session.request_spin();
        h.advance(900);
        h.session.set_num_outcomes(8);

        let snapshot = h.session.export().unwrap();

        assert_eq!(snapshot.settings.num_outcomes, 8);
        assert_eq!(snapshot.history.len(), 1);
        let blob = h.storage.blob("rng_history_export").unwrap();
        assert_eq!(serde_json::from_str::<ExportSnapshot>(&blob).unwrap(), snapshot);
    }

    // --- teardown tests ---

    #[test]
    fn test_teardown_cancels_everything_and_flushes() {
        let mut h = Harness::with_rng(SequenceRng::trials(&[(LOSE, LOSE), (LOSE, LOSE)]));
        h.session.request_spin();
        h.advance(900);
        h.session.start_autoplay(Duration::from_millis(100));
        h.advance(100);
        assert!(h.session.is_pending());

        h.session.teardown();
        let fired = h.advance(60_000);

        assert_eq!(fired, 0);
        assert!(!h.session.autoplay_active());
        assert!(!h.session.is_pending());
        assert_eq!(h.session.history().len(), 1);
        assert!(!h.session.is_dirty());
        assert_eq!(h.storage.save_count("rng_history_v1"), 1);
    }

    #[test]
    fn test_torn_down_session_ignores_new_work() {
        let mut h = Harness::with_rng(MockRng);
        h.session.teardown();

        assert!(h.session.is_closed());
        assert_eq!(h.session.request_spin(), None);
        assert_eq!(h.session.start_autoplay(Duration::from_millis(100)), None);
        assert!(!h.session.toggle_autoplay());
        h.session.set_seed("abc");
        h.session.set_bet_amount(20);

        assert_eq!(h.session.next_deadline(), None);
        assert_eq!(h.advance(60_000), 0);
        assert!(h.session.history().is_empty());
        assert!(h.event_types().is_empty());
    }

    #[test]
    fn test_oversized_capacity_setting_is_clamped() {
        let settings = SessionSettings {
            history_capacity: usize::MAX,
            ..SessionSettings::default()
        };

        let h = Harness::new(settings, RecordingStorage::new());

        assert_eq!(
            h.session.history().capacity(),
            crate::domain::ledger::MAX_HISTORY_CAPACITY
        );
    }
}
