use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::calendar::CalendarDate;
use crate::engine::{DwellPolicy, PresentationState, RotationEngine};
use crate::presentation::{Mode, View};
use crate::roster::DisplaySnapshot;
use crate::{Result, SignageError};

const LOG_PREFIX: &str = "[display-session]";

/// Receives every view a session switches to.
pub trait DisplaySubscriber: Send + Sync {
    fn get_id(&self) -> String;
    fn notify_view(&self, view: View);
}

struct SessionState {
    engine: RotationEngine,
    snapshot: DisplaySnapshot,
    /// Bumped on reload and cancel. A timer only applies transitions
    /// while the generation it was armed with is still current.
    generation: u64,
    cancelled: bool,
}

type Subscribers = Arc<RwLock<HashMap<String, Arc<dyn DisplaySubscriber>>>>;

/// Held for the whole time views are handed to subscribers. Cancel and
/// reload take it after bumping the generation, so a delivery from a
/// discarded timer either finishes before they return or never starts.
type Delivery = Arc<Mutex<()>>;

/// One mounted display: a rotation engine driven by a single timer task.
///
/// Must be started from within a tokio runtime. Dropping the session
/// cancels it.
pub struct DisplaySession {
    id: Uuid,
    log_prefix: String,
    policy: DwellPolicy,
    runtime: Handle,
    state: Arc<RwLock<SessionState>>,
    subscribers: Subscribers,
    delivery: Delivery,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debug for DisplaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = read(&self.state);
        f.debug_struct("DisplaySession")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("mode", &state.engine.mode())
            .field("generation", &state.generation)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

impl DisplaySession {
    pub fn start(
        snapshot: &DisplaySnapshot,
        date: CalendarDate,
        policy: DwellPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            SignageError::Other(anyhow::anyhow!(
                "display session needs a tokio runtime: {}",
                e
            ))
        })?;

        let id = Uuid::new_v4();
        let session = Self {
            id,
            log_prefix: format!("{} {}", LOG_PREFIX, id),
            policy,
            runtime,
            state: Arc::new(RwLock::new(SessionState {
                engine: RotationEngine::new(snapshot, date),
                snapshot: snapshot.clone(),
                generation: 0,
                cancelled: false,
            })),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            delivery: Arc::new(Mutex::new(())),
            timer: Mutex::new(None),
        };
        log::info!(
            "{} started for {} with {} roster entries",
            session.log_prefix,
            date,
            snapshot.len()
        );
        session.arm(0);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn policy(&self) -> DwellPolicy {
        self.policy
    }

    pub fn view(&self) -> View {
        read(&self.state).engine.view()
    }

    pub fn mode(&self) -> Mode {
        read(&self.state).engine.mode()
    }

    pub fn state(&self) -> PresentationState {
        read(&self.state).engine.state().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        read(&self.state).cancelled
    }

    /// Whether a timer task is live for this session.
    pub fn is_armed(&self) -> bool {
        lock(&self.timer)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn subscribe(&self, subscriber: Arc<dyn DisplaySubscriber>) {
        write(&self.subscribers).insert(subscriber.get_id(), subscriber);
    }

    pub fn unsubscribe(&self, subscriber: Arc<dyn DisplaySubscriber>) {
        write(&self.subscribers).remove(&subscriber.get_id());
    }

    /// Replace the roster, e.g. after re-fetching it.
    ///
    /// The running timer is discarded, the engine restarts from its
    /// initial state and subscribers receive the initial view. Subscribers
    /// must not call back into the session from `notify_view`.
    pub fn reload(
        &self,
        snapshot: &DisplaySnapshot,
        date: CalendarDate,
    ) -> Result<()> {
        let (generation, view) = {
            let mut state = write(&self.state);
            if state.cancelled {
                return Err(SignageError::Other(anyhow::anyhow!(
                    "session {} is cancelled",
                    self.id
                )));
            }
            state.generation += 1;
            state.engine = RotationEngine::new(snapshot, date);
            state.snapshot = snapshot.clone();
            (state.generation, state.engine.view())
        };
        self.disarm();
        log::info!(
            "{} reloaded with {} roster entries for {}",
            self.log_prefix,
            snapshot.len(),
            date
        );

        let _delivery = lock(&self.delivery);
        self.arm(generation);
        notify(&self.subscribers, view);
        Ok(())
    }

    /// Reload only when the roster or the date differs from what the
    /// session is showing, so periodic re-fetches keep the rotation going.
    /// Returns whether a reload happened.
    pub fn refresh(
        &self,
        snapshot: &DisplaySnapshot,
        date: CalendarDate,
    ) -> Result<bool> {
        {
            let state = read(&self.state);
            if !state.cancelled
                && state.engine.date() == date
                && state.snapshot == *snapshot
            {
                log::trace!("{} roster unchanged", self.log_prefix);
                return Ok(false);
            }
        }
        self.reload(snapshot, date)?;
        Ok(true)
    }

    /// Tear the session down. No transition is applied or delivered after
    /// this returns; a delivery already in progress is waited for.
    pub fn cancel(&self) {
        {
            let mut state = write(&self.state);
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            state.generation += 1;
        }
        self.disarm();
        drop(lock(&self.delivery));
        log::info!("{} cancelled", self.log_prefix);
    }

    fn arm(&self, generation: u64) {
        if !read(&self.state).engine.is_rotating() {
            log::debug!(
                "{} nobody celebrates today, no timer armed",
                self.log_prefix
            );
            return;
        }

        let task = run_timer(
            self.log_prefix.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.subscribers),
            Arc::clone(&self.delivery),
            self.policy,
            generation,
        );
        let handle = self.runtime.spawn(task);
        if let Some(previous) = lock(&self.timer).replace(handle) {
            previous.abort();
        }
    }

    fn disarm(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

impl Drop for DisplaySession {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_timer(
    log_prefix: String,
    state: Arc<RwLock<SessionState>>,
    subscribers: Subscribers,
    delivery: Delivery,
    policy: DwellPolicy,
    generation: u64,
) {
    loop {
        let dwell = {
            let state = read(&state);
            if state.cancelled || state.generation != generation {
                return;
            }
            match state.engine.next_dwell(&policy) {
                Some(dwell) => dwell,
                None => return,
            }
        };

        tokio::time::sleep(dwell).await;

        // flip and rotate under one lock
        let view = {
            let mut state = write(&state);
            if state.cancelled || state.generation != generation {
                log::trace!("{} stale timer discarded", log_prefix);
                return;
            }
            state.engine.advance();
            state.engine.view()
        };

        let _delivery = lock(&delivery);
        if !is_current(&state, generation) {
            log::trace!("{} stale view dropped", log_prefix);
            return;
        }
        log::debug!("{} showing {:?}", log_prefix, view.mode());
        notify(&subscribers, view);
    }
}

fn is_current(state: &RwLock<SessionState>, generation: u64) -> bool {
    let state = read(state);
    !state.cancelled && state.generation == generation
}

fn notify(subscribers: &Subscribers, view: View) {
    let subscribers: Vec<Arc<dyn DisplaySubscriber>> =
        read(subscribers).values().cloned().collect();
    for subscriber in subscribers {
        subscriber.notify_view(view.clone());
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
    use tokio::time::{sleep, Instant};

    use crate::roster::RosterEntry;

    struct ChannelSubscriber {
        id: String,
        tx: UnboundedSender<View>,
    }

    impl DisplaySubscriber for ChannelSubscriber {
        fn get_id(&self) -> String {
            self.id.clone()
        }

        fn notify_view(&self, view: View) {
            let _ = self.tx.send(view);
        }
    }

    fn subscriber(id: &str) -> (Arc<ChannelSubscriber>, UnboundedReceiver<View>) {
        let (tx, rx) = unbounded_channel();
        let subscriber = Arc::new(ChannelSubscriber {
            id: id.to_string(),
            tx,
        });
        (subscriber, rx)
    }

    fn march_fifth() -> CalendarDate {
        CalendarDate::new(3, 5).unwrap()
    }

    fn ann_bo_cy() -> DisplaySnapshot {
        DisplaySnapshot::new(vec![
            RosterEntry::new("Ann", 3, 5),
            RosterEntry::new("Bo", 3, 5),
            RosterEntry::new("Cy", 4, 1),
        ])
    }

    fn asymmetric() -> DwellPolicy {
        DwellPolicy::new(Duration::from_millis(5_000), Duration::from_millis(10_000))
            .unwrap()
    }

    fn spotlight_name(view: &View) -> Option<&str> {
        match view {
            View::Spotlight(spotlight) => Some(spotlight.honoree.name.as_str()),
            View::Monthly(_) => None,
        }
    }

    fn assert_elapsed(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_millis(expected_ms);
        assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
        assert!(
            elapsed < expected + Duration::from_millis(5),
            "{elapsed:?} too late for {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_happen_at_dwell_boundaries() {
        let start = Instant::now();
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), asymmetric())
                .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        assert!(session.is_armed());
        assert_eq!(spotlight_name(&session.view()), Some("Ann"));

        sleep(Duration::from_millis(4_999)).await;
        assert_eq!(session.mode(), Mode::Spotlight);
        assert!(rx.try_recv().is_err());

        let view = rx.recv().await.unwrap();
        assert_eq!(view.mode(), Mode::Monthly);
        assert_elapsed(start, 5_000);

        let view = rx.recv().await.unwrap();
        assert_eq!(spotlight_name(&view), Some("Bo"));
        assert_elapsed(start, 15_000);

        let view = rx.recv().await.unwrap();
        assert_eq!(view.mode(), Mode::Monthly);
        assert_elapsed(start, 20_000);

        let view = rx.recv().await.unwrap();
        assert_eq!(spotlight_name(&view), Some("Ann"));
        assert_elapsed(start, 30_000);
        assert_eq!(session.state().spotlight_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn symmetric_policy_alternates_evenly() {
        let start = Instant::now();
        let policy = DwellPolicy::symmetric(Duration::from_millis(8_000)).unwrap();
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), policy).unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        for i in 1..=4u64 {
            rx.recv().await.unwrap();
            assert_elapsed(start, 8_000 * i);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nobody_today_never_arms_a_timer() {
        let session = DisplaySession::start(
            &ann_bo_cy(),
            CalendarDate::new(3, 6).unwrap(),
            DwellPolicy::default(),
        )
        .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        assert!(!session.is_armed());
        sleep(Duration::from_secs(3_600)).await;
        assert_eq!(session.mode(), Mode::Monthly);
        assert!(rx.try_recv().is_err());
        match session.view() {
            View::Monthly(view) => assert_eq!(view.honorees.len(), 2),
            View::Spotlight(_) => panic!("expected monthly view"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_pending_transition() {
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), asymmetric())
                .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        sleep(Duration::from_millis(4_000)).await;
        session.cancel();
        assert!(session.is_cancelled());
        assert!(!session.is_armed());

        sleep(Duration::from_secs(60)).await;
        assert_eq!(session.mode(), Mode::Spotlight);
        assert_eq!(session.state().spotlight_index, 0);
        assert!(rx.try_recv().is_err());

        assert!(session.reload(&ann_bo_cy(), march_fifth()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_session_stops_the_timer() {
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), asymmetric())
                .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);
        drop(session);

        sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reload_restarts_from_the_new_roster() {
        let start = Instant::now();
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), asymmetric())
                .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        // first transition to monthly, then Bo
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert_eq!(session.state().spotlight_index, 1);

        let reloaded = DisplaySnapshot::new(vec![
            RosterEntry::new("Dee", 3, 5),
            RosterEntry::new("Eve", 3, 9),
        ]);
        let reloaded_at = start.elapsed();
        session.reload(&reloaded, march_fifth()).unwrap();

        let view = rx.recv().await.unwrap();
        assert_eq!(spotlight_name(&view), Some("Dee"));
        assert_eq!(session.state().spotlight_index, 0);

        // the old timer is gone: next flip is a full spotlight dwell later
        let view = rx.recv().await.unwrap();
        assert_eq!(view.mode(), Mode::Monthly);
        let since_reload = start.elapsed() - reloaded_at;
        assert!(since_reload >= Duration::from_millis(5_000));
        assert!(since_reload < Duration::from_millis(5_005));

        session.reload(&DisplaySnapshot::empty(), march_fifth()).unwrap();
        let view = rx.recv().await.unwrap();
        assert_eq!(view.mode(), Mode::Monthly);
        assert!(!session.is_armed());
        sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_keeps_rotating_on_an_unchanged_roster() {
        let roster = ann_bo_cy();
        let session =
            DisplaySession::start(&roster, march_fifth(), asymmetric())
                .unwrap();
        let (sub, mut rx) = subscriber("tv");
        session.subscribe(sub);

        rx.recv().await.unwrap();
        let view = rx.recv().await.unwrap();
        assert_eq!(spotlight_name(&view), Some("Bo"));

        assert!(!session.refresh(&roster, march_fifth()).unwrap());
        assert!(rx.try_recv().is_err());
        assert_eq!(session.state().spotlight_index, 1);
        assert_eq!(session.mode(), Mode::Spotlight);

        // the rotation carries on to Ann instead of restarting
        rx.recv().await.unwrap();
        let view = rx.recv().await.unwrap();
        assert_eq!(spotlight_name(&view), Some("Ann"));

        // a new day does reload
        let sixth = CalendarDate::new(3, 6).unwrap();
        assert!(session.refresh(&roster, sixth).unwrap());
        let view = rx.recv().await.unwrap();
        assert_eq!(view.mode(), Mode::Monthly);
        assert!(!session.is_armed());

        session.cancel();
        assert!(session.refresh(&roster, sixth).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_receivers_get_nothing() {
        let session =
            DisplaySession::start(&ann_bo_cy(), march_fifth(), asymmetric())
                .unwrap();
        let (first, mut first_rx) = subscriber("first");
        let (second, mut second_rx) = subscriber("second");
        session.subscribe(first.clone());
        session.subscribe(second);
        session.unsubscribe(first);

        second_rx.recv().await.unwrap();
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn start_outside_runtime_fails() {
        let result = DisplaySession::start(
            &ann_bo_cy(),
            march_fifth(),
            DwellPolicy::default(),
        );
        assert!(result.is_err());
    }
}
