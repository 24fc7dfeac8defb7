//! The balance controller.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vlt_codec::{build_blob, CodecConfig, NoiseSource, OsNoise};
use vlt_integrity::{check_record, digest_hex};
use vlt_store::{read_record, write_record, SlotStore};

use crate::config::{ControllerConfig, RegenConfig, RollerConfig};

// ---------------------------------------------------------------------------
// Fault sink
// ---------------------------------------------------------------------------

/// Where a swallowed failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultSite {
    /// Hash roller tick.
    Roller,
    /// Regenerator tick.
    Regen,
    /// Subscriber callback panic.
    Subscriber,
}

/// Optional observability hook for failures the controller must not
/// propagate (roller ticks, regen ticks, subscriber panics).
pub type FaultSink = Arc<dyn Fn(FaultSite, &anyhow::Error) + Send + Sync>;

type SubscriberFn = Arc<dyn Fn(u64) + Send + Sync>;

struct SubscriberEntry {
    id: u64,
    callback: SubscriberFn,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Inner {
    store: Arc<dyn SlotStore>,
    cfg: ControllerConfig,
    codec: CodecConfig,
    noise: Mutex<Box<dyn NoiseSource>>,
    balance: Mutex<u64>,
    subscribers: Mutex<Vec<SubscriberEntry>>,
    next_subscriber_id: AtomicU64,
    /// Serializes every blob+digest pair write. Never held across an await.
    write_serial: Mutex<()>,
    fault_sink: Option<FaultSink>,
    regen_task: Mutex<Option<JoinHandle<()>>>,
    roller_task: Mutex<Option<JoinHandle<()>>>,
}

/// Tamper-evident balance controller. Cheap to clone; all clones share one
/// balance, subscriber set, and pair of background tasks.
#[derive(Clone)]
pub struct BalanceController {
    inner: Arc<Inner>,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BalanceController {
    /// Controller over `store` with OS-backed noise and no fault sink.
    pub fn new(store: Arc<dyn SlotStore>, cfg: ControllerConfig) -> Self {
        Self::with_parts(store, cfg, Box::new(OsNoise), None)
    }

    /// Fully injected constructor for embedders and tests.
    pub fn with_parts(
        store: Arc<dyn SlotStore>,
        cfg: ControllerConfig,
        noise: Box<dyn NoiseSource>,
        fault_sink: Option<FaultSink>,
    ) -> Self {
        let codec = CodecConfig {
            noise_len: cfg.noise_len,
        };
        Self {
            inner: Arc::new(Inner {
                store,
                cfg,
                codec,
                noise: Mutex::new(noise),
                balance: Mutex::new(0),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(0),
                write_serial: Mutex::new(()),
                fault_sink,
                regen_task: Mutex::new(None),
                roller_task: Mutex::new(None),
            }),
        }
    }

    // -- state machine ------------------------------------------------------

    /// Initialize from the persisted record.
    ///
    /// Invalid or missing record resets the balance to 0 and re-saves: an
    /// untrusted record is worth nothing, so corrupting the store gains
    /// nothing. A valid record whose payload cannot be extracted falls back
    /// to `default_balance`. Store failures during the re-save propagate.
    ///
    /// With `auto_regen` set this also starts both background tasks, which
    /// requires a tokio runtime.
    pub fn init(&self) -> Result<u64> {
        let balance = if self.verify_integrity() {
            let record =
                read_record(self.inner.store.as_ref()).context("re-read verified record")?;
            match record.blob.as_deref().and_then(vlt_codec::extract) {
                Some(value) => {
                    // Adopt without re-saving; the stored record is intact.
                    *lock(&self.inner.balance) = value;
                    value
                }
                None => {
                    // Digest matched but no payload extracted. Should not
                    // happen for records this controller wrote; recover to
                    // the configured default.
                    warn!(
                        fallback = self.inner.cfg.default_balance,
                        "valid record with no extractable payload; falling back"
                    );
                    self.save_balance(self.inner.cfg.default_balance)?;
                    self.inner.cfg.default_balance
                }
            }
        } else {
            info!("integrity check failed or record missing; resetting balance to 0");
            self.save_balance(0)?;
            0
        };

        if self.inner.cfg.auto_regen {
            self.start_auto_regen(self.inner.cfg.regen.clone());
            self.start_hash_roller(self.inner.cfg.roller.clone());
        }

        Ok(balance)
    }

    /// Current in-memory balance. No I/O.
    pub fn balance(&self) -> u64 {
        *lock(&self.inner.balance)
    }

    /// Normalize `amount` (negative or non-finite to 0, fraction truncated
    /// toward zero) and save it.
    pub fn set_balance(&self, amount: f64) -> Result<u64> {
        let normalized = normalize(amount);
        self.save_balance(normalized)?;
        Ok(normalized)
    }

    /// Low-level save path: build a fresh blob for `amount`, write blob then
    /// digest under the writer lock, adopt `amount` in memory, notify all
    /// subscribers synchronously in registration order.
    ///
    /// Store failures propagate; the in-memory balance is not updated unless
    /// both writes were issued.
    pub fn save_balance(&self, amount: u64) -> Result<()> {
        {
            let _writer = lock(&self.inner.write_serial);
            self.write_fresh_record(amount)
                .context("persist balance record")?;
            *lock(&self.inner.balance) = amount;
        }
        self.notify(amount);
        Ok(())
    }

    /// Check the persisted record. Read failures count as "not valid";
    /// this never errors.
    pub fn verify_integrity(&self) -> bool {
        // Read both halves under the writer lock; otherwise a roll landing
        // between the two gets would pair a blob with the digest of a
        // different write and report phantom tamper.
        let _writer = lock(&self.inner.write_serial);
        match read_record(self.inner.store.as_ref()) {
            Ok(rec) => check_record(rec.blob.as_deref(), rec.digest.as_deref()).is_valid(),
            Err(err) => {
                debug!(error = %err, "record read failed during verification");
                false
            }
        }
    }

    /// Manual recovery: unconditionally adopt and persist `default_balance`.
    pub fn repair_reset(&self, default_balance: u64) -> Result<u64> {
        self.save_balance(default_balance)?;
        Ok(default_balance)
    }

    // -- subscriptions ------------------------------------------------------

    /// Register `callback` and immediately invoke it once with the current
    /// balance. A panicking callback is isolated and reported through the
    /// fault sink; it never affects other subscribers or controller state.
    pub fn subscribe(&self, callback: impl Fn(u64) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let callback: SubscriberFn = Arc::new(callback);

        lock(&self.inner.subscribers).push(SubscriberEntry {
            id,
            callback: Arc::clone(&callback),
        });

        let current = self.balance();
        self.invoke(&callback, current);

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    fn notify(&self, amount: u64) {
        // Snapshot under the lock, invoke outside it so a callback may
        // subscribe or save without deadlocking.
        let snapshot: Vec<SubscriberFn> = lock(&self.inner.subscribers)
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();
        for callback in &snapshot {
            self.invoke(callback, amount);
        }
    }

    fn invoke(&self, callback: &SubscriberFn, amount: u64) {
        if catch_unwind(AssertUnwindSafe(|| callback(amount))).is_err() {
            warn!(amount, "subscriber callback panicked");
            self.report(FaultSite::Subscriber, &anyhow!("subscriber callback panicked"));
        }
    }

    // -- regenerator --------------------------------------------------------

    /// One regenerator step: +1 and save while below `threshold`, no-op at
    /// or above it. Returns the new balance when one was saved.
    pub fn regen_tick(&self, threshold: u64) -> Result<Option<u64>> {
        let current = self.balance();
        if current >= threshold {
            return Ok(None);
        }
        let next = current + 1;
        self.save_balance(next)?;
        Ok(Some(next))
    }

    /// Start the regenerator task. No-op if already running.
    pub fn start_auto_regen(&self, cfg: RegenConfig) {
        let mut slot = lock(&self.inner.regen_task);
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(cfg.interval_ms.max(1)));
            // The interval fires once immediately; the first credit must
            // wait a full period, or restarting the task farms +1 per start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(ctrl) = upgrade(&weak) else { break };
                if let Err(err) = ctrl.regen_tick(cfg.threshold) {
                    warn!(error = %err, "regen tick failed");
                    ctrl.report(FaultSite::Regen, &err);
                }
            }
        }));
    }

    /// Stop the regenerator. Idempotent; no tick fires after this returns.
    pub fn stop_auto_regen(&self) {
        if let Some(handle) = lock(&self.inner.regen_task).take() {
            handle.abort();
        }
    }

    // -- hash roller --------------------------------------------------------

    /// One roller step: rewrite blob+digest for the CURRENT balance with
    /// fresh noise. No subscriber notification, no in-memory change — the
    /// semantic value is untouched; only the persisted representation moves.
    pub fn roll_once(&self) -> Result<()> {
        let _writer = lock(&self.inner.write_serial);
        let amount = self.balance();
        self.write_fresh_record(amount)
    }

    /// Start the roller task. No-op if already running. Roller failures are
    /// swallowed (fault sink + debug log); a wasted tick is re-covered by
    /// the next one.
    pub fn start_hash_roller(&self, cfg: RollerConfig) {
        let mut slot = lock(&self.inner.roller_task);
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(cfg.interval_ms.max(1)));
            // Skip the interval's immediate first fire; the first rewrite
            // lands one period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(ctrl) = upgrade(&weak) else { break };
                if let Err(err) = ctrl.roll_once() {
                    debug!(error = %err, "roll tick wasted");
                    ctrl.report(FaultSite::Roller, &err);
                }
            }
        }));
    }

    /// Stop the roller. Idempotent; no tick fires after this returns.
    pub fn stop_hash_roller(&self) {
        if let Some(handle) = lock(&self.inner.roller_task).take() {
            handle.abort();
        }
    }

    // -- internals ----------------------------------------------------------

    /// Build a fresh blob for `amount` and write blob, then digest.
    /// Callers hold the writer lock (or are on the save path, which does).
    fn write_fresh_record(&self, amount: u64) -> Result<()> {
        let blob = {
            let mut noise = lock(&self.inner.noise);
            build_blob(&self.inner.codec, noise.as_mut(), amount)
        };
        let digest = digest_hex(&blob);
        write_record(self.inner.store.as_ref(), &blob, &digest)
    }

    fn report(&self, site: FaultSite, err: &anyhow::Error) {
        if let Some(sink) = &self.inner.fault_sink {
            sink(site, err);
        }
    }
}

/// Background tasks hold only a weak handle so a dropped controller winds
/// its tasks down on their next tick.
fn upgrade(weak: &Weak<Inner>) -> Option<BalanceController> {
    weak.upgrade().map(|inner| BalanceController { inner })
}

fn normalize(amount: f64) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX for oversized values.
    amount.trunc() as u64
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle returned by [`BalanceController::subscribe`]. Dropping it keeps
/// the subscription alive; call [`cancel`][Subscription::cancel] to remove
/// the callback.
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    pub fn cancel(self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.subscribers).retain(|entry| entry.id != self.id);
        }
    }
}
