//! Async driver around [`ExamSession`].
//!
//! The session sits behind one mutex, so every command and every timer tick
//! is a single atomic step. The countdown runs in a spawned task whose abort
//! handle is replaced whenever the session hands out a new timer ticket; the
//! ticket check inside the session rejects anything that slips through.

use std::sync::{Arc, Weak};
use std::time::Duration;

use exam_core::auth::SessionContext;
use exam_core::band::Band;
use exam_core::model::{ResultRecord, Section};
use exam_core::session::{ExamSession, ExamState, FinishedExam, Position, Step, TickEvent, Transition};
use exam_core::timer::TimerTicket;
use storage::repository::ResultRepository;
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{NotifyError, RunnerError};
use crate::notify::NotificationRelay;

const TICK: Duration = Duration::from_secs(1);

/// What a front end needs to draw the exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSnapshot {
    pub state: ExamState,
    pub position: Position,
    pub section: Section,
    pub sub_part_count: usize,
    pub sub_part_title: Option<String>,
    pub remaining_secs: u32,
    pub candidate: Option<String>,
    pub last_error: Option<String>,
    pub overall_band: Option<Band>,
    pub result: Option<Arc<ResultRecord>>,
}

/// Collaborators used once the last section closes.
#[derive(Clone)]
pub struct Finishing {
    pub results: Arc<dyn ResultRepository>,
    pub relay: Option<Arc<dyn NotificationRelay>>,
    /// Longest wait for the relay before the session completes anyway.
    pub grace: Duration,
}

struct Inner {
    session: ExamSession,
    context: SessionContext,
    ticker: Option<(TimerTicket, AbortHandle)>,
    result: Option<Arc<ResultRecord>>,
}

impl Inner {
    fn snapshot(&self) -> ExamSnapshot {
        let session = &self.session;
        let position = session.position();
        ExamSnapshot {
            state: session.state(),
            position,
            section: session.current_section(),
            sub_part_count: session.sub_part_count(),
            sub_part_title: session
                .current_spec()
                .sub_part_title(position.sub_part)
                .map(str::to_string),
            remaining_secs: session.remaining_secs(),
            candidate: session.candidate().map(str::to_string),
            last_error: session.last_error().map(str::to_string),
            overall_band: self.result.as_ref().and_then(|r| r.overall_band),
            result: self.result.clone(),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some((_, handle)) = self.ticker.take() {
            handle.abort();
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    finishing: Finishing,
    updates: watch::Sender<ExamSnapshot>,
}

/// Owns one exam attempt from start to completion.
pub struct ExamRunner {
    shared: Arc<Shared>,
}

impl ExamRunner {
    #[must_use]
    pub fn new(session: ExamSession, context: SessionContext, finishing: Finishing) -> Self {
        let inner = Inner {
            session,
            context,
            ticker: None,
            result: None,
        };
        let (updates, _) = watch::channel(inner.snapshot());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                finishing,
                updates,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ExamSnapshot {
        self.shared.updates.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExamSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Start the exam and the section countdown.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Session` if the context is not authenticated or
    /// the exam already started.
    pub async fn start(&self) -> Result<(), RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        let context = inner.context.clone();
        inner.session.start(&context)?;
        tracing::info!(
            candidate = context.candidate(),
            definition = inner.session.definition().name(),
            attempt = %inner.session.attempt_id(),
            "exam started"
        );
        Shared::sync_ticker(&self.shared, &mut inner);
        self.shared.publish(&inner);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` if the answer is rejected.
    pub async fn set_answer(&self, index: usize, value: impl Into<String>) -> Result<(), RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        inner.session.set_answer(index, value)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` if the response is rejected.
    pub async fn set_response(&self, index: usize, text: impl Into<String>) -> Result<(), RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        inner.session.set_response(index, text)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` on the last sub-part or outside an
    /// active exam.
    pub async fn next_sub_part(&self) -> Result<Transition, RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        let transition = inner.session.next_sub_part()?;
        Shared::apply(&self.shared, &mut inner, &transition);
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` outside an active exam.
    pub async fn finish_section(&self) -> Result<Transition, RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        let transition = inner.session.finish_section()?;
        Shared::apply(&self.shared, &mut inner, &transition);
        Ok(transition)
    }

    /// The "next" action.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Session` outside an active exam.
    pub async fn advance(&self) -> Result<Transition, RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        let transition = inner.session.advance()?;
        Shared::apply(&self.shared, &mut inner, &transition);
        Ok(transition)
    }

    /// The "next" action, applied only if the exam is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Session` before the exam starts.
    pub async fn advance_from(&self, expected: Position) -> Result<Step, RunnerError> {
        let mut inner = self.shared.inner.lock().await;
        let step = inner.session.advance_from(expected)?;
        if let Step::Applied(transition) = &step {
            Shared::apply(&self.shared, &mut inner, transition);
        }
        Ok(step)
    }

    /// Wait until the finishing sequence has completed the session.
    pub async fn wait_complete(&self) -> ExamSnapshot {
        let mut updates = self.subscribe();
        match updates
            .wait_for(|snapshot| snapshot.state == ExamState::Complete)
            .await
        {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives in `self.shared`, so this is unreachable while
            // `self` is borrowed.
            Err(_) => self.snapshot(),
        }
    }
}

impl Drop for ExamRunner {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            inner.stop_ticker();
        }
    }
}

impl Shared {
    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.snapshot());
    }

    /// Log a transition, realign the ticker and start finishing if needed.
    fn apply(shared: &Arc<Self>, inner: &mut Inner, transition: &Transition) {
        match transition {
            Transition::SubPart { section, sub_part } => {
                tracing::info!(%section, sub_part, "moved to next {}", section.sub_part_label());
            }
            Transition::Section { completed, next } => {
                tracing::info!(
                    completed = %completed.section(),
                    band = ?completed.band().map(|b| b.to_string()),
                    next = %next,
                    "section closed"
                );
            }
            Transition::Finished(finished) => {
                tracing::info!(
                    attempt = %finished.record.attempt_id,
                    overall = ?finished.record.overall_band.map(|b| b.to_string()),
                    "exam finished; submitting results"
                );
                inner.result = Some(Arc::new(finished.record.clone()));
                tokio::spawn(Self::finish(Arc::clone(shared), (**finished).clone()));
            }
        }
        Self::sync_ticker(shared, inner);
        shared.publish(inner);
    }

    /// Keep exactly one tick task, bound to the session's current ticket.
    fn sync_ticker(shared: &Arc<Self>, inner: &mut Inner) {
        let wanted = inner.session.timer_ticket();
        if inner.ticker.as_ref().map(|(ticket, _)| *ticket) == wanted {
            return;
        }
        inner.stop_ticker();
        if let Some(ticket) = wanted {
            let handle = tokio::spawn(Self::run_ticker(Arc::downgrade(shared), ticket));
            inner.ticker = Some((ticket, handle.abort_handle()));
        }
    }

    async fn run_ticker(shared: Weak<Self>, ticket: TimerTicket) {
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            if !Self::on_tick(&shared, ticket).await {
                break;
            }
        }
    }

    /// Returns `false` once this ticket is finished.
    async fn on_tick(shared: &Arc<Self>, ticket: TimerTicket) -> bool {
        let mut inner = shared.inner.lock().await;
        let section = inner.session.current_section();
        match inner.session.tick(ticket) {
            TickEvent::Stale => false,
            TickEvent::Counted { remaining } => {
                tracing::debug!(remaining, "tick");
                shared.publish(&inner);
                true
            }
            TickEvent::Expired(transition) => {
                tracing::info!(%section, "time is up");
                // The expired ticket's task is this one; forget it so
                // `sync_ticker` does not abort us mid-step.
                inner.ticker = None;
                Self::apply(shared, &mut inner, &transition);
                false
            }
        }
    }

    /// Store, log and relay the result, then complete the session.
    ///
    /// The store and the relay run side by side and each gets at most the
    /// grace delay. A relay failure is shown to the candidate and the session
    /// completes once the grace delay since dispatch has passed.
    async fn finish(shared: Arc<Self>, finished: FinishedExam) {
        let FinishedExam { record, message } = finished;
        let Finishing {
            results,
            relay,
            grace,
        } = shared.finishing.clone();

        tracing::info!("result message:\n{message}");

        let dispatched = Instant::now();
        let store = async {
            match time::timeout(grace, results.append_result(&record)).await {
                Ok(Ok(id)) => tracing::info!(id, attempt = %record.attempt_id, "result stored"),
                Ok(Err(err)) => tracing::error!(error = %err, "failed to store result"),
                Err(_) => tracing::error!(?grace, "result store timed out"),
            }
        };
        let send = async {
            match relay {
                Some(relay) => match time::timeout(grace, relay.notify(&message)).await {
                    Ok(sent) => sent,
                    Err(_) => Err(NotifyError::TimedOut(grace)),
                },
                None => {
                    tracing::debug!("no relay configured; message logged only");
                    Ok(())
                }
            }
        };
        let ((), outcome) = tokio::join!(store, send);

        if let Err(err) = outcome {
            tracing::warn!(error = %err, "result notification failed");
            {
                let mut inner = shared.inner.lock().await;
                inner
                    .session
                    .record_submit_error(format!("Failed to send results: {err}"));
                shared.publish(&inner);
            }
            time::sleep_until(dispatched + grace).await;
        }

        let mut inner = shared.inner.lock().await;
        if let Err(err) = inner.session.complete() {
            tracing::error!(error = %err, "could not complete session");
        }
        inner.context.clear();
        inner.stop_ticker();
        tracing::info!(attempt = %record.attempt_id, "exam complete");
        shared.publish(&inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::auth::LoginGate;
    use exam_core::catalog;
    use exam_core::model::TimingMode;
    use exam_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn runner() -> ExamRunner {
        let definition = Arc::new(catalog::practice().unwrap());
        let session = ExamSession::new(definition, TimingMode::Development, fixed_clock());
        let context = LoginGate::new("A").login("A").unwrap();
        ExamRunner::new(
            session,
            context,
            Finishing {
                results: Arc::new(InMemoryRepository::new()),
                relay: None,
                grace: Duration::from_secs(3),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_tracks_start_and_ticks() {
        let runner = runner();
        let before = runner.snapshot();
        assert_eq!(before.state, ExamState::NotStarted);
        assert_eq!(before.remaining_secs, 60);

        runner.start().await.unwrap();
        assert_eq!(runner.snapshot().state, ExamState::Active);
        assert_eq!(runner.snapshot().section, Section::Reading);

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(runner.snapshot().remaining_secs, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let runner = runner();
        runner.start().await.unwrap();
        assert!(matches!(
            runner.start().await.unwrap_err(),
            RunnerError::Session(_)
        ));
    }
}
