use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Candidate, CandidateAssessment, Reminder, ReminderId, ReminderStatus,
};
use super::repository::{NotifyError, ReminderNotifier, RepositoryError, ScreeningRepository};

static REMINDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reminder_id() -> ReminderId {
    let id = REMINDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReminderId(format!("rem-{id:06}"))
}

/// Reminder tunables: when a risk crossing schedules follow-up, how far
/// out, and how many delivery attempts a sweep makes before flagging the
/// reminder on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub risk_threshold: f32,
    pub delay_days: i64,
    pub max_delivery_attempts: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            risk_threshold: 40.0,
            delay_days: 3,
            max_delivery_attempts: 5,
        }
    }
}

/// Outcome counts for one timer sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub delivered: usize,
    pub failed: usize,
    pub exhausted: usize,
}

/// Notifier that records deliveries on the log stream. Stands in until an
/// email or Slack transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ReminderNotifier for LogNotifier {
    fn deliver(&self, reminder: &Reminder, candidate: &Candidate) -> Result<(), NotifyError> {
        info!(
            reminder = %reminder.id.0,
            candidate = %candidate.id.0,
            email = %candidate.email,
            follow_up = %reminder.follow_up_date,
            "follow-up reminder due"
        );
        Ok(())
    }
}

/// Watches risk updates and follow-up dates. Creation is suppressed while
/// the candidate already has a live (pending or sent) reminder, so each
/// threshold crossing schedules at most one follow-up until it is
/// dismissed.
pub struct ReminderScheduler<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    config: ReminderConfig,
}

impl<R, N> ReminderScheduler<R, N>
where
    R: ScreeningRepository,
    N: ReminderNotifier,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: ReminderConfig) -> Self {
        Self {
            repository,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// React to a fresh classification. Returns the created reminder when a
    /// risk dimension sits at or above the threshold and no live reminder
    /// exists for the candidate.
    pub fn on_assessment(
        &self,
        candidate: &Candidate,
        assessment: &CandidateAssessment,
        now: DateTime<Utc>,
    ) -> Result<Option<Reminder>, RepositoryError> {
        if !assessment.risks.any_at_or_above(self.config.risk_threshold) {
            return Ok(None);
        }
        if self.repository.live_reminder_for(&candidate.id)?.is_some() {
            return Ok(None);
        }

        let reminder = Reminder {
            id: next_reminder_id(),
            candidate_id: candidate.id.clone(),
            follow_up_date: now + Duration::days(self.config.delay_days),
            status: ReminderStatus::Pending,
            recruiter_note: None,
            trigger_score: assessment.overall_score,
            created_at: now,
            delivery_attempts: 0,
        };
        self.repository.insert_reminder(reminder.clone())?;
        info!(
            candidate = %candidate.id.0,
            reminder = %reminder.id.0,
            trigger_score = reminder.trigger_score,
            "follow-up reminder scheduled"
        );
        Ok(Some(reminder))
    }

    /// Timer sweep: hand every due pending reminder to the notifier.
    /// Delivery failures leave the reminder pending for the next sweep
    /// (at-least-once); once the attempt budget is spent the reminder is
    /// skipped and surfaced as failed in views. Write-backs are guarded on
    /// the reminder still being pending, so a dismissal landing while
    /// delivery is in flight stays terminal.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, RepositoryError> {
        let mut report = SweepReport::default();

        for reminder in self.repository.due_reminders(now)? {
            if reminder.delivery_attempts >= self.config.max_delivery_attempts {
                report.exhausted += 1;
                continue;
            }

            let candidate = match self.repository.candidate(&reminder.candidate_id)? {
                Some(candidate) => candidate,
                None => {
                    warn!(reminder = %reminder.id.0, "reminder references missing candidate");
                    continue;
                }
            };

            match self.notifier.deliver(&reminder, &candidate) {
                Ok(()) => {
                    let mut delivered = reminder.clone();
                    delivered.status = ReminderStatus::Sent;
                    if self
                        .repository
                        .update_reminder_guarded(delivered, ReminderStatus::Pending)?
                    {
                        info!(reminder = %reminder.id.0, "follow-up reminder delivered");
                        report.delivered += 1;
                    } else {
                        info!(
                            reminder = %reminder.id.0,
                            "reminder left pending during delivery, stored status kept"
                        );
                    }
                }
                Err(err) => {
                    let mut failed = reminder.clone();
                    failed.delivery_attempts += 1;
                    let exhausted =
                        failed.delivery_attempts >= self.config.max_delivery_attempts;
                    let landed = self
                        .repository
                        .update_reminder_guarded(failed.clone(), ReminderStatus::Pending)?;
                    warn!(
                        reminder = %reminder.id.0,
                        attempts = failed.delivery_attempts,
                        error = %err,
                        "reminder delivery failed"
                    );
                    if !landed {
                        continue;
                    }
                    if exhausted {
                        report.exhausted += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Recruiter dismissal: terminal and idempotent from any state.
    pub fn dismiss(&self, id: &ReminderId) -> Result<Reminder, RepositoryError> {
        let mut reminder = self.repository.reminder(id)?.ok_or(RepositoryError::NotFound)?;
        if reminder.status == ReminderStatus::Dismissed {
            return Ok(reminder);
        }
        reminder.status = ReminderStatus::Dismissed;
        self.repository.update_reminder(reminder.clone())?;
        info!(reminder = %reminder.id.0, "reminder dismissed");
        Ok(reminder)
    }
}
