//! Cron jobs: fee reminders, the overdue sweep and exam reminders
//!
//! Jobs are plain scheduled queries with no persisted state. Each run logs
//! and swallows its own error so one bad sweep never stops the scheduler.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::error::ApiError;
use crate::services::exam_service::ExamService;
use crate::services::fee_service::FeeService;
use crate::services::library_service::LibraryService;
use crate::state::AppState;

crate::text_enum! {
    pub enum JobName {
        FeeReminders => "fee_reminders",
        OverdueSweep => "overdue_sweep",
        ExamReminders => "exam_reminders",
    }
}

impl JobName {
    fn schedule<'a>(&self, state: &'a AppState) -> &'a str {
        let scheduler = &state.config.scheduler;
        match self {
            JobName::FeeReminders => &scheduler.fee_reminder_cron,
            JobName::OverdueSweep => &scheduler.overdue_cron,
            JobName::ExamReminders => &scheduler.exam_reminder_cron,
        }
    }
}

/// Register every job on one scheduler and start it
///
/// The returned handle must be kept alive; call `shutdown` on it when the
/// server stops.
pub async fn start_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for name in JobName::ALL.iter().copied() {
        let job_state = state.clone();
        let job = Job::new_async(name.schedule(&state), move |_uuid, _lock| {
            let state = job_state.clone();
            Box::pin(async move {
                if let Err(e) = run_job(&state, name).await {
                    tracing::error!("Scheduled job {} failed: {}", name, e);
                }
            })
        })?;
        scheduler.add(job).await?;
        tracing::info!("Scheduled {} at '{}'", name, name.schedule(&state));
    }

    scheduler.start().await?;
    tracing::info!("Job scheduler started");
    Ok(scheduler)
}

/// Run one job immediately; also used by `portal run-job`
pub async fn run_job(state: &AppState, name: JobName) -> Result<u64, ApiError> {
    let affected = match name {
        JobName::FeeReminders => FeeService::new(state).send_due_reminders().await?,
        JobName::OverdueSweep => overdue_sweep(state).await?,
        JobName::ExamReminders => ExamService::new(state).send_reminders().await?,
    };
    tracing::info!("Job {} finished ({} affected)", name, affected);
    Ok(affected)
}

/// Fees and library loans are swept independently
async fn overdue_sweep(state: &AppState) -> Result<u64, ApiError> {
    let mut affected = 0;

    match FeeService::new(state).mark_overdue().await {
        Ok(n) => {
            tracing::info!("Marked {} fees overdue", n);
            affected += n;
        }
        Err(e) => tracing::error!("Fee overdue sweep failed: {}", e),
    }

    match LibraryService::new(state).mark_overdue().await {
        Ok(n) => {
            tracing::info!("Marked {} book issues overdue", n);
            affected += n;
        }
        Err(e) => tracing::error!("Library overdue sweep failed: {}", e),
    }

    Ok(affected)
}
