use std::sync::Arc;
use std::time::Duration;

use job_api::{JobId, VideoApi};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::state::PlayerEvent;

/// Repeated status queries for one job.
///
/// Polls until the backend reports a terminal phase or a query fails; a
/// transport failure is itself terminal. There is deliberately no retry
/// cap, since a job may render for a long time; the owner cancels by
/// dropping the session token. Late responses are additionally discarded
/// downstream by the state machine's job-id guard.
pub struct StatusPoller {
    api: Arc<dyn VideoApi>,
    job: JobId,
    delay: Duration,
    events: UnboundedSender<PlayerEvent>,
    cancel: CancellationToken,
}

impl StatusPoller {
    /// Start polling on a background task.
    pub fn spawn(
        api: Arc<dyn VideoApi>,
        job: JobId,
        delay: Duration,
        events: UnboundedSender<PlayerEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let poller = Self {
            api,
            job,
            delay,
            events,
            cancel,
        };
        tokio::spawn(poller.run())
    }

    async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                debug!(job = %self.job, "poll cancelled");
                return;
            }

            let report = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.api.fetch_status(&self.job) => match result {
                    Ok(report) => report,
                    Err(err) => {
                        warn!(job = %self.job, %err, "status query failed");
                        let _ = self.events.send(PlayerEvent::PollFailed {
                            job: self.job.clone(),
                            message: "Failed to fetch video status".to_string(),
                        });
                        return;
                    }
                },
            };

            let terminal = report.status.is_terminal();
            let _ = self.events.send(PlayerEvent::Status {
                job: self.job.clone(),
                report,
            });
            if terminal {
                debug!(job = %self.job, "terminal status, polling stopped");
                return;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use job_api::{ApiError, JobPhase, RawProbe, StatusReport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Scripted backend: serves each report in order, then repeats the last.
    struct ScriptedApi {
        reports: Vec<Result<StatusReport, ()>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(reports: Vec<Result<StatusReport, ()>>) -> Self {
            Self {
                reports,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VideoApi for ScriptedApi {
        async fn submit(&self, _prompt: &str) -> Result<JobId, ApiError> {
            unimplemented!()
        }

        async fn fetch_status(&self, _job: &JobId) -> Result<StatusReport, ApiError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let entry = self
                .reports
                .get(index)
                .or_else(|| self.reports.last())
                .expect("script is never empty");
            entry.clone().map_err(|_| ApiError::Status {
                status: 500,
                message: "boom".into(),
            })
        }

        async fn probe_media(&self, _job: &JobId) -> Result<RawProbe, ApiError> {
            unimplemented!()
        }

        async fn download(&self, _job: &JobId) -> Result<Vec<u8>, ApiError> {
            unimplemented!()
        }

        fn media_url(&self, job: &JobId) -> String {
            format!("http://localhost:8000/media?id={}", job.as_str())
        }
    }

    fn processing() -> Result<StatusReport, ()> {
        Ok(StatusReport {
            status: JobPhase::Processing,
            message: "Rendering".into(),
            media_ref: None,
        })
    }

    fn completed() -> Result<StatusReport, ()> {
        Ok(StatusReport {
            status: JobPhase::Completed,
            message: "Done".into(),
            media_ref: Some("abc123".into()),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_after_terminal_report() {
        let api = Arc::new(ScriptedApi::new(vec![
            processing(),
            processing(),
            processing(),
            completed(),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = StatusPoller::spawn(
            api.clone(),
            JobId::from("abc123"),
            Duration::from_secs(3),
            tx,
            CancellationToken::new(),
        );

        handle.await.unwrap();
        assert_eq!(api.call_count(), 4);

        let mut phases = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::Status { report, .. } = event {
                phases.push(report.status);
            }
        }
        assert_eq!(
            phases,
            vec![
                JobPhase::Processing,
                JobPhase::Processing,
                JobPhase::Processing,
                JobPhase::Completed
            ]
        );

        // No further queries are ever scheduled.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_ends_polling_as_failed() {
        let api = Arc::new(ScriptedApi::new(vec![processing(), Err(())]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = StatusPoller::spawn(
            api.clone(),
            JobId::from("abc123"),
            Duration::from_secs(3),
            tx,
            CancellationToken::new(),
        );

        handle.await.unwrap();
        assert_eq!(api.call_count(), 2);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PlayerEvent::PollFailed { .. }) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_the_scheduled_query() {
        let api = Arc::new(ScriptedApi::new(vec![processing()]));
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = StatusPoller::spawn(
            api.clone(),
            JobId::from("abc123"),
            Duration::from_secs(3),
            tx,
            cancel.clone(),
        );

        // Let the first query land, then cancel during the sleep.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.call_count(), 1);
        cancel.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.call_count(), 1);
    }
}
