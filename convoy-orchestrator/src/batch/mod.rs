//! Batch Module
//!
//! Fans a sequence of steps out to every instance of a set concurrently.
//!
//! Each instance runs the steps in order on its own task and stops at its
//! first failing step. Outcomes are funneled through one channel, numbered,
//! and forwarded to the caller's [`ProgressSink`] as they complete. Once all
//! tasks finished the instances are partitioned into succeeded and failed,
//! preserving the input order.

mod progress;
mod step;

pub use progress::ProgressSink;
pub use step::Step;

use convoy_core::domain::instance::InstanceSet;
use convoy_core::domain::progress::{ProgressEvent, ProgressStatus};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::transport::InstanceTransport;

/// Maps an HTTP status code onto a progress status
pub type Classifier = fn(u16) -> ProgressStatus;

/// 2xx is Ok, 3xx is a non-fatal Warning, anything else is an Error
pub fn default_classifier(code: u16) -> ProgressStatus {
    match code {
        200..=299 => ProgressStatus::Ok,
        300..=399 => ProgressStatus::Warning,
        _ => ProgressStatus::Error,
    }
}

/// Like [`default_classifier`] but a 404 only warns
///
/// Used when removing something that may legitimately not exist yet.
pub fn missing_ok_classifier(code: u16) -> ProgressStatus {
    if code == 404 {
        ProgressStatus::Warning
    } else {
        default_classifier(code)
    }
}

/// Partition of a batch's instances by the outcome of their last attempted step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: InstanceSet,
    pub failed: InstanceSet,
}

impl BatchReport {
    /// Whether every instance completed every step
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Result of one instance step, as seen by the forwarding loop
struct StepOutcome {
    instance: String,
    status: ProgressStatus,
    code: u16,
    message: String,
}

/// Executes batches against instances through an [`InstanceTransport`]
#[derive(Clone)]
pub struct BatchProcessor {
    transport: Arc<dyn InstanceTransport>,
}

impl BatchProcessor {
    pub fn new(transport: Arc<dyn InstanceTransport>) -> Self {
        Self { transport }
    }

    /// Run `steps` on every instance and stream one event per step outcome
    ///
    /// A `Starting` event precedes and a `Complete` event follows the
    /// per-instance events. Transport failures are reported with code `0`.
    pub async fn execute(
        &self,
        label: &str,
        instances: &InstanceSet,
        steps: &[Step],
        classify: Classifier,
        progress: &ProgressSink,
    ) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %batch_id, label);

        self.run(label, instances, steps, classify, progress)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        label: &str,
        instances: &InstanceSet,
        steps: &[Step],
        classify: Classifier,
        progress: &ProgressSink,
    ) -> BatchReport {
        let total = instances.len();
        tracing::info!("Starting batch on {} instance(s)", total);
        progress.send(ProgressEvent::starting(label, total));

        let steps: Arc<[Step]> = steps.to_vec().into();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for (index, instance) in instances.iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let steps = Arc::clone(&steps);
            let instance = instance.clone();
            let tx = tx.clone();

            tasks.spawn(
                async move {
                    let succeeded = run_instance(transport, instance, steps, classify, tx).await;
                    (index, succeeded)
                }
                .in_current_span(),
            );
        }
        drop(tx);

        // Single forwarder: events are numbered in completion order
        let mut item = 0;
        while let Some(outcome) = rx.recv().await {
            item += 1;
            progress.send(ProgressEvent {
                status: outcome.status,
                message: outcome.message,
                code: outcome.code,
                instance: Some(outcome.instance),
                item,
                total,
            });
        }

        let mut succeeded = vec![false; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, ok)) => succeeded[index] = ok,
                Err(e) => tracing::error!("Instance task failed: {}", e),
            }
        }

        let mut report = BatchReport::default();
        let (ok, failed): (Vec<_>, Vec<_>) = instances
            .iter()
            .zip(succeeded)
            .partition(|(_, ok)| *ok);
        report.succeeded = ok.into_iter().map(|(i, _)| i.clone()).collect();
        report.failed = failed.into_iter().map(|(i, _)| i.clone()).collect();

        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        progress.send(ProgressEvent::complete(
            format!(
                "{}: {} succeeded, {} failed",
                label,
                report.succeeded.len(),
                report.failed.len()
            ),
            total,
        ));

        report
    }
}

/// Run every step on one instance, stopping at the first failure
async fn run_instance(
    transport: Arc<dyn InstanceTransport>,
    instance: String,
    steps: Arc<[Step]>,
    classify: Classifier,
    tx: mpsc::UnboundedSender<StepOutcome>,
) -> bool {
    for step in steps.iter() {
        let outcome = match transport.send(&instance, step).await {
            Ok(response) => StepOutcome {
                instance: instance.clone(),
                status: classify(response.status),
                code: response.status,
                message: format!("{}: {}", step, response.message),
            },
            Err(e) => StepOutcome {
                instance: instance.clone(),
                status: ProgressStatus::Error,
                code: 0,
                message: format!("{}: {}", step, e),
            },
        };

        let ok = outcome.status.is_success();
        if !ok {
            tracing::warn!("Step failed on {}: {}", instance, outcome.message);
        }

        // The forwarder outlives every sender, so this only fails during shutdown
        let _ = tx.send(outcome);

        if !ok {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use reqwest::Method;

    fn instances(names: &[&str]) -> InstanceSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_default_classifier() {
        assert_eq!(default_classifier(200), ProgressStatus::Ok);
        assert_eq!(default_classifier(204), ProgressStatus::Ok);
        assert_eq!(default_classifier(304), ProgressStatus::Warning);
        assert_eq!(default_classifier(404), ProgressStatus::Error);
        assert_eq!(default_classifier(500), ProgressStatus::Error);
        assert_eq!(missing_ok_classifier(404), ProgressStatus::Warning);
        assert_eq!(missing_ok_classifier(409), ProgressStatus::Error);
    }

    #[tokio::test]
    async fn test_partition_is_complete_and_disjoint() {
        let transport = MockTransport::new();
        transport.respond("h2", "containers/create", 500);
        transport.unreachable("h4", "containers/create");
        let processor = BatchProcessor::new(transport.clone());
        let (sink, _rx) = ProgressSink::channel();

        let set = instances(&["h1", "h2", "h3", "h4"]);
        let report = processor
            .execute(
                "create",
                &set,
                &[Step::new(Method::POST, "containers/create")],
                default_classifier,
                &sink,
            )
            .await;

        assert_eq!(report.total(), set.len());
        assert_eq!(report.succeeded, instances(&["h1", "h3"]));
        assert_eq!(report.failed, instances(&["h2", "h4"]));
        assert!(!report.is_complete());
        assert!(report.succeeded.iter().all(|i| !report.failed.contains(i)));
    }

    #[tokio::test]
    async fn test_failed_step_stops_instance_sequence() {
        let transport = MockTransport::new();
        transport.respond("h1", "rename", 409);
        let processor = BatchProcessor::new(transport.clone());
        let (sink, _rx) = ProgressSink::channel();

        let steps = [
            Step::new(Method::POST, "containers/web_tmp/rename"),
            Step::new(Method::POST, "containers/web/start"),
        ];
        let report = processor
            .execute("rollout", &instances(&["h1", "h2"]), &steps, default_classifier, &sink)
            .await;

        assert_eq!(report.failed, instances(&["h1"]));
        assert_eq!(transport.paths_for("h1"), vec!["containers/web_tmp/rename"]);
        assert_eq!(
            transport.paths_for("h2"),
            vec!["containers/web_tmp/rename", "containers/web/start"]
        );
    }

    #[tokio::test]
    async fn test_warning_does_not_stop_sequence() {
        let transport = MockTransport::new();
        transport.respond("h1", "start", 304);
        let processor = BatchProcessor::new(transport.clone());
        let (sink, _rx) = ProgressSink::channel();

        let steps = [
            Step::new(Method::POST, "containers/web/start"),
            Step::new(Method::POST, "containers/web/restart"),
        ];
        let report = processor
            .execute("start", &instances(&["h1"]), &steps, default_classifier, &sink)
            .await;

        assert!(report.is_complete());
        assert_eq!(transport.paths_for("h1").len(), 2);
    }

    #[tokio::test]
    async fn test_progress_events_are_framed_and_ordered_per_instance() {
        let transport = MockTransport::new();
        let processor = BatchProcessor::new(transport.clone());
        let (sink, mut rx) = ProgressSink::channel();

        let steps = [
            Step::new(Method::POST, "containers/web_tmp/rename"),
            Step::new(Method::POST, "containers/web/start"),
        ];
        processor
            .execute("rollout", &instances(&["h1", "h2", "h3"]), &steps, default_classifier, &sink)
            .await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2 + 3 * 2);

        let first = events.first().unwrap();
        assert_eq!(first.status, ProgressStatus::Starting);
        assert_eq!((first.item, first.total), (0, 3));

        let last = events.last().unwrap();
        assert_eq!(last.status, ProgressStatus::Complete);
        assert_eq!((last.item, last.total), (3, 3));

        let items: Vec<usize> = events[1..events.len() - 1].iter().map(|e| e.item).collect();
        assert_eq!(items, (1..=6).collect::<Vec<_>>());

        for instance in ["h1", "h2", "h3"] {
            let messages: Vec<&str> = events
                .iter()
                .filter(|e| e.instance.as_deref() == Some(instance))
                .map(|e| e.message.as_str())
                .collect();
            assert_eq!(messages.len(), 2);
            assert!(messages[0].contains("rename"));
            assert!(messages[1].contains("start"));
        }
    }

    #[tokio::test]
    async fn test_empty_instance_set() {
        let processor = BatchProcessor::new(MockTransport::new());
        let (sink, mut rx) = ProgressSink::channel();

        let report = processor
            .execute("noop", &InstanceSet::new(), &[], default_classifier, &sink)
            .await;

        assert_eq!(report, BatchReport::default());
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_partition_scopes_compensation_batch() {
        let transport = MockTransport::new();
        transport.respond("h2", "containers/web", 500);
        let processor = BatchProcessor::new(transport.clone());
        let (sink, _rx) = ProgressSink::channel();

        let report = processor
            .execute(
                "remove",
                &instances(&["h1", "h2"]),
                &[Step::new(Method::DELETE, "containers/web")],
                default_classifier,
                &sink,
            )
            .await;

        processor
            .execute(
                "compensate",
                &report.failed,
                &[Step::new(Method::DELETE, "containers/web_tmp")],
                default_classifier,
                &sink,
            )
            .await;

        assert_eq!(transport.instances_hit("web_tmp"), vec!["h2"]);
    }
}
