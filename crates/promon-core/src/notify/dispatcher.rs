use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use super::{Notifier, NotifyError};
use crate::config::DEFAULT_NOTIFY_TIMEOUT;
use crate::monitor::error::panic_message;
use crate::monitor::event::NotificationEvent;

/// Per-channel results of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, NotifyError)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans one event out to every registered channel, in registration order.
///
/// Each channel runs inside its own failure boundary: an error, a panic or a
/// missed deadline is logged and the remaining channels still run. No retries.
pub struct NotificationDispatcher {
    notifiers: Vec<Box<dyn Notifier>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            notifiers,
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for notifier in &self.notifiers {
            let channel = notifier.name().to_string();
            match self.deliver(notifier.as_ref(), event).await {
                Ok(()) => {
                    debug!(
                        channel = %channel,
                        event_id = %event.id,
                        kind = %event.kind,
                        subject = %event.subject,
                        "Notification delivered"
                    );
                    report.delivered.push(channel);
                }
                Err(e) => {
                    warn!(
                        channel = %channel,
                        event_id = %event.id,
                        subject = %event.subject,
                        error = %e,
                        "Failed to notify"
                    );
                    report.failed.push((channel, e));
                }
            }
        }

        report
    }

    async fn deliver(
        &self,
        notifier: &dyn Notifier,
        event: &NotificationEvent,
    ) -> Result<(), NotifyError> {
        let call = AssertUnwindSafe(notifier.notify(
            &event.subject,
            &event.body,
            event.context.as_ref(),
        ))
        .catch_unwind();

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(NotifyError::Panic(panic_message(payload.as_ref()))),
            Err(_) => Err(NotifyError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::notify::NotifyContext;

    type Calls = Arc<Mutex<Vec<(String, String, String)>>>;

    struct Recorder {
        name: &'static str,
        calls: Calls,
    }

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn notify(
            &self,
            subject: &str,
            body: &str,
            _context: Option<&NotifyContext>,
        ) -> Result<(), NotifyError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.name.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn notify(
            &self,
            _subject: &str,
            _body: &str,
            _context: Option<&NotifyContext>,
        ) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp server unavailable".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Notifier for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn notify(
            &self,
            _subject: &str,
            _body: &str,
            _context: Option<&NotifyContext>,
        ) -> Result<(), NotifyError> {
            panic!("channel exploded")
        }
    }

    struct Hanging;

    #[async_trait]
    impl Notifier for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn notify(
            &self,
            _subject: &str,
            _body: &str,
            _context: Option<&NotifyContext>,
        ) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn recorder(name: &'static str, calls: &Calls) -> Box<dyn Notifier> {
        Box::new(Recorder {
            name,
            calls: Arc::clone(calls),
        })
    }

    #[tokio::test]
    async fn delivers_to_all_in_order() {
        let calls = Calls::default();
        let dispatcher = NotificationDispatcher::new(vec![
            recorder("first", &calls),
            recorder("second", &calls),
        ]);

        let report = dispatcher
            .dispatch(&NotificationEvent::startup(7))
            .await;

        assert!(report.all_delivered());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "first");
        assert_eq!(calls[1].0, "second");
        assert_eq!(calls[0].1, "started");
        assert_eq!(calls[0].2, "running with PID: 7");
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_later_channels() {
        let calls = Calls::default();
        let dispatcher = NotificationDispatcher::new(vec![
            Box::new(Failing),
            Box::new(Panicking),
            recorder("after", &calls),
        ]);

        let report = dispatcher
            .dispatch(&NotificationEvent::resolved("http://a.test"))
            .await;

        assert_eq!(report.delivered, vec!["after".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(report.failed[0].1, NotifyError::Delivery(_)));
        assert!(matches!(report.failed[1].1, NotifyError::Panic(ref m) if m == "channel exploded"));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_channel_times_out() {
        let calls = Calls::default();
        let dispatcher =
            NotificationDispatcher::new(vec![Box::new(Hanging), recorder("after", &calls)])
                .with_timeout(Duration::from_secs(2));

        let report = dispatcher
            .dispatch(&NotificationEvent::internal_error("boom"))
            .await;

        assert!(matches!(
            report.failed[0].1,
            NotifyError::Timeout { timeout_ms: 2000 }
        ));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let dispatcher = NotificationDispatcher::new(Vec::new());
        assert!(dispatcher.is_empty());
        let report = dispatcher.dispatch(&NotificationEvent::shutdown(1)).await;
        assert!(report.delivered.is_empty());
        assert!(report.all_delivered());
    }
}
