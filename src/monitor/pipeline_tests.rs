//! End-to-end tests from a real file system watch to delivery.

#[cfg(test)]
mod tests {
    use std::{
        fs::write,
        sync::Arc,
        time::{Duration, Instant},
    };

    use {parking_lot::Mutex, tempfile::TempDir, tokio::{runtime::Handle, time::sleep}};

    use crate::{
        bus::{EventBus, NotificationRequest},
        config::{ExtensionRule, NotifierSettings, WatchedFolder},
        error::DeliveryError,
        monitor::{DebounceEngine, MonitorConfig, WatchCoordinator},
        notifications::{Delivery, NotificationAssembler, OutboundNotification},
        parsers::ParserRegistry,
    };

    #[derive(Default)]
    struct RecordingDelivery {
        sent: Mutex<Vec<(String, OutboundNotification)>>,
    }

    impl Delivery for RecordingDelivery {
        fn deliver(
            &self,
            target: &str,
            notification: &OutboundNotification,
        ) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .push((target.to_string(), notification.clone()));
            Ok(())
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        let started = Instant::now();
        while started.elapsed() < Duration::from_secs(5) {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        condition()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_written_file_reaches_delivery() {
        let temp_dir = TempDir::new().unwrap();
        let folder = WatchedFolder::new(
            temp_dir.path(),
            "https://hooks/docs",
            vec![ExtensionRule::new("txt", None)],
        );
        let settings = NotifierSettings {
            folders: vec![folder.clone()],
            debounce_interval_ms: 200,
            ..NotifierSettings::default()
        };

        let bus = Arc::new(EventBus::new());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&requests);
        bus.subscribe(move |request: &NotificationRequest| {
            sink.lock().push(request.clone());
            Ok(())
        });

        ParserRegistry::with_defaults(&settings).attach(&bus);
        let delivery = Arc::new(RecordingDelivery::default());
        Arc::new(NotificationAssembler::new(delivery.clone(), settings.folders.clone()))
            .attach(&bus);

        let engine = DebounceEngine::new(
            Arc::clone(&bus),
            MonitorConfig::from(&settings),
            Handle::current(),
        );
        let coordinator = WatchCoordinator::new(Arc::clone(&bus), engine);
        let summary = coordinator.start(&settings.folders);
        assert_eq!(summary.watched.len(), 1);

        write(temp_dir.path().join("ignored.json"), "{}").unwrap();
        write(temp_dir.path().join("notes.txt"), "first draft").unwrap();

        assert!(wait_for(|| !delivery.sent.lock().is_empty()).await);
        // Let any trailing events settle before checking for duplicates.
        sleep(Duration::from_millis(500)).await;

        let requests = requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file_name, "notes.txt");
        assert_eq!(requests[0].body, "first draft");

        let sent = delivery.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://hooks/docs");
        assert_eq!(sent[0].1.title, ".TXT File Updated");

        drop(sent);
        coordinator.stop();
        assert_eq!(coordinator.engine().pending_count(), 0);
    }
}
