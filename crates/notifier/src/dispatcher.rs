//! NotifyDispatcher - main loop for fan-out to notifiers

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{Notification, NotifierConfig, NotifierType};

use crate::error::NotifierError;
use crate::handle::NotifierHandle;
use crate::metrics::MetricsSnapshot;
use crate::notifiers::{FileNotifier, HttpNotifier, LogNotifier};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct NotifyDispatcherConfig {
    /// Notifier configurations
    pub notifiers: Vec<NotifierConfig>,
}

/// Builder for creating a NotifyDispatcher
pub struct NotifyDispatcherBuilder {
    config: NotifyDispatcherConfig,
    input_rx: mpsc::Receiver<Notification>,
}

impl NotifyDispatcherBuilder {
    pub fn new(config: NotifyDispatcherConfig, input_rx: mpsc::Receiver<Notification>) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "notify_dispatcher_build", skip(self))]
    pub fn build(self) -> Result<NotifyDispatcher, NotifierError> {
        let handles = Self::initialize_handles(&self.config)?;

        Ok(NotifyDispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "notify_dispatcher_initialize_handles",
        skip(config),
        fields(notifier_count = config.notifiers.len())
    )]
    fn initialize_handles(
        config: &NotifyDispatcherConfig,
    ) -> Result<Vec<NotifierHandle>, NotifierError> {
        let mut handles = Vec::with_capacity(config.notifiers.len());
        for notifier_config in &config.notifiers {
            handles.push(create_notifier_handle(notifier_config)?);
        }
        Ok(handles)
    }
}

/// Create a NotifierHandle from configuration
#[instrument(
    name = "notify_dispatcher_create_handle",
    skip(config),
    fields(notifier = %config.name, notifier_type = ?config.notifier_type)
)]
fn create_notifier_handle(config: &NotifierConfig) -> Result<NotifierHandle, NotifierError> {
    match config.notifier_type {
        NotifierType::Log => {
            let notifier = LogNotifier::new(&config.name);
            Ok(NotifierHandle::spawn(notifier, config.queue_capacity))
        }
        NotifierType::File => {
            let notifier = FileNotifier::from_params(&config.name, &config.params)
                .map_err(|e| NotifierError::creation(&config.name, e.to_string()))?;
            Ok(NotifierHandle::spawn(notifier, config.queue_capacity))
        }
        NotifierType::Http => {
            let notifier = HttpNotifier::from_params(&config.name, &config.params)
                .map_err(|e| NotifierError::creation(&config.name, e))?;
            Ok(NotifierHandle::spawn(notifier, config.queue_capacity))
        }
    }
}

/// The main dispatcher that fans out notifications
pub struct NotifyDispatcher {
    handles: Vec<NotifierHandle>,
    input_rx: mpsc::Receiver<Notification>,
}

impl NotifyDispatcher {
    /// Create a dispatcher with custom handles (for testing)
    pub fn with_handles(handles: Vec<NotifierHandle>, input_rx: mpsc::Receiver<Notification>) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all notifiers
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes notifications from input and fans out to all handles.
    /// Returns when the input channel is closed.
    #[instrument(name = "notify_dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(notifiers = self.handles.len(), "Notify dispatcher started");

        let mut event_count: u64 = 0;

        while let Some(notification) = self.input_rx.recv().await {
            event_count += 1;
            for handle in &self.handles {
                handle.try_send(notification.clone());
            }

            if event_count.is_multiple_of(100) {
                debug!(events = event_count, "Notify dispatcher progress");
            }
        }

        info!(
            events = event_count,
            "Notify dispatcher input closed, shutting down"
        );

        for handle in self.handles {
            handle.shutdown().await;
        }

        info!("Notify dispatcher shutdown complete");
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

/// Convenience function to create a dispatcher from notifier configs
#[instrument(name = "notify_dispatcher_create", skip(notifier_configs, input_rx))]
pub fn create_dispatcher(
    notifier_configs: Vec<NotifierConfig>,
    input_rx: mpsc::Receiver<Notification>,
) -> Result<NotifyDispatcher, NotifierError> {
    let config = NotifyDispatcherConfig {
        notifiers: notifier_configs,
    };
    NotifyDispatcherBuilder::new(config, input_rx).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            NotifierHandle::spawn(LogNotifier::new("n1"), 10),
            NotifierHandle::spawn(LogNotifier::new("n2"), 10),
        ];

        let dispatcher = NotifyDispatcher::with_handles(handles, input_rx);
        let handle = dispatcher.spawn();

        for i in 0..5 {
            input_tx
                .send(Notification::Position {
                    uid: format!("u{i}"),
                    distance: i as f64,
                    thumbnail: None,
                })
                .await
                .unwrap();
        }

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn create_dispatcher_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![NotifierConfig {
            name: "test_log".to_string(),
            notifier_type: NotifierType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(configs, input_rx).unwrap();
        let handle = dispatcher.spawn();

        input_tx
            .send(Notification::Eol {
                uid: "u1".to_string(),
            })
            .await
            .unwrap();

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn http_notifier_requires_base_url() {
        let configs = vec![NotifierConfig {
            name: "bad_http".to_string(),
            notifier_type: NotifierType::Http,
            queue_capacity: 10,
            params: HashMap::new(),
        }];

        let (_tx, rx) = mpsc::channel::<Notification>(1);
        assert!(create_dispatcher(configs, rx).is_err());
    }
}
