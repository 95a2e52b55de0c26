use std::sync::Arc;

use tracing::{info, warn};

use ledgergate_accounting::{AccountingEngine, GatewayConfig, LedgerGateway};
use ledgergate_events::{DisabledNotifier, TransferNotifier};
use ledgergate_infra::{
    InMemoryEngine, NotificationDispatcher, ReconnectPolicy, RedisStreamsPublisher, Settings,
};

/// Process-wide collaborators shared by every request.
#[derive(Debug)]
pub struct AppServices {
    pub gateway: LedgerGateway,
    dispatcher: Option<Arc<NotificationDispatcher>>,
}

impl AppServices {
    pub fn new(gateway: LedgerGateway, dispatcher: Option<Arc<NotificationDispatcher>>) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    /// In-memory engine, notifications disabled (dev/test).
    pub fn in_memory(config: GatewayConfig) -> Self {
        let gateway = LedgerGateway::new(
            Arc::new(InMemoryEngine::new()),
            Arc::new(DisabledNotifier),
            config,
        );
        Self::new(gateway, None)
    }

    /// Drain pending notifications and release the broker connection.
    pub async fn shutdown(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown().await;
        }
    }
}

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let engine: Arc<dyn AccountingEngine> = Arc::new(InMemoryEngine::new());
    info!("using in-memory accounting engine");

    let (notifier, dispatcher): (Arc<dyn TransferNotifier>, _) = match &settings.notify {
        None => (Arc::new(DisabledNotifier) as Arc<dyn TransferNotifier>, None),
        Some(notify) => {
            let publisher =
                RedisStreamsPublisher::new(&notify.redis_url, &notify.route, ReconnectPolicy::default())?;
            // Publishes reconnect on demand.
            if let Err(e) = publisher.connect().await {
                warn!(error = %e, stream_key = publisher.stream_key(), "broker unreachable at startup");
            }
            let dispatcher = Arc::new(NotificationDispatcher::spawn(
                Arc::new(publisher),
                notify.delivery.clone(),
            ));
            (dispatcher.clone() as Arc<dyn TransferNotifier>, Some(dispatcher))
        }
    };

    let gateway = LedgerGateway::new(engine, notifier, settings.gateway_config()?);
    Ok(AppServices::new(gateway, dispatcher))
}
