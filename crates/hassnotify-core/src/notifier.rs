// ── Notifier service ──
//
// Subscribes to `state_changed`, evaluates the rules for each event and
// pushes the resulting notifications through the shared client.

use hassnotify_api::HassClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::rules::NotifierConfig;

pub struct Notifier {
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config }
    }

    /// Process events until the stream ends or `shutdown` fires.
    ///
    /// Send failures are logged and skipped. The subscription is removed
    /// before returning.
    pub async fn run(&self, client: &HassClient, shutdown: &CancellationToken) {
        let (mut events, unsubscribe) = client.subscribe_state_changes().await;
        info!(
            people = self.config.household.people.len(),
            locations = self.config.household.locations.len(),
            "notifier started"
        );

        'events: loop {
            let change = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                change = events.recv() => change,
            };
            let Some(change) = change else {
                info!("state change stream ended");
                break;
            };

            let outgoing = self.config.evaluate(&change);
            if outgoing.is_empty() {
                continue;
            }
            debug!(
                entity_id = %change.entity_id,
                old = %change.old_state,
                new = %change.new_state,
                count = outgoing.len(),
                "location change"
            );

            for note in outgoing {
                let sent = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break 'events,
                    sent = client.send_notification(&note.device, &note.title, &note.body, &note.options) => sent,
                };
                match sent {
                    Ok(id) => info!(
                        id,
                        device = %note.device,
                        movement = %note.movement,
                        entity_id = %change.entity_id,
                        "notification sent"
                    ),
                    Err(e) if e.is_closed() => {
                        info!("client closed, stopping notifier");
                        break 'events;
                    }
                    Err(e) => warn!(
                        error = %e,
                        device = %note.device,
                        "failed to send notification"
                    ),
                }
            }
        }

        // A reader blocked on our full queue holds the registry lock until
        // the receiver goes away.
        drop(events);
        unsubscribe.unsubscribe().await;
        info!("notifier stopped");
    }
}
