use tenantry_events::PlatformEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Log every event published on the bus until cancelled or the bus closes.
///
/// Returns the number of events seen.
pub async fn log_events(
    mut receiver: broadcast::Receiver<PlatformEvent>,
    cancel: CancellationToken,
) -> u64 {
    let mut seen = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = receiver.recv() => match received {
                Ok(event) => {
                    seen += 1;
                    tracing::info!(
                        event_type = %event.event_type,
                        onboarding_id = ?event.source_entity_id,
                        actor = event.actor.as_deref().unwrap_or("-"),
                        "Domain event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event listener lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, listener shutting down");
                    break;
                }
            },
        }
    }
    seen
}
