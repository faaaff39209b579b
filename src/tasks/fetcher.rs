use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::drive::DriveClient;
use crate::photos::Gallery;

/// Polls the remote folder and publishes the gallery.
///
/// This is the only task that ever replaces the photo list. Each fetch is
/// awaited inline and missed ticks are skipped, so two requests for the same
/// slot are never in flight at once.
///
/// Rules per fetch:
/// - non-empty listing: replace the gallery wholesale;
/// - empty listing: keep the previous gallery (a transient empty page must
///   not blank the display);
/// - fallback-only listing (the client folds missing config and remote
///   failures into the placeholder set) while real photos are held: keep
///   the photos, surface the warning. The interval never stops.
pub async fn run(
    client: Arc<DriveClient>,
    poll_interval: Duration,
    gallery_tx: watch::Sender<Gallery>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting fetcher task");
                break;
            }

            _ = ticker.tick() => {
                let listing = client.list_photos().await;
                if listing.photos.is_empty() {
                    debug!("empty listing; keeping previous gallery");
                    continue;
                }
                let holding_real_photos = {
                    let current = gallery_tx.borrow();
                    !current.is_empty() && current.photos.iter().any(|p| !p.placeholder)
                };
                if listing.is_fallback() && holding_real_photos {
                    warn!("fallback listing; keeping last-known-good gallery");
                    gallery_tx.send_modify(|g| g.warning = listing.warning.clone());
                } else {
                    debug!(count = listing.photos.len(), "publishing refreshed gallery");
                    gallery_tx.send_replace(Gallery::new(listing.photos, listing.warning));
                }
            }
        }
    }
    Ok(())
}
