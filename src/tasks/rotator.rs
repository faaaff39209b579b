use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::watch;
use tokio::time::{Instant, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::photos::{Frame, Gallery, SlideFrame};

/// Position of the display within the current gallery.
///
/// `current` is always valid for the list length it was last synced or
/// committed against; commits recompute the pending index modulo the length at
/// commit time, so a list that shrank mid-transition clamps instead of
/// indexing out of range.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayCursor {
    current: usize,
    pending: Option<usize>,
    epoch: u64,
}

impl DisplayCursor {
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Bumped once per committed swap; the rendering layer remounts the base
    /// layer's animation whenever it changes.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn in_transition(&self) -> bool {
        self.pending.is_some()
    }

    /// Clamp `current` against the list as it is now. An empty list resets to
    /// index 0 with nothing rendered.
    pub fn sync(&mut self, len: usize) {
        if len == 0 {
            self.current = 0;
        } else if self.current >= len {
            self.current %= len;
        }
    }

    /// Start a two-phase swap toward the next photo. A list of one (or none)
    /// never transitions, and a transition already in flight is left alone.
    pub fn begin(&mut self, len: usize) -> Option<usize> {
        if len <= 1 || self.pending.is_some() {
            return None;
        }
        let next = (self.current + 1) % len;
        self.pending = Some(next);
        Some(next)
    }

    /// Commit the pending swap against the list length *now*, not the length
    /// observed when the transition began.
    pub fn commit(&mut self, len: usize) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.current = if len == 0 { 0 } else { pending % len };
        self.epoch += 1;
    }
}

fn frame_for(cursor: &DisplayCursor, gallery: &Gallery) -> Frame {
    match gallery.photos.get(cursor.current()) {
        None => Frame::AwaitingPhotos,
        Some(photo) => Frame::Showing(SlideFrame {
            photo: photo.clone(),
            incoming: cursor
                .pending()
                .and_then(|idx| gallery.photos.get(idx))
                .cloned(),
            index: cursor.current(),
            total: gallery.len(),
            epoch: cursor.epoch(),
        }),
    }
}

/// Advances the display through the gallery on a fixed cadence, publishing a
/// frame for every visual change.
///
/// Purely local state transitions; the only I/O is the watch channels. The
/// one-shot commit delay lives inside the task, so cancelling the task also
/// clears any outstanding transition timer.
pub async fn run(
    slide_duration: Duration,
    transition_duration: Duration,
    mut gallery_rx: watch::Receiver<Gallery>,
    frame_tx: watch::Sender<Frame>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut cursor = DisplayCursor::default();
    // Full dwell on the first photo before the first swap.
    let mut ticker = interval_at(Instant::now() + slide_duration, slide_duration);

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting rotator task");
                break;
            }

            // The gallery was replaced while idle. Re-clamp and republish so
            // the view reflects the new list without waiting for a tick.
            changed = gallery_rx.changed() => {
                if changed.is_err() {
                    debug!("gallery channel closed; exiting rotator task");
                    break;
                }
                let gallery = gallery_rx.borrow_and_update().clone();
                cursor.sync(gallery.len());
                frame_tx.send_replace(frame_for(&cursor, &gallery));
            }

            _ = ticker.tick() => {
                let gallery = gallery_rx.borrow().clone();
                cursor.sync(gallery.len());
                let Some(next) = cursor.begin(gallery.len()) else {
                    // Zero or one photo: stay idle. Republish so an empty
                    // gallery shows the awaiting screen even before any
                    // change notification.
                    frame_tx.send_replace(frame_for(&cursor, &gallery));
                    continue;
                };
                debug!(from = cursor.current(), to = next, "transition started");
                frame_tx.send_replace(frame_for(&cursor, &gallery));

                select! {
                    _ = cancel.cancelled() => {
                        info!("cancel received mid-transition; exiting rotator task");
                        break;
                    }
                    _ = sleep(transition_duration) => {
                        // The fetcher may have replaced the gallery while the
                        // crossfade ran; commit against the length it has now.
                        let gallery = gallery_rx.borrow_and_update().clone();
                        cursor.commit(gallery.len());
                        frame_tx.send_replace(frame_for(&cursor, &gallery));
                    }
                }
            }
        }
    }
    Ok(())
}
