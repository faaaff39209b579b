use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Configuration;
use crate::drive::DriveClient;
use crate::photos::{Frame, Gallery};
use crate::tasks::{fetcher, rotator};

/// Owns the slideshow's two scheduled tasks for one session.
///
/// Start spawns the fetcher and rotator; shutdown cancels both and drains
/// them, so no poll interval, cadence tick, or outstanding transition timer
/// survives teardown.
pub struct Session {
    cancel: CancellationToken,
    tasks: JoinSet<Result<()>>,
}

/// Read side of the session state, handed to the web surface.
#[derive(Clone)]
pub struct SessionState {
    pub gallery: watch::Receiver<Gallery>,
    pub frame: watch::Receiver<Frame>,
}

impl Session {
    pub fn start(
        cfg: &Configuration,
        client: Arc<DriveClient>,
        cancel: CancellationToken,
    ) -> (Self, SessionState) {
        let (gallery_tx, gallery_rx) = watch::channel(Gallery::default());
        let (frame_tx, frame_rx) = watch::channel(Frame::AwaitingPhotos);

        let mut tasks = JoinSet::new();

        tasks.spawn({
            let client = client.clone();
            let poll_interval = cfg.poll_interval;
            let cancel = cancel.clone();
            async move {
                fetcher::run(client, poll_interval, gallery_tx, cancel)
                    .await
                    .context("fetcher task failed")
            }
        });

        tasks.spawn({
            let slide_duration = cfg.slide_duration;
            let transition_duration = cfg.transition_duration;
            let gallery_rx = gallery_rx.clone();
            let cancel = cancel.clone();
            async move {
                rotator::run(
                    slide_duration,
                    transition_duration,
                    gallery_rx,
                    frame_tx,
                    cancel,
                )
                .await
                .context("rotator task failed")
            }
        });

        info!(
            poll_interval = ?cfg.poll_interval,
            slide_duration = ?cfg.slide_duration,
            transition_duration = ?cfg.transition_duration,
            "slideshow session started"
        );

        (
            Self { cancel, tasks },
            SessionState {
                gallery: gallery_rx,
                frame: frame_rx,
            },
        )
    }

    /// Cancel both tasks and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(error = ?err, "session task exited with error"),
                Err(err) => error!(error = ?err, "session task panicked"),
            }
        }
        info!("slideshow session stopped");
    }
}
