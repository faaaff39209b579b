use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use photo_kiosk::config::{Configuration, DriveConfig};
use photo_kiosk::drive::DriveClient;
use photo_kiosk::photos::{Frame, Gallery, PhotoItem};
use photo_kiosk::session::Session;
use photo_kiosk::tasks::{fetcher, rotator};

const WAIT: Duration = Duration::from_secs(5);

fn drive_config(server: &ServerGuard) -> DriveConfig {
    DriveConfig {
        api_key: Some("test-key".to_string()),
        folder_id: Some("folder-123".to_string()),
        upload_token: None,
        share_url: None,
        api_base_url: server.url(),
        upload_base_url: server.url(),
        page_size: 100,
    }
}

fn photos_with(prefix: &str, n: usize) -> Vec<PhotoItem> {
    (0..n)
        .map(|i| PhotoItem {
            id: format!("{prefix}-{i}"),
            name: format!("photo-{i}.jpg"),
            display_url: format!("https://example.com/{prefix}/{i}"),
            thumbnail_url: format!("https://example.com/{prefix}/{i}/thumb"),
            placeholder: false,
        })
        .collect()
}

fn real_photos(n: usize) -> Vec<PhotoItem> {
    photos_with("real", n)
}

fn listing_body(ids: &[&str]) -> String {
    let files: Vec<String> = ids
        .iter()
        .map(|id| format!(r#"{{"id":"{id}","name":"{id}.jpg","mimeType":"image/jpeg"}}"#))
        .collect();
    format!(r#"{{"files":[{}]}}"#, files.join(","))
}

async fn wait_for_gallery(
    rx: &mut watch::Receiver<Gallery>,
    predicate: impl Fn(&Gallery) -> bool,
) -> Gallery {
    timeout(WAIT, rx.wait_for(|g| predicate(g)))
        .await
        .expect("timed out waiting for gallery update")
        .expect("gallery channel closed")
        .clone()
}

async fn wait_for_frame(
    rx: &mut watch::Receiver<Frame>,
    predicate: impl Fn(&Frame) -> bool,
) -> Frame {
    timeout(WAIT, rx.wait_for(|f| predicate(f)))
        .await
        .expect("timed out waiting for frame update")
        .expect("frame channel closed")
        .clone()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetcher_publishes_fresh_listing() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(listing_body(&["a", "b"]))
        .create_async()
        .await;

    let client = Arc::new(DriveClient::new(drive_config(&server)).unwrap());
    let (gallery_tx, mut gallery_rx) = watch::channel(Gallery::default());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(fetcher::run(
        client,
        Duration::from_millis(20),
        gallery_tx,
        cancel.clone(),
    ));

    let gallery = wait_for_gallery(&mut gallery_rx, |g| !g.is_empty()).await;
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery.photos[0].id, "a");
    assert!(gallery.warning.is_none());

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_failure_keeps_last_known_good_gallery() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/files")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = Arc::new(DriveClient::new(drive_config(&server)).unwrap());
    let (gallery_tx, mut gallery_rx) = watch::channel(Gallery::new(real_photos(3), None));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(fetcher::run(
        client,
        Duration::from_millis(20),
        gallery_tx,
        cancel.clone(),
    ));

    let gallery = wait_for_gallery(&mut gallery_rx, |g| g.warning.is_some()).await;
    assert_eq!(gallery.len(), 3, "previous photos must be retained");
    assert!(gallery.photos.iter().all(|p| !p.placeholder));

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_listing_does_not_overwrite_previous_gallery() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"files":[]}"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let client = Arc::new(DriveClient::new(drive_config(&server)).unwrap());
    let (gallery_tx, gallery_rx) = watch::channel(Gallery::new(real_photos(2), None));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(fetcher::run(
        client,
        Duration::from_millis(20),
        gallery_tx,
        cancel.clone(),
    ));

    // Let several empty fetches complete, then check nothing changed.
    timeout(WAIT, async {
        loop {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("fetches never reached the mock");

    let gallery = gallery_rx.borrow().clone();
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery.photos[0].id, "real-0");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotator_advances_through_the_gallery() {
    let (gallery_tx, gallery_rx) = watch::channel(Gallery::new(real_photos(3), None));
    let (frame_tx, mut frame_rx) = watch::channel(Frame::AwaitingPhotos);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(rotator::run(
        Duration::from_millis(40),
        Duration::from_millis(10),
        gallery_rx,
        frame_tx,
        cancel.clone(),
    ));
    // Nudge the change branch so the first frame publishes immediately.
    gallery_tx.send_modify(|_| {});

    let first = wait_for_frame(&mut frame_rx, |f| matches!(f, Frame::Showing(_))).await;
    let Frame::Showing(first) = first else {
        unreachable!()
    };
    assert_eq!(first.index, 0);
    assert_eq!(first.total, 3);

    let advanced = wait_for_frame(&mut frame_rx, |f| {
        matches!(f, Frame::Showing(s) if s.index == 1 && s.incoming.is_none())
    })
    .await;
    let Frame::Showing(advanced) = advanced else {
        unreachable!()
    };
    assert_eq!(advanced.epoch, 1, "one committed swap");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_gallery_swap_republishes_frame_without_epoch_bump() {
    let (gallery_tx, gallery_rx) = watch::channel(Gallery::new(real_photos(2), None));
    let (frame_tx, mut frame_rx) = watch::channel(Frame::AwaitingPhotos);
    let cancel = CancellationToken::new();
    // Slide duration far beyond the test so no tick fires; every frame comes
    // from the gallery-change branch.
    let handle = tokio::spawn(rotator::run(
        Duration::from_secs(600),
        Duration::from_millis(10),
        gallery_rx,
        frame_tx,
        cancel.clone(),
    ));
    gallery_tx.send_modify(|_| {});

    let first = wait_for_frame(&mut frame_rx, |f| matches!(f, Frame::Showing(_))).await;
    let Frame::Showing(first) = first else {
        unreachable!()
    };
    assert_eq!(first.photo.id, "real-0");
    assert_eq!(first.epoch, 0);

    // A new upload reorders the most-recent-first listing; the base photo
    // changes without any committed swap.
    gallery_tx.send_replace(Gallery::new(photos_with("swapped", 2), None));

    let swapped = wait_for_frame(&mut frame_rx, |f| {
        matches!(f, Frame::Showing(s) if s.photo.id == "swapped-0")
    })
    .await;
    let Frame::Showing(swapped) = swapped else {
        unreachable!()
    };
    assert_eq!(swapped.epoch, 0, "no swap committed, epoch must not move");
    assert!(swapped.incoming.is_none());

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotator_survives_shrink_during_transition() {
    let (gallery_tx, gallery_rx) = watch::channel(Gallery::new(real_photos(3), None));
    let (frame_tx, mut frame_rx) = watch::channel(Frame::AwaitingPhotos);
    let cancel = CancellationToken::new();
    // Long transition so the gallery swap lands mid-crossfade.
    let handle = tokio::spawn(rotator::run(
        Duration::from_millis(30),
        Duration::from_millis(300),
        gallery_rx,
        frame_tx,
        cancel.clone(),
    ));

    let _ = wait_for_frame(&mut frame_rx, |f| {
        matches!(f, Frame::Showing(s) if s.incoming.is_some())
    })
    .await;

    gallery_tx.send_replace(Gallery::new(real_photos(1), None));

    let committed = wait_for_frame(&mut frame_rx, |f| {
        matches!(f, Frame::Showing(s) if s.incoming.is_none() && s.epoch > 0)
    })
    .await;
    let Frame::Showing(committed) = committed else {
        unreachable!()
    };
    assert!(
        committed.index < committed.total,
        "index {} out of range for list of {}",
        committed.index,
        committed.total
    );
    assert_eq!(committed.total, 1);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotator_shows_awaiting_screen_for_empty_gallery() {
    let (gallery_tx, gallery_rx) = watch::channel(Gallery::default());
    let (frame_tx, mut frame_rx) = watch::channel(Frame::AwaitingPhotos);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(rotator::run(
        Duration::from_millis(20),
        Duration::from_millis(5),
        gallery_rx,
        frame_tx,
        cancel.clone(),
    ));

    // Several ticks pass; the frame must stay in the awaiting state.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(*frame_rx.borrow_and_update(), Frame::AwaitingPhotos);

    // Photos arriving later start the rotation.
    gallery_tx.send_replace(Gallery::new(real_photos(2), None));
    let frame = wait_for_frame(&mut frame_rx, |f| matches!(f, Frame::Showing(_))).await;
    let Frame::Showing(frame) = frame else {
        unreachable!()
    };
    assert_eq!(frame.total, 2);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_shutdown_stops_both_tasks() {
    let server = Server::new_async().await;
    let mut cfg = Configuration::default();
    cfg.poll_interval = Duration::from_millis(20);
    cfg.slide_duration = Duration::from_millis(20);
    cfg.transition_duration = Duration::from_millis(5);
    // Unconfigured credentials: the session runs on the placeholder set.
    let mut drive_cfg = drive_config(&server);
    drive_cfg.api_key = None;
    drive_cfg.folder_id = None;
    let client = Arc::new(DriveClient::new(drive_cfg).unwrap());

    let cancel = CancellationToken::new();
    let (session, state) = Session::start(&cfg, client, cancel.child_token());

    let mut frame_rx = state.frame.clone();
    let frame = wait_for_frame(&mut frame_rx, |f| matches!(f, Frame::Showing(_))).await;
    let Frame::Showing(frame) = frame else {
        unreachable!()
    };
    assert!(frame.photo.placeholder);

    timeout(WAIT, session.shutdown())
        .await
        .expect("shutdown must terminate both tasks");

    // No timer survives teardown: the frame stream goes quiet.
    frame_rx.borrow_and_update();
    let idle = timeout(Duration::from_millis(200), frame_rx.changed()).await;
    match idle {
        Err(_elapsed) => {}
        Ok(res) => assert!(res.is_err(), "frame sender should be gone after shutdown"),
    }
}
