use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, post};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EventConfig;
use crate::drive::DriveClient;
use crate::error::Error;
use crate::qr;
use crate::session::SessionState;

/// Phone photos routinely run well past axum's 2 MiB default body limit.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    drive: Arc<DriveClient>,
    session: SessionState,
    event: EventConfig,
}

pub fn router(drive: Arc<DriveClient>, session: SessionState, event: EventConfig) -> Router {
    let state = AppState {
        drive,
        session,
        event,
    };
    Router::new()
        .route("/", get(upload_page))
        .route("/slideshow", get(slideshow_page))
        .route("/api/photos", get(api_photos))
        .route("/api/frame", get(api_frame))
        .route("/api/upload", post(api_upload))
        .route("/qr.png", get(qr_png))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub fn spawn(
    drive: Arc<DriveClient>,
    session: SessionState,
    event: EventConfig,
    cancel: CancellationToken,
    bind_addr: SocketAddr,
) -> JoinHandle<()> {
    let app = router(drive, session, event);
    tokio::spawn(async move {
        tracing::info!(%bind_addr, "starting kiosk web server");
        match TcpListener::bind(bind_addr).await {
            Ok(listener) => {
                let shutdown = cancel.clone();
                if let Err(err) = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await
                {
                    tracing::error!(error = %err, "kiosk web server failed");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, %bind_addr, "failed to bind kiosk web server");
            }
        }
    })
}

async fn api_photos(State(state): State<AppState>) -> Json<serde_json::Value> {
    let gallery = state.session.gallery.borrow().clone();
    Json(json!({
        "photos": gallery.photos.as_ref(),
        "warning": gallery.warning,
    }))
}

async fn api_frame(State(state): State<AppState>) -> Json<serde_json::Value> {
    let frame = state.session.frame.borrow().clone();
    let warning = state.session.gallery.borrow().warning.clone();
    Json(json!({
        "frame": frame,
        "warning": warning,
    }))
}

async fn api_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| bad_request(format!("malformed upload: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "guest-photo".to_string());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_default();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| bad_request(format!("failed to read upload: {err}")))?;
        file = Some((name, content_type, bytes));
        break;
    }
    let Some((name, content_type, bytes)) = file else {
        return Err(bad_request("no file provided".to_string()));
    };

    match state.drive.upload(&name, &content_type, bytes.to_vec()).await {
        Ok(receipt) => Ok(Json(json!({
            "success": true,
            "file": { "id": receipt.id, "name": receipt.name },
        }))),
        Err(err) => {
            let status = match &err {
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            };
            tracing::warn!(error = %err, "upload rejected");
            Err((status, Json(json!({ "error": err.user_message() }))))
        }
    }
}

async fn qr_png(State(state): State<AppState>) -> impl IntoResponse {
    let Some(url) = state.drive.share_url() else {
        return (StatusCode::NOT_FOUND, "no share URL configured").into_response();
    };
    match qr::share_qr_png(url) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "failed to render share QR code");
            (StatusCode::INTERNAL_SERVER_ERROR, "QR rendering failed").into_response()
        }
    }
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

async fn upload_page(State(state): State<AppState>) -> Html<String> {
    let heading = page_heading(&state.event);
    let body = format!(
        r#"<header>{heading}</header>
<section class="card">
  <h2>Share your photos</h2>
  <p>Pick a photo from your phone and it will appear on the big screen.</p>
  <form id="upload-form">
    <input type="file" name="file" accept="image/*" required>
    <button type="submit">Upload</button>
  </form>
  <p id="status" class="status"></p>
  <p><a href="/slideshow">View the slideshow</a></p>
</section>
<script>
const form = document.getElementById('upload-form');
const status = document.getElementById('status');
form.addEventListener('submit', async (ev) => {{
  ev.preventDefault();
  status.textContent = 'Uploading…';
  status.className = 'status';
  try {{
    const res = await fetch('/api/upload', {{ method: 'POST', body: new FormData(form) }});
    const data = await res.json();
    if (res.ok) {{
      status.textContent = 'Thank you! Your photo will appear shortly.';
      status.className = 'status ok';
      form.reset();
    }} else {{
      status.textContent = data.error || 'Upload failed';
      status.className = 'status error';
    }}
  }} catch (err) {{
    status.textContent = 'Upload failed: ' + err;
    status.className = 'status error';
  }}
}});
</script>"#
    );
    Html(layout("Share your photos", &body))
}

async fn slideshow_page(State(state): State<AppState>) -> Html<String> {
    let heading = page_heading(&state.event);
    let qr_card = if state.drive.share_url().is_some() {
        r#"<div id="qr-card" class="qr-card">
  <button id="qr-close" aria-label="Close">&times;</button>
  <img src="/qr.png" alt="Share QR code" width="100" height="100">
  <p>Share your photos</p>
</div>"#
    } else {
        ""
    };
    let body = format!(
        r#"<header class="overlay top">{heading}</header>
<div id="stage">
  <div id="awaiting">
    <p class="big">Awaiting photos&hellip;</p>
    <p>Scan the QR code to share yours</p>
  </div>
  <img id="base" class="layer" alt="">
  <img id="incoming" class="layer" alt="">
  <div id="placeholder-card" class="placeholder"></div>
</div>
<footer class="overlay bottom"><span id="counter"></span></footer>
<div id="warning" class="warning"></div>
{qr_card}
<script>
const base = document.getElementById('base');
const incoming = document.getElementById('incoming');
const awaiting = document.getElementById('awaiting');
const placeholderCard = document.getElementById('placeholder-card');
const counter = document.getElementById('counter');
const warning = document.getElementById('warning');
let shownEpoch = -1;
let shownPhotoId = null;

function renderPhoto(el, photo) {{
  el.src = photo.thumbnailUrl || photo.displayUrl;
  el.style.display = photo.thumbnailUrl || photo.displayUrl ? 'block' : 'none';
}}

async function refresh() {{
  try {{
    const res = await fetch('/api/frame');
    const data = await res.json();
    warning.textContent = data.warning || '';
    warning.style.display = data.warning ? 'block' : 'none';
    const frame = data.frame;
    if (frame.state === 'awaiting-photos') {{
      awaiting.style.display = 'flex';
      base.style.display = incoming.style.display = 'none';
      placeholderCard.style.display = 'none';
      counter.textContent = '';
      return;
    }}
    awaiting.style.display = 'none';
    if (frame.photo.placeholder) {{
      placeholderCard.textContent = frame.photo.name;
      placeholderCard.style.display = 'flex';
      base.style.display = incoming.style.display = 'none';
    }} else {{
      placeholderCard.style.display = 'none';
      if (frame.photo.id !== shownPhotoId) {{
        // The base photo can change without a committed swap: the fetcher
        // replaces the gallery while the rotator is idle.
        shownPhotoId = frame.photo.id;
        renderPhoto(base, frame.photo);
      }}
      if (frame.epoch !== shownEpoch) {{
        // A swap committed: remount the base layer so its fade restarts.
        shownEpoch = frame.epoch;
        base.classList.remove('fade-in');
        void base.offsetWidth;
        base.classList.add('fade-in');
      }}
      if (frame.incoming) {{
        renderPhoto(incoming, frame.incoming);
        incoming.classList.add('fade-in');
      }} else {{
        incoming.style.display = 'none';
        incoming.classList.remove('fade-in');
      }}
    }}
    counter.textContent = (frame.index + 1) + ' / ' + frame.total;
  }} catch (err) {{
    console.error('frame refresh failed', err);
  }}
}}

refresh();
setInterval(refresh, 1000);
const qrClose = document.getElementById('qr-close');
if (qrClose) {{
  qrClose.addEventListener('click', () => {{
    document.getElementById('qr-card').remove();
  }});
}}
</script>"#
    );
    Html(layout("Slideshow", &body))
}

fn page_heading(event: &EventConfig) -> String {
    let mut heading = format!("<h1>{}", escape_html(&event.title));
    if let Some(date) = &event.date {
        heading.push_str(&format!(" <span class=\"date\">{}</span>", escape_html(date)));
    }
    heading.push_str("</h1>");
    heading
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{}</title><style>{}</style></head><body><main>{}</main></body></html>",
        escape_html(title),
        styles(),
        body
    )
}

fn styles() -> &'static str {
    "body { font-family: sans-serif; margin: 0; background: #111; color: #eee; }\nmain { min-height: 100vh; position: relative; }\nheader h1 { font-weight: 300; margin: 0; }\nheader .date { color: #999; font-size: 0.8em; }\n.card { max-width: 420px; margin: 48px auto; padding: 24px; background: #1c1c1c; border-radius: 12px; }\n.card form { display: flex; gap: 12px; margin-top: 16px; }\n.card button { padding: 8px 20px; border-radius: 6px; border: none; background: #2196f3; color: #fff; cursor: pointer; }\n.card a { color: #64b5f6; }\n.status.ok { color: #81c784; }\n.status.error { color: #e57373; }\nheader { padding: 24px; }\n.overlay { position: absolute; left: 0; right: 0; z-index: 2; padding: 16px 24px; }\n.overlay.top { top: 0; background: linear-gradient(to bottom, rgba(0,0,0,0.6), transparent); }\n.overlay.bottom { bottom: 0; text-align: center; color: #999; background: linear-gradient(to top, rgba(0,0,0,0.6), transparent); }\n#stage { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; overflow: hidden; }\n.layer { position: absolute; inset: 0; width: 100%; height: 100%; object-fit: contain; display: none; }\n.fade-in { animation: fade 1.2s ease; }\n@keyframes fade { from { opacity: 0; } to { opacity: 1; } }\n#awaiting { display: flex; flex-direction: column; align-items: center; justify-content: center; height: 100%; }\n#awaiting .big { font-size: 2rem; font-weight: 300; }\n.placeholder { display: none; align-items: center; justify-content: center; font-size: 1.6rem; font-weight: 300; color: #bbb; height: 100%; }\n.warning { display: none; position: absolute; top: 80px; right: 24px; z-index: 3; background: rgba(120, 80, 0, 0.85); color: #ffe082; padding: 8px 16px; border-radius: 8px; }\n.qr-card { position: absolute; bottom: 24px; right: 24px; z-index: 3; background: rgba(0,0,0,0.85); border: 1px solid rgba(255,255,255,0.2); border-radius: 12px; padding: 12px; text-align: center; }\n.qr-card img { background: #fff; border-radius: 8px; padding: 4px; }\n.qr-card p { margin: 8px 0 0; font-size: 0.8rem; }\n.qr-card button { position: absolute; top: -10px; right: -10px; width: 24px; height: 24px; border-radius: 50%; border: none; background: #eee; color: #111; cursor: pointer; }"
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
