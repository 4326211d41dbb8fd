//! Web server for the quakemap UI.
//!
//! Provides the interactive map using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) for state and viewport pushes
//! - Leaflet in the browser for tiles, markers and popups

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use crate::client::FeedSource;
use crate::map_view::{MapView, ScreenSize};
use crate::markers::MarkerView;
use crate::store::{FeedState, FeedStore, VisibleSet};
use crate::viewport::{FitMode, LatLng, ViewportFitter};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub fit_mode: FitMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            fit_mode: FitMode::default(),
        }
    }
}

/// A view the browser should switch to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewChange {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

impl From<&MapView> for ViewChange {
    fn from(view: &MapView) -> Self {
        let center = view.center();
        Self {
            lat: center.lat,
            lng: center.lng,
            zoom: view.zoom(),
        }
    }
}

/// Server-side mirror of the browser map.
#[derive(Debug, Default)]
struct Viewport {
    map: MapView,
    last_fit: Option<ViewChange>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<FeedStore>,
    viewport: Arc<Mutex<Viewport>>,
    /// Channel for broadcasting fits to SSE clients
    views: broadcast::Sender<ViewChange>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<FeedStore>) -> Self {
        let (views, _rx) = broadcast::channel(16);
        Self {
            store,
            viewport: Arc::new(Mutex::new(Viewport::default())),
            views,
        }
    }

    fn viewport(&self) -> MutexGuard<'_, Viewport> {
        self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the fitter against the mirrored map and announce the new view.
    ///
    /// Recording `last_fit` and broadcasting happen under one lock, so
    /// [`Self::view_changes`] never misses or repeats a fit.
    fn apply_fit(&self, fitter: &mut ViewportFitter, visible: &VisibleSet) -> Option<ViewChange> {
        let mut viewport = self.viewport();
        fitter.observe(visible, &mut viewport.map)?;
        let change = ViewChange::from(&viewport.map);
        viewport.last_fit = Some(change);

        // No subscribers is fine; late clients get `last_fit` on connect.
        let _ = self.views.send(change);
        Some(change)
    }

    /// The last fit, if any, followed by every later one.
    fn view_changes(&self) -> impl tokio_stream::Stream<Item = ViewChange> + use<> {
        let (last_fit, rx) = {
            let viewport = self.viewport();
            (viewport.last_fit, self.views.subscribe())
        };

        tokio_stream::iter(last_fit).chain(BroadcastStream::new(rx).filter_map(Result::ok))
    }
}

/// Snapshot sent to the browser on every state change.
#[derive(Debug, Serialize)]
pub struct StatePayload {
    pub status: &'static str,
    pub message: Option<String>,
    pub threshold: f64,
    pub total: usize,
    pub markers: Vec<MarkerView>,
}

impl From<&FeedState> for StatePayload {
    fn from(state: &FeedState) -> Self {
        Self {
            status: state.status().as_str(),
            message: state.status().message().map(str::to_string),
            threshold: state.threshold(),
            total: state.records().len(),
            markers: state.visible().iter().map(MarkerView::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub value: f64,
}

/// The browser's own view, posted after every move or resize.
#[derive(Debug, Deserialize)]
pub struct ViewReport {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/api/state", get(state_handler))
        .route("/api/threshold", post(threshold_handler))
        .route("/api/view", post(view_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// The feed is fetched once, in the background, for the life of the server.
pub async fn run_server<S>(
    config: ServerConfig,
    store: Arc<FeedStore>,
    source: S,
) -> anyhow::Result<()>
where
    S: FeedSource + Send + Sync + 'static,
{
    let state = AppState::new(Arc::clone(&store));

    tokio::spawn(async move {
        store.initialize(&source).await;
    });

    tokio::spawn(drive_viewport(
        state.clone(),
        ViewportFitter::new(config.fit_mode),
    ));

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("quakemap UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task that refits the map whenever the visible set changes.
async fn drive_viewport(state: AppState, mut fitter: ViewportFitter) {
    let mut rx = state.store.subscribe();

    loop {
        let visible = rx.borrow_and_update().visible().clone();
        if let Some(change) = state.apply_fit(&mut fitter, &visible) {
            tracing::debug!("view moved to {:?}", change);
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Current state for initial page load.
async fn state_handler(State(state): State<AppState>) -> Json<StatePayload> {
    Json(StatePayload::from(&state.store.snapshot()))
}

/// Slider moved.
async fn threshold_handler(
    State(state): State<AppState>,
    Json(request): Json<ThresholdRequest>,
) -> Json<StatePayload> {
    if state.store.set_threshold(request.value) {
        tracing::info!("minimum magnitude set to {}", request.value);
    }
    Json(StatePayload::from(&state.store.snapshot()))
}

/// Browser reports where its map is.
async fn view_handler(
    State(state): State<AppState>,
    Json(report): Json<ViewReport>,
) -> StatusCode {
    state.viewport().map.report(
        LatLng::new(report.lat, report.lng),
        report.zoom,
        ScreenSize {
            width: report.width,
            height: report.height,
        },
    );
    StatusCode::NO_CONTENT
}

/// SSE stream: `state` on every store change, `view` on every fit.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let states = WatchStream::new(state.store.subscribe())
        .map(|s| Event::default().event("state").json_data(StatePayload::from(&s)));

    let views = state
        .view_changes()
        .map(|v| Event::default().event("view").json_data(v));

    let stream = states
        .merge(views)
        .filter_map(|result| match result {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("failed to encode SSE event: {}", e);
                None
            }
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>quakemap - Recent Earthquakes</title>

    <!-- Leaflet -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        html, body { height: 100%; }

        body {
            display: flex;
            flex-direction: column;
            font-family: -apple-system, BlinkMacSystemFont, 'Inter', sans-serif;
        }

        .header, .footer {
            background: #1f2937;
            color: #fff;
        }

        .header { padding: 1rem; }

        .header label {
            display: flex;
            align-items: center;
            gap: 0.5rem;
            font-size: 0.875rem;
        }

        .header input { width: 10rem; accent-color: #22c55e; }

        .main { flex: 1; position: relative; }

        #map { height: 100%; }

        .overlay {
            position: absolute;
            inset: 0;
            z-index: 1000;
            display: flex;
            align-items: center;
            justify-content: center;
            background: rgba(0, 0, 0, 0.5);
            color: #fff;
        }

        .banner {
            position: absolute;
            top: 0.75rem;
            left: 0.75rem;
            z-index: 1000;
            padding: 0.5rem 0.75rem;
            border-radius: 4px;
            background: #fee2e2;
            color: #991b1b;
            box-shadow: 0 1px 3px rgba(0, 0, 0, 0.2);
        }

        [hidden] { display: none !important; }

        .popup { font-size: 0.875rem; }
        .popup h3 { font-weight: 700; }
        .popup a { color: #3b82f6; text-decoration: underline; }

        .footer {
            display: flex;
            justify-content: space-between;
            padding: 0.5rem 1rem;
            font-size: 0.75rem;
            color: #9ca3af;
        }
    </style>
</head>
<body>
    <header class="header">
        <label>
            Min Magnitude: <strong id="min-mag">0</strong>
            <input id="slider" type="range" min="0" max="7" step="0.1" value="0">
        </label>
    </header>

    <main class="main">
        <div id="loading" class="overlay">Loading data&hellip;</div>
        <div id="banner" class="banner" hidden></div>
        <div id="map"></div>
    </main>

    <footer class="footer">
        <p>Data: USGS Earthquake API</p>
        <p><span id="count">0</span> events shown</p>
    </footer>

    <script>
        const map = L.map('map', { scrollWheelZoom: true }).setView([20, 0], 2);
        L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
            attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors'
        }).addTo(map);
        const markers = L.layerGroup().addTo(map);

        const slider = document.getElementById('slider');
        const minMag = document.getElementById('min-mag');

        function esc(text) {
            const div = document.createElement('div');
            div.textContent = text;
            return div.innerHTML;
        }

        function post(url, body) {
            return fetch(url, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body)
            });
        }

        function reportView() {
            const c = map.getCenter();
            const s = map.getSize();
            post('/api/view', { lat: c.lat, lng: c.lng, zoom: map.getZoom(), width: s.x, height: s.y });
        }

        function render(state) {
            document.getElementById('loading').hidden = state.status !== 'loading';
            const banner = document.getElementById('banner');
            banner.hidden = state.status !== 'failed';
            banner.textContent = state.message || '';

            if (document.activeElement !== slider) {
                slider.value = state.threshold;
                minMag.textContent = state.threshold;
            }
            document.getElementById('count').textContent = state.markers.length;

            markers.clearLayers();
            for (const m of state.markers) {
                const popup = '<div class="popup">'
                    + '<h3>' + esc(m.popup.title) + '</h3>'
                    + '<p>' + esc(m.popup.depth) + '</p>'
                    + '<p>' + esc(m.popup.time) + '</p>'
                    + '<a href="' + esc(m.popup.url) + '" target="_blank" rel="noreferrer">View Details</a>'
                    + '</div>';
                L.circleMarker([m.lat, m.lng], {
                    radius: m.style.radius,
                    color: m.style.color,
                    fillColor: m.style.color,
                    fillOpacity: m.style.opacity
                }).bindPopup(popup).addTo(markers);
            }
        }

        slider.addEventListener('input', (e) => {
            minMag.textContent = e.target.value;
            post('/api/threshold', { value: parseFloat(e.target.value) });
        });

        map.whenReady(reportView);
        map.on('moveend', reportView);
        window.addEventListener('resize', () => {
            map.invalidateSize();
            reportView();
        });

        const source = new EventSource('/stream');
        source.addEventListener('state', (e) => render(JSON.parse(e.data)));
        source.addEventListener('view', (e) => {
            const v = JSON.parse(e.data);
            map.setView([v.lat, v.lng], v.zoom);
        });
    </script>
</body>
</html>
"##;
