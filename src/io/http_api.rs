//! HTTP API - view snapshots, user controls, health and metrics
//!
//! Uses hyper for the HTTP server. Read endpoints serve the navigator's
//! latest `MapView` snapshot; control endpoints validate their parameters
//! and forward a `NavCommand`. Every JSON response allows any origin.

use crate::domain::types::{BuildingId, Coordinate};
use crate::infra::metrics::Metrics;
use crate::io::prometheus::format_prometheus_metrics;
use crate::presentation::{BasemapStyle, MapView};
use crate::services::navigator::NavCommand;
use crate::services::search::{parse_search_param, share_link, Directory};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HOST;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use reqwest::Url;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Shared handles for request handlers
#[derive(Clone)]
pub struct ApiState {
    pub commands: mpsc::Sender<NavCommand>,
    pub view: watch::Receiver<Arc<MapView>>,
    pub directory: Arc<Directory>,
    pub metrics: Arc<Metrics>,
    pub site_id: Arc<String>,
}

/// Value of query parameter `name`, if present
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost/?{}", query?)).ok()?;
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

fn bad_request(message: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(StatusCode::BAD_REQUEST, &json!({ "ok": false, "error": message.into() }))
}

fn ok() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &json!({ "ok": true }))
}

fn parse_building_id(raw: &str) -> Result<BuildingId, Response<Full<Bytes>>> {
    raw.parse::<u32>().map(BuildingId).map_err(|_| bad_request(format!("invalid id '{raw}'")))
}

fn parse_f64(query: Option<&str>, name: &str) -> Result<f64, Response<Full<Bytes>>> {
    let raw = query_param(query, name).ok_or_else(|| bad_request(format!("missing '{name}'")))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| bad_request(format!("invalid {name} '{raw}'")))
}

async fn send(state: &ApiState, cmd: NavCommand) -> Response<Full<Bytes>> {
    debug!(cmd = ?cmd, "api_command");
    match state.commands.send(cmd).await {
        Ok(()) => ok(),
        Err(_) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({ "ok": false, "error": "navigator_stopped" }),
        ),
    }
}

/// Route one request
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: ApiState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    state.metrics.record_api_request();
    let query = req.uri().query();

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail"),
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics, &state.site_id);
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }
        (&Method::GET, "/api/view") => {
            let view = state.view.borrow().clone();
            json_response(StatusCode::OK, view.as_ref())
        }
        (&Method::GET, "/api/buildings") => {
            let search = parse_search_param(query);
            json_response(StatusCode::OK, &state.directory.filter(&search))
        }
        (&Method::POST, "/api/search") => {
            let search = parse_search_param(query);
            let host = req
                .headers()
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost")
                .to_string();
            let link = share_link(&format!("http://{host}/"), &search);
            match state.commands.send(NavCommand::SetSearch(search)).await {
                Ok(()) => json_response(StatusCode::OK, &json!({ "ok": true, "link": link })),
                Err(_) => json_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    &json!({ "ok": false, "error": "navigator_stopped" }),
                ),
            }
        }
        (&Method::POST, "/api/select") => match query_param(query, "id") {
            None => bad_request("missing 'id'"),
            Some(raw) => match parse_building_id(&raw) {
                Err(resp) => resp,
                Ok(id) if state.directory.get(id).is_none() => json_response(
                    StatusCode::NOT_FOUND,
                    &json!({ "ok": false, "error": format!("unknown building {id}") }),
                ),
                Ok(id) => send(&state, NavCommand::Select(id)).await,
            },
        },
        (&Method::POST, "/api/clear") => send(&state, NavCommand::ClearDestination).await,
        (&Method::POST, "/api/hover") => match query_param(query, "id").filter(|raw| !raw.is_empty()) {
            None => send(&state, NavCommand::Hover(None)).await,
            Some(raw) => match parse_building_id(&raw) {
                Err(resp) => resp,
                Ok(id) if state.directory.get(id).is_none() => json_response(
                    StatusCode::NOT_FOUND,
                    &json!({ "ok": false, "error": format!("unknown building {id}") }),
                ),
                Ok(id) => send(&state, NavCommand::Hover(Some(id))).await,
            },
        },
        (&Method::POST, "/api/style") => {
            match query_param(query, "name").unwrap_or_default().parse::<BasemapStyle>() {
                Ok(style) => send(&state, NavCommand::SetStyle(style)).await,
                Err(e) => bad_request(e),
            }
        }
        (&Method::POST, "/api/zoom") => match parse_f64(query, "level") {
            Ok(level) => send(&state, NavCommand::Zoom(level)).await,
            Err(resp) => resp,
        },
        (&Method::POST, "/api/pan") => {
            match (parse_f64(query, "lat"), parse_f64(query, "lng")) {
                (Ok(lat), Ok(lng)) => {
                    let center = Coordinate::new(lat, lng);
                    if center.is_valid() {
                        send(&state, NavCommand::Pan(center)).await
                    } else {
                        bad_request(format!("coordinate out of range: {center}"))
                    }
                }
                (Err(resp), _) | (_, Err(resp)) => resp,
            }
        }
        (&Method::POST, "/api/recenter") => send(&state, NavCommand::Recenter).await,
        // CORS preflight
        (&Method::OPTIONS, path) if path.starts_with("/api/") => Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .body(Full::new(Bytes::from("")))
            .expect("static response should not fail"),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail"),
    };

    Ok(response)
}

/// Serve the API on an already bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, state.clone()));

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the API port and serve until shutdown
pub async fn start_api_server(
    port: u16,
    state: ApiState,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = %port, site = %state.site_id, "api_server_started");
    serve(listener, state, shutdown).await
}
