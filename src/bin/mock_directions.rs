//! Mock directions provider
//!
//! Stands in for the Mapbox Directions API (and the static directory host)
//! during local development.
//!
//! Endpoints:
//! - GET /directions/v5/mapbox/{profile}/{lng},{lat};{lng},{lat}
//!   Straight-line walk split into evenly spaced maneuvers:
//!   depart, alternating turn/continue, arrive.
//! - GET /data/{file} - files from --data-dir (buildings.json, quick-navigation.json)
//!
//! Usage:
//!   cargo run --bin mock_directions -- --port 5173 --data-dir data --steps 4

use bytes::Bytes;
use campus_nav::domain::Coordinate;
use clap::Parser;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Average walking pace used for the route duration
const WALKING_SPEED_MPS: f64 = 1.4;

#[derive(Parser, Debug, Clone)]
#[command(name = "mock_directions")]
#[command(about = "Mock walking directions provider for local simulation")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "5173")]
    port: u16,

    /// Directory served under /data/
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Intermediate maneuvers between depart and arrive
    #[arg(long, default_value = "3")]
    steps: usize,

    /// Artificial response delay (ms)
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Answer every route request with zero routes
    #[arg(long)]
    no_route: bool,
}

/// Parse "lng,lat;lng,lat" into origin and destination
fn parse_waypoints(raw: &str) -> Option<(Coordinate, Coordinate)> {
    let mut points = raw.split(';').map(|pair| {
        let (lng, lat) = pair.split_once(',')?;
        Some(Coordinate::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?))
    });
    let origin = points.next()??;
    let destination = points.next()??;
    Some((origin, destination))
}

fn lerp(a: &Coordinate, b: &Coordinate, t: f64) -> Coordinate {
    Coordinate::new(
        a.latitude + (b.latitude - a.latitude) * t,
        a.longitude + (b.longitude - a.longitude) * t,
    )
}

fn lng_lat(c: &Coordinate) -> Value {
    json!([c.longitude, c.latitude])
}

/// Mapbox-shaped response body for a straight walk
fn build_route(origin: &Coordinate, destination: &Coordinate, intermediate: usize) -> Value {
    let segments = intermediate + 1;
    let points: Vec<Coordinate> =
        (0..=segments).map(|i| lerp(origin, destination, i as f64 / segments as f64)).collect();

    let steps: Vec<Value> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (kind, instruction) = if i == 0 {
                ("depart", "Head along the main path".to_string())
            } else if i == segments {
                ("arrive", "You have arrived at your destination".to_string())
            } else if i % 2 == 1 {
                let side = if i % 4 == 1 { "left" } else { "right" };
                ("turn", format!("Turn {side} onto Walkway {i}"))
            } else {
                ("continue", format!("Continue onto Walkway {i}"))
            };
            json!({
                "maneuver": {
                    "type": kind,
                    "instruction": instruction,
                    "location": lng_lat(p),
                }
            })
        })
        .collect();

    let distance = origin.distance_to(destination);
    json!({
        "code": "Ok",
        "routes": [{
            "geometry": {
                "type": "LineString",
                "coordinates": points.iter().map(lng_lat).collect::<Vec<_>>(),
            },
            "distance": distance,
            "duration": distance / WALKING_SPEED_MPS,
            "legs": [{ "steps": steps }],
        }],
    })
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    args: Arc<Args>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();

    if req.method() != Method::GET {
        return Ok(json_response(StatusCode::METHOD_NOT_ALLOWED, &json!({ "message": "GET only" })));
    }

    if let Some(rest) = path.strip_prefix("/directions/v5/mapbox/") {
        if args.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
        }

        let waypoints = rest.split_once('/').map(|(_, w)| w).unwrap_or_default();
        let response = match parse_waypoints(waypoints) {
            None => {
                println!("[MOCK] Bad waypoints: {}", waypoints);
                json_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &json!({ "code": "InvalidInput", "message": "Coordinate is invalid" }),
                )
            }
            Some(_) if args.no_route => {
                println!("[MOCK] Route request -> NoRoute");
                json_response(
                    StatusCode::OK,
                    &json!({ "code": "NoRoute", "message": "No route found", "routes": [] }),
                )
            }
            Some((origin, destination)) => {
                println!("[MOCK] Route {} -> {} ({} steps)", origin, destination, args.steps + 2);
                json_response(StatusCode::OK, &build_route(&origin, &destination, args.steps))
            }
        };
        return Ok(response);
    }

    if let Some(name) = path.strip_prefix("/data/") {
        // No nested paths
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Ok(json_response(StatusCode::BAD_REQUEST, &json!({ "message": "bad path" })));
        }
        let response = match tokio::fs::read(args.data_dir.join(name)).await {
            Ok(content) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(Full::new(Bytes::from(content)))
                .expect("static response should not fail"),
            Err(e) => {
                eprintln!("[MOCK] Failed to read {}: {}", name, e);
                json_response(StatusCode::NOT_FOUND, &json!({ "message": "not found" }))
            }
        };
        return Ok(response);
    }

    Ok(json_response(StatusCode::NOT_FOUND, &json!({ "message": "Not Found" })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Arc::new(Args::parse());

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║              Mock Walking Directions                     ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║ Port:            {:>5}                                   ║", args.port);
    println!("║ Data dir:        {:<38} ║", args.data_dir.display());
    println!("║ Steps:           {:>5}                                   ║", args.steps + 2);
    println!("║ Delay:           {:>5} ms                                ║", args.delay_ms);
    println!("║ No route:        {:>5}                                   ║", args.no_route);
    println!("╚══════════════════════════════════════════════════════════╝");

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let args = args.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, args.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("[MOCK] HTTP error: {}", e);
            }
        });
    }
}
