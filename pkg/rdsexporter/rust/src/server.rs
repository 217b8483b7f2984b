// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::metrics::{Collect, content_type, encode};
use anyhow::{Context, Result, anyhow};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};

static NOTFOUND: &[u8] = b"Not found";

type HttpResponse = Response<BoxBody<Bytes, std::io::Error>>;

/// Serves the exposition endpoint. Every request on the telemetry path runs a
/// full collection over all registered collectors.
pub struct MetricsService {
    collectors: Vec<Arc<dyn Collect>>,
    telemetry_path: String,
}

impl MetricsService {
    pub fn new(collectors: Vec<Arc<dyn Collect>>, telemetry_path: impl Into<String>) -> Self {
        Self {
            collectors,
            telemetry_path: telemetry_path.into(),
        }
    }

    async fn handle_metrics(&self) -> Result<HttpResponse> {
        let mut samples = Vec::new();
        for collector in &self.collectors {
            samples.extend(collector.collect().await);
        }
        debug!("Encoding {} samples", samples.len());
        let body = encode(samples).context("Failed to encode metrics")?;
        Response::builder()
            .header(CONTENT_TYPE, content_type())
            .body(Full::new(body.into()).map_err(|e| match e {}).boxed())
            .map_err(|e| anyhow!("Failed to build metrics response: {}", e))
    }

    fn handle_landing(&self) -> Result<HttpResponse> {
        let page = format!(
            "<html>\n<head><title>RDS Exporter</title></head>\n<body>\n\
             <h1>RDS Exporter</h1>\n<p><a href=\"{}\">Metrics</a></p>\n\
             </body>\n</html>\n",
            self.telemetry_path
        );
        Response::builder()
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::new(page.into()).map_err(|e| match e {}).boxed())
            .map_err(|e| anyhow!("Failed to build landing page response: {}", e))
    }

    pub async fn handle_request<B>(&self, req: Request<B>) -> Result<HttpResponse> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, path) if path == self.telemetry_path => self.handle_metrics().await,
            (&Method::GET, "/") => self.handle_landing(),
            _ => {
                info!(
                    "{} Request to unknown endpoint: {}",
                    req.method(),
                    req.uri().path()
                );
                not_found()
            }
        }
    }
}

fn not_found() -> Result<HttpResponse> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(NOTFOUND.into()).map_err(|e| match e {}).boxed())
        .map_err(|e| anyhow!("Failed to build not found response: {}", e))
}

fn internal_error() -> HttpResponse {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(
            Full::new(Bytes::from(&b"Internal Server Error"[..]))
                .map_err(|e| match e {})
                .boxed(),
        )
        .unwrap_or_else(|_| {
            Response::new(
                Full::new(Bytes::from(&b"Error"[..]))
                    .map_err(|e| match e {})
                    .boxed(),
            )
        })
}

/// Accepts connections until SIGTERM or SIGINT.
pub async fn run(listener: TcpListener, service: MetricsService) -> Result<()> {
    let service = Arc::new(service);
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                let (stream, peer) = match accept_result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {e}");
                        continue;
                    }
                };
                debug!("Accepted connection from {peer}");
                let io = TokioIo::new(stream);
                let service = Arc::clone(&service);

                tokio::task::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(
                            io,
                            service_fn(|req| {
                                let service = Arc::clone(&service);
                                async move {
                                    let response = match service.handle_request(req).await {
                                        Ok(response) => response,
                                        Err(e) => {
                                            error!("Request handling failed: {e:#}");
                                            internal_error()
                                        }
                                    };
                                    Ok::<_, anyhow::Error>(response)
                                }
                            }),
                        )
                        .await
                    {
                        error!("Error serving connection: {err}");
                    }
                });
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Labels, Sample};
    use async_trait::async_trait;

    struct Fixed(Vec<Sample>);

    #[async_trait]
    impl Collect for Fixed {
        async fn collect(&self) -> Vec<Sample> {
            self.0.clone()
        }
    }

    fn service() -> MetricsService {
        let mut labels = Labels::new();
        labels.insert("instance".to_string(), "db".to_string());
        let collectors: Vec<Arc<dyn Collect>> = vec![
            Arc::new(Fixed(vec![Sample::gauge("node_load1", "load", labels, 0.5)])),
            Arc::new(Fixed(vec![Sample::gauge(
                "rds_exporter_scrape_duration_seconds",
                "duration",
                Labels::new(),
                0.25,
            )])),
        ];
        MetricsService::new(collectors, "/metrics")
    }

    async fn body_of(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = service().handle_request(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = body_of(response).await;
        assert!(body.contains("node_load1{instance=\"db\"} 0.5"));
        assert!(body.contains("rds_exporter_scrape_duration_seconds 0.25"));
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics() {
        let response = service().handle_request(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(response).await.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let response = service().handle_request(get("/other")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/metrics")
            .body(())
            .unwrap();
        let response = service().handle_request(post).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
