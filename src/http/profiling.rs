//! Profiling endpoints under `/debug/pprof/`.
//!
//! CPU profiles are collected with the `pprof` sampler and returned gzip'd.
//! Samples are symbolized in-process, so `/symbol` has nothing to resolve.
//!
//! ```text
//! curl -sS "http://<addr>/debug/pprof/profile?seconds=10" > profile.pb.gz
//! curl -sS "http://<addr>/debug/pprof/trace?seconds=5" | gunzip > flamegraph.svg
//! ```

use std::io::Write;
use std::time::Duration;

use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use pprof::{protos::Message, ProfilerGuard, ProfilerGuardBuilder};
use serde::Deserialize;
use tokio::time::sleep;

const DEFAULT_PROFILE_SECONDS: u64 = 30;
const DEFAULT_TRACE_SECONDS: u64 = 1;
const DEFAULT_FREQUENCY: i32 = 100;

const INDEX: &str = "\
/debug/pprof/

profiles:
  cmdline  the command line of the running process
  profile  CPU profile (pprof protobuf, gzip). ?seconds=N&frequency=HZ
  symbol   symbol lookup; profiles are already symbolized
  trace    CPU flamegraph (SVG, gzip). ?seconds=N&frequency=HZ
";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profiler failed: {0}")]
    Profiler(#[from] pprof::Error),

    #[error("failed to encode profile: {0}")]
    Encode(String),
}

impl From<std::io::Error> for ProfileError {
    fn from(e: std::io::Error) -> Self {
        ProfileError::Encode(e.to_string())
    }
}

impl IntoResponse for ProfileError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    /// Seconds to sample before taking the snapshot.
    pub seconds: Option<u64>,
    /// Sampling frequency in Hz.
    pub frequency: Option<i32>,
}

/// Add the profiling routes to `router`.
pub fn routes(router: Router) -> Router {
    router
        .route("/debug/pprof", get(index))
        .route("/debug/pprof/", get(index))
        .route("/debug/pprof/cmdline", get(cmdline))
        .route("/debug/pprof/profile", get(profile))
        .route("/debug/pprof/symbol", get(symbol).post(symbol))
        .route("/debug/pprof/trace", get(trace))
}

async fn index() -> &'static str {
    INDEX
}

/// Command line, arguments separated by NUL bytes.
async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

async fn symbol() -> &'static str {
    "num_symbols: 0\n"
}

async fn profile(Query(params): Query<ProfileParams>) -> Result<Response, ProfileError> {
    let guard = sample(
        params.frequency.unwrap_or(DEFAULT_FREQUENCY),
        params.seconds.unwrap_or(DEFAULT_PROFILE_SECONDS),
    )
    .await?;

    let profile = guard.report().build()?.pprof()?;
    let mut encoded = Vec::new();
    profile
        .write_to_vec(&mut encoded)
        .map_err(|e| ProfileError::Encode(e.to_string()))?;

    Ok(gzip_response(gzip(&encoded)?, "profile.pb.gz"))
}

async fn trace(Query(params): Query<ProfileParams>) -> Result<Response, ProfileError> {
    let guard = sample(
        params.frequency.unwrap_or(DEFAULT_FREQUENCY),
        params.seconds.unwrap_or(DEFAULT_TRACE_SECONDS),
    )
    .await?;

    let mut svg = Vec::new();
    guard.report().build()?.flamegraph(&mut svg)?;

    Ok(gzip_response(gzip(&svg)?, "flamegraph.svg.gz"))
}

async fn sample(frequency: i32, seconds: u64) -> Result<ProfilerGuard<'static>, ProfileError> {
    let guard = ProfilerGuardBuilder::default()
        .frequency(frequency)
        .blocklist(&["libc", "libgcc", "pthread", "vdso"])
        .build()?;
    sleep(Duration::from_secs(seconds)).await;
    Ok(guard)
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, ProfileError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gzip_response(body: Vec<u8>, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn index_lists_profiles() {
        let (status, body) = get_text(routes(Router::new()), "/debug/pprof/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("profile"));
        assert!(body.contains("cmdline"));
    }

    #[tokio::test]
    async fn cmdline_is_nul_separated_argv() {
        let (status, body) = get_text(routes(Router::new()), "/debug/pprof/cmdline").await;
        assert_eq!(status, StatusCode::OK);
        let expected: Vec<String> = std::env::args().collect();
        assert_eq!(body.split('\0').collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn symbol_reports_no_symbols() {
        let (status, body) = get_text(routes(Router::new()), "/debug/pprof/symbol").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "num_symbols: 0\n");
    }

    #[test]
    fn gzip_output_has_gzip_magic() {
        let out = gzip(b"hello").unwrap();
        assert_eq!(&out[..2], &[0x1f, 0x8b]);
    }
}
