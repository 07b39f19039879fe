use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use tracing::warn;

use crate::app::AppState;

const DIST_ZIP_PATH: &str = "data/dist.zip";
const DEFAULT_FILE: &str = "index.html";

/// An in-memory unpack of `data/dist.zip`, built once at startup. `GET
/// /web/*` is a pure map lookup from then on — no filesystem or zip-parsing
/// cost per request.
#[derive(Default)]
pub struct WebAssets {
    files: HashMap<String, Vec<u8>>,
}

impl WebAssets {
    /// Missing archive is not an error — the control plane API still works
    /// with no web UI installed.
    pub fn load() -> Self {
        let bytes = match std::fs::read(DIST_ZIP_PATH) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(error = %e, "failed to read {DIST_ZIP_PATH}");
                return Self::default();
            }
        };

        let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "failed to open {DIST_ZIP_PATH} as a zip archive");
                return Self::default();
            }
        };

        let mut files = HashMap::new();
        for i in 0..archive.len() {
            let Ok(mut entry) = archive.by_index(i) else { continue };
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut contents = Vec::with_capacity(entry.size() as usize);
            if entry.read_to_end(&mut contents).is_ok() {
                files.insert(name, contents);
            }
        }
        Self { files }
    }

    fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }
}

fn respond(path: &str, bytes: &[u8]) -> axum::response::Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], bytes.to_vec()).into_response()
}

pub async fn serve(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> axum::response::Response {
    match state.web_assets.get(&path) {
        Some(bytes) => respond(&path, bytes),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

pub async fn serve_index(State(state): State<Arc<AppState>>) -> axum::response::Response {
    match state.web_assets.get(DEFAULT_FILE) {
        Some(bytes) => respond(DEFAULT_FILE, bytes),
        None => (StatusCode::NOT_FOUND, "no web UI installed").into_response(),
    }
}
