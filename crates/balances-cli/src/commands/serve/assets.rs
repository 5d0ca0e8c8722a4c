//! Static front-end files served from one fixed directory.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;

/// Front-end files are small; anything larger is not served.
const MAX_ASSET_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Clone, Debug)]
pub(super) struct AssetDir {
    root: PathBuf,
}

/// A single path segment of `[A-Za-z0-9._-]` that does not start with a dot.
fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

impl AssetDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a request path to a file name inside the directory.
    fn resolve(path: &str) -> Option<&str> {
        let name = path.strip_prefix('/')?;
        let name = if name.is_empty() { "index.html" } else { name };
        is_safe_asset_name(name).then_some(name)
    }

    /// Load the asset for `path`, or `None` if there is no such file.
    pub async fn load(&self, path: &str) -> Option<Response> {
        let name = Self::resolve(path)?;
        let file = self.root.join(name);

        let meta = tokio::fs::metadata(&file).await.ok()?;
        if !meta.is_file() || meta.len() > MAX_ASSET_BYTES {
            return None;
        }
        let bytes = tokio::fs::read(&file).await.ok()?;

        let mut resp = Response::new(Body::from(bytes));
        let headers = resp.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(name)),
        );
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=0"),
        );
        Some(resp)
    }
}
