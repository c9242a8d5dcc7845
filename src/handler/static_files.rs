//! Static file serving module
//!
//! Serves the client UI from the configured asset root.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::http::{self, cache, mime};
use crate::logger;

/// Serve a client asset (`/` resolves to the entry document)
pub async fn serve_asset(
    path: &str,
    is_head: bool,
    if_none_match: Option<&str>,
    config: &StaticFilesConfig,
) -> Response<Full<Bytes>> {
    let Some(file_path) = resolve_asset(Path::new(&config.root), &config.index_file, path).await
    else {
        return http::build_404_response();
    };

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::etag_matches(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_file_response(content, mime::content_type_for(&file_path), &etag, is_head)
}

/// Map a request path onto a file under `root`
///
/// Directories (and `/`) resolve to `index_file`. Returns `None` for missing
/// files and for anything that would escape `root`, including via symlinks.
pub async fn resolve_asset(root: &Path, index_file: &str, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {request_path}"));
        return None;
    }

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    let mut file_path = root_canonical.join(relative);
    if request_path.ends_with('/') || is_dir(&file_path).await {
        file_path.push(index_file);
    }

    // Missing files are an ordinary 404, not worth a warning
    let file_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            request_path,
            file_canonical.display()
        ));
        return None;
    }

    is_file(&file_canonical).await.then_some(file_canonical)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
