//! Transfers message attachments from the platform to the backend.
//!
//! One bad attachment must not abort the batch: every per-file failure is
//! logged and skipped, and an empty result simply degrades the query to
//! text-only.

use ferry_backend::{ChatBackend, UploadedFile};
use ferry_events::FileRef;
use ferry_slack::SlackApiClient;

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

pub(crate) async fn bridge_attachments(
    slack: &SlackApiClient,
    backend: &dyn ChatBackend,
    files: &[FileRef],
) -> Vec<UploadedFile> {
    let mut uploaded = Vec::new();
    for file in files {
        if file.id.trim().is_empty() {
            tracing::warn!("skipping attachment without id");
            continue;
        }
        let info = match slack.fetch_file_info(&file.id).await {
            Ok(info) => info,
            Err(error) => {
                tracing::warn!(
                    file_id = %file.id,
                    "skipping attachment, metadata fetch failed: {error:#}"
                );
                continue;
            }
        };
        let Some(url) = info.url_private.as_deref().filter(|url| !url.trim().is_empty()) else {
            tracing::warn!(file_id = %file.id, "skipping attachment without private url");
            continue;
        };
        let bytes = match slack.download_file(url).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(
                    file_id = %file.id,
                    "skipping attachment, download failed: {error:#}"
                );
                continue;
            }
        };
        let filename = info
            .name
            .clone()
            .or_else(|| file.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{}.bin", file.id));
        let mimetype = info
            .mimetype
            .clone()
            .or_else(|| file.mimetype.clone())
            .filter(|mimetype| !mimetype.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string());
        match backend.upload_file(&filename, &mimetype, bytes).await {
            Ok(handle) => uploaded.push(handle),
            Err(error) => {
                tracing::warn!(
                    file_id = %file.id,
                    "skipping attachment, backend upload failed: {error}"
                );
            }
        }
    }
    uploaded
}
