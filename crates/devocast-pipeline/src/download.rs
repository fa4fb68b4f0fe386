//! Plain HTTP fetch for the two kinds of external bytes a job pulls in:
//! the submitted source audio and a clip candidate's video/thumbnail.
//! Distinct from `devocast_storage::BlobStoreClient`, which only speaks the
//! internal bucket by key — these URLs point at arbitrary hosts.

use std::path::Path;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

/// Fetch `url` and write it to `output`, creating parent directories as needed.
pub async fn fetch_to_file(url: &str, output: impl AsRef<Path>, timeout: Duration) -> PipelineResult<()> {
    let output = output.as_ref();
    let (bytes, _content_type) = fetch_with_content_type(url, timeout).await?;
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(devocast_media::MediaError::Io)?;
    }
    tokio::fs::write(output, bytes).await.map_err(devocast_media::MediaError::Io)?;
    Ok(())
}

pub async fn fetch_bytes(url: &str, timeout: Duration) -> PipelineResult<Vec<u8>> {
    Ok(fetch_with_content_type(url, timeout).await?.0)
}

/// Fetch `url`, returning its body and declared `Content-Type` header. The
/// Transcriber validates against the declared type, never a filename
/// extension (§4.D).
pub async fn fetch_with_content_type(url: &str, timeout: Duration) -> PipelineResult<(Vec<u8>, String)> {
    let client = reqwest::Client::new();
    let response = client.get(url).timeout(timeout).send().await.map_err(|e| map_reqwest_err(url, e))?;
    if !response.status().is_success() {
        return Err(PipelineError::Fetch { url: url.to_string(), message: response.status().to_string() });
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .split(';')
        .next()
        .unwrap_or("application/octet-stream")
        .trim()
        .to_string();
    let bytes = response.bytes().await.map_err(|e| map_reqwest_err(url, e))?;
    Ok((bytes.to_vec(), content_type))
}

fn map_reqwest_err(url: &str, e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout(Duration::from_secs(0))
    } else {
        PipelineError::Fetch { url: url.to_string(), message: e.to_string() }
    }
}
