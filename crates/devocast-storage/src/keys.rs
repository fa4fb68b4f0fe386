//! Blob key layout: `{tenant_id}/{job_id}/{kind}.{ext}` (§6).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    SourceAudio,
    RenderedVideo,
    Subtitles,
    Thumbnail,
}

impl ArtifactKind {
    fn file_name(&self) -> &'static str {
        match self {
            Self::SourceAudio => "source.m4a",
            Self::RenderedVideo => "output.mp4",
            Self::Subtitles => "subtitles.srt",
            Self::Thumbnail => "thumbnail.jpg",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Build the blob store key for a job's artifact.
pub fn artifact_key(tenant_id: &str, job_id: &str, kind: ArtifactKind) -> String {
    format!("{tenant_id}/{job_id}/{kind}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_tenant_scoped() {
        let key = artifact_key("tenant-1", "job-1", ArtifactKind::RenderedVideo);
        assert_eq!(key, "tenant-1/job-1/output.mp4");
    }
}
