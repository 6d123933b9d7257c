use std::path::Path;

use {anyhow::Result, async_trait::async_trait};

/// Name given to uploads that arrive without a filename.
const DEFAULT_MEDIA_NAME: &str = "bridge-media";

/// Downloads content referenced by URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`MediaFetcher`] over plain HTTP(S).
#[derive(Clone, Default)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("failed to download media: HTTP {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Map a MIME type to a file extension.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let base = mime_type.split(';').next().unwrap_or(mime_type).trim();
    let ext = match base {
        "image/png" => "png",
        "image/jpeg" => "jpeg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/aac" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "text/plain" => "txt",
        "text/html" => "html",
        _ => return None,
    };
    Some(ext)
}

pub fn is_image(mime_type: &str) -> bool {
    mime_type.split('/').next() == Some("image")
}

/// Attachment name for an upload.
///
/// A filename with an extension is kept as is; otherwise the extension
/// derived from the MIME type is appended. Nameless uploads get a generic
/// name.
pub fn filename_for_media(filename: Option<&str>, mime_type: Option<&str>) -> String {
    let ext = mime_type
        .and_then(extension_for_mime)
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    match filename.filter(|f| !f.is_empty()) {
        Some(name) if Path::new(name).extension().is_some() => name.to_string(),
        Some(name) => {
            let base = Path::new(name)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(name);
            format!("{base}{ext}")
        },
        None => format!("{DEFAULT_MEDIA_NAME}{ext}"),
    }
}
