/// Edge length, in pixels, of every image handed to the catalog.
pub const TARGET_DIMENSION: u32 = 400;
pub const OUTPUT_FORMAT: &str = "JPEG";

pub const DOWNLOAD_QUALITY: u8 = 90;
pub const REFETCH_QUALITY: u8 = 95;
pub const CUSTOM_QUALITY: u8 = 95;
pub const PLACEHOLDER_QUALITY: u8 = 90;

/// Everything needed to produce one product image.
///
/// `sources` is the ordered candidate list: the first entry is the primary
/// URL (retried), the rest are alternates (tried once each).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImageRequest {
    pub identity: String,
    pub sources: Vec<String>,
    pub category: String,
    pub display_name: String,
}

impl ProductImageRequest {
    pub fn new(
        identity: impl Into<String>,
        category: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            sources: Vec::new(),
            category: category.into(),
            display_name: display_name.into(),
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources
            .into_iter()
            .map(Into::into)
            .map(|url: String| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        self
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }

    pub fn alternates(&self) -> &[String] {
        self.sources.get(1..).unwrap_or_default()
    }

    pub fn filename(&self) -> String {
        output_filename(&self.identity)
    }
}

pub fn output_filename(slug: &str) -> String {
    format!("{slug}.jpg")
}

pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

/// Encoded output of the normalizer or the synthesizer.
///
/// Only the engine's encoders construct these, and they always produce a
/// `TARGET_DIMENSION` square, three-channel JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    quality: u8,
}

impl NormalizedImage {
    pub fn from_encoded(bytes: Vec<u8>, quality: u8) -> Self {
        Self {
            bytes,
            quality: clamp_quality(quality),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        TARGET_DIMENSION
    }

    pub fn height(&self) -> u32 {
        TARGET_DIMENSION
    }

    pub fn format(&self) -> &'static str {
        OUTPUT_FORMAT
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
