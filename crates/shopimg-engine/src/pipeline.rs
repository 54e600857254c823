use serde_json::json;
use shopimg_contracts::config::FetchConfig;
use shopimg_contracts::errors::ImageFailure;
use shopimg_contracts::events::{payload, EventWriter};
use shopimg_contracts::images::{NormalizedImage, ProductImageRequest, DOWNLOAD_QUALITY};

use crate::emit_logged;
use crate::fetch::{Fetcher, HttpTransport};
use crate::normalize::decode_and_normalize;
use crate::synth::Synthesizer;

/// What happens when no remote image could be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Generate a placeholder; the product always ends up with an image.
    Synthesize { label: bool },
    /// Leave the product's current image untouched.
    Keep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Downloaded { url: String, attempts: u32 },
    /// `reason` is `None` when the product never had a remote source.
    Synthesized { reason: Option<ImageFailure> },
    Kept { reason: ImageFailure },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub image: Option<NormalizedImage>,
    pub outcome: Outcome,
}

/// Per-product flow: fetch + normalize when a source exists, otherwise (or
/// on failure) apply the fallback policy. Every call terminates.
pub struct ImagePipeline<'a> {
    fetcher: Fetcher<'a>,
    synthesizer: &'a Synthesizer,
    quality: u8,
    fallback: FallbackPolicy,
    events: EventWriter,
}

impl<'a> ImagePipeline<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        fetch: &FetchConfig,
        synthesizer: &'a Synthesizer,
        events: EventWriter,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(transport, fetch, events.clone()),
            synthesizer,
            quality: DOWNLOAD_QUALITY,
            fallback: FallbackPolicy::Synthesize { label: false },
            events,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn acquire(&self, request: &ProductImageRequest) -> Acquisition {
        if request.sources.is_empty() {
            return self.fall_back(request, None);
        }

        let quality = self.quality;
        match self
            .fetcher
            .fetch_with(&request.sources, |bytes| decode_and_normalize(bytes, quality))
        {
            Ok(fetched) => {
                emit_logged(
                    &self.events,
                    "image_downloaded",
                    payload(json!({
                        "slug": request.identity,
                        "url": fetched.url,
                        "attempts": fetched.attempts,
                        "alternate": fetched.alternate,
                        "bytes": fetched.value.len(),
                    })),
                );
                Acquisition {
                    image: Some(fetched.value),
                    outcome: Outcome::Downloaded {
                        url: fetched.url,
                        attempts: fetched.attempts,
                    },
                }
            }
            Err(failure) => self.fall_back(request, Some(failure)),
        }
    }

    fn fall_back(
        &self,
        request: &ProductImageRequest,
        reason: Option<ImageFailure>,
    ) -> Acquisition {
        match self.fallback {
            FallbackPolicy::Synthesize { label } => {
                let image = self.synthesizer.synthesize(
                    &request.display_name,
                    &request.category,
                    label,
                );
                emit_logged(
                    &self.events,
                    "image_synthesized",
                    payload(json!({
                        "slug": request.identity,
                        "category": request.category,
                        "color": self.synthesizer.palette().color_for(&request.category).to_hex(),
                        "labelled": label && self.synthesizer.can_label(),
                        "reason": reason.as_ref().map(ImageFailure::message),
                    })),
                );
                Acquisition {
                    image: Some(image),
                    outcome: Outcome::Synthesized { reason },
                }
            }
            FallbackPolicy::Keep => {
                let reason = reason.unwrap_or_else(|| {
                    ImageFailure::transport(format!("no URL found for {}", request.identity))
                });
                Acquisition {
                    image: None,
                    outcome: Outcome::Kept { reason },
                }
            }
        }
    }
}
