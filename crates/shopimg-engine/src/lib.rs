pub mod fetch;
pub mod local;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod synth;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use sha2::{Digest, Sha256};
use shopimg_contracts::catalog::{Catalog, Product};
use shopimg_contracts::config::{FetchConfig, ShopimgConfig};
use shopimg_contracts::errors::{FailureKind, ImageFailure};
use shopimg_contracts::events::{payload, EventPayload, EventWriter};
use shopimg_contracts::images::{
    output_filename, NormalizedImage, CUSTOM_QUALITY, DOWNLOAD_QUALITY, PLACEHOLDER_QUALITY,
    REFETCH_QUALITY,
};
use shopimg_contracts::runs::summary::{write_summary, BatchSummary, ImageSource, SavedItem};

pub use fetch::{Fetched, Fetcher, HttpTransport, ReqwestTransport};
pub use normalize::{normalize, normalize_file, normalize_image};
pub use pipeline::{Acquisition, FallbackPolicy, ImagePipeline, Outcome};
pub use store::JsonCatalog;
pub use synth::{label_lines, LabelFont, Synthesizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Placeholders,
    Download,
    Refetch,
    Replace,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Placeholders => "placeholders",
            Self::Download => "download",
            Self::Refetch => "refetch",
            Self::Replace => "replace",
        }
    }
}

/// Runs the batch jobs: one product at a time, fully processed and
/// persisted before the next one starts.
pub struct ImageEngine {
    config: ShopimgConfig,
    transport: Arc<dyn HttpTransport>,
    refetch_transport: Arc<dyn HttpTransport>,
    synthesizer: Synthesizer,
    events: EventWriter,
    summary_path: Option<PathBuf>,
}

impl ImageEngine {
    pub fn new(
        config: ShopimgConfig,
        transport: Arc<dyn HttpTransport>,
        synthesizer: Synthesizer,
        events: EventWriter,
    ) -> Self {
        Self {
            config,
            refetch_transport: transport.clone(),
            transport,
            synthesizer,
            events,
            summary_path: None,
        }
    }

    pub fn from_config(config: ShopimgConfig, events: EventWriter) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.fetch)?);
        let refetch_transport = Arc::new(ReqwestTransport::new(&config.refetch_fetch)?);
        let synthesizer = Synthesizer::from_config(&config);
        Ok(Self::new(config, transport, synthesizer, events)
            .with_refetch_transport(refetch_transport))
    }

    /// Transport for the refetch job, which runs with `refetch_fetch`
    /// settings. Defaults to the shared transport.
    pub fn with_refetch_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.refetch_transport = transport;
        self
    }

    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &ShopimgConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    fn pipeline(&self, quality: u8, fallback: FallbackPolicy) -> ImagePipeline<'_> {
        self.pipeline_with(self.transport.as_ref(), &self.config.fetch, quality, fallback)
    }

    fn pipeline_with<'a>(
        &'a self,
        transport: &'a dyn HttpTransport,
        fetch: &FetchConfig,
        quality: u8,
        fallback: FallbackPolicy,
    ) -> ImagePipeline<'a> {
        ImagePipeline::new(
            transport,
            fetch,
            &self.synthesizer,
            self.events.clone(),
        )
        .with_quality(quality)
        .with_fallback(fallback)
    }

    /// Labelled placeholder for every product.
    pub fn run_placeholders(&self, catalog: &mut dyn Catalog) -> Result<BatchSummary> {
        let mut summary = self.begin(Job::Placeholders)?;
        let pipeline = self.pipeline(
            PLACEHOLDER_QUALITY,
            FallbackPolicy::Synthesize { label: true },
        );
        for product in catalog.list_products()? {
            println!("Creating image for: {}", product.name);
            let acquisition = pipeline.acquire(&product.image_request());
            self.record(catalog, &product, acquisition, &mut summary)?;
        }
        self.finish(summary)
    }

    /// Remote image per mapped product; unlabelled placeholder otherwise.
    pub fn run_download(&self, catalog: &mut dyn Catalog) -> Result<BatchSummary> {
        let mut summary = self.begin(Job::Download)?;
        let pipeline = self.pipeline(
            DOWNLOAD_QUALITY,
            FallbackPolicy::Synthesize { label: false },
        );
        for product in catalog.list_products()? {
            println!("\nProcessing: {}", product.name);
            let request = product
                .image_request()
                .with_sources(self.config.sources.get(&product.slug).iter().cloned());
            match request.remote_url() {
                Some(url) => println!("Downloading from: {url}"),
                None => println!("No URL found, creating fallback..."),
            }
            let acquisition = pipeline.acquire(&request);
            self.record(catalog, &product, acquisition, &mut summary)?;
        }
        self.finish(summary)
    }

    /// Re-downloads the given slugs (or every slug in the refetch table)
    /// trying alternates; failures keep the existing image.
    pub fn run_refetch(&self, catalog: &mut dyn Catalog, slugs: &[String]) -> Result<BatchSummary> {
        let mut summary = self.begin(Job::Refetch)?;
        let targets = if slugs.is_empty() {
            self.config.refetch_sources.slugs()
        } else {
            slugs.to_vec()
        };
        let pipeline = self.pipeline_with(
            self.refetch_transport.as_ref(),
            &self.config.refetch_fetch,
            REFETCH_QUALITY,
            FallbackPolicy::Keep,
        );
        for slug in &targets {
            let Some(product) = catalog.find_product(slug)? else {
                self.skip(&mut summary, slug, ImageFailure::not_found(slug))?;
                continue;
            };
            println!("\nProcessing: {}", product.name);
            let request = product
                .image_request()
                .with_sources(self.config.refetch_sources.get(slug).iter().cloned());
            if let Some(url) = request.remote_url() {
                println!("Downloading from: {url}");
            }
            let acquisition = pipeline.acquire(&request);
            self.record(catalog, &product, acquisition, &mut summary)?;
        }
        self.finish(summary)
    }

    /// Applies images the user dropped into `dir`, matched by the custom
    /// image table.
    pub fn run_replace(&self, catalog: &mut dyn Catalog, dir: &Path) -> Result<BatchSummary> {
        let mut summary = self.begin(Job::Replace)?;
        println!("Scanning for image files in {}...", dir.display());
        let found = local::scan_images(dir)?;
        if found.is_empty() {
            println!("No image files found in {}", dir.display());
            println!("Please save your images with these names:");
            for name in local::expected_filenames(self.config.custom_images.iter()) {
                println!("   - {name}");
            }
            return self.finish(summary);
        }
        println!("Found {} image files:", found.len());
        for path in &found {
            let name = path.file_name().map(|name| name.to_string_lossy());
            println!("   - {}", name.unwrap_or_default());
        }

        for (slug, candidates) in self.config.custom_images.iter() {
            println!("\nProcessing {slug}...");
            let path = match local::find_custom_image(dir, slug, candidates) {
                Ok(path) => path,
                Err(failure) => {
                    self.skip(&mut summary, slug, failure)?;
                    continue;
                }
            };
            println!("Found image: {}", path.display());
            let Some(product) = catalog.find_product(slug)? else {
                self.skip(&mut summary, slug, ImageFailure::not_found(slug))?;
                continue;
            };
            match normalize_file(&path, CUSTOM_QUALITY) {
                Ok(image) => {
                    let origin = path.display().to_string();
                    self.persist(
                        catalog,
                        &product,
                        image,
                        ImageSource::Custom,
                        Some(origin),
                        &mut summary,
                    )?;
                }
                Err(failure) => self.skip(&mut summary, slug, failure)?,
            }
        }
        self.finish(summary)
    }

    fn begin(&self, job: Job) -> Result<BatchSummary> {
        self.events.emit(
            "run_started",
            payload(json!({
                "job": job.name(),
                "label_font": self
                    .synthesizer
                    .font_source()
                    .map(|path| path.display().to_string()),
            })),
        )?;
        Ok(BatchSummary::start(self.events.run_id(), job.name()))
    }

    fn finish(&self, mut summary: BatchSummary) -> Result<BatchSummary> {
        summary.finish();
        self.events.emit(
            "run_finished",
            payload(json!({
                "job": summary.job,
                "total": summary.total,
                "saved": summary.saved.len(),
                "skipped": summary.skipped.len(),
            })),
        )?;
        if let Some(path) = &self.summary_path {
            write_summary(path, &summary, None)?;
        }
        Ok(summary)
    }

    fn record(
        &self,
        catalog: &mut dyn Catalog,
        product: &Product,
        acquisition: Acquisition,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        match (acquisition.outcome, acquisition.image) {
            (Outcome::Downloaded { url, .. }, Some(image)) => self.persist(
                catalog,
                product,
                image,
                ImageSource::Downloaded,
                Some(url),
                summary,
            ),
            (Outcome::Synthesized { reason }, Some(image)) => {
                if let Some(reason) = &reason {
                    println!("Download failed ({}), creating fallback...", reason.kind());
                }
                self.persist(
                    catalog,
                    product,
                    image,
                    ImageSource::Synthesized,
                    None,
                    summary,
                )
            }
            (Outcome::Kept { reason }, _) => {
                println!("All download attempts failed for {}", product.name);
                self.skip(summary, &product.slug, reason)
            }
            (_, None) => self.skip(
                summary,
                &product.slug,
                ImageFailure::transport("no image produced"),
            ),
        }
    }

    fn persist(
        &self,
        catalog: &mut dyn Catalog,
        product: &Product,
        image: NormalizedImage,
        source: ImageSource,
        origin: Option<String>,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        let filename = output_filename(&product.slug);
        let stored = catalog.save_image(product, &filename, image.bytes())?;
        let digest = sha256_hex(image.bytes());
        self.events.emit(
            "image_saved",
            payload(json!({
                "slug": product.slug,
                "filename": filename,
                "path": stored.display().to_string(),
                "source": source,
                "quality": image.quality(),
                "sha256": digest,
            })),
        )?;
        println!("Saved image: {filename}");
        summary.record_saved(SavedItem {
            slug: product.slug.clone(),
            filename,
            source,
            origin,
            sha256: digest,
        });
        Ok(())
    }

    fn skip(&self, summary: &mut BatchSummary, slug: &str, failure: ImageFailure) -> Result<()> {
        println!("Skipped {slug}: {failure}");
        self.events.emit(
            "product_skipped",
            payload(json!({
                "slug": slug,
                "kind": failure.kind().as_str(),
                "reason": failure.message(),
            })),
        )?;
        summary.record_skipped(slug, &failure);
        Ok(())
    }
}

/// For call sites that cannot return an error: a failed event write is
/// reported on stderr and the product keeps going.
pub(crate) fn emit_logged(events: &EventWriter, event_type: &str, payload: EventPayload) {
    if let Err(err) = events.emit(event_type, payload) {
        eprintln!(
            "warning: failed writing {event_type} event: {}",
            error_chain_text(&err, 240)
        );
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Decode problems anywhere in the chain win; everything else coming out
/// of a fetch is a transport problem.
pub(crate) fn failure_kind_of(err: &anyhow::Error) -> FailureKind {
    for cause in err.chain() {
        if let Some(failure) = cause.downcast_ref::<ImageFailure>() {
            return failure.kind();
        }
        if cause.downcast_ref::<image::ImageError>().is_some() {
            return FailureKind::Decode;
        }
    }
    FailureKind::Transport
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().map(String::as_str) == Some(trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use anyhow::{anyhow, Context, Result};
    use serde_json::Value;
    use shopimg_contracts::catalog::Catalog;
    use shopimg_contracts::config::{ColorPalette, ShopimgConfig, SourceTable};
    use shopimg_contracts::errors::FailureKind;
    use shopimg_contracts::events::EventWriter;
    use shopimg_contracts::runs::summary::ImageSource;

    use super::{
        error_chain_text, failure_kind_of, sha256_hex, truncate_text, ImageEngine, JsonCatalog,
        Synthesizer,
    };
    use crate::fetch::tests::ScriptedTransport;
    use crate::normalize::tests::png_fixture;
    use crate::store::tests::seeded;

    const YOGA_URL: &str = "https://images.example/yoga.png";
    const NOVEL_URL: &str = "https://images.example/novel.png";
    const NOVEL_ALT: &str = "https://images.example/novel-alt.png";

    fn config() -> ShopimgConfig {
        let mut sources = SourceTable::new();
        sources.insert("yoga-mat", vec![YOGA_URL.to_string()]);
        sources.insert("science-fiction-novel", vec![NOVEL_URL.to_string()]);
        let mut refetch = SourceTable::new();
        refetch.insert("yoga-mat", vec![NOVEL_URL.to_string(), YOGA_URL.to_string()]);
        refetch.insert(
            "science-fiction-novel",
            vec![NOVEL_URL.to_string(), NOVEL_ALT.to_string()],
        );
        let mut config = ShopimgConfig::builtin();
        config.sources = sources;
        config.refetch_sources = refetch;
        config
    }

    fn engine(root: &Path, transport: Arc<ScriptedTransport>) -> ImageEngine {
        ImageEngine::new(
            config(),
            transport,
            Synthesizer::new(ColorPalette::builtin(), None, 22.0),
            EventWriter::new(root.join("media").join("events.jsonl"), "run-test"),
        )
        .with_summary_path(root.join("media").join("summary.json"))
    }

    fn stored_dimensions(catalog: &JsonCatalog, slug: &str) -> Result<(u32, u32)> {
        let path = catalog.image_dir().join(format!("{slug}.jpg"));
        let decoded = image::open(&path).with_context(|| format!("open {}", path.display()))?;
        Ok((decoded.width(), decoded.height()))
    }

    #[test]
    fn download_job_saves_every_product() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let transport =
            Arc::new(ScriptedTransport::new().serve(YOGA_URL, png_fixture(900, 600, [5, 6, 7])));
        let summary = engine(temp.path(), transport.clone()).run_download(&mut catalog)?;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(ImageSource::Downloaded), 1);
        assert_eq!(summary.count(ImageSource::Synthesized), 2);
        assert!(summary.all_saved());
        // unknown-item has no URL: only yoga (1) and novel (3 retries) hit the network.
        assert_eq!(transport.calls().len(), 4);
        for slug in ["yoga-mat", "unknown-item", "science-fiction-novel"] {
            assert_eq!(stored_dimensions(&catalog, slug)?, (400, 400));
        }

        let raw = std::fs::read_to_string(temp.path().join("media/summary.json"))?;
        let written: Value = serde_json::from_str(&raw)?;
        assert_eq!(written["downloaded"], 1);
        assert_eq!(written["job"], "download");
        Ok(())
    }

    #[test]
    fn download_job_is_idempotent_for_same_remote_content() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let transport =
            Arc::new(ScriptedTransport::new().serve(YOGA_URL, png_fixture(64, 64, [1, 200, 3])));
        let engine = engine(temp.path(), transport);
        let first = engine.run_download(&mut catalog)?;
        let second = engine.run_download(&mut catalog)?;
        let digests = |summary: &shopimg_contracts::runs::summary::BatchSummary| {
            summary
                .saved
                .iter()
                .map(|item| (item.slug.clone(), item.sha256.clone()))
                .collect::<Vec<(String, String)>>()
        };
        assert_eq!(digests(&first), digests(&second));
        Ok(())
    }

    #[test]
    fn placeholder_job_synthesizes_all_products_without_network() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let transport = Arc::new(ScriptedTransport::new());
        let summary = engine(temp.path(), transport.clone()).run_placeholders(&mut catalog)?;
        assert_eq!(summary.count(ImageSource::Synthesized), 3);
        assert!(transport.calls().is_empty());
        assert_eq!(
            catalog.find_product("unknown-item")?.and_then(|p| p.image),
            Some("products/unknown-item.jpg".to_string())
        );
        Ok(())
    }

    #[test]
    fn refetch_keeps_existing_image_when_all_sources_fail() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let novel = catalog
            .find_product("science-fiction-novel")?
            .ok_or_else(|| anyhow!("seeded product"))?;
        catalog.save_image(&novel, "science-fiction-novel.jpg", b"previous")?;

        let transport =
            Arc::new(ScriptedTransport::new().serve(YOGA_URL, png_fixture(40, 40, [0, 0, 0])));
        let slugs = vec![
            "yoga-mat".to_string(),
            "ghost".to_string(),
            "science-fiction-novel".to_string(),
        ];
        let summary = engine(temp.path(), transport.clone()).run_refetch(&mut catalog, &slugs)?;

        assert_eq!(summary.count(ImageSource::Downloaded), 1);
        assert_eq!(summary.skipped_with(FailureKind::NotFound), 1);
        assert_eq!(summary.skipped_with(FailureKind::Transport), 1);
        assert_eq!(
            std::fs::read(catalog.image_dir().join("science-fiction-novel.jpg"))?,
            b"previous".to_vec()
        );
        // yoga: primary x3 then alternate; novel: primary x3 then alternate.
        assert_eq!(transport.calls().len(), 8);
        assert_eq!(summary.saved[0].origin.as_deref(), Some(YOGA_URL));
        Ok(())
    }

    #[test]
    fn refetch_without_slugs_uses_table_order() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let transport = Arc::new(ScriptedTransport::new());
        let summary = engine(temp.path(), transport).run_refetch(&mut catalog, &[])?;
        let slugs = summary
            .skipped
            .iter()
            .map(|item| item.slug.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(slugs, vec!["yoga-mat", "science-fiction-novel"]);
        Ok(())
    }

    #[test]
    fn replace_job_applies_local_files_and_reports_misses() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let drop_dir = temp.path().join("drop");
        std::fs::create_dir_all(&drop_dir)?;
        std::fs::write(drop_dir.join("yoga.png"), png_fixture(1200, 300, [90, 10, 10]))?;
        std::fs::write(drop_dir.join("books.gif"), b"GIF89a-truncated")?;

        let transport = Arc::new(ScriptedTransport::new());
        let summary = engine(temp.path(), transport).run_replace(&mut catalog, &drop_dir)?;

        assert_eq!(summary.count(ImageSource::Custom), 1);
        assert_eq!(summary.skipped_with(FailureKind::FileLookup), 1);
        assert_eq!(summary.skipped_with(FailureKind::Decode), 1);
        assert_eq!(stored_dimensions(&catalog, "yoga-mat")?, (400, 400));
        Ok(())
    }

    #[test]
    fn replace_job_with_empty_directory_does_nothing() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let empty = temp.path().join("empty");
        std::fs::create_dir_all(&empty)?;
        let summary = engine(temp.path(), Arc::new(ScriptedTransport::new()))
            .run_replace(&mut catalog, &empty)?;
        assert_eq!(summary.total, 0);
        assert!(!catalog.image_dir().exists());
        Ok(())
    }

    #[test]
    fn events_cover_the_run_lifecycle() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        engine(temp.path(), Arc::new(ScriptedTransport::new())).run_placeholders(&mut catalog)?;
        let raw = std::fs::read_to_string(temp.path().join("media/events.jsonl"))?;
        let types = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row["type"].as_str().map(str::to_string))
            .collect::<Vec<String>>();
        assert_eq!(types.first().map(String::as_str), Some("run_started"));
        assert_eq!(types.last().map(String::as_str), Some("run_finished"));
        assert_eq!(types.iter().filter(|t| *t == "image_saved").count(), 3);
        assert_eq!(types.iter().filter(|t| *t == "image_synthesized").count(), 3);
        Ok(())
    }

    #[test]
    fn failure_kind_prefers_decode_errors_in_chain() {
        let decode = image::load_from_memory(b"definitely not an image")
            .map(|_| ())
            .context("unrecognized image data");
        if let Err(err) = decode {
            assert_eq!(failure_kind_of(&err), FailureKind::Decode);
        } else {
            panic!("garbage bytes decoded");
        }
        assert_eq!(failure_kind_of(&anyhow!("connection reset")), FailureKind::Transport);
    }

    #[test]
    fn error_text_dedupes_and_truncates() {
        let err = anyhow!("inner").context("inner").context("outer");
        assert_eq!(error_chain_text(&err, 100), "outer | caused by: inner");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn batch_fails_when_event_log_cannot_be_written() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory")?;
        let engine = ImageEngine::new(
            config(),
            Arc::new(ScriptedTransport::new()),
            Synthesizer::new(ColorPalette::builtin(), None, 22.0),
            EventWriter::new(blocker.join("events.jsonl"), "run-test"),
        );
        assert!(engine.run_refetch(&mut catalog, &["ghost".to_string()]).is_err());
        assert!(!catalog.image_dir().exists());
        Ok(())
    }

    #[test]
    fn refetch_runs_on_its_own_transport_at_high_quality() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let shared = Arc::new(ScriptedTransport::new());
        let refetch =
            Arc::new(ScriptedTransport::new().serve(NOVEL_URL, png_fixture(50, 80, [4, 4, 4])));
        let engine = engine(temp.path(), shared.clone()).with_refetch_transport(refetch.clone());
        let summary =
            engine.run_refetch(&mut catalog, &["science-fiction-novel".to_string()])?;

        assert_eq!(summary.count(ImageSource::Downloaded), 1);
        assert!(shared.calls().is_empty());
        assert_eq!(refetch.calls(), vec![NOVEL_URL.to_string()]);
        let raw = std::fs::read_to_string(temp.path().join("media/events.jsonl"))?;
        let saved = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|row| row["type"] == "image_saved")
            .ok_or_else(|| anyhow!("image_saved event"))?;
        assert_eq!(saved["quality"], 95);
        Ok(())
    }
}
