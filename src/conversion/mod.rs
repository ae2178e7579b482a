//! Asset Conversion Pipeline
//!
//! Turns a template's source image into a downloadable PNG, JPG or PDF. Conversion failures are
//! not fatal: the original asset is delivered instead, and only when that fails too is the
//! download reported as failed.

use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    audit::{DownloadAuditLog, DownloadRecord},
    catalog::{Template, TemplateId},
    notify::{Notice, Notifier},
    session::Session,
};

pub mod format;
pub mod pdf;
pub mod raster;
pub mod sink;
pub mod source;

pub use format::{TargetFormat, content_type_for_extension};
pub use raster::{AssetEncoder, RasterEncoder};
pub use sink::{DirectorySink, Download, DownloadSink};
pub use source::{AssetSource, DefaultAssetSource, FetchError, FileAssetSource, HttpAssetSource};

/// Extension used when the source location has none.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Errors loading a source image
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bytes could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors encoding a target format
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Raster codec failure
    #[error("image codec failed: {0}")]
    Image(#[from] image::ImageError),

    /// PDF assembly failure
    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Write failure while compressing or serialising
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    /// The image has no pixels
    #[error("image has no pixels")]
    EmptyImage,
}

/// Conversion errors
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The source could not be fetched or decoded
    #[error("failed to load {location}")]
    Load {
        /// Source location
        location: String,

        /// Underlying error
        #[source]
        source: LoadError,
    },

    /// The target format could not be produced
    #[error("failed to encode {format}")]
    Encode {
        /// Requested format
        format: TargetFormat,

        /// Underlying error
        #[source]
        source: EncodeError,
    },
}

/// Why a converted file could not be delivered
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Conversion failed
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The converted file could not be saved
    #[error("failed to save download: {0}")]
    Save(#[source] io::Error),
}

/// Why the original asset could not be delivered
#[derive(Debug, Error)]
pub enum FallbackError {
    /// The original could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The original could not be saved
    #[error("failed to save download: {0}")]
    Save(#[source] io::Error),
}

/// Download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Nobody is signed in
    #[error("sign in to download templates")]
    AuthorizationRequired,

    /// The same template is already being downloaded
    #[error("template {0} is already downloading")]
    InProgress(TemplateId),

    /// Neither the conversion nor the original asset could be delivered
    #[error("download of {template} failed")]
    Failed {
        /// Template name
        template: String,

        /// Why conversion failed
        conversion: DeliveryError,

        /// Why the fallback failed
        #[source]
        source: FallbackError,
    },
}

/// An encoded file, ready to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedAsset {
    /// Encoded bytes
    pub bytes: Vec<u8>,

    /// MIME type
    pub content_type: &'static str,

    /// File extension, without the dot
    pub extension: &'static str,
}

/// What was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    /// The requested format
    Converted(TargetFormat),

    /// The unmodified source asset
    Original {
        /// Extension taken from the source location
        extension: String,
    },
}

/// A completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Saved file name
    pub file_name: String,

    /// Where the sink put it
    pub saved_to: PathBuf,

    /// What was delivered
    pub delivered: Delivered,
}

impl DownloadOutcome {
    /// Whether the original asset was delivered instead of a conversion
    pub fn is_fallback(&self) -> bool {
        matches!(self.delivered, Delivered::Original { .. })
    }
}

/// Template download pipeline.
pub struct AssetPipeline {
    source: Arc<dyn AssetSource>,
    encoder: Arc<dyn AssetEncoder>,
    sink: Arc<dyn DownloadSink>,
    audit: Arc<dyn DownloadAuditLog>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<FxHashSet<TemplateId>>,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    /// Pipeline with the [`RasterEncoder`].
    pub fn new(
        source: Arc<dyn AssetSource>,
        sink: Arc<dyn DownloadSink>,
        audit: Arc<dyn DownloadAuditLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            encoder: Arc::new(RasterEncoder),
            sink,
            audit,
            notifier,
            in_flight: Mutex::new(FxHashSet::default()),
        }
    }

    /// Replace the encoder.
    #[must_use]
    pub fn with_encoder(mut self, encoder: Arc<dyn AssetEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Whether a download of the template is running
    pub fn is_downloading(&self, template: TemplateId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&template)
    }

    /// Fetch, decode and re-encode the asset at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Load`] if the source cannot be fetched or decoded, and
    /// [`ConversionError::Encode`] if the target format cannot be produced.
    pub async fn convert(
        &self,
        location: &str,
        format: TargetFormat,
    ) -> Result<ConvertedAsset, ConversionError> {
        let load_error = |source: LoadError| ConversionError::Load {
            location: location.to_string(),
            source,
        };

        let bytes = self
            .source
            .fetch(location)
            .await
            .map_err(|error| load_error(error.into()))?;

        let encoder = Arc::clone(&self.encoder);
        let owned_location = location.to_string();

        let bytes = tokio::task::spawn_blocking(move || {
            transcode(encoder.as_ref(), owned_location, &bytes, format)
        })
        .await
        .map_err(|error| ConversionError::Encode {
            format,
            source: io::Error::other(error).into(),
        })??;

        Ok(ConvertedAsset {
            bytes,
            content_type: format.content_type(),
            extension: format.extension(),
        })
    }

    /// Download a template in the requested format, falling back to the original asset.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::AuthorizationRequired`] for anonymous sessions,
    /// [`DownloadError::InProgress`] if the template is already downloading, and
    /// [`DownloadError::Failed`] when neither the conversion nor the original could be saved.
    #[instrument(skip_all, fields(template = %template.id(), format = %format))]
    pub async fn download(
        &self,
        session: &Session,
        template: &Template,
        format: TargetFormat,
    ) -> Result<DownloadOutcome, DownloadError> {
        if !session.is_authenticated() {
            self.notifier.notify(Notice::destructive(
                "Please log in",
                "You need to be logged in to download templates.",
            ));

            return Err(DownloadError::AuthorizationRequired);
        }

        let _in_flight = InFlight::claim(&self.in_flight, template.id())
            .ok_or(DownloadError::InProgress(template.id()))?;

        let stem = sanitize_asset_name(template.name());

        let outcome = match self.deliver_converted(template, format, &stem).await {
            Ok(outcome) => {
                self.notifier.notify(Notice::info(
                    "Download completed",
                    format!("{} downloaded as {}.", template.name(), format.label()),
                ));

                outcome
            }
            Err(conversion) => {
                warn!(error = %conversion, "conversion failed, delivering original asset");

                match self.deliver_original(template, &stem).await {
                    Ok(outcome) => {
                        self.notifier.notify(Notice::info(
                            "Download completed",
                            "Downloaded in original format due to conversion issue.",
                        ));

                        outcome
                    }
                    Err(source) => {
                        warn!(error = %source, "original asset could not be delivered");

                        self.notifier.notify(Notice::destructive(
                            "Download failed",
                            "There was an error downloading the file. Please try again.",
                        ));

                        return Err(DownloadError::Failed {
                            template: template.name().to_string(),
                            conversion,
                            source,
                        });
                    }
                }
            }
        };

        info!(file = %outcome.file_name, fallback = outcome.is_fallback(), "template downloaded");

        let record = DownloadRecord {
            template_id: template.id(),
            template_name: template.name().to_string(),
            format: format.label().to_string(),
            fallback: outcome.is_fallback(),
            downloaded_at: Timestamp::now(),
        };

        if let Err(error) = self.audit.append(record).await {
            warn!(%error, "failed to record download");
        }

        Ok(outcome)
    }

    async fn deliver_converted(
        &self,
        template: &Template,
        format: TargetFormat,
        stem: &str,
    ) -> Result<DownloadOutcome, DeliveryError> {
        let asset = self.convert(template.image(), format).await?;
        let file_name = format!("{stem}.{}", asset.extension);

        let saved_to = self
            .sink
            .save(Download {
                file_name: file_name.clone(),
                content_type: asset.content_type,
                bytes: asset.bytes,
            })
            .await
            .map_err(DeliveryError::Save)?;

        Ok(DownloadOutcome {
            file_name,
            saved_to,
            delivered: Delivered::Converted(format),
        })
    }

    async fn deliver_original(
        &self,
        template: &Template,
        stem: &str,
    ) -> Result<DownloadOutcome, FallbackError> {
        let bytes = self.source.fetch(template.image()).await?;
        let extension = source_extension(template.image());
        let file_name = format!("{stem}.{extension}");

        let saved_to = self
            .sink
            .save(Download {
                file_name: file_name.clone(),
                content_type: content_type_for_extension(&extension),
                bytes,
            })
            .await
            .map_err(FallbackError::Save)?;

        Ok(DownloadOutcome {
            file_name,
            saved_to,
            delivered: Delivered::Original { extension },
        })
    }
}

/// Marks a template as downloading until dropped.
struct InFlight<'a> {
    set: &'a Mutex<FxHashSet<TemplateId>>,
    template: TemplateId,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<FxHashSet<TemplateId>>, template: TemplateId) -> Option<Self> {
        let claimed = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template);

        claimed.then_some(Self { set, template })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.template);
    }
}

/// File stem for a template name: ASCII letters and digits kept, everything else `_`,
/// lower-cased.
pub fn sanitize_asset_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn transcode(
    encoder: &dyn AssetEncoder,
    location: String,
    bytes: &[u8],
    format: TargetFormat,
) -> Result<Vec<u8>, ConversionError> {
    let image = image::load_from_memory(bytes).map_err(|error| ConversionError::Load {
        location,
        source: error.into(),
    })?;

    encoder
        .encode(&image, format)
        .map_err(|source| ConversionError::Encode { format, source })
}

/// Extension of the last path segment of a location, ignoring any query or fragment.
///
/// Returns [`FALLBACK_EXTENSION`] when the segment has none.
pub fn source_extension(location: &str) -> String {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or(location);

    let segment = path.rsplit('/').next().unwrap_or(path);

    segment
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .filter(|extension| !extension.is_empty())
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string()
}
