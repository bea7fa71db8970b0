//! On-demand diagnostic artifacts: page source and screenshots
//!
//! An [`ArtifactCollector`] never fails the invocation it serves. Whatever
//! goes wrong while capturing is logged and reported as `None`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::{Position, Url};

use crate::config::HarnessConfig;
use crate::context::InvocationContext;
use crate::driver::{DriverHandle, TAKES_PAGE_SOURCE, TAKES_SCREENSHOT};
use crate::error::{DriverError, HarnessError, HarnessResult};
use crate::lifecycle::DriverManager;

/// Size of the placeholder image stored for drivers that cannot take screenshots.
const PROXY_WIDTH: u32 = 155;
const PROXY_HEIGHT: u32 = 45;

/// Captured bytes and the file extension they should be stored with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// One kind of diagnostic artifact.
pub trait ArtifactType: Send + Sync {
    /// Subdirectory of the artifact output directory.
    fn kind(&self) -> &'static str;

    /// Whether a driver with the needed capability is attached. Must not
    /// talk to the driver.
    fn can_get_artifact(&self, ctx: &InvocationContext) -> bool;

    fn get_artifact(&self, ctx: &InvocationContext) -> HarnessResult<Artifact>;
}

/// Writes artifacts of one type into the configured output directory.
pub struct ArtifactCollector<T: ArtifactType> {
    artifact: T,
    output_dir: PathBuf,
}

pub type PageSourceCapture = ArtifactCollector<PageSourceArtifact>;
pub type ScreenshotCapture = ArtifactCollector<ScreenshotArtifact>;

impl<T: ArtifactType> ArtifactCollector<T> {
    pub fn new(artifact: T, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(artifact: T, config: &HarnessConfig) -> Self {
        Self::new(artifact, config.artifacts.output_dir.clone())
    }

    pub fn kind(&self) -> &'static str {
        self.artifact.kind()
    }

    pub fn can_get_artifact(&self, ctx: &InvocationContext) -> bool {
        self.artifact.can_get_artifact(ctx)
    }

    /// Capture and store an artifact, returning the written file.
    pub fn capture_artifact(&self, ctx: &InvocationContext) -> Option<PathBuf> {
        if !self.can_get_artifact(ctx) {
            debug!(kind = self.kind(), test = ctx.test_name(), "Artifact not available");
            return None;
        }
        match self.capture(ctx) {
            Ok(path) => {
                info!(kind = self.kind(), path = %path.display(), "Captured artifact");
                Some(path)
            }
            Err(e) => {
                warn!(kind = self.kind(), test = ctx.test_name(), "Artifact capture failed: {}", e);
                None
            }
        }
    }

    fn capture(&self, ctx: &InvocationContext) -> HarnessResult<PathBuf> {
        let artifact = self.artifact.get_artifact(ctx)?;
        let dir = self.output_dir.join(self.kind());
        std::fs::create_dir_all(&dir)?;

        let path = unique_path(&dir, &sanitize(ctx.test_name()), artifact.extension);
        std::fs::write(&path, &artifact.bytes)?;

        let digest = hex::encode(Sha256::digest(&artifact.bytes));
        debug!(path = %path.display(), sha256 = %digest, bytes = artifact.bytes.len(), "Artifact written");
        Ok(path)
    }
}

fn attached(ctx: &InvocationContext) -> HarnessResult<&DriverHandle> {
    DriverManager::get_driver(ctx)
        .ok_or_else(|| HarnessError::DriverNotAvailable(ctx.test_name().to_string()))
}

/// Screenshot of the current viewport, stored as PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenshotArtifact;

impl ArtifactType for ScreenshotArtifact {
    fn kind(&self) -> &'static str {
        "screenshots"
    }

    fn can_get_artifact(&self, ctx: &InvocationContext) -> bool {
        DriverManager::get_driver(ctx)
            .map(|handle| handle.driver().as_screenshot().is_some())
            .unwrap_or(false)
    }

    fn get_artifact(&self, ctx: &InvocationContext) -> HarnessResult<Artifact> {
        let driver = attached(ctx)?.driver();
        let screenshot = driver
            .as_screenshot()
            .ok_or_else(|| HarnessError::Capture("driver cannot take screenshots".into()))?;

        let reports_incapable = driver
            .capabilities()
            .ok()
            .and_then(|caps| caps.flag(TAKES_SCREENSHOT))
            == Some(false);
        let bytes = if reports_incapable {
            proxy_png()?
        } else {
            match screenshot.screenshot_png() {
                Ok(bytes) => bytes,
                Err(DriverError::UnsupportedCommand(_)) => proxy_png()?,
                Err(e) => return Err(HarnessError::Capture(e.to_string())),
            }
        };
        Ok(Artifact {
            bytes,
            extension: "png",
        })
    }
}

fn proxy_png() -> HarnessResult<Vec<u8>> {
    let image = RgbImage::from_pixel(PROXY_WIDTH, PROXY_HEIGHT, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Serialized document (HTML) or view hierarchy (XML).
#[derive(Debug, Clone, Copy, Default)]
pub struct PageSourceArtifact;

impl ArtifactType for PageSourceArtifact {
    fn kind(&self) -> &'static str {
        "page-source"
    }

    fn can_get_artifact(&self, ctx: &InvocationContext) -> bool {
        DriverManager::get_driver(ctx)
            .map(|handle| handle.driver().as_hierarchy().is_some())
            .unwrap_or(false)
    }

    fn get_artifact(&self, ctx: &InvocationContext) -> HarnessResult<Artifact> {
        let driver = attached(ctx)?.driver();
        let hierarchy = driver
            .as_hierarchy()
            .ok_or_else(|| HarnessError::Capture("driver cannot serialize its hierarchy".into()))?;
        if driver.capabilities().ok().and_then(|caps| caps.flag(TAKES_PAGE_SOURCE)) == Some(false) {
            return Err(HarnessError::Capture(
                "driver reports it cannot produce page source".into(),
            ));
        }

        let source = hierarchy
            .page_source()
            .map_err(|e| HarnessError::Capture(e.to_string()))?;
        // current URL is best effort; the source alone is still worth keeping
        let url = driver.current_url().ok();
        let (text, extension) = enrich_page_source(&source, url.as_deref(), ctx.failure());
        Ok(Artifact {
            bytes: text.into_bytes(),
            extension,
        })
    }
}

/// Annotate captured source with its origin and the failure that prompted it.
///
/// HTML gets a `<base href>` so relative resources resolve when the file is
/// opened from disk. Comments go after the XML declaration when present.
pub fn enrich_page_source(
    source: &str,
    url: Option<&str>,
    failure: Option<&str>,
) -> (String, &'static str) {
    let is_xml = source.trim_start().starts_with("<?xml");

    let mut comments = String::new();
    if let Some(url) = url {
        comments.push_str(&format!("<!-- Original URL: {} -->\n", comment_safe(url)));
    }
    if let Some(failure) = failure {
        comments.push_str(&format!("<!-- Failure: {} -->\n", comment_safe(failure)));
    }

    if is_xml {
        let split = source.find("?>").map(|i| i + 2).unwrap_or(0);
        let (decl, body) = source.split_at(split);
        let sep = if decl.is_empty() { "" } else { "\n" };
        return (format!("{decl}{sep}{comments}{}", body.trim_start_matches('\n')), "xml");
    }

    let body = match url.and_then(base_href) {
        Some(href) => insert_base(source, &href),
        None => source.to_string(),
    };
    (format!("{comments}{body}"), "html")
}

fn insert_base(source: &str, href: &str) -> String {
    let Some(open) = source.find("<head>") else {
        return source.to_string();
    };
    let offset = open + "<head>".len();
    let head_end = source[offset..]
        .find("</head>")
        .map(|i| offset + i)
        .unwrap_or(source.len());
    if source[offset..head_end].contains("<base ") {
        return source.to_string();
    }
    format!(
        "{}\n<base href=\"{}\">\n{}",
        &source[..offset],
        href,
        &source[offset..]
    )
}

/// Scheme, authority and directory of `url`.
fn base_href(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let dir = &path[..path.rfind('/').map(|i| i + 1).unwrap_or(0)];
    Some(format!("{}{}", &parsed[..Position::BeforePath], dir))
}

fn comment_safe(text: &str) -> String {
    let mut text = text.to_string();
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    text
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.{extension}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.{extension}"));
        n += 1;
    }
    path
}
