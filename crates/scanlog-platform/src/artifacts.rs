use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use scanlog_core::{artifact_name, LogConfig};
use scanlog_observability::Span;
use serde::Serialize;
use sha2::{Digest, Sha256};

const ARTIFACT_EXT: &str = "png";

// 8-bit RGBA pixels, row-major, no padding.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Image {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow!("image dimensions overflow: {width}x{height}"))?;
        if width == 0 || height == 0 {
            return Err(anyhow!("image must not be empty: {width}x{height}"));
        }
        if rgba.len() != expected {
            return Err(anyhow!(
                "rgba buffer size mismatch: got {} bytes, expected {expected} for {width}x{height}",
                rgba.len()
            ));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut enc = png::Encoder::new(&mut out, self.width, self.height);
            enc.set_color(png::ColorType::Rgba);
            enc.set_depth(png::BitDepth::Eight);
            let mut writer = enc.write_header().context("png header failed")?;
            writer
                .write_image_data(&self.rgba)
                .context("png encode failed")?;
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    Capture,
    Debug,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub bytes_written: usize,
    pub sha256: String,
}

fn sha256_hex(b: &[u8]) -> String {
    hex::encode(Sha256::digest(b))
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    trace_dir: PathBuf,
    capture_dir: PathBuf,
    debug_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(trace_dir: PathBuf, capture_dir: PathBuf, debug_dir: PathBuf) -> Self {
        Self {
            trace_dir,
            capture_dir,
            debug_dir,
        }
    }

    pub fn from_config(cfg: &LogConfig) -> Self {
        Self::new(cfg.data_dir.clone(), cfg.capture_dir(), cfg.debug_dir())
    }

    pub fn dir(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Capture => &self.capture_dir,
            ArtifactKind::Debug => &self.debug_dir,
        }
    }

    // Encode `image` and write it as `<name><index>.png` under the directory
    // for `kind`, never overwriting an existing file.
    pub fn persist(&self, image: &Image, kind: ArtifactKind, name: &str) -> Result<ArtifactInfo> {
        let span = Span::start(
            &self.trace_dir,
            "Artifact",
            "ARTIFACT.persist",
            Some(serde_json::json!({
                "kind": kind,
                "name": name,
                "width": image.width(),
                "height": image.height(),
            })),
        );
        match self.persist_inner(image, kind, name) {
            Ok(info) => {
                span.ok(Some(serde_json::json!({
                    "path": info.path.display().to_string(),
                    "bytes": info.bytes_written,
                    "sha256": info.sha256,
                })));
                Ok(info)
            }
            Err(e) => {
                span.err_anyhow("io", "E_ARTIFACT_PERSIST", &e);
                Err(e)
            }
        }
    }

    fn persist_inner(&self, image: &Image, kind: ArtifactKind, name: &str) -> Result<ArtifactInfo> {
        let bytes = image.encode_png()?;
        let dir = self.dir(kind);
        fs::create_dir_all(dir)
            .with_context(|| format!("create artifact dir failed: {}", dir.display()))?;
        let path = artifact_name::unique_path(dir, name, ARTIFACT_EXT);
        fs::write(&path, &bytes)
            .with_context(|| format!("write artifact failed: {}", path.display()))?;
        Ok(ArtifactInfo {
            path,
            bytes_written: bytes.len(),
            sha256: sha256_hex(&bytes),
        })
    }

    // Delete files directly under the directory for `kind` whose name
    // matches `pattern`. A missing directory deletes nothing.
    pub fn clear(&self, kind: ArtifactKind, pattern: &str) -> Result<usize> {
        let dir = self.dir(kind);
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("list artifact dir failed: {}", dir.display()))
            }
        };

        let mut removed = 0usize;
        for ent in entries {
            let ent = ent.with_context(|| format!("list artifact dir failed: {}", dir.display()))?;
            let is_file = ent.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = ent.file_name();
            if !artifact_name::wildcard_match(pattern, &name.to_string_lossy()) {
                continue;
            }
            let p = ent.path();
            fs::remove_file(&p)
                .with_context(|| format!("delete artifact failed: {}", p.display()))?;
            removed += 1;
        }

        scanlog_observability::trace::event(
            &self.trace_dir,
            "Artifact",
            "ARTIFACT.clear",
            "ok",
            Some(serde_json::json!({"kind": kind, "pattern": pattern, "removed": removed})),
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Image {
        Image::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128]).expect("image")
    }

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(root.to_path_buf(), root.join("Data"), root.join("Data").join("Debug"))
    }

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(Image::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Image::from_rgba(0, 2, vec![]).is_err());
    }

    #[test]
    fn persist_picks_fresh_index_and_reuses_gaps() {
        let td = tempfile::tempdir().expect("tempdir");
        let s = store(td.path());

        let a = s.persist(&tiny(), ArtifactKind::Capture, "slot icon").expect("first");
        let b = s.persist(&tiny(), ArtifactKind::Capture, "slot icon").expect("second");
        assert_eq!(a.path, td.path().join("Data").join("slot_icon0.png"));
        assert_eq!(b.path, td.path().join("Data").join("slot_icon1.png"));
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha256.len(), 64);

        fs::remove_file(&a.path).expect("remove 0");
        let c = s.persist(&tiny(), ArtifactKind::Capture, "slot icon").expect("third");
        assert_eq!(c.path, a.path);

        let raw = fs::read(&c.path).expect("read png");
        assert_eq!(&raw[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(raw.len(), c.bytes_written);
    }

    #[test]
    fn clear_matches_pattern_only() {
        let td = tempfile::tempdir().expect("tempdir");
        let s = store(td.path());
        s.persist(&tiny(), ArtifactKind::Debug, "mat").expect("0");
        s.persist(&tiny(), ArtifactKind::Debug, "mat").expect("1");
        s.persist(&tiny(), ArtifactKind::Debug, "icon").expect("icon");
        fs::write(s.dir(ArtifactKind::Debug).join("notes.txt"), b"keep").expect("notes");

        assert_eq!(s.clear(ArtifactKind::Debug, "mat*.png").expect("clear mats"), 2);
        assert_eq!(s.clear(ArtifactKind::Debug, "*.png").expect("clear rest"), 1);
        assert!(s.dir(ArtifactKind::Debug).join("notes.txt").exists());
    }

    #[test]
    fn clear_missing_dir_is_noop() {
        let td = tempfile::tempdir().expect("tempdir");
        let s = store(&td.path().join("never-created"));
        assert_eq!(s.clear(ArtifactKind::Capture, "*.png").expect("clear"), 0);
        assert_eq!(s.clear(ArtifactKind::Debug, "*.png").expect("clear"), 0);
    }
}
