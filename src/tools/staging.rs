use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::tools::envelope::{ArtifactHandle, ContentKind};
use crate::tools::error::StagingError;
use crate::tools::local_ops::format_for_extension;

const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    Generated { dir: PathBuf, stem: String },
    Explicit(PathBuf),
}

impl Reservation {
    /// An explicit path keeps its name when its extension already names the
    /// encoded format. A different image extension is swapped out; anything
    /// else gets the real extension appended so the name never lies.
    pub fn final_path(&self, extension: &str) -> PathBuf {
        match self {
            Self::Generated { dir, stem } => dir.join(format!("{stem}.{extension}")),
            Self::Explicit(path) => {
                let Some(current) = path.extension().and_then(|e| e.to_str()) else {
                    return path.with_extension(extension);
                };
                let current_format = format_for_extension(current);
                let same_format =
                    current_format.is_some() && current_format == format_for_extension(extension);
                if same_format || current.eq_ignore_ascii_case(extension) {
                    path.clone()
                } else if current_format.is_some() {
                    path.with_extension(extension)
                } else {
                    let mut name = path.as_os_str().to_os_string();
                    name.push(".");
                    name.push(extension);
                    PathBuf::from(name)
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct ArtifactStager {
    output_dir: PathBuf,
    counter: AtomicU64,
}

impl ArtifactStager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_path()
    }

    pub fn stage(
        &self,
        tool: &str,
        hint: &str,
        explicit: Option<&Path>,
    ) -> Result<Reservation, StagingError> {
        if let Some(path) = explicit {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                create_dir(parent)?;
            }
            return Ok(Reservation::Explicit(path.to_path_buf()));
        }

        create_dir(self.output_dir.as_path())?;
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let slug = {
            let s = slugify(hint);
            if s.is_empty() {
                String::from("image")
            } else {
                s
            }
        };
        let stem = format!(
            "{}_{}_{}_{:04}_{}",
            slugify(tool),
            slug,
            make_stamp(),
            seq,
            random_suffix()
        );
        Ok(Reservation::Generated {
            dir: self.output_dir.clone(),
            stem,
        })
    }

    pub fn commit(
        &self,
        reservation: &Reservation,
        bytes: &[u8],
        extension: &str,
    ) -> Result<ArtifactHandle, StagingError> {
        let final_path = reservation.final_path(extension);
        let dir = final_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let temp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(error) = write_synced(temp_path.as_path(), bytes)
            .and_then(|_| fs::rename(temp_path.as_path(), final_path.as_path()))
        {
            let _ = fs::remove_file(temp_path.as_path());
            return Err(StagingError::WriteFailure {
                path: final_path,
                detail: error.to_string(),
            });
        }

        let path = fs::canonicalize(final_path.as_path())
            .or_else(|_| std::path::absolute(final_path.as_path()))
            .unwrap_or(final_path);
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact committed");
        Ok(ArtifactHandle {
            path,
            content_kind: ContentKind::Image,
            size_bytes: bytes.len() as u64,
        })
    }
}

fn create_dir(path: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(path).map_err(|error| StagingError::WriteFailure {
        path: path.to_path_buf(),
        detail: error.to_string(),
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

pub(crate) fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len().min(MAX_SLUG_LEN));
    let mut last_was_sep = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        if out.len() >= MAX_SLUG_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
            continue;
        }
        if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.starts_with('_') {
        out.remove(0);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn make_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
