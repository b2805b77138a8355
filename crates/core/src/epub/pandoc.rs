//! Delegate tier: EPUB conversion through an installed pandoc binary.
//!
//! The conversion is two-stage (Markdown to standalone HTML, then HTML to
//! EPUB3) because pandoc resolves staged image resources reliably from HTML
//! input. Any non-zero exit or missing/empty output at either stage is a
//! tier failure, which the caller treats as a fall-through, not an error.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{EpubMeta, image_refs, reencode_to_png, resolve_local_ref, strip_citation_header};

/// Handle to a located pandoc executable.
#[derive(Debug, Clone)]
pub struct Pandoc {
    path: PathBuf,
}

impl Pandoc {
    /// Capability probe: look for pandoc on `PATH`.
    ///
    /// Absence is not an error, only a signal to use the fallback tier.
    pub fn find() -> Option<Self> {
        let exe = if cfg!(windows) { "pandoc.exe" } else { "pandoc" };
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(exe))
            .find(|candidate| candidate.is_file())
            .map(|path| Pandoc { path })
    }

    /// Convert Markdown to EPUB bytes via the external tool.
    ///
    /// Stages locally-referenced images into a temp directory, re-encoded to
    /// PNG (or copied verbatim when re-encoding fails), and rewrites their
    /// references before handing the document to pandoc.
    pub fn convert(
        &self,
        markdown: &str,
        meta: &EpubMeta<'_>,
        images_dir: Option<&Path>,
    ) -> Result<Vec<u8>, String> {
        let staging = tempfile::tempdir().map_err(|e| e.to_string())?;
        let media_dir = staging.path().join("media");
        std::fs::create_dir_all(&media_dir).map_err(|e| e.to_string())?;

        let mut body = strip_citation_header(markdown);

        let mut staged = 0usize;
        if let Some(images_dir) = images_dir {
            for reference in image_refs(&body) {
                let Some(source) = resolve_local_ref(&reference, images_dir) else {
                    continue;
                };
                staged += 1;

                let staged_ref = match reencode_to_png(&source) {
                    Some(png) => {
                        let name = format!("img_{staged}.png");
                        std::fs::write(media_dir.join(&name), png).map_err(|e| e.to_string())?;
                        format!("media/{name}")
                    }
                    None => {
                        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
                        let name = format!("img_{staged}.{ext}");
                        std::fs::copy(&source, media_dir.join(&name)).map_err(|e| e.to_string())?;
                        format!("media/{name}")
                    }
                };
                body = body.replace(&reference, &staged_ref);
            }
        }

        if !body.trim_start().starts_with('#') {
            body = format!("# {}\n\n{}", meta.title, body);
        }

        let md_path = staging.path().join("content.md");
        let html_path = staging.path().join("content.html");
        let epub_path = staging.path().join("output.epub");
        std::fs::write(&md_path, &body).map_err(|e| e.to_string())?;

        self.run_stage(
            "MD->HTML",
            &[
                md_path.as_os_str(),
                "-o".as_ref(),
                html_path.as_os_str(),
                "-f".as_ref(),
                "markdown".as_ref(),
                "-t".as_ref(),
                "html".as_ref(),
                "--standalone".as_ref(),
            ],
        )?;

        let title_meta = format!("--metadata=title:{}", meta.title);
        let author_meta = format!("--metadata=author:{}", meta.author);
        let resource_path = format!("--resource-path={}", staging.path().display());
        let mut args: Vec<&std::ffi::OsStr> = vec![
            html_path.as_os_str(),
            "-o".as_ref(),
            epub_path.as_os_str(),
            "-f".as_ref(),
            "html".as_ref(),
            "-t".as_ref(),
            "epub3".as_ref(),
            title_meta.as_ref(),
            author_meta.as_ref(),
        ];
        if staged > 0 {
            args.push(resource_path.as_ref());
        }
        self.run_stage("HTML->EPUB", &args)?;

        match std::fs::read(&epub_path) {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => Err("pandoc produced an empty EPUB".to_string()),
            Err(_) => Err("pandoc did not produce an EPUB".to_string()),
        }
    }

    fn run_stage(&self, stage: &str, args: &[&std::ffi::OsStr]) -> Result<(), String> {
        let output = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|e| format!("pandoc {stage} failed to spawn: {e}"))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail: String = stderr.chars().take(200).collect();
            Err(format!("pandoc {stage} failed: {detail}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_does_not_panic() {
        // Present or not, the probe must be a clean Option.
        let _ = Pandoc::find();
    }

    #[test]
    fn test_missing_binary_is_stage_failure() {
        let pandoc = Pandoc { path: PathBuf::from("/nonexistent/pandoc-binary") };
        let meta = EpubMeta { title: "T", author: "A", source_url: "http://s" };
        let result = pandoc.convert("# T\n\nBody", &meta, None);
        assert!(result.is_err());
    }
}
