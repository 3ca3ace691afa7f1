//! Dockerfile / dockerignore commands - render packaging files

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::packaging::{render_dockerignore, ImageSpec, PackagingConfig};

/// Arguments for the render commands
#[derive(Args, Clone, Debug)]
pub struct RenderArgs {
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Render the Dockerfile for the default service image.
/// Nothing is written when the image description is invalid.
pub fn dockerfile(args: RenderArgs) -> anyhow::Result<()> {
    let rendered = ImageSpec::for_service(&PackagingConfig::default()).render()?;
    write_output(args.output.as_deref(), &rendered)
}

pub fn dockerignore(args: RenderArgs) -> anyhow::Result<()> {
    write_output(args.output.as_deref(), &render_dockerignore())
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dockerfile_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dockerfile");

        dockerfile(RenderArgs {
            output: Some(path.clone()),
        })
        .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, include_str!("../../../Dockerfile"));
    }

    #[test]
    fn test_dockerignore_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".dockerignore");

        dockerignore(RenderArgs {
            output: Some(path.clone()),
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), render_dockerignore());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("Dockerfile");

        let err = write_output(Some(&path), "FROM scratch\n").unwrap_err();
        assert!(err.to_string().contains("failed to write"));
    }
}
