//! Container packaging: the image build pipeline and the process it launches,
//! described as typed values and rendered to `Dockerfile` / `.dockerignore`

mod dockerignore;
mod error;
mod image;
mod launch;

pub use dockerignore::render_dockerignore;
pub use error::PackagingError;
pub use image::{BaseImage, ImageSpec, Instruction, PackagingConfig, Stage};
pub use launch::{LaunchCommand, DEFAULT_PORT, DEFAULT_WORKERS};
