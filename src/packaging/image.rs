//! Typed image build pipeline and its Dockerfile rendering

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::PackagingError;
use super::launch::{validate_argv, LaunchCommand, DEFAULT_PORT, DEFAULT_WORKERS};

/// `<major>.<minor>` with an optional `-variant`; the patch level floats
static PINNED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+(-[a-z0-9][a-z0-9.-]*)?$").expect("valid pinned tag regex")
});

const MANIFEST: &str = "Cargo.toml";
const LOCKFILE: &str = "Cargo.lock";
const RELEASE_BUILD: &str = "cargo build --release --locked";
const HEADER: &str = "# Generated by `hospital-bulk-import dockerfile`. Do not edit by hand.";

/// A base image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImage {
    pub repository: String,
    pub tag: String,
}

impl BaseImage {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    pub fn is_pinned(&self) -> bool {
        PINNED_TAG.is_match(&self.tag)
    }
}

impl fmt::Display for BaseImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// One build instruction; each produces one image layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Shell steps run in a single layer
    Run(Vec<String>),
    Copy {
        from: Option<String>,
        sources: Vec<String>,
        dest: String,
    },
    Workdir(String),
    Env { key: String, value: String },
    Expose(u16),
    Cmd(Vec<String>),
}

impl Instruction {
    pub fn run<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Run(steps.into_iter().map(Into::into).collect())
    }

    pub fn copy<I, S>(sources: I, dest: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Copy {
            from: None,
            sources: sources.into_iter().map(Into::into).collect(),
            dest: dest.into(),
        }
    }

    pub fn copy_from(
        stage: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
    ) -> Self {
        Self::Copy {
            from: Some(stage.into()),
            sources: vec![source.into()],
            dest: dest.into(),
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::Run(_) => "RUN",
            Self::Copy { .. } => "COPY",
            Self::Workdir(_) => "WORKDIR",
            Self::Env { .. } => "ENV",
            Self::Expose(_) => "EXPOSE",
            Self::Cmd(_) => "CMD",
        }
    }

    /// Copies the dependency manifest without the rest of the tree
    fn copies_manifest(&self) -> bool {
        matches!(self, Self::Copy { from: None, sources, .. }
            if sources.iter().any(|s| s == MANIFEST) && !sources.iter().any(|s| s == "."))
    }

    /// Copies the whole build context
    fn copies_source(&self) -> bool {
        matches!(self, Self::Copy { from: None, sources, .. } if sources.iter().any(|s| s == "."))
    }

    fn render(&self) -> String {
        match self {
            Self::Run(steps) => format!("RUN {}", steps.join(" \\\n    && ")),
            Self::Copy {
                from,
                sources,
                dest,
            } => match from {
                Some(stage) => format!("COPY --from={} {} {}", stage, sources.join(" "), dest),
                None => format!("COPY {} {}", sources.join(" "), dest),
            },
            Self::Workdir(dir) => format!("WORKDIR {}", dir),
            Self::Env { key, value } => format!("ENV {}={}", key, value),
            Self::Expose(port) => format!("EXPOSE {}", port),
            Self::Cmd(argv) => {
                let quoted: Vec<String> = argv.iter().map(|a| format!("{:?}", a)).collect();
                format!("CMD [{}]", quoted.join(","))
            }
        }
    }
}

/// A named build stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: String,
    pub base: BaseImage,
    pub instructions: Vec<Instruction>,
}

impl Stage {
    pub fn new(name: impl Into<String>, base: BaseImage) -> Self {
        Self {
            name: name.into(),
            base,
            instructions: Vec::new(),
        }
    }

    pub fn with(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    fn count(&self, keyword: &str) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.keyword() == keyword)
            .count()
    }

    fn validate(&self, earlier: &[&str]) -> Result<(), PackagingError> {
        if !self.base.is_pinned() {
            return Err(PackagingError::unpinned_tag(self.base.to_string()));
        }

        let mut manifest_copied = false;

        for instruction in &self.instructions {
            match instruction {
                Instruction::Expose(0) => {
                    return Err(PackagingError::InvalidPort {
                        stage: self.name.clone(),
                    });
                }
                Instruction::Cmd(argv) => validate_argv(&self.name, argv)?,
                Instruction::Copy {
                    from: Some(from), ..
                } if !earlier.contains(&from.as_str()) => {
                    return Err(PackagingError::UnknownStage {
                        stage: self.name.clone(),
                        from: from.clone(),
                    });
                }
                i if i.copies_manifest() => manifest_copied = true,
                i if i.copies_source() && !manifest_copied => {
                    return Err(PackagingError::LayerOrder {
                        stage: self.name.clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn validate_final(&self) -> Result<(), PackagingError> {
        for keyword in ["CMD", "ENV", "EXPOSE"] {
            match self.count(keyword) {
                0 => return Err(PackagingError::missing(&self.name, keyword)),
                1 => {}
                _ => return Err(PackagingError::duplicate(&self.name, keyword)),
            }
        }

        if self.count("WORKDIR") == 0 {
            return Err(PackagingError::missing(&self.name, "WORKDIR"));
        }

        Ok(())
    }
}

/// Inputs to the default service image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingConfig {
    pub binary: String,
    pub builder_image: BaseImage,
    pub runtime_image: BaseImage,
    pub build_dir: String,
    pub workdir: String,
    pub port: u16,
    pub workers: usize,
    /// Set in the runtime image so every log event is flushed immediately
    pub unbuffered_env: String,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            binary: env!("CARGO_PKG_NAME").to_string(),
            builder_image: BaseImage::new("rust", "1.85-slim-bookworm"),
            runtime_image: BaseImage::new("debian", "12.11-slim"),
            build_dir: "/build".to_string(),
            workdir: "/app".to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            unbuffered_env: "APP__LOGGING__UNBUFFERED".to_string(),
        }
    }
}

impl PackagingConfig {
    pub fn launch_command(&self) -> LaunchCommand {
        LaunchCommand::new(&self.binary, self.port, self.workers)
    }
}

/// A multi-stage image description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub stages: Vec<Stage>,
}

impl ImageSpec {
    /// Builder stage: toolchain, dependencies from the manifest, source, release build.
    /// Runtime stage: shared libraries, binary, config, launch.
    pub fn for_service(config: &PackagingConfig) -> Self {
        let binary_path = format!("{}/target/release/{}", config.build_dir, config.binary);

        let builder = Stage::new("builder", config.builder_image.clone())
            .with(Instruction::run([
                "apt-get update",
                "apt-get install -y --no-install-recommends pkg-config libssl-dev",
                "rm -rf /var/lib/apt/lists/*",
            ]))
            .with(Instruction::Workdir(config.build_dir.clone()))
            .with(Instruction::copy([MANIFEST, LOCKFILE], "./"))
            .with(Instruction::run([
                "mkdir -p src",
                "echo 'fn main() {}' > src/main.rs",
                "touch src/lib.rs",
                RELEASE_BUILD,
                "rm -rf src",
            ]))
            .with(Instruction::copy(["."], "."))
            .with(Instruction::run([
                "touch src/main.rs src/lib.rs",
                RELEASE_BUILD,
            ]));

        let runtime = Stage::new("runtime", config.runtime_image.clone())
            .with(Instruction::run([
                "apt-get update",
                "apt-get install -y --no-install-recommends ca-certificates libssl3",
                "rm -rf /var/lib/apt/lists/*",
            ]))
            .with(Instruction::Workdir(config.workdir.clone()))
            .with(Instruction::copy_from(
                "builder",
                binary_path,
                format!("/usr/local/bin/{}", config.binary),
            ))
            .with(Instruction::copy_from(
                "builder",
                format!("{}/config", config.build_dir),
                "./config",
            ))
            .with(Instruction::Env {
                key: config.unbuffered_env.clone(),
                value: "true".to_string(),
            })
            .with(Instruction::Expose(config.port))
            .with(Instruction::Cmd(config.launch_command().argv()));

        Self {
            stages: vec![builder, runtime],
        }
    }

    pub fn validate(&self) -> Result<(), PackagingError> {
        let last = self.stages.last().ok_or(PackagingError::NoStages)?;

        let mut earlier: Vec<&str> = Vec::new();
        for stage in &self.stages {
            stage.validate(&earlier)?;
            earlier.push(&stage.name);
        }

        last.validate_final()
    }

    /// Validate, then emit Dockerfile text
    pub fn render(&self) -> Result<String, PackagingError> {
        self.validate()?;

        let stages: Vec<String> = self
            .stages
            .iter()
            .map(|stage| {
                let mut lines = vec![format!("FROM {} AS {}", stage.base, stage.name)];
                lines.extend(stage.instructions.iter().map(Instruction::render));
                lines.join("\n")
            })
            .collect();

        Ok(format!("{}\n\n{}\n", HEADER, stages.join("\n\n")))
    }
}
