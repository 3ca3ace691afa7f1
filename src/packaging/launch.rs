use std::net::{Ipv4Addr, SocketAddr};

use super::error::PackagingError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 1;

/// The exec-form command the container starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub binary: String,
    pub bind: SocketAddr,
    pub workers: usize,
}

impl LaunchCommand {
    /// Serve on all interfaces
    pub fn new(binary: impl Into<String>, port: u16, workers: usize) -> Self {
        Self {
            binary: binary.into(),
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            workers,
        }
    }

    pub fn argv(&self) -> Vec<String> {
        vec![
            self.binary.clone(),
            "serve".to_string(),
            "--bind".to_string(),
            self.bind.to_string(),
            "--workers".to_string(),
            self.workers.to_string(),
        ]
    }
}

/// Check a CMD argv: a program, and when present a bind port other than 0
/// and at least one worker
pub(super) fn validate_argv(stage: &str, argv: &[String]) -> Result<(), PackagingError> {
    let empty = || PackagingError::EmptyCommand {
        stage: stage.to_string(),
    };

    let program = argv.first().ok_or_else(empty)?;
    if program.trim().is_empty() {
        return Err(empty());
    }

    if let Some(bind) = flag_value(argv, "--bind") {
        let port = bind.parse::<SocketAddr>().map(|addr| addr.port()).unwrap_or(0);
        if port == 0 {
            return Err(PackagingError::InvalidPort {
                stage: stage.to_string(),
            });
        }
    }

    if let Some(workers) = flag_value(argv, "--workers") {
        if !workers.parse::<usize>().is_ok_and(|n| n > 0) {
            return Err(PackagingError::InvalidWorkers);
        }
    }

    Ok(())
}

fn flag_value<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| argv.get(idx + 1))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_argv() {
        let command = LaunchCommand::new("hospital-bulk-import", DEFAULT_PORT, DEFAULT_WORKERS);

        assert_eq!(
            command.argv(),
            vec![
                "hospital-bulk-import",
                "serve",
                "--bind",
                "0.0.0.0:8080",
                "--workers",
                "1"
            ]
        );
        assert!(validate_argv("runtime", &command.argv()).is_ok());
    }

    #[test]
    fn test_validate_argv_rejects_bad_values() {
        let no_port = LaunchCommand::new("app", 0, 1).argv();
        assert!(matches!(
            validate_argv("runtime", &no_port),
            Err(PackagingError::InvalidPort { .. })
        ));

        let no_workers = LaunchCommand::new("app", 8080, 0).argv();
        assert_eq!(
            validate_argv("runtime", &no_workers),
            Err(PackagingError::InvalidWorkers)
        );

        let no_binary = LaunchCommand::new(" ", 8080, 1).argv();
        assert!(matches!(
            validate_argv("runtime", &no_binary),
            Err(PackagingError::EmptyCommand { .. })
        ));

        assert!(matches!(
            validate_argv("runtime", &[]),
            Err(PackagingError::EmptyCommand { .. })
        ));
    }

    #[test]
    fn test_validate_argv_ignores_absent_flags() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "true".to_string()];
        assert!(validate_argv("runtime", &argv).is_ok());

        let bad_workers = vec!["app".to_string(), "--workers".to_string(), "many".to_string()];
        assert_eq!(
            validate_argv("runtime", &bad_workers),
            Err(PackagingError::InvalidWorkers)
        );
    }
}
