//! CLI module for the hospital bulk import service
//!
//! Subcommands:
//! - `serve`: the HTTP server the container launches
//! - `dockerfile`: render the container build pipeline
//! - `dockerignore`: render the build-context exclusion list

pub mod package;
pub mod serve;

use clap::{Parser, Subcommand};

/// Hospital Bulk Import - CSV batch import into the Hospital Directory
#[derive(Parser)]
#[command(name = "hospital-bulk-import")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(serve::ServeArgs),

    /// Render the Dockerfile
    Dockerfile(package::RenderArgs),

    /// Render the .dockerignore file
    Dockerignore(package::RenderArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::packaging::PackagingConfig;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_container_command_is_accepted() {
        let argv = PackagingConfig::default().launch_command().argv();
        let cli = Cli::try_parse_from(argv).unwrap();

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
                assert_eq!(args.workers, Some(1));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_render_output_flag() {
        let cli =
            Cli::try_parse_from(["hospital-bulk-import", "dockerfile", "--output", "out/Dockerfile"])
                .unwrap();

        match cli.command {
            Command::Dockerfile(args) => {
                assert_eq!(args.output.unwrap().to_str(), Some("out/Dockerfile"));
            }
            _ => panic!("expected dockerfile"),
        }
    }

    #[test]
    fn test_serve_rejects_bad_bind() {
        assert!(
            Cli::try_parse_from(["hospital-bulk-import", "serve", "--bind", "nowhere"]).is_err()
        );
    }
}
