use clap::Parser;
use hospital_bulk_import::cli::{self, Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => cli::serve::run(args),
        Command::Dockerfile(args) => cli::package::dockerfile(args),
        Command::Dockerignore(args) => cli::package::dockerignore(args),
    }
}
