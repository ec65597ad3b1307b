use anyhow::{anyhow, Result};
use clap::Parser;
use log::{error, info};

use pack_binary::build::{build_all, BuildOptions};
use pack_binary::cli::{Args, Cmd};
use pack_binary::config::Manifest;
use pack_binary::generate::{self, Destination};
use pack_binary::wheel::verify_wheel;

fn main() {
    let args = Args::parse();

    // Initialize logger with custom format
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(args)) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main(args: Args) -> Result<()> {
    match args.sub {
        Cmd::Build {
            pyproject,
            out_dir,
            platform,
            jobs,
            dry_run,
        } => {
            let manifest = Manifest::load(&pyproject)?;
            info!(
                "packing {} {} ({} targets)",
                manifest.project.name,
                manifest.project.version,
                manifest.targets.len()
            );
            let options = BuildOptions {
                out_dir,
                platforms: platform,
                jobs,
                dry_run,
            };
            let built = build_all(manifest, &options).await?.into_result()?;
            info!("built {} wheel(s)", built.len());
            Ok(())
        }
        Cmd::GenerateConfig {
            tag,
            repo,
            pyproject,
            write_pyproject,
            output,
        } => {
            let destination = match (write_pyproject, output) {
                (true, _) => Destination::Pyproject,
                (false, Some(path)) => Destination::File(path),
                (false, None) => Destination::Stdout,
            };
            generate::generate(&pyproject, &repo, &tag, &destination).await
        }
        Cmd::Verify { wheels } => {
            let mut failed = 0usize;
            for path in &wheels {
                match verify_wheel(path) {
                    Ok(verified) => info!(
                        "{}: ok ({} files, tag {})",
                        path.display(),
                        verified.files,
                        verified.tag.as_deref().unwrap_or("unknown")
                    ),
                    Err(e) => {
                        error!("{}: {}", path.display(), e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(anyhow!("{} of {} wheel(s) failed verification", failed, wheels.len()));
            }
            Ok(())
        }
    }
}
