use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fuser::MountOption;
use log::{error, LevelFilter};
use pretty_env_logger::env_logger::Builder;

use cli::Args;
use fs::{FsConfig, TagFs};

mod blob;
mod cli;
mod error;
mod fs;
mod ino;
mod lister;
mod model;
mod mutate;
mod path;
mod resolver;
mod store;

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logger(args.verbose, args.quiet_errors);

    let config = FsConfig {
        flat_delete: args.anywhere_delete,
        hidden_limit: args.hidden_limit,
    };

    let tagfs = match TagFs::new(PathBuf::from(&args.source_path), config) {
        Ok(fs) => fs,
        Err(e) => {
            error!("couldn't set up data store at {}: {e}", args.source_path);
            return ExitCode::FAILURE;
        }
    };

    let mut options = vec![MountOption::FSName("tagfs".to_string())];
    if !args.disallow_root {
        options.push(MountOption::AllowRoot);
    }
    options.extend(args.options.iter().filter_map(|o| parse_mount_option(o)));

    match fuser::mount2(tagfs, args.mount_path, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("mount failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Maps a handful of common `-o` option names onto `fuser::MountOption`;
/// anything unrecognized is dropped rather than rejected, since the mount
/// layer itself is the authority on what it accepts.
fn parse_mount_option(raw: &str) -> Option<MountOption> {
    match raw {
        "ro" => Some(MountOption::RO),
        "rw" => Some(MountOption::RW),
        "exec" => Some(MountOption::Exec),
        "noexec" => Some(MountOption::NoExec),
        "suid" => Some(MountOption::Suid),
        "nosuid" => Some(MountOption::NoSuid),
        "dev" => Some(MountOption::Dev),
        "nodev" => Some(MountOption::NoDev),
        "atime" => Some(MountOption::Atime),
        "noatime" => Some(MountOption::NoAtime),
        "auto_unmount" => Some(MountOption::AutoUnmount),
        other if other.starts_with("fsname=") => {
            Some(MountOption::FSName(other["fsname=".len()..].to_string()))
        }
        _ => None,
    }
}

fn setup_logger(verbose: u8, quiet_errors: bool) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    if quiet_errors && verbose < 2 {
        builder.filter_module("fuser", LevelFilter::Off);
    }
    builder.format_timestamp_secs();
    builder.init();
}
