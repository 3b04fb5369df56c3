use clap::Parser;

/// A tag-based virtual filesystem: directories are tags, and a path is a
/// query over the files carrying every tag named in it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Mount point
    #[arg(short, long)]
    pub mount_path: String,

    /// Data store root (contains `store/` and `.tagfs`)
    #[arg(short, long)]
    pub source_path: String,

    /// Comma-separated filesystem options passed through to the mount layer
    #[arg(short = 'o', long, value_delimiter = ',')]
    pub options: Vec<String>,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress FUSE-level error spam below debug verbosity
    #[arg(short = 's', long = "quiet-errors")]
    pub quiet_errors: bool,

    /// Allow unlink inside a tag-directory to remove just that tag, rather
    /// than requiring root-shape deletes for a full remove
    #[arg(short = 'a', long = "anywhere-delete")]
    pub anywhere_delete: bool,

    /// Cap on the number of hidden file entries shown at mount root; -1 = unlimited
    #[arg(short = 'l', long = "hidden-limit", allow_hyphen_values = true, default_value_t = -1)]
    pub hidden_limit: i64,

    /// Don't pass AllowRoot to the mount layer
    #[arg(short = 'r', long)]
    pub disallow_root: bool,
}
