use clap::{Args, Parser, Subcommand};
use filebox_core::storage::{SortOption, ROOT_ID};
use std::path::PathBuf;

/// Filebox: keep files in a virtual folder tree.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the structure document and stored files.
    #[arg(long, global = true, env = "FILEBOX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the storage directory and an empty tree.
    Init,
    /// List the contents of a folder.
    Ls(ListArgs),
    /// Create a folder.
    Mkdir(MkdirArgs),
    /// Copy files into the store.
    Import(ImportArgs),
    /// Rename a file or folder.
    Rename(RenameArgs),
    /// Move a file or folder into another folder.
    Mv(MoveArgs),
    /// Delete files or folders (folders with everything inside them).
    Rm(RemoveArgs),
    /// Recompute and print the size of a folder.
    Du(FolderArgs),
    /// Print the path from the root to a folder.
    Path(FolderArgs),
    /// Show details about a file or folder.
    Info(ItemArgs),
}

// --- Argument Structs for each Subcommand ---

#[derive(Args, Debug)]
pub struct ListArgs {
    /// ID of the folder to list.
    #[arg(default_value = ROOT_ID)]
    pub folder: String,

    /// Sort order (name_asc, name_desc, date_asc, date_desc, size_asc, size_desc, type_asc, type_desc).
    #[arg(long, short, default_value_t = SortOption::NameAsc)]
    pub sort: SortOption,
}

#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Name of the new folder.
    pub name: String,

    /// ID of the folder to create it in.
    #[arg(long, short, default_value = ROOT_ID)]
    pub parent: String,

    /// Display color tag (e.g. "#3498db").
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path(s) of the file(s) to import.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// ID of the folder to import into.
    #[arg(long, short, default_value = ROOT_ID)]
    pub parent: String,

    /// MIME type for all imported files. Guessed from each extension if omitted.
    #[arg(long)]
    pub mime: Option<String>,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// ID of the item to rename.
    pub id: String,
    /// New display name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// ID of the item to move.
    pub id: String,
    /// ID of the destination folder.
    pub new_parent: String,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// ID(s) of the item(s) to delete.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FolderArgs {
    /// ID of the folder.
    #[arg(default_value = ROOT_ID)]
    pub folder: String,
}

#[derive(Args, Debug)]
pub struct ItemArgs {
    /// ID of the file or folder.
    pub id: String,
}
