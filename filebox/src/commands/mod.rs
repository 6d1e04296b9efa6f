use std::path::Path;

use crate::{
    AppContext,
    cli::{FolderArgs, ImportArgs, ItemArgs, ListArgs, MkdirArgs, MoveArgs, RemoveArgs, RenameArgs},
};
use anyhow::{Context, Result};
use filebox_core::file_type::{FileKind, format_size, mime_from_extension};
use filebox_core::storage::{Entry, ImportSource};
use tracing::info;

// --- Handler Functions ---

pub async fn handle_init(cx: &AppContext) -> Result<()> {
    cx.store.initialize().await?;
    println!("Initialized store at {}", cx.store.config().files_dir.display());
    Ok(())
}

pub async fn handle_ls(args: ListArgs, cx: &AppContext) -> Result<()> {
    let tree = cx.store.load().await?;
    if !tree.contains(&args.folder) {
        anyhow::bail!("Folder not found: {}", args.folder);
    }

    let entries = tree.contents(&args.folder, args.sort);
    if entries.is_empty() {
        println!("(empty)");
    }
    for entry in entries {
        println!("{}", listing_line(entry));
    }
    Ok(())
}

pub async fn handle_mkdir(args: MkdirArgs, cx: &AppContext) -> Result<()> {
    let folder = cx
        .store
        .create_folder(&args.name, &args.parent, args.color.as_deref())
        .await
        .with_context(|| format!("Could not create folder '{}'", args.name))?;
    println!("{}", folder.id());
    Ok(())
}

pub async fn handle_import(args: ImportArgs, cx: &AppContext) -> Result<()> {
    let sources: Vec<ImportSource> = args
        .paths
        .iter()
        .map(|path| {
            let mime = match &args.mime {
                Some(mime) => mime.clone(),
                None => guess_mime(path),
            };
            ImportSource::from_path(path, mime)
        })
        .collect();

    let report = cx
        .store
        .import_files(&sources, &args.parent, |done, total| {
            info!("Importing ({}/{})", done + 1, total);
        })
        .await?;

    for entry in &report.imported {
        println!("  Imported: {} ({})", entry.name(), entry.id());
    }
    for (name, e) in &report.failed {
        println!("  Failed: {}: {}", name, e);
    }
    if !report.failed.is_empty() {
        anyhow::bail!("{} of {} files could not be imported", report.failed.len(), sources.len());
    }
    Ok(())
}

pub async fn handle_rename(args: RenameArgs, cx: &AppContext) -> Result<()> {
    cx.store
        .rename_item(&args.id, &args.name)
        .await
        .with_context(|| format!("Could not rename {}", args.id))?;
    Ok(())
}

pub async fn handle_mv(args: MoveArgs, cx: &AppContext) -> Result<()> {
    cx.store
        .move_item(&args.id, &args.new_parent)
        .await
        .with_context(|| format!("Could not move {} to {}", args.id, args.new_parent))?;
    Ok(())
}

/// Deletes every id, then refreshes the sizes of the folders they were in.
pub async fn handle_rm(args: RemoveArgs, cx: &AppContext) -> Result<()> {
    let deleted = cx.store.delete_items(&args.ids).await?;
    println!("Deleted {} of {} items", deleted, args.ids.len());
    if deleted < args.ids.len() {
        anyhow::bail!("{} of {} items could not be deleted", args.ids.len() - deleted, args.ids.len());
    }
    Ok(())
}

pub async fn handle_du(args: FolderArgs, cx: &AppContext) -> Result<()> {
    let total = cx.store.update_folder_size(&args.folder).await?;
    println!("{}", format_size(total));
    Ok(())
}

pub async fn handle_path(args: FolderArgs, cx: &AppContext) -> Result<()> {
    let tree = cx.store.load().await?;
    let path = tree.path_to(&args.folder)?;
    if path.is_empty() {
        anyhow::bail!("Folder not found: {}", args.folder);
    }
    println!("{}", breadcrumb(&path));
    Ok(())
}

pub async fn handle_info(args: ItemArgs, cx: &AppContext) -> Result<()> {
    let tree = cx.store.load().await?;
    let Some(entry) = tree.get(&args.id) else {
        anyhow::bail!("Item not found: {}", args.id);
    };

    println!("  Name: {}", entry.name());
    println!("  ID: {}", entry.id());
    if entry.is_folder() {
        println!("  Type: Folder ({} items)", tree.child_ids(&args.id).map_or(0, <[_]>::len));
    } else {
        println!("  Type: {} ({})", FileKind::from_mime(entry.kind()), entry.kind());
    }
    println!("  Size: {}", format_size(entry.size()));
    println!("  Added: {}", entry.created_at());
    println!("  Location: {}", breadcrumb(&tree.path_to(&args.id)?));
    println!("  Stored at: {}", entry.locator().display());
    if let Some(color) = entry.color() {
        println!("  Color: {}", color);
    }
    Ok(())
}

// --- Formatting ---

fn guess_mime(path: &Path) -> String {
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    mime_from_extension(ext).to_string()
}

fn listing_line(entry: &Entry) -> String {
    let kind = if entry.is_folder() {
        "Folder".to_string()
    } else {
        FileKind::from_mime(entry.kind()).display_name()
    };
    format!("{:<32} {:<14} {:>10}  {}", entry.name(), kind, format_size(entry.size()), entry.id())
}

fn breadcrumb(path: &[&Entry]) -> String {
    path.iter().map(|entry| entry.name()).collect::<Vec<_>>().join(" / ")
}
