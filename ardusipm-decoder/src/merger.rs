//! Directory merging
//!
//! Loads every frame file of a directory that passes the name filters and
//! concatenates their rows into one [`CorpusTable`], summing the per-file
//! acquisition times.

use crate::config::MergeConfig;
use crate::decoder::Decoder;
use crate::types::{AcquisitionTable, CorpusTable, DecoderError, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Files of a directory chosen for merging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    /// Matching files, sorted by name
    pub files: Vec<PathBuf>,
    /// Data files rejected by the name filters
    pub skipped: usize,
}

/// List the frame files of a directory that pass the merge filters
pub fn select_files(directory: &Path, extension: &str, config: &MergeConfig) -> Result<FileSelection> {
    if directory.as_os_str().is_empty() {
        return Err(DecoderError::InvalidInput("empty directory path".to_string()));
    }
    if !directory.is_dir() {
        return Err(DecoderError::DirectoryMissing(directory.to_path_buf()));
    }

    let suffix = format!(".{}", extension);
    let mut names = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(&suffix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let mut selection = FileSelection::default();
    for name in names {
        if config.should_process_file(&name) {
            selection.files.push(directory.join(name));
        } else {
            log::info!("Skipping {} (filtered)", name);
            selection.skipped += 1;
        }
    }

    if selection.files.is_empty() {
        return Err(DecoderError::NoFilesMatched {
            directory: directory.to_path_buf(),
            include: config.include.clone(),
            exclude: config.exclude.clone(),
        });
    }
    Ok(selection)
}

/// Merge every matching frame file of a directory into one table
///
/// Files are merged in file-name order, also when parsed in parallel. A file
/// that cannot be read is logged and listed in
/// [`CorpusTable::failed_files`]; the merge goes on with the others.
pub fn merge_directory(decoder: &Decoder, directory: &Path, config: &MergeConfig) -> Result<CorpusTable> {
    let selection = select_files(directory, &decoder.config().extension, config)?;
    log::info!("Merging {} files from {:?}", selection.files.len(), directory);

    let parse = |path: &PathBuf| -> (PathBuf, Result<AcquisitionTable>) {
        (path.clone(), decoder.parse_file(path, config.mode))
    };
    let results: Vec<_> = if config.parallel {
        selection.files.par_iter().map(parse).collect()
    } else {
        selection.files.iter().map(parse).collect()
    };

    let mut corpus = CorpusTable {
        skipped_files: selection.skipped,
        ..CorpusTable::default()
    };
    for (path, result) in results {
        match result {
            Ok(table) => corpus.append(table),
            Err(e) => {
                log::error!("Failed to load {:?}: {}", path, e);
                corpus.failed_files.push(path);
            }
        }
    }

    log::info!(
        "{} files loaded for {:.3} seconds of acquiring time",
        corpus.files_merged(),
        corpus.total_seconds()
    );
    if corpus.duration_errors > 0 {
        log::warn!("{} files with unavailable acquisition time", corpus.duration_errors);
    }

    Ok(corpus)
}
