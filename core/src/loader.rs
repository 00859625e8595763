use crate::config::VectorizerConfig;
use crate::error::CorpusLoadError;
use crate::index::CorpusIndex;
use crate::recipe::RawRecipe;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read raw recipes from a `.csv`, `.json` or `.jsonl` file, or from every
/// such file under a directory (visited in path order).
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecipe>, CorpusLoadError> {
    let input_path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && corpus_extension(p).is_some() {
                files.push(p.to_path_buf());
            }
        }
    } else {
        files.push(input_path.to_path_buf());
    }

    let mut recipes = Vec::new();
    for file in files {
        let before = recipes.len();
        match corpus_extension(&file) {
            Some("csv") => recipes.extend(load_csv(open(&file)?, &file)?),
            Some("jsonl") => recipes.extend(load_jsonl(open(&file)?, &file)?),
            Some("json") => recipes.extend(load_json(open(&file)?, &file)?),
            _ => return Err(CorpusLoadError::UnsupportedFormat(file)),
        }
        tracing::debug!(file = %file.display(), records = recipes.len() - before, "read corpus file");
    }
    tracing::info!(path = %input_path.display(), records = recipes.len(), "loaded recipe records");
    Ok(recipes)
}

/// Load `path` and index it in one go; the startup path of every binary.
pub fn build_index<P: AsRef<Path>>(path: P, config: &VectorizerConfig) -> Result<CorpusIndex, CorpusLoadError> {
    CorpusIndex::build(load_path(path)?, config)
}

fn corpus_extension(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("csv") => Some("csv"),
        Some("json") => Some("json"),
        Some("jsonl") => Some("jsonl"),
        _ => None,
    }
}

fn open(path: &Path) -> Result<File, CorpusLoadError> {
    File::open(path).map_err(|source| CorpusLoadError::Io { path: path.to_path_buf(), source })
}

/// Recipe table with a header row (`recipe_name,ingredients,directions,rating,img_src,...`).
pub fn load_csv<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawRecipe>, CorpusLoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(|source| CorpusLoadError::Csv { path: origin.to_path_buf(), source }))
        .collect()
}

/// One JSON object per line; blank lines are skipped.
pub fn load_jsonl<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawRecipe>, CorpusLoadError> {
    let mut recipes = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|source| CorpusLoadError::Io { path: origin.to_path_buf(), source })?;
        if line.trim().is_empty() { continue; }
        let recipe: RawRecipe = serde_json::from_str(&line)
            .map_err(|source| CorpusLoadError::Json { path: origin.to_path_buf(), source })?;
        recipes.push(recipe);
    }
    Ok(recipes)
}

/// Either an array of recipe objects or a single object.
pub fn load_json<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawRecipe>, CorpusLoadError> {
    let json_err = |source: serde_json::Error| CorpusLoadError::Json { path: origin.to_path_buf(), source };
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(reader)).map_err(json_err)?;
    match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(json_err))
            .collect(),
        other => Ok(vec![serde_json::from_value(other).map_err(json_err)?]),
    }
}
