use std::fs;
use std::path::Path;

use crate::error::DataSourceResult;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// Lists the files of a directory with their sizes, sorted by name.
pub fn list_files(path: &Path) -> DataSourceResult<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::list_files;

    #[test]
    fn test_list_files_sorted_with_sizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "xy").unwrap();
        fs::write(dir.path().join("a.csv"), "x").unwrap();
        let entries = list_files(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.csv");
        assert_eq!(entries[0].size, 1);
        assert_eq!(entries[1].name, "b.csv");
    }
}
