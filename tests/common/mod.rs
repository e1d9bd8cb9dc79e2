#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const REFERENCE_SPEC: &str =
    "\"column name\",width,datatype\nname,10,TEXT\nvalid,1,BOOLEAN\ncount,3,INTEGER\n";

pub const REFERENCE_DATA: &str = "Foonyor   1  1\nBarzane   0-12\nQuuxitude 1103\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Writes the three-column reference specification and data file.
    pub fn reference_files(&self) -> (PathBuf, PathBuf) {
        let spec = self.write("testformat1.csv", REFERENCE_SPEC);
        let data = self.write("testformat1_2024-01-01.txt", REFERENCE_DATA);
        (spec, data)
    }
}
