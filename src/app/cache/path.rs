//! Cache filename codec and directory layout
//!
//! Filenames encode the full shape of a request plus the server-side
//! modification date of its period, so a file named for a request is
//! exactly the response to that request as of that date. Layout:
//! `{data_dir}/t-{table_id}/{filename}`.

use std::path::{Path, PathBuf};

use crate::app::models::{Precision, TableRequest};
use crate::constants::{files, sidra};

/// Path generation utility for cache files
pub struct PathGenerator;

impl PathGenerator {
    /// Build the deterministic filename for `request` as of `modification`
    ///
    /// ```text
    /// t-{table}_p-{periods}_f-{format}[_d-{precision}]_n{level}-{ids|all}..._v-{vars}_c{id}-{cats}...@{modification}.json
    /// ```
    ///
    /// Segment order is part of the cache contract: changing it invalidates
    /// every cached file.
    pub fn encode_filename(request: &TableRequest, modification: &str) -> String {
        let mut name = format!(
            "t-{}_p-{}_f-{}",
            request.table_id,
            request.periods.join(","),
            request.format.code()
        );

        if request.precision != Precision::default() {
            name.push_str(&format!("_d-{}", request.precision.code()));
        }

        for (level, ids) in &request.territories {
            let codes = if ids.is_empty() {
                sidra::ALL.to_string()
            } else {
                ids.join(",")
            };
            name.push_str(&format!("_n{}-{}", level, codes));
        }

        if !request.variables.is_empty() {
            name.push_str(&format!("_v-{}", request.variables.join(",")));
        }

        for (classification, categories) in &request.classifications {
            name.push_str(&format!("_c{}-{}", classification, categories.join(",")));
        }

        name.push('@');
        name.push_str(modification);
        name.push('.');
        name.push_str(files::RESPONSE_EXTENSION);
        name
    }

    /// Directory holding every cached file of a table
    pub fn table_dir(data_dir: &Path, table_id: &str) -> PathBuf {
        data_dir.join(format!("t-{}", table_id))
    }

    /// Full cache path for `request` as of `modification`
    pub fn file_path(data_dir: &Path, request: &TableRequest, modification: &str) -> PathBuf {
        Self::table_dir(data_dir, &request.table_id)
            .join(Self::encode_filename(request, modification))
    }

    /// Temporary sibling used while a response is being written
    pub fn temp_path(final_path: &Path) -> PathBuf {
        let mut name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(files::TEMP_FILE_SUFFIX);
        final_path.with_file_name(name)
    }

    /// Whether a path is an in-flight temporary file
    pub fn is_temp_path(path: &Path) -> bool {
        path.to_string_lossy().ends_with(files::TEMP_FILE_SUFFIX)
    }
}
