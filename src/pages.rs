use askama::Template;

use crate::storage::FileSummary;
use crate::upload::FIELD_NAME;

/// One list entry, preformatted for display.
pub struct FileRow {
    id: String,
    name: String,
    uploaded: String,
    size: String,
}

impl From<&FileSummary> for FileRow {
    fn from(file: &FileSummary) -> Self {
        Self {
            id: file.id.to_string(),
            name: file.original_name.clone(),
            uploaded: file.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            size: human_size(file.size),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    field_name: &'static str,
    files: Vec<FileRow>,
}

impl IndexTemplate {
    pub fn new(files: &[FileSummary]) -> Self {
        Self {
            field_name: FIELD_NAME,
            files: files.iter().map(FileRow::from).collect(),
        }
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}
