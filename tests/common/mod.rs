use notemind::backend::{HttpBackend, KnowledgeBackend, UploadFile};
use notemind::config::{ApiConfig, UploadConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// HTTP backend pointed at `base_url` with a small chunk size so even tiny
/// files produce several progress ticks
#[allow(dead_code)]
pub fn backend_for(base_url: &str) -> Arc<dyn KnowledgeBackend> {
    let api = ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    };
    let upload = UploadConfig {
        chunk_size_bytes: 4,
        ..Default::default()
    };
    Arc::new(HttpBackend::new(&api, &upload).expect("failed to build backend"))
}

/// Write one file per `(name, contents)` pair into a fresh temp dir
#[allow(dead_code)]
pub fn temp_upload_files(files: &[(&str, &str)]) -> (TempDir, Vec<UploadFile>) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let uploads = files
        .iter()
        .map(|(name, contents)| {
            let path = temp_dir.path().join(name);
            fs::write(&path, contents).expect("failed to write upload file");
            UploadFile::new(path)
        })
        .collect();
    (temp_dir, uploads)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
