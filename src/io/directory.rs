//! Building directory loading
//!
//! Both resources are fetched once at startup, concurrently. A source is an
//! `http(s)://` URL, a `file://` URL, or a plain filesystem path.

use crate::domain::error::DirectoryError;
use crate::domain::types::Building;
use crate::infra::config::Config;
use crate::services::search::Directory;
use reqwest::Url;
use std::time::Duration;
use tracing::{error, info};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

async fn fetch_buildings(
    http: &reqwest::Client,
    source: &str,
) -> Result<Vec<Building>, DirectoryError> {
    let fail = |reason: String| DirectoryError { resource: source.to_string(), reason };

    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let response = http.get(source).send().await.map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status().as_u16())));
        }
        response.bytes().await.map_err(|e| fail(e.to_string()))?.to_vec()
    } else {
        let path = if source.starts_with("file://") {
            Url::parse(source)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| fail("invalid file URL".to_string()))?
        } else {
            source.into()
        };
        tokio::fs::read(&path).await.map_err(|e| fail(e.to_string()))?
    };

    serde_json::from_slice(&bytes).map_err(|e| fail(format!("invalid JSON: {e}")))
}

/// Load the quick navigation shortlist and the full building list
pub async fn load_directory(
    quick_navigation: &str,
    buildings: &str,
) -> Result<Directory, DirectoryError> {
    let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build().map_err(|e| {
        DirectoryError { resource: buildings.to_string(), reason: e.to_string() }
    })?;

    let (quick, all) = tokio::try_join!(
        fetch_buildings(&http, quick_navigation),
        fetch_buildings(&http, buildings)
    )
    .inspect_err(|e| error!(error = %e, "directory_fetch_failed"))?;

    info!(quick_navigation = %quick.len(), buildings = %all.len(), "directory_loaded");
    Ok(Directory::new(quick, all))
}

pub async fn load_directory_from_config(config: &Config) -> Result<Directory, DirectoryError> {
    load_directory(config.quick_navigation_source(), config.buildings_source()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BuildingId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_from_files() {
        let quick = json_file(r#"[{"id": 1, "name": "Main Hall", "latitude": 10.0, "longitude": 10.0}]"#);
        let all = json_file(
            r#"[
                {"id": 1, "name": "Main Hall", "latitude": 10.0, "longitude": 10.0, "code": "MH"},
                {"id": 2, "name": "Library", "latitude": 10.1, "longitude": 10.1}
            ]"#,
        );

        let directory = load_directory(
            quick.path().to_str().unwrap(),
            &format!("file://{}", all.path().display()),
        )
        .await
        .unwrap();

        assert_eq!(directory.quick_navigation().len(), 1);
        assert_eq!(directory.buildings().len(), 2);
        assert_eq!(directory.get(BuildingId(2)).unwrap().name, "Library");
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let quick = json_file("[]");
        let err = load_directory(quick.path().to_str().unwrap(), "/nonexistent/buildings.json")
            .await
            .unwrap_err();
        assert_eq!(err.resource, "/nonexistent/buildings.json");
    }

    #[tokio::test]
    async fn test_invalid_json_fails() {
        let quick = json_file("[]");
        let all = json_file(r#"{"not": "an array"}"#);
        let err =
            load_directory(quick.path().to_str().unwrap(), all.path().to_str().unwrap())
                .await
                .unwrap_err();
        assert!(err.reason.starts_with("invalid JSON"));
    }
}
