//! Cargo.lock 파서
//!
//! `[[package]]` 배열에서 이름과 버전을 추출합니다. git 소스로 고정된
//! 패키지는 source URL fragment에서 커밋 해시를 가져옵니다.

use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, extract_commit_hash};

/// Cargo.lock 추출기
pub struct CargoLockExtractor;

#[derive(Deserialize)]
struct CargoLockFile {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    #[serde(default)]
    source: Option<String>,
}

impl Extractor for CargoLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "Cargo.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: CargoLockFile =
            toml::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "Cargo.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let packages = lockfile
            .package
            .into_iter()
            .map(|pkg| {
                let commit = pkg
                    .source
                    .as_deref()
                    .filter(|s| s.starts_with("git+"))
                    .and_then(extract_commit_hash)
                    .unwrap_or_default();

                PackageDetails::new(pkg.name, pkg.version, Ecosystem::CratesIo)
                    .with_commit(commit)
            })
            .collect();

        Ok(packages)
    }
}
