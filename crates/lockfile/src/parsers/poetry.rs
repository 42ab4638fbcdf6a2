//! poetry.lock 파서
//!
//! `[[package]]` 배열에서 이름과 버전을 읽습니다. git 소스의
//! `resolved_reference`는 커밋이 되고, `category = "dev"`와
//! `optional = true`는 각각 dep_groups로 매핑됩니다.

use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, normalize_python_name};

/// poetry.lock 추출기
pub struct PoetryLockExtractor;

#[derive(Deserialize)]
struct PoetryLockFile {
    #[serde(default)]
    package: Vec<PoetryLockPackage>,
}

#[derive(Deserialize)]
struct PoetryLockPackage {
    name: String,
    version: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    source: Option<PoetryLockSource>,
}

#[derive(Deserialize)]
struct PoetryLockSource {
    #[serde(default)]
    resolved_reference: Option<String>,
}

impl Extractor for PoetryLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "poetry.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: PoetryLockFile =
            toml::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "poetry.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let packages = lockfile
            .package
            .into_iter()
            .map(|pkg| {
                let commit = pkg
                    .source
                    .and_then(|s| s.resolved_reference)
                    .unwrap_or_default();

                let mut dep_groups = Vec::new();
                if pkg.category.as_deref() == Some("dev") {
                    dep_groups.push("dev".to_owned());
                }
                if pkg.optional {
                    dep_groups.push("optional".to_owned());
                }

                PackageDetails::new(normalize_python_name(&pkg.name), pkg.version, Ecosystem::PyPI)
                    .with_commit(commit)
                    .with_dep_groups(dep_groups)
            })
            .collect();

        Ok(packages)
    }
}
