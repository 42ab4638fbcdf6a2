//! composer.lock 파서
//!
//! `packages` / `packages-dev` 두 배열을 읽습니다. dev 배열의 패키지에는
//! `"dev"` 그룹을 부여하고, source reference가 있으면 커밋으로 기록합니다.

use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// composer.lock 추출기
pub struct ComposerLockExtractor;

#[derive(Deserialize)]
struct ComposerLock {
    #[serde(default)]
    packages: Vec<ComposerPackage>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<ComposerPackage>,
}

#[derive(Deserialize)]
struct ComposerPackage {
    name: String,
    version: String,
    #[serde(default)]
    source: Option<ComposerSource>,
}

#[derive(Deserialize)]
struct ComposerSource {
    #[serde(default)]
    reference: String,
}

fn to_details(pkg: ComposerPackage, dep_groups: Vec<String>) -> PackageDetails {
    let commit = pkg.source.map(|s| s.reference).unwrap_or_default();

    PackageDetails::new(pkg.name, pkg.version, Ecosystem::Packagist)
        .with_commit(commit)
        .with_dep_groups(dep_groups)
}

impl Extractor for ComposerLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "composer.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: ComposerLock =
            serde_json::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "composer.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::with_capacity(lockfile.packages.len() + lockfile.packages_dev.len());

        for pkg in lockfile.packages {
            packages.push(to_details(pkg, Vec::new()));
        }
        for pkg in lockfile.packages_dev {
            packages.push(to_details(pkg, vec!["dev".to_owned()]));
        }

        Ok(packages)
    }
}
