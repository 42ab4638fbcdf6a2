//! Pipfile.lock 파서
//!
//! `default` / `develop` 두 맵에서 `==`로 고정된 버전을 읽습니다.
//! develop 맵의 패키지에는 `"dev"` 그룹을 부여하고, 이름은 PEP-0503으로
//! 정규화합니다. VCS 항목은 `ref`를 커밋으로 사용합니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, normalize_python_name};

/// Pipfile.lock 추출기
pub struct PipenvLockExtractor;

#[derive(Deserialize)]
struct PipenvLockFile {
    #[serde(default)]
    default: BTreeMap<String, PipenvPackage>,
    #[serde(default)]
    develop: BTreeMap<String, PipenvPackage>,
}

#[derive(Deserialize)]
struct PipenvPackage {
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "ref")]
    git_ref: Option<String>,
}

fn collect(
    entries: &BTreeMap<String, PipenvPackage>,
    dep_groups: &[&str],
    out: &mut Vec<PackageDetails>,
) {
    for (name, entry) in entries {
        let version = entry
            .version
            .as_deref()
            .and_then(|v| v.strip_prefix("=="))
            .unwrap_or_default();
        let commit = entry.git_ref.clone().unwrap_or_default();

        out.push(
            PackageDetails::new(normalize_python_name(name), version, Ecosystem::PyPI)
                .with_commit(commit)
                .with_dep_groups(dep_groups.iter().map(|g| (*g).to_owned()).collect()),
        );
    }
}

impl Extractor for PipenvLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "Pipfile.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: PipenvLockFile =
            serde_json::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "Pipfile.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::new();
        collect(&lockfile.default, &[], &mut packages);
        collect(&lockfile.develop, &["dev"], &mut packages);

        Ok(packages)
    }
}
