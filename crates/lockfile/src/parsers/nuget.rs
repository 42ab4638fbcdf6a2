//! packages.lock.json 파서 (NuGet)
//!
//! 타깃 프레임워크별 의존성 맵에서 `resolved` 버전을 읽습니다.
//! `type`이 `Project`인 항목은 동일 솔루션 내 프로젝트 참조이므로 제외합니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// packages.lock.json 추출기
pub struct NuGetLockExtractor;

#[derive(Deserialize)]
struct NuGetLockFile {
    #[serde(default)]
    dependencies: BTreeMap<String, BTreeMap<String, NuGetDependency>>,
}

#[derive(Deserialize)]
struct NuGetDependency {
    #[serde(default, rename = "type")]
    dependency_type: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
}

impl Extractor for NuGetLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "packages.lock.json")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: NuGetLockFile =
            serde_json::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "packages.lock.json".to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::new();

        for framework_deps in lockfile.dependencies.values() {
            for (name, dependency) in framework_deps {
                if dependency.dependency_type.as_deref() == Some("Project") {
                    continue;
                }

                let Some(version) = dependency.resolved.clone() else {
                    continue;
                };

                packages.push(PackageDetails::new(name.clone(), version, Ecosystem::NuGet));
            }
        }

        Ok(packages)
    }
}
