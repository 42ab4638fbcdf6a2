//! pubspec.lock 파서
//!
//! `description` 필드는 다형적입니다: `{name, url, path, resolved-ref}`
//! 매핑이거나 경로 문자열 하나입니다. 매핑 해석을 먼저 시도하고 실패하면
//! 스칼라로 받아들입니다. git 소스의 `resolved-ref`가 커밋이 됩니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// pubspec.lock 추출기
pub struct PubspecLockExtractor;

#[derive(Deserialize)]
struct PubspecLockFile {
    #[serde(default)]
    packages: BTreeMap<String, PubspecLockPackage>,
}

#[derive(Deserialize)]
struct PubspecLockPackage {
    #[serde(default)]
    description: Option<PubspecDescription>,
    #[serde(default)]
    version: String,
}

/// 다형적 description: 매핑을 먼저 시도하고 스칼라로 폴백
#[derive(Deserialize)]
#[serde(untagged)]
enum PubspecDescription {
    Map {
        #[serde(default, rename = "resolved-ref")]
        resolved_ref: Option<String>,
    },
    Path(String),
}

impl PubspecDescription {
    fn resolved_ref(&self) -> Option<&str> {
        match self {
            Self::Map { resolved_ref, .. } => resolved_ref.as_deref(),
            Self::Path(_) => None,
        }
    }
}

impl Extractor for PubspecLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "pubspec.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        if f.content().trim().is_empty() {
            return Ok(Vec::new());
        }

        let lockfile: PubspecLockFile =
            serde_yaml::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "pubspec.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let packages = lockfile
            .packages
            .into_iter()
            .map(|(name, pkg)| {
                let commit = pkg
                    .description
                    .as_ref()
                    .and_then(PubspecDescription::resolved_ref)
                    .unwrap_or_default()
                    .to_owned();

                PackageDetails::new(name, pkg.version, Ecosystem::Pub).with_commit(commit)
            })
            .collect();

        Ok(packages)
    }
}
