//! conan.lock 파서
//!
//! v1(`graph_lock.nodes`)과 v2(`requires` 배열) 두 형식을 모두 지원합니다.
//! ref 표기 `name/version@user/channel#rrev`에서 이름과 버전을 추출합니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// conan.lock 추출기
pub struct ConanLockExtractor;

#[derive(Deserialize)]
struct ConanLock {
    #[serde(default)]
    graph_lock: Option<ConanGraphLock>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    build_requires: Vec<String>,
    #[serde(default)]
    python_requires: Vec<String>,
}

#[derive(Deserialize)]
struct ConanGraphLock {
    #[serde(default)]
    nodes: BTreeMap<String, ConanGraphNode>,
}

#[derive(Deserialize)]
struct ConanGraphNode {
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

/// `name/version@user/channel#rrev` ref에서 (name, version)을 추출합니다.
fn parse_conan_ref(reference: &str) -> Option<(String, String)> {
    let reference = reference.split('#').next().unwrap_or_default();
    let reference = reference.split('@').next().unwrap_or_default();

    let (name, version) = reference.split_once('/')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }

    Some((name.to_owned(), version.to_owned()))
}

impl Extractor for ConanLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "conan.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: ConanLock =
            serde_json::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "conan.lock".to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::new();

        if let Some(graph) = lockfile.graph_lock {
            for node in graph.nodes.values() {
                let Some(reference) = node.reference.as_deref() else {
                    continue;
                };
                if let Some((name, version)) = parse_conan_ref(reference) {
                    packages.push(PackageDetails::new(name, version, Ecosystem::ConanCenter));
                }
            }
        }

        for reference in lockfile
            .requires
            .iter()
            .chain(&lockfile.build_requires)
            .chain(&lockfile.python_requires)
        {
            if let Some((name, version)) = parse_conan_ref(reference) {
                packages.push(PackageDetails::new(name, version, Ecosystem::ConanCenter));
            }
        }

        Ok(packages)
    }
}
