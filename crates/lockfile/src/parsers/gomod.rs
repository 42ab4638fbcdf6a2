//! go.mod 파서
//!
//! `require` 지시문(단일/블록)에서 모듈과 버전을 수집한 뒤
//! `replace` 지시문을 적용합니다. 로컬 경로로의 replace는 버전이 없으므로
//! 결과에서 제외됩니다.

use std::collections::BTreeMap;
use std::path::Path;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// go.mod 추출기
pub struct GoModExtractor;

#[derive(Debug)]
struct Replacement {
    /// 왼쪽 버전 (None이면 모든 버전에 적용)
    old_version: Option<String>,
    new_name: String,
    /// 로컬 경로 replace면 None
    new_version: Option<String>,
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
    .trim()
}

fn trim_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// `old [version] => new [version]` 형식의 replace 본문을 해석합니다.
fn parse_replace(body: &str) -> Option<(String, Replacement)> {
    let (lhs, rhs) = body.split_once("=>")?;

    let lhs_parts: Vec<&str> = lhs.split_whitespace().collect();
    let rhs_parts: Vec<&str> = rhs.split_whitespace().collect();

    let (old_name, old_version) = match lhs_parts.as_slice() {
        [name] => ((*name).to_owned(), None),
        [name, version] => ((*name).to_owned(), Some(trim_v(version).to_owned())),
        _ => return None,
    };

    let (new_name, new_version) = match rhs_parts.as_slice() {
        // 버전 없는 오른쪽은 로컬 디렉토리 replace
        [path] => ((*path).to_owned(), None),
        [name, version] => ((*name).to_owned(), Some(trim_v(version).to_owned())),
        _ => return None,
    };

    Some((old_name, Replacement { old_version, new_name, new_version }))
}

impl Extractor for GoModExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "go.mod")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        // name -> (version, line)
        let mut requires: BTreeMap<String, (String, usize)> = BTreeMap::new();
        let mut replaces: Vec<(String, Replacement)> = Vec::new();

        let mut in_require = false;
        let mut in_replace = false;

        for (idx, raw) in f.content().lines().enumerate() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }

            if in_require || in_replace {
                if line == ")" {
                    in_require = false;
                    in_replace = false;
                    continue;
                }

                if in_require {
                    if let Some((name, version)) = line.split_once(char::is_whitespace) {
                        requires
                            .insert(name.to_owned(), (trim_v(version.trim()).to_owned(), idx + 1));
                    }
                } else if let Some(entry) = parse_replace(line) {
                    replaces.push(entry);
                }
                continue;
            }

            if line == "require (" {
                in_require = true;
            } else if line == "replace (" {
                in_replace = true;
            } else if let Some(body) = line.strip_prefix("require ") {
                if let Some((name, version)) = body.trim().split_once(char::is_whitespace) {
                    requires.insert(name.to_owned(), (trim_v(version.trim()).to_owned(), idx + 1));
                }
            } else if let Some(body) = line.strip_prefix("replace ") {
                if let Some(entry) = parse_replace(body.trim()) {
                    replaces.push(entry);
                }
            }
        }

        let mut packages = Vec::with_capacity(requires.len());

        'next: for (name, (version, line)) in requires {
            for (old_name, replacement) in &replaces {
                let version_matches =
                    replacement.old_version.as_deref().map_or(true, |old| old == version);

                if *old_name == name && version_matches {
                    // 로컬 경로 replace는 버전이 없어 식별 불가
                    if let Some(new_version) = &replacement.new_version {
                        packages.push(PackageDetails {
                            line_span: Some(LineSpan::single(line)),
                            ..PackageDetails::new(
                                replacement.new_name.clone(),
                                new_version.clone(),
                                Ecosystem::Go,
                            )
                        });
                    }
                    continue 'next;
                }
            }

            packages.push(PackageDetails {
                line_span: Some(LineSpan::single(line)),
                ..PackageDetails::new(name, version, Ecosystem::Go)
            });
        }

        Ok(packages)
    }
}
