//! yarn.lock 파서
//!
//! classic(v1)과 berry(v2+) 텍스트 형식을 모두 다룹니다. 들여쓰기 없는
//! 헤더 라인에서 패키지 이름을, 블록 내부의 `version` 라인에서 버전을
//! 읽습니다. git 의존성은 `resolved`/`resolution` URL fragment의 커밋을
//! 사용합니다.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, extract_commit_hash};

/// yarn.lock 추출기
pub struct YarnLockExtractor;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s+version:?\s+"?([^"\s]+)"?"#).expect("static regex"))
}

fn resolved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s+(?:resolved|resolution):?\s+"?([^"\s]+)"?"#).expect("static regex")
    })
}

/// 헤더 라인에서 패키지 이름을 추출합니다.
///
/// `"name@^1.0.0", "name@^1.1.0":` 처럼 여러 descriptor가 올 수 있으므로
/// 첫 항목만 사용하고, scoped 패키지(`@scope/name`)를 위해 마지막 `@`
/// 앞부분을 이름으로 취합니다.
fn parse_header_name(header: &str) -> Option<String> {
    let first = header.trim_end_matches(':').split(',').next()?.trim();
    let first = first.trim_matches('"');

    if first.is_empty() || first == "__metadata" {
        return None;
    }

    let at = first.rfind('@')?;
    if at == 0 {
        // "@scope/name" 단독은 버전 구분자가 없는 비정상 descriptor
        return None;
    }

    Some(first[..at].to_owned())
}

impl Extractor for YarnLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "yarn.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let mut packages = Vec::new();

        let mut current_name: Option<(String, usize)> = None;
        let mut current_version = String::new();
        let mut current_commit = String::new();

        let flush = |name: Option<(String, usize)>, version: &str, commit: &str,
                         packages: &mut Vec<PackageDetails>| {
            if let Some((name, line)) = name {
                if !version.is_empty() {
                    packages.push(PackageDetails {
                        line_span: Some(LineSpan::single(line)),
                        ..PackageDetails::new(name, version, Ecosystem::Npm)
                            .with_commit(commit.to_owned())
                    });
                }
            }
        };

        for (idx, line) in f.content().lines().enumerate() {
            if line.trim_start().starts_with('#') || line.trim().is_empty() {
                continue;
            }

            // 들여쓰기 없는 라인은 새 블록의 헤더
            if !line.starts_with(' ') && !line.starts_with('\t') {
                flush(current_name.take(), &current_version, &current_commit, &mut packages);
                current_version.clear();
                current_commit.clear();

                current_name = parse_header_name(line).map(|name| (name, idx + 1));
                continue;
            }

            if let Some(captures) = version_re().captures(line) {
                current_version = captures[1].to_owned();
                continue;
            }

            if let Some(captures) = resolved_re().captures(line) {
                if let Some(commit) = extract_commit_hash(&captures[1]) {
                    current_commit = commit;
                }
            }
        }

        flush(current_name.take(), &current_version, &current_commit, &mut packages);

        Ok(packages)
    }
}
