//! requirements.txt 파서
//!
//! 주석(`#`)을 제거하고, 플래그(`-X`)·URL·경로 항목은 무시합니다.
//! `-r <file>`은 파일 디렉토리 기준 상대 경로로 재귀 포함하며,
//! 포함 순환은 에러로 거부합니다. 연산자는 `==`, `>=`, `~=`, `!=`를
//! 인식하고, `!=`는 버전을 고정하지 않으므로 `0.0.0` 센티널을 씁니다.
//! 결과는 `name@version` 기준으로 중복 제거됩니다.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, normalize_python_name};

/// requirements.txt 추출기
pub struct RequirementsTxtExtractor;

fn remove_comments(line: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(^|\s+)#.*$").expect("static regex"));
    re.replace_all(line, "").trim().to_owned()
}

fn is_not_requirement_line(line: &str) -> bool {
    line.is_empty()
        // 플래그는 지원하지 않음
        || line.starts_with('-')
        // URL 항목
        || line.starts_with("https://")
        || line.starts_with("http://")
        // 상대/절대 경로 항목
        || line.starts_with('.')
        || line.starts_with('/')
}

fn parse_line(line: &str) -> (String, String) {
    let mut constraint = "";
    for candidate in ["==", ">=", "~=", "!="] {
        if line.contains(candidate) {
            constraint = candidate;
        }
    }

    let mut name = line;
    // "!="는 버전을 고정하지 않으므로 센티널 유지
    let mut version = "0.0.0".to_owned();

    if !constraint.is_empty() {
        let mut split = line.splitn(2, constraint);
        name = split.next().unwrap_or_default().trim();

        if constraint != "!=" {
            version = split.next().unwrap_or_default().trim().to_owned();
        }
    }

    (normalize_python_name(name.trim()), version)
}

fn parse_file(
    f: &DepFile,
    visited: &mut HashSet<PathBuf>,
    out: &mut BTreeMap<String, PackageDetails>,
) -> Result<(), ExtractError> {
    let canonical = f.path().canonicalize().unwrap_or_else(|_| f.path().to_path_buf());
    if !visited.insert(canonical) {
        return Err(ExtractError::IncludeCycle { path: f.path().display().to_string() });
    }

    let dir = f.path().parent().map(Path::to_path_buf).unwrap_or_default();

    for (idx, raw) in f.content().lines().enumerate() {
        let line = remove_comments(raw);

        if let Some(included) = line.strip_prefix("-r ") {
            let included_path = dir.join(included.trim());
            let included_file = DepFile::open(&included_path)?;
            parse_file(&included_file, visited, out)?;
            continue;
        }

        if is_not_requirement_line(&line) {
            continue;
        }

        let (name, version) = parse_line(&line);
        if name.is_empty() {
            continue;
        }

        let key = format!("{name}@{version}");
        out.insert(
            key,
            PackageDetails {
                line_span: Some(LineSpan::single(idx + 1)),
                ..PackageDetails::new(name, version, Ecosystem::PyPI)
            },
        );
    }

    Ok(())
}

impl Extractor for RequirementsTxtExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "requirements.txt")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let mut visited = HashSet::new();
        let mut out = BTreeMap::new();

        parse_file(f, &mut visited, &mut out)?;

        Ok(out.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUIREMENTS: &str = "# production dependencies
flask==2.2.3
requests[security]>=2.28.0  # with extras
Django~=4.1
uvloop!=0.15.0
--index-url https://pypi.org/simple
https://files.pythonhosted.org/packages/some/wheel.whl
./local/package
/abs/path/package
";

    #[test]
    fn can_extract_requirements_txt() {
        let extractor = RequirementsTxtExtractor;
        assert!(extractor.should_extract(Path::new("requirements.txt")));
        assert!(!extractor.should_extract(Path::new("requirements-dev.txt")));
    }

    #[test]
    fn extract_sample() {
        let f = DepFile::from_string("requirements.txt", SAMPLE_REQUIREMENTS);
        let packages = RequirementsTxtExtractor.extract(&f).unwrap();

        let rendered: Vec<String> =
            packages.iter().map(|p| format!("{}@{}", p.name, p.version)).collect();
        assert_eq!(
            rendered,
            vec!["django@4.1", "flask@2.2.3", "requests@2.28.0", "uvloop@0.0.0"]
        );
        assert_eq!(packages[0].ecosystem, Ecosystem::PyPI);
    }

    #[test]
    fn not_equal_constraint_uses_sentinel_version() {
        let f = DepFile::from_string("requirements.txt", "pkg!=1.0.0\n");
        let packages = RequirementsTxtExtractor.extract(&f).unwrap();
        assert_eq!(packages[0].version, "0.0.0");
    }

    #[test]
    fn flags_urls_and_paths_are_ignored() {
        let f = DepFile::from_string(
            "requirements.txt",
            "--no-binary :all:\nhttp://example.com/pkg.tar.gz\n./vendored\n/opt/pkg\n",
        );
        assert!(RequirementsTxtExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn duplicate_requirements_are_deduplicated() {
        let f = DepFile::from_string("requirements.txt", "flask==2.0.0\nFlask==2.0.0\n");
        let packages = RequirementsTxtExtractor.extract(&f).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "flask");
    }

    #[test]
    fn recursive_include_resolves_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.txt"), "common-lib==1.0.0\n").unwrap();
        let top = dir.path().join("requirements.txt");
        std::fs::write(&top, "-r ./base.txt\napp-lib==2.0.0\n").unwrap();

        let f = DepFile::open(&top).unwrap();
        let packages = RequirementsTxtExtractor.extract(&f).unwrap();

        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["app-lib", "common-lib"]);
    }

    #[test]
    fn include_cycle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("requirements.txt");
        let b = dir.path().join("other.txt");
        std::fs::write(&a, "-r ./other.txt\n").unwrap();
        std::fs::write(&b, "-r ./requirements.txt\n").unwrap();

        let f = DepFile::open(&a).unwrap();
        let err = RequirementsTxtExtractor.extract(&f).unwrap_err();
        assert!(matches!(err, ExtractError::IncludeCycle { .. }));
    }

    #[test]
    fn missing_include_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path().join("requirements.txt");
        std::fs::write(&top, "-r ./nope.txt\n").unwrap();

        let f = DepFile::open(&top).unwrap();
        let err = RequirementsTxtExtractor.extract(&f).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn extract_empty_file() {
        let f = DepFile::from_string("requirements.txt", "");
        assert!(RequirementsTxtExtractor.extract(&f).unwrap().is_empty());
    }
}
