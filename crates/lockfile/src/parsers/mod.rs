//! 생태계별 lockfile 파서
//!
//! 각 파서는 바이트 스트림에서 패키지 목록으로 가는 순수 함수이며,
//! [`Extractor`](crate::extract::Extractor) trait을 구현합니다.
//!
//! # 공통 규칙
//!
//! - 이름을 결정할 수 없는 패키지는 결과에서 제외합니다 (`<unknown>` 금지).
//! - Python 계열은 PEP-0503 이름 정규화를 적용합니다.
//! - VCS 의존성은 resolution 메타데이터에서 커밋 해시를 채웁니다.
//! - dev/optional 주석은 `dep_groups`로 매핑합니다 (최소 `"dev"`).
//! - 라인 정보를 싸게 얻을 수 있는 파서만 `line_span`을 채웁니다.

pub mod cargo;
pub mod composer;
pub mod conan;
pub mod gemfile;
pub mod gomod;
pub mod gradle;
pub mod maven;
pub mod mix;
pub mod npm;
pub mod nuget;
pub mod pipenv;
pub mod pnpm;
pub mod poetry;
pub mod pubspec;
pub mod requirements;
pub mod yarn;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// 경로의 basename이 기대한 파일명과 일치하는지 확인합니다.
pub(crate) fn base_name_is(path: &Path, expected: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|name| name == expected)
}

/// PEP-0503 기준으로 Python 패키지 이름을 정규화합니다.
///
/// `[-_.]+`를 `-`로 접고 소문자화한 뒤, extras 구문(`pkg[extra]`)을 제거합니다.
/// 데이터베이스와 lockfile 양쪽의 비정규 표기를 모두 흡수하기 위해
/// 추출 시점에 정규화합니다.
pub(crate) fn normalize_python_name(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[-_.]+").expect("static regex"));

    let name = re.replace_all(name, "-").to_lowercase();
    name.split('[').next().unwrap_or_default().to_owned()
}

/// 문자열에서 40자리(최소 7자리) 16진수 커밋 해시를 추출합니다.
///
/// `codeload.github.com/.../tar.gz/<sha>` 형태의 tarball URL과
/// URL fragment(`...#<sha>`)의 두 가지 표기를 지원합니다.
pub(crate) fn extract_commit_hash(value: &str) -> Option<String> {
    static CODELOAD: OnceLock<Regex> = OnceLock::new();
    static FRAGMENT: OnceLock<Regex> = OnceLock::new();

    let codeload = CODELOAD.get_or_init(|| {
        Regex::new(r"https://codeload\.github\.com(?:/[\w.-]+){2}/tar\.gz/(\w+)$")
            .expect("static regex")
    });
    if let Some(captures) = codeload.captures(value) {
        return Some(captures[1].to_owned());
    }

    let fragment = FRAGMENT
        .get_or_init(|| Regex::new(r"#(?:commit=)?([0-9a-fA-F]{7,40})$").expect("static regex"));
    fragment.captures(value).map(|c| c[1].to_owned())
}
