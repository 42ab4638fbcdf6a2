//! mix.lock 파서
//!
//! Elixir 용어 그대로 직렬화된 파일을 정규식으로 읽습니다.
//! `{:hex, ...}` 항목은 이름/버전을, `{:git, url, sha, ...}` 항목은
//! 커밋 해시를 제공합니다.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// mix.lock 추출기
pub struct MixLockExtractor;

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*"([^"]+)":\s*\{:hex,\s*:[A-Za-z0-9_]+,\s*"([^"]+)""#)
            .expect("static regex")
    })
}

fn git_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*"([^"]+)":\s*\{:git,\s*"[^"]+",\s*"([0-9a-fA-F]+)""#)
            .expect("static regex")
    })
}

impl Extractor for MixLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "mix.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let mut packages = Vec::new();

        for (idx, line) in f.content().lines().enumerate() {
            if let Some(captures) = hex_re().captures(line) {
                packages.push(PackageDetails {
                    line_span: Some(LineSpan::single(idx + 1)),
                    ..PackageDetails::new(&captures[1], &captures[2], Ecosystem::Hex)
                });
                continue;
            }

            if let Some(captures) = git_re().captures(line) {
                packages.push(PackageDetails {
                    line_span: Some(LineSpan::single(idx + 1)),
                    ..PackageDetails::new(&captures[1], "", Ecosystem::Hex)
                        .with_commit(&captures[2])
                });
            }
        }

        Ok(packages)
    }
}
