//! Gemfile.lock 파서
//!
//! 들여쓰기 기반 텍스트 형식입니다. `GEM` / `GIT` / `PATH` 섹션의
//! `specs:` 아래 4칸 들여쓰기 항목이 패키지이며, 6칸 들여쓰기는
//! 해당 spec의 하위 의존성이므로 건너뜁니다. `GIT` 섹션의 `revision`은
//! 섹션 내 패키지의 커밋이 됩니다.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// Gemfile.lock 추출기
pub struct GemfileLockExtractor;

fn spec_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {4}([^\s]+) \(([^)]+)\)$").expect("static regex"))
}

impl Extractor for GemfileLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "Gemfile.lock")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let mut packages = Vec::new();

        // 섹션 헤더는 들여쓰기 없는 대문자 라인 (GEM, GIT, PATH, ...)
        let mut in_spec_section = false;
        let mut current_revision = String::new();

        for (idx, line) in f.content().lines().enumerate() {
            if !line.starts_with(' ') {
                in_spec_section = matches!(line.trim_end(), "GEM" | "GIT" | "PATH" | "PLUGIN SOURCE");
                current_revision.clear();
                continue;
            }

            if !in_spec_section {
                continue;
            }

            if let Some(revision) = line.trim().strip_prefix("revision: ") {
                current_revision = revision.trim().to_owned();
                continue;
            }

            if let Some(captures) = spec_line_re().captures(line) {
                let pkg = PackageDetails::new(&captures[1], &captures[2], Ecosystem::RubyGems)
                    .with_commit(current_revision.clone());

                packages.push(PackageDetails {
                    line_span: Some(LineSpan::single(idx + 1)),
                    ..pkg
                });
            }
        }

        Ok(packages)
    }
}
