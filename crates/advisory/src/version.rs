//! 생태계별 버전 비교
//!
//! SemVer로 파싱되면 `semver` 크레이트로 비교하고, 아니면 숫자/문자
//! 세그먼트 단위의 보수적 비교로 폴백합니다. PyPI는 epoch(`N!`)과
//! local version(`+...`)을 구분하는 자체 규칙을 적용합니다.

use std::cmp::Ordering;

use vigil_core::types::Ecosystem;

/// 느슨한 SemVer 파싱: 앞의 `v`를 제거하고 부족한 자리는 `.0`으로 채웁니다.
fn parse_semver_lenient(version: &str) -> Option<semver::Version> {
    let version = version.strip_prefix('v').unwrap_or(version);

    if let Ok(parsed) = semver::Version::parse(version) {
        return Some(parsed);
    }

    // "1.2" / "1" 같은 축약 표기를 보정
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let dots = version[..core_end].matches('.').count();
    if dots < 2 {
        let mut padded = version[..core_end].to_owned();
        for _ in dots..2 {
            padded.push_str(".0");
        }
        padded.push_str(&version[core_end..]);
        return semver::Version::parse(&padded).ok();
    }

    None
}

/// 숫자 run과 문자 run을 교대로 비교하는 폴백 비교.
fn compare_segments(a: &str, b: &str) -> Ordering {
    let tokenize = |s: &str| -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut numeric = false;

        for c in s.chars() {
            if c == '.' || c == '-' || c == '_' || c == '+' {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                continue;
            }

            if !current.is_empty() && c.is_ascii_digit() != numeric {
                tokens.push(std::mem::take(&mut current));
            }
            numeric = c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(current);
        }
        tokens
    };

    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);

    for i in 0..a_tokens.len().max(b_tokens.len()) {
        let (x, y) = match (a_tokens.get(i), b_tokens.get(i)) {
            (Some(x), Some(y)) => (x, y),
            // 남은 토큰이 있는 쪽이 더 큼 ("1.0.1" > "1.0")
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => break,
        };

        let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(m), Ok(n)) => m.cmp(&n),
            // 숫자는 문자보다 큼 ("1.0.0" > "1.0.0.alpha"와 유사한 관례)
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => x.cmp(y),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// PyPI 버전에서 (epoch, 나머지)를 분리합니다.
fn split_pypi_epoch(version: &str) -> (u64, &str) {
    match version.split_once('!') {
        Some((epoch, rest)) => (epoch.parse().unwrap_or(0), rest),
        None => (0, version),
    }
}

/// 생태계의 버전 체계에 따라 두 버전을 비교합니다.
pub fn compare(compare_as: Ecosystem, a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    if compare_as == Ecosystem::PyPI {
        let (a_epoch, a_rest) = split_pypi_epoch(a);
        let (b_epoch, b_rest) = split_pypi_epoch(b);

        if a_epoch != b_epoch {
            return a_epoch.cmp(&b_epoch);
        }

        // local version(+...)은 순서에 영향 없음
        let a_public = a_rest.split('+').next().unwrap_or_default();
        let b_public = b_rest.split('+').next().unwrap_or_default();
        return compare_common(a_public, b_public);
    }

    compare_common(a, b)
}

fn compare_common(a: &str, b: &str) -> Ordering {
    match (parse_semver_lenient(a), parse_semver_lenient(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => compare_segments(a, b),
    }
}

/// 버전의 major 자리를 반환합니다.
pub fn major(version: &str) -> Option<u64> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let version = version.split_once('!').map_or(version, |(_, rest)| rest);

    let first: String = version.chars().take_while(char::is_ascii_digit).collect();
    first.parse().ok()
}

/// 두 버전 사이가 major 단위 변경인지 판정합니다.
pub fn is_major_bump(from: &str, to: &str) -> bool {
    match (major(from), major(to)) {
        (Some(a), Some(b)) => a != b,
        // major를 알 수 없으면 보수적으로 major 변경으로 간주
        _ => true,
    }
}
