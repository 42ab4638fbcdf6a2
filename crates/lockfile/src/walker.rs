//! 소스 열거 -- 디렉토리 순회 및 lockfile / git 저장소 탐색
//!
//! 디렉토리를 결정적(경로 정렬) 순서로 순회하며, basename이 등록된
//! 추출기와 일치하는 일반 파일을 찾습니다. 비재귀 모드는 디렉토리의
//! 직계 자식만 봅니다. git 모드는 `.git`을 가진 디렉토리의 HEAD 커밋을
//! 일반 파일 읽기로 해석합니다 (libgit2 불필요).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::extract::find_extractor;

/// 디렉토리에서 추출 가능한 lockfile을 찾습니다.
///
/// 경로가 일반 파일이면 그 파일 하나를 반환합니다 (basename 무관).
/// 반환 순서는 경로 정렬 순서로 결정적입니다.
pub fn find_lockfiles(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    if dir.is_file() {
        return vec![dir.to_path_buf()];
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry, skipping");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if find_extractor(entry.path(), "").is_some() {
            found.push(entry.path().to_path_buf());
        }
    }

    found
}

/// 디렉토리에서 git 저장소(`.git`을 가진 디렉토리)를 찾습니다.
pub fn find_git_repos(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry, skipping");
                continue;
            }
        };

        if entry.file_type().is_dir() && entry.path().join(".git").is_dir() {
            found.push(entry.path().to_path_buf());
        }
    }

    found
}

/// git 저장소의 HEAD 커밋 해시를 읽습니다.
///
/// `.git/HEAD`가 심볼릭 ref면 해당 ref 파일을 따라가고,
/// 없으면 `packed-refs`에서 찾습니다. detached HEAD는 해시를 그대로 씁니다.
pub fn read_head_commit(repo: &Path) -> Option<String> {
    let git_dir = repo.join(".git");
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    let Some(ref_name) = head.strip_prefix("ref: ") else {
        // detached HEAD
        return is_hex_hash(head).then(|| head.to_owned());
    };

    if let Ok(commit) = std::fs::read_to_string(git_dir.join(ref_name)) {
        let commit = commit.trim();
        return is_hex_hash(commit).then(|| commit.to_owned());
    }

    // loose ref가 없으면 packed-refs에서 탐색
    let packed = std::fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    for line in packed.lines() {
        if let Some((hash, name)) = line.split_once(' ') {
            if name.trim() == ref_name && is_hex_hash(hash) {
                return Some(hash.to_owned());
            }
        }
    }

    None
}

fn is_hex_hash(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}
