//! Version Comparison - 점(.) 구분 버전 비교
//!
//! 각 세그먼트를 정수로 해석하고 짧은 쪽을 0으로 채워 비교합니다.
//! 원격 카탈로그의 버전 문자열은 신뢰할 수 없으므로 파싱 실패 시
//! 에러 대신 원본 문자열의 사전식 비교로 대체합니다.

use std::cmp::Ordering;

/// 버전 비교 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    /// 첫 번째 버전이 더 새로움
    Newer,
    /// 같거나 더 오래됨 (동일 버전은 업데이트 대상이 아님)
    SameOrOlder,
}

/// `a`가 `b`보다 새로운 버전인지 비교
pub fn compare(a: &str, b: &str) -> VersionOrdering {
    let ordering = match (parse_segments(a), parse_segments(b)) {
        (Some(left), Some(right)) => compare_segments(&left, &right),
        _ => a.cmp(b),
    };

    if ordering == Ordering::Greater {
        VersionOrdering::Newer
    } else {
        VersionOrdering::SameOrOlder
    }
}

/// `a`가 `b`보다 새로운지 여부
pub fn is_newer(a: &str, b: &str) -> bool {
    compare(a, b) == VersionOrdering::Newer
}

fn parse_segments(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|segment| segment.trim().parse::<u64>().ok())
        .collect()
}

fn compare_segments(left: &[u64], right: &[u64]) -> Ordering {
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
