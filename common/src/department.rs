//! 부서 → 부문 라벨 판정 모듈
//!
//! 부서-부문 매핑 테이블(선택적으로 부서명 표준화 테이블)을 정규화해 두 개의 조회 구조를 만든다.
//! - `basic`: 정규화 부서명 → 부문 (Unit 없이 호출될 때 사용)
//! - `enhanced`: `"{부서}|{Unit}"` 또는 `"{부서}|"` → 부문 및 원본 이름
//!
//! 판정 순서는 고정이며 처음 일치한 규칙이 이긴다.
//! 호출마다 호출자가 넘긴 [`LabelingStats`] 카운터가 정확히 하나 증가한다.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 부문을 찾지 못했을 때의 라벨
pub const UNCLASSIFIED: &str = "미분류";

lazy_static! {
    static ref SEPARATOR_RE: Regex = Regex::new(r"[ㆍ·•\-_\s]+").unwrap();
}

/// 부서/Unit 이름 정규화: 소문자화, 구분자와 공백을 한 칸으로 축약
pub fn normalize_name(raw: &str) -> String {
    SEPARATOR_RE
        .replace_all(&raw.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// 어떤 판정 규칙이 적용되었는지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    DeptUnitMatch,
    DeptOnlyMatch,
    DeptNotFound,
    UnitMismatch,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::DeptUnitMatch => "dept_unit_match",
            MatchType::DeptOnlyMatch => "dept_only_match",
            MatchType::DeptNotFound => "dept_not_found",
            MatchType::UnitMismatch => "unit_mismatch",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 판정 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub division: String,
    pub match_type: MatchType,
}

impl Resolution {
    fn unclassified(match_type: MatchType) -> Self {
        Self {
            division: UNCLASSIFIED.to_string(),
            match_type,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.division != UNCLASSIFIED
    }
}

/// 판정 통계 (한 번의 판정 패스 동안 호출자가 소유)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelingStats {
    pub dept_unit_match: usize,
    pub dept_only_match: usize,
    pub dept_not_found: usize,
    pub unit_mismatch: usize,
}

impl LabelingStats {
    pub fn record(&mut self, match_type: MatchType) {
        match match_type {
            MatchType::DeptUnitMatch => self.dept_unit_match += 1,
            MatchType::DeptOnlyMatch => self.dept_only_match += 1,
            MatchType::DeptNotFound => self.dept_not_found += 1,
            MatchType::UnitMismatch => self.unit_mismatch += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.dept_unit_match + self.dept_only_match + self.dept_not_found + self.unit_mismatch
    }

    /// (라벨, 건수) 목록. 리포트 시트 출력용
    pub fn entries(&self) -> [(MatchType, usize); 4] {
        [
            (MatchType::DeptUnitMatch, self.dept_unit_match),
            (MatchType::DeptOnlyMatch, self.dept_only_match),
            (MatchType::DeptNotFound, self.dept_not_found),
            (MatchType::UnitMismatch, self.unit_mismatch),
        ]
    }
}

/// 매핑 테이블의 한 행
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRow {
    pub department: String,
    pub division: String,
    #[serde(default)]
    pub unit: Option<String>,
}

/// enhanced 맵 항목 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    DeptUnit,
    DeptOnly,
}

#[derive(Debug, Clone)]
pub struct EnhancedEntry {
    pub division: String,
    pub original_department: String,
    pub original_unit: Option<String>,
    pub kind: EntryKind,
}

/// 부서명 표준화 테이블 (변경전 부서명 → 표준 부서명)
#[derive(Debug, Clone, Default)]
pub struct StandardizationTable {
    map: HashMap<String, String>,
}

impl StandardizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, raw: impl Into<String>, canonical: impl Into<String>) {
        self.map.insert(raw.into(), canonical.into());
    }

    /// 원본 문자열 그대로 조회. 없는 키는 입력을 그대로 돌려준다
    pub fn apply<'a>(&'a self, raw: &'a str) -> &'a str {
        self.map.get(raw).map(|s| s.as_str()).unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StandardizationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

/// 판정 옵션
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Unit이 주어졌지만 enhanced 맵에 없을 때 basic 맵으로 재시도할지.
    /// 기본값 false: Unit을 넣으면 부서 단독 일치가 unit_mismatch로 떨어질 수 있다 (업무 확인 전까지 유지)
    #[serde(default)]
    pub unit_fallback_to_department: bool,
}

/// 부서 디렉터리 (매핑 + 표준화)
#[derive(Debug, Clone, Default)]
pub struct DepartmentDirectory {
    basic: HashMap<String, String>,
    enhanced: HashMap<String, EnhancedEntry>,
    /// enhanced 맵에 항목이 하나라도 있는 정규화 부서명
    known_in_enhanced: HashSet<String>,
    standard: StandardizationTable,
    options: ResolverOptions,
}

impl DepartmentDirectory {
    /// 매핑 행으로부터 구축. 같은 키는 뒤의 행이 이긴다
    pub fn from_rows(rows: &[DepartmentRow]) -> Self {
        let mut directory = Self::default();

        for row in rows {
            let dept = normalize_name(&row.department);
            let division = row.division.trim();
            if dept.is_empty() || division.is_empty() {
                continue;
            }

            directory.basic.insert(dept.clone(), division.to_string());

            let unit = row
                .unit
                .as_deref()
                .map(normalize_name)
                .filter(|u| !u.is_empty());

            let (key, kind) = match &unit {
                Some(u) => (format!("{}|{}", dept, u), EntryKind::DeptUnit),
                None => (format!("{}|", dept), EntryKind::DeptOnly),
            };

            directory.enhanced.insert(
                key,
                EnhancedEntry {
                    division: division.to_string(),
                    original_department: row.department.clone(),
                    original_unit: row.unit.clone(),
                    kind,
                },
            );
            directory.known_in_enhanced.insert(dept);
        }

        directory
    }

    pub fn with_standardization(mut self, standard: StandardizationTable) -> Self {
        self.standard = standard;
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn standardization(&self) -> &StandardizationTable {
        &self.standard
    }

    pub fn basic_len(&self) -> usize {
        self.basic.len()
    }

    pub fn enhanced_len(&self) -> usize {
        self.enhanced.len()
    }

    pub fn enhanced_entry(&self, department: &str, unit: Option<&str>) -> Option<&EnhancedEntry> {
        let key = format!(
            "{}|{}",
            normalize_name(department),
            unit.map(normalize_name).unwrap_or_default()
        );
        self.enhanced.get(&key)
    }

    /// 부서/Unit을 부문으로 판정하고 통계를 누적한다
    pub fn resolve(
        &self,
        raw_department: Option<&str>,
        raw_unit: Option<&str>,
        stats: &mut LabelingStats,
    ) -> Resolution {
        let resolution = self.lookup(raw_department, raw_unit);
        stats.record(resolution.match_type);
        resolution
    }

    /// 통계 없이 판정만 수행
    pub fn lookup(&self, raw_department: Option<&str>, raw_unit: Option<&str>) -> Resolution {
        let raw_department = match raw_department.map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => return Resolution::unclassified(MatchType::DeptNotFound),
        };

        let dept = normalize_name(self.standard.apply(raw_department));
        if dept.is_empty() {
            return Resolution::unclassified(MatchType::DeptNotFound);
        }

        let unit = raw_unit.map(normalize_name).filter(|u| !u.is_empty());

        match unit {
            Some(unit) => {
                if let Some(entry) = self.enhanced.get(&format!("{}|{}", dept, unit)) {
                    return Resolution {
                        division: entry.division.clone(),
                        match_type: MatchType::DeptUnitMatch,
                    };
                }

                if self.options.unit_fallback_to_department {
                    if let Some(division) = self.basic.get(&dept) {
                        return Resolution {
                            division: division.clone(),
                            match_type: MatchType::DeptOnlyMatch,
                        };
                    }
                }

                if self.known_in_enhanced.contains(&dept) || self.basic.contains_key(&dept) {
                    Resolution::unclassified(MatchType::UnitMismatch)
                } else {
                    Resolution::unclassified(MatchType::DeptNotFound)
                }
            }
            None => match self.basic.get(&dept) {
                Some(division) => Resolution {
                    division: division.clone(),
                    match_type: MatchType::DeptOnlyMatch,
                },
                None => Resolution::unclassified(MatchType::DeptNotFound),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dept: &str, division: &str, unit: Option<&str>) -> DepartmentRow {
        DepartmentRow {
            department: dept.to_string(),
            division: division.to_string(),
            unit: unit.map(str::to_string),
        }
    }

    fn sample_directory() -> DepartmentDirectory {
        DepartmentDirectory::from_rows(&[
            row("간호부", "간호부문", Some("외래간호팀")),
            row("간호부", "간호부문", Some("병동간호팀")),
            row("진료지원팀", "진료지원부문", None),
            row("원무팀", "행정부문", None),
        ])
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  진료ㆍ지원__팀 "), "진료 지원 팀");
        assert_eq!(normalize_name("IT-Support•Team"), "it support team");
        assert_eq!(normalize_name("원무팀"), "원무팀");
    }

    #[test]
    fn test_dept_unit_match() {
        let dir = sample_directory();
        let mut stats = LabelingStats::default();
        let r = dir.resolve(Some("간호부"), Some("외래간호팀"), &mut stats);
        assert_eq!(r.division, "간호부문");
        assert_eq!(r.match_type, MatchType::DeptUnitMatch);
        assert_eq!(stats.dept_unit_match, 1);
    }

    #[test]
    fn test_dept_only_match() {
        let dir = sample_directory();
        let mut stats = LabelingStats::default();
        let r = dir.resolve(Some("원무팀"), None, &mut stats);
        assert_eq!(r.division, "행정부문");
        assert_eq!(r.match_type, MatchType::DeptOnlyMatch);

        let r = dir.resolve(Some("원무팀"), Some("   "), &mut stats);
        assert_eq!(r.match_type, MatchType::DeptOnlyMatch);
        assert_eq!(stats.dept_only_match, 2);
    }

    #[test]
    fn test_unit_mismatch() {
        let dir = sample_directory();
        let mut stats = LabelingStats::default();
        let r = dir.resolve(Some("간호부"), Some("수술실"), &mut stats);
        assert_eq!(r.division, UNCLASSIFIED);
        assert_eq!(r.match_type, MatchType::UnitMismatch);
        assert_eq!(stats.unit_mismatch, 1);
    }

    #[test]
    fn test_unit_supplied_downgrades_department_only_match() {
        let dir = sample_directory();
        let r = dir.lookup(Some("원무팀"), Some("수납파트"));
        assert_eq!(r.division, UNCLASSIFIED);
        assert_eq!(r.match_type, MatchType::UnitMismatch);
    }

    #[test]
    fn test_unit_fallback_option() {
        let dir = sample_directory().with_options(ResolverOptions {
            unit_fallback_to_department: true,
        });
        let r = dir.lookup(Some("원무팀"), Some("수납파트"));
        assert_eq!(r.division, "행정부문");
        assert_eq!(r.match_type, MatchType::DeptOnlyMatch);
    }

    #[test]
    fn test_unknown_department_regardless_of_unit() {
        let dir = sample_directory();
        for unit in [None, Some(""), Some("외래간호팀"), Some("없는유닛")] {
            let r = dir.lookup(Some("존재하지않는부서"), unit);
            assert_eq!(r.division, UNCLASSIFIED);
            assert_eq!(r.match_type, MatchType::DeptNotFound);
        }
    }

    #[test]
    fn test_empty_department() {
        let dir = sample_directory();
        let mut stats = LabelingStats::default();
        assert_eq!(dir.resolve(None, Some("외래간호팀"), &mut stats).match_type, MatchType::DeptNotFound);
        assert_eq!(dir.resolve(Some("  "), None, &mut stats).match_type, MatchType::DeptNotFound);
        assert_eq!(stats.dept_not_found, 2);
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn test_standardization_applied_before_normalization() {
        let standard: StandardizationTable = [("원무과", "원무팀")].into_iter().collect();
        let dir = sample_directory().with_standardization(standard);
        let r = dir.lookup(Some("원무과"), None);
        assert_eq!(r.division, "행정부문");
    }

    #[test]
    fn test_normalized_lookup_ignores_separators() {
        let dir = sample_directory();
        let r = dir.lookup(Some("진료-지원_팀"), None);
        assert_eq!(r.division, "진료지원부문");
    }

    #[test]
    fn test_idempotent() {
        let dir = sample_directory();
        let basic_before = dir.basic_len();
        let enhanced_before = dir.enhanced_len();
        let first = dir.lookup(Some("간호부"), Some("병동간호팀"));
        let second = dir.lookup(Some("간호부"), Some("병동간호팀"));
        assert_eq!(first, second);
        assert_eq!(dir.basic_len(), basic_before);
        assert_eq!(dir.enhanced_len(), enhanced_before);
    }

    #[test]
    fn test_separate_scopes() {
        let dir = sample_directory();
        let mut evaluator = LabelingStats::default();
        let mut evaluated = LabelingStats::default();
        dir.resolve(Some("원무팀"), None, &mut evaluator);
        dir.resolve(Some("없는부서"), None, &mut evaluated);
        assert_eq!(evaluator.dept_only_match, 1);
        assert_eq!(evaluator.dept_not_found, 0);
        assert_eq!(evaluated.dept_not_found, 1);
    }

    #[test]
    fn test_enhanced_entry_keeps_original_names() {
        let dir = sample_directory();
        let entry = dir.enhanced_entry("간호부", Some("외래간호팀")).unwrap();
        assert_eq!(entry.original_department, "간호부");
        assert_eq!(entry.kind, EntryKind::DeptUnit);
        let entry = dir.enhanced_entry("원무팀", None).unwrap();
        assert_eq!(entry.kind, EntryKind::DeptOnly);
    }
}
