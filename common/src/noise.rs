//! 주관식 응답 노이즈 필터
//!
//! "없음", "-", "123" 같은 무의미한 응답은 원격 호출 없이 빈 결과로 채운다.

use lazy_static::lazy_static;
use regex::Regex;

/// 이보다 짧은(문자 수 기준) 응답은 노이즈
const MIN_MEANINGFUL_CHARS: usize = 3;

lazy_static! {
    static ref NOISE_PATTERNS: Vec<Regex> = [
        // 부정/해당없음 표현
        r"^없[습다음어요니]*\.?$",
        r"^특별히\s*없[음다습니요]*\.?$",
        r"^해당\s*(사항\s*)?없[음다습니요]*\.?$",
        r"^무\s*$",
        r"(?i)^(none|n/?a|nil|null|nan)$",
        // 구분자만 반복
        r"^[-\s]*$",
        r"^[.\s]*$",
        r"^[/\s]*$",
        r"^[ㅡ\s]*$",
        // 숫자/영문/문장부호만
        r"^[\d\s]*$",
        r"^[a-zA-Z\s]*$",
        r"^[\p{P}\p{S}\s]*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// 셀 텍스트가 분석할 가치가 없는지 판정
pub fn is_noise(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return true;
    }
    if trimmed.chars().count() < MIN_MEANINGFUL_CHARS {
        return true;
    }
    NOISE_PATTERNS.iter().any(|re| re.is_match(trimmed))
}
