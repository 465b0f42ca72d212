//! 프롬프트 생성 모듈
//!
//! 협업 후기 한 건을 분석하도록 모델에 지시한다. 응답 키는 [`crate::types::ANALYSIS_COLUMNS`]와 일치해야 한다.

use crate::types::ANALYSIS_COLUMNS;

/// 의료기관 협업 맥락 태그 후보
pub const CONTEXT_TAGS: &[&str] = &[
    "존중_소통",
    "정보_공유",
    "업무_명확성",
    "업무_협조",
    "태도_개선",
    "환자_안전",
    "진료_지원",
    "행정_절차",
    "인력_부족",
    "시스템_전산",
];

/// 분석 프롬프트 생성
///
/// # Arguments
/// * `text` - 원문 협업 후기
pub fn build_analysis_prompt(text: &str) -> String {
    let tags = CONTEXT_TAGS.join(", ");
    let keys = ANALYSIS_COLUMNS
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"당신은 병원 부서 간 협업 설문의 주관식 응답을 분석하는 전문가입니다.
아래 응답을 읽고 지정된 JSON 객체 하나만 출력하세요. 설명 문장이나 다른 텍스트는 쓰지 마세요.

## 응답 원문
{text}

## 작업
1. 정제된_텍스트: 맞춤법과 띄어쓰기를 다듬고 의미는 바꾸지 마세요.
   사람 이름, 직함이 붙은 호칭(예: 홍길동 선생님, 김과장)은 "OOO"로 바꾸세요.
2. 비식별_처리: 1에서 개인 식별 정보를 가렸다면 true, 아니면 false.
3. 감정_분류: "긍정", "부정", "중립" 중 하나.
4. 감정_강도_점수: 1-10 정수 (1 매우 약함, 10 매우 강함).
5. 핵심_키워드: 응답의 핵심 단어 0-5개 배열.
6. 의료_맥락: 다음 중 해당하는 태그 배열 ({tags}).
7. 신뢰도_점수: 이 분석에 대한 자신의 확신 정도 1-10 정수.

## 출력 형식
키는 정확히 다음 {count}개만 사용하세요: {keys}
예시:
{{"정제된_텍스트": "업무 요청 시 항상 빠르게 회신해 주셔서 감사합니다.", "비식별_처리": false, "감정_분류": "긍정", "감정_강도_점수": 7, "핵심_키워드": ["회신", "신속"], "의료_맥락": ["업무_협조"], "신뢰도_점수": 8}}"#,
        text = text.trim(),
        tags = tags,
        count = ANALYSIS_COLUMNS.len(),
        keys = keys,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_text_and_keys() {
        let prompt = build_analysis_prompt("  회신이 늦습니다  ");
        assert!(prompt.contains("회신이 늦습니다\n"));
        for key in ANALYSIS_COLUMNS {
            assert!(prompt.contains(&format!("\"{}\"", key)));
        }
        assert!(prompt.contains("업무_협조"));
    }
}
