// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 已知的拦截/验证码页面短语
///
/// 固定短语表只是尽力而为的近似，未命中并不保证页面未被拦截
const BLOCK_PHRASES: &[&str] = &[
    "보안 확인",
    "자동입력 방지",
    "비정상적인 접근",
    "접속이 일시적으로 제한",
    "captcha",
    "are you a robot",
    "not a robot",
    "access denied",
    "too many requests",
    "unusual traffic",
];

/// 检查正文与标题是否命中拦截短语
///
/// # 返回值
///
/// 命中时返回第一个命中的短语
pub fn detect_block(body_text: &str, title: &str) -> Option<&'static str> {
    let haystack = format!("{}\n{}", title, body_text).to_lowercase();
    BLOCK_PHRASES
        .iter()
        .find(|phrase| haystack.contains(*phrase))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_korean_and_english_phrases() {
        assert_eq!(
            detect_block("서비스 이용을 위해 보안 확인을 완료해 주세요", ""),
            Some("보안 확인")
        );
        assert_eq!(detect_block("", "Access Denied"), Some("access denied"));
        assert_eq!(detect_block("Please solve the CAPTCHA", ""), Some("captcha"));
    }

    #[test]
    fn test_ordinary_page_is_not_blocked() {
        assert_eq!(detect_block("1위 캠핑의자 랭킹 상승", "쇼핑 베스트"), None);
        assert_eq!(detect_block("", ""), None);
    }
}
