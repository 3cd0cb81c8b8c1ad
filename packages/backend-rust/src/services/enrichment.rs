use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::llm_provider::{LLMError, LLMProvider};

/// One `word meaning` line from the admin batch-import textarea.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWord {
    pub word: String,
    pub meaning: String,
}

/// Bilingual example sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub en: String,
    pub cn: String,
}

/// Fully enriched study material for one word.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedWord {
    pub word: String,
    pub meaning: String,
    pub phonetic: String,
    pub collocations: Vec<String>,
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error("无法解析AI返回内容: {0}")]
    Parse(String),
}

/// Parse the batch-import text: one word per line, spelling first, meaning
/// after the first whitespace run. Lines that do not lead with an ASCII
/// letter are dropped.
pub fn parse_batch_input(text: &str) -> Vec<ParsedWord> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ParsedWord> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let word = parts.next()?;
    let meaning = parts.next()?.trim();

    let valid_word = word
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && word
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '\'' || c == '-');

    if !valid_word || meaning.is_empty() {
        return None;
    }

    Some(ParsedWord {
        word: word.to_lowercase(),
        meaning: meaning.to_string(),
    })
}

/// Enrich a batch of words with one LLM call.
///
/// Single attempt by design: when the call or the parse fails, the whole
/// pending batch fails as a unit and the caller reports the reason per
/// word. No partial credit.
pub async fn enrich_words_batch(
    llm: &LLMProvider,
    words: &[ParsedWord],
) -> Result<Vec<EnrichedWord>, EnrichmentError> {
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let reply = llm.complete(&build_prompt(words)).await?;
    parse_enriched_reply(&reply, words)
}

fn build_prompt(words: &[ParsedWord]) -> String {
    let word_list = words
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{}. {} - {}", i + 1, w.word, w.meaning))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"为以下英语单词批量生成学习资料：

{word_list}

请严格按照以下JSON数组格式返回（不要包含任何其他文字，只返回JSON）：
[
  {{
    "word": "单词原文",
    "meaning": "中文含义",
    "phonetic": "音标，如 /ˈæpl/",
    "collocations": ["常用搭配1", "常用搭配2", "常用搭配3"],
    "sentences": [
      {{"en": "英文例句1", "cn": "中文翻译1"}},
      {{"en": "英文例句2", "cn": "中文翻译2"}}
    ]
  }}
]

要求：
1. 按输入顺序返回每个单词的数据
2. phonetic 使用国际音标格式
3. collocations 提供3-5个常用搭配短语
4. sentences 提供2-3个实用例句，难度适中，适合英语学习者
5. 确保返回的是有效的JSON数组"#
    )
}

#[derive(Debug, Deserialize)]
struct RawEnriched {
    word: Option<String>,
    meaning: Option<String>,
    phonetic: Option<String>,
    collocations: Option<Vec<String>>,
    sentences: Option<Vec<Sentence>>,
}

fn parse_enriched_reply(
    reply: &str,
    inputs: &[ParsedWord],
) -> Result<Vec<EnrichedWord>, EnrichmentError> {
    let json_text = strip_code_fence(reply.trim());

    let raw: Vec<RawEnriched> = serde_json::from_str(json_text)
        .map_err(|err| EnrichmentError::Parse(err.to_string()))?;

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let fallback = inputs.get(index);
            EnrichedWord {
                word: item
                    .word
                    .filter(|w| !w.trim().is_empty())
                    .or_else(|| fallback.map(|f| f.word.clone()))
                    .unwrap_or_default(),
                meaning: item
                    .meaning
                    .filter(|m| !m.trim().is_empty())
                    .or_else(|| fallback.map(|f| f.meaning.clone()))
                    .unwrap_or_default(),
                phonetic: item.phonetic.unwrap_or_default(),
                collocations: item.collocations.unwrap_or_default(),
                sentences: item.sentences.unwrap_or_default(),
            }
        })
        .filter(|item| !item.word.is_empty())
        .collect())
}

/// The model sometimes wraps its reply in a markdown code block.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_space_and_tab_separated_lines() {
        let parsed = parse_batch_input("apple 苹果\nbanana\t香蕉\n\nspecific  具体的");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].word, "apple");
        assert_eq!(parsed[0].meaning, "苹果");
        assert_eq!(parsed[1].word, "banana");
        assert_eq!(parsed[1].meaning, "香蕉");
        assert_eq!(parsed[2].meaning, "具体的");
    }

    #[test]
    fn test_parse_lowercases_and_keeps_hyphen_apostrophe() {
        let parsed = parse_batch_input("Well-Known 著名的\no'clock 点钟");
        assert_eq!(parsed[0].word, "well-known");
        assert_eq!(parsed[1].word, "o'clock");
    }

    #[test]
    fn test_parse_rejects_invalid_lines() {
        assert!(parse_batch_input("3words 数字开头").is_empty());
        assert!(parse_batch_input("onlyword").is_empty());
        assert!(parse_batch_input("   ").is_empty());
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("[1]"), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_parse_reply_falls_back_to_input_fields() {
        let inputs = vec![ParsedWord {
            word: "apple".to_string(),
            meaning: "苹果".to_string(),
        }];
        let reply = r#"[{"phonetic": "/ˈæpl/"}]"#;
        let enriched = parse_enriched_reply(reply, &inputs).unwrap();
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].word, "apple");
        assert_eq!(enriched[0].meaning, "苹果");
        assert_eq!(enriched[0].phonetic, "/ˈæpl/");
        assert!(enriched[0].collocations.is_empty());
    }

    #[test]
    fn test_parse_reply_rejects_non_json() {
        let inputs = vec![ParsedWord {
            word: "apple".to_string(),
            meaning: "苹果".to_string(),
        }];
        assert!(parse_enriched_reply("抱歉，我无法处理。", &inputs).is_err());
    }

    proptest! {
        #[test]
        fn parse_never_panics(text in "\\PC{0,200}") {
            let _ = parse_batch_input(&text);
        }

        #[test]
        fn parsed_words_are_lowercase_ascii(text in "[a-zA-Z'\\- \\t\u{4e00}-\u{9fa5}\n]{0,200}") {
            for parsed in parse_batch_input(&text) {
                prop_assert!(parsed
                    .word
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '\'' || c == '-'));
                prop_assert!(!parsed.meaning.is_empty());
            }
        }
    }
}
