//! Code extraction from free-form model output.
//!
//! Strategies are tried in a fixed order and the first non-empty result wins:
//!
//! 1. [`FencedBlock`] - the first triple-backtick block, language tag optional
//! 2. [`DefinitionScan`] - from the first `def` line up to the next blank line
//! 3. passthrough - the raw text, unchanged
//!
//! Passthrough text is usually not valid code, so the verifier rejects it.

use once_cell::sync::Lazy;
use regex::Regex;

// Any tag is dropped when a newline follows it. On a single line only a
// Python tag is dropped, so inline code such as "```x = 1```" stays intact.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:[\w+.#-]*[ \t]*\r?\n|(?i:python3?|py)[ \t]+)?(.*?)```")
        .expect("fence pattern is valid")
});

/// One way of pulling code out of a response.
pub trait ExtractStrategy: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Extracted code, or `None` when this strategy finds nothing.
    fn extract(&self, raw: &str) -> Option<String>;
}

/// First fenced code block, trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FencedBlock;

impl ExtractStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn extract(&self, raw: &str) -> Option<String> {
        FENCE_RE
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Line scan starting at a function definition.
///
/// Capture begins at the first line whose trimmed text starts with one of the
/// keywords and ends at the first blank line after that. The blank line is
/// not included.
#[derive(Debug, Clone)]
pub struct DefinitionScan {
    keywords: Vec<String>,
}

impl Default for DefinitionScan {
    fn default() -> Self {
        Self::new(["def ", "async def "])
    }
}

impl DefinitionScan {
    /// Scan for lines starting with any of `keywords`.
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    fn starts_definition(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.keywords.iter().any(|k| trimmed.starts_with(k.as_str()))
    }
}

impl ExtractStrategy for DefinitionScan {
    fn name(&self) -> &'static str {
        "definition_scan"
    }

    fn extract(&self, raw: &str) -> Option<String> {
        let mut captured: Vec<&str> = Vec::new();

        for line in raw.lines() {
            if captured.is_empty() {
                if self.starts_definition(line) {
                    captured.push(line);
                }
                continue;
            }
            if line.trim().is_empty() {
                break;
            }
            captured.push(line);
        }

        if captured.is_empty() {
            None
        } else {
            Some(captured.join("\n"))
        }
    }
}

/// Ordered chain of extraction strategies.
pub struct CodeExtractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(vec![Box::new(FencedBlock), Box::new(DefinitionScan::default())])
    }
}

impl CodeExtractor {
    /// Chain with the given strategies, tried in order.
    pub fn new(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        Self { strategies }
    }

    /// First non-empty extraction, or `raw` unchanged.
    pub fn extract(&self, raw: &str) -> String {
        for strategy in &self.strategies {
            if let Some(code) = strategy.extract(raw).filter(|c| !c.is_empty()) {
                tracing::debug!(strategy = strategy.name(), "Extracted code");
                return code;
            }
        }
        tracing::debug!("No code pattern found, passing response through");
        raw.to_string()
    }
}

/// Extract code with the default chain.
pub fn extract_code(raw: &str) -> String {
    CodeExtractor::default().extract(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_language_tag() {
        let raw = "Here you go:\n```python\ndef add(a, b):\n    return a + b\n```\nEnjoy!";
        assert_eq!(extract_code(raw), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn test_fenced_block_without_tag() {
        let raw = "```\n  x = 1\n```";
        assert_eq!(extract_code(raw), "x = 1");
    }

    #[test]
    fn test_fenced_block_other_language_tag() {
        let raw = "```py3   \nprint('hi')\n```";
        assert_eq!(extract_code(raw), "print('hi')");
    }

    #[test]
    fn test_single_line_fence_with_language_tag() {
        assert_eq!(extract_code("```python def f(): return 1```"), "def f(): return 1");
        assert_eq!(extract_code("Answer: ```py  x = 2``` done"), "x = 2");
    }

    #[test]
    fn test_inline_fence_keeps_leading_word_without_tag() {
        assert_eq!(extract_code("```x = 1```"), "x = 1");
        assert_eq!(extract_code("```py\nx=1```"), "x=1");
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let raw = "```python\nfirst()\n```\ntext\n```python\nsecond()\n```";
        assert_eq!(extract_code(raw), "first()");
    }

    #[test]
    fn test_fence_beats_definition_scan() {
        let raw = "def outside():\n    pass\n\n```\ninside()\n```";
        assert_eq!(extract_code(raw), "inside()");
    }

    #[test]
    fn test_definition_scan_stops_at_blank_line() {
        let raw = "Sure.\ndef f(x):\n    y = x * 2\n    return y\n\nprint(f(2))\n";
        assert_eq!(extract_code(raw), "def f(x):\n    y = x * 2\n    return y");
    }

    #[test]
    fn test_definition_scan_keeps_trailing_lines_until_blank() {
        let raw = "def f():\n    return 1\nThis explains the code.";
        assert_eq!(
            extract_code(raw),
            "def f():\n    return 1\nThis explains the code."
        );
    }

    #[test]
    fn test_definition_scan_whitespace_only_line_is_blank() {
        let raw = "    def g():\n        return 2\n   \n    more";
        assert_eq!(extract_code(raw), "    def g():\n        return 2");
    }

    #[test]
    fn test_definition_scan_ignores_blank_lines_before_definition() {
        let raw = "\n\nintro\n\ndef h():\n    pass";
        assert_eq!(extract_code(raw), "def h():\n    pass");
    }

    #[test]
    fn test_async_definition() {
        let raw = "async def fetch():\n    return 3\n\nrest";
        assert_eq!(extract_code(raw), "async def fetch():\n    return 3");
    }

    #[test]
    fn test_passthrough_when_nothing_matches() {
        let raw = "I cannot help with that.\nSorry!";
        assert_eq!(extract_code(raw), raw);
        assert_eq!(extract_code(""), "");
    }

    #[test]
    fn test_empty_fence_falls_through() {
        let raw = "``````\ndef k():\n    pass";
        assert_eq!(extract_code(raw), "def k():\n    pass");
    }

    #[test]
    fn test_custom_chain_order() {
        let extractor = CodeExtractor::new(vec![Box::new(DefinitionScan::new(["fn "]))]);
        let raw = "```\nignored\n```\nfn main() {}\n\n";
        assert_eq!(extractor.extract(raw), "fn main() {}");
    }
}
