//! Incremental message parser.
//!
//! Keeps a [`BlockScanner`] alive between calls. When the new text extends
//! the previously seen text and the color scheme is unchanged, only the
//! appended suffix is scanned (warm). Anything else rebuilds from scratch
//! (cold).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::element::MessageElement;
use super::scanner::{BlockScanner, Closing, ScanOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// Whether more text may still arrive for this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    Streaming,
    Final,
}

impl Finality {
    fn closing(self) -> Closing {
        match self {
            Finality::Streaming => Closing::Provisional,
            Finality::Final => Closing::Final,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Cold,
    Warm,
}

impl ParseMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Cold => "cold",
            ParseMode::Warm => "warm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncrementalParser {
    options: ScanOptions,
    scanner: Option<BlockScanner>,
    seen: String,
    scheme: ColorScheme,
    last_mode: Option<ParseMode>,
    elements: Vec<MessageElement>,
}

impl IncrementalParser {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            scanner: None,
            seen: String::new(),
            scheme: ColorScheme::default(),
            last_mode: None,
            elements: Vec::new(),
        }
    }

    /// Parse `text` and replace the current element list.
    ///
    /// The result is identical to a cold parse of the same text; warm mode
    /// only changes how much work it takes.
    pub fn parse(&mut self, text: &str, scheme: ColorScheme, finality: Finality) -> ParseMode {
        // Never superseded, so always Some.
        self.try_parse(text, scheme, finality, || false)
            .unwrap_or(ParseMode::Cold)
    }

    /// Like [`IncrementalParser::parse`], but gives up once `superseded`
    /// returns `true`, and returns `None`. Giving up in the middle of a scan
    /// resets the parser, clearing the previous element list with it.
    pub fn try_parse(
        &mut self,
        text: &str,
        scheme: ColorScheme,
        finality: Finality,
        superseded: impl Fn() -> bool,
    ) -> Option<ParseMode> {
        let warm = self.scanner.is_some()
            && scheme == self.scheme
            && text.len() >= self.seen.len()
            && text.as_bytes().starts_with(self.seen.as_bytes());

        let mode = if warm {
            ParseMode::Warm
        } else {
            if self.scanner.is_some() {
                debug!(
                    previous_len = self.seen.len(),
                    new_len = text.len(),
                    scheme_changed = scheme != self.scheme,
                    "text no longer extends parsed prefix, reparsing"
                );
            }
            self.scanner = Some(BlockScanner::new(self.options.clone()));
            self.seen.clear();
            self.scheme = scheme;
            ParseMode::Cold
        };

        let suffix = &text[self.seen.len()..];
        let scanner = self
            .scanner
            .get_or_insert_with(|| BlockScanner::new(self.options.clone()));
        if !suffix.is_empty() {
            if !scanner.feed_until(suffix, &superseded) {
                debug!(mode = mode.as_str(), "parse superseded, dropping scan state");
                self.reset();
                return None;
            }
            self.seen.push_str(suffix);
        }
        if superseded() {
            return None;
        }
        self.elements = scanner.render(finality.closing());
        self.last_mode = Some(mode);
        Some(mode)
    }

    #[must_use]
    pub fn elements(&self) -> &[MessageElement] {
        &self.elements
    }

    #[must_use]
    pub fn last_mode(&self) -> Option<ParseMode> {
        self.last_mode
    }

    #[must_use]
    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    /// Forget all state; the next parse is cold.
    pub fn reset(&mut self) {
        self.scanner = None;
        self.seen.clear();
        self.last_mode = None;
        self.elements.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::scanner::scan_document;

    fn parser() -> IncrementalParser {
        IncrementalParser::new(ScanOptions::default())
    }

    #[test]
    fn first_parse_is_cold_then_warm_on_append() {
        let mut p = parser();
        assert_eq!(p.parse("Hello", ColorScheme::Light, Finality::Streaming), ParseMode::Cold);
        assert_eq!(
            p.parse("Hello world\n", ColorScheme::Light, Finality::Streaming),
            ParseMode::Warm
        );
        assert_eq!(p.elements(), &[MessageElement::Text("Hello world".into())]);
        assert_eq!(p.last_mode(), Some(ParseMode::Warm));
    }

    #[test]
    fn scheme_change_or_rewrite_goes_cold() {
        let mut p = parser();
        p.parse("abc\n", ColorScheme::Light, Finality::Streaming);
        assert_eq!(p.parse("abc\n", ColorScheme::Dark, Finality::Streaming), ParseMode::Cold);
        assert_eq!(p.scheme(), ColorScheme::Dark);
        assert_eq!(p.parse("abd\n", ColorScheme::Dark, Finality::Streaming), ParseMode::Cold);
        assert_eq!(p.parse("ab", ColorScheme::Dark, Finality::Streaming), ParseMode::Cold);
        assert_eq!(p.elements(), &[MessageElement::Text("ab".into())]);
    }

    #[test]
    fn same_text_reparse_is_warm_and_identical() {
        let mut p = parser();
        let text = "x\n```\ny\n```\n| a |\n|---|\n";
        p.parse(text, ColorScheme::Light, Finality::Final);
        let first = p.elements().to_vec();
        assert_eq!(p.parse(text, ColorScheme::Light, Finality::Final), ParseMode::Warm);
        assert_eq!(p.elements(), first.as_slice());
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn warm_result_equals_cold_result() {
        let options = ScanOptions::default();
        let steps = [
            "Here is code:\n",
            "Here is code:\n```py\npri",
            "Here is code:\n```py\nprint(1)\n```\n",
        ];
        let mut p = IncrementalParser::new(options.clone());
        for step in steps {
            p.parse(step, ColorScheme::Light, Finality::Streaming);
            assert_eq!(p.elements(), scan_document(step, &options, Closing::Provisional));
        }
        p.parse(steps[2], ColorScheme::Light, Finality::Final);
        assert_eq!(
            p.elements(),
            &[
                MessageElement::Text("Here is code:".into()),
                MessageElement::Code {
                    code: "print(1)".into(),
                    language: "py".into(),
                    indent_level: 0,
                },
            ]
        );
    }

    #[test]
    fn superseded_parse_resets_state() {
        let mut p = parser();
        p.parse("kept\n", ColorScheme::Light, Finality::Streaming);
        let long = format!("kept\n{}", "row\n".repeat(4096));
        assert_eq!(
            p.try_parse(&long, ColorScheme::Light, Finality::Streaming, || true),
            None
        );
        assert!(p.elements().is_empty());
        assert_eq!(p.last_mode(), None);
        assert_eq!(
            p.try_parse(&long, ColorScheme::Light, Finality::Final, || false),
            Some(ParseMode::Cold)
        );
        assert_eq!(p.elements(), &[MessageElement::Text(long.trim().to_string())]);
    }

    #[test]
    fn reset_forces_cold() {
        let mut p = parser();
        p.parse("a", ColorScheme::Light, Finality::Streaming);
        p.reset();
        assert!(p.elements().is_empty());
        assert_eq!(p.last_mode(), None);
        assert_eq!(p.parse("ab", ColorScheme::Light, Finality::Streaming), ParseMode::Cold);
    }
}
