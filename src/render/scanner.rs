//! Resumable line-oriented block scanner.
//!
//! The scanner consumes text in arbitrary increments. Complete lines are
//! folded into the scan state; whatever is left after the last newline stays
//! in `partial` and only takes part in provisional rendering. Elements whose
//! closing boundary has been seen are pushed to `confirmed` and never change
//! again, so a warm parse only costs the newly appended bytes plus a clone of
//! the single open block.

use memchr::{memchr, memchr_iter};

use super::element::MessageElement;
use crate::attachment::{tokenize, AttachmentTags, AttachmentToken};

const FENCE: &str = "```";

const THINK_DELIMITERS: [(&str, &str); 3] = [
    ("<think>", "</think>"),
    ("<thinking>", "</thinking>"),
    ("<reasoning>", "</reasoning>"),
];

const FORMULA_DELIMITERS: [(&str, &str); 2] = [("\\[", "\\]"), ("$$", "$$")];

const TAB_WIDTH: usize = 4;

/// Lines scanned between checks of the supersede callback.
const SUPERSEDE_CHECK_LINES: usize = 512;

/// Settings that shape scanner output.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub tags: AttachmentTags,
    pub thinking_expanded: bool,
}

impl ScanOptions {
    #[must_use]
    pub fn new(tags: AttachmentTags, thinking_expanded: bool) -> Self {
        Self {
            tags,
            thinking_expanded,
        }
    }
}

/// How to treat a block that is still open when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closing {
    /// Close open blocks as if their terminator were about to arrive.
    Provisional,
    /// The text is complete: unterminated fences and delimiters are literal.
    Final,
}

#[derive(Debug, Clone)]
struct CodeBlock {
    language: String,
    indent: usize,
    body: String,
    has_lines: bool,
    raw: String,
}

impl CodeBlock {
    fn push_line(&mut self, line: &str) {
        if self.has_lines {
            self.body.push('\n');
        }
        self.has_lines = true;
        self.body.push_str(strip_indent(line, self.indent));
        self.raw.push('\n');
        self.raw.push_str(line);
    }

    fn into_element(self) -> MessageElement {
        MessageElement::Code {
            code: self.body,
            language: self.language,
            indent_level: self.indent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimitedKind {
    Thinking,
    Formula,
}

#[derive(Debug, Clone)]
struct DelimitedBlock {
    kind: DelimitedKind,
    close: &'static str,
    body: String,
    raw: String,
}

impl DelimitedBlock {
    fn new(kind: DelimitedKind, close: &'static str, opening_line: &str) -> Self {
        Self {
            kind,
            close,
            body: String::new(),
            raw: opening_line.to_string(),
        }
    }

    fn into_element(self, options: &ScanOptions) -> MessageElement {
        let content = self.body.trim().to_string();
        match self.kind {
            DelimitedKind::Thinking => MessageElement::Thinking {
                content,
                is_expanded: options.thinking_expanded,
            },
            DelimitedKind::Formula => MessageElement::Formula(content),
        }
    }
}

#[derive(Debug, Clone, Default)]
enum OpenBlock {
    #[default]
    None,
    Code(CodeBlock),
    Delimited(DelimitedBlock),
    /// A pipe row that becomes a table header only if a separator follows.
    TableHeader {
        raw: String,
        header: Vec<String>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

#[derive(Debug, Clone, Default)]
struct ScanState {
    open: OpenBlock,
    paragraph: String,
}

impl ScanState {
    fn process_line(&mut self, line: &str, options: &ScanOptions, out: &mut Vec<MessageElement>) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match std::mem::take(&mut self.open) {
            OpenBlock::None => self.process_boundary_line(line, options, out),
            OpenBlock::Code(mut code) => {
                if is_fence_close(line) {
                    out.push(code.into_element());
                } else {
                    code.push_line(line);
                    self.open = OpenBlock::Code(code);
                }
            }
            OpenBlock::Delimited(mut block) => {
                block.raw.push('\n');
                block.raw.push_str(line);
                self.feed_delimited(block, line, options, out);
            }
            OpenBlock::TableHeader { raw, header } => {
                if is_separator_row(line.trim()) {
                    self.flush_paragraph(out);
                    self.open = OpenBlock::Table {
                        header,
                        rows: Vec::new(),
                    };
                } else {
                    self.push_paragraph_line(&raw);
                    self.process_line(line, options, out);
                }
            }
            OpenBlock::Table { header, mut rows } => {
                let trimmed = line.trim();
                if is_table_row(trimmed) {
                    let mut cells = split_cells(trimmed);
                    if cells.len() < header.len() {
                        cells.resize(header.len(), String::new());
                    }
                    rows.push(cells);
                    self.open = OpenBlock::Table { header, rows };
                } else {
                    out.push(MessageElement::Table { header, rows });
                    self.process_line(line, options, out);
                }
            }
        }
    }

    fn process_boundary_line(
        &mut self,
        line: &str,
        options: &ScanOptions,
        out: &mut Vec<MessageElement>,
    ) {
        let trimmed = line.trim_start();

        if let Some(info) = trimmed.strip_prefix(FENCE) {
            self.flush_paragraph(out);
            let indent = line[..line.len() - trimmed.len()]
                .chars()
                .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                .sum();
            self.open = OpenBlock::Code(CodeBlock {
                language: info.trim_start_matches('`').trim().to_string(),
                indent,
                body: String::new(),
                has_lines: false,
                raw: line.to_string(),
            });
            return;
        }

        for (open, close) in THINK_DELIMITERS {
            if let Some(rest) = trimmed.strip_prefix(open) {
                self.flush_paragraph(out);
                let block = DelimitedBlock::new(DelimitedKind::Thinking, close, line);
                self.feed_delimited(block, rest, options, out);
                return;
            }
        }

        if is_table_row(trimmed) {
            self.open = OpenBlock::TableHeader {
                raw: line.to_string(),
                header: split_cells(trimmed.trim_end()),
            };
            return;
        }

        for (open, close) in FORMULA_DELIMITERS {
            if let Some(rest) = trimmed.strip_prefix(open) {
                self.flush_paragraph(out);
                let block = DelimitedBlock::new(DelimitedKind::Formula, close, line);
                self.feed_delimited(block, rest, options, out);
                return;
            }
        }

        if options.tags.contains_any(line) {
            self.push_tagged_line(line, options, out);
            return;
        }

        self.push_paragraph_line(line);
    }

    fn feed_delimited(
        &mut self,
        mut block: DelimitedBlock,
        text: &str,
        options: &ScanOptions,
        out: &mut Vec<MessageElement>,
    ) {
        if let Some(pos) = text.find(block.close) {
            let rest = &text[pos + block.close.len()..];
            block.body.push_str(&text[..pos]);
            out.push(block.into_element(options));
            if !rest.trim().is_empty() {
                self.process_line(rest, options, out);
            }
        } else {
            block.body.push_str(text);
            block.body.push('\n');
            self.open = OpenBlock::Delimited(block);
        }
    }

    fn push_tagged_line(&mut self, line: &str, options: &ScanOptions, out: &mut Vec<MessageElement>) {
        for token in tokenize(line, &options.tags) {
            match token {
                AttachmentToken::Text(text) => self.paragraph.push_str(&text),
                AttachmentToken::Image(id) => {
                    self.flush_paragraph(out);
                    out.push(MessageElement::ImageRef(id));
                }
                AttachmentToken::File(id) => {
                    self.flush_paragraph(out);
                    out.push(MessageElement::FileRef(id));
                }
            }
        }
        self.paragraph.push('\n');
    }

    fn push_paragraph_line(&mut self, line: &str) {
        self.paragraph.push_str(line);
        self.paragraph.push('\n');
    }

    fn flush_paragraph(&mut self, out: &mut Vec<MessageElement>) {
        let text = self.paragraph.trim();
        if !text.is_empty() {
            out.push(MessageElement::Text(text.to_string()));
        }
        self.paragraph.clear();
    }

    fn close(mut self, closing: Closing, options: &ScanOptions, out: &mut Vec<MessageElement>) {
        match std::mem::take(&mut self.open) {
            OpenBlock::None => {}
            OpenBlock::Code(code) => match closing {
                Closing::Provisional => out.push(code.into_element()),
                Closing::Final => self.push_paragraph_line(&code.raw),
            },
            OpenBlock::Delimited(block) => match closing {
                Closing::Provisional => out.push(block.into_element(options)),
                Closing::Final => self.push_paragraph_line(&block.raw),
            },
            OpenBlock::TableHeader { raw, .. } => self.push_paragraph_line(&raw),
            OpenBlock::Table { header, rows } => out.push(MessageElement::Table { header, rows }),
        }
        self.flush_paragraph(out);
    }
}

/// Incremental block scanner over an append-only text.
#[derive(Debug, Clone)]
pub struct BlockScanner {
    options: ScanOptions,
    confirmed: Vec<MessageElement>,
    state: ScanState,
    partial: String,
}

impl BlockScanner {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            confirmed: Vec::new(),
            state: ScanState::default(),
            partial: String::new(),
        }
    }

    /// Append more text. Only complete lines advance the scan state.
    pub fn feed(&mut self, delta: &str) {
        let _ = self.feed_until(delta, || false);
    }

    /// Like [`BlockScanner::feed`], but polls `superseded` every few hundred
    /// lines and stops as soon as it returns `true`.
    ///
    /// Returns `false` when it stopped early. The scanner then holds a
    /// partially fed text and must be discarded.
    #[must_use]
    pub fn feed_until(&mut self, delta: &str, superseded: impl Fn() -> bool) -> bool {
        self.partial.push_str(delta);
        if memchr(b'\n', delta.as_bytes()).is_none() {
            return true;
        }

        let mut buffer = std::mem::take(&mut self.partial);
        let mut line_start = 0;
        for (line_no, newline) in memchr_iter(b'\n', buffer.as_bytes()).enumerate() {
            if line_no % SUPERSEDE_CHECK_LINES == SUPERSEDE_CHECK_LINES - 1 && superseded() {
                return false;
            }
            self.state
                .process_line(&buffer[line_start..newline], &self.options, &mut self.confirmed);
            line_start = newline + 1;
        }
        buffer.drain(..line_start);
        self.partial = buffer;
        true
    }

    /// Elements whose closing boundary has been seen.
    #[must_use]
    pub fn confirmed(&self) -> &[MessageElement] {
        &self.confirmed
    }

    /// Render the current text. The scanner itself is left untouched, so
    /// feeding can continue after a render of either kind.
    #[must_use]
    pub fn render(&self, closing: Closing) -> Vec<MessageElement> {
        let mut out = self.confirmed.clone();
        let mut tail = self.state.clone();
        if !self.partial.is_empty() {
            tail.process_line(&self.partial, &self.options, &mut out);
        }
        tail.close(closing, &self.options, &mut out);
        out
    }
}

/// Scan a complete text in one pass.
#[must_use]
pub fn scan_document(text: &str, options: &ScanOptions, closing: Closing) -> Vec<MessageElement> {
    let mut scanner = BlockScanner::new(options.clone());
    scanner.feed(text);
    scanner.render(closing)
}

fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= FENCE.len() && trimmed.bytes().all(|b| b == b'`')
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.starts_with('|')
}

fn is_separator_row(trimmed: &str) -> bool {
    if !trimmed.contains('|') {
        return false;
    }
    let cells = split_cells(trimmed);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            !dashes.is_empty() && dashes.bytes().all(|b| b == b'-')
        })
}

fn split_cells(row: &str) -> Vec<String> {
    let inner = row.strip_prefix('|').unwrap_or(row);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Drop up to `indent` columns of leading whitespace.
fn strip_indent(line: &str, indent: usize) -> &str {
    let mut columns = 0;
    let mut offset = 0;
    for (idx, c) in line.char_indices() {
        if columns >= indent {
            break;
        }
        match c {
            ' ' => columns += 1,
            '\t' => columns += TAB_WIDTH,
            _ => break,
        }
        offset = idx + c.len_utf8();
    }
    &line[offset..]
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
