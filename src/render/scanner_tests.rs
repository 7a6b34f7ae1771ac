use super::*;
use crate::attachment::TagKind;
use uuid::Uuid;

fn final_scan(text: &str) -> Vec<MessageElement> {
    scan_document(text, &ScanOptions::default(), Closing::Final)
}

fn text(value: &str) -> MessageElement {
    MessageElement::Text(value.to_string())
}

fn code(body: &str, language: &str, indent_level: usize) -> MessageElement {
    MessageElement::Code {
        code: body.to_string(),
        language: language.to_string(),
        indent_level,
    }
}

#[test]
fn empty_input_has_no_elements() {
    assert!(final_scan("").is_empty());
    assert!(final_scan("\n\n  \n").is_empty());
}

#[test]
fn paragraph_then_fenced_code() {
    let elements = final_scan("Here is code:\n```py\nprint(1)\n```\n");
    assert_eq!(elements, vec![text("Here is code:"), code("print(1)", "py", 0)]);
}

#[test]
fn indented_fence_strips_its_indent() {
    let elements = final_scan("  ```rust\n  let x = 1;\n    nested\n  ```");
    assert_eq!(elements, vec![code("let x = 1;\n  nested", "rust", 2)]);
}

#[test]
fn unterminated_fence_is_provisional_code_but_final_text() {
    let options = ScanOptions::default();
    let source = "intro\n```py\nprint(1)";
    assert_eq!(
        scan_document(source, &options, Closing::Provisional),
        vec![text("intro"), code("print(1)", "py", 0)]
    );
    assert_eq!(
        scan_document(source, &options, Closing::Final),
        vec![text("intro"), text("```py\nprint(1)")]
    );
}

#[test]
fn thinking_block_and_trailing_text() {
    let elements = final_scan("<think>\nplan it\n</think>\nAnswer.");
    assert_eq!(
        elements,
        vec![
            MessageElement::Thinking {
                content: "plan it".into(),
                is_expanded: false,
            },
            text("Answer."),
        ]
    );
}

#[test]
fn inline_thinking_close_reprocesses_remainder() {
    let elements = final_scan("<reasoning>short</reasoning>Done");
    assert_eq!(
        elements,
        vec![
            MessageElement::Thinking {
                content: "short".into(),
                is_expanded: false,
            },
            text("Done"),
        ]
    );
}

#[test]
fn thinking_expanded_follows_options() {
    let options = ScanOptions::new(AttachmentTags::default(), true);
    let elements = scan_document("<thinking>x</thinking>", &options, Closing::Final);
    assert_eq!(
        elements,
        vec![MessageElement::Thinking {
            content: "x".into(),
            is_expanded: true,
        }]
    );
}

#[test]
fn unterminated_thinking_is_literal_at_final() {
    assert_eq!(final_scan("<think>\nhmm"), vec![text("<think>\nhmm")]);
}

#[test]
fn pipe_table_pads_short_rows() {
    let elements = final_scan("| a | b |\n|---|:-:|\n| 1 | 2 |\n| 3 |\n\nafter");
    assert_eq!(
        elements,
        vec![
            MessageElement::Table {
                header: vec!["a".into(), "b".into()],
                rows: vec![
                    vec!["1".into(), "2".into()],
                    vec!["3".into(), String::new()],
                ],
            },
            text("after"),
        ]
    );
}

#[test]
fn pipe_row_without_separator_stays_text() {
    assert_eq!(
        final_scan("| just a pipe\nmore text"),
        vec![text("| just a pipe\nmore text")]
    );
}

#[test]
fn table_ends_paragraph_before_it() {
    let elements = final_scan("lead in\n|h|\n|-|\n|v|");
    assert_eq!(
        elements,
        vec![
            text("lead in"),
            MessageElement::Table {
                header: vec!["h".into()],
                rows: vec![vec!["v".into()]],
            },
        ]
    );
}

#[test]
fn display_formulas() {
    let elements = final_scan("Euler:\n\\[\ne^{i\\pi} + 1 = 0\n\\]\n$$x^2$$");
    assert_eq!(
        elements,
        vec![
            text("Euler:"),
            MessageElement::Formula("e^{i\\pi} + 1 = 0".into()),
            MessageElement::Formula("x^2".into()),
        ]
    );
}

#[test]
fn attachment_tags_split_paragraphs() {
    let tags = AttachmentTags::default();
    let image = Uuid::from_u128(7);
    let file = Uuid::from_u128(9);
    let source = format!(
        "See {} here\n{}",
        tags.wrap(TagKind::Image, image),
        tags.wrap(TagKind::File, file)
    );
    assert_eq!(
        final_scan(&source),
        vec![
            text("See"),
            MessageElement::ImageRef(image),
            text("here"),
            MessageElement::FileRef(file),
        ]
    );
}

#[test]
fn malformed_tag_is_plain_text() {
    let source = "look <image-uuid>not-a-uuid</image-uuid>";
    assert_eq!(final_scan(source), vec![text(source)]);
}

#[test]
fn crlf_lines() {
    assert_eq!(
        final_scan("a\r\n```\r\nx\r\n```\r\n"),
        vec![text("a"), code("x", "", 0)]
    );
}

#[test]
fn confirmed_only_grows_at_boundaries() {
    let mut scanner = BlockScanner::new(ScanOptions::default());
    scanner.feed("para");
    assert!(scanner.confirmed().is_empty());
    scanner.feed("graph\n```py\n");
    assert_eq!(scanner.confirmed(), &[text("paragraph")]);
    scanner.feed("x = 1\n``");
    assert_eq!(scanner.confirmed().len(), 1);
    scanner.feed("`\n");
    assert_eq!(scanner.confirmed(), &[text("paragraph"), code("x = 1", "py", 0)]);
}

#[test]
fn render_does_not_disturb_state() {
    let mut scanner = BlockScanner::new(ScanOptions::default());
    scanner.feed("```py\nprint(1)");
    let provisional = scanner.render(Closing::Provisional);
    let literal = scanner.render(Closing::Final);
    assert_eq!(provisional, vec![code("print(1)", "py", 0)]);
    assert_eq!(literal, vec![text("```py\nprint(1)")]);
    scanner.feed("\n```");
    assert_eq!(scanner.render(Closing::Final), vec![code("print(1)", "py", 0)]);
}

#[test]
fn chunked_feeding_matches_single_pass() {
    let source = "Intro line\n<think>\nstep one\nstep two\n</think>\n| k | v |\n|---|---|\n| a | 1 |\n\n```js\nconsole.log(1)\n```\n\\[\nx\n\\]\ntail";
    let options = ScanOptions::default();
    let expected = scan_document(source, &options, Closing::Final);

    for chunk in [1usize, 3, 7, 16] {
        let mut scanner = BlockScanner::new(options.clone());
        let mut previous_confirmed = 0;
        for piece in source.as_bytes().chunks(chunk) {
            scanner.feed(std::str::from_utf8(piece).unwrap());
            assert!(scanner.confirmed().len() >= previous_confirmed);
            previous_confirmed = scanner.confirmed().len();
            let snapshot = scanner.render(Closing::Provisional);
            assert!(snapshot.starts_with(scanner.confirmed()));
        }
        assert_eq!(scanner.render(Closing::Final), expected, "chunk size {chunk}");
    }
    assert_eq!(expected.len(), 6);
}

#[test]
fn feed_until_stops_when_superseded() {
    let source = "line\n".repeat(SUPERSEDE_CHECK_LINES * 4);
    let checks = std::cell::Cell::new(0usize);

    let mut scanner = BlockScanner::new(ScanOptions::default());
    let finished = scanner.feed_until(&source, || {
        checks.set(checks.get() + 1);
        checks.get() >= 2
    });
    assert!(!finished);
    assert_eq!(checks.get(), 2);

    let mut scanner = BlockScanner::new(ScanOptions::default());
    assert!(scanner.feed_until(&source, || false));
    assert_eq!(
        scanner.render(Closing::Final),
        scan_document(&source, &ScanOptions::default(), Closing::Final)
    );
}
