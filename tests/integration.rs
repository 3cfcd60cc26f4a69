//! Integration tests for the Quire layout pipeline.
//!
//! These tests go through the public entry points, from a document (or its
//! JSON) to the laid-out pages. They verify:
//! - Word wrapping and justification
//! - Unsplittable blocks moving to the next page
//! - Table column widths, spans and repeated header rows
//! - Floats narrowing the lines beside them
//! - Right alignment and the take-back of aligned lines
//! - Columns, lists, page chrome, artefacts and strict conformance

use quire::config::LayoutConfig;
use quire::error::{LayoutError, QuireError};
use quire::geometry::Edges;
use quire::layout::line::CloseReason;
use quire::layout::{LaidOutDocument, LaidOutItem, LaidOutLine, RunContent};
use quire::model::*;
use quire::style::*;

// ─── Helpers ────────────────────────────────────────────────────

/// A Courier 10 document: 6pt characters on 12pt lines.
fn make_document(width: f64, height: f64, children: Vec<Node>) -> Document {
    Document {
        children,
        default_page: PageConfig {
            size: PageSize::Custom { width, height },
            margin: Edges::uniform(10.0),
            wrap: true,
        },
        style: Style {
            font_family: Some("Courier".to_string()),
            font_size: Some(10.0),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn make_text(content: &str) -> Node {
    Node::text(content, Style::default())
}

fn make_aligned_text(content: &str, align: HorizontalAlign) -> Node {
    Node::text(
        content,
        Style {
            horizontal_align: Some(align),
            ..Default::default()
        },
    )
}

fn make_styled_view(style: Style, children: Vec<Node>) -> Node {
    Node::view(style, children)
}

fn make_row(repeat_at_top: bool, cells: Vec<Node>) -> Node {
    Node::row(repeat_at_top, Style::default(), cells)
}

fn make_cell(text: &str) -> Node {
    Node::cell(1, Style::default(), vec![make_text(text)])
}

fn numbered_lines(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("{prefix} {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn layout(document: &Document) -> LaidOutDocument {
    quire::layout_document(document, &LayoutConfig::default()).unwrap()
}

fn line_text(line: &LaidOutLine) -> String {
    line.text().trim().to_string()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

const PARAGRAPH: &str = "The survey covered three sites along the river and each site \
    was visited twice, once in the morning and once at dusk, with every sighting \
    recorded together with its time and its position on the bank.";

// ─── Word wrapping ──────────────────────────────────────────────

#[test]
fn test_paragraph_wraps_without_splitting_words() {
    let doc = make_document(220.0, 400.0, vec![make_text(PARAGRAPH)]);
    let laid = layout(&doc);
    assert_eq!(laid.pages.len(), 1);

    let lines = laid.pages[0].lines();
    assert!(lines.len() > 3, "Expected several lines, got {}", lines.len());
    for line in &lines {
        assert!(
            line.content_width <= line.rect.width + 1e-9,
            "Line '{}' is wider than its region",
            line.text()
        );
    }

    let words: Vec<String> = lines
        .iter()
        .flat_map(|l| {
            line_text(l)
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    let expected: Vec<&str> = PARAGRAPH.split_whitespace().collect();
    assert_eq!(words, expected);

    for line in &lines[..lines.len() - 1] {
        assert_eq!(line.close_reason, Some(CloseReason::SoftWrap));
    }
    assert_eq!(lines.last().unwrap().close_reason, Some(CloseReason::End));
}

#[test]
fn test_justified_lines_fill_the_region() {
    let doc = make_document(
        220.0,
        400.0,
        vec![make_aligned_text(PARAGRAPH, HorizontalAlign::Justify)],
    );
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    assert!(lines.len() > 3);

    for line in &lines[..lines.len() - 1] {
        let painted: f64 = line.runs.iter().map(|r| r.rect.width).sum();
        assert!(
            approx(painted, line.rect.width),
            "Justified line '{}' paints {painted} of {}",
            line.text(),
            line.rect.width
        );
    }

    // The last line is closed by the end of the content and stays ragged.
    let last = lines.last().unwrap();
    let painted: f64 = last.runs.iter().map(|r| r.rect.width).sum();
    assert!(painted < last.rect.width);
    match &last.runs[0].content {
        RunContent::Text { word_spacing, .. } => assert_eq!(*word_spacing, 0.0),
        other => panic!("Expected text, got {other:?}"),
    }
}

#[test]
fn test_hard_breaks_close_lines_with_their_reason() {
    let doc = make_document(220.0, 300.0, vec![make_text("one\ntwo\n\nfour")]);
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].close_reason, Some(CloseReason::HardBreak));
    assert_eq!(line_text(lines[3]), "four");
    // The empty line keeps the height of the text around it.
    assert!(approx(lines[2].rect.height, 12.0));
    assert!(approx(lines[3].rect.y, 10.0 + 36.0));
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn test_unsplittable_block_moves_to_the_next_page() {
    // 280pt of content height: 10 lines leave room for 13 of the 15 rows.
    let keep = make_styled_view(
        Style {
            overflow_split: Some(OverflowSplit::Never),
            ..Default::default()
        },
        vec![make_text(&numbered_lines("row", 15))],
    )
    .with_id("keep");
    let doc = make_document(220.0, 300.0, vec![make_text(&numbered_lines("line", 10)), keep]);
    let laid = layout(&doc);

    assert_eq!(laid.pages.len(), 2);
    let first = laid.pages[0].text();
    assert!(first.contains("line 9"), "{first}");
    assert!(!first.contains("row"), "Rows leaked onto page 1:\n{first}");

    let second = laid.pages[1].text();
    for i in 0..15 {
        assert!(second.contains(&format!("row {i}")), "row {i} missing:\n{second}");
    }

    let placements: Vec<_> = laid.placements_of("keep").collect();
    assert_eq!(placements.len(), 1, "Unsplittable block was split");
    assert_eq!(placements[0].page, 1);
    assert!(approx(placements[0].rect.y, 10.0));
}

#[test]
fn test_splittable_block_continues_as_fragments() {
    let flowing = make_styled_view(Style::default(), vec![make_text(&numbered_lines("row", 30))])
        .with_id("flowing");
    let doc = make_document(220.0, 300.0, vec![make_text("intro"), flowing]);
    let laid = layout(&doc);

    assert_eq!(laid.pages.len(), 2);
    let placements: Vec<_> = laid.placements_of("flowing").collect();
    assert_eq!(placements.len(), 2);
    assert_eq!(placements[0].page, 0);
    assert_eq!(placements[1].page, 1);
    assert!(approx(placements[1].rect.y, 10.0));

    // Every row is placed exactly once.
    let all: String = laid.pages.iter().map(|p| p.text() + "\n").collect();
    for i in 0..30 {
        let needle = format!("row {i}\n");
        assert_eq!(all.matches(&needle).count(), 1, "row {i}");
    }
}

#[test]
fn test_explicit_page_break() {
    let doc = make_document(
        220.0,
        300.0,
        vec![
            make_text("before"),
            Node::break_node(BreakNodeKind::Page),
            make_text("after"),
        ],
    );
    let laid = layout(&doc);
    assert_eq!(laid.pages.len(), 2);
    assert_eq!(laid.pages[0].text(), "before");
    assert_eq!(laid.pages[1].text(), "after");
}

#[test]
fn test_page_limit_halts_layout() {
    let doc = make_document(220.0, 100.0, vec![make_text(&numbered_lines("line", 100))]);
    let config = LayoutConfig {
        max_pages: 2,
        ..Default::default()
    };
    let laid = quire::layout_document(&doc, &config).unwrap();
    assert_eq!(laid.pages.len(), 2);
    assert!(laid.halted);
}

#[test]
fn test_zero_progress_halts_layout() {
    // A 4pt wide box cannot hold a single 6pt character.
    let narrow = make_styled_view(
        Style {
            width: Some(Dimension::Pt(4.0)),
            ..Default::default()
        },
        vec![make_text("abc")],
    );
    let doc = make_document(220.0, 300.0, vec![narrow, make_text("after")]);
    let laid = layout(&doc);
    assert!(laid.halted);
    assert!(!laid.pages[0].text().contains("after"));
}

// ─── Tables ─────────────────────────────────────────────────────

#[test]
fn test_table_column_spans_split_evenly() {
    let wide = |span: i32, id: Option<&str>| {
        let cell = Node::cell(
            span,
            Style {
                width: Some(Dimension::Pt(200.0)),
                ..Default::default()
            },
            vec![make_text("x")],
        );
        match id {
            Some(id) => cell.with_id(id),
            None => cell,
        }
    };
    let body_row = |n: usize| {
        make_row(
            false,
            ["a", "b", "c"]
                .iter()
                .map(|c| make_cell(c).with_id(&format!("{c}{n}")))
                .collect(),
        )
    };
    let table = Node::table(
        Style::default(),
        vec![
            make_row(false, vec![wide(1, Some("first")), wide(2, Some("spanning"))]),
            body_row(2),
            body_row(3),
        ],
    );
    // 400pt of content width.
    let doc = make_document(420.0, 300.0, vec![table]);
    let laid = layout(&doc);

    let width_of = |id: &str| laid.placements_of(id).next().unwrap().rect.width;
    assert!(approx(width_of("first"), 200.0));
    assert!(approx(width_of("spanning"), 200.0));
    for n in [2, 3] {
        assert!(approx(width_of(&format!("a{n}")), 200.0));
        assert!(approx(width_of(&format!("b{n}")), 100.0));
        assert!(approx(width_of(&format!("c{n}")), 100.0));
    }

    let a2 = laid.placements_of("a2").next().unwrap().rect;
    let b2 = laid.placements_of("b2").next().unwrap().rect;
    let c2 = laid.placements_of("c2").next().unwrap().rect;
    assert!(approx(a2.x, 10.0));
    assert!(approx(b2.x, 210.0));
    assert!(approx(c2.x, 310.0));
    assert!(approx(a2.y, b2.y));
}

#[test]
fn test_table_header_repeats_on_each_page() {
    let mut rows = vec![make_row(true, vec![make_cell("Head")])];
    for i in 0..30 {
        rows.push(make_row(false, vec![make_cell(&format!("Row {i}"))]));
    }
    let doc = make_document(220.0, 300.0, vec![Node::table(Style::default(), rows)]);
    let laid = layout(&doc);

    assert_eq!(laid.pages.len(), 2, "Expected the table to span 2 pages");
    for page in &laid.pages {
        let lines = page.lines();
        assert_eq!(line_text(lines[0]), "Head", "Page {} lacks the header", page.index);
    }

    // Body rows are never duplicated by the replay.
    let all: Vec<String> = laid
        .pages
        .iter()
        .flat_map(|p| p.lines().into_iter().map(line_text).collect::<Vec<_>>())
        .collect();
    assert_eq!(all.iter().filter(|t| *t == "Head").count(), 2);
    for i in 0..30 {
        let row = format!("Row {i}");
        assert_eq!(all.iter().filter(|t| **t == row).count(), 1, "{row}");
    }
}

#[test]
fn test_cells_stretch_to_their_row() {
    let table = Node::table(
        Style::default(),
        vec![make_row(
            false,
            vec![
                make_cell("short").with_id("short"),
                make_cell("one\ntwo\nthree").with_id("tall"),
            ],
        )],
    );
    let doc = make_document(220.0, 300.0, vec![table]);
    let laid = layout(&doc);
    let short = laid.placements_of("short").next().unwrap().rect;
    let tall = laid.placements_of("tall").next().unwrap().rect;
    assert!(approx(tall.height, 36.0));
    assert!(approx(short.height, tall.height));
}

#[test]
fn test_zero_column_span_is_fatal() {
    let table = Node::table(
        Style::default(),
        vec![make_row(
            false,
            vec![Node::cell(0, Style::default(), vec![]).with_id("broken")],
        )],
    );
    let doc = make_document(220.0, 300.0, vec![table]);
    let err = quire::layout_document(&doc, &LayoutConfig::default()).unwrap_err();
    match err {
        QuireError::Layout(LayoutError::Component { component, source }) => {
            assert_eq!(component, "broken");
            assert!(matches!(*source, LayoutError::InvalidColumnSpan { span: 0 }));
        }
        other => panic!("Expected a component error, got {other:?}"),
    }
}

// ─── Floats ─────────────────────────────────────────────────────

#[test]
fn test_float_narrows_the_lines_beside_it() {
    let float = make_styled_view(
        Style {
            float: Some(FloatMode::Left),
            width: Some(Dimension::Pt(50.0)),
            height: Some(Dimension::Pt(30.0)),
            ..Default::default()
        },
        vec![],
    );
    let doc = make_document(220.0, 300.0, vec![float, make_text(PARAGRAPH)]);
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    assert!(lines.len() > 4);

    // Lines overlapping the float's 30pt span start after it.
    for line in &lines[..3] {
        assert!(approx(line.rect.x, 60.0), "Line at y={} starts at {}", line.rect.y, line.rect.x);
        assert!(approx(line.rect.width, 150.0));
        assert!(line.content_width <= 150.0);
    }
    for line in &lines[3..] {
        assert!(approx(line.rect.x, 10.0));
        assert!(approx(line.rect.width, 200.0));
    }
}

#[test]
fn test_right_float_keeps_lines_on_the_left() {
    let float = make_styled_view(
        Style {
            float: Some(FloatMode::Right),
            width: Some(Dimension::Pt(50.0)),
            height: Some(Dimension::Pt(20.0)),
            ..Default::default()
        },
        vec![],
    );
    let doc = make_document(220.0, 300.0, vec![float, make_text(PARAGRAPH)]);
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    assert!(approx(lines[0].rect.x, 10.0));
    assert!(approx(lines[0].rect.width, 150.0));
    assert!(approx(lines[2].rect.width, 200.0));

    let region = laid.pages[0].root.columns[0].items.iter().find_map(|item| match item {
        LaidOutItem::Block(b) => b.positioned.first(),
        _ => None,
    });
    let region = region.expect("float region");
    assert_eq!(region.float, FloatMode::Right);
    assert!(approx(region.rect.x, 160.0));
}

#[test]
fn test_float_wider_than_its_region_keeps_the_text_after_it() {
    let float = make_styled_view(
        Style {
            float: Some(FloatMode::Right),
            width: Some(Dimension::Pt(300.0)),
            ..Default::default()
        },
        vec![make_text("f")],
    );
    let doc = make_document(220.0, 300.0, vec![float, make_text("text")]);
    let laid = layout(&doc);
    assert!(!laid.halted);

    let lines = laid.pages[0].lines();
    let text = lines.iter().find(|l| line_text(l) == "text").expect("text line");
    // Placed under the 12pt float, across the full width.
    assert!(approx(text.rect.y, 22.0));
    assert!(approx(text.rect.width, 200.0));
}

#[test]
fn test_word_too_wide_beside_a_float_moves_below_it() {
    // 30pt are left beside the float; "hello" is exactly 30pt wide.
    let float = make_styled_view(
        Style {
            float: Some(FloatMode::Left),
            width: Some(Dimension::Pt(170.0)),
            height: Some(Dimension::Pt(30.0)),
            ..Default::default()
        },
        vec![],
    );
    let doc = make_document(220.0, 300.0, vec![float, make_text("hello")]);
    let laid = layout(&doc);
    assert!(!laid.halted);

    let texts: Vec<String> = laid.pages[0]
        .lines()
        .iter()
        .map(|l| line_text(l))
        .filter(|t| !t.is_empty())
        .collect();
    assert_eq!(texts, ["hello"]);
    let hello = laid.pages[0]
        .lines()
        .into_iter()
        .find(|l| line_text(l) == "hello")
        .unwrap();
    assert!(approx(hello.rect.x, 10.0));
    assert!(approx(hello.rect.y, 40.0));
}

#[test]
fn test_spaces_on_both_sides_of_an_inline_block_are_kept() {
    let inline_block = make_styled_view(
        Style {
            position: Some(PositionMode::InlineBlock),
            width: Some(Dimension::Pt(12.0)),
            ..Default::default()
        },
        vec![make_text("x")],
    );
    let doc = make_document(
        220.0,
        300.0,
        vec![make_text("aa "), inline_block, make_text(" bb")],
    );
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    let line = lines.iter().find(|l| l.text().contains("aa")).unwrap();
    assert_eq!(line.text(), "aa  bb");
    // 18pt of text, the 12pt box, 18pt of text.
    assert!(approx(line.content_width, 48.0));
}

// ─── Alignment ──────────────────────────────────────────────────

#[test]
fn test_right_aligned_lines_take_back_their_shift() {
    // 100pt of content width: "aaaaaaaaaaaa" is 72pt, "bbbbbbbb" 48pt.
    let doc = make_document(
        120.0,
        200.0,
        vec![make_aligned_text("aaaaaaaaaaaa bbbbbbbb", HorizontalAlign::Right)],
    );
    let laid = layout(&doc);
    let lines = laid.pages[0].lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(line_text(lines[0]), "aaaaaaaaaaaa");
    assert_eq!(line_text(lines[1]), "bbbbbbbb");

    for line in &lines {
        let last = line.runs.last().unwrap();
        assert!(
            approx(last.rect.right(), 110.0),
            "Line '{}' ends at {}",
            line.text(),
            last.rect.right()
        );
    }
    assert!(approx(lines[0].runs[0].rect.x, 38.0));
    assert!(approx(lines[1].runs[0].rect.x, 62.0));

    // The distance back from the end of line 1 to the start of line 2.
    let take_back = lines[0].take_back.unwrap();
    assert!(approx(take_back, 48.0), "take-back was {take_back}");
}

#[test]
fn test_centered_line_is_shifted_by_half_the_slack() {
    let doc = make_document(120.0, 200.0, vec![make_aligned_text("abcd", HorizontalAlign::Center)]);
    let laid = layout(&doc);
    let line = laid.pages[0].lines()[0];
    assert!(approx(line.runs[0].rect.x, 10.0 + 38.0));
}

// ─── Columns ────────────────────────────────────────────────────

#[test]
fn test_content_flows_into_the_next_column() {
    let columns = make_styled_view(
        Style {
            column_count: Some(2),
            column_gap: Some(20.0),
            height: Some(Dimension::Pt(120.0)),
            ..Default::default()
        },
        vec![make_text(&numbered_lines("line", 15))],
    );
    let doc = make_document(220.0, 300.0, vec![columns]);
    let laid = layout(&doc);
    assert_eq!(laid.pages.len(), 1);

    let lines = laid.pages[0].lines();
    assert_eq!(lines.len(), 15);
    assert!(approx(lines[0].rect.x, 10.0));
    assert!(approx(lines[0].rect.width, 90.0));
    let tenth = lines.iter().find(|l| line_text(l) == "line 10").unwrap();
    assert!(approx(tenth.rect.x, 120.0));
    assert!(approx(tenth.rect.y, 10.0));
}

#[test]
fn test_fixed_height_block_truncates_its_own_content() {
    let boxed = make_styled_view(
        Style {
            height: Some(Dimension::Pt(24.0)),
            ..Default::default()
        },
        vec![make_text("one\ntwo\nthree")],
    );
    let doc = make_document(220.0, 300.0, vec![boxed, make_text("after")]);
    let laid = layout(&doc);
    assert!(!laid.halted);
    let text = laid.pages[0].text();
    assert!(text.contains("two"));
    assert!(!text.contains("three"));
    assert!(text.contains("after"));
}

// ─── Lists ──────────────────────────────────────────────────────

#[test]
fn test_list_items_are_numbered() {
    let list = Node::list(
        Style {
            list_style: Some(ListStyle::LowerRoman),
            ..Default::default()
        },
        ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|t| Node::list_item(Style::default(), vec![make_text(t)]))
            .collect(),
    );
    let doc = make_document(220.0, 300.0, vec![list]);
    let laid = layout(&doc);
    let texts: Vec<String> = laid.pages[0].lines().into_iter().map(line_text).collect();
    assert_eq!(
        texts,
        vec!["i.", "alpha", "ii.", "beta", "iii.", "gamma", "iv.", "delta"]
    );

    let lines = laid.pages[0].lines();
    // Label and content share a row; the content column starts after the inset.
    assert!(approx(lines[0].rect.y, lines[1].rect.y));
    assert!(approx(lines[1].rect.x, 40.0));
}

#[test]
fn test_nested_lists_restore_the_outer_counter() {
    let inner = Node::list(
        Style::default(),
        vec![Node::list_item(Style::default(), vec![make_text("inner")])],
    );
    let list = Node::list(
        Style::default(),
        vec![
            Node::list_item(Style::default(), vec![make_text("one"), inner]),
            Node::list_item(Style::default(), vec![make_text("two")]),
        ],
    );
    let doc = make_document(220.0, 300.0, vec![list]);
    let laid = layout(&doc);
    let texts: Vec<String> = laid.pages[0].lines().into_iter().map(line_text).collect();
    assert!(texts.contains(&"2.".to_string()), "{texts:?}");
    assert_eq!(texts.iter().filter(|t| *t == "1.").count(), 2, "{texts:?}");
}

// ─── Page chrome and artefacts ──────────────────────────────────

#[test]
fn test_header_and_footer_repeat_on_every_page() {
    let mut doc = make_document(220.0, 200.0, vec![make_text(&numbered_lines("line", 30))]);
    doc.header = Some(make_text("Header"));
    doc.footer = Some(make_text("Footer"));
    let laid = layout(&doc);
    assert!(laid.pages.len() >= 2);

    for page in &laid.pages {
        let lines = page.lines();
        assert_eq!(line_text(lines[0]), "Header");
        let last = lines.last().unwrap();
        assert_eq!(line_text(last), "Footer");
        // Content never runs into the footer.
        for line in &lines[1..lines.len() - 1] {
            assert!(line.rect.bottom() <= last.rect.y + 1e-9);
        }
    }
    let all: String = laid.pages.iter().map(|p| p.text() + "\n").collect();
    assert!(all.contains("line 29\n"));
}

#[test]
fn test_bookmark_points_at_its_first_line() {
    let titled = Node {
        bookmark: Some("Introduction".to_string()),
        ..make_text("Intro").with_id("intro")
    };
    let doc = make_document(220.0, 300.0, vec![make_text("first\n"), titled]);
    let laid = layout(&doc);
    let artefact = laid.pages[0]
        .artefacts
        .iter()
        .find(|a| a.kind == "bookmark")
        .expect("bookmark artefact");
    assert_eq!(artefact.key, "intro");
    assert_eq!(artefact.target, "Introduction");
    let rect = artefact.rect.unwrap();
    assert!(approx(rect.y, 22.0));
}

// ─── Positioned content ─────────────────────────────────────────

#[test]
fn test_absolute_content_stays_out_of_the_flow() {
    let stamp = make_styled_view(
        Style {
            position: Some(PositionMode::Absolute),
            left: Some(20.0),
            top: Some(30.0),
            ..Default::default()
        },
        vec![make_text("stamp")],
    )
    .with_id("stamp");
    let doc = make_document(220.0, 300.0, vec![stamp, make_text("body")]);
    let laid = layout(&doc);

    let stamp = laid.placements_of("stamp").next().unwrap().rect;
    assert!(approx(stamp.x, 30.0));
    assert!(approx(stamp.y, 40.0));
    let body = laid.pages[0]
        .lines()
        .into_iter()
        .find(|l| line_text(l) == "body")
        .unwrap();
    assert!(approx(body.rect.y, 10.0));
}

// ─── Conformance ────────────────────────────────────────────────

#[test]
fn test_transform_on_text_depends_on_conformance() {
    let doc = make_document(
        220.0,
        300.0,
        vec![Node::text(
            "turned",
            Style {
                transform: Some(Transform {
                    rotate: 90.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )],
    );

    let laid = quire::layout_document(&doc, &LayoutConfig::default()).unwrap();
    assert_eq!(laid.pages[0].text(), "turned");

    let err = quire::layout_document(&doc, &LayoutConfig::strict()).unwrap_err();
    match err {
        QuireError::Layout(LayoutError::Component { source, .. }) => {
            assert!(matches!(*source, LayoutError::UnsupportedTransform { kind: "Text" }));
        }
        other => panic!("Expected an unsupported transform, got {other:?}"),
    }
}

// ─── JSON ───────────────────────────────────────────────────────

#[test]
fn test_json_document_lays_out() {
    let json = r#"{
        "defaultPage": { "size": { "Custom": { "width": 220, "height": 300 } } },
        "style": { "fontFamily": "Courier", "fontSize": 10 },
        "children": [
            { "kind": { "type": "Text", "content": "Hello" }, "id": "greeting" },
            { "kind": { "type": "Break", "kind": "Page" } },
            { "kind": { "type": "Text", "content": "World" } }
        ]
    }"#;
    let laid = quire::layout_json(json, &LayoutConfig::default()).unwrap();
    assert_eq!(laid.pages.len(), 2);
    assert_eq!(laid.pages[0].text(), "Hello");

    let value = serde_json::to_value(&laid).unwrap();
    assert_eq!(value["pages"].as_array().unwrap().len(), 2);
    assert_eq!(value["halted"], false);
}

#[test]
fn test_invalid_json_reports_a_hint() {
    let err = quire::layout_json("{ \"children\": [ }", &LayoutConfig::default()).unwrap_err();
    assert!(matches!(err, QuireError::Parse { .. }));
    assert!(err.to_string().contains("Hint"));
}
