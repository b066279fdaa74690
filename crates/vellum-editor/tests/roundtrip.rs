//! Markdown round-trip coverage: for every built-in node and mark type,
//! parsing the serialized form reproduces the tree, and canonical markdown
//! survives a parse/serialize cycle unchanged.

use std::rc::Rc;

use smol_str::SmolStr;
use vellum_editor::extensions::built_ins;
use vellum_editor::manager::ExtensionManager;
use vellum_editor::markdown::{MarkdownParser, MarkdownSerializer};
use vellum_editor::options::EmbedDescriptor;

fn codec() -> (MarkdownParser, MarkdownSerializer) {
    let manager = ExtensionManager::new(built_ins(false));
    let schema = manager.schema().unwrap();
    let embeds = vec![EmbedDescriptor {
        name: SmolStr::new("test"),
        matcher: Rc::new(|url: &str| url.starts_with("https://embed.test/")),
        component: SmolStr::new("TestEmbed"),
    }];
    manager.codec(&schema, embeds).unwrap()
}

fn assert_canonical(source: &str) {
    let (parser, serializer) = codec();
    let doc = parser.parse(source).unwrap();
    let serialized = serializer.serialize(&doc);
    assert_eq!(serialized, source, "canonical form changed");
    let reparsed = parser.parse(&serialized).unwrap();
    assert_eq!(reparsed, doc, "tree changed across round trip");
}

#[test]
fn test_paragraph() {
    assert_canonical("hello world");
    assert_canonical("first paragraph\n\nsecond paragraph");
}

#[test]
fn test_headings() {
    assert_canonical("# One");
    assert_canonical("## Two\n\ncontent");
    assert_canonical("###### Six");
}

#[test]
fn test_blockquote() {
    assert_canonical("> quoted");
    assert_canonical("> first\n>\n> second");
}

#[test]
fn test_code_block() {
    assert_canonical("```\nplain code\n```");
    assert_canonical("```rust\nfn main() {}\n```");
    assert_canonical("```\nmulti\nline\n```");
}

#[test]
fn test_bullet_list() {
    assert_canonical("- one\n- two");
    assert_canonical("- outer\n  - inner");
}

#[test]
fn test_ordered_list() {
    assert_canonical("1. first\n2. second");
    assert_canonical("3. third\n4. fourth");
}

#[test]
fn test_checkbox_list() {
    assert_canonical("- [ ] open\n- [x] done");
}

#[test]
fn test_marks() {
    assert_canonical("**bold** and *italic* and ~~struck~~");
    assert_canonical("`inline code`");
    assert_canonical("some `a\\*b` code");
    assert_canonical("[label](https://example.com)");
    assert_canonical("[titled](https://example.com \"a title\")");
}

#[test]
fn test_horizontal_rule() {
    assert_canonical("---");
    assert_canonical("above\n\n---\n\nbelow");
}

#[test]
fn test_hard_break() {
    assert_canonical("line one\\\nline two");
}

#[test]
fn test_image() {
    assert_canonical("![alt text](https://img.test/a.png)");
    assert_canonical("![alt](https://img.test/a.png \"a caption\")");
    assert_canonical("![alt](https://img.test/a.png \"full-width\")");
}

#[test]
fn test_image_layout_becomes_attr() {
    let (parser, _) = codec();
    let doc = parser
        .parse("![x](https://img.test/a.png \"right-50\")")
        .unwrap();
    let mut layout = None;
    doc.descendants(&mut |_, node| {
        if node.type_name == "image" {
            layout = node
                .attrs
                .get("layout_class")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
    });
    assert_eq!(layout.as_deref(), Some("right-50"));
}

#[test]
fn test_embed() {
    assert_canonical("[https://embed.test/x](https://embed.test/x)");

    let (parser, _) = codec();
    let doc = parser
        .parse("[https://embed.test/x](https://embed.test/x)")
        .unwrap();
    assert_eq!(doc.child(0).unwrap().type_name, "embed");

    // non-matching URLs stay ordinary links
    let doc = parser
        .parse("[https://plain.test/x](https://plain.test/x)")
        .unwrap();
    assert_eq!(doc.child(0).unwrap().type_name, "paragraph");
}

#[test]
fn test_attribute_escaping_survives() {
    // brackets in alt text
    assert_canonical("![a\\]b](https://img.test/i.png)");
    // quotes in the title slot
    assert_canonical("![x](https://img.test/i.png \"he said \\\"hi\\\"\")");
    assert_canonical("[titled](https://example.com \"say \\\"hi\\\"\")");
    // parens in destinations
    assert_canonical("[label](https://a.test/\\(1\\))");
    // whitespace in destinations takes the pointy-bracket form
    assert_canonical("![x](<https://img.test/a b.png>)");
}

#[test]
fn test_image_alt_with_bracket_reparses_as_image() {
    let (parser, serializer) = codec();
    let doc = parser.parse("![a\\]b](https://img.test/i.png)").unwrap();
    let reparsed = parser.parse(&serializer.serialize(&doc)).unwrap();
    assert_eq!(reparsed, doc);
    let mut alt = None;
    reparsed.descendants(&mut |_, node| {
        if node.type_name == "image" {
            alt = node
                .attrs
                .get("alt")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
    });
    assert_eq!(alt.as_deref(), Some("a]b"));
}

#[test]
fn test_escaping_survives() {
    let (parser, serializer) = codec();
    let doc = parser.parse("\\*not em\\* and \\# not heading").unwrap();
    assert_eq!(doc.text_content(), "*not em* and # not heading");
    let reparsed = parser.parse(&serializer.serialize(&doc)).unwrap();
    assert_eq!(reparsed, doc);
}

#[test]
fn test_mixed_document() {
    assert_canonical(
        "# Title\n\nintro with **bold**\n\n> a quote\n\n- [ ] task\n- [x] finished\n\n```sh\nls\n```",
    );
}
