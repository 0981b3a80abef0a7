//! Round-trip properties: parse ∘ interpret ∘ parse = parse, and
//! interpretation is idempotent on normalized trees.

use orgweave_engine::{
    Buffer, NodeData, NodeKind, ParseOptions, Syntax, interpret, parse_buffer,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn parse(text: &str) -> (Buffer, Syntax, orgweave_engine::Tree) {
    let buf = Buffer::from_str(text);
    let syntax = Syntax::default();
    let tree = parse_buffer(&buf, &syntax, &ParseOptions::default());
    (buf, syntax, tree)
}

fn render(text: &str) -> String {
    let (_, syntax, tree) = parse(text);
    interpret(&tree, &syntax, tree.root())
}

#[rstest]
#[case::paragraph("Hello *world*.\n")]
#[case::blank_runs("one\n\n\ntwo\n")]
#[case::emphasis_mix("some /italic/ and _under_ and +gone+ and =verb= here\n")]
#[case::headline_tags("* TODO Task :work:\n")]
#[case::headline_planning("* TODO Task :work:\nSCHEDULED: <2024-01-02 Tue>\n")]
#[case::nested_headlines("* One\nbody\n** Two\ndeeper\n* Three\n")]
#[case::list_nested("- a\n- b\n  - c\n")]
#[case::list_checkbox("- [X] done\n- [ ] open\n")]
#[case::list_descriptive("- term :: definition\n")]
#[case::ordered_list("1. one\n2. two\n")]
#[case::table("| a | b |\n|-\n| c | d |\n")]
#[case::table_formula("| a |\n#+TBLFM: $1=2\n")]
#[case::src_block("#+BEGIN_SRC rust -n\nfn main() {}\n#+END_SRC\n")]
#[case::quote_block("#+BEGIN_QUOTE\nQuoted *text*.\n#+END_QUOTE\n")]
#[case::verse_block("#+BEGIN_VERSE\nline one\nline two\n#+END_VERSE\n")]
#[case::dynamic_block("#+BEGIN: clocktable :scope file\nrows\n#+END:\n")]
#[case::drawer(":LOGBOOK:\nnote text\n:END:\n")]
#[case::property_drawer(":PROPERTIES:\n:ID: abc\n:END:\n")]
#[case::keyword("#+AUTHOR: somebody\n")]
#[case::affiliated("#+NAME: tbl\n#+CAPTION: cap\n| a |\n")]
#[case::fixed_width(": one\n: two\n")]
#[case::comment("# remark\n")]
#[case::rule("-----\n")]
#[case::diary("%%(diary-date 1 2 2024)\n")]
#[case::latex_env("\\begin{align}\nx = 1\n\\end{align}\n")]
#[case::footnote_def("[fn:1] The note.\n")]
#[case::footnote_ref("See[fn:1] for more.\n")]
#[case::timestamp_para("Meet at <2024-01-02 Tue 10:00>.\n")]
#[case::entity("Greek \\alpha{} letter\n")]
#[case::scripts("x_2 and y^{2n}\n")]
#[case::links("See [[https://e.org][the site]] or <mailto:a@b.c>.\n")]
#[case::cookie_title("* Tasks [1/2]\n")]
#[case::macro_call("{{{title}}}\n")]
#[case::babel_call("#+CALL: table(x=1)\n")]
#[case::clock("CLOCK: [2024-01-02 Tue 09:00]\n")]
#[case::inline_task_text("some src_rust{1 + 1} inline\n")]
#[case::unclosed_block("#+BEGIN_SRC\nfoo\n")]
fn bit_exact_roundtrip(#[case] text: &str) {
    assert_eq!(render(text), text);
}

#[rstest]
#[case::lowercase_block("#+begin_src rust\nx\n#+end_src\n")]
#[case::over_indented_item("- a\n   - b\n")]
#[case::sloppy_tags("* Task    :work:\n")]
fn structural_roundtrip_normalizes(#[case] text: &str) {
    // parse(interpret(T)) is structurally equal to T even when the
    // canonical rendering differs from the original text.
    let (_, syntax, tree) = parse(text);
    let rendered = interpret(&tree, &syntax, tree.root());
    let (_, _, reparsed) = parse(&rendered);
    assert_eq!(
        reparsed.sexp(reparsed.root()),
        tree.sexp(tree.root()),
        "for input {text:?} rendered as {rendered:?}"
    );
    // Idempotence: a second round adds nothing.
    let again = interpret(&reparsed, &syntax, reparsed.root());
    assert_eq!(again, rendered);
}

#[test]
fn s1_paragraph_tree_shape() {
    let (_, _, tree) = parse("Hello *world*.\n");
    let root = tree.root();
    let section = tree[root].children[0];
    let para = tree[section].children[0];
    assert_eq!(tree[para].kind(), NodeKind::Paragraph);
    let kinds: Vec<NodeKind> = tree[para].children.iter().map(|c| tree[*c].kind()).collect();
    assert_eq!(
        kinds,
        vec![NodeKind::PlainText, NodeKind::Bold, NodeKind::PlainText]
    );
    let NodeData::PlainText { value } = &tree[tree[para].children[0]].data else { panic!() };
    assert_eq!(value, "Hello ");
    let NodeData::PlainText { value } = &tree[tree[para].children[2]].data else { panic!() };
    assert_eq!(value, ".");
}

#[test]
fn s2_unclosed_block_is_one_paragraph() {
    let (buf, _, tree) = parse("#+BEGIN_SRC\nfoo\n");
    let root = tree.root();
    let section = tree[root].children[0];
    assert_eq!(tree[section].children.len(), 1);
    let para = tree[section].children[0];
    assert_eq!(tree[para].kind(), NodeKind::Paragraph);
    assert_eq!(tree[para].begin, 0);
    assert_eq!(tree[para].end, buf.len());
}

#[test]
fn s4_headline_properties_and_rendering() {
    let text = "* TODO Task :work:\nSCHEDULED: <2024-01-02 Tue>\n";
    let (_, syntax, tree) = parse(text);
    let head = tree[tree.root()].children[0];
    let NodeData::Headline(h) = &tree[head].data else { panic!() };
    assert_eq!(h.todo_keyword.as_deref(), Some("TODO"));
    assert_eq!(h.tags, vec!["work"]);
    let ts = h.scheduled.as_ref().unwrap();
    let date = ts.date_start.as_ref().unwrap();
    assert_eq!((date.year, date.month, date.day), (2024, 1, 2));

    let rendered = interpret(&tree, &syntax, tree.root());
    assert!(rendered.contains(" :work:"), "{rendered:?}");
}

#[test]
fn bracket_disambiguation_order() {
    // Link first, then timestamp, then statistics cookie.
    let (_, _, tree) = parse("[[x]] [2024-01-02 Tue] [1/2]\n");
    let para = tree[tree[tree.root()].children[0]].children[0];
    let kinds: Vec<NodeKind> = tree[para]
        .children
        .iter()
        .map(|c| tree[*c].kind())
        .filter(|k| *k != NodeKind::PlainText)
        .collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Link, NodeKind::Timestamp, NodeKind::StatisticsCookie]
    );
}

#[test]
fn tabs_expand_in_plain_text_not_values() {
    let (_, _, tree) = parse("a\tb =c\td=\n");
    let para = tree[tree[tree.root()].children[0]].children[0];
    let NodeData::PlainText { value } = &tree[tree[para].children[0]].data else { panic!() };
    assert_eq!(value, "a        b ");
    let NodeData::Verbatim { value } = &tree[tree[para].children[1]].data else { panic!() };
    assert_eq!(value, "c\td");
}

#[test]
fn object_post_blank_counts_spaces_not_newline() {
    let text = "word *b*  \n";
    let (_, _, tree) = parse(text);
    let para = tree[tree[tree.root()].children[0]].children[0];
    let bold = tree[para]
        .children
        .iter()
        .copied()
        .find(|c| tree[*c].kind() == NodeKind::Bold)
        .unwrap();
    assert_eq!(tree[bold].post_blank, 2);
    assert_eq!(render(text), text);
}

#[test]
fn post_blank_preserved_across_roundtrip() {
    let text = "para one\n\n\n\npara two\n";
    let (_, _, tree) = parse(text);
    let section = tree[tree.root()].children[0];
    let first = tree[section].children[0];
    assert_eq!(tree[first].post_blank, 3);
    assert_eq!(render(text), text);
}
