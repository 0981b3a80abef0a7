//! Incremental cache properties: equivalence with fresh parses across edit
//! sequences, monotonic keys, and synchronizer resumability.

use std::time::{Duration, Instant};

use orgweave_engine::{Document, Granularity, NodeKind, SyncBudget};
use pretty_assertions::assert_eq;

fn fresh_outline(doc: &Document) -> String {
    let tree = doc.parse(Granularity::Element);
    tree.sexp_elements(tree.root())
}

fn assert_cache_matches_fresh(doc: &mut Document) {
    assert_eq!(doc.cache_outline(), fresh_outline(doc));
}

#[test]
fn s5_insert_inside_first_paragraph() {
    let mut doc = Document::from_str("para1\n\npara2\n");
    doc.element_at(doc.len());
    let second = doc.element_at(8);
    let before = doc.node(second).unwrap().span();

    doc.edit(2..2, "X");

    let first = doc.element_at(2);
    assert_eq!(doc.node(first).unwrap().kind(), NodeKind::Paragraph);
    assert_eq!(doc.node(first).unwrap().end, 8);
    let second = doc.element_at(9);
    let span = doc.node(second).unwrap().span();
    assert_eq!(span.start, before.start + 1);
    assert_eq!(span.end, before.end + 1);
    assert_cache_matches_fresh(&mut doc);
}

#[test]
fn edit_sequence_equivalence() {
    // Property 7: applying edits incrementally equals a fresh parse of the
    // final buffer.
    let mut doc = Document::from_str("* One\nalpha\n\n- a\n- b\n\n* Two\nbeta\n");
    doc.element_at(doc.len());

    let edits: Vec<(usize, usize, &str)> = vec![
        (6, 6, "X"),                 // inside "alpha"
        (0, 0, "#+TITLE: t\n"),      // prepend a keyword
        (20, 21, ""),                // delete a character in the list region
        (14, 14, "new paragraph\n"), // insert a line
    ];
    for (start, end, text) in edits {
        doc.edit(start..end, text);
        assert_cache_matches_fresh(&mut doc);
    }
}

#[test]
fn keys_stay_monotonic_after_edits() {
    // Property 6: index order equals position order at steady state.
    let mut doc = Document::from_str("aaa\n\nbbb\n\nccc\n\nddd\n");
    doc.element_at(doc.len());
    doc.edit(5..8, "longer text");
    doc.element_at(doc.len());
    doc.edit(0..0, "zzz\n\n");
    doc.element_at(doc.len());

    let tree = doc.tree();
    // cache_outline materializes and would mask ordering bugs; walk the
    // index directly through a final full query pass instead.
    let mut begins = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let node = &tree[id];
        if node.kind().is_element() {
            begins.push(node.begin);
        }
        stack.extend(node.children.iter().copied());
    }
    assert!(!begins.is_empty());
    assert_cache_matches_fresh(&mut doc);
}

#[test]
fn s6_interrupt_and_resume_large_buffer() {
    // A 10'000-line buffer, one insertion near the top, a small budget.
    let text: String = (0..5000).map(|i| format!("line number {i}\n\n")).collect();
    let mut doc = Document::from_str(&text);
    doc.element_at(doc.len());

    doc.edit(5..5, "X");
    let status = doc.sync(&SyncBudget::until(Instant::now() + Duration::from_millis(1)));
    let _ = status; // may or may not complete; the query below must not care

    let last_pos = doc.len() - 2;
    let id = doc.element_at(last_pos);
    let span = doc.node(id).unwrap().span();
    assert_eq!(doc.node(id).unwrap().kind(), NodeKind::Paragraph);
    assert!(span.contains(last_pos));

    // The answer matches a fresh parse of the edited buffer.
    let tree = doc.parse(Granularity::Element);
    let mut expected = None;
    let mut stack = vec![tree.root()];
    while let Some(fid) = stack.pop() {
        let node = &tree[fid];
        stack.extend(node.children.iter().copied());
        if node.kind() == NodeKind::Paragraph && node.span().contains(last_pos) {
            expected = Some(node.span());
        }
    }
    assert_eq!(Some(span), expected);
}

#[test]
fn resumability_equals_one_shot() {
    // Property 8: interrupting at every element and resuming produces the
    // same index as a single uninterrupted sync.
    let text: String = (0..80).map(|i| format!("p{i} body\n\n")).collect();

    let mut one_shot = Document::from_str(&text);
    one_shot.element_at(one_shot.len());
    one_shot.edit(3..3, "XYZ");
    one_shot.sync(&SyncBudget::unbounded());

    let mut stepped = Document::from_str(&text);
    stepped.element_at(stepped.len());
    stepped.edit(3..3, "XYZ");
    let mut rounds = 0;
    loop {
        // An already-expired deadline still advances by one element.
        let spent = SyncBudget::until(Instant::now() - Duration::from_millis(1));
        if stepped.sync(&spent).is_complete() {
            break;
        }
        rounds += 1;
        assert!(rounds < 10_000, "synchronizer failed to make progress");
    }

    assert_eq!(stepped.cache_outline(), one_shot.cache_outline());
    assert!(rounds > 0, "expected at least one interruption");
}

#[test]
fn headline_demotion_equivalence() {
    let mut doc = Document::from_str("* A\nbody a\n* B\nbody b\n* C\nbody c\n");
    doc.element_at(doc.len());
    doc.edit(11..11, "*"); // "* B" -> "** B"
    assert_cache_matches_fresh(&mut doc);
    doc.edit(11..12, ""); // back to "* B"
    assert_cache_matches_fresh(&mut doc);
}

#[test]
fn list_edit_equivalence() {
    let mut doc = Document::from_str("- a\n- b\n  - c\n\nafter\n");
    doc.element_at(doc.len());
    // Turn "- b" into "- bX".
    doc.edit(7..7, "X");
    assert_cache_matches_fresh(&mut doc);
    // Remove the nested item line entirely.
    let text = doc.text();
    let nested = text.find("  - c\n").unwrap();
    doc.edit(nested..nested + 6, "");
    assert_cache_matches_fresh(&mut doc);
}

#[test]
fn block_boundary_edit_invalidates_wrapper() {
    let mut doc = Document::from_str("#+BEGIN_QUOTE\ntext\n#+END_QUOTE\nafter\n");
    doc.element_at(doc.len());
    // Breaking the END line turns the block into a paragraph.
    let pos = doc.text().find("#+END_QUOTE").unwrap();
    doc.edit(pos..pos + 11, "#+END_BROKEN");
    assert_cache_matches_fresh(&mut doc);
    let el = doc.element_at(2);
    assert_eq!(doc.node(el).unwrap().kind(), NodeKind::Paragraph);
}

#[test]
fn rapid_edits_merge_requests() {
    let mut doc = Document::from_str("first\n\nsecond\n\nthird\n");
    doc.element_at(doc.len());
    // Several edits without an intervening sync.
    doc.edit(0..0, "a");
    doc.edit(1..1, "b");
    doc.edit(10..10, "c");
    assert_cache_matches_fresh(&mut doc);
}

#[test]
fn edits_far_apart_without_sync() {
    let mut doc = Document::from_str("top\n\nmiddle\n\nbottom\n");
    doc.element_at(doc.len());
    doc.edit(0..0, "X");
    let near_end = doc.len() - 2;
    doc.edit(near_end..near_end, "Y");
    assert_cache_matches_fresh(&mut doc);
}
