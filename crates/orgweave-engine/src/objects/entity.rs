//! Entity and LaTeX-fragment recognizers, both rooted at `\` (fragments
//! also at `$`).

use crate::ast::{Entity, Node, NodeData};

/// Curated subset of the standard entity table: name, UTF-8 replacement.
const ENTITIES: &[(&str, &str)] = &[
    ("AElig", "Æ"),
    ("Agrave", "À"),
    ("Aring", "Å"),
    ("Delta", "Δ"),
    ("Gamma", "Γ"),
    ("Lambda", "Λ"),
    ("Omega", "Ω"),
    ("Phi", "Φ"),
    ("Pi", "Π"),
    ("Psi", "Ψ"),
    ("Sigma", "Σ"),
    ("Theta", "Θ"),
    ("Xi", "Ξ"),
    ("aelig", "æ"),
    ("agrave", "à"),
    ("alpha", "α"),
    ("amp", "&"),
    ("aring", "å"),
    ("ast", "*"),
    ("beta", "β"),
    ("bull", "•"),
    ("cent", "¢"),
    ("chi", "χ"),
    ("copy", "©"),
    ("dagger", "†"),
    ("darr", "↓"),
    ("deg", "°"),
    ("delta", "δ"),
    ("dollar", "$"),
    ("eacute", "é"),
    ("egrave", "è"),
    ("epsilon", "ε"),
    ("equiv", "≡"),
    ("eta", "η"),
    ("euro", "€"),
    ("exists", "∃"),
    ("forall", "∀"),
    ("frac12", "½"),
    ("frac14", "¼"),
    ("gamma", "γ"),
    ("ge", "≥"),
    ("gt", ">"),
    ("harr", "↔"),
    ("hellip", "…"),
    ("infin", "∞"),
    ("int", "∫"),
    ("iota", "ι"),
    ("kappa", "κ"),
    ("lambda", "λ"),
    ("laquo", "«"),
    ("larr", "←"),
    ("le", "≤"),
    ("lt", "<"),
    ("mdash", "—"),
    ("middot", "·"),
    ("mu", "μ"),
    ("nabla", "∇"),
    ("nbsp", "\u{a0}"),
    ("ndash", "–"),
    ("ne", "≠"),
    ("ni", "∋"),
    ("nu", "ν"),
    ("omega", "ω"),
    ("oplus", "⊕"),
    ("otimes", "⊗"),
    ("para", "¶"),
    ("partial", "∂"),
    ("phi", "φ"),
    ("pi", "π"),
    ("plusmn", "±"),
    ("pound", "£"),
    ("prod", "∏"),
    ("psi", "ψ"),
    ("radic", "√"),
    ("raquo", "»"),
    ("rarr", "→"),
    ("real", "ℜ"),
    ("rho", "ρ"),
    ("sect", "§"),
    ("sigma", "σ"),
    ("sim", "∼"),
    ("sum", "∑"),
    ("sup1", "¹"),
    ("sup2", "²"),
    ("sup3", "³"),
    ("tau", "τ"),
    ("theta", "θ"),
    ("times", "×"),
    ("trade", "™"),
    ("uarr", "↑"),
    ("upsilon", "υ"),
    ("xi", "ξ"),
    ("yen", "¥"),
    ("zeta", "ζ"),
];

pub(crate) fn lookup_entity(name: &str) -> Option<&'static str> {
    ENTITIES
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| ENTITIES[i].1)
}

/// `\name` or `\name{}`, with `name` in the entity table and a
/// non-alphabetic terminator.
pub(crate) fn entity(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    if !rest.starts_with('\\') {
        return None;
    }
    let name_len = rest[1..]
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[1..1 + name_len];
    let utf8 = lookup_entity(name)?;
    let mut end = 1 + name_len;
    let use_brackets = rest[end..].starts_with("{}");
    if use_brackets {
        end += 2;
    } else if rest[end..].starts_with('{') {
        // `\name{text}` is a latex fragment, not an entity.
        return None;
    }
    let data = NodeData::Entity(Entity {
        name: name.to_owned(),
        utf8: utf8.to_owned(),
        use_brackets,
    });
    Some(Node::new(data, base + pos, base + pos + end))
}

/// `$...$`, `$$...$$`, `\(...\)`, `\[...\]` or `\command[opt]{arg}`.
pub(crate) fn latex_fragment(s: &str, pos: usize, base: usize) -> Option<Node> {
    let rest = &s[pos..];
    let len = if rest.starts_with("$$") {
        rest[2..].find("$$").map(|i| 2 + i + 2)?
    } else if rest.starts_with('$') {
        // Inline math: no blank borders, closed on the same line.
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let inner = &rest[1..line_end];
        let close = inner.find('$')?;
        if close == 0 {
            return None;
        }
        let body = &inner[..close];
        if body.starts_with(char::is_whitespace) || body.ends_with(char::is_whitespace) {
            return None;
        }
        // The character after the closing dollar must not start a word.
        if let Some(after) = rest[1 + close + 1..].chars().next()
            && after.is_alphanumeric()
        {
            return None;
        }
        1 + close + 1
    } else if rest.starts_with("\\(") {
        rest[2..].find("\\)").map(|i| 2 + i + 2)?
    } else if rest.starts_with("\\[") {
        rest[2..].find("\\]").map(|i| 2 + i + 2)?
    } else if rest.starts_with('\\') {
        // `\command` with optional bracket and brace groups.
        let name_len = rest[1..]
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if name_len == 0 {
            return None;
        }
        let mut end = 1 + name_len;
        for (open, close) in [('[', ']'), ('{', '}')] {
            while rest[end..].starts_with(open) {
                match rest[end..].find(close) {
                    Some(i) if !rest[end..end + i].contains('\n') => end += i + 1,
                    _ => break,
                }
            }
        }
        end
    } else {
        return None;
    };
    let value = s[pos..pos + len].to_owned();
    Some(Node::new(NodeData::LatexFragment { value }, base + pos, base + pos + len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    #[test]
    fn entity_table_is_sorted() {
        for pair in ENTITIES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn known_entity() {
        let node = entity(r"\alpha rest", 0, 100).unwrap();
        assert_eq!(node.begin, 100);
        assert_eq!(node.end, 106);
        let NodeData::Entity(e) = &node.data else { panic!() };
        assert_eq!(e.name, "alpha");
        assert_eq!(e.utf8, "α");
        assert!(!e.use_brackets);
    }

    #[test]
    fn entity_with_brackets() {
        let node = entity(r"\pi{}x", 0, 0).unwrap();
        assert_eq!(node.end, 5);
        let NodeData::Entity(e) = &node.data else { panic!() };
        assert!(e.use_brackets);
    }

    #[test]
    fn unknown_name_declines() {
        assert!(entity(r"\notanentity", 0, 0).is_none());
    }

    #[test]
    fn braced_command_is_fragment_not_entity() {
        assert!(entity(r"\alpha{x}", 0, 0).is_none());
        let node = latex_fragment(r"\alpha{x}", 0, 0).unwrap();
        assert_eq!(node.kind(), NodeKind::LatexFragment);
        assert_eq!(node.end, 9);
    }

    #[test]
    fn dollar_math() {
        let node = latex_fragment("$x+y$ rest", 0, 0).unwrap();
        let NodeData::LatexFragment { value } = &node.data else { panic!() };
        assert_eq!(value, "$x+y$");
    }

    #[test]
    fn dollar_rejects_whitespace_borders() {
        assert!(latex_fragment("$ x$", 0, 0).is_none());
        assert!(latex_fragment("$x $", 0, 0).is_none());
        assert!(latex_fragment("$x$y", 0, 0).is_none());
    }

    #[test]
    fn display_math() {
        let node = latex_fragment("$$a=b$$", 0, 0).unwrap();
        assert_eq!(node.end, 7);
    }

    #[test]
    fn paren_and_bracket_forms() {
        assert_eq!(latex_fragment(r"\(a\) t", 0, 0).unwrap().end, 5);
        assert_eq!(latex_fragment(r"\[a\] t", 0, 0).unwrap().end, 5);
    }
}
