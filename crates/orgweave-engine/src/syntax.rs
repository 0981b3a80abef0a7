//! Syntactic fixtures of the markup.
//!
//! Fixed delimiters are precompiled [`LazyLock`] regexes; everything the
//! host may configure (todo keywords, link schemes, tag alignment...) lives
//! in [`Syntax`], which compiles its derived regexes once at construction.
//! Recognizers match these against single lines unless noted otherwise.

use std::sync::LazyLock;

use regex::Regex;

macro_rules! line_re {
    ($name:ident, $pat:expr) => {
        pub(crate) static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pat).unwrap());
    };
}

line_re!(STARS_RE, r"^(\*+)[ \t]");
line_re!(COMMENT_RE, r"^[ \t]*#(?: |$)");
line_re!(BLOCK_BEGIN_RE, r"(?i)^[ \t]*#\+BEGIN_(\S+)(?:[ \t]+(.*))?[ \t]*$");
line_re!(DYN_BLOCK_BEGIN_RE, r"(?i)^[ \t]*#\+BEGIN:(?:[ \t]+(\S+)(?:[ \t]+(.*))?)?[ \t]*$");
line_re!(BABEL_CALL_RE, r"(?i)^[ \t]*#\+CALL:[ \t]*(.*?)[ \t]*$");
line_re!(KEYWORD_RE, r"^[ \t]*#\+(\S+?):(?:[ \t]+(.*?))?[ \t]*$");
line_re!(DRAWER_RE, r"^[ \t]*:([A-Za-z0-9_-]+):[ \t]*$");
line_re!(DRAWER_END_RE, r"(?i)^[ \t]*:END:[ \t]*$");
line_re!(NODE_PROPERTY_RE, r"^[ \t]*:([^\s:]+?)(\+)?:(?:[ \t]+(.*?))?[ \t]*$");
line_re!(FIXED_WIDTH_RE, r"^[ \t]*:(?: |$)");
line_re!(HORIZONTAL_RULE_RE, r"^[ \t]*-{5,}[ \t]*$");
line_re!(DIARY_SEXP_RE, r"^%%\(");
line_re!(TABLE_ORG_RE, r"^[ \t]*\|");
line_re!(TABLE_EL_RE, r"^[ \t]*\+-");
line_re!(TABLE_RULE_RE, r"^[ \t]*\|-");
line_re!(TBLFM_RE, r"(?i)^[ \t]*#\+TBLFM:[ \t]*(.*?)[ \t]*$");
line_re!(LATEX_ENV_BEGIN_RE, r"^[ \t]*\\begin\{([A-Za-z0-9*]+)\}");
line_re!(FOOTNOTE_DEF_RE, r"^\[fn:([-_A-Za-z0-9]+)\][ \t]*");
line_re!(ITEM_BULLET_RE, r"^([ \t]*)(\*|-|\+|[0-9]+[.)])(?:[ \t]|$)");
line_re!(CLOCK_LINE_RE, r"^[ \t]*CLOCK:");

/// Coarse object-candidate template; the per-`Syntax` scanner appends the
/// plain-link alternative built from the configured schemes.
const OBJECT_CANDIDATE_TEMPLATE: &str = r"(?x)
      [*/+~=]\S             # emphasis markers followed by a non-marker
    | _\S                   # underline or subscript
    | \^(?:\{|[[:alnum:]])  # superscript
    | \[(?:\[|fn:|[0-9])    # bracket link, footnote reference, timestamp, cookie
    | @@                    # export snippet
    | \{\{\{                # macro
    | <                     # angle link, (radio) target, timestamp
    | \$                    # latex fragment
    | \\                    # entity, latex fragment, line break
    | \b(?:call|src)_       # inline babel call / inline src block
";

/// Host-configurable pieces of the grammar.
#[derive(Debug, Clone)]
pub struct SyntaxOptions {
    /// Keywords marking an open task, e.g. `TODO`.
    pub todo_keywords: Vec<String>,
    /// Keywords marking a finished task, e.g. `DONE`.
    pub done_keywords: Vec<String>,
    /// Tag marking an archived subtree.
    pub archive_tag: String,
    /// Title of the dedicated footnotes headline.
    pub footnote_section: String,
    /// Tag alignment: 0 for a single space, negative right-aligns at the
    /// column counted from the end, positive left-aligns at the column.
    pub tags_column: i32,
    /// Spaces per TAB when expanding plain text.
    pub tab_width: usize,
    /// Headlines at this star count or deeper parse as inline tasks.
    pub inlinetask_min_level: usize,
    /// Recognized link schemes for plain and angle links.
    pub link_schemes: Vec<String>,
}

impl Default for SyntaxOptions {
    fn default() -> Self {
        SyntaxOptions {
            todo_keywords: vec!["TODO".to_owned()],
            done_keywords: vec!["DONE".to_owned()],
            archive_tag: "ARCHIVE".to_owned(),
            footnote_section: "Footnotes".to_owned(),
            tags_column: 0,
            tab_width: 8,
            inlinetask_min_level: 15,
            link_schemes: ["https", "http", "file", "mailto", "ftp", "news", "irc", "doi"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

/// Compiled grammar configuration shared by every parse entry point.
#[derive(Debug, Clone)]
pub struct Syntax {
    opts: SyntaxOptions,
    todo_re: Regex,
    planning_line_re: Regex,
    plain_link_re: Regex,
    object_candidate_re: Regex,
}

impl Syntax {
    pub const SCHEDULED: &'static str = "SCHEDULED:";
    pub const DEADLINE: &'static str = "DEADLINE:";
    pub const CLOSED: &'static str = "CLOSED:";
    pub const CLOCK: &'static str = "CLOCK:";

    pub fn new(opts: SyntaxOptions) -> Self {
        let mut keywords: Vec<&str> = opts
            .todo_keywords
            .iter()
            .chain(opts.done_keywords.iter())
            .map(String::as_str)
            .collect();
        // Longest first so TODO does not shadow TODOLATER.
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let todo_alt = if keywords.is_empty() {
            // A pattern that cannot match, so the branch is simply dead.
            "[^\\s\\S]".to_owned()
        } else {
            keywords.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|")
        };
        let todo_re = Regex::new(&format!("^({todo_alt})(?:[ \t]|$)")).unwrap();

        let planning_line_re = Regex::new(&format!(
            "^[ \t]*(?:{}|{}|{})",
            regex::escape(Self::SCHEDULED),
            regex::escape(Self::DEADLINE),
            regex::escape(Self::CLOSED),
        ))
        .unwrap();

        let scheme_alt = opts
            .link_schemes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let plain_link_re =
            Regex::new(&format!(r"\b(?:{scheme_alt}):[^ \t\n<>\[\]()]+[^ \t\n<>\[\]().,;!?']"))
                .unwrap();
        let object_candidate_re = Regex::new(&format!(
            "{OBJECT_CANDIDATE_TEMPLATE}    | \\b(?:{scheme_alt}):",
        ))
        .unwrap();

        Syntax { opts, todo_re, planning_line_re, plain_link_re, object_candidate_re }
    }

    pub fn options(&self) -> &SyntaxOptions {
        &self.opts
    }

    pub fn tab_width(&self) -> usize {
        self.opts.tab_width
    }

    pub fn tags_column(&self) -> i32 {
        self.opts.tags_column
    }

    pub fn archive_tag(&self) -> &str {
        &self.opts.archive_tag
    }

    pub fn footnote_section(&self) -> &str {
        &self.opts.footnote_section
    }

    pub fn inlinetask_min_level(&self) -> usize {
        self.opts.inlinetask_min_level
    }

    /// Whether a star count parses as a regular headline (vs an inlinetask).
    pub fn headline_level_ok(&self, stars: usize) -> bool {
        stars < self.opts.inlinetask_min_level
    }

    pub fn is_done_keyword(&self, kw: &str) -> bool {
        self.opts.done_keywords.iter().any(|k| k == kw)
    }

    /// Matches a todo keyword at the start of the remaining title text.
    pub(crate) fn todo_re(&self) -> &Regex {
        &self.todo_re
    }

    /// Matches a planning line (`SCHEDULED:` / `DEADLINE:` / `CLOSED:`).
    pub(crate) fn planning_line_re(&self) -> &Regex {
        &self.planning_line_re
    }

    pub(crate) fn plain_link_re(&self) -> &Regex {
        &self.plain_link_re
    }

    pub(crate) fn object_candidate_re(&self) -> &Regex {
        &self.object_candidate_re
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Syntax::new(SyntaxOptions::default())
    }
}

/// Star count of a heading line, if `line` is one.
pub(crate) fn heading_stars(line: &str) -> Option<usize> {
    STARS_RE.captures(line).map(|c| c[1].len())
}
