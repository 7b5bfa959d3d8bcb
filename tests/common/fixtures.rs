//! Deterministic synthetic documents for integration tests and benches.

use pageflow::{parse_markup, DocumentNode};

const VOCABULARY: &[&str] = &[
    "the", "ledger", "records", "each", "shipment", "before", "noon", "and", "clerks", "verify",
    "totals", "against", "manifest", "copies", "while", "auditors", "sample", "random", "entries",
    "from", "previous", "quarters", "to", "confirm", "that", "balances", "carry", "forward",
    "correctly", "across", "all", "regional", "offices", "without", "exception",
];

/// Shape of a generated document.
#[derive(Clone, Copy, Debug)]
pub struct DocShape {
    pub seed: u64,
    pub blocks: usize,
    pub sections: bool,
    pub columns: bool,
    pub page_breaks: bool,
    pub stacked_headings: bool,
    pub nested_columns: bool,
}

impl DocShape {
    pub const fn prose(seed: u64, blocks: usize) -> Self {
        Self {
            seed,
            blocks,
            sections: false,
            columns: false,
            page_breaks: false,
            stacked_headings: false,
            nested_columns: false,
        }
    }

    pub const fn mixed(seed: u64, blocks: usize) -> Self {
        Self {
            seed,
            blocks,
            sections: true,
            columns: true,
            page_breaks: true,
            stacked_headings: false,
            nested_columns: false,
        }
    }

    /// Headings stacked on headings, and column containers nested in
    /// wrappers and used as section fields.
    pub const fn structured(seed: u64, blocks: usize) -> Self {
        Self {
            seed,
            blocks,
            sections: true,
            columns: true,
            page_breaks: false,
            stacked_headings: true,
            nested_columns: true,
        }
    }
}

/// Named shapes exercised by the round-trip and budget suites.
pub const STANDARD_SHAPES: &[(&str, DocShape)] = &[
    ("prose-short", DocShape::prose(7, 12)),
    ("prose-long", DocShape::prose(11, 160)),
    ("mixed-small", DocShape::mixed(3, 30)),
    ("mixed-large", DocShape::mixed(42, 120)),
    ("structured", DocShape::structured(19, 80)),
];

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n.max(1)
    }
}

fn sentence(rng: &mut Lcg, words: usize, inline_markup: bool) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < words {
        if i > 0 {
            out.push(' ');
        }
        if inline_markup && words - i > 3 && rng.below(9) == 0 {
            let tag = if rng.below(2) == 0 { "b" } else { "i" };
            out.push('<');
            out.push_str(tag);
            out.push('>');
            for j in 0..2 {
                if j > 0 {
                    out.push(' ');
                }
                out.push_str(VOCABULARY[rng.below(VOCABULARY.len() as u64) as usize]);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
            i += 2;
            continue;
        }
        out.push_str(VOCABULARY[rng.below(VOCABULARY.len() as u64) as usize]);
        i += 1;
    }
    out.push('.');
    out
}

fn paragraph(rng: &mut Lcg, min: usize, spread: u64) -> String {
    let words = min + rng.below(spread) as usize;
    format!("<p>{}</p>", sentence(rng, words, true))
}

fn column_container(rng: &mut Lcg) -> String {
    let mut out = String::from("<div class=\"column-container\">");
    for _ in 0..2 {
        out.push_str("<div>");
        out.push_str(&paragraph(rng, 8, 20));
        out.push_str("</div>");
    }
    out.push_str("</div>");
    out
}

/// Markup for a shape.
///
/// Heading runs are always followed by a paragraph in the same break section,
/// and page breaks only appear at top level between blocks.
pub fn generated_markup(shape: DocShape) -> String {
    let mut rng = Lcg(shape.seed);
    let mut out = String::new();
    for block in 0..shape.blocks {
        let last = block + 1 == shape.blocks;
        match rng.below(10) {
            0 | 1 => {
                out.push_str(&format!("<h2>{}</h2>", sentence(&mut rng, 3, false)));
                out.push_str(&paragraph(&mut rng, 20, 60));
            }
            2 if shape.sections => {
                out.push_str("<div class=\"section\">");
                out.push_str(&format!("<h3>{}</h3>", sentence(&mut rng, 2, false)));
                for _ in 0..2 + rng.below(3) {
                    out.push_str(&paragraph(&mut rng, 10, 40));
                }
                out.push_str("</div>");
            }
            3 if shape.columns => out.push_str(&column_container(&mut rng)),
            4 if shape.page_breaks && block > 0 && !last => {
                out.push_str("<div class=\"page-break\"></div>");
            }
            5 if shape.stacked_headings => {
                out.push_str(&format!("<h3>{}</h3>", sentence(&mut rng, 2, false)));
                out.push_str(&format!("<h4>{}</h4>", sentence(&mut rng, 2, false)));
                out.push_str(&paragraph(&mut rng, 20, 60));
            }
            6 if shape.nested_columns => {
                if rng.below(2) == 0 {
                    out.push_str("<div>");
                    out.push_str(&paragraph(&mut rng, 10, 40));
                    out.push_str(&column_container(&mut rng));
                    out.push_str("</div>");
                    continue;
                }
                out.push_str("<div class=\"section\">");
                out.push_str(&format!("<h3>{}</h3>", sentence(&mut rng, 2, false)));
                out.push_str(&column_container(&mut rng));
                out.push_str(&paragraph(&mut rng, 10, 40));
                out.push_str("</div>");
            }
            _ => out.push_str(&paragraph(&mut rng, 30, 150)),
        }
    }
    out
}

/// Parsed document for a shape.
pub fn generated_document(shape: DocShape) -> Vec<DocumentNode> {
    parse_markup(&generated_markup(shape))
        .unwrap_or_else(|e| panic!("generated markup must parse: {}", e))
}
