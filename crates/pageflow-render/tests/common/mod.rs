#![allow(dead_code)]

use pageflow::{DocumentNode, ElementNode};
use pageflow_render::{LayoutMeasurer, MeasureMetrics};

/// One pixel per word, so budgets read as word counts.
pub struct WordsMeasurer;

impl LayoutMeasurer for WordsMeasurer {
    fn measure_fragment_px(&self, fragment: &[DocumentNode], _: &MeasureMetrics) -> f32 {
        fragment.iter().map(DocumentNode::word_count).sum::<usize>() as f32
    }
}

/// `count` numbered words starting at `first`: "w1 w2 ...".
pub fn numbered_words(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn paragraph(first: usize, count: usize) -> DocumentNode {
    ElementNode::new("p")
        .with_text(numbered_words(first, count))
        .into()
}

pub fn heading(text: &str) -> DocumentNode {
    ElementNode::new("h2").with_text(text).into()
}
