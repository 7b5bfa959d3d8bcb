//! Rich-text document model and structural splitting for paged editors.
//!
//! This crate owns everything that reshapes a document tree without
//! measuring it: manual page-break partitioning, block classification, and
//! word-boundary splitting. Height-driven pagination lives in
//! `pageflow-render`, which injects a layout measurer on top of these pieces.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod classify;
pub mod error;
pub mod markup;
pub mod node;
pub mod page_break;
pub mod word_split;

pub use classify::{
    classify, has_nested_sections, has_unsplittable_descendant, is_heading, split_floor,
    BlockClass,
};
pub use error::MarkupError;
pub use markup::{parse_markup, to_markup};
pub use node::{
    assign_text_runs, forest_text, is_blank_forest, is_block_tag, rejoin_continuations,
    Attributes, ClassList, DocumentNode, ElementNode, TextNode, TextRun, COLUMN_CONTAINER_CLASS,
    CONTINUATION_CLASS, PAGE_BREAK_CLASS, SECTION_CLASS,
};
pub use page_break::{count_page_breaks, is_page_break, partition};
pub use word_split::{split_at_word, word_start_offset};
