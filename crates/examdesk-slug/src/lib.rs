//! Slug canonicalization for SEO-stable URLs.
//!
//! [`slugify`] turns free text (exam titles, search keywords) into a slug:
//! lowercase ASCII word characters and single hyphens, no hyphen at either
//! end. [`exam_path`] and [`search_path`] build the canonical routes that
//! use those slugs.

mod path;
mod slug;

pub use path::{ExamPath, ExamRef, NO_ROUTE, exam_path, search_path};
pub use slug::{is_slug, slugify};
