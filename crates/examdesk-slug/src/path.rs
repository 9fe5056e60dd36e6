//! Canonical route builders.

use std::fmt;

use crate::slug::slugify;

/// Sentinel rendered when nothing routable is known about an exam.
pub const NO_ROUTE: &str = "#";

/// What the caller knows about an exam.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExamRef<'a> {
    /// Provider name or slug, e.g. `"AWS"` or `"aws"`.
    pub provider: Option<&'a str>,
    /// Exam code, e.g. `"SAA_C03"`.
    pub code: Option<&'a str>,
    /// Stored opaque slug, used when provider or code is missing.
    pub slug: Option<&'a str>,
}

/// A resolved exam route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamPath {
    /// `/exams/{provider}/{code}`.
    Canonical { provider: String, code: String },
    /// `/exam/{slug}`.
    BySlug(String),
    /// Nothing to link to.
    NoRoute,
}

impl ExamPath {
    /// Whether this path can be linked to.
    pub fn is_routable(&self) -> bool {
        !matches!(self, ExamPath::NoRoute)
    }
}

impl fmt::Display for ExamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamPath::Canonical { provider, code } => write!(f, "/exams/{}/{}", provider, code),
            ExamPath::BySlug(slug) => write!(f, "/exam/{}", slug),
            ExamPath::NoRoute => f.write_str(NO_ROUTE),
        }
    }
}

/// Build the canonical path for an exam.
///
/// Underscores in the exam code become hyphens before slugifying, so
/// `SAA_C03` and `saa-c03` resolve to the same URL.
pub fn exam_path(exam: ExamRef<'_>) -> ExamPath {
    let provider = exam.provider.map(slugify).unwrap_or_default();
    let code = exam
        .code
        .map(|c| slugify(&c.replace('_', "-")))
        .unwrap_or_default();

    if !provider.is_empty() && !code.is_empty() {
        return ExamPath::Canonical { provider, code };
    }

    match exam.slug.map(|s| s.trim().trim_matches('/')) {
        Some(slug) if !slug.is_empty() => ExamPath::BySlug(slug.to_string()),
        _ => ExamPath::NoRoute,
    }
}

/// Build the search path for a free-text keyword, if it has any slug content.
pub fn search_path(keyword: &str) -> Option<String> {
    let slug = slugify(keyword);
    (!slug.is_empty()).then(|| format!("/search/{}", slug))
}
