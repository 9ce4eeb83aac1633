//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Highest review rating.
const MAX_STARS: usize = 5;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders a 1-5 rating as filled and empty stars.
///
/// Anything that is not a number renders as zero stars.
///
/// Usage in templates: `{{ review.rating|stars }}`
#[askama::filter_fn]
pub fn stars(rating: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(render_stars(&rating.to_string()))
}

fn render_stars(rating: &str) -> String {
    let filled = rating.trim().parse::<usize>().unwrap_or(0).min(MAX_STARS);
    let mut out = "★".repeat(filled);
    out.push_str(&"☆".repeat(MAX_STARS - filled));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stars() {
        assert_eq!(render_stars("3"), "★★★☆☆");
        assert_eq!(render_stars("0"), "☆☆☆☆☆");
        assert_eq!(render_stars("9"), "★★★★★");
        assert_eq!(render_stars("n/a"), "☆☆☆☆☆");
    }
}
