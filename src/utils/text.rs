/// Why a submitted phrase text was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRejection {
    Empty,
    TooLong { max_chars: usize },
}

/// Checks a submission against the display limit, counted in Unicode code
/// points so multi-byte scripts get the same budget as ASCII.
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), TextRejection> {
    if text.trim().is_empty() {
        return Err(TextRejection::Empty);
    }
    if text.chars().count() > max_chars {
        return Err(TextRejection::TooLong { max_chars });
    }
    Ok(())
}
