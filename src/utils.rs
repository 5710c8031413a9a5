//! # Utility Functions Module
//!
//! Small helpers for building encoder argument lists without repeating
//! `.to_string()` at every call site.

/// Builds a `Vec<String>` from heterogeneous displayable expressions.
///
/// ```rust
/// use media_converter::args;
///
/// let q = 8;
/// assert_eq!(args!["-q:v", q], vec!["-q:v".to_string(), "8".to_string()]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        ::std::vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_args_macro_mixed_types() {
        let crf = 30;
        let result = args!["-c:v", "libvpx-vp9", "-crf", crf, "-b:v", 0];
        assert_eq!(
            result,
            vec!["-c:v", "libvpx-vp9", "-crf", "30", "-b:v", "0"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_args_macro_empty_and_trailing_comma() {
        let empty: Vec<String> = args![];
        assert!(empty.is_empty());
        assert_eq!(args!["-y",], vec!["-y".to_string()]);
    }
}
