// Parser for the organizer's verbose rename report
//
// Relevant lines look like:  '/import/20240101120000/IMG_0001.JPG' --> '2024/01/20240101-093000.JPG'
// The destination starts one character (the opening quote) after the separator
// and stops before the line's final character (the closing quote).

use thiserror::Error;

use crate::constants::REPORT_SEPARATOR;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("line {line}: nothing after the rename separator: {text}")]
    MissingDestination { line: usize, text: String },
}

/// Destination paths in report order. Lines without the separator are ignored.
pub fn parse_organize_report(output: &str) -> Result<Vec<String>, ReportError> {
    let mut result = Vec::new();

    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some(sep) = line.find(REPORT_SEPARATOR) else {
            continue;
        };

        let start = sep + REPORT_SEPARATOR.len() + 1;
        let end = line
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);

        let destination = if start <= end { line.get(start..end) } else { None };
        let Some(destination) = destination else {
            return Err(ReportError::MissingDestination {
                line: idx + 1,
                text: line.to_string(),
            });
        };

        let destination = destination.trim();
        if !destination.is_empty() {
            result.push(destination.to_string());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
======== /photos/import/20240309140330/IMG_0001.JPG
Setting new values from /photos/import/20240309140330/IMG_0001.JPG
'/photos/import/20240309140330/IMG_0001.JPG' --> '2024/03/20240309-101500.JPG'
======== /photos/import/20240309140330/IMG_0002.MOV
'/photos/import/20240309140330/IMG_0002.MOV' --> '2024/03/20240309-101502.MOV'

    1 directories scanned
    2 image files updated
";

    #[test]
    fn test_parses_destinations_in_report_order() {
        let paths = parse_organize_report(SAMPLE).unwrap();
        assert_eq!(
            paths,
            vec![
                "2024/03/20240309-101500.JPG".to_string(),
                "2024/03/20240309-101502.MOV".to_string(),
            ]
        );
    }

    #[test]
    fn test_ignores_blank_and_unrelated_lines() {
        assert!(parse_organize_report("\n   \nno arrows here\n").unwrap().is_empty());
    }

    #[test]
    fn test_report_order_is_not_sorted() {
        let out = "'x' --> 'b.jpg'\n'y' --> 'a.jpg'\n";
        assert_eq!(parse_organize_report(out).unwrap(), vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_crlf_lines() {
        let out = "'x' --> '2024/01/a.jpg'\r\n";
        assert_eq!(parse_organize_report(out).unwrap(), vec!["2024/01/a.jpg"]);
    }

    #[test]
    fn test_empty_quoted_destination_is_skipped() {
        assert!(parse_organize_report("'x' --> ''").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_line_is_an_error() {
        let err = parse_organize_report("ok line\n'x' --> ").unwrap_err();
        assert_eq!(
            err,
            ReportError::MissingDestination { line: 2, text: "'x' --> ".to_string() }
        );
    }
}
