use chrono::{DateTime, Local};

/// Timestamp format shared by raw response names and archived files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Longest sanitized URL prefix kept in a response id
const MAX_URL_PART: usize = 180;

/// Builds a file-system safe identifier for a fetched URL
///
/// The scheme separator collapses to a single `_`, every other character
/// outside `[A-Za-z0-9._-]` becomes `_`, and the timestamp is appended.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use metro_harvest::url::response_id;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
/// assert_eq!(
///     response_id("https://shop.example.com/category/tea?page=2", at),
///     "https_shop.example.com_category_tea_page_2_2024-03-01_12-30-05"
/// );
/// ```
pub fn response_id(url: &str, at: DateTime<Local>) -> String {
    let safe: String = url
        .replacen("://", "_", 1)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_URL_PART)
        .collect();

    format!("{}_{}", safe, at.format(TIMESTAMP_FORMAT))
}
