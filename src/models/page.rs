use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Invalid 'start' parameter")]
    InvalidStart,
    #[error("Invalid 'length' parameter")]
    InvalidLength,
}

/// 1-based offset pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    start: i64,
    length: i64,
}

impl Page {
    pub fn new(start: i64, length: i64) -> Result<Self, PageError> {
        if start < 1 {
            return Err(PageError::InvalidStart);
        }
        if length < 1 {
            return Err(PageError::InvalidLength);
        }
        Ok(Self { start, length })
    }

    /// Parse raw query values, as received by the listing endpoints
    pub fn parse(start: Option<&str>, length: Option<&str>) -> Result<Self, PageError> {
        let start = start
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or(PageError::InvalidStart)?;
        let length = length
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or(PageError::InvalidLength)?;
        Self::new(start, length)
    }

    pub fn limit(&self) -> i64 {
        self.length
    }

    pub fn offset(&self) -> i64 {
        self.start - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_one_based() {
        let page = Page::new(3, 2).unwrap();
        assert_eq!(page.offset(), 2);
        assert_eq!(page.limit(), 2);
    }

    #[test]
    fn rejects_non_positive_bounds() {
        assert_eq!(Page::new(0, 10), Err(PageError::InvalidStart));
        assert_eq!(Page::new(1, 0), Err(PageError::InvalidLength));
    }

    #[test]
    fn parse_reports_the_offending_parameter() {
        assert_eq!(Page::parse(None, Some("5")), Err(PageError::InvalidStart));
        assert_eq!(Page::parse(Some("abc"), Some("5")), Err(PageError::InvalidStart));
        assert_eq!(Page::parse(Some("1"), Some("x")), Err(PageError::InvalidLength));
        assert_eq!(Page::parse(Some("1"), Some("5")), Ok(Page::new(1, 5).unwrap()));
    }
}
