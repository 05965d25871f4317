use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("route pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),
    #[error("route pattern has an unnamed capture: {0:?}")]
    UnnamedCapture(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name`, matches one or more ASCII digits.
    Digits(String),
}

/// A route template such as `/product/:id`.
///
/// Matching is exact on segment count, so `/product/` and `/product/7/x`
/// never match `/product/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Captured path segments, in pattern order. Values are the raw text; callers
/// parse them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(|(_, v)| v.as_str())
    }
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }
        let segments = raw
            .split('/')
            .skip(1)
            .map(|s| match s.strip_prefix(':') {
                Some("") => Err(PatternError::UnnamedCapture(raw.to_string())),
                Some(name) => Ok(Segment::Digits(name.to_string())),
                None => Ok(Segment::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Digits(name)
                    if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    params.push((name.clone(), part.to_string()));
                }
                _ => return None,
            }
        }
        Some(Params(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).expect("valid pattern")
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let p = pattern("/category");
        assert_eq!(p.matches("/category"), Some(Params::default()));
        assert_eq!(p.matches("/category/"), None);
        assert_eq!(p.matches("/categories"), None);
        assert_eq!(p.matches("/category/1"), None);
        assert_eq!(p.matches("category"), None);
    }

    #[test]
    fn root_pattern() {
        let p = pattern("/");
        assert!(p.matches("/").is_some());
        assert_eq!(p.matches("/docs"), None);
    }

    #[test]
    fn digit_capture() {
        let p = pattern("/product/:id");
        let params = p.matches("/product/0042").expect("match");
        assert_eq!(params.get("id"), Some("0042"));
        assert_eq!(params.positional(0), Some("0042"));
        assert_eq!(params.positional(1), None);

        assert_eq!(p.matches("/product/"), None);
        assert_eq!(p.matches("/product/abc"), None);
        assert_eq!(p.matches("/product/-1"), None);
        assert_eq!(p.matches("/product/1.5"), None);
        assert_eq!(p.matches("/product/7/extra"), None);
        assert_eq!(p.matches("/category/7"), None);
    }

    #[test]
    fn multiple_captures_keep_order() {
        let p = pattern("/a/:x/b/:y");
        let params = p.matches("/a/1/b/22").expect("match");
        assert_eq!(params.positional(0), Some("1"));
        assert_eq!(params.positional(1), Some("22"));
        assert_eq!(params.get("y"), Some("22"));
        assert_eq!(params.get("z"), None);
    }

    #[test]
    fn rejects_bad_patterns() {
        assert_eq!(
            PathPattern::parse("product"),
            Err(PatternError::MissingLeadingSlash("product".into()))
        );
        assert_eq!(
            PathPattern::parse("/product/:"),
            Err(PatternError::UnnamedCapture("/product/:".into()))
        );
    }
}
