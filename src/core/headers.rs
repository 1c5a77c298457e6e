//! Ordered header collection.

use http::header::{HeaderName, HeaderValue};

/// Validate a header line given as text.
///
/// Names must be valid tokens; values may not contain control characters,
/// so CR/LF can never split a response.
pub fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), http::Error> {
    let name = HeaderName::from_bytes(name.as_bytes())?;
    let value = HeaderValue::from_str(value)?;
    Ok((name, value))
}

/// Ordered list of response headers.
///
/// Unlike `http::HeaderMap`, removing a header keeps the relative order of
/// the others, so lines are emitted in the order they were set. A name may
/// appear more than once when added with `replace = false` (e.g.
/// `Set-Cookie`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderBag {
    /// Create an empty header bag.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(4),
        }
    }

    /// Set a header.
    ///
    /// With `replace`, the first entry of that name takes the new value and
    /// any further entries are dropped. Without it, a new line is appended.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue, replace: bool) {
        if replace {
            if let Some(pos) = self.position(name.as_str()) {
                self.entries[pos].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= pos || *n != name;
                    index += 1;
                    keep
                });
                return;
            }
        }

        self.entries.push((name, value));
    }

    /// Insert a header, replacing existing values.
    #[inline]
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.set(name, value, true);
    }

    /// Append a header line without touching existing ones.
    #[inline]
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.set(name, value, false);
    }

    /// Merge pairs into the bag, later pairs replacing earlier ones.
    pub fn merge<I>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (HeaderName, HeaderValue)>,
    {
        for (name, value) in headers {
            self.insert(name, value);
        }
    }

    /// Get the first value for a header name (case-insensitive).
    ///
    /// Values that are not visible ASCII are reported as absent; use
    /// [`get_value`](Self::get_value) for the raw value.
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.get_value(name).and_then(|v| v.to_str().ok())
    }

    /// Get the first raw value for a header name.
    #[inline]
    pub fn get_value(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.position(name.as_ref()).map(|pos| &self.entries[pos].1)
    }

    /// Get every value recorded for a header name.
    pub fn get_all<'a, N>(&'a self, name: N) -> impl Iterator<Item = &'a str> + 'a
    where
        N: AsRef<str> + 'a,
    {
        self.entries
            .iter()
            .filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name.as_ref()))
            .filter_map(|(_, v)| v.to_str().ok())
    }

    /// Check whether a header is present.
    #[inline]
    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.position(name.as_ref()).is_some()
    }

    /// Remove every entry for a header name. Returns true if anything was removed.
    pub fn remove(&mut self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        let before = self.entries.len();
        self.entries
            .retain(|(n, _)| !n.as_str().eq_ignore_ascii_case(name));
        before != self.entries.len()
    }

    /// Iterate over entries in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderBag {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        let mut bag = HeaderBag::new();
        bag.merge(iter);
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};

    fn name(s: &'static str) -> HeaderName {
        HeaderName::from_static(s)
    }

    fn value(s: &'static str) -> HeaderValue {
        HeaderValue::from_static(s)
    }

    fn entries(bag: &HeaderBag) -> Vec<(&str, &str)> {
        bag.iter()
            .map(|(n, v)| (n.as_str(), v.to_str().unwrap()))
            .collect()
    }

    #[test]
    fn test_insert_replaces_case_insensitive() {
        let mut bag = HeaderBag::new();
        bag.insert(CONTENT_TYPE, value("text/plain"));
        bag.insert(CONTENT_TYPE, value("application/json"));

        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(bag.get(CONTENT_TYPE), Some("application/json"));
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let mut bag = HeaderBag::new();
        bag.append(SET_COOKIE, value("a=1"));
        bag.append(SET_COOKIE, value("b=2"));

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("set-cookie"), Some("a=1"));
        let all: Vec<_> = bag.get_all("Set-Cookie").collect();
        assert_eq!(all, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_replace_collapses_appended_lines() {
        let mut bag = HeaderBag::new();
        bag.append(name("x-tag"), value("one"));
        bag.insert(name("x-other"), value("keep"));
        bag.append(name("x-tag"), value("two"));
        bag.insert(name("x-tag"), value("three"));

        assert_eq!(entries(&bag), vec![("x-tag", "three"), ("x-other", "keep")]);
    }

    #[test]
    fn test_merge_last_write_wins() {
        let bag: HeaderBag = vec![
            (name("x-a"), value("1")),
            (name("x-b"), value("2")),
            (name("x-a"), value("3")),
        ]
        .into_iter()
        .collect();

        assert_eq!(entries(&bag), vec![("x-a", "3"), ("x-b", "2")]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut bag = HeaderBag::new();
        bag.insert(name("x-first"), value("1"));
        bag.append(SET_COOKIE, value("a=1"));
        bag.append(SET_COOKIE, value("b=2"));
        bag.insert(LOCATION, value("/home"));
        bag.insert(name("x-last"), value("2"));

        assert!(bag.remove("set-cookie"));
        assert!(!bag.remove(SET_COOKIE));
        assert_eq!(
            entries(&bag),
            vec![("x-first", "1"), ("location", "/home"), ("x-last", "2")]
        );
    }

    #[test]
    fn test_header_pair_rejects_line_breaks() {
        assert!(header_pair("Location", "/next\r\nSet-Cookie: admin=1").is_err());
        assert!(header_pair("X-Bad\r\nName", "1").is_err());
        assert!(header_pair("Bad Header", "x").is_err());

        let (n, v) = header_pair("X-Request-Id", "abc").unwrap();
        assert_eq!(n, "x-request-id");
        assert_eq!(v, "abc");
    }

    #[test]
    fn test_non_ascii_value_is_kept_raw() {
        let mut bag = HeaderBag::new();
        let (n, v) = header_pair("Content-Disposition", "attachment; filename=résumé.pdf").unwrap();
        bag.insert(n, v);

        assert!(bag.get("content-disposition").is_none());
        assert_eq!(
            bag.get_value("content-disposition").unwrap().as_bytes(),
            "attachment; filename=résumé.pdf".as_bytes()
        );
    }
}
