//! Route table and path matcher.
//!
//! Entries are kept in registration order. A lookup first tries entries whose
//! pattern has no parameter or wildcard segment (exact match), then the
//! dynamic entries. Matching is ASCII case-insensitive.

use std::collections::HashMap;

use axum::http::Method;

use portico_core::{GatewayError, Result, RoleFlags, SkipFlags};

/// Access-control flags recovered for a request. Zero when nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFlags {
    pub skip: SkipFlags,
    pub roles: RoleFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    Wildcard,
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    method: Method,
    pattern: String,
    skip: SkipFlags,
    roles: RoleFlags,
    segments: Vec<Segment>,
    literals: usize,
    dynamic: bool,
    wildcard: bool,
}

impl RouteEntry {
    /// `pattern` is the full path: `:name` segments match any value, a final
    /// `*name` segment matches one or more trailing segments.
    pub fn new(method: Method, pattern: &str, skip: SkipFlags, roles: RoleFlags) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(GatewayError::Config(format!(
                "route pattern must start with '/': {pattern}"
            )));
        }

        let raw: Vec<&str> = pattern.split('/').collect();
        let last = raw.len() - 1;
        let mut segments = Vec::with_capacity(raw.len());
        for (i, seg) in raw.iter().enumerate() {
            if seg.starts_with(':') {
                segments.push(Segment::Param);
            } else if seg.starts_with('*') {
                if i != last {
                    return Err(GatewayError::Config(format!(
                        "wildcard must be the last segment: {pattern}"
                    )));
                }
                segments.push(Segment::Wildcard);
            } else {
                segments.push(Segment::Literal(seg.to_ascii_lowercase()));
            }
        }

        let literals = segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let wildcard = matches!(segments.last(), Some(Segment::Wildcard));
        let dynamic = literals != segments.len();

        Ok(Self {
            method,
            pattern: pattern.to_string(),
            skip,
            roles,
            segments,
            literals,
            dynamic,
            wildcard,
        })
    }

    /// Unique table key, `"METHOD /full/path"`, lowercased like matching.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.pattern.to_ascii_lowercase())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn skip(&self) -> SkipFlags {
        self.skip
    }

    pub fn roles(&self) -> RoleFlags {
        self.roles
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn flags(&self) -> AccessFlags {
        AccessFlags { skip: self.skip, roles: self.roles }
    }

    fn matches_static(&self, path: &[&str]) -> bool {
        self.segments.len() == path.len()
            && self.segments.iter().zip(path).all(|(s, p)| match s {
                Segment::Literal(l) => l == p,
                _ => false,
            })
    }

    fn matches_dynamic(&self, path: &[&str]) -> bool {
        if self.wildcard {
            if path.len() < self.segments.len() {
                return false;
            }
        } else if path.len() != self.segments.len() {
            return false;
        }

        self.segments.iter().zip(path).all(|(s, p)| match s {
            Segment::Literal(l) => l == p,
            Segment::Param | Segment::Wildcard => true,
        })
    }
}

/// Ordered route entries with unique keys.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    by_key: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or overwrite in place when the key already exists.
    /// Returns true on overwrite.
    pub fn register(&mut self, entry: RouteEntry) -> bool {
        let key = entry.key();
        match self.by_key.get(&key) {
            Some(&idx) => {
                tracing::debug!(%key, "route entry overwritten");
                self.entries[idx] = entry;
                true
            }
            None => {
                self.by_key.insert(key, self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flags of the best-matching entry, or zero flags.
    pub fn resolve(&self, method: &Method, path: &str) -> AccessFlags {
        self.find(method, path).map(RouteEntry::flags).unwrap_or_default()
    }

    pub fn resolve_skip(&self, method: &Method, path: &str) -> SkipFlags {
        self.resolve(method, path).skip
    }

    pub fn resolve_role(&self, method: &Method, path: &str) -> RoleFlags {
        self.resolve(method, path).roles
    }

    /// Best-matching entry for the request.
    ///
    /// Among dynamic matches, more literal segments win, then a non-wildcard
    /// pattern beats a wildcard one, then the earlier registration wins.
    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        let lowered = path.to_ascii_lowercase();
        let segs: Vec<&str> = lowered.split('/').collect();

        let candidates = || self.entries.iter().filter(|e| e.method == *method);

        if let Some(hit) = candidates().find(|e| !e.dynamic && e.matches_static(&segs)) {
            return Some(hit);
        }

        let mut best: Option<&RouteEntry> = None;
        for e in candidates().filter(|e| e.dynamic && e.matches_dynamic(&segs)) {
            best = match best {
                Some(b) if (b.literals, !b.wildcard) >= (e.literals, !e.wildcard) => Some(b),
                _ => Some(e),
            };
        }
        best
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(method: Method, pattern: &str, skip: SkipFlags, roles: u32) -> RouteEntry {
        RouteEntry::new(method, pattern, skip, RoleFlags::from_bits(roles)).unwrap()
    }

    #[test]
    fn static_pass_runs_before_dynamic() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/v1/users/:id", SkipFlags::NONE, 1));
        t.register(entry(Method::GET, "/v1/users/me", SkipFlags::TOKEN, 0));

        assert_eq!(t.resolve_skip(&Method::GET, "/v1/users/me"), SkipFlags::TOKEN);
        assert_eq!(t.resolve_role(&Method::GET, "/v1/users/42").bits(), 1);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/a/:x", SkipFlags::NONE, 1));
        t.register(entry(Method::GET, "/a/:y", SkipFlags::NONE, 2));
        assert!(t.register(entry(Method::GET, "/a/:x", SkipFlags::NONE, 4)));

        assert_eq!(t.len(), 2);
        let first = t.entries().next().unwrap();
        assert_eq!(first.pattern(), "/a/:x");
        assert_eq!(first.roles().bits(), 4);
        // same shape, earlier registration wins
        assert_eq!(t.resolve_role(&Method::GET, "/a/b").bits(), 4);
    }

    #[test]
    fn more_literals_win_then_non_wildcard() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/files/*rest", SkipFlags::ALL, 0));
        t.register(entry(Method::GET, "/:a/:b", SkipFlags::NONE, 8));
        t.register(entry(Method::GET, "/files/:name", SkipFlags::API_KEY, 0));

        assert_eq!(t.resolve_skip(&Method::GET, "/files/readme"), SkipFlags::API_KEY);
        assert_eq!(t.resolve_skip(&Method::GET, "/files/docs/readme"), SkipFlags::ALL);
        assert_eq!(t.resolve_role(&Method::GET, "/other/thing").bits(), 8);
    }

    #[test]
    fn wildcard_needs_at_least_one_trailing_segment() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/doc/*file", SkipFlags::ALL, 0));
        assert_eq!(t.resolve_skip(&Method::GET, "/doc"), SkipFlags::NONE);
        assert_eq!(t.resolve_skip(&Method::GET, "/doc/a/b/c"), SkipFlags::ALL);
    }

    #[test]
    fn case_insensitive() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/V1/Heroes/:id", SkipFlags::TOKEN, 0));
        assert_eq!(t.resolve_skip(&Method::GET, "/v1/HEROES/7"), SkipFlags::TOKEN);
    }

    #[test]
    fn keys_differing_only_in_case_overwrite() {
        let mut t = RouteTable::new();
        t.register(entry(Method::GET, "/v1/X", SkipFlags::NONE, 1));
        assert!(t.register(entry(Method::GET, "/v1/x", SkipFlags::TOKEN, 2)));

        assert_eq!(t.len(), 1);
        assert!(t.get("GET /v1/x").is_some());
        assert_eq!(t.resolve(&Method::GET, "/V1/x").roles.bits(), 2);
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(RouteEntry::new(Method::GET, "v1/x", SkipFlags::NONE, RoleFlags::NONE).is_err());
        assert!(RouteEntry::new(Method::GET, "/*a/b", SkipFlags::NONE, RoleFlags::NONE).is_err());
    }
}
