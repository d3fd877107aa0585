//! Requests the client knows how to send.

use chrono::{DateTime, SecondsFormat, Utc};

/// A GET against the upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Unescaped path segments appended to the base URL. The transport percent-encodes each
    /// one, so a segment may contain `/` or `?` without changing the route.
    pub segments: Vec<String>,
    /// Query pairs in send order.
    pub query: Vec<(String, String)>,
}

impl UpstreamRequest {
    /// GET for a fixed route such as `organizations/search`; empty segments are dropped.
    pub fn get(path: &str) -> Self {
        let segments = path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
        Self { segments, query: Vec::new() }
    }

    /// Append one caller-supplied segment verbatim.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Segments joined with `/`, for logs and assertions.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    fn param_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value.to_string()),
            None => self,
        }
    }

    /// Organization record by identifier.
    pub fn lookup(id: &str) -> Self {
        Self::get("organizations").segment(id)
    }

    /// Public-charity status for an identifier.
    pub fn public_charity_check(id: &str) -> Self {
        Self::get("public_charity_check").segment(id)
    }

    pub fn search(query: &SearchQuery) -> Self {
        Self::get("organizations/search")
            .param_opt("q", query.query.as_deref())
            .param_opt("city", query.city.as_deref())
            .param_opt("state", query.state.as_deref())
            .param_opt("limit", query.limit)
            .param_opt("offset", query.offset)
    }

    /// Organizations added or updated since `since`.
    pub fn list_since(since: DateTime<Utc>) -> Self {
        Self::get("organizations").param("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

/// Search parameters; `None` fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()), ..Self::default() }
    }
}
