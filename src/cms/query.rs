//! Predicate-based search queries

use std::fmt;

/// A search predicate, e.g. `[at(document.type, "post")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub op: &'static str,
    pub path: String,
    pub value: String,
}

impl Predicate {
    /// Exact match of a field
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "at",
            path: path.into(),
            value: value.into(),
        }
    }

    /// All documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// The document of `doc_type` carrying `uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "[{}({}, \"{}\")]", self.op, self.path, value)
    }
}

/// A search request: predicates plus paging and field selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    /// Restrict returned `data` to these fields (`post.title`, ...)
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
    /// e.g. `[document.first_publication_date desc]`
    pub orderings: Option<String>,
}

impl Query {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
            ..Default::default()
        }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn orderings(mut self, orderings: impl Into<String>) -> Self {
        self.orderings = Some(orderings.into());
        self
    }

    /// The `q` parameter: all predicates wrapped in one list
    pub fn q(&self) -> String {
        let inner: String = self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", inner)
    }

    /// Query-string parameters for the search endpoint (without `ref`)
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q())];
        if let Some(page_size) = self.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(ref orderings) = self.orderings {
            params.push(("orderings", orderings.clone()));
        }
        params
    }
}
