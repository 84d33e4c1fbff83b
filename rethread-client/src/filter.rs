use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::api::Post;

/// Set of category tags the user chose to restrict the view to
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CategoryFilter(BTreeSet<String>);

impl CategoryFilter {
    pub fn new<I, S>(categories: I) -> CategoryFilter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategoryFilter(categories.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.as_str())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    /// Posts without any category never match
    pub fn matches(&self, post: &Post) -> bool {
        post.tags.category_tags.iter().any(|c| self.contains(c))
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    /// Parses a comma-separated list of categories
    fn from_str(s: &str) -> Result<CategoryFilter, String> {
        let res = CategoryFilter::new(
            s.split(',')
                .map(|c| c.trim())
                .filter(|c| !c.is_empty()),
        );
        if res.is_empty() {
            return Err(format!("no category in filter {s:?}"));
        }
        Ok(res)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in self.categories() {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
