use crate::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tags {
    #[serde(default)]
    pub index_tags: Vec<String>,

    #[serde(default)]
    pub whisper_tags: Vec<String>,

    #[serde(default)]
    pub category_tags: Vec<String>,

    #[serde(default)]
    pub content_warnings: Vec<String>,
}

impl Tags {
    pub fn with_categories<I, S>(categories: I) -> Tags
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tags {
            category_tags: categories.into_iter().map(Into::into).collect(),
            ..Tags::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.index_tags
            .iter()
            .chain(self.whisper_tags.iter())
            .chain(self.category_tags.iter())
            .chain(self.content_warnings.iter())
            .try_for_each(|t| crate::validate_string(t))
    }
}
