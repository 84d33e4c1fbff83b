#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Identity {
    pub name: String,
    pub avatar: String,
}
