/// Settings a page may override through the `data-heap-editor-config`
/// attribute of its `<body>`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix for every endpoint path. Empty means same origin.
    pub base_url: String,
    pub index_path: String,
    pub posts_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: String::new(),
            index_path: "/".into(),
            posts_path: "/posts/".into(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn post_page(&self, post_id_str: &str) -> String {
        format!("{}{}", self.posts_path, post_id_str)
    }
}
