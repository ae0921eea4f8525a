use crate::error::{MinerError, Result};
use crate::source::{Entry, EntryKind, FileContent, RateLimitStatus, RepositoryRef, RepositorySource};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use wordminer_protocol::Language;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("word-miner/", env!("CARGO_PKG_VERSION"));
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Personal access token; anonymous access has a much smaller quota
    pub token: Option<String>,
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// GitHub REST v3 client.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    config: GithubConfig,
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    full_name: String,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct FileResponse {
    #[serde(default)]
    size: u64,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    rate: RateLimitStatus,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        if config.token.is_none() {
            log::warn!("GITHUB_TOKEN not set; using the anonymous GitHub quota");
        }

        Ok(Self { http, config })
    }

    fn request(&self, url: Url) -> RequestBuilder {
        let builder = self.http.get(url).header(ACCEPT, GITHUB_MEDIA_TYPE);
        match self.config.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let shown = url.to_string();
        let response = self.request(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::Upstream {
                status: status.as_u16(),
                url: shown,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// `{api_base}/{segments...}` with every segment percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| MinerError::other(format!("invalid GitHub API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| MinerError::other("GitHub API base cannot carry a path"))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn contents_url(&self, repository: &str, path: &str) -> Result<Url> {
        let segments = std::iter::once("repos")
            .chain(repository.split('/'))
            .chain(std::iter::once("contents"))
            .chain(path.split('/'));
        self.endpoint(segments)
    }
}

#[async_trait]
impl RepositorySource for GithubClient {
    async fn search_repositories(
        &self,
        language: Language,
        limit: usize,
    ) -> Result<Vec<RepositoryRef>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut url = self.endpoint(["search", "repositories"])?;
        url.query_pairs_mut()
            .append_pair("q", &format!("language:{}", language.search_tag()))
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &limit.min(MAX_PER_PAGE).to_string());

        let response: SearchResponse = self.get_json(url).await?;
        Ok(response
            .items
            .into_iter()
            .take(limit)
            .map(|item| RepositoryRef::new(item.full_name, item.stargazers_count))
            .collect())
    }

    async fn list_children(&self, repository: &str, path: &str) -> Result<Vec<Entry>> {
        let url = self.contents_url(repository, path)?;
        let entries: Vec<ContentEntry> = self.get_json(url).await?;
        Ok(entries
            .into_iter()
            .map(|entry| Entry {
                kind: match entry.kind.as_str() {
                    "file" => EntryKind::File,
                    "dir" => EntryKind::Dir,
                    _ => EntryKind::Other,
                },
                name: entry.name,
                path: entry.path,
                size_bytes: entry.size,
            })
            .collect())
    }

    async fn read_file(&self, repository: &str, path: &str) -> Result<FileContent> {
        let url = self.contents_url(repository, path)?;
        let file: FileResponse = self.get_json(url).await?;

        match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => {
                let packed: String = content.split_whitespace().collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(packed)
                    .map_err(|e| MinerError::decode(format!("{repository}/{path}: {e}")))?;
                Ok(FileContent {
                    size: file.size,
                    bytes,
                })
            }
            (encoding, _) => Err(MinerError::decode(format!(
                "{repository}/{path}: unsupported content encoding {}",
                encoding.unwrap_or("none")
            ))),
        }
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let url = self.endpoint(["rate_limit"])?;
        let response: RateLimitResponse = self.get_json(url).await?;
        Ok(response.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> GithubClient {
        GithubClient::new(GithubConfig::default()).unwrap()
    }

    #[test]
    fn contents_url_encodes_segments() {
        let url = client()
            .contents_url("pallets/flask", "src/flask/my app.py")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/pallets/flask/contents/src/flask/my%20app.py"
        );
    }

    #[test]
    fn root_listing_has_no_trailing_segment() {
        let url = client().contents_url("psf/requests", "").unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/psf/requests/contents");
    }

    #[test]
    fn file_response_parses_github_shape() {
        let raw = r#"{"name":"a.py","path":"a.py","size":25,"encoding":"base64","content":"ZGVmIG1ha2VfcmVz\ncG9uc2UoKTogcGFzcw==\n"}"#;
        let file: FileResponse = serde_json::from_str(raw).unwrap();
        let packed: String = file.content.unwrap().split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(packed)
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "def make_response(): pass");
    }

    #[test]
    fn listing_entries_parse() {
        let raw = r#"[
            {"name":"src","path":"src","type":"dir","size":0},
            {"name":"setup.py","path":"setup.py","type":"file","size":1200},
            {"name":"vendor","path":"vendor","type":"submodule"}
        ]"#;
        let entries: Vec<ContentEntry> = serde_json::from_str(raw).unwrap();
        let kinds: Vec<_> = entries.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["dir", "file", "submodule"]);
        assert_eq!(entries[2].size, 0);
    }
}
