use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use model::{Node, ObjectKind, RelMember, Relation, Tags, Way};

/// Extra client-side allowance on top of the server-side query timeout.
const TIMEOUT_MARGIN_S: u64 = 60;

#[derive(Debug, Clone)]
pub enum ApiError {
    Request(Arc<reqwest::Error>),
    Decode(Arc<serde_json::Error>),
    InvalidResponse { status_code: reqwest::StatusCode },
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::Request(e) => write!(f, "HTTP request error: {}", e),
            ApiError::Decode(e) => write!(f, "JSON decode error: {}", e),
            ApiError::InvalidResponse { status_code } => {
                write!(f, "overpass server returned {}", status_code)
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request(Arc::new(e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(Arc::new(e))
    }
}

/// Typed download: the decoded nodes, ways and relations of one query.
#[derive(Debug, Clone, Default)]
pub struct Elements {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub rels: Vec<Relation>,
}

impl Elements {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.rels.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Element>,
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lon: f64,
        lat: f64,
        #[serde(default)]
        tags: IndexMap<String, String>,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        #[serde(default)]
        tags: IndexMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: IndexMap<String, String>,
    },
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "ref")]
    id: i64,
    #[serde(default)]
    role: String,
}

fn tags_from(raw: IndexMap<String, String>) -> Tags {
    raw.into_iter().collect()
}

/// Client for the Overpass query service.
pub struct Client {
    url: String,
    api_key: String,
    timeout_s: u64,
    http: reqwest::Client,
}

impl Client {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout_s: u64) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_s + TIMEOUT_MARGIN_S))
            .build()?;
        Ok(Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout_s,
            http,
        })
    }

    /// Runs a query, prepending the output format and timeout preamble, and
    /// decodes the response into typed elements.
    pub async fn fetch(&self, query: &str) -> Result<Elements, ApiError> {
        let data = format!("[output: json][timeout: {}];\n{}", self.timeout_s, query);
        let response = self
            .http
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .form(&[("data", data.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            log::error!("overpass server returned {} for query\n{}", status, query);
            return Err(ApiError::InvalidResponse {
                status_code: status,
            });
        }

        let body = response.bytes().await?;
        log::info!("overpass download size: {}", filesize(body.len()));
        let parsed: Response = serde_json::from_slice(&body)?;
        if let Some(remarks) = &parsed.remarks {
            log::warn!("overpass remarks: {}", remarks);
        }
        if parsed.elements.is_empty() {
            log::error!("overpass returned: {}", String::from_utf8_lossy(&body));
        }

        let mut elements = Elements::default();
        for element in parsed.elements {
            match element {
                Element::Node { id, lon, lat, tags } => {
                    elements.nodes.push(Node::new(id, tags_from(tags), lon, lat));
                }
                Element::Way { id, nodes, tags } => {
                    elements.ways.push(Way::new(id, tags_from(tags), nodes));
                }
                Element::Relation { id, members, tags } => {
                    let members = members
                        .into_iter()
                        .filter_map(|m| {
                            let kind = match m.kind.as_str() {
                                "node" => ObjectKind::Node,
                                "way" => ObjectKind::Way,
                                "relation" => ObjectKind::Relation,
                                _ => return None,
                            };
                            Some(RelMember {
                                kind,
                                id: m.id,
                                role: m.role,
                            })
                        })
                        .collect();
                    elements.rels.push(Relation::new(id, tags_from(tags), members));
                }
            }
        }
        log::info!(
            "total OSM objects: {}",
            elements.nodes.len() + elements.ways.len() + elements.rels.len()
        );
        log::info!("OSM nodes: {}", elements.nodes.len());
        log::info!("OSM ways: {}", elements.ways.len());
        log::info!("OSM relations: {}", elements.rels.len());
        Ok(elements)
    }
}

fn filesize(size: usize) -> String {
    if size < 1000 {
        format!("{size} byte")
    } else if size < 1000 * 1000 {
        format!("{:.0} kB", size as f64 / 1000.0)
    } else if size < 1000 * 1000 * 1000 {
        format!("{:.0} MB", size as f64 / 1e6)
    } else {
        format!("{:.0} GB", size as f64 / 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_elements() {
        let body = r#"{
            "elements": [
                {"type": "node", "id": 1, "lon": 10.0, "lat": 54.0,
                 "tags": {"highway": "bus_stop"}},
                {"type": "way", "id": 2, "nodes": [1, 3]},
                {"type": "relation", "id": 4,
                 "members": [{"type": "way", "ref": 2, "role": "outer"}],
                 "tags": {"type": "multipolygon"}}
            ]
        }"#;
        let parsed: Response = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.elements.len(), 3);
        assert!(parsed.remarks.is_none());
        match &parsed.elements[0] {
            Element::Node { id, tags, .. } => {
                assert_eq!(*id, 1);
                assert_eq!(tags.get("highway").map(String::as_str), Some("bus_stop"));
            }
            other => panic!("expected node, got {other:?}"),
        }
    }

    #[test]
    fn filesize_is_human_readable() {
        assert_eq!(filesize(340), "340 byte");
        assert_eq!(filesize(12_300), "12 kB");
        assert_eq!(filesize(3_400_000), "3 MB");
    }
}
