//! Fragment fetcher
//!
//! Executes one fragment request and turns the response into relations,
//! members and a mutability verdict, keyed on the response status:
//! - 200: parse the body
//! - redirect: the `Location` is the only relation, never revisit
//! - 304: nothing new, mutability from the cache header
//! - anything else: the fetch fails

use crate::crawler::mutability::MutabilityStatus;
use crate::crawler::parser::{extract_members, extract_relations, parse_graph};
use crate::crawler::timestamp::TimestampExtractor;
use crate::executor::{Request, RequestExecutor, Response};
use crate::{LdesError, Result};
use chrono::{DateTime, Utc};
use oxrdf::Graph;
use oxrdfio::RdfFormat;
use reqwest::header::{CACHE_CONTROL, LOCATION};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Starting points and format of the stream
#[derive(Debug, Clone)]
pub struct LdesMetaData {
    starting_urls: Vec<String>,
    format: RdfFormat,
}

impl LdesMetaData {
    pub fn new(starting_urls: Vec<String>, format: RdfFormat) -> Self {
        Self {
            starting_urls,
            format,
        }
    }

    pub fn starting_urls(&self) -> &[String] {
        &self.starting_urls
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    pub fn create_request(&self, url: &str) -> TreeNodeRequest {
        TreeNodeRequest::new(url, self.format)
    }
}

/// A request for one fragment in an expected RDF format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNodeRequest {
    pub url: String,
    pub format: RdfFormat,
}

impl TreeNodeRequest {
    pub fn new(url: impl Into<String>, format: RdfFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    fn to_request(&self) -> Request {
        Request::get(&self.url).with_header("Accept", self.format.media_type())
    }
}

/// A member as found in a fragment
#[derive(Debug, Clone)]
pub struct TreeMember {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: Graph,
}

/// Everything one fetch learned about a fragment
#[derive(Debug, Clone)]
pub struct TreeNodeResponse {
    pub relations: Vec<String>,
    pub members: Vec<TreeMember>,
    pub mutability: MutabilityStatus,
}

/// Fetches and interprets fragments
pub struct TreeNodeFetcher {
    executor: Arc<dyn RequestExecutor>,
    timestamps: Arc<dyn TimestampExtractor>,
    polling_interval: Duration,
}

impl TreeNodeFetcher {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        timestamps: Arc<dyn TimestampExtractor>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            executor,
            timestamps,
            polling_interval,
        }
    }

    pub async fn fetch_tree_node(&self, request: &TreeNodeRequest) -> Result<TreeNodeResponse> {
        let response = self.executor.execute(&request.to_request()).await?;

        match response.status {
            200 => self.parse_fragment(request, &response),
            301 | 302 | 303 | 307 | 308 => redirect(request, &response),
            304 => Ok(TreeNodeResponse {
                relations: Vec::new(),
                members: Vec::new(),
                mutability: self.mutability_of(&response),
            }),
            status => Err(LdesError::UnexpectedStatus {
                url: request.url.clone(),
                status,
            }),
        }
    }

    fn mutability_of(&self, response: &Response) -> MutabilityStatus {
        MutabilityStatus::from_cache_control(
            response.header(CACHE_CONTROL.as_str()),
            Utc::now(),
            self.polling_interval,
        )
    }

    fn parse_fragment(
        &self,
        request: &TreeNodeRequest,
        response: &Response,
    ) -> Result<TreeNodeResponse> {
        let body = response.body.as_deref().ok_or_else(|| LdesError::MissingBody {
            url: request.url.clone(),
        })?;

        let graph = parse_graph(body, request.format, &request.url).map_err(|message| {
            LdesError::RdfParse {
                url: request.url.clone(),
                message,
            }
        })?;

        let members = extract_members(&graph)
            .into_iter()
            .map(|(id, model)| TreeMember {
                created_at: self.timestamps.extract(&model),
                id,
                model,
            })
            .collect();

        Ok(TreeNodeResponse {
            relations: extract_relations(&graph),
            members,
            mutability: self.mutability_of(response),
        })
    }
}

fn redirect(request: &TreeNodeRequest, response: &Response) -> Result<TreeNodeResponse> {
    let location = response
        .header(LOCATION.as_str())
        .ok_or_else(|| LdesError::MissingLocation {
            url: request.url.clone(),
        })?;
    let target = Url::parse(&request.url)?.join(location)?;

    tracing::debug!("{} redirects to {}", request.url, target);

    Ok(TreeNodeResponse {
        relations: vec![target.to_string()],
        members: Vec::new(),
        mutability: MutabilityStatus::immutable(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::timestamp::CurrentTimeExtractor;
    use crate::executor::DefaultRequestExecutor;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROOT: &str = r#"
@prefix tree: <https://w3id.org/tree#> .
@prefix ex: <https://example.com/ns#> .

<root> tree:relation [ tree:node <page2> ] .
<stream> tree:member <m1>, <m2> .
<m1> ex:title "one" .
<m2> ex:title "two" .
"#;

    fn fetcher() -> TreeNodeFetcher {
        TreeNodeFetcher::new(
            Arc::new(DefaultRequestExecutor::new().unwrap()),
            Arc::new(CurrentTimeExtractor),
            Duration::from_secs(60),
        )
    }

    fn turtle(url: String) -> TreeNodeRequest {
        TreeNodeRequest::new(url, RdfFormat::Turtle)
    }

    #[tokio::test]
    async fn test_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/root"))
            .and(header("accept", "text/turtle"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "max-age=60")
                    .set_body_string(ROOT),
            )
            .mount(&server)
            .await;

        let before = Utc::now();
        let response = fetcher()
            .fetch_tree_node(&turtle(format!("{}/root", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.relations, vec![format!("{}/page2", server.uri())]);
        assert_eq!(response.members.len(), 2);
        assert!(response.members.iter().all(|m| m.model.len() == 1));
        assert!(!response.mutability.is_immutable());
        assert!(response.mutability.earliest_next_visit() >= before + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_redirect_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/page?id=7"))
            .mount(&server)
            .await;

        let response = fetcher()
            .fetch_tree_node(&turtle(format!("{}/latest", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.relations, vec![format!("{}/page?id=7", server.uri())]);
        assert!(response.members.is_empty());
        assert!(response.mutability.is_immutable());
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let error = fetcher()
            .fetch_tree_node(&turtle(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(error, LdesError::MissingLocation { .. }));
    }

    #[tokio::test]
    async fn test_not_modified_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(304).insert_header("cache-control", "max-age=5"))
            .mount(&server)
            .await;

        let response = fetcher()
            .fetch_tree_node(&turtle(server.uri()))
            .await
            .unwrap();

        assert!(response.relations.is_empty());
        assert!(response.members.is_empty());
        assert!(!response.mutability.is_immutable());
    }

    #[tokio::test]
    async fn test_unexpected_status_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = fetcher()
            .fetch_tree_node(&turtle(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            LdesError::UnexpectedStatus { status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a> <b> ."))
            .mount(&server)
            .await;

        let error = fetcher()
            .fetch_tree_node(&turtle(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(error, LdesError::RdfParse { .. }));
    }

    #[test]
    fn test_metadata_request() {
        let metadata = LdesMetaData::new(vec!["https://example.com/".to_string()], RdfFormat::NTriples);
        let request = metadata.create_request("https://example.com/1").to_request();

        assert_eq!(request.headers[0].value, "application/n-triples");
        assert_eq!(metadata.starting_urls().len(), 1);
    }
}
