use super::{DEFAULT_USER_AGENT, FetchedPage, Fetcher};
use crate::cookies::Cookie;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Plain HTTP GET back-end with a per-run cookie jar.
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(start_url: &Url, cookies: &[Cookie]) -> Result<Self> {
        Self::with_timeout(start_url, cookies, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(start_url: &Url, cookies: &[Cookie], timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_provider(cookie_jar(start_url, cookies))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

/// Cookie jar holding `cookies` for the start host, path `/`.
pub fn cookie_jar(start_url: &Url, cookies: &[Cookie]) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());
    for cookie in cookies {
        // Domain cookies reach subdomains too; IP hosts only take host-only cookies.
        let cookie_str = match start_url.domain() {
            Some(domain) => format!("{}={}; Domain={}; Path=/", cookie.name, cookie.value, domain),
            None => format!("{}={}; Path=/", cookie.name, cookie.value),
        };
        jar.add_cookie_str(&cookie_str, start_url);
    }
    if !cookies.is_empty() {
        debug!("Loaded {} cookies for {}", cookies.len(), start_url);
    }
    jar
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScanError::Timeout(self.timeout_secs)
            } else {
                ScanError::HttpError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status(status.as_u16()));
        }
        let final_url = response.url().to_string();
        let html = response.text().await?;

        Ok(FetchedPage {
            status: Some(status.as_u16()),
            html,
            final_url,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::parse_cookie_string;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn server_with(path_str: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(path_str))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn fetches_body_and_status() {
        let mock_server = server_with(
            "/",
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>hello</body></html>"),
        )
        .await;

        let start = Url::parse(&mock_server.uri()).unwrap();
        let fetcher = HttpFetcher::new(&start, &[]).unwrap();
        let page = fetcher.fetch(&format!("{}/", mock_server.uri())).await.unwrap();

        assert_eq!(page.status, Some(200));
        assert!(page.html.contains("hello"));
        assert_eq!(page.final_url, format!("{}/", mock_server.uri()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure() {
        let mock_server = server_with("/missing", ResponseTemplate::new(404)).await;

        let start = Url::parse(&mock_server.uri()).unwrap();
        let fetcher = HttpFetcher::new(&start, &[]).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Status(404)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let mock_server = server_with(
            "/slow",
            ResponseTemplate::new(200).set_delay(Duration::from_millis(2500)),
        )
        .await;

        let start = Url::parse(&mock_server.uri()).unwrap();
        let fetcher = HttpFetcher::with_timeout(&start, &[], 1).unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Timeout(1)), "got {:?}", err);
    }

    #[tokio::test]
    async fn sends_cookies_and_user_agent() {
        let mock_server = server_with("/", ResponseTemplate::new(200)).await;

        let start = Url::parse(&mock_server.uri()).unwrap();
        let cookies = parse_cookie_string("sid=abc; theme = dark; broken");
        let fetcher = HttpFetcher::new(&start, &cookies).unwrap();
        fetcher.fetch(&format!("{}/", mock_server.uri())).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;

        let cookie_header = headers.get("cookie").unwrap().to_str().unwrap();
        let mut sent: Vec<&str> = cookie_header.split("; ").collect();
        sent.sort();
        assert_eq!(sent, vec!["sid=abc", "theme=dark"]);

        let user_agent = headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(user_agent, DEFAULT_USER_AGENT);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let start = Url::parse("http://127.0.0.1:1/").unwrap();
        let fetcher = HttpFetcher::new(&start, &[]).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, ScanError::HttpError(_)));
    }
}
