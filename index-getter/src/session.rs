use crate::error::{Error, Result};
use crate::metric::{HttpMetric, HttpResponseMetric};
use reqwest::{Client, Method, Url};
use std::time::Instant;
use typed_builder::TypedBuilder;

/// HTTP client bound to the host under test.
///
/// Every request goes out exactly as asked for: no extra headers, no body and
/// no query string. The outcome is turned into an [`HttpMetric`] instead of an
/// error so it can be fed to the aggregate.
#[derive(Clone, Debug, TypedBuilder)]
pub struct HttpSession {
    #[builder(default = Client::new())]
    client: Client,

    host: Url,
}

impl HttpSession {
    /// Parses `host` and binds a default client to it. A host carrying a query
    /// or a fragment is rejected.
    pub fn new(host: &str) -> Result<Self> {
        let host = parse_url(host)?;
        if host.query().is_some() || host.fragment().is_some() {
            return Err(Error::InvalidUrl {
                url: host.to_string(),
                reason: "host must not carry a query or fragment".into(),
            });
        }
        Ok(Self::builder().host(host).build())
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Same host, fresh client with a connection pool of its own.
    pub fn fork(&self) -> Self {
        Self::builder().host(self.host.clone()).build()
    }

    /// Appends `path` to the host's path. Only the query given in `path` is
    /// sent; the host's own query and fragment are dropped. Absolute URLs are
    /// taken as they are.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return parse_url(path);
        }
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let mut url = self.host.clone();
        let joined = format!("{}{path}", url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(query);
        url.set_fragment(None);
        Ok(url)
    }

    pub async fn get(&self, path: &str) -> HttpMetric {
        self.request(Method::GET, path).await
    }

    pub async fn request(&self, method: Method, path: &str) -> HttpMetric {
        let failure = |reason: String| {
            tracing::debug!(%method, path, "Request failed: {reason}");
            HttpMetric::Failure {
                method: method.to_string(),
                name: path.to_owned(),
                reason,
            }
        };

        let url = match self.url_for(path) {
            Ok(url) => url,
            Err(err) => return failure(err.to_string()),
        };

        let start = Instant::now();
        let res = match self.client.request(method.clone(), url).send().await {
            Ok(res) => res,
            Err(err) => return failure(err.to_string()),
        };
        let status_code = res.status().as_u16();
        let body = match res.bytes().await {
            Ok(body) => body,
            Err(err) => return failure(err.to_string()),
        };
        let latency = start.elapsed();

        HttpMetric::Success(HttpResponseMetric {
            method: method.to_string(),
            name: path.to_owned(),
            latency,
            status_code,
            bytes_sent: 0,
            bytes_received: body.len() as u64,
        })
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|err| Error::InvalidUrl {
        url: url.to_owned(),
        reason: err.to_string(),
    })
}
