use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Uri};
use hyper::Body;
use log::{debug, trace};
use stress_types::RequestTemplate;
use url::Url;

use crate::ConfigError;

/// A request ready to be sent. Every instance owns its headers and body.
#[derive(Debug, Clone)]
pub struct ConcreteRequest {
    template_index: usize,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ConcreteRequest {
    /// position of the originating template in the configured template list
    pub fn template_index(&self) -> usize {
        self.template_index
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn into_hyper(self) -> hyper::Request<Body> {
        let body = self.body.map(Body::from).unwrap_or_else(Body::empty);
        let mut request = hyper::Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Validated form of an enabled template
struct Prototype {
    template_index: usize,
    weight: u64,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Prototype {
    fn new(
        template_index: usize,
        template: &RequestTemplate,
        method: Method,
        extra_headers: &[(HeaderName, HeaderValue)],
    ) -> Result<Self, ConfigError> {
        let uri = parse_url(&template.url)?;
        let mut headers = HeaderMap::with_capacity(extra_headers.len() + 1);
        if !template.content_type.is_empty() {
            let content_type = HeaderValue::from_str(&template.content_type).map_err(|_| {
                ConfigError::InvalidHeader(format!("Content-Type: {}", &template.content_type))
            })?;
            headers.insert(CONTENT_TYPE, content_type);
        }
        for (name, value) in extra_headers {
            headers.append(name.clone(), value.clone());
        }
        let body = if template.body.is_empty() {
            None
        } else {
            Some(Bytes::copy_from_slice(template.body.as_bytes()))
        };
        Ok(Prototype {
            template_index,
            weight: template.weight as u64,
            method,
            uri,
            headers,
            body,
        })
    }

    fn materialize(&self) -> ConcreteRequest {
        ConcreteRequest {
            template_index: self.template_index,
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Expand weighted templates into exactly `total` requests.
///
/// Templates are picked by weighted round-robin: request `i` comes from the template owning slot
/// `i % total_weight` when every template is laid out `weight` times in order. Weights `[2, 1]`
/// give `T1, T1, T2, T1, T1, T2, ...`.
///
/// Templates with an empty method are skipped. If all weights are zero the first enabled
/// template is used for every request.
pub fn expand_requests(
    templates: &[RequestTemplate],
    raw_headers: &[String],
    total: usize,
) -> Result<Vec<ConcreteRequest>, ConfigError> {
    let extra_headers = raw_headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut prototypes = Vec::with_capacity(templates.len());
    for (idx, template) in templates.iter().enumerate() {
        if !template.is_enabled() {
            debug!("[expand_requests] - template {} disabled, skipping", idx);
            continue;
        }
        let method = match template.method.to_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            _ => return Err(ConfigError::UnsupportedMethod(template.method.clone())),
        };
        trace!("[expand_requests] - template {}: {}", idx, template);
        prototypes.push(Prototype::new(idx, template, method, &extra_headers)?);
    }

    if total == 0 {
        return Ok(vec![]);
    }

    // cumulative[k] = sum of weights of prototypes 0..=k
    let cumulative = prototypes
        .iter()
        .scan(0u64, |sum, prototype| {
            *sum += prototype.weight;
            Some(*sum)
        })
        .collect::<Vec<_>>();
    let total_weight = cumulative.last().copied().unwrap_or(0);
    let fallback = prototypes.first().ok_or(ConfigError::NoTemplate)?;
    if total_weight == 0 {
        debug!("[expand_requests] - total weight is zero, using the first template only");
    }
    let total_weight = total_weight.max(1);

    let requests = (0..total as u64)
        .map(|i| {
            let slot = i % total_weight;
            let pos = cumulative.partition_point(|&upper| upper <= slot);
            prototypes.get(pos).unwrap_or(fallback).materialize()
        })
        .collect();
    Ok(requests)
}

/// `Name: Value`, split on the first colon. Both sides are trimmed.
fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = || ConfigError::InvalidHeader(raw.to_string());
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}

fn parse_url(raw: &str) -> Result<Uri, ConfigError> {
    let build_error = |reason: String| ConfigError::RequestBuild {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| build_error(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(build_error(format!("unsupported scheme {}", url.scheme())));
    }
    if !url.has_host() {
        return Err(build_error("missing host".to_string()));
    }
    Uri::try_from(url.as_str()).map_err(|e| build_error(e.to_string()))
}
