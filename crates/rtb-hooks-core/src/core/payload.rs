// crates/rtb-hooks-core/src/core/payload.rs
// ============================================================================
// Module: RTB Hooks Stage Payloads
// Description: Stage-specific payloads handed to hooks.
// Purpose: Expose only the fields relevant to each stage.
// Dependencies: axum (http types), bytes, url
// ============================================================================

//! ## Overview
//! Each stage has its own payload type. The engine is generic over
//! [`StagePayload`]; payloads are cloned once per hook so hooks in one group
//! never observe each other's in-flight changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use bytes::Bytes;
use url::form_urlencoded;

use crate::core::changeset::MutationError;
use crate::core::ortb::BidRequest;
use crate::core::ortb::BidResponse;
use crate::core::ortb::TypedBid;

// ============================================================================
// SECTION: Payload Trait
// ============================================================================

/// Payload type a stage executes over.
///
/// # Invariants
/// - Cloning yields an independent snapshot; hooks own their copy.
pub trait StagePayload: Clone + Send + Sync + 'static {
    /// Returns the bid request carried by the payload, if any.
    ///
    /// Payloads exposing a bid request are subject to privacy activity
    /// scrubbing before a restricted module sees them.
    fn bid_request_mut(&mut self) -> Option<&mut BidRequest> {
        None
    }
}

// ============================================================================
// SECTION: HTTP Request
// ============================================================================

/// Incoming HTTP request as seen by entrypoint hooks.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Request URI including query string.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
}

impl HttpRequest {
    /// Creates a request with no headers.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    /// Returns the decoded query parameters in order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_pairs().into_iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Appends a query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`] when the resulting URI is invalid.
    pub fn add_query_param(&mut self, name: &str, value: &str) -> Result<(), MutationError> {
        let mut pairs = self.query_pairs();
        pairs.push((name.to_string(), value.to_string()));
        self.set_query(&pairs)
    }

    /// Removes every value of a query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`] when the parameter is absent or the URI is invalid.
    pub fn remove_query_param(&mut self, name: &str) -> Result<(), MutationError> {
        let mut pairs = self.query_pairs();
        let before = pairs.len();
        pairs.retain(|(key, _)| key != name);
        if pairs.len() == before {
            return Err(MutationError::new(format!("query param not found: {name}")));
        }
        self.set_query(&pairs)
    }

    /// Appends a header value.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`] when the name or value is not a valid header.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), MutationError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| MutationError::new(format!("invalid header name: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| MutationError::new(format!("invalid header value: {err}")))?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Rebuilds the URI with the provided query pairs.
    fn set_query(&mut self, pairs: &[(String, String)]) -> Result<(), MutationError> {
        let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();
        let path = self.uri.path();
        let path_and_query =
            if query.is_empty() { path.to_string() } else { format!("{path}?{query}") };
        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = Some(
            PathAndQuery::try_from(path_and_query.as_str())
                .map_err(|err| MutationError::new(format!("invalid query: {err}")))?,
        );
        self.uri = Uri::from_parts(parts)
            .map_err(|err| MutationError::new(format!("invalid uri: {err}")))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Stage Payloads
// ============================================================================

/// Entrypoint stage payload: raw HTTP request and body.
#[derive(Debug, Clone)]
pub struct EntrypointPayload {
    /// HTTP request metadata.
    pub request: HttpRequest,
    /// Raw request body.
    pub body: Bytes,
}

impl StagePayload for EntrypointPayload {}

/// Raw auction request stage payload: unparsed request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAuctionRequestPayload {
    /// Raw JSON body.
    pub body: Bytes,
}

impl StagePayload for RawAuctionRequestPayload {}

/// Processed auction request stage payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedAuctionRequestPayload {
    /// Parsed and validated bid request.
    pub request: BidRequest,
}

impl StagePayload for ProcessedAuctionRequestPayload {
    fn bid_request_mut(&mut self) -> Option<&mut BidRequest> {
        Some(&mut self.request)
    }
}

/// Bidder request stage payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderRequestPayload {
    /// Bidder the request is destined for.
    pub bidder: String,
    /// Bidder-specific bid request.
    pub request: BidRequest,
}

impl StagePayload for BidderRequestPayload {
    fn bid_request_mut(&mut self) -> Option<&mut BidRequest> {
        Some(&mut self.request)
    }
}

/// Raw bidder response stage payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBidderResponsePayload {
    /// Bidder the bids came from.
    pub bidder: String,
    /// Typed bids returned by the adapter.
    pub bids: Vec<TypedBid>,
}

impl StagePayload for RawBidderResponsePayload {}

/// All-processed-bid-responses stage payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllProcessedBidResponsesPayload {
    /// Processed bids keyed by bidder.
    pub responses: BTreeMap<String, Vec<TypedBid>>,
}

impl StagePayload for AllProcessedBidResponsesPayload {}

/// Auction response stage payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionResponsePayload {
    /// Final bid response.
    pub response: BidResponse,
}

impl StagePayload for AuctionResponsePayload {}
