// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission transport for the registry document-creation API.
//!
//! The transport is called once per admitted slot. It base64-encodes the
//! document and its signature, wraps them in the JSON body the registry
//! expects and POSTs it with the caller's bearer token. The raw response
//! body is handed back unparsed.

use crate::config::RegistryConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Path of the document-creation endpoint, relative to the registry base URL.
pub const DOCUMENT_CREATE_PATH: &str = "api/v3/lk/documents/create";

/// Document types accepted by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Introduction into circulation, manual JSON entry
    LpIntroduceGoods,
    /// Introduction into circulation, CSV upload
    LpIntroduceGoodsCsv,
    /// Introduction into circulation, XML upload
    LpIntroduceGoodsXml,
}

impl DocumentType {
    /// Value of the `type` body field.
    pub fn name(self) -> &'static str {
        match self {
            Self::LpIntroduceGoods => "LP_INTRODUCE_GOODS",
            Self::LpIntroduceGoodsCsv => "LP_INTRODUCE_GOODS_CSV",
            Self::LpIntroduceGoodsXml => "LP_INTRODUCE_GOODS_XML",
        }
    }

    /// Value of the `document_format` body field.
    pub fn format(self) -> &'static str {
        match self {
            Self::LpIntroduceGoods => "MANUAL",
            Self::LpIntroduceGoodsCsv => "CSV",
            Self::LpIntroduceGoodsXml => "XML",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LP_INTRODUCE_GOODS" => Ok(Self::LpIntroduceGoods),
            "LP_INTRODUCE_GOODS_CSV" => Ok(Self::LpIntroduceGoodsCsv),
            "LP_INTRODUCE_GOODS_XML" => Ok(Self::LpIntroduceGoodsXml),
            _ => Err(format!("unknown document type: {s}")),
        }
    }
}

/// Product groups and their registry codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductGroup {
    Clothes,
    Shoes,
    Tobacco,
    Perfumery,
    Tires,
    Electronics,
    Pharma,
    Milk,
    Bicycle,
    Wheelchairs,
}

impl ProductGroup {
    pub const ALL: [ProductGroup; 10] = [
        Self::Clothes,
        Self::Shoes,
        Self::Tobacco,
        Self::Perfumery,
        Self::Tires,
        Self::Electronics,
        Self::Pharma,
        Self::Milk,
        Self::Bicycle,
        Self::Wheelchairs,
    ];

    /// Numeric code sent in the `product_group` body field.
    pub fn code(self) -> u8 {
        match self {
            Self::Clothes => 1,
            Self::Shoes => 2,
            Self::Tobacco => 3,
            Self::Perfumery => 4,
            Self::Tires => 5,
            Self::Electronics => 6,
            Self::Pharma => 7,
            Self::Milk => 8,
            Self::Bicycle => 9,
            Self::Wheelchairs => 10,
        }
    }

    /// Name sent in the `pg` query parameter.
    pub fn name(self) -> &'static str {
        match self {
            Self::Clothes => "clothes",
            Self::Shoes => "shoes",
            Self::Tobacco => "tobacco",
            Self::Perfumery => "perfumery",
            Self::Tires => "tires",
            Self::Electronics => "electronics",
            Self::Pharma => "pharma",
            Self::Milk => "milk",
            Self::Bicycle => "bicycle",
            Self::Wheelchairs => "wheelchairs",
        }
    }
}

impl fmt::Display for ProductGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProductGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|group| group.name() == lower)
            .ok_or_else(|| format!("unknown product group: {s}"))
    }
}

/// Everything needed to submit one document.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    /// Document content, sent base64-encoded
    pub document: String,
    /// Detached signature, sent base64-encoded
    pub signature: String,
    pub document_type: DocumentType,
    pub product_group: ProductGroup,
    /// Bearer token supplied by the caller
    pub token: String,
}

/// JSON body of the document-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCreationBody {
    pub document_format: &'static str,
    pub product_document: String,
    pub product_group: u8,
    pub signature: String,
    #[serde(rename = "type")]
    pub document_type: &'static str,
}

impl DocumentCreationBody {
    pub fn new(request: &DocumentRequest) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            document_format: request.document_type.format(),
            product_document: engine.encode(request.document.as_bytes()),
            product_group: request.product_group.code(),
            signature: engine.encode(request.signature.as_bytes()),
            document_type: request.document_type.name(),
        }
    }
}

/// Build the document-creation URL for `group` under `base`.
pub fn document_endpoint(base: &Url, group: ProductGroup) -> Result<Url, TransportError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base
        .join(DOCUMENT_CREATE_PATH)
        .map_err(|source| TransportError::InvalidEndpoint {
            url: base.to_string(),
            source,
        })?;
    url.query_pairs_mut().append_pair("pg", group.name());
    Ok(url)
}

/// Sends admitted submissions to the registry.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Submit one document and return the raw response body.
    async fn submit(&self, request: &DocumentRequest) -> Result<String, TransportError>;
}

/// HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the configured registry.
    pub fn new(config: &RegistryConfig) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|source| TransportError::InvalidEndpoint {
                url: config.base_url.clone(),
                source,
            })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn submit(&self, request: &DocumentRequest) -> Result<String, TransportError> {
        let url = document_endpoint(&self.base_url, request.product_group)?;
        let body = serde_json::to_vec(&DocumentCreationBody::new(request))?;

        debug!(
            %url,
            document_type = %request.document_type,
            body_len = body.len(),
            "Submitting document"
        );

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&request.token)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), response_len = text.len(), "Registry responded");

        Ok(text)
    }
}
