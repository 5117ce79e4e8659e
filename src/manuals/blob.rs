//! Blob 存储访问
//!
//! BlobStore 抽象出手册检索需要的三个操作：存在性检查、按文本下载、列出条目。
//! HttpBlobStore 通过 Azure Blob REST 接口实现，连接串格式与 Azure Storage 一致；
//! 认证方式：SAS、账户密钥（Shared Key 请求签名）或匿名（公开容器）。

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode, Url};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Azurite 本地模拟器的默认 Blob 端点、账户与公开的固定密钥
const DEV_STORAGE_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEV_STORAGE_ACCOUNT: &str = "devstoreaccount1";
const DEV_STORAGE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// 请求头 x-ms-version
pub const STORAGE_VERSION: &str = "2021-08-06";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("invalid blob url: {0}")]
    InvalidUrl(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("blob is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 远端文档容器
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, blob_name: &str) -> Result<bool, StoreError>;

    async fn download_text(&self, blob_name: &str) -> Result<String, StoreError>;

    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// 请求凭据
#[derive(Clone, PartialEq)]
pub enum BlobCredential {
    Anonymous,
    /// SAS 查询串（不含前导 `?`）
    Sas(String),
    /// 账户名 + 解码后的账户密钥，按 Shared Key 方案签名每个请求
    SharedKey { account: String, key: Vec<u8> },
}

impl std::fmt::Debug for BlobCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Sas(_) => f.write_str("Sas(..)"),
            Self::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .finish_non_exhaustive(),
        }
    }
}

/// 解析后的连接串：Blob 端点 + 凭据
#[derive(Debug, Clone, PartialEq)]
pub struct BlobConnection {
    pub endpoint: Url,
    pub credential: BlobCredential,
}

impl BlobConnection {
    /// 解析 `Key=Value;...` 形式的连接串
    ///
    /// 支持 BlobEndpoint、DefaultEndpointsProtocol + AccountName + EndpointSuffix、
    /// SharedAccessSignature、AccountKey、UseDevelopmentStorage=true。
    /// 同时给出 SAS 与 AccountKey 时使用 SAS。
    pub fn parse(connection_string: &str) -> Result<Self, StoreError> {
        let mut blob_endpoint = None;
        let mut protocol = "https".to_string();
        let mut account = None;
        let mut suffix = "core.windows.net".to_string();
        let mut sas = None;
        let mut dev_storage = false;
        let mut account_key = None;

        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StoreError::InvalidConnectionString(format!("segment without '=': {}", part))
            })?;
            match key {
                "BlobEndpoint" => blob_endpoint = Some(value.to_string()),
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "AccountName" => account = Some(value.to_string()),
                "EndpointSuffix" => suffix = value.to_string(),
                "SharedAccessSignature" => {
                    sas = Some(value.trim_start_matches('?').to_string())
                }
                "UseDevelopmentStorage" => dev_storage = value.eq_ignore_ascii_case("true"),
                "AccountKey" => account_key = Some(value.to_string()),
                _ => {}
            }
        }

        let endpoint = match (blob_endpoint, account.as_deref(), dev_storage) {
            (Some(ep), _, _) => ep,
            (None, _, true) => DEV_STORAGE_ENDPOINT.to_string(),
            (None, Some(account), false) => format!("{}://{}.blob.{}", protocol, account, suffix),
            (None, None, false) => {
                return Err(StoreError::InvalidConnectionString(
                    "neither BlobEndpoint nor AccountName present".to_string(),
                ))
            }
        };
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let credential = match (sas, account_key) {
            (Some(sas), _) => BlobCredential::Sas(sas),
            (None, Some(key)) => {
                let account = account
                    .or_else(|| dev_storage.then(|| DEV_STORAGE_ACCOUNT.to_string()))
                    .ok_or_else(|| {
                        StoreError::InvalidConnectionString(
                            "AccountKey given without AccountName".to_string(),
                        )
                    })?;
                shared_key_credential(account, &key)?
            }
            (None, None) if dev_storage => {
                shared_key_credential(DEV_STORAGE_ACCOUNT.to_string(), DEV_STORAGE_KEY)?
            }
            (None, None) => BlobCredential::Anonymous,
        };

        Ok(Self {
            endpoint,
            credential,
        })
    }

    fn sas(&self) -> Option<&str> {
        match &self.credential {
            BlobCredential::Sas(sas) if !sas.is_empty() => Some(sas.as_str()),
            _ => None,
        }
    }
}

fn shared_key_credential(account: String, key: &str) -> Result<BlobCredential, StoreError> {
    let key = BASE64.decode(key.trim()).map_err(|e| {
        StoreError::InvalidConnectionString(format!("AccountKey is not base64: {}", e))
    })?;
    Ok(BlobCredential::SharedKey { account, key })
}

/// Shared Key 待签名串
///
/// `VERB` + 11 个标准头（GET/HEAD 无请求体，均为空）+ 排序后的 `x-ms-*` 头 +
/// `/<account><path>` + 按参数名排序的查询参数（`\nname:value`）。
pub fn string_to_sign(method: &str, url: &Url, account: &str, ms_headers: &[(&str, &str)]) -> String {
    let mut out = String::from(method);
    out.push_str(&"\n".repeat(12));

    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    headers.sort();
    for (name, value) in headers {
        out.push_str(&format!("{}:{}\n", name, value));
    }

    out.push('/');
    out.push_str(account);
    out.push_str(url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push_str(&format!("\n{}:{}", name, values.join(",")));
    }
    out
}

/// base64(HMAC-SHA256(key, string_to_sign))
pub fn shared_key_signature(key: &[u8], string_to_sign: &str) -> Result<String, StoreError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::InvalidConnectionString(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Azure Blob REST 客户端（单容器）
pub struct HttpBlobStore {
    client: reqwest::Client,
    connection: BlobConnection,
    container: String,
}

impl HttpBlobStore {
    pub fn new(connection: BlobConnection, container: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            connection,
            container: container.into(),
        }
    }

    pub fn from_connection_string(
        connection_string: &str,
        container: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(BlobConnection::parse(connection_string)?, container))
    }

    fn container_url(&self) -> Result<Url, StoreError> {
        let mut url = self.connection.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.connection.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.container);
        Ok(url)
    }

    fn blob_url(&self, blob_name: &str) -> Result<Url, StoreError> {
        let mut url = self.container_url()?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.connection.endpoint.to_string()))?
            .push(blob_name);
        url.set_query(self.connection.sas());
        Ok(url)
    }

    fn list_url(&self, marker: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.container_url()?;
        let query = match self.connection.sas() {
            Some(sas) => format!("restype=container&comp=list&{}", sas),
            None => "restype=container&comp=list".to_string(),
        };
        url.set_query(Some(&query));
        if let Some(marker) = marker {
            url.query_pairs_mut().append_pair("marker", marker);
        }
        Ok(url)
    }

    /// 构造请求；Shared Key 凭据时附加 x-ms-date 与 Authorization
    fn request(&self, method: Method, url: &Url) -> Result<reqwest::RequestBuilder, StoreError> {
        let builder = self
            .client
            .request(method.clone(), url.clone())
            .header("x-ms-version", STORAGE_VERSION);
        let BlobCredential::SharedKey { account, key } = &self.connection.credential else {
            return Ok(builder);
        };

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let to_sign = string_to_sign(
            method.as_str(),
            url,
            account,
            &[("x-ms-date", date.as_str()), ("x-ms-version", STORAGE_VERSION)],
        );
        let signature = shared_key_signature(key, &to_sign)?;
        Ok(builder
            .header("x-ms-date", date)
            .header(AUTHORIZATION, format!("SharedKey {}:{}", account, signature)))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn exists(&self, blob_name: &str) -> Result<bool, StoreError> {
        let url = self.blob_url(blob_name)?;
        let resp = self.request(Method::HEAD, &url)?.send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(StoreError::Status {
                status: s.as_u16(),
                url: redact(&url),
            }),
        }
    }

    async fn download_text(&self, blob_name: &str) -> Result<String, StoreError> {
        let url = self.blob_url(blob_name)?;
        let resp = self.request(Method::GET, &url)?.send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status {
                status: resp.status().as_u16(),
                url: redact(&url),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let url = self.list_url(marker.as_deref())?;
            let resp = self.request(Method::GET, &url)?.send().await?;
            if !resp.status().is_success() {
                return Err(StoreError::Status {
                    status: resp.status().as_u16(),
                    url: redact(&url),
                });
            }
            let body = resp.text().await?;
            let page = parse_list_blobs(&body);
            names.extend(page.names);
            match page.next_marker.filter(|m| !m.trim().is_empty()) {
                Some(m) if seen.insert(m.clone()) => marker = Some(m),
                Some(m) => {
                    tracing::warn!(marker = %m, container = %self.container, "list blobs returned a repeated marker, stopping");
                    break;
                }
                None => break,
            }
        }
        Ok(names)
    }
}

/// List Blobs 响应的一页
#[derive(Debug, Default, PartialEq)]
pub struct ListPage {
    pub names: Vec<String>,
    pub next_marker: Option<String>,
}

/// 从 List Blobs 的 XML 响应中提取 Blob 名与 NextMarker
pub fn parse_list_blobs(xml: &str) -> ListPage {
    let name_re = Regex::new(r"<Blob>\s*<Name>([^<]*)</Name>").ok();
    let marker_re = Regex::new(r"<NextMarker>([^<]+)</NextMarker>").ok();
    let names: Vec<String> = name_re
        .map(|re| {
            re.captures_iter(xml)
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect()
        })
        .unwrap_or_default();
    let next_marker = marker_re
        .and_then(|re| re.captures(xml))
        .and_then(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()));
    ListPage { names, next_marker }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// 日志中隐藏 SAS 签名
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
