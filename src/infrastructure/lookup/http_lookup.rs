// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::LookupSettings;
use crate::domain::models::product::ProductRecord;
use crate::domain::services::part_lookup::{LookupError, PartLookup};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 基于HTTP的料号查询
///
/// 请求 `GET {base_url}/parts/{mpn}?currency={region}`：
/// 200 返回产品，404 表示数据源没有该料号，
/// 408/429/5xx 与网络错误可重试，其余 4xx 及无法解析的响应不可重试。
pub struct HttpPartLookup {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpPartLookup {
    /// 创建查询客户端
    ///
    /// # 参数
    ///
    /// * `settings` - 查询服务配置
    /// * `timeout` - 单次请求超时
    pub fn new(settings: &LookupSettings, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("lookup base url cannot be a base: {}", settings.base_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("mpncrawl/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
        })
    }

    fn part_url(&self, identifier: &str, region: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Fatal("invalid lookup base url".to_string()))?
            .pop_if_empty()
            .push("parts")
            .push(identifier);
        url.query_pairs_mut().append_pair("currency", region);
        Ok(url)
    }
}

fn classify_status(status: StatusCode) -> LookupError {
    let message = format!("lookup responded with {}", status);
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        LookupError::Transient(message)
    } else {
        LookupError::Fatal(message)
    }
}

fn classify_transport(error: reqwest::Error) -> LookupError {
    if error.is_builder() {
        LookupError::Fatal(error.to_string())
    } else {
        LookupError::Transient(error.to_string())
    }
}

#[async_trait]
impl PartLookup for HttpPartLookup {
    async fn lookup(
        &self,
        identifier: &str,
        region: &str,
    ) -> Result<Option<ProductRecord>, LookupError> {
        let url = self.part_url(identifier, region)?;
        debug!(%url, "Looking up part");

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        let record: ProductRecord = serde_json::from_slice(&body)
            .map_err(|e| LookupError::Fatal(format!("undecodable lookup response: {}", e)))?;

        Ok(Some(record))
    }
}
