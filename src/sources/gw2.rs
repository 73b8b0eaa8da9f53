use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::sources::catalog::{Area, Floor};
use crate::sources::CatalogFetcher;

/// Blocking client for the public map API.
pub struct ApiFetcher {
    client: Client,
    base: String,
}

impl ApiFetcher {
    pub fn new(api_base: &str) -> Result<Self, FetchError> {
        let base = api_base.trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!("wayfinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Http {
                url: base.clone(),
                source,
            })?;
        Ok(Self { client, base })
    }

    fn area_url(&self, area_id: u32) -> String {
        format!("{}/continents/{}", self.base, area_id)
    }

    fn floor_url(&self, area_id: u32, floor_id: i32) -> String {
        format!("{}/continents/{}/floors/{}", self.base, area_id, floor_id)
    }

    fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(&url).send().map_err(|source| FetchError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| FetchError::Http {
            url: url.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

impl CatalogFetcher for ApiFetcher {
    fn area(&self, area_id: u32) -> Result<Area, FetchError> {
        self.get_json(self.area_url(area_id))
    }

    fn floor(&self, area_id: u32, floor_id: i32) -> Result<Floor, FetchError> {
        self.get_json(self.floor_url(area_id, floor_id))
    }
}
