extern crate quick_xml;
extern crate serde;

use std::{error::Error, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusoto_core::{
    credential::{AwsCredentials, ProfileProvider, ProvideAwsCredentials, StaticProvider},
    ByteStream, HttpClient, Region, RusotoError,
};
use rusoto_s3::{
    util::{PreSignedRequest, PreSignedRequestOption},
    DeleteObjectRequest, GetObjectOutput, GetObjectRequest, HeadObjectError, HeadObjectRequest,
    ListObjectsV2Request, S3Client, S3,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ObjectListing, ObjectStore, ObjectSummary};
use crate::{config::StoreConfig, error::StoreError};

/// Error document returned in the body of failed S3 requests
#[derive(Debug, Deserialize)]
pub struct S3Error {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

impl S3Error {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn parse_error_body(text: &str) -> Option<S3Error> {
    quick_xml::de::from_str::<S3Error>(text)
        .ok()
        .filter(|e| !e.code.is_empty())
}

fn into_store_error(err: S3Error, key: Option<&str>) -> StoreError {
    match (err.code.as_str(), key) {
        ("NoSuchKey", Some(key)) => StoreError::NotFound(key.to_owned()),
        _ => StoreError::Service {
            code: err.code,
            message: err.message,
        },
    }
}

/// S3 (or S3-compatible) bucket accessed through rusoto
pub struct S3Provider {
    pub bucket_name: String,
    region: Region,
    credentials: AwsCredentials,
    s3_client: S3Client,
}

impl S3Provider {
    /// Maps a rusoto error to a StoreError
    ///
    /// * `err` - error returned by the client
    /// * `key` - OPTIONAL key the request was about, used to report missing objects
    fn handle_error(err: RusotoError<impl Error>, key: Option<&str>) -> StoreError {
        match err {
            RusotoError::Unknown(buf) => match parse_error_body(buf.body_as_str()) {
                Some(s3_err) => into_store_error(s3_err, key),
                None if buf.status.as_u16() == 404 => {
                    StoreError::NotFound(key.unwrap_or_default().to_owned())
                }
                None => StoreError::service(
                    buf.status.as_u16().to_string(),
                    "Unexpected response from the store",
                ),
            },
            RusotoError::HttpDispatch(err) => StoreError::service("Request Error", err.to_string()),
            RusotoError::Credentials(err) => {
                StoreError::service("Credentials Error", err.to_string())
            }
            RusotoError::Validation(msg) => StoreError::service("Validation Error", msg),
            RusotoError::ParseError(msg) => StoreError::service("Parsing Error", msg),
            RusotoError::Service(err) => StoreError::service("Service Error", err.to_string()),
            _ => StoreError::service("Unknown Error", "Unknown error occured"),
        }
    }

    fn region_for(config: &StoreConfig) -> Result<Region, StoreError> {
        match &config.endpoint {
            Some(endpoint) => Ok(Region::Custom {
                name: config.region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_owned(),
            }),
            None => config.region.parse::<Region>().map_err(|e| {
                StoreError::service("Configuration Error", e.to_string())
            }),
        }
    }

    async fn credentials_for(config: &StoreConfig) -> Result<AwsCredentials, StoreError> {
        match &config.credentials {
            Some(creds) => Ok(AwsCredentials::new(
                creds.access_key.clone(),
                creds.secret_key.clone(),
                creds.session_token.clone(),
                None,
            )),
            None => ProfileProvider::new()
                .map_err(|e| StoreError::service("Credentials Error", e.to_string()))?
                .credentials()
                .await
                .map_err(|e| StoreError::service("Credentials Error", e.to_string())),
        }
    }

    pub async fn new(config: &StoreConfig) -> Result<S3Provider, StoreError> {
        let region = Self::region_for(config)?;
        let credentials = Self::credentials_for(config).await?;
        if !config.path_style {
            warn!("Virtual-hosted addressing is not supported, buckets are addressed path-style");
        }
        let provider = StaticProvider::new(
            credentials.aws_access_key_id().to_owned(),
            credentials.aws_secret_access_key().to_owned(),
            credentials.token().clone(),
            None,
        );
        let http_client = HttpClient::new()
            .map_err(|e| StoreError::service("Request Error", e.to_string()))?;
        Ok(S3Provider {
            bucket_name: config.bucket.clone(),
            s3_client: S3Client::new_with(http_client, provider, region.clone()),
            region,
            credentials,
        })
    }

    pub async fn download_object(&self, key: &str) -> Result<ByteStream, StoreError> {
        let object: GetObjectOutput = self.get_object(key).await?;
        object
            .body
            .ok_or_else(|| StoreError::service("Empty Body", format!("{} has no content", key)))
    }

    async fn get_object(&self, key: &str) -> Result<GetObjectOutput, StoreError> {
        let mut request = GetObjectRequest::default();
        request.bucket = self.bucket_name.to_owned();
        request.key = key.to_owned();

        self.s3_client
            .get_object(request)
            .await
            .map_err(|e| Self::handle_error(e, Some(key)))
    }

    async fn head_object(&self, key: &str) -> Result<(), StoreError> {
        let mut request = HeadObjectRequest::default();
        request.bucket = self.bucket_name.clone();
        request.key = key.to_owned();
        match self.s3_client.head_object(request).await {
            Ok(_) => Ok(()),
            Err(RusotoError::Service(HeadObjectError::NoSuchKey(_))) => {
                Err(StoreError::NotFound(key.to_owned()))
            }
            Err(e) => Err(Self::handle_error(e, Some(key))),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Provider {
    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
    ) -> Result<ObjectListing, StoreError> {
        let mut request = ListObjectsV2Request::default();
        request.bucket = self.bucket_name.clone();
        request.delimiter = Some(delimiter.to_owned());
        request.prefix = if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_owned())
        };
        debug!(bucket = %self.bucket_name, prefix, "Listing objects");
        let output = self
            .s3_client
            .list_objects_v2(request)
            .await
            .map_err(|e| Self::handle_error(e, None))?;
        if output.is_truncated == Some(true) {
            debug!(prefix, "Listing truncated, only the first page is shown");
        }

        let common_prefixes = output
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.prefix)
            .collect();
        let contents = output
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|o| {
                let key = o.key?;
                Some(ObjectSummary {
                    key,
                    size: o.size.unwrap_or(0).max(0) as u64,
                    last_modified: o.last_modified.and_then(|date| {
                        DateTime::parse_from_rfc3339(&date)
                            .ok()
                            .map(|d| d.with_timezone(&Utc))
                    }),
                })
            })
            .collect();
        Ok(ObjectListing {
            common_prefixes,
            contents,
        })
    }

    async fn generate_signed_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        // Presigning is offline, so check the key is still there first
        self.head_object(key).await?;
        let mut request = GetObjectRequest::default();
        request.bucket = self.bucket_name.clone();
        request.key = key.to_owned();
        let option = PreSignedRequestOption { expires_in: ttl };
        debug!(key, ttl_secs = ttl.as_secs(), "Signing preview URL");
        Ok(request.get_presigned_url(&self.region, &self.credentials, &option))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let mut request = DeleteObjectRequest::default();
        request.bucket = self.bucket_name.clone();
        request.key = key.to_owned();
        self.s3_client
            .delete_object(request)
            .await
            .map_err(|e| Self::handle_error(e, Some(key)))?;
        Ok(())
    }

    fn resource_name(&self) -> &str {
        &self.bucket_name
    }
}
