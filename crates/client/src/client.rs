//! PCS REST client.
//!
//! Async HTTP client using `reqwest`. The access token travels as the
//! `access_token` query parameter of every request.

use std::fmt;
use std::time::Duration;

use pcs_protocol::constants::{
    API_BASE_URL, DOWNLOAD_BASE_URL, MAX_PARTS, MIN_PARTS, UPLOAD_BASE_URL, error_code,
};
use pcs_protocol::{
    ApiErrorBody, FileEntry, FileList, OnDuplicate, PartHash, QuotaInfo, RemoteFile,
    TmpfileResponse,
};
use pcs_transfer::{UploadDescriptor, validate_remote_path};
use reqwest::header::RANGE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{ByteRange, ListOptions, RequestOptions};

pub(crate) const USER_AGENT: &str = concat!("pcs-rs/", env!("CARGO_PKG_VERSION"));

/// Errors from the PCS client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}{}: {message}", fmt_code(.code))]
    Api {
        status: u16,
        /// PCS `error_code`, when the body carried one.
        code: Option<i64>,
        message: String,
    },

    #[error("unauthorized: access token invalid or expired")]
    Unauthorized,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid access token")]
    InvalidToken,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("OAuth error {error}: {description}")]
    OAuth { error: String, description: String },
}

fn fmt_code(code: &Option<i64>) -> String {
    code.map(|c| format!(" (code {c})")).unwrap_or_default()
}

impl Error {
    /// PCS error code, if the server sent one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn from_body(status: u16, body: ApiErrorBody) -> Self {
        match body.error_code {
            error_code::INVALID_TOKEN | error_code::EXPIRED_TOKEN => Self::Unauthorized,
            code => Self::Api {
                status,
                code: Some(code),
                message: body.error_msg,
            },
        }
    }
}

/// PCS API client.
pub struct Client {
    http: reqwest::Client,
    access_token: String,
    api_url: String,
    upload_url: String,
    download_url: String,
    default_timeout: Option<Duration>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("upload_url", &self.upload_url)
            .field("download_url", &self.download_url)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl Client {
    /// Creates a new client with the given access token.
    pub fn new(access_token: &str) -> Result<Self, Error> {
        if access_token.trim().is_empty() {
            return Err(Error::InvalidToken);
        }

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            access_token: access_token.to_string(),
            api_url: API_BASE_URL.to_string(),
            upload_url: UPLOAD_BASE_URL.to_string(),
            download_url: DOWNLOAD_BASE_URL.to_string(),
            default_timeout: None,
        })
    }

    /// Applies `timeout` to every request that does not set its own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Points the client at other hosts (metadata, upload, download).
    pub fn with_base_urls(
        mut self,
        api: impl Into<String>,
        upload: impl Into<String>,
        download: impl Into<String>,
    ) -> Self {
        self.api_url = api.into();
        self.upload_url = upload.into();
        self.download_url = download.into();
        self
    }

    /// Replaces the access token, e.g. after a refresh.
    pub fn set_access_token(&mut self, access_token: &str) -> Result<(), Error> {
        if access_token.trim().is_empty() {
            return Err(Error::InvalidToken);
        }
        self.access_token = access_token.to_string();
        Ok(())
    }

    /// Builds an authenticated request for `{base}/{resource}?method={api_method}`.
    fn request(
        &self,
        method: Method,
        base: &str,
        resource: &str,
        api_method: &str,
        params: &[(&str, String)],
        opts: &RequestOptions,
    ) -> RequestBuilder {
        let url = format!("{base}/{resource}");
        let mut builder = self
            .http
            .request(method, url)
            .query(&[
                ("method", api_method),
                ("access_token", self.access_token.as_str()),
            ])
            .query(params)
            .headers(opts.headers.clone());
        if let Some(timeout) = opts.timeout.or(self.default_timeout) {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Sends a request and returns the raw body of a successful response.
    async fn send(&self, api_method: &str, builder: RequestBuilder) -> Result<Vec<u8>, Error> {
        debug!(method = api_method, "sending PCS request");
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            return Err(match serde_json::from_slice::<ApiErrorBody>(&body) {
                Ok(err) => Error::from_body(status.as_u16(), err),
                Err(_) => Error::Api {
                    status: status.as_u16(),
                    code: None,
                    message: String::from_utf8_lossy(&body).into_owned(),
                },
            });
        }
        Ok(body.to_vec())
    }

    /// Sends a request and decodes its JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        api_method: &str,
        builder: RequestBuilder,
    ) -> Result<T, Error> {
        let body = self.send(api_method, builder).await?;
        // Some revisions of the service report errors with a 200 status.
        if let Ok(err) = serde_json::from_slice::<ApiErrorBody>(&body) {
            return Err(Error::from_body(200, err));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Returns the quota of the current user.
    pub async fn quota(&self, opts: &RequestOptions) -> Result<QuotaInfo, Error> {
        let req = self.request(Method::GET, &self.api_url, "quota", "info", &[], opts);
        self.send_json("info", req).await
    }

    /// Uploads a whole file (up to 2 GiB) in one call.
    pub async fn upload(
        &self,
        remote_path: &str,
        data: Vec<u8>,
        on_duplicate: OnDuplicate,
        opts: &RequestOptions,
    ) -> Result<RemoteFile, Error> {
        check_path(remote_path)?;
        let mut params = vec![("path", remote_path.to_string())];
        push_ondup(&mut params, on_duplicate);

        let req = self
            .request(Method::POST, &self.upload_url, "file", "upload", &params, opts)
            .multipart(file_form(data));
        self.send_json("upload", req).await
    }

    /// Uploads one part of a chunked upload and returns its part hash.
    pub async fn upload_tmpfile(
        &self,
        data: Vec<u8>,
        opts: &RequestOptions,
    ) -> Result<PartHash, Error> {
        let params = [("type", "tmpfile".to_string())];
        let req = self
            .request(Method::POST, &self.upload_url, "file", "upload", &params, opts)
            .multipart(file_form(data));
        let resp: TmpfileResponse = self.send_json("upload", req).await?;
        Ok(resp.md5)
    }

    /// Assembles uploaded parts, in order, into `remote_path`.
    pub async fn create_superfile(
        &self,
        remote_path: &str,
        parts: &[PartHash],
        on_duplicate: OnDuplicate,
        opts: &RequestOptions,
    ) -> Result<RemoteFile, Error> {
        check_path(remote_path)?;
        if !(MIN_PARTS..=MAX_PARTS).contains(&parts.len()) {
            return Err(Error::InvalidRequest(format!(
                "createsuperfile needs {MIN_PARTS}..={MAX_PARTS} parts, got {}",
                parts.len()
            )));
        }

        let mut params = vec![("path", remote_path.to_string())];
        push_ondup(&mut params, on_duplicate);
        let param = serde_json::json!({ "block_list": parts }).to_string();

        let req = self
            .request(Method::POST, &self.api_url, "file", "createsuperfile", &params, opts)
            .form(&[("param", param)]);
        self.send_json("createsuperfile", req).await
    }

    /// Registers `remote_path` by content identity.
    ///
    /// Returns `Ok(None)` when the server holds no matching content, which
    /// it reports with error code 31079. Any other failure, a bare 404
    /// included, is an error.
    pub async fn rapid_upload(
        &self,
        remote_path: &str,
        descriptor: &UploadDescriptor,
        on_duplicate: OnDuplicate,
        opts: &RequestOptions,
    ) -> Result<Option<RemoteFile>, Error> {
        check_path(remote_path)?;
        let mut form = vec![
            ("path", remote_path.to_string()),
            ("content-length", descriptor.size.to_string()),
            ("content-md5", descriptor.content_md5.clone()),
            ("slice-md5", descriptor.slice_md5.clone()),
            ("content-crc32", descriptor.content_crc32.clone()),
        ];
        push_ondup(&mut form, on_duplicate);

        let req = self
            .request(Method::POST, &self.api_url, "file", "rapidupload", &[], opts)
            .form(&form);
        match self.send_json("rapidupload", req).await {
            Ok(file) => Ok(Some(file)),
            Err(Error::Api {
                code: Some(error_code::RAPID_MD5_NOT_FOUND),
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Downloads a file, or one byte range of it.
    pub async fn download(
        &self,
        remote_path: &str,
        range: Option<ByteRange>,
        opts: &RequestOptions,
    ) -> Result<Vec<u8>, Error> {
        check_path(remote_path)?;
        let params = [("path", remote_path.to_string())];
        let mut req = self.request(Method::GET, &self.download_url, "file", "download", &params, opts);
        if let Some(range) = range {
            req = req.header(RANGE, range.to_string());
        }
        self.send("download", req).await
    }

    /// Returns the metadata of one file or directory.
    pub async fn meta(&self, remote_path: &str, opts: &RequestOptions) -> Result<FileEntry, Error> {
        check_path(remote_path)?;
        let params = [("path", remote_path.to_string())];
        let req = self.request(Method::GET, &self.api_url, "file", "meta", &params, opts);
        let resp: FileList = self.send_json("meta", req).await?;
        resp.list.into_iter().next().ok_or_else(|| Error::Api {
            status: 200,
            code: Some(error_code::FILE_NOT_FOUND),
            message: format!("no metadata returned for {remote_path}"),
        })
    }

    /// Creates a directory.
    pub async fn mkdir(&self, remote_path: &str, opts: &RequestOptions) -> Result<RemoteFile, Error> {
        check_path(remote_path)?;
        let req = self
            .request(Method::POST, &self.api_url, "file", "mkdir", &[], opts)
            .form(&[("path", remote_path)]);
        self.send_json("mkdir", req).await
    }

    /// Deletes a file or directory.
    pub async fn delete(&self, remote_path: &str, opts: &RequestOptions) -> Result<(), Error> {
        check_path(remote_path)?;
        let req = self
            .request(Method::POST, &self.api_url, "file", "delete", &[], opts)
            .form(&[("path", remote_path)]);
        let body = self.send("delete", req).await?;
        if let Ok(err) = serde_json::from_slice::<ApiErrorBody>(&body) {
            return Err(Error::from_body(200, err));
        }
        Ok(())
    }

    /// Lists the entries of a directory.
    pub async fn list(
        &self,
        remote_path: &str,
        list: ListOptions,
        opts: &RequestOptions,
    ) -> Result<Vec<FileEntry>, Error> {
        check_path(remote_path)?;
        let mut params = vec![("path", remote_path.to_string())];
        params.extend(list.to_params());
        let req = self.request(Method::GET, &self.api_url, "file", "list", &params, opts);
        let resp: FileList = self.send_json("list", req).await?;
        Ok(resp.list)
    }
}

fn check_path(remote_path: &str) -> Result<(), Error> {
    validate_remote_path(remote_path).map_err(|e| Error::InvalidPath(e.to_string()))
}

fn push_ondup(params: &mut Vec<(&'static str, String)>, on_duplicate: OnDuplicate) {
    if let Some(value) = on_duplicate.as_query() {
        params.push(("ondup", value.to_string()));
    }
}

fn file_form(data: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(data).file_name("file"))
}
