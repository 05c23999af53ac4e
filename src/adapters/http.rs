use std::fs::File;
use std::path::Path;

use reqwest::blocking::{multipart::Form, Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;

use crate::domain::model::HttpResponse;
use crate::domain::ports::Transport;
use crate::utils::error::{MsdbError, Result};

fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header(AUTHORIZATION, format!("JWT {}", token)),
        None => request,
    }
}

fn read_response(response: Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok(HttpResponse { status, body })
}

fn send_get(client: &Client, url: &str, token: Option<&str>) -> Result<HttpResponse> {
    tracing::debug!("GET {}", url);
    read_response(authorized(client.get(url), token).send()?)
}

fn send_form(
    client: &Client,
    url: &str,
    token: Option<&str>,
    fields: &[(String, String)],
) -> Result<HttpResponse> {
    tracing::debug!("POST {} (form, {} fields)", url, fields.len());
    read_response(authorized(client.post(url), token).form(fields).send()?)
}

fn send_multipart(
    client: &Client,
    url: &str,
    token: Option<&str>,
    fields: &[(String, String)],
    file: &Path,
) -> Result<HttpResponse> {
    tracing::debug!("POST {} (multipart, {} fields)", url, fields.len());
    let form = fields
        .iter()
        .fold(Form::new(), |form, (name, value)| {
            form.text(name.clone(), value.clone())
        })
        .file("file", file)?;
    read_response(authorized(client.post(url), token).multipart(form).send()?)
}

fn stream_to_file(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let mut response = client.get(url).send()?;
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().unwrap_or_default();
        return Err(MsdbError::Status { status, body });
    }

    // Streamed in chunks; the body is never held in memory whole.
    let mut file = File::create(dest)?;
    let written = std::io::copy(&mut response, &mut file)?;
    Ok(written)
}

/// Builds a fresh client for every call; nothing outlives the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShotTransport;

impl OneShotTransport {
    pub fn new() -> Self {
        Self
    }

    fn client(&self) -> Result<Client> {
        Ok(Client::builder().build()?)
    }
}

impl Transport for OneShotTransport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        send_get(&self.client()?, url, token)
    }

    fn post_form(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
    ) -> Result<HttpResponse> {
        send_form(&self.client()?, url, token, fields)
    }

    fn post_multipart(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
        file: &Path,
    ) -> Result<HttpResponse> {
        send_multipart(&self.client()?, url, token, fields, file)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        stream_to_file(&self.client()?, url, dest)
    }
}

/// One pooled client reused for every call while the session is held.
///
/// Dropping the session releases its connections, including during unwinding.
#[derive(Debug)]
pub struct SessionTransport {
    client: Client,
}

impl SessionTransport {
    pub fn open() -> Result<Self> {
        tracing::info!("APIClient: Opening session");
        Ok(Self {
            client: Client::builder().build()?,
        })
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        tracing::info!("APIClient: Closing session");
    }
}

impl Transport for SessionTransport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        send_get(&self.client, url, token)
    }

    fn post_form(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
    ) -> Result<HttpResponse> {
        send_form(&self.client, url, token, fields)
    }

    fn post_multipart(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
        file: &Path,
    ) -> Result<HttpResponse> {
        send_multipart(&self.client, url, token, fields, file)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        stream_to_file(&self.client, url, dest)
    }
}
