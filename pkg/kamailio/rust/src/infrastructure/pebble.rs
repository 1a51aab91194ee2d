// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Pebble client over the workload container's unix socket.
//!
//! Every request opens a fresh HTTP/1 connection on the socket. Responses
//! come wrapped in Pebble's envelope (`type`, `status-code`, `result`);
//! asynchronous operations (service start and stop) return a change id that
//! is waited on before the call returns. Files travel as `multipart/form-data`
//! in both directions.

use crate::error::{OperatorError, Result};
use crate::files::FileStore;
use crate::layer::{Layer, Plan};
use crate::supervisor::{ProcessSupervisor, ServiceInfo};
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST, HeaderName};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;

const CHANGE_TIMEOUT: Duration = Duration::from_secs(30);
const JSON: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";
const PUSH_PERMISSIONS: &str = "644";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "status-code", default)]
    status_code: u16,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    status: String,
    #[serde(default)]
    err: Option<String>,
}

/// Per-file entry in the result of a files request.
#[derive(Debug, Deserialize)]
struct FileResult {
    path: String,
    #[serde(default)]
    error: Option<FileError>,
}

#[derive(Debug, Deserialize)]
struct FileError {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// One `multipart/form-data` part.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    name: String,
    filename: Option<String>,
    content: Vec<u8>,
}

impl Part {
    fn json(name: &str, value: &Value) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            filename: None,
            content: serde_json::to_vec(value)?,
        })
    }

    fn file(path: &str, content: &[u8]) -> Self {
        Self {
            name: "files".to_string(),
            filename: Some(path.to_string()),
            content: content.to_vec(),
        }
    }
}

struct Reply {
    status: u16,
    content_type: String,
    body: Bytes,
}

/// Unwrap Pebble's response envelope, turning error responses into
/// supervisor errors.
fn parse_envelope(http_status: u16, body: &[u8]) -> Result<Envelope> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| {
        OperatorError::Supervisor(format!("malformed response (HTTP {http_status}): {e}"))
    })?;

    if envelope.kind == "error" || http_status >= 400 {
        let message = envelope
            .result
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let code = if envelope.status_code != 0 {
            envelope.status_code
        } else {
            http_status
        };
        return Err(OperatorError::Supervisor(format!("{message} (HTTP {code})")));
    }
    Ok(envelope)
}

fn parse_plan(result: &Value) -> Result<Plan> {
    let yaml = result.as_str().unwrap_or_default();
    if yaml.trim().is_empty() {
        return Ok(Plan::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

fn layer_request(label: &str, layer: &Layer, combine: bool) -> Result<Value> {
    Ok(json!({
        "action": "add",
        "combine": combine,
        "label": label,
        "format": "yaml",
        "layer": serde_yaml::to_string(layer)?,
    }))
}

fn write_request(path: &str) -> Value {
    json!({
        "action": "write",
        "files": [{
            "path": path,
            "make-dirs": true,
            "permissions": PUSH_PERMISSIONS,
        }],
    })
}

fn check_change(result: Value) -> Result<()> {
    let change: Change = serde_json::from_value(result)?;
    match change.err {
        Some(err) if !err.is_empty() => Err(OperatorError::Supervisor(err)),
        _ => {
            debug!("change finished with status {}", change.status);
            Ok(())
        }
    }
}

/// Turn the error reported for `path` in a files result into a file store
/// error. `not-found` becomes `FileNotFound`.
fn check_file_results(path: &str, result: Value) -> Result<()> {
    let results: Vec<FileResult> = serde_json::from_value(result)?;
    let Some(error) = results
        .into_iter()
        .filter(|r| r.path == path)
        .find_map(|r| r.error)
    else {
        return Ok(());
    };
    if error.kind == "not-found" {
        return Err(OperatorError::FileNotFound(path.to_string()));
    }
    Err(OperatorError::file_store(path, error.message))
}

/// Report transport and envelope failures of a files request against the
/// file, leaving file store errors as they are.
fn file_error(path: &str) -> impl FnOnce(OperatorError) -> OperatorError + '_ {
    move |e| match e {
        OperatorError::FileNotFound(_) | OperatorError::FileStore { .. } => e,
        other => OperatorError::file_store(path, other.to_string()),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Pick a boundary that does not occur in the content.
fn boundary_for(content: &[u8]) -> String {
    let mut n = 0u32;
    loop {
        let boundary = format!("kamailio-operator-{n:08x}");
        if find(content, boundary.as_bytes()).is_none() {
            return boundary;
        }
        n += 1;
    }
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| param.trim().strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

fn encode_multipart(boundary: &str, parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match &part.filename {
            Some(filename) => {
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(format!("Content-Type: {JSON}\r\n").as_bytes());
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn content_disposition(headers: &str) -> Option<(String, Option<String>)> {
    let value = headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-disposition")
            .then_some(value)
    })?;

    let mut name = None;
    let mut filename = None;
    for param in value.split(';').map(str::trim) {
        if let Some((key, v)) = param.split_once('=') {
            let v = v.trim().trim_matches('"').to_string();
            match key.trim() {
                "name" => name = Some(v),
                "filename" => filename = Some(v),
                _ => {}
            }
        }
    }
    Some((name?, filename))
}

fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<Part>> {
    let malformed =
        |what: &str| OperatorError::Serialization(format!("malformed multipart body: {what}"));
    let delimiter = format!("--{boundary}");
    let closing = format!("\r\n{delimiter}");

    let start = find(body, delimiter.as_bytes()).ok_or_else(|| malformed("no opening boundary"))?;
    let mut rest = &body[start + delimiter.len()..];
    let mut parts = Vec::new();
    loop {
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        rest = rest
            .strip_prefix(b"\r\n")
            .ok_or_else(|| malformed("missing line break after boundary"))?;
        let header_end =
            find(rest, b"\r\n\r\n").ok_or_else(|| malformed("unterminated part headers"))?;
        let headers = std::str::from_utf8(&rest[..header_end])
            .map_err(|_| malformed("part headers are not UTF-8"))?;
        let (name, filename) =
            content_disposition(headers).ok_or_else(|| malformed("part without a name"))?;

        let content = &rest[header_end + 4..];
        let end = find(content, closing.as_bytes()).ok_or_else(|| malformed("no closing boundary"))?;
        parts.push(Part {
            name,
            filename,
            content: content[..end].to_vec(),
        });
        rest = &content[end + closing.len()..];
    }
}

pub struct PebbleClient {
    socket_path: PathBuf,
}

impl PebbleClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(HeaderName, &str)],
        payload: Bytes,
    ) -> Result<Reply> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            OperatorError::Supervisor(format!(
                "connecting to {}: {e}",
                self.socket_path.display()
            ))
        })?;

        // Use an adapter to access something implementing `tokio::io` traits
        // as if they implement `hyper::rt` IO traits.
        let io = TokioIo::new(stream);
        let (mut sender, conn) = http1::handshake::<_, Full<Bytes>>(io)
            .await
            .map_err(|e| OperatorError::Supervisor(format!("handshake: {e}")))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("pebble connection closed: {e}");
            }
        });

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(path)
            .header(HOST, "localhost");
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let request = builder
            .body(Full::new(payload))
            .map_err(|e| OperatorError::Supervisor(format!("building request: {e}")))?;

        debug!("{method} {path}");
        let response = sender
            .send_request(request)
            .await
            .map_err(|e| OperatorError::Supervisor(format!("{method} {path}: {e}")))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| OperatorError::Supervisor(format!("reading response: {e}")))?
            .to_bytes();

        Ok(Reply {
            status,
            content_type,
            body,
        })
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Envelope> {
        let payload = match body {
            Some(body) => Bytes::from(serde_json::to_vec(&body)?),
            None => Bytes::new(),
        };
        let reply = self
            .send(method, path, &[(CONTENT_TYPE, JSON)], payload)
            .await?;
        parse_envelope(reply.status, &reply.body)
    }

    async fn service_action(&self, action: &str, name: &str) -> Result<()> {
        let envelope = self
            .request(
                Method::POST,
                "/v1/services",
                Some(json!({ "action": action, "services": [name] })),
            )
            .await?;
        let change = envelope.change.ok_or_else(|| {
            OperatorError::Supervisor(format!("{action} {name}: no change id returned"))
        })?;

        let wait = format!(
            "/v1/changes/{change}/wait?timeout={}s",
            CHANGE_TIMEOUT.as_secs()
        );
        let done = self.request(Method::GET, &wait, None).await?;
        check_change(done.result)?;
        info!("service {name}: {action} done (change {change})");
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let uri = format!(
            "/v1/files?action=read&path={}",
            urlencoding::encode(path)
        );
        let reply = self
            .send(Method::GET, &uri, &[(ACCEPT, MULTIPART)], Bytes::new())
            .await?;

        // Requests Pebble rejects outright come back as a plain envelope.
        if !reply.content_type.starts_with(MULTIPART) {
            parse_envelope(reply.status, &reply.body)?;
            return Err(OperatorError::file_store(
                path,
                format!("expected a multipart response, got '{}'", reply.content_type),
            ));
        }
        let boundary = multipart_boundary(&reply.content_type)
            .ok_or_else(|| OperatorError::file_store(path, "multipart response without a boundary"))?;
        let parts = parse_multipart(&reply.body, &boundary)?;

        let response = parts
            .iter()
            .find(|p| p.name == "response")
            .ok_or_else(|| OperatorError::file_store(path, "no response part"))?;
        let envelope = parse_envelope(reply.status, &response.content)?;
        check_file_results(path, envelope.result)?;

        parts
            .into_iter()
            .find(|p| p.name == "files" && p.filename.as_deref() == Some(path))
            .map(|p| p.content)
            .ok_or_else(|| OperatorError::file_store(path, "no content returned"))
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let boundary = boundary_for(content);
        let body = encode_multipart(
            &boundary,
            &[
                Part::json("request", &write_request(path))?,
                Part::file(path, content),
            ],
        );
        let content_type = format!("{MULTIPART}; boundary={boundary}");
        let reply = self
            .send(
                Method::POST,
                "/v1/files",
                &[(CONTENT_TYPE, content_type.as_str())],
                Bytes::from(body),
            )
            .await?;
        let envelope = parse_envelope(reply.status, &reply.body)?;
        check_file_results(path, envelope.result)
    }
}

#[async_trait]
impl ProcessSupervisor for PebbleClient {
    async fn get_plan(&self) -> Result<Plan> {
        let envelope = self
            .request(Method::GET, "/v1/plan?format=yaml", None)
            .await?;
        parse_plan(&envelope.result)
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()> {
        let body = layer_request(label, layer, combine)?;
        self.request(Method::POST, "/v1/layers", Some(body)).await?;
        info!("added layer \"{label}\" (combine={combine})");
        Ok(())
    }

    async fn get_service(&self, name: &str) -> Result<ServiceInfo> {
        let uri = format!("/v1/services?names={}", urlencoding::encode(name));
        let envelope = self.request(Method::GET, &uri, None).await?;
        let services: Vec<ServiceInfo> = serde_json::from_value(envelope.result)?;
        Ok(services
            .into_iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| ServiceInfo {
                name: name.to_string(),
                startup: Default::default(),
                current: Default::default(),
            }))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.service_action("start", name).await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.service_action("stop", name).await
    }
}

#[async_trait]
impl FileStore for PebbleClient {
    async fn push(&self, path: &str, content: &str) -> Result<()> {
        self.write_file(path, content.as_bytes())
            .await
            .map_err(file_error(path))?;
        info!("pushed {path} ({} bytes)", content.len());
        Ok(())
    }

    async fn pull(&self, path: &str) -> Result<String> {
        let content = self.read_file(path).await.map_err(file_error(path))?;
        String::from_utf8(content)
            .map_err(|_| OperatorError::file_store(path, "content is not UTF-8"))
    }
}
