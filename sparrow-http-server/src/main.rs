/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! SPARQL endpoint over a triple store loaded once at startup.
//!
//! - `POST /sparql` with a form-encoded `query=` or an `application/sparql-query` body
//! - `GET /sparql?query=...`
//! - `GET /stats` returns the number of loaded triples

use clap::Parser;
use log::{error, info, warn};
use sparrow::{execute_query, load_documents, DocumentSource, NTriplesParser, QueryOptions, TripleStore};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use url::{form_urlencoded, Url};

const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;
const MAX_HEADERS: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "sparrow-http-server")]
#[command(about = "SPARQL endpoint over N-Triples documents loaded at startup")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "SPARROW_BIND")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8888, env = "SPARROW_PORT")]
    port: u16,

    /// N-Triples documents to load (repeatable)
    #[arg(long, env = "SPARROW_DATA", value_delimiter = ',')]
    data: Vec<PathBuf>,

    /// Maximum rows returned per query
    #[arg(long, env = "SPARROW_MAX_ROWS")]
    max_rows: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut store = TripleStore::new();
    let sources: Vec<DocumentSource> = args.data.iter().map(DocumentSource::file).collect();
    let report = load_documents(&mut store, &sources, &NTriplesParser);
    for failure in &report.failures {
        warn!("Not loaded: {}", failure);
    }
    info!("Loaded {} triples", store.size());

    let store = Arc::new(store);
    let options = QueryOptions {
        max_rows: args.max_rows,
    };

    let address = format!("{}:{}", args.bind, args.port);
    let listener = match TcpListener::bind(&address) {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };
    info!("SPARQL endpoint listening on http://{}/sparql", address);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let store = Arc::clone(&store);
                let options = options.clone();
                thread::spawn(move || handle_client(stream, &store, &options));
            }
            Err(e) => warn!("Connection failed: {}", e),
        }
    }
}

fn handle_client(mut stream: TcpStream, store: &TripleStore, options: &QueryOptions) {
    let response = match read_request(&mut stream) {
        Ok(raw) => handle_request(store, options, &raw),
        Err(e) => {
            warn!("Failed to read request: {}", e);
            return;
        }
    };
    if let Err(e) = stream
        .write_all(&response.to_http())
        .and_then(|_| stream.flush())
    {
        warn!("Failed to write response: {}", e);
    }
}

/// Reads the request head and as much body as `Content-Length` announces.
fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        if data.len() > MAX_REQUEST_BYTES {
            break;
        }
        if let Ok(Some(head)) = parse_head(&data) {
            if data.len() >= head.length + head.content_length {
                break;
            }
        }
    }
    Ok(data)
}

#[derive(Debug)]
struct RequestHead {
    method: String,
    path: String,
    content_type: Option<String>,
    content_length: usize,
    /// Size of the head in bytes; the body starts here.
    length: usize,
}

fn parse_head(data: &[u8]) -> Result<Option<RequestHead>, httparse::Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let length = match req.parse(data)? {
        httparse::Status::Complete(length) => length,
        httparse::Status::Partial => return Ok(None),
    };

    let header = |name: &str| {
        req.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .and_then(|header| std::str::from_utf8(header.value).ok())
            .map(|value| value.trim().to_string())
    };
    let content_type = header("Content-Type");
    let content_length = header("Content-Length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);

    Ok(Some(RequestHead {
        method: req.method.unwrap_or_default().to_string(),
        path: req.path.unwrap_or("/").to_string(),
        content_type,
        content_length,
        length,
    }))
}

#[derive(Debug, PartialEq)]
struct Response {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Response {
    fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body)
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        }
    }

    fn to_http(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn handle_request(store: &TripleStore, options: &QueryOptions, raw: &[u8]) -> Response {
    if raw.len() > MAX_REQUEST_BYTES {
        return Response::text(413, "Request too large");
    }
    let head = match parse_head(raw) {
        Ok(Some(head)) => head,
        Ok(None) | Err(_) => return Response::text(400, "Bad Request"),
    };
    let body_end = raw.len().min(head.length + head.content_length);
    let body = &raw[head.length..body_end];
    let route = head.path.split('?').next().unwrap_or_default();

    match (head.method.as_str(), route) {
        ("OPTIONS", _) => Response::new(204, "text/plain", ""),
        ("GET", "/stats") => Response::new(
            200,
            "application/json",
            serde_json::json!({ "triples": store.size() }).to_string(),
        ),
        ("GET", "/sparql") => match query_from_path(&head.path) {
            Some(query) => run_query(store, options, &query),
            None => Response::text(400, "No query provided"),
        },
        ("POST", "/sparql") => match query_from_body(head.content_type.as_deref(), body) {
            Some(query) => run_query(store, options, &query),
            None => Response::text(400, "No query provided"),
        },
        _ => Response::text(404, "Not Found"),
    }
}

fn query_from_path(path: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost{}", path)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value.into_owned())
        .filter(|query| !query.trim().is_empty())
}

fn query_from_body(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    let query = match content_type {
        Some(content_type) if content_type.starts_with("application/sparql-query") => {
            String::from_utf8(body.to_vec()).ok()?
        }
        _ => form_urlencoded::parse(body)
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.into_owned())?,
    };
    Some(query).filter(|query| !query.trim().is_empty())
}

fn run_query(store: &TripleStore, options: &QueryOptions, query: &str) -> Response {
    info!("Executing query ({} bytes)", query.len());
    match execute_query(store, query, options) {
        Ok(results) => {
            info!("Query returned {} rows", results.len());
            match results.to_json() {
                Ok(json) => Response::new(200, "application/sparql-results+json", json),
                Err(e) => {
                    error!("Failed to serialize results: {}", e);
                    Response::text(500, "Failed to serialize results")
                }
            }
        }
        Err(e) if e.is_internal() => {
            error!("Query failed: {}", e);
            Response::text(500, format!("Query error: {}", e))
        }
        Err(e) => {
            warn!("Rejected query: {}", e);
            Response::text(400, format!("Query error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"
<http://example.org/m1> <http://example.org/title> "Robocop" .
<http://example.org/m2> <http://example.org/title> "Alien" .
"#;

    fn store() -> TripleStore {
        let mut store = TripleStore::new();
        load_documents(
            &mut store,
            &[DocumentSource::inline("movies.nt", DATA)],
            &NTriplesParser,
        );
        store
    }

    fn request(raw: &str) -> Response {
        handle_request(&store(), &QueryOptions::default(), raw.as_bytes())
    }

    fn post(content_type: &str, body: &str) -> Response {
        request(&format!(
            "POST /sparql HTTP/1.1\r\nHost: localhost\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
            content_type,
            body.len(),
            body
        ))
    }

    #[test]
    fn form_encoded_query() {
        let response = post(
            "application/x-www-form-urlencoded",
            "query=SELECT+%3Ft+WHERE+%7B+%3Fm+%3Chttp%3A%2F%2Fexample.org%2Ftitle%3E+%3Ft+%7D",
        );
        assert_eq!(response.status, 200);
        let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(json["head"]["vars"], serde_json::json!(["t"]));
        assert_eq!(json["results"]["bindings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn raw_sparql_body() {
        let response = post(
            "application/sparql-query",
            "SELECT ?t WHERE { <http://example.org/m1> <http://example.org/title> ?t }",
        );
        assert_eq!(response.status, 200);
        assert!(response.body.contains("Robocop"));
    }

    #[test]
    fn get_with_query_string() {
        let response = request(
            "GET /sparql?query=SELECT%20*%20WHERE%20%7B%20%3Fs%20%3Fp%20%3Fo%20%7D HTTP/1.1\r\nHost: x\r\n\r\n",
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/sparql-results+json");
    }

    #[test]
    fn errors_and_other_routes() {
        assert_eq!(post("application/x-www-form-urlencoded", "other=1").status, 400);

        let bad = post("application/sparql-query", "SELECT ?x WHERE {");
        assert_eq!(bad.status, 400);
        assert!(bad.body.starts_with("Query error:"));

        let stats = request("GET /stats HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(stats.status, 200);
        assert_eq!(stats.body, r#"{"triples":2}"#);

        assert_eq!(request("OPTIONS /sparql HTTP/1.1\r\nHost: x\r\n\r\n").status, 204);
        assert_eq!(request("GET /missing HTTP/1.1\r\nHost: x\r\n\r\n").status, 404);
    }

    #[test]
    fn responses_carry_cors_headers() {
        let http = String::from_utf8(Response::text(404, "Not Found").to_http()).unwrap();
        assert!(http.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(http.contains("Access-Control-Allow-Origin: *"));
    }
}
